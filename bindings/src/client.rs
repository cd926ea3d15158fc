use bytes::{Bytes, BytesMut};

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tokio_util::codec::length_delimited::LengthDelimitedCodec;
use tokio_util::codec::{Decoder, Encoder};

use yocki_protocol::{CallEnvelope, PluginMessage};

use crate::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Blocking connection from a host to a running plugin
pub struct Client {
    codec: LengthDelimitedCodec,
    stream: TcpStream,
    buffer: BytesMut,
    timeout: Duration,
    /// Set once a request may have been left unanswered on the stream
    broken: bool,
}

impl Client {
    pub fn connect<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<Self, Error> {
        let mut last_err = None;

        for addr in addr.to_socket_addrs()? {
            log::debug!("Connecting to plugin at {addr}");

            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    stream.set_nodelay(true)?;

                    return Ok(Self {
                        codec: LengthDelimitedCodec::new(),
                        stream,
                        buffer: BytesMut::new(),
                        timeout,
                        broken: false,
                    });
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(match last_err {
            Some(err) => Self::map_io(err, timeout),
            None => Error::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                "address did not resolve",
            )),
        })
    }

    /// A client stops accepting requests after a timeout or a transport
    /// error, since a late response would otherwise answer the next request
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn ping(&mut self) -> Result<(), Error> {
        match self.round_trip(&PluginMessage::PingRequest)? {
            PluginMessage::PingResult => Ok(()),
            other => Err(Error::UnexpectedMessage(format!("{other:?}"))),
        }
    }

    /// Calls `fn_name` on the plugin and returns the response buffer
    pub fn call<S: ToString, T: ToString>(&mut self, fn_name: S, arg: T) -> Result<String, Error> {
        let request = CallEnvelope::new(fn_name, arg);
        log::trace!("Issuing call request for \"{}\"", request.fn_name);

        match self.round_trip(&PluginMessage::CallRequest(request))? {
            PluginMessage::CallResult(Ok(response)) => Ok(response.buf),
            PluginMessage::CallResult(Err(msg)) => Err(Error::Remote(msg)),
            other => Err(Error::UnexpectedMessage(format!("{other:?}"))),
        }
    }

    fn round_trip(&mut self, msg: &PluginMessage) -> Result<PluginMessage, Error> {
        if self.broken {
            return Err(Error::Broken);
        }

        let result = self
            .send_message(msg)
            .and_then(|()| self.receive_message());

        if result.is_err() {
            log::debug!("Marking plugin connection as broken");
            self.broken = true;
            self.buffer.clear();
        }
        result
    }

    fn map_io(err: std::io::Error, timeout: Duration) -> Error {
        match err.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => Error::Timeout(timeout),
            _ => Error::Io(err),
        }
    }

    fn send_message(&mut self, msg: &PluginMessage) -> Result<(), Error> {
        let binmsg = bincode::serialize(msg)?;
        let mut msg_data = BytesMut::new();
        self.codec.encode(Bytes::from(binmsg), &mut msg_data)?;

        self.stream
            .write_all(&msg_data)
            .map_err(|err| Self::map_io(err, self.timeout))
    }

    fn receive_message(&mut self) -> Result<PluginMessage, Error> {
        log::trace!("Waiting for message from plugin");

        loop {
            if let Some(data) = self.codec.decode(&mut self.buffer)? {
                return Ok(bincode::deserialize(&data)?);
            }

            let mut data = [0; 1024];
            let len = self
                .stream
                .read(&mut data)
                .map_err(|err| Self::map_io(err, self.timeout))?;

            log::trace!("Received {len} bytes from plugin");

            if len == 0 {
                return Err(Error::ConnectionClosed);
            }
            self.buffer.extend_from_slice(&data[0..len]);
        }
    }
}
