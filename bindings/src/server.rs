use bytes::Bytes;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;

use tokio_util::codec::length_delimited::LengthDelimitedCodec;
use tokio_util::codec::{FramedRead, FramedWrite};

use yocki_protocol::{CallEnvelope, PluginMessage, ResponseEnvelope};

use crate::registry::{Registry, SharedHandler};
use crate::{Error, Handler, PluginConfig};

/// A set of handlers that can be served to a host
#[derive(Clone, Default)]
pub struct Plugin {
    registry: Arc<Registry>,
}

/// A plugin with a bound listener
pub struct BoundPlugin {
    listener: TcpListener,
    registry: Arc<Registry>,
}

impl Plugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn register<S, H>(&self, name: S, handler: H) -> Option<SharedHandler>
    where
        S: ToString,
        H: Handler + 'static,
    {
        self.registry.register(name, handler)
    }

    pub fn register_typed<S, F>(&self, name: S, f: F) -> Option<SharedHandler>
    where
        S: ToString,
        F: Fn(CallEnvelope) -> ResponseEnvelope + Send + Sync + 'static,
    {
        self.registry.register_typed(name, f)
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.registry.unregister(name)
    }

    pub async fn bind<A: ToSocketAddrs>(&self, addr: A) -> Result<BoundPlugin, Error> {
        let listener = TcpListener::bind(addr).await?;

        Ok(BoundPlugin {
            listener,
            registry: self.registry.clone(),
        })
    }

    /// Serves calls on the configured address until ctrl+c
    pub async fn run(&self, config: &PluginConfig) -> Result<(), Error> {
        self.bind(config.address()).await?.serve().await
    }

    /// Like [`Plugin::run`], but owns the async runtime
    pub fn run_blocking(&self, config: &PluginConfig) -> Result<(), Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_io()
            .build()?;

        runtime.block_on(self.run(config))
    }
}

impl BoundPlugin {
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn serve(self) -> Result<(), Error> {
        self.serve_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for ctrl+c: {err}");
                std::future::pending::<()>().await;
            }
            log::info!("Got ctrl+c");
        })
        .await
    }

    /// Accepts connections until `shutdown` completes
    pub async fn serve_until<F: Future<Output = ()>>(self, shutdown: F) -> Result<(), Error> {
        log::info!("Listening on {}", self.local_addr()?);

        tokio::pin!(shutdown);

        loop {
            let accept = self.listener.accept();

            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutting down");
                    return Ok(());
                }
                result = accept => {
                    let (stream, peer) = result?;
                    let registry = self.registry.clone();

                    tokio::spawn(async move {
                        handle_connection(stream, peer, registry).await;
                    });
                }
            }
        }
    }
}

fn handle_message(msg: PluginMessage, registry: &Registry) -> Option<PluginMessage> {
    match msg {
        PluginMessage::PingRequest => Some(PluginMessage::PingResult),
        PluginMessage::CallRequest(request) => {
            log::debug!("Got call request for \"{}\"", request.fn_name);
            let result = registry.call(&request).map_err(|err| {
                log::error!("Call to \"{}\" failed: {err}", request.fn_name);
                err.to_string()
            });
            Some(PluginMessage::CallResult(result))
        }
        other => {
            log::error!("Got unexpected message: {other:?}");
            None
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, registry: Arc<Registry>) {
    log::info!("Connected to host at {peer}");

    let (reader, writer) = stream.into_split();

    let mut reader = FramedRead::new(reader, LengthDelimitedCodec::new());
    let mut writer = FramedWrite::new(writer, LengthDelimitedCodec::new());

    while let Some(res) = reader.next().await {
        let data = match res {
            Ok(data) => data,
            Err(err) => {
                log::error!("Failed to receive data from host: {err}");
                break;
            }
        };
        log::trace!("Received {} bytes from host", data.len());

        let msg = match bincode::deserialize(&data) {
            Ok(msg) => msg,
            Err(err) => {
                log::error!("Failed to decode message from host: {err}");
                break;
            }
        };

        let Some(response) = handle_message(msg, &registry) else {
            break;
        };

        let out_data = match bincode::serialize(&response) {
            Ok(data) => data,
            Err(err) => {
                log::error!("Failed to encode response: {err}");
                break;
            }
        };

        if let Err(err) = writer.send(Bytes::from(out_data)).await {
            log::error!("Failed to send response: {err}");
            break;
        }
    }

    log::info!("Host at {peer} disconnected");
}
