use std::time::Duration;

use yocki_protocol::EnvelopeError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode or decode message: {0}")]
    Codec(#[from] bincode::Error),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("plugin returned an error: {0}")]
    Remote(String),

    #[error("got unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error("connection is unusable after an earlier failure; reconnect")]
    Broken,

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn timeout_display() {
        let err = Error::Timeout(Duration::from_secs(1));
        assert_eq!(err.to_string(), "no response within 1s");
    }

    #[test]
    fn envelope_error_is_transparent() {
        let inner = yocki_protocol::decode_response("nope").unwrap_err();
        let text = inner.to_string();
        let err: Error = inner.into();
        assert_eq!(err.to_string(), text);
    }
}
