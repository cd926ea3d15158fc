use std::path::Path;

pub use log::{debug, error, info, trace, warn};

use log::LevelFilter;

use crate::Error;

#[macro_export]
macro_rules! fatal {
    ($($args:tt)*) => {{
        $crate::logging::error!("Got fatal error: {}", format!($($args)*));
        panic!($($args)*);
    }}
}

pub use crate::fatal;

fn level_from_env() -> LevelFilter {
    std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Logs to `log_file` if given, otherwise to stderr through `env_logger`
pub fn init(log_file: Option<&Path>) -> Result<(), Error> {
    match log_file {
        Some(path) => simple_logging::log_to_file(path, level_from_env())
            .map_err(|err| Error::Logger(format!("cannot log to {}: {err}", path.display()))),
        None => env_logger::try_init().map_err(|err| Error::Logger(format!("{err}"))),
    }
}

#[cfg(test)]
mod tests {
    #[test]
    #[should_panic(expected = "handler table corrupted: 3")]
    fn fatal_panics_with_message() {
        crate::fatal!("handler table corrupted: {}", 3);
    }

    #[test]
    fn missing_log_directory_is_error() {
        let err = super::init(Some(std::path::Path::new("/nonexistent/dir/plugin.log"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dir/plugin.log"));
    }
}
