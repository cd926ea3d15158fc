pub use yocki_protocol::{
    decode_request, decode_response, encode_request, encode_response, CallEnvelope,
    PluginMessage, ResponseEnvelope,
};

mod error;
pub use error::Error;

mod dispatch;
pub use dispatch::*;

pub mod registry;
pub use registry::Registry;

mod config;
pub use config::*;

pub mod logging;

pub mod client;
pub use client::Client;

mod server;
pub use server::*;

pub mod ffi;

/// Sets up logging and the panic hook for a plugin process
pub fn internal_init(args: &PluginArgs) -> Result<(), Error> {
    logging::init(args.log_file.as_deref())?;
    set_panic_handler();
    Ok(())
}

/// Entry point generated by `#[plugin_main]`: parses the command line,
/// lets `setup` register handlers and serves until ctrl+c
pub fn internal_main<F: FnOnce(&mut Plugin)>(setup: F) {
    let args = PluginArgs::from_env();

    if let Err(err) = internal_init(&args) {
        eprintln!("Failed to set up plugin: {err}");
        std::process::exit(1);
    }

    let config = match PluginConfig::load(&args) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };

    let mut plugin = Plugin::new();
    setup(&mut plugin);
    log::debug!("Registered handlers: {:?}", plugin.registry().names());

    if let Err(err) = plugin.run_blocking(&config) {
        log::error!("Plugin stopped: {err}");
        std::process::exit(1);
    }
}

pub fn set_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        log::error!("Got panic: {info}");
    }));
}
