use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use yocki::Client;

#[derive(Parser)]
#[command(name = "yocki-host", about = "Talk to a running yocki plugin")]
struct Cli {
    /// Address of the plugin
    #[arg(long, default_value = "localhost:9090")]
    addr: String,

    /// How long to wait for the plugin to answer
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the plugin is alive
    Ping,
    /// Call a function and print its response buffer
    Call {
        /// Name the function was registered under
        func: String,
        /// Opaque argument string
        #[arg(default_value = "")]
        arg: String,
    },
}

fn run(cli: Cli) -> anyhow::Result<String> {
    let timeout = Duration::from_millis(cli.timeout_ms);
    let mut client = Client::connect(cli.addr.as_str(), timeout)
        .with_context(|| format!("Failed to connect to plugin at {}", cli.addr))?;

    match cli.command {
        Command::Ping => {
            client.ping().context("Ping failed")?;
            Ok(String::from("pong"))
        }
        Command::Call { func, arg } => {
            log::debug!("Calling \"{func}\" with `{arg}`");
            client
                .call(&func, arg)
                .with_context(|| format!("Call to \"{func}\" failed"))
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let output = run(Cli::parse())?;
    println!("{output}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use yocki::{Plugin, ResponseEnvelope};

    #[test]
    fn parses_call() {
        let cli = Cli::try_parse_from(["yocki-host", "--addr", "127.0.0.1:1", "call", "Echo", "x"])
            .unwrap();

        assert_eq!(cli.addr, "127.0.0.1:1");
        assert_eq!(cli.timeout_ms, 1000);
        match cli.command {
            Command::Call { func, arg } => {
                assert_eq!(func, "Echo");
                assert_eq!(arg, "x");
            }
            Command::Ping => panic!("expected call"),
        }
    }

    #[test]
    fn call_argument_defaults_to_empty() {
        let cli = Cli::try_parse_from(["yocki-host", "call", "SayHello"]).unwrap();
        assert!(matches!(cli.command, Command::Call { arg, .. } if arg.is_empty()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn runs_against_plugin() {
        let plugin = Plugin::new();
        plugin.register_typed("Echo", |req| ResponseEnvelope::new(req.arg));

        let bound = plugin.bind("127.0.0.1:0").await.unwrap();
        let addr = bound.local_addr().unwrap().to_string();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(bound.serve_until(async move {
            let _ = stop_rx.await;
        }));

        let outputs = tokio::task::spawn_blocking(move || {
            let ping = Cli::try_parse_from(["yocki-host", "--addr", addr.as_str(), "ping"]).unwrap();
            let call =
                Cli::try_parse_from(["yocki-host", "--addr", addr.as_str(), "call", "Echo", "hi"]).unwrap();
            (run(ping).unwrap(), run(call).unwrap())
        })
        .await
        .unwrap();

        assert_eq!(outputs, (String::from("pong"), String::from("hi")));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
