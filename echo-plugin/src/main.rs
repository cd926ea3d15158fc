use serde::Deserialize;

use yocki::{CallEnvelope, Plugin, ResponseEnvelope};

#[derive(Deserialize)]
struct MultiplyArgs {
    left: i64,
    right: i64,
}

fn say_hello(_req: CallEnvelope) -> ResponseEnvelope {
    ResponseEnvelope::new("I'm Rust")
}

fn echo(req: CallEnvelope) -> ResponseEnvelope {
    ResponseEnvelope::new(req.arg)
}

/// Expects `{"left": .., "right": ..}` as the argument
fn multiply(req: CallEnvelope) -> ResponseEnvelope {
    match serde_json::from_str::<MultiplyArgs>(&req.arg) {
        Ok(args) => match args.left.checked_mul(args.right) {
            Some(result) => ResponseEnvelope::new(serde_json::json!({ "result": result })),
            None => ResponseEnvelope::new(serde_json::json!({ "error": "overflow" })),
        },
        Err(err) => ResponseEnvelope::new(serde_json::json!({ "error": err.to_string() })),
    }
}

#[yocki_macros::plugin_main]
fn main(plugin: &mut Plugin) {
    plugin.register_typed("SayHello", say_hello);
    plugin.register_typed("Echo", echo);
    plugin.register_typed("Multiply", multiply);
    plugin.register_typed("err", |_| ResponseEnvelope::new("bad request"));
}

#[cfg(test)]
mod tests {
    use super::*;

    use yocki::Registry;

    fn registry() -> Registry {
        let registry = Registry::new();
        registry.register_typed("SayHello", say_hello);
        registry.register_typed("Multiply", multiply);
        registry
    }

    #[test]
    fn hello() {
        let response = registry().call(&CallEnvelope::new("SayHello", "")).unwrap();
        assert_eq!(response.buf, "I'm Rust");
    }

    #[test]
    fn multiply_numbers() {
        let response = registry()
            .call(&CallEnvelope::new("Multiply", r#"{"left":6,"right":7}"#))
            .unwrap();
        assert_eq!(response.buf, r#"{"result":42}"#);
    }

    #[test]
    fn multiply_bad_args() {
        let response = registry()
            .call(&CallEnvelope::new("Multiply", "six times seven"))
            .unwrap();
        assert!(response.buf.starts_with(r#"{"error":"#));
    }

    #[test]
    fn multiply_overflow() {
        let arg = format!(r#"{{"left":{},"right":2}}"#, i64::MAX);
        let response = multiply(CallEnvelope::new("Multiply", arg));
        assert_eq!(response.buf, r#"{"error":"overflow"}"#);
    }

    #[test]
    fn echo_returns_argument() {
        assert_eq!(echo(CallEnvelope::new("Echo", "abc")).buf, "abc");
    }
}
