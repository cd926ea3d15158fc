use yocki_protocol::{decode_request, encode_response, CallEnvelope, ResponseEnvelope};

/// Something that answers a raw request string with a raw response string
pub trait Handler: Send + Sync {
    fn call(&self, request: &str) -> String;
}

impl<F> Handler for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn call(&self, request: &str) -> String {
        self(request)
    }
}

/// Invokes `handler` once with `request` and hands back whatever it returned
#[inline]
pub fn dispatch<H: Handler + ?Sized>(handler: &H, request: &str) -> String {
    handler.call(request)
}

/// Wraps a function over envelopes into a raw handler.
///
/// Malformed requests reach `f` as the sentinel envelope.
pub fn typed<F>(f: F) -> impl Handler
where
    F: Fn(CallEnvelope) -> ResponseEnvelope + Send + Sync,
{
    move |request: &str| -> String { encode_response(&f(decode_request(request))) }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dispatch_is_pass_through() {
        let upper = |req: &str| req.to_uppercase();

        for request in ["", "abc", "{\"Fn\":\"x\",\"Arg\":\"y\"}", "not json"] {
            assert_eq!(dispatch(&upper, request), upper(request));
        }
    }

    #[test]
    fn dispatch_calls_exactly_once() {
        let count = AtomicUsize::new(0);
        let handler = |_: &str| {
            count.fetch_add(1, Ordering::SeqCst);
            String::from("ok")
        };

        assert_eq!(dispatch(&handler, "req"), "ok");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_through_trait_object() {
        let handler: Box<dyn Handler> = Box::new(|req: &str| format!("<{req}>"));
        assert_eq!(dispatch(handler.as_ref(), "x"), "<x>");
    }

    #[test]
    fn typed_handler_wraps_envelopes() {
        let handler = typed(|req| ResponseEnvelope::new(format!("{}:{}", req.fn_name, req.arg)));
        let response = dispatch(&handler, r#"{"Fn":"SayHello","Arg":"Bob"}"#);

        assert_eq!(response, r#"{"Buf":"SayHello:Bob"}"#);
    }

    #[test]
    fn typed_handler_sees_sentinel() {
        let handler = typed(|req| ResponseEnvelope::new(req.is_sentinel().to_string()));
        assert_eq!(dispatch(&handler, "garbage"), r#"{"Buf":"true"}"#);
    }
}
