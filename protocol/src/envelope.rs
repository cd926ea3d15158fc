use serde::{Deserialize, Serialize};

/// Function name carried by the envelope a malformed request decodes to
pub const SENTINEL_FN: &str = "err";

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("malformed envelope JSON `{text}`: {source}")]
    Json {
        text: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A named function request. Both fields are opaque to the protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallEnvelope {
    #[serde(rename = "Fn")]
    pub fn_name: String,
    #[serde(rename = "Arg")]
    pub arg: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "Buf")]
    pub buf: String,
}

impl CallEnvelope {
    pub fn new<S: ToString, T: ToString>(fn_name: S, arg: T) -> Self {
        Self {
            fn_name: fn_name.to_string(),
            arg: arg.to_string(),
        }
    }

    /// The `{fn: "err", arg: ""}` envelope
    pub fn sentinel() -> Self {
        Self::new(SENTINEL_FN, "")
    }

    pub fn is_sentinel(&self) -> bool {
        self.fn_name == SENTINEL_FN && self.arg.is_empty()
    }
}

impl ResponseEnvelope {
    pub fn new<S: ToString>(buf: S) -> Self {
        Self {
            buf: buf.to_string(),
        }
    }
}

impl From<String> for ResponseEnvelope {
    fn from(buf: String) -> Self {
        Self { buf }
    }
}

impl From<&str> for ResponseEnvelope {
    fn from(buf: &str) -> Self {
        Self::new(buf)
    }
}

/// Serializes a request as `{"Fn":..,"Arg":..}`
pub fn encode_request(request: &CallEnvelope) -> String {
    // A struct of two strings always serializes
    serde_json::to_string(request).unwrap_or_default()
}

/// Parses a request; anything that is not an object with string fields
/// `Fn` and `Arg` becomes the sentinel envelope.
pub fn decode_request(text: &str) -> CallEnvelope {
    match serde_json::from_str(text) {
        Ok(request) => request,
        Err(err) => {
            log::trace!("Treating malformed request as sentinel: {err}");
            CallEnvelope::sentinel()
        }
    }
}

/// Serializes a response as `{"Buf":..}`
pub fn encode_response(response: &ResponseEnvelope) -> String {
    serde_json::to_string(response).unwrap_or_default()
}

pub fn decode_response(text: &str) -> Result<ResponseEnvelope, EnvelopeError> {
    serde_json::from_str(text).map_err(|source| EnvelopeError::Json {
        text: text.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trip() {
        let request = CallEnvelope::new("SayHello", "{\"name\":\"Bob\",\"age\":30}");
        assert_eq!(decode_request(&encode_request(&request)), request);
    }

    #[test]
    fn request_round_trip_edge_strings() {
        let cases = [
            ("", ""),
            ("f", ""),
            ("say \"hi\"", "back\\slash"),
            ("SayHello", r#"{"Fn":"x","Arg":"y"}"#),
            ("err", "[1,2,3]"),
            ("line\nbreak", "unicode é ✓"),
        ];

        for (fn_name, arg) in cases {
            let request = CallEnvelope::new(fn_name, arg);
            assert_eq!(decode_request(&encode_request(&request)), request, "{fn_name:?} {arg:?}");
        }
    }

    #[test]
    fn request_key_order() {
        let text = encode_request(&CallEnvelope::new("f", "x"));
        assert_eq!(text, r#"{"Fn":"f","Arg":"x"}"#);
    }

    #[test]
    fn not_json_is_sentinel() {
        let request = decode_request("not json");
        assert_eq!(request, CallEnvelope::new("err", ""));
        assert!(request.is_sentinel());
    }

    #[test]
    fn wrong_shape_is_sentinel() {
        assert!(decode_request("[1, 2, 3]").is_sentinel());
        assert!(decode_request(r#"{"Fn":"f"}"#).is_sentinel());
        assert!(decode_request(r#"{"Fn":1,"Arg":"x"}"#).is_sentinel());
        assert!(decode_request("").is_sentinel());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let request = decode_request(r#"{"Arg":"a","Fn":"f","Extra":true}"#);
        assert_eq!(request, CallEnvelope::new("f", "a"));
    }

    #[test]
    fn response_is_compact() {
        assert_eq!(encode_response(&ResponseEnvelope::new("X")), r#"{"Buf":"X"}"#);
    }

    #[test]
    fn response_escapes_quotes() {
        let response = ResponseEnvelope::new("say \"hi\"");
        let text = encode_response(&response);

        assert_eq!(text, r#"{"Buf":"say \"hi\""}"#);
        assert_eq!(decode_response(&text).unwrap(), response);
    }

    #[test]
    fn malformed_response_is_error() {
        let err = decode_response("I'm Rust").unwrap_err();
        assert!(err.to_string().contains("I'm Rust"));
    }
}
