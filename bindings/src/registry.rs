use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use yocki_protocol::{
    decode_response, encode_request, encode_response, CallEnvelope, ResponseEnvelope,
};

use crate::dispatch::{dispatch, typed, Handler};
use crate::Error;

pub type SharedHandler = Arc<dyn Handler>;

/// Buffer returned for names nobody registered
pub const UNIMPLEMENTED_RESPONSE: &str = "unimplement method or bad request";

fn unimplemented(_request: &str) -> String {
    encode_response(&ResponseEnvelope::new(UNIMPLEMENTED_RESPONSE))
}

/// Maps function names to handlers
#[derive(Default)]
pub struct Registry {
    handlers: RwLock<HashMap<String, SharedHandler>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing and returning any
    /// previous handler of that name
    pub fn register<S, H>(&self, name: S, handler: H) -> Option<SharedHandler>
    where
        S: ToString,
        H: Handler + 'static,
    {
        let name = name.to_string();
        log::debug!("Registering handler for \"{name}\"");

        let previous = self.handlers.write().insert(name, Arc::new(handler));
        if previous.is_some() {
            log::debug!("Replaced existing handler");
        }

        previous
    }

    pub fn register_typed<S, F>(&self, name: S, f: F) -> Option<SharedHandler>
    where
        S: ToString,
        F: Fn(CallEnvelope) -> ResponseEnvelope + Send + Sync + 'static,
    {
        self.register(name, typed(f))
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.handlers.write().remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Looks up `name`, falling back to a handler that reports the method
    /// as unimplemented
    pub fn find(&self, name: &str) -> SharedHandler {
        match self.handlers.read().get(name) {
            Some(handler) => handler.clone(),
            None => {
                log::trace!("No handler registered for \"{name}\"");
                Arc::new(unimplemented)
            }
        }
    }

    /// Encodes `request`, runs it through the matching handler and parses
    /// the handler's output as a response envelope
    pub fn call(&self, request: &CallEnvelope) -> Result<ResponseEnvelope, Error> {
        let handler = self.find(&request.fn_name);
        let raw = dispatch(handler.as_ref(), &encode_request(request));

        Ok(decode_response(&raw)?)
    }
}
