use serde::{Deserialize, Serialize};

mod envelope;
pub use envelope::*;

pub type CallResult = Result<ResponseEnvelope, String>;

/// Frames exchanged between a host and a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginMessage {
    PingRequest,
    PingResult,
    CallRequest(CallEnvelope),
    CallResult(CallResult),
}
