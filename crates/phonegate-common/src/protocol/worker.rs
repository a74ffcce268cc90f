//! Softphone worker RPC surface
//!
//! Every operation the gateway can forward to a worker is a [`WorkerCall`].
//! A call knows its JSON-RPC method name, its parameters, the session key the
//! gateway routes it by, and how to decode the worker's result into a typed
//! [`WorkerReply`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::Result;

/// Register a SIP identity on a worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterIdentityRequest {
    pub identity: String,
    /// Registration details (credentials, registrar, display name, ...),
    /// passed through to the worker untouched.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl RegisterIdentityRequest {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnregisterIdentityRequest {
    pub identity: String,
}

impl UnregisterIdentityRequest {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListIdentitiesRequest {
    pub owner_identity: String,
}

impl ListIdentitiesRequest {
    pub fn new(owner_identity: impl Into<String>) -> Self {
        Self {
            owner_identity: owner_identity.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaceCallRequest {
    pub from_identity: String,
    pub destination: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl PlaceCallRequest {
    pub fn new(from_identity: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            from_identity: from_identity.into(),
            destination: destination.into(),
            metadata: Map::new(),
        }
    }
}

/// Target of answer/hangup/hold/resume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallActionRequest {
    pub call_id: String,
}

impl CallActionRequest {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterIdentityResponse {
    pub identity: String,
    pub registered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl ActionResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
            call_id: None,
        }
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IdentityListResponse {
    #[serde(default)]
    pub identities: Vec<String>,
}

/// One remote operation against a softphone worker.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerCall {
    RegisterIdentity(RegisterIdentityRequest),
    UnregisterIdentity(UnregisterIdentityRequest),
    ListIdentities(ListIdentitiesRequest),
    PlaceCall(PlaceCallRequest),
    Answer(CallActionRequest),
    Hangup(CallActionRequest),
    Hold(CallActionRequest),
    Resume(CallActionRequest),
}

/// Typed result of a [`WorkerCall`]. Serializes as the bare inner response.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum WorkerReply {
    Registered(RegisterIdentityResponse),
    Identities(IdentityListResponse),
    Action(ActionResponse),
}

impl WorkerCall {
    /// JSON-RPC method name on the worker.
    pub fn method(&self) -> &'static str {
        match self {
            WorkerCall::RegisterIdentity(_) => "register_identity",
            WorkerCall::UnregisterIdentity(_) => "unregister_identity",
            WorkerCall::ListIdentities(_) => "list_identities",
            WorkerCall::PlaceCall(_) => "place_call",
            WorkerCall::Answer(_) => "answer_call",
            WorkerCall::Hangup(_) => "hangup_call",
            WorkerCall::Hold(_) => "hold_call",
            WorkerCall::Resume(_) => "resume_call",
        }
    }

    /// Session identity this call is routed by: the SIP identity for identity
    /// operations, the call id for per-call actions.
    pub fn routing_key(&self) -> &str {
        match self {
            WorkerCall::RegisterIdentity(req) => &req.identity,
            WorkerCall::UnregisterIdentity(req) => &req.identity,
            WorkerCall::ListIdentities(req) => &req.owner_identity,
            WorkerCall::PlaceCall(req) => &req.from_identity,
            WorkerCall::Answer(req)
            | WorkerCall::Hangup(req)
            | WorkerCall::Hold(req)
            | WorkerCall::Resume(req) => &req.call_id,
        }
    }

    /// JSON-RPC params for this call.
    pub fn params(&self) -> Result<Value> {
        let params = match self {
            WorkerCall::RegisterIdentity(req) => serde_json::to_value(req)?,
            WorkerCall::UnregisterIdentity(req) => serde_json::to_value(req)?,
            WorkerCall::ListIdentities(req) => serde_json::to_value(req)?,
            WorkerCall::PlaceCall(req) => serde_json::to_value(req)?,
            WorkerCall::Answer(req)
            | WorkerCall::Hangup(req)
            | WorkerCall::Hold(req)
            | WorkerCall::Resume(req) => serde_json::to_value(req)?,
        };
        Ok(params)
    }

    /// Decodes a worker's JSON-RPC `result` into the reply type this call expects.
    pub fn decode_reply(&self, result: Value) -> Result<WorkerReply> {
        let reply = match self {
            WorkerCall::RegisterIdentity(_) => {
                WorkerReply::Registered(serde_json::from_value(result)?)
            }
            WorkerCall::ListIdentities(_) => {
                WorkerReply::Identities(serde_json::from_value(result)?)
            }
            _ => WorkerReply::Action(serde_json::from_value(result)?),
        };
        Ok(reply)
    }
}

impl WorkerReply {
    /// Whether the worker reported the operation as done.
    pub fn is_success(&self) -> bool {
        match self {
            WorkerReply::Registered(resp) => resp.registered,
            WorkerReply::Identities(_) => true,
            WorkerReply::Action(resp) => resp.success,
        }
    }
}

