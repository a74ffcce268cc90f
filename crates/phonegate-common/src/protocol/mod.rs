pub mod error;
pub mod jsonrpc;
pub mod worker;


pub use error::{GatewayError, Result};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use worker::{
    ActionResponse, CallActionRequest, IdentityListResponse, ListIdentitiesRequest,
    PlaceCallRequest, RegisterIdentityRequest, RegisterIdentityResponse,
    UnregisterIdentityRequest, WorkerCall, WorkerReply,
};
