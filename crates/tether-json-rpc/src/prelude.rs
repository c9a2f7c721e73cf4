//! # JSON-RPC Prelude
//!
//! Convenient re-exports of the most commonly used envelope and codec types.
//!
//! ```rust
//! use tether_json_rpc::prelude::*;
//! ```

pub use crate::error::{JsonRpcError, JsonRpcErrorCode, ReadError, ResponseError, WriteError};
pub use crate::message::JsonRpcEnvelope;
pub use crate::notification::JsonRpcNotification;
pub use crate::request::JsonRpcRequest;
pub use crate::response::{JsonRpcResponse, ResponseMessage};
pub use crate::types::{JsonRpcVersion, RequestId};

#[cfg(feature = "codec")]
pub use crate::codec::{
    ContentEncoding, MessageReader, MessageWriter, PartialMessageInfo, ReaderOptions,
    WriterOptions,
};
