//! # JSON-RPC 2.0 Envelopes and Framing
//!
//! Transport-agnostic JSON-RPC 2.0 message types plus a header-delimited
//! codec that moves them over any async byte stream.
//!
//! ## Features
//! - Request, notification and response envelopes with strict classification
//! - Extended error-code taxonomy, including connection-level codes
//! - `Content-Length` framed reader and writer behind the `codec` feature

pub mod error;
pub mod message;
pub mod notification;
pub mod prelude;
pub mod request;
pub mod response;
pub mod types;

#[cfg(feature = "codec")]
pub mod codec;

// Re-export main types
pub use error::{JsonRpcError, JsonRpcErrorCode, ReadError, ResponseError, WriteError};
pub use message::JsonRpcEnvelope;
pub use notification::JsonRpcNotification;
pub use request::JsonRpcRequest;
pub use response::{JsonRpcResponse, ResponseMessage};
pub use types::{JsonRpcVersion, RequestId};

#[cfg(feature = "codec")]
pub use codec::{
    ContentEncoding, MessageReader, MessageWriter, PartialMessageInfo, ReaderOptions,
    WriterOptions,
};
