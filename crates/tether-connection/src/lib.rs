//! # JSON-RPC Message Connection
//!
//! A symmetric JSON-RPC 2.0 endpoint over any pair of async byte streams.
//! Both peers can issue requests and notifications; responses are routed
//! back to the caller by id.
//!
//! ## Features
//! - Typed method descriptors with positional parameter adaptation
//! - Concurrent outstanding requests in both directions
//! - Cooperative cancellation forwarded across the wire
//! - Explicit connection lifecycle with synchronous misuse errors
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tether_connection::prelude::*;
//!
//! const ADD: RequestType = RequestType::new("math/add", 2);
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection =
//!         MessageConnection::new(tokio::io::stdin(), tokio::io::stdout(), TracingLogger);
//!
//!     connection.on_request(&ADD, |params, _token| async move {
//!         let a: i64 = params.get(0)?;
//!         let b: i64 = params.get(1)?;
//!         Ok(serde_json::json!(a + b))
//!     });
//!     connection.listen()?;
//!
//!     let sum = connection.send_request(&ADD, args![1, 2])?.await?;
//!     println!("1 + 2 = {}", sum);
//!     Ok(())
//! }
//! ```

pub mod cancellation;
pub mod config;
pub mod connection;
pub mod descriptor;
pub mod error;
pub mod handler;
pub mod logger;
pub mod params;
pub mod prelude;

// Re-export main types
pub use cancellation::{CancellationToken, CancellationTokenSource, Subscription};
pub use config::{ConnectionOptions, Trace};
pub use connection::{CANCEL_REQUEST_METHOD, ConnectionState, MessageConnection, PendingResponse};
pub use descriptor::{
    Arity, MessageSignature, NotificationSignature, NotificationType, RequestSignature,
    RequestType,
};
pub use error::{ConnectionError, ConnectionResult, TransportError};
pub use handler::{FunctionRequestHandler, NotificationHandler, RequestHandler};
pub use logger::{Logger, NullLogger, TracingLogger};
pub use params::{Params, adapt_params, build_params};

// Wire-level types callers need alongside the connection
pub use tether_json_rpc::{
    ContentEncoding, JsonRpcErrorCode, JsonRpcNotification, PartialMessageInfo, ReaderOptions,
    RequestId, ResponseError, WriterOptions,
};

#[doc(hidden)]
pub mod __private {
    pub use serde_json::{Value, json};
}
