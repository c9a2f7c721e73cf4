//! # Connection Prelude
//!
//! ```rust
//! use tether_connection::prelude::*;
//! ```

pub use crate::args;
pub use crate::cancellation::{CancellationToken, CancellationTokenSource};
pub use crate::config::{ConnectionOptions, Trace};
pub use crate::connection::{ConnectionState, MessageConnection, PendingResponse};
pub use crate::descriptor::{NotificationType, RequestType};
pub use crate::error::{ConnectionError, ConnectionResult, TransportError};
pub use crate::handler::RequestHandler;
pub use crate::logger::{Logger, NullLogger, TracingLogger};
pub use crate::params::Params;

pub use tether_json_rpc::{JsonRpcErrorCode, RequestId, ResponseError};
