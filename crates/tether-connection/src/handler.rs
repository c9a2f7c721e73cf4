//! Handler traits and the per-connection handler registry

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tether_json_rpc::{JsonRpcNotification, ResponseError};

use crate::cancellation::CancellationToken;
use crate::descriptor::Arity;
use crate::params::Params;

/// Answers inbound requests for one method
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle a request. The token flips if the peer asks to cancel;
    /// honoring it is up to the handler.
    async fn handle(&self, params: Params, token: CancellationToken)
    -> Result<Value, ResponseError>;
}

/// Receives inbound notifications for one method.
///
/// Runs inline on the dispatch path, in arrival order.
pub trait NotificationHandler: Send + Sync {
    fn handle(&self, params: Params);
}

/// A closure-based request handler
pub struct FunctionRequestHandler<F> {
    handler_fn: F,
}

impl<F, Fut> FunctionRequestHandler<F>
where
    F: Fn(Params, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ResponseError>> + Send + 'static,
{
    pub fn new(handler_fn: F) -> Self {
        Self { handler_fn }
    }
}

#[async_trait]
impl<F, Fut> RequestHandler for FunctionRequestHandler<F>
where
    F: Fn(Params, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ResponseError>> + Send + 'static,
{
    async fn handle(
        &self,
        params: Params,
        token: CancellationToken,
    ) -> Result<Value, ResponseError> {
        (self.handler_fn)(params, token).await
    }
}

impl<F> NotificationHandler for F
where
    F: Fn(Params) + Send + Sync,
{
    fn handle(&self, params: Params) {
        self(params)
    }
}

pub(crate) type UnhandledRequestFn = Arc<
    dyn Fn(String, Params, CancellationToken) -> BoxFuture<'static, Result<Value, ResponseError>>
        + Send
        + Sync,
>;
pub(crate) type UnhandledNotificationFn = Arc<dyn Fn(&JsonRpcNotification) + Send + Sync>;

#[derive(Clone)]
pub(crate) struct RegisteredRequest {
    pub arity: Arity,
    pub handler: Arc<dyn RequestHandler>,
}

#[derive(Clone)]
pub(crate) struct RegisteredNotification {
    pub arity: Arity,
    pub handler: Arc<dyn NotificationHandler>,
}

/// Handlers by method name; the last registration for a name wins
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    requests: HashMap<String, RegisteredRequest>,
    notifications: HashMap<String, RegisteredNotification>,
    pub unhandled_request: Option<UnhandledRequestFn>,
    pub unhandled_notification: Option<UnhandledNotificationFn>,
}

impl HandlerRegistry {
    pub fn insert_request(&mut self, method: &str, arity: Arity, handler: Arc<dyn RequestHandler>) {
        self.requests
            .insert(method.to_string(), RegisteredRequest { arity, handler });
    }

    pub fn insert_notification(
        &mut self,
        method: &str,
        arity: Arity,
        handler: Arc<dyn NotificationHandler>,
    ) {
        self.notifications
            .insert(method.to_string(), RegisteredNotification { arity, handler });
    }

    pub fn request(&self, method: &str) -> Option<RegisteredRequest> {
        self.requests.get(method).cloned()
    }

    pub fn notification(&self, method: &str) -> Option<RegisteredNotification> {
        self.notifications.get(method).cloned()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut requests: Vec<_> = self.requests.keys().collect();
        requests.sort();
        let mut notifications: Vec<_> = self.notifications.keys().collect();
        notifications.sort();

        f.debug_struct("HandlerRegistry")
            .field("requests", &requests)
            .field("notifications", &notifications)
            .field("unhandled_request", &self.unhandled_request.as_ref().map(|_| "function"))
            .field(
                "unhandled_notification",
                &self.unhandled_notification.as_ref().map(|_| "function"),
            )
            .finish()
    }
}

/// Turn a caught panic payload into an error message
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("Request handler panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("Request handler panicked: {s}")
    } else {
        "Request handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_function_handler_runs_closure() {
        let handler = FunctionRequestHandler::new(|params: Params, _token| async move {
            Ok(params.value(0).clone())
        });

        let result = handler
            .handle(Params::new(vec![json!("foo")]), CancellationToken::none())
            .await;
        assert_eq!(result.unwrap(), json!("foo"));
    }

    #[test]
    fn test_last_registration_wins() {
        struct Fixed(Value);

        #[async_trait]
        impl RequestHandler for Fixed {
            async fn handle(
                &self,
                _params: Params,
                _token: CancellationToken,
            ) -> Result<Value, ResponseError> {
                Ok(self.0.clone())
            }
        }

        let mut registry = HandlerRegistry::default();
        registry.insert_request("m", Arity::Fixed(1), Arc::new(Fixed(json!(1))));
        registry.insert_request("m", Arity::Fixed(2), Arc::new(Fixed(json!(2))));

        assert_eq!(registry.request("m").map(|r| r.arity), Some(Arity::Fixed(2)));
        assert!(registry.request("other").is_none());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "Request handler panicked: boom");

        let payload: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(payload.as_ref()), "Request handler panicked");
    }
}
