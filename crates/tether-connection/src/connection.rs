//! The message connection engine

use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Instant;
use tether_json_rpc::codec::{MessageReader, MessageWriter, PartialMessageInfo};
use tether_json_rpc::{
    JsonRpcEnvelope, JsonRpcErrorCode, JsonRpcNotification, JsonRpcRequest, RequestId,
    ResponseError, ResponseMessage,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cancellation::{CancellationToken, CancellationTokenSource, Subscription};
use crate::config::{ConnectionOptions, Trace};
use crate::descriptor::{Arity, NotificationSignature, RequestSignature};
use crate::error::{ConnectionError, ConnectionResult, TransportError};
use crate::handler::{FunctionRequestHandler, HandlerRegistry, RequestHandler, panic_message};
use crate::logger::Logger;
use crate::params::{Params, adapt_params, build_params};

/// Notification a peer sends to ask for an in-flight request to stop.
/// Params are `{"id": <request id>}`.
pub const CANCEL_REQUEST_METHOD: &str = "$/cancelRequest";

const DISPOSED_MESSAGE: &str = "The connection got disposed.";

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, sends allowed, nothing read yet
    Initial,
    /// Inbound envelopes are being dispatched
    Listening,
    /// Terminal
    Disposed,
}

type BoxedReader = MessageReader<Box<dyn AsyncRead + Send + Unpin>>;
type ErrorListener = Arc<dyn Fn(&TransportError) + Send + Sync>;
type PartialMessageListener = Arc<dyn Fn(&PartialMessageInfo) + Send + Sync>;
type OnceListener = Box<dyn FnOnce() + Send>;

struct PendingRequest {
    method: String,
    sent_at: Instant,
    sender: oneshot::Sender<Result<Value, ResponseError>>,
    subscription: Option<Subscription>,
}

impl PendingRequest {
    fn settle(self, result: Result<Value, ResponseError>) {
        if let Some(subscription) = self.subscription {
            subscription.dispose();
        }
        // The caller may have dropped the response future
        let _ = self.sender.send(result);
    }
}

#[derive(Default)]
struct Listeners {
    error: Vec<ErrorListener>,
    partial_message: Vec<PartialMessageListener>,
    close: Vec<OnceListener>,
    dispose: Vec<OnceListener>,
    closed: bool,
}

struct Inner {
    state: Mutex<ConnectionState>,
    options: ConnectionOptions,
    logger: Arc<dyn Logger>,
    next_id: AtomicI64,
    outbound: Mutex<Option<mpsc::UnboundedSender<JsonRpcEnvelope>>>,
    reader: Mutex<Option<BoxedReader>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
    pending: Mutex<HashMap<RequestId, PendingRequest>>,
    request_tokens: Mutex<HashMap<RequestId, Arc<CancellationTokenSource>>>,
    handlers: Mutex<HandlerRegistry>,
    listeners: Mutex<Listeners>,
}

/// A bidirectional JSON-RPC connection over a pair of byte streams.
///
/// Either side may send requests and notifications at any time; inbound
/// envelopes are dispatched to registered handlers once [`listen`] is
/// called. Cloning yields another handle to the same connection.
///
/// ```rust,no_run
/// use tether_connection::prelude::*;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// const ECHO: RequestType = RequestType::new("echo", 1);
///
/// let connection = MessageConnection::new(tokio::io::stdin(), tokio::io::stdout(), NullLogger);
/// connection.on_request(&ECHO, |params, _token| async move { Ok(params.value(0).clone()) });
/// connection.listen()?;
///
/// let answer = connection.send_request(&ECHO, args!["hello"])?.await?;
/// # Ok(())
/// # }
/// ```
///
/// [`listen`]: MessageConnection::listen
#[derive(Clone)]
pub struct MessageConnection {
    inner: Arc<Inner>,
}

impl MessageConnection {
    /// Create a connection with default options.
    ///
    /// Must be called within a Tokio runtime: the outbound writer task is
    /// spawned immediately so sends work before `listen()`.
    pub fn new<R, W, L>(reader: R, writer: W, logger: L) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
        L: Logger + 'static,
    {
        Self::with_options(reader, writer, logger, ConnectionOptions::default())
    }

    pub fn with_options<R, W, L>(
        reader: R,
        writer: W,
        logger: L,
        options: ConnectionOptions,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
        L: Logger + 'static,
    {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        let reader = MessageReader::with_options(reader, options.reader.clone());
        let writer = MessageWriter::with_options(writer, options.writer.clone());
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            state: Mutex::new(ConnectionState::Initial),
            options,
            logger: Arc::new(logger),
            next_id: AtomicI64::new(1),
            outbound: Mutex::new(Some(outbound_tx)),
            reader: Mutex::new(Some(reader)),
            reader_task: Mutex::new(None),
            pending: Mutex::new(HashMap::new()),
            request_tokens: Mutex::new(HashMap::new()),
            handlers: Mutex::new(HandlerRegistry::default()),
            listeners: Mutex::new(Listeners::default()),
        });

        tokio::spawn(run_writer(writer, outbound_rx, Arc::downgrade(&inner)));

        Self { inner }
    }

    /// Start dispatching inbound envelopes.
    ///
    /// Fails with [`ConnectionError::AlreadyListening`] on a second call and
    /// with [`ConnectionError::Disposed`] after disposal.
    pub fn listen(&self) -> ConnectionResult<()> {
        let mut state = self.inner.state.lock();
        match *state {
            ConnectionState::Initial => {}
            ConnectionState::Listening => return Err(ConnectionError::AlreadyListening),
            ConnectionState::Disposed => return Err(ConnectionError::Disposed),
        }
        let mut reader = self
            .inner
            .reader
            .lock()
            .take()
            .ok_or(ConnectionError::AlreadyListening)?;
        *state = ConnectionState::Listening;

        let weak = Arc::downgrade(&self.inner);
        reader.on_error(move |error| {
            if let Some(inner) = weak.upgrade() {
                inner.report_error(TransportError::Read(error));
            }
        });

        let weak = Arc::downgrade(&self.inner);
        reader.on_partial_message(move |info| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_partial_message(info);
            }
        });

        let weak = Arc::downgrade(&self.inner);
        reader.on_close(move || {
            if let Some(inner) = weak.upgrade() {
                inner.handle_close();
            }
        });

        let inner = Arc::clone(&self.inner);
        let task = reader.listen(move |envelope| inner.dispatch(envelope));
        *self.inner.reader_task.lock() = Some(task);

        debug!("Connection listening");
        Ok(())
    }

    /// Send a request and get a future for its response.
    ///
    /// Fails synchronously if the connection is disposed.
    pub fn send_request<S>(
        &self,
        signature: &S,
        args: Vec<Value>,
    ) -> ConnectionResult<PendingResponse>
    where
        S: RequestSignature + ?Sized,
    {
        let params = build_params(signature.arity(), args);
        let (id, receiver) = self.inner.start_request(signature.method(), params)?;
        Ok(PendingResponse { id, receiver })
    }

    /// Send a request whose cancellation is forwarded to the peer.
    ///
    /// When `token` is cancelled while the request is still pending, a
    /// `$/cancelRequest` notification is sent. The response future keeps
    /// waiting for whatever the peer answers.
    pub fn send_request_with_token<S>(
        &self,
        signature: &S,
        args: Vec<Value>,
        token: &CancellationToken,
    ) -> ConnectionResult<PendingResponse>
    where
        S: RequestSignature + ?Sized,
    {
        let params = build_params(signature.arity(), args);
        let (id, receiver) = self.inner.start_request(signature.method(), params)?;

        let weak = Arc::downgrade(&self.inner);
        let cancel_id = id.clone();
        let subscription = token.on_cancellation_requested(move || {
            if let Some(inner) = weak.upgrade() {
                inner.send_cancellation(cancel_id);
            }
        });

        match self.inner.pending.lock().get_mut(&id) {
            Some(entry) => entry.subscription = Some(subscription),
            None => subscription.dispose(),
        }

        Ok(PendingResponse { id, receiver })
    }

    /// Send a notification. Fails synchronously if the connection is disposed.
    pub fn send_notification<S>(&self, signature: &S, args: Vec<Value>) -> ConnectionResult<()>
    where
        S: NotificationSignature + ?Sized,
    {
        let params = build_params(signature.arity(), args);
        self.inner.notify(signature.method(), params)
    }

    /// Register the handler for a request method; replaces any previous one.
    pub fn on_request<S, F, Fut>(&self, signature: &S, handler: F)
    where
        S: RequestSignature + ?Sized,
        F: Fn(Params, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ResponseError>> + Send + 'static,
    {
        self.on_request_handler(signature, FunctionRequestHandler::new(handler));
    }

    /// Register a [`RequestHandler`] implementation for a request method.
    pub fn on_request_handler<S, H>(&self, signature: &S, handler: H)
    where
        S: RequestSignature + ?Sized,
        H: RequestHandler + 'static,
    {
        self.inner.handlers.lock().insert_request(
            signature.method(),
            signature.arity(),
            Arc::new(handler),
        );
    }

    /// Register the handler for a notification method; replaces any previous one.
    pub fn on_notification<S, F>(&self, signature: &S, handler: F)
    where
        S: NotificationSignature + ?Sized,
        F: Fn(Params) + Send + Sync + 'static,
    {
        self.inner.handlers.lock().insert_notification(
            signature.method(),
            signature.arity(),
            Arc::new(handler),
        );
    }

    /// Fallback for requests without a handler. It receives the method name
    /// and the params spread as untyped positional arguments.
    pub fn on_unhandled_request<F, Fut>(&self, handler: F)
    where
        F: Fn(String, Params, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ResponseError>> + Send + 'static,
    {
        self.inner.handlers.lock().unhandled_request =
            Some(Arc::new(move |method: String, params: Params, token: CancellationToken| {
                handler(method, params, token).boxed()
            }));
    }

    /// Fallback for notifications without a handler
    pub fn on_unhandled_notification<F>(&self, handler: F)
    where
        F: Fn(&JsonRpcNotification) + Send + Sync + 'static,
    {
        self.inner.handlers.lock().unhandled_notification = Some(Arc::new(handler));
    }

    /// Listen for read and write failures
    pub fn on_error<F>(&self, listener: F)
    where
        F: Fn(&TransportError) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().error.push(Arc::new(listener));
    }

    /// Listen for frames whose body is slow to arrive
    pub fn on_partial_message<F>(&self, listener: F)
    where
        F: Fn(&PartialMessageInfo) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().partial_message.push(Arc::new(listener));
    }

    /// Fires once when the inbound stream ends; immediately if it already has
    pub fn on_close<F>(&self, listener: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut listeners = self.inner.listeners.lock();
        if listeners.closed {
            drop(listeners);
            listener();
        } else {
            listeners.close.push(Box::new(listener));
        }
    }

    /// Fires once at disposal; immediately if already disposed
    pub fn on_dispose<F>(&self, listener: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let state = self.inner.state.lock();
        if *state == ConnectionState::Disposed {
            drop(state);
            listener();
        } else {
            self.inner.listeners.lock().dispose.push(Box::new(listener));
        }
    }

    /// Tear the connection down. Calling it again does nothing.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    pub fn is_listening(&self) -> bool {
        self.state() == ConnectionState::Listening
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == ConnectionState::Disposed
    }

    /// Outbound requests still waiting for a response
    pub fn pending_request_count(&self) -> usize {
        self.inner.pending.lock().len()
    }
}

impl fmt::Debug for MessageConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageConnection")
            .field("state", &self.state())
            .field("pending_requests", &self.pending_request_count())
            .field("handlers", &*self.inner.handlers.lock())
            .finish()
    }
}

/// Future for the response to one outbound request
#[derive(Debug)]
pub struct PendingResponse {
    id: RequestId,
    receiver: oneshot::Receiver<Result<Value, ResponseError>>,
}

impl PendingResponse {
    /// The id the request went out with
    pub fn id(&self) -> &RequestId {
        &self.id
    }
}

impl Future for PendingResponse {
    type Output = Result<Value, ResponseError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|received| {
            received.unwrap_or_else(|_| Err(disposed_error()))
        })
    }
}

fn disposed_error() -> ResponseError {
    ResponseError::new(
        JsonRpcErrorCode::PendingResponseRejected,
        Some(DISPOSED_MESSAGE.to_string()),
        None,
    )
}

impl Inner {
    fn start_request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> ConnectionResult<(RequestId, oneshot::Receiver<Result<Value, ResponseError>>)> {
        // Held until the entry is in place so dispose() cannot slip in between
        let state = self.state.lock();
        if *state == ConnectionState::Disposed {
            return Err(ConnectionError::Disposed);
        }

        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().insert(
            id.clone(),
            PendingRequest {
                method: method.to_string(),
                sent_at: Instant::now(),
                sender,
                subscription: None,
            },
        );

        let request = JsonRpcRequest::new(id.clone(), method.to_string(), params);
        let name = format!("{} - ({})", method, id);
        let trace = self.trace_message("Sending", "request", &name, request.params.as_ref());

        if let Err(e) = self.enqueue(request.into()) {
            self.pending.lock().remove(&id);
            return Err(e);
        }
        drop(state);
        // The logger may call back into the connection
        self.log_trace(trace);

        debug!(method = method, id = %id, "Sent request");
        Ok((id, receiver))
    }

    fn notify(&self, method: &str, params: Option<Value>) -> ConnectionResult<()> {
        let state = self.state.lock();
        if *state == ConnectionState::Disposed {
            return Err(ConnectionError::Disposed);
        }

        let trace = self.trace_message("Sending", "notification", method, params.as_ref());
        self.enqueue(JsonRpcNotification::new(method.to_string(), params).into())?;
        drop(state);
        self.log_trace(trace);

        debug!(method = method, "Sent notification");
        Ok(())
    }

    fn enqueue(&self, envelope: JsonRpcEnvelope) -> ConnectionResult<()> {
        let outbound = self.outbound.lock();
        let sender = outbound.as_ref().ok_or(ConnectionError::Closed)?;
        sender.send(envelope).map_err(|_| ConnectionError::Closed)
    }

    fn send_cancellation(&self, id: RequestId) {
        if !self.pending.lock().contains_key(&id) {
            return;
        }
        debug!(id = %id, "Forwarding cancellation");
        if let Err(e) = self.notify(CANCEL_REQUEST_METHOD, Some(json!({ "id": id }))) {
            debug!(id = %id, error = %e, "Cancellation not sent");
        }
    }

    fn dispatch(self: &Arc<Self>, envelope: JsonRpcEnvelope) {
        match envelope {
            JsonRpcEnvelope::Request(request) => self.handle_request(request),
            JsonRpcEnvelope::Notification(notification) => self.handle_notification(notification),
            JsonRpcEnvelope::Response(response) => self.handle_response(response),
        }
    }

    fn handle_request(self: &Arc<Self>, request: JsonRpcRequest) {
        let JsonRpcRequest { id, method, params, .. } = request;
        let received_at = Instant::now();
        let name = format!("{} - ({})", method, id);
        self.trace_received("request", &name, params.as_ref());

        let source = Arc::new(CancellationTokenSource::new());
        let token = source.token();
        self.request_tokens.lock().insert(id.clone(), source);

        let (registered, unhandled) = {
            let handlers = self.handlers.lock();
            (handlers.request(&method), handlers.unhandled_request.clone())
        };

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let invocation = {
                let method = method.clone();
                async move {
                    match (registered, unhandled) {
                        (Some(registered), _) => {
                            let params = adapt_params(registered.arity, params);
                            registered.handler.handle(params, token).await
                        }
                        (None, Some(fallback)) => {
                            let params = adapt_params(Arity::Variadic, params);
                            fallback(method, params, token).await
                        }
                        (None, None) => Err(ResponseError::method_not_found(&method)),
                    }
                }
            };

            let result = match AssertUnwindSafe(invocation).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    inner.logger.error(&message);
                    Err(ResponseError::internal_error(Some(message)))
                }
            };

            inner.request_tokens.lock().remove(&id);
            inner.reply(id, &method, result, received_at);
        });
    }

    fn reply(
        &self,
        id: RequestId,
        method: &str,
        result: Result<Value, ResponseError>,
        received_at: Instant,
    ) {
        if *self.state.lock() == ConnectionState::Disposed {
            debug!(id = %id, method = method, "Connection disposed, dropping response");
            return;
        }

        if self.options.trace.is_on() {
            let mut message = format!(
                "Sending response '{} - ({})'. Processing request took {}ms",
                method,
                id,
                received_at.elapsed().as_millis()
            );
            if self.options.trace == Trace::Verbose {
                match &result {
                    Ok(value) => message.push_str(&format!("\nResult: {}", value)),
                    Err(error) => message.push_str(&format!("\nError: {}", error)),
                }
            }
            self.logger.log(&message);
        }

        if let Err(error) = &result {
            debug!(id = %id, method = method, code = error.code, "Request failed");
        }

        let response = ResponseMessage::from_result(id, result);
        if let Err(e) = self.enqueue(response.into()) {
            debug!(method = method, error = %e, "Response not sent");
        }
    }

    fn handle_notification(self: &Arc<Self>, notification: JsonRpcNotification) {
        self.trace_received(
            "notification",
            &notification.method,
            notification.params.as_ref(),
        );

        if notification.method == CANCEL_REQUEST_METHOD {
            self.handle_cancellation(notification.params.as_ref());
            return;
        }

        let (registered, unhandled) = {
            let handlers = self.handlers.lock();
            (
                handlers.notification(&notification.method),
                handlers.unhandled_notification.clone(),
            )
        };

        let outcome = match (registered, unhandled) {
            (Some(registered), _) => {
                let params = adapt_params(registered.arity, notification.params.clone());
                std::panic::catch_unwind(AssertUnwindSafe(|| registered.handler.handle(params)))
            }
            (None, Some(fallback)) => {
                std::panic::catch_unwind(AssertUnwindSafe(|| fallback(&notification)))
            }
            (None, None) => {
                debug!(method = %notification.method, "No handler for notification, discarding");
                Ok(())
            }
        };

        if let Err(panic) = outcome {
            let message = format!(
                "Notification handler '{}' failed: {}",
                notification.method,
                panic_message(panic.as_ref())
            );
            self.logger.error(&message);
        }
    }

    fn handle_cancellation(&self, params: Option<&Value>) {
        let Some(id) = params.and_then(|p| p.get("id")).and_then(RequestId::from_value) else {
            warn!("Malformed cancellation notification");
            return;
        };

        let source = self.request_tokens.lock().get(&id).cloned();
        match source {
            Some(source) => {
                debug!(id = %id, "Peer cancelled request");
                source.cancel();
            }
            None => debug!(id = %id, "Cancellation for unknown request ignored"),
        }
    }

    fn handle_response(&self, response: ResponseMessage) {
        let Some(id) = response.id().cloned() else {
            if let ResponseMessage::Error(error) = &response {
                self.logger.error(&format!(
                    "Received response message without id: Error is: {}",
                    error.error
                ));
            }
            return;
        };

        let entry = self.pending.lock().remove(&id);
        let Some(entry) = entry else {
            warn!(id = %id, "Response for unknown request");
            self.logger.warn(&format!(
                "Received response message without active response promise ({})",
                id
            ));
            return;
        };

        if self.options.trace.is_on() {
            let mut message = format!(
                "Received response '{} - ({})' in {}ms.",
                entry.method,
                id,
                entry.sent_at.elapsed().as_millis()
            );
            if self.options.trace == Trace::Verbose {
                match &response {
                    ResponseMessage::Response(ok) => {
                        message.push_str(&format!("\nResult: {}", ok.result))
                    }
                    ResponseMessage::Error(err) => {
                        message.push_str(&format!("\nError: {}", err.error))
                    }
                }
            }
            self.logger.log(&message);
        }

        entry.settle(response.into_result());
    }

    fn handle_partial_message(&self, info: PartialMessageInfo) {
        self.logger.info(&format!(
            "Message {} is incomplete after {}ms ({} of {} bytes)",
            info.message_token,
            info.waiting_time.as_millis(),
            info.bytes_received,
            info.content_length
        ));
        let listeners = self.listeners.lock().partial_message.clone();
        for listener in listeners {
            listener(&info);
        }
    }

    fn report_error(&self, error: TransportError) {
        self.logger.error(&error.to_string());
        let listeners = self.listeners.lock().error.clone();
        for listener in listeners {
            listener(&error);
        }
    }

    fn handle_close(&self) {
        debug!("Inbound stream closed");
        let listeners = {
            let mut listeners = self.listeners.lock();
            listeners.closed = true;
            std::mem::take(&mut listeners.close)
        };
        for listener in listeners {
            listener();
        }
    }

    fn dispose(&self) {
        {
            let mut state = self.state.lock();
            if *state == ConnectionState::Disposed {
                return;
            }
            *state = ConnectionState::Disposed;
        }
        debug!("Disposing connection");

        // Queued envelopes still drain before the writer shuts the sink
        self.outbound.lock().take();
        if let Some(task) = self.reader_task.lock().take() {
            task.abort();
        }
        self.reader.lock().take();

        let pending: Vec<_> = self.pending.lock().drain().collect();
        for (id, entry) in pending {
            debug!(id = %id, method = %entry.method, "Rejecting pending request");
            entry.settle(Err(disposed_error()));
        }

        let tokens: Vec<_> = self.request_tokens.lock().drain().collect();
        for (_, source) in tokens {
            source.cancel();
        }

        let listeners = std::mem::take(&mut self.listeners.lock().dispose);
        for listener in listeners {
            listener();
        }
    }

    fn trace_received(&self, kind: &str, name: &str, params: Option<&Value>) {
        let trace = self.trace_message("Received", kind, name, params);
        self.log_trace(trace);
    }

    fn trace_message(
        &self,
        direction: &str,
        kind: &str,
        name: &str,
        params: Option<&Value>,
    ) -> Option<String> {
        if !self.options.trace.is_on() {
            return None;
        }
        let mut message = format!("{} {} '{}'.", direction, kind, name);
        if self.options.trace == Trace::Verbose {
            match params {
                Some(params) => message.push_str(&format!("\nParams: {}", params)),
                None => message.push_str("\nNo parameters provided."),
            }
        }
        Some(message)
    }

    fn log_trace(&self, message: Option<String>) {
        if let Some(message) = message {
            self.logger.log(&message);
        }
    }
}

async fn run_writer<W>(
    mut writer: MessageWriter<W>,
    mut outbound: mpsc::UnboundedReceiver<JsonRpcEnvelope>,
    inner: Weak<Inner>,
) where
    W: AsyncWrite + Unpin,
{
    debug!("Message writer started");

    while let Some(envelope) = outbound.recv().await {
        if let Err(e) = writer.write(&envelope).await {
            warn!(error = %e, "Failed to write message");
            if let Some(inner) = inner.upgrade() {
                inner.report_error(TransportError::Write(e));
                inner.dispose();
            }
            return;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!(error = %e, "Writer shutdown failed");
    }
    debug!("Message writer stopped");
}
