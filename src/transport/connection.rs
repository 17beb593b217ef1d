//! WebSocket connection and read loop.
//!
//! This module owns one physical WebSocket connection and multiplexes any
//! number of concurrent request/response calls over it.
//!
//! # Read Loop
//!
//! The connection spawns exactly one tokio task that reads every inbound
//! frame and routes it by correlation ID:
//!
//! - a registered waiter gets the response through its one-shot channel
//! - a recently expired request's late response is dropped
//! - anything else is a server push, queued for [`Transport::receive_next`]
//!
//! A read failure or an undecodable frame closes the connection and fails
//! every pending request with [`Error::ConnectionClosed`].
//!
//! # Locking
//!
//! The waiter registry (`parking_lot::Mutex`) is only held for map
//! operations. The write half (`tokio::sync::Mutex`) is only held while one
//! frame is written. Neither is held while the other is taken.
//!
//! Every write races its deadline and the connection state. A write that
//! fails or misses its deadline closes the connection, since the frame may
//! be half written. Callers queued behind it on the write lock give up with
//! [`Error::ConnectionClosed`] as soon as the close starts.
//!
//! # Closing
//!
//! Closing starts synchronously: the state moves to `Closing` and every
//! pending request fails. The read loop then sends the close frame, bounded
//! by a one second timeout, and publishes `Closed`.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::value::RawValue;
use tokio::net::TcpStream;
use tokio::sync::{Mutex as AsyncMutex, mpsc, oneshot, watch};
use tokio::time::{Instant, timeout, timeout_at};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderMap;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::CorrelationId;
use crate::protocol::{Envelope, RawEnvelope, ResultBody};

// ============================================================================
// Constants
// ============================================================================

/// Default time to wait for a response.
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time to wait for the WebSocket handshake.
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How many expired correlation IDs are remembered for dropping late responses.
const EXPIRED_WINDOW: usize = 1024;

/// Time allowed for the close handshake before the socket is dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Delivery side of a pending request.
type Waiter = oneshot::Sender<Result<ResultBody>>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle of a connection.
///
/// Progresses `Open → Closing → Closed` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepting requests.
    Open,
    /// Close started; pending requests have been failed.
    Closing,
    /// Physical connection released.
    Closed,
}

// ============================================================================
// TransportOptions
// ============================================================================

/// Timeouts applied by a [`Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// Time to wait for each response. The clock starts when the request's
    /// waiter is registered, just before the frame is written.
    pub response_timeout: Duration,

    /// Time to wait for the WebSocket handshake.
    pub handshake_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

impl TransportOptions {
    /// Sets the response timeout.
    #[inline]
    #[must_use]
    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Pending waiters plus a window of recently expired IDs.
#[derive(Default)]
struct Registry {
    waiters: FxHashMap<CorrelationId, Waiter>,
    expired: VecDeque<CorrelationId>,
    closed: bool,
}

/// Where the read loop sends an inbound frame.
enum Route {
    Waiter(Waiter),
    Expired,
    Push,
}

impl Registry {
    fn insert(&mut self, id: CorrelationId, waiter: Waiter) -> Result<()> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        self.waiters.insert(id, waiter);
        Ok(())
    }

    /// Retires a waiter that will not be delivered, remembering its ID so a
    /// late response is not mistaken for a push.
    fn expire(&mut self, id: CorrelationId) {
        if self.waiters.remove(&id).is_none() {
            return;
        }
        if self.expired.len() == EXPIRED_WINDOW {
            self.expired.pop_front();
        }
        self.expired.push_back(id);
    }

    fn route(&mut self, id: CorrelationId) -> Route {
        if let Some(waiter) = self.waiters.remove(&id) {
            return Route::Waiter(waiter);
        }
        match self.expired.iter().position(|expired| *expired == id) {
            Some(index) => {
                self.expired.remove(index);
                Route::Expired
            }
            None => Route::Push,
        }
    }

    /// Refuses further registrations and hands back every pending waiter.
    fn close(&mut self) -> Vec<Waiter> {
        self.closed = true;
        self.expired.clear();
        self.waiters.drain().map(|(_, waiter)| waiter).collect()
    }
}

/// Retires the waiter of an in-flight request when its `send` future
/// finishes or is dropped.
struct WaiterGuard<'a> {
    registry: &'a Mutex<Registry>,
    id: CorrelationId,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.registry.lock().expire(self.id);
    }
}

// ============================================================================
// Shared
// ============================================================================

/// State shared between transport handles and the read loop.
struct Shared {
    /// Last assigned correlation ID.
    next_id: AtomicU64,
    /// Pending waiters.
    registry: Mutex<Registry>,
    /// Write half, one frame at a time. Taken when the connection closes.
    writer: AsyncMutex<Option<WsSink>>,
    /// Server pushes queued by the read loop.
    pushes: AsyncMutex<mpsc::UnboundedReceiver<RawEnvelope>>,
    /// Connection lifecycle.
    state: watch::Sender<ConnectionState>,
    /// Timeouts.
    options: TransportOptions,
}

impl Shared {
    #[inline]
    fn next_correlation_id(&self) -> CorrelationId {
        CorrelationId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    #[inline]
    fn is_open(&self) -> bool {
        *self.state.borrow() == ConnectionState::Open
    }

    /// Writes one frame under the write lock.
    async fn write_frame(&self, frame: String) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let Some(sink) = writer.as_mut() else {
            return Err(Error::ConnectionClosed);
        };
        if !self.is_open() {
            return Err(Error::ConnectionClosed);
        }

        sink.send(Message::Text(frame.into()))
            .await
            .map_err(Error::WebSocket)
    }

    /// Writes one frame, giving up as soon as the connection leaves `Open`
    /// or `deadline` passes.
    ///
    /// A failed or stalled write closes the connection; `on_stall` builds
    /// the error returned for the stalled case.
    async fn write_until<F>(&self, frame: String, deadline: Instant, on_stall: F) -> Result<()>
    where
        F: FnOnce() -> Error,
    {
        let written = tokio::select! {
            biased;
            written = timeout_at(deadline, self.write_frame(frame)) => written,
            () = leaving_open(self.state.subscribe()) => return Err(Error::ConnectionClosed),
        };

        match written {
            Ok(Err(e @ Error::WebSocket(_))) => {
                warn!(error = %e, "WebSocket write failed");
                self.begin_close("write failed");
                Err(e)
            }
            Ok(result) => result,
            Err(_) => {
                // The frame may be half written.
                warn!("WebSocket write stalled past its deadline");
                self.begin_close("write stalled");
                Err(on_stall())
            }
        }
    }

    /// Starts the close sequence once: moves to `Closing`, fails every
    /// pending request and wakes the read loop, which releases the socket.
    ///
    /// Returns `false` if the sequence had already started.
    fn begin_close(&self, reason: &'static str) -> bool {
        let started = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Open {
                *state = ConnectionState::Closing;
                true
            } else {
                false
            }
        });

        if !started {
            return false;
        }

        debug!(reason, "Closing connection");

        let waiters = self.registry.lock().close();
        let count = waiters.len();
        for waiter in waiters {
            let _ = waiter.send(Err(Error::ConnectionClosed));
        }
        if count > 0 {
            debug!(count, "Failed pending requests on close");
        }

        true
    }

    /// Sends a close frame and drops the write half, within [`CLOSE_TIMEOUT`].
    async fn release_writer(&self) {
        let released = timeout(CLOSE_TIMEOUT, async {
            let mut writer = self.writer.lock().await;
            if let Some(mut sink) = writer.take()
                && let Err(e) = sink.close().await
            {
                debug!(error = %e, "WebSocket close handshake failed");
            }
        })
        .await;

        if released.is_err() {
            warn!("WebSocket close handshake timed out, dropping socket");
        }
    }

    /// Routes one inbound frame.
    fn route_frame(&self, text: &str, push_tx: &mpsc::UnboundedSender<RawEnvelope>) -> Result<()> {
        let envelope = RawEnvelope::parse(text)?;
        let id = envelope.id;

        let route = self.registry.lock().route(id);

        match route {
            Route::Waiter(waiter) => match ResultBody::parse(envelope.raw_data()) {
                Ok(body) => {
                    if waiter.send(Ok(body)).is_err() {
                        trace!(%id, "Waiter gone before delivery");
                    } else {
                        trace!(%id, "Response delivered");
                    }
                    Ok(())
                }
                Err(e) => {
                    let _ = waiter.send(Err(e));
                    Err(Error::protocol(format!("malformed result body for request {id}")))
                }
            },

            Route::Expired => {
                debug!(%id, "Dropping late response for expired request");
                Ok(())
            }

            Route::Push => {
                trace!(%id, "Queueing server push");
                if push_tx.send(envelope).is_err() {
                    warn!(%id, "Push receiver gone, dropping push");
                }
                Ok(())
            }
        }
    }
}

/// Resolves once the connection leaves `Open`, or once the state sender is gone.
async fn leaving_open(mut state: watch::Receiver<ConnectionState>) {
    loop {
        if *state.borrow_and_update() != ConnectionState::Open {
            return;
        }
        if state.changed().await.is_err() {
            return;
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Multiplexed request/response transport over one WebSocket connection.
///
/// Cloning is cheap; clones share the same connection.
///
/// # Thread Safety
///
/// `Transport` is `Send + Sync`. Any number of tasks may call
/// [`send`](Self::send) concurrently; each call only waits for its own
/// response. Physical writes are serialized, logical requests are not.
///
/// # Lifecycle
///
/// The connection stays open until [`close`](Self::close) is called, the
/// server closes it, a frame cannot be decoded, or every handle is dropped.
/// There is no reconnection: open a new `Transport` instead.
#[derive(Clone)]
pub struct Transport {
    shared: Arc<Shared>,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl Transport {
    /// Connects with default [`TransportOptions`].
    ///
    /// # Errors
    ///
    /// See [`connect_with_options`](Self::connect_with_options).
    pub async fn connect(url: &str, headers: &HeaderMap) -> Result<Self> {
        Self::connect_with_options(url, headers, TransportOptions::default()).await
    }

    /// Opens a WebSocket connection and starts its read loop.
    ///
    /// `headers` are attached to the handshake request (e.g. `Authorization`).
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if the URL is invalid, the target refuses the
    ///   connection, or the handshake/TLS negotiation fails
    /// - [`Error::ConnectionTimeout`] if the handshake does not complete in time
    pub async fn connect_with_options(
        url: &str,
        headers: &HeaderMap,
        options: TransportOptions,
    ) -> Result<Self> {
        let mut request = url
            .into_client_request()
            .map_err(|e| Error::connection(format!("invalid handshake request: {e}")))?;

        for (name, value) in headers {
            request.headers_mut().append(name.clone(), value.clone());
        }

        debug!(url, "Opening WebSocket connection");

        let (ws_stream, response) = timeout(options.handshake_timeout, connect_async(request))
            .await
            .map_err(|_| Error::connection_timeout(options.handshake_timeout.as_millis() as u64))?
            .map_err(|e| Error::connection(format!("WebSocket handshake failed: {e}")))?;

        info!(url, status = %response.status(), "WebSocket connection established");

        Ok(Self::from_stream(ws_stream, options))
    }

    /// Wraps an established stream and spawns the read loop.
    fn from_stream(ws_stream: WsStream, options: TransportOptions) -> Self {
        let (sink, source) = ws_stream.split();
        let (push_tx, push_rx) = mpsc::unbounded_channel();
        let (state, state_rx) = watch::channel(ConnectionState::Open);

        let shared = Arc::new(Shared {
            next_id: AtomicU64::new(0),
            registry: Mutex::new(Registry::default()),
            writer: AsyncMutex::new(Some(sink)),
            pushes: AsyncMutex::new(push_rx),
            state,
            options,
        });

        tokio::spawn(Self::run_read_loop(
            source,
            Arc::downgrade(&shared),
            state_rx,
            push_tx,
        ));

        Self { shared }
    }

    /// Sends a request and waits for its response with the default timeout.
    ///
    /// # Errors
    ///
    /// See [`send_with_timeout`](Self::send_with_timeout).
    pub async fn send<T>(&self, payload: &T) -> Result<Box<RawValue>>
    where
        T: Serialize + ?Sized,
    {
        self.send_with_timeout(payload, self.shared.options.response_timeout)
            .await
    }

    /// Sends a request and waits for its response.
    ///
    /// Returns the raw `ok` payload for the caller to decode.
    ///
    /// # Errors
    ///
    /// - [`Error::Remote`] if the server answered with `err`
    /// - [`Error::RequestTimeout`] if no response arrived in time; a late
    ///   response is dropped. If the frame itself could not be written in
    ///   time the connection is closed as well
    /// - [`Error::ConnectionClosed`] if the connection is or becomes closed
    /// - [`Error::WebSocket`] if the write failed (the connection is closed)
    /// - [`Error::Json`] if the payload cannot be serialized
    pub async fn send_with_timeout<T>(
        &self,
        payload: &T,
        response_timeout: Duration,
    ) -> Result<Box<RawValue>>
    where
        T: Serialize + ?Sized,
    {
        let id = self.shared.next_correlation_id();
        let (waiter, delivery) = oneshot::channel();

        // Registered before writing so a fast response always finds its waiter.
        self.shared.registry.lock().insert(id, waiter)?;
        let _guard = WaiterGuard {
            registry: &self.shared.registry,
            id,
        };
        let deadline = Instant::now() + response_timeout;

        let timeout_ms = response_timeout.as_millis() as u64;

        let frame = serde_json::to_string(&Envelope::new(id, payload))?;
        self.shared
            .write_until(frame, deadline, || Error::request_timeout(id, timeout_ms))
            .await?;
        trace!(%id, "Request sent");

        match timeout_at(deadline, delivery).await {
            Ok(Ok(body)) => body?.into_outcome(),
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                debug!(%id, "Request timed out");
                Err(Error::request_timeout(id, timeout_ms))
            }
        }
    }

    /// Writes an envelope that is not awaited.
    ///
    /// Used to answer a server-issued push with the push's own ID. The
    /// write is bounded by the response timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection is closed
    /// - [`Error::WebSocket`] if the write failed (the connection is closed)
    /// - [`Error::Connection`] if the write stalled (the connection is closed)
    pub async fn respond<T>(&self, id: CorrelationId, payload: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let limit = self.shared.options.response_timeout;
        let deadline = Instant::now() + limit;

        let frame = serde_json::to_string(&Envelope::new(id, payload))?;
        self.shared
            .write_until(frame, deadline, || {
                Error::connection(format!(
                    "reply {id} not written within {} ms",
                    limit.as_millis()
                ))
            })
            .await?;
        trace!(%id, "Reply sent");
        Ok(())
    }

    /// Waits for the next server push.
    ///
    /// Pushes are queued by the read loop in arrival order. Queued pushes
    /// are still returned after the connection closes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] once the connection is closed and
    /// the queue is drained.
    pub async fn receive_next(&self) -> Result<RawEnvelope> {
        let mut pushes = self.shared.pushes.lock().await;
        pushes.recv().await.ok_or(Error::ConnectionClosed)
    }

    /// Closes the connection.
    ///
    /// Fails every pending request with [`Error::ConnectionClosed`], sends a
    /// close frame and stops the read loop, then waits for
    /// [`ConnectionState::Closed`]. Safe to call repeatedly and concurrently;
    /// only the first call starts the close.
    ///
    /// The close handshake is abandoned after one second, so this returns
    /// even if a write is stuck on the socket.
    pub async fn close(&self) {
        if !self.shared.begin_close("closed by client") {
            trace!("Connection already closing");
        }
        self.closed().await;
    }

    /// Waits until the connection reaches [`ConnectionState::Closed`].
    pub async fn closed(&self) {
        let mut state = self.shared.state.subscribe();
        let _ = state
            .wait_for(|state| *state == ConnectionState::Closed)
            .await;
    }

    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Returns `true` while the connection accepts requests.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shared.is_open()
    }

    /// Returns the number of requests waiting for a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.registry.lock().waiters.len()
    }

    /// Read loop: the only reader of the connection.
    async fn run_read_loop(
        mut source: WsSource,
        shared: Weak<Shared>,
        mut state_rx: watch::Receiver<ConnectionState>,
        push_tx: mpsc::UnboundedSender<RawEnvelope>,
    ) {
        loop {
            // Any state change means the connection is leaving `Open`; an
            // error means every handle was dropped.
            let message = tokio::select! {
                _ = state_rx.changed() => {
                    debug!("Read loop stopping");
                    break;
                }
                message = source.next() => message,
            };

            let Some(strong) = shared.upgrade() else {
                break;
            };

            let routed = match message {
                Some(Ok(Message::Text(text))) => strong.route_frame(&text, &push_tx),

                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => strong.route_frame(text, &push_tx),
                    Err(e) => Err(Error::protocol(format!("binary frame is not UTF-8: {e}"))),
                },

                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "WebSocket closed by remote");
                    break;
                }

                Some(Err(e)) => {
                    error!(error = %e, "WebSocket read failed");
                    break;
                }

                None => {
                    debug!("WebSocket stream ended");
                    break;
                }

                // Ignore Ping, Pong, raw frames
                Some(Ok(_)) => Ok(()),
            };

            if let Err(e) = routed {
                error!(error = %e, "Undecodable frame, closing connection");
                break;
            }
        }

        drop(push_tx);

        let Some(shared) = shared.upgrade() else {
            debug!("Read loop terminated");
            return;
        };

        shared.begin_close("read loop ended");
        shared.release_writer().await;
        drop(source);

        shared.state.send_replace(ConnectionState::Closed);
        info!("Connection closed");
        debug!("Read loop terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use serde_json::{Value, json};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::http::HeaderValue;

    use crate::testing::MockServer;

    async fn open() -> (Transport, crate::testing::ServerConn) {
        let server = MockServer::bind().await;
        let transport = Transport::connect(&server.url, &HeaderMap::new())
            .await
            .expect("connect");
        let conn = server.accept().await;
        (transport, conn)
    }

    fn spawn_send(
        transport: &Transport,
        payload: Value,
    ) -> tokio::task::JoinHandle<Result<Box<RawValue>>> {
        let transport = transport.clone();
        tokio::spawn(async move { transport.send(&payload).await })
    }

    #[test]
    fn test_defaults() {
        let options = TransportOptions::default();
        assert_eq!(options.response_timeout.as_secs(), 10);
        assert_eq!(options.handshake_timeout.as_secs(), 10);
        assert_eq!(EXPIRED_WINDOW, 1024);
    }

    #[test]
    fn test_registry_expired_window_is_bounded() {
        let mut registry = Registry::default();
        for n in 0..(EXPIRED_WINDOW as u64 + 10) {
            let (tx, _rx) = oneshot::channel();
            registry.insert(CorrelationId::new(n), tx).expect("insert");
            registry.expire(CorrelationId::new(n));
        }
        assert_eq!(registry.expired.len(), EXPIRED_WINDOW);
        assert!(registry.waiters.is_empty());
        assert!(matches!(registry.route(CorrelationId::new(0)), Route::Push));
        assert!(matches!(registry.route(CorrelationId::new(20)), Route::Expired));
        assert!(matches!(registry.route(CorrelationId::new(20)), Route::Push));
    }

    #[test]
    fn test_registry_refuses_after_close() {
        let mut registry = Registry::default();
        let (tx, _rx) = oneshot::channel();
        registry.insert(CorrelationId::new(1), tx).expect("insert");

        assert_eq!(registry.close().len(), 1);

        let (tx, _rx) = oneshot::channel();
        assert!(matches!(
            registry.insert(CorrelationId::new(2), tx),
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_send_returns_raw_ok_payload() {
        let (transport, mut conn) = open().await;

        let call = spawn_send(
            &transport,
            json!({ "fn": "add", "args": ["job1", { "key": "value" }, null] }),
        );

        let request = conn.recv_json().await;
        assert_eq!(
            request,
            json!({ "id": 1, "data": { "fn": "add", "args": ["job1", { "key": "value" }, null] } })
        );

        conn.send_text(r#"{"id":1,"data":{"ok":{"id":"42","name":"job1"}}}"#)
            .await;

        let raw = call.await.expect("join").expect("send");
        assert_eq!(raw.get(), r#"{"id":"42","name":"job1"}"#);
        assert_eq!(transport.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_send_surfaces_remote_error() {
        let (transport, mut conn) = open().await;

        let call = spawn_send(&transport, json!({ "fn": "add", "args": [] }));
        let request = conn.recv_json().await;
        conn.send_json(json!({
            "id": request["id"],
            "data": { "err": { "message": "boom", "stack": "..." } }
        }))
        .await;

        match call.await.expect("join") {
            Err(Error::Remote { message, stack }) => {
                assert_eq!(message, "boom");
                assert_eq!(stack, "...");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(transport.is_open());
    }

    #[tokio::test]
    async fn test_concurrent_sends_receive_their_own_results() {
        const CALLS: u64 = 16;
        let (transport, mut conn) = open().await;

        let calls: Vec<_> = (0..CALLS)
            .map(|n| spawn_send(&transport, json!({ "n": n })))
            .collect();

        let mut requests = Vec::new();
        for _ in 0..CALLS {
            requests.push(conn.recv_json().await);
        }

        // Answer in reverse arrival order.
        for request in requests.iter().rev() {
            conn.send_json(json!({
                "id": request["id"],
                "data": { "ok": request["data"]["n"] }
            }))
            .await;
        }

        for (n, call) in calls.into_iter().enumerate() {
            let raw = call.await.expect("join").expect("send");
            assert_eq!(raw.get(), n.to_string());
        }
    }

    #[tokio::test]
    async fn test_timeout_drops_late_response() {
        let (transport, mut conn) = open().await;

        let slow = {
            let transport = transport.clone();
            tokio::spawn(async move {
                transport
                    .send_with_timeout(&json!({ "fn": "slow" }), Duration::from_millis(50))
                    .await
            })
        };
        let late = conn.recv_json().await;

        let err = slow.await.expect("join").unwrap_err();
        assert!(matches!(
            err,
            Error::RequestTimeout { correlation_id, .. } if correlation_id == CorrelationId::new(1)
        ));
        assert_eq!(transport.pending_count(), 0);

        conn.send_json(json!({ "id": late["id"], "data": { "ok": "late" } }))
            .await;

        let fast = spawn_send(&transport, json!({ "fn": "fast" }));
        let request = conn.recv_json().await;
        assert_eq!(request["id"], 2);
        conn.send_json(json!({ "id": 2, "data": { "ok": "fast" } })).await;

        let raw = fast.await.expect("join").expect("send");
        assert_eq!(raw.get(), r#""fast""#);

        // The late response was neither delivered nor surfaced as a push.
        assert!(
            timeout(Duration::from_millis(50), transport.receive_next())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_close_releases_pending_requests() {
        const CALLS: usize = 5;
        let (transport, mut conn) = open().await;

        let calls: Vec<_> = (0..CALLS)
            .map(|n| spawn_send(&transport, json!({ "n": n })))
            .collect();
        for _ in 0..CALLS {
            conn.recv_json().await;
        }
        assert_eq!(transport.pending_count(), CALLS);

        transport.close().await;

        for call in calls {
            let result = timeout(Duration::from_secs(1), call)
                .await
                .expect("unblocked")
                .expect("join");
            assert!(matches!(result, Err(Error::ConnectionClosed)));
        }
        assert_eq!(transport.state(), ConnectionState::Closed);
        assert_eq!(transport.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_close_is_idempotent() {
        let (transport, mut conn) = open().await;
        let other = transport.clone();

        tokio::join!(transport.close(), other.close(), transport.close());
        transport.close().await;

        assert_eq!(transport.state(), ConnectionState::Closed);
        assert!(matches!(
            conn.ws.next().await,
            Some(Ok(Message::Close(_)))
        ));

        let result = transport.send(&json!({ "fn": "pause" })).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
        let result = transport.respond(CorrelationId::new(1), &json!({})).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
        assert!(matches!(
            transport.receive_next().await,
            Err(Error::ConnectionClosed)
        ));
    }

    /// A frame far larger than the socket buffers of a peer that never reads.
    fn oversized_payload() -> Value {
        json!({ "fn": "add", "args": ["x".repeat(64 << 20)] })
    }

    #[tokio::test]
    async fn test_stalled_write_times_out_and_closes() {
        // The peer completes the handshake and then never reads.
        let (transport, _conn) = open().await;

        let result = timeout(
            Duration::from_secs(3),
            transport.send_with_timeout(&oversized_payload(), Duration::from_millis(200)),
        )
        .await
        .expect("send bounded by its timeout");

        assert!(matches!(
            result,
            Err(Error::RequestTimeout { timeout_ms: 200, .. })
        ));
        timeout(Duration::from_secs(3), transport.closed())
            .await
            .expect("closed");
        assert_eq!(transport.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_stalled_write_releases_other_waiters() {
        let (transport, mut conn) = open().await;

        let pending = spawn_send(&transport, json!({ "fn": "pause" }));
        conn.recv_json().await;

        let result = timeout(
            Duration::from_secs(3),
            transport.send_with_timeout(&oversized_payload(), Duration::from_millis(200)),
        )
        .await
        .expect("send bounded by its timeout");
        assert!(matches!(result, Err(Error::RequestTimeout { .. })));

        let result = timeout(Duration::from_secs(1), pending)
            .await
            .expect("unblocked")
            .expect("join");
        assert!(matches!(result, Err(Error::ConnectionClosed)));

        let result = transport.send(&json!({ "fn": "pause" })).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_close_during_stalled_write() {
        let (transport, _conn) = open().await;

        let stalled = {
            let transport = transport.clone();
            tokio::spawn(async move {
                transport
                    .send_with_timeout(&oversized_payload(), Duration::from_secs(30))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;

        // Queued behind the stalled frame on the write lock.
        let queued = spawn_send(&transport, json!({ "fn": "pause" }));
        tokio::time::sleep(Duration::from_millis(50)).await;

        timeout(Duration::from_secs(3), transport.close())
            .await
            .expect("close bounded");
        assert_eq!(transport.state(), ConnectionState::Closed);

        for call in [stalled, queued] {
            let result = timeout(Duration::from_secs(3), call)
                .await
                .expect("unblocked")
                .expect("join");
            assert!(matches!(result, Err(Error::ConnectionClosed)));
        }
    }

    #[tokio::test]
    async fn test_respond_after_write_failure_is_closed() {
        let (transport, conn) = open().await;
        drop(conn);

        // The first write after the peer is gone either fails or lands in a
        // dead socket; the read loop notices the disconnect either way.
        let _ = transport.respond(CorrelationId::new(1), &json!({})).await;
        timeout(Duration::from_secs(3), transport.closed())
            .await
            .expect("closed");

        let result = transport.respond(CorrelationId::new(2), &json!({})).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_unmatched_frame_is_a_push() {
        let (transport, mut conn) = open().await;

        conn.send_text(r#"{"id":7,"data":{"type":"process","payload":{"n":1}}}"#)
            .await;

        let push = transport.receive_next().await.expect("push");
        assert_eq!(push.id, CorrelationId::new(7));
        assert_eq!(push.raw_data(), r#"{"type":"process","payload":{"n":1}}"#);
    }

    #[tokio::test]
    async fn test_respond_writes_unawaited_envelope() {
        let (transport, mut conn) = open().await;

        transport
            .respond(CorrelationId::new(7), &json!({ "result": 1 }))
            .await
            .expect("respond");

        assert_eq!(conn.recv_json().await, json!({ "id": 7, "data": { "result": 1 } }));
        assert_eq!(transport.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_server_disconnect_fails_pending() {
        let (transport, mut conn) = open().await;

        let call = spawn_send(&transport, json!({ "fn": "pause" }));
        conn.recv_json().await;
        drop(conn);

        let result = timeout(Duration::from_secs(1), call)
            .await
            .expect("unblocked")
            .expect("join");
        assert!(matches!(result, Err(Error::ConnectionClosed)));

        timeout(Duration::from_secs(1), transport.closed())
            .await
            .expect("closed");
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn test_malformed_frame_closes_connection() {
        let (transport, mut conn) = open().await;

        let call = spawn_send(&transport, json!({ "fn": "pause" }));
        conn.recv_json().await;
        conn.send_text("not json").await;

        let result = timeout(Duration::from_secs(1), call)
            .await
            .expect("unblocked")
            .expect("join");
        assert!(matches!(result, Err(Error::ConnectionClosed)));

        timeout(Duration::from_secs(1), transport.closed())
            .await
            .expect("closed");
    }

    #[tokio::test]
    async fn test_malformed_result_body_fails_its_waiter() {
        let (transport, mut conn) = open().await;

        let call = spawn_send(&transport, json!({ "fn": "pause" }));
        conn.recv_json().await;
        conn.send_text(r#"{"id":1,"data":"oops"}"#).await;

        let result = call.await.expect("join");
        assert!(matches!(result, Err(Error::Protocol { .. })));

        timeout(Duration::from_secs(1), transport.closed())
            .await
            .expect("closed");
    }

    #[tokio::test]
    async fn test_correlation_ids_are_unique() {
        const CALLS: u64 = 10_000;
        let (transport, mut conn) = open().await;

        let server = tokio::spawn(async move {
            let mut seen = HashSet::new();
            let mut last = 0;
            for _ in 0..CALLS {
                let request = conn.recv_json().await;
                let id = request["id"].as_u64().expect("integer id");
                assert!(id > last, "ids must increase");
                last = id;
                seen.insert(id);
                conn.send_json(json!({ "id": id, "data": { "ok": id } })).await;
            }
            seen.len()
        });

        for expected in 1..=CALLS {
            let raw = transport.send(&json!({ "fn": "pause" })).await.expect("send");
            assert_eq!(raw.get(), expected.to_string());
        }

        assert_eq!(server.await.expect("join") as u64, CALLS);
    }

    #[tokio::test]
    async fn test_handshake_headers_are_forwarded() {
        let server = MockServer::bind().await;
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer 1234"));

        let _transport = Transport::connect(&server.url, &headers)
            .await
            .expect("connect");
        let conn = server.accept().await;

        assert_eq!(
            conn.headers.get("authorization"),
            Some(&HeaderValue::from_static("Bearer 1234"))
        );
    }

    #[tokio::test]
    async fn test_refused_connection_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let result = Transport::connect(&format!("ws://127.0.0.1:{port}"), &HeaderMap::new()).await;
        assert!(matches!(result, Err(Error::Connection { .. })));
    }

    #[tokio::test]
    async fn test_stalled_handshake_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let _hold = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let options = TransportOptions::default().with_handshake_timeout(Duration::from_millis(100));
        let result = Transport::connect_with_options(
            &format!("ws://127.0.0.1:{port}"),
            &HeaderMap::new(),
            options,
        )
        .await;
        assert!(matches!(result, Err(Error::ConnectionTimeout { timeout_ms: 100 })));
    }

    #[tokio::test]
    async fn test_invalid_url_is_connection_error() {
        let result = Transport::connect("not a url", &HeaderMap::new()).await;
        assert!(matches!(result, Err(Error::Connection { .. })));
    }
}
