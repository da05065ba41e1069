//! Reconnecting socket client.
//!
//! `connect` spawns a driver task that opens a connection, parses every
//! non-empty inbound text frame as a [`SocketPayload`] and emits it, and on
//! close either stops (terminal close code 1011) or waits the fixed reconnect
//! delay and opens a new connection. The open callback runs after every
//! successful (re)connect.
//!
//! State machine:
//! `Idle -> Connecting -> Open -> Closed` (terminal code) or
//! `Open -> Reconnecting -> Connecting -> ...`; `close()` moves any state to
//! `Closed` and cancels a pending reconnect.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use swarm_core::constants::{ABNORMAL_CLOSE_CODE, NORMAL_CLOSE_CODE, TERMINAL_CLOSE_CODE};
use swarm_core::error::{SwarmError, SwarmResult};

use crate::emitter::{Disposer, EventEmitter};
use crate::events::{ConnectionState, OutboundMessage, SocketPayload};
use crate::options::{PageLocation, SocketOptions};
use crate::transport::{Connection, InboundFrame, OutboundFrame, Transport, WebSocketTransport};

/// Callback run each time a connection opens.
pub type OnOpen = Arc<dyn Fn(&SocketClient) + Send + Sync>;

struct Shared {
    url: String,
    reconnect_delay: Duration,
    transport: Arc<dyn Transport>,
    /// Payloads parsed from inbound frames.
    emitter: EventEmitter<SocketPayload>,
    /// Failed opens, abnormal closes and undecodable frames.
    errors: EventEmitter<SwarmError>,
    /// Sender of the live connection, present only while open.
    outbound: Mutex<Option<mpsc::UnboundedSender<OutboundFrame>>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    /// Bumped by `connect` and `close`; a driver only acts while its epoch is current.
    epoch: AtomicU64,
    state_tx: watch::Sender<ConnectionState>,
}

/// WebSocket client that emits parsed payloads and reconnects on close.
///
/// Cloning yields another handle to the same client.
#[derive(Clone)]
pub struct SocketClient {
    shared: Arc<Shared>,
}

impl SocketClient {
    /// Create a client for the URL derived from `options` and `page`,
    /// using the tokio-tungstenite transport.
    pub fn new(options: &SocketOptions, page: &PageLocation) -> Self {
        let transport = WebSocketTransport::new().connect_timeout(options.connect_timeout);
        Self::with_transport(options, page, Arc::new(transport))
    }

    /// Create a client with a custom transport.
    pub fn with_transport(
        options: &SocketOptions,
        page: &PageLocation,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            shared: Arc::new(Shared {
                url: options.resolve_url(page),
                reconnect_delay: options.reconnect_delay,
                transport,
                emitter: EventEmitter::new(),
                errors: EventEmitter::new(),
                outbound: Mutex::new(None),
                driver: Mutex::new(None),
                epoch: AtomicU64::new(0),
                state_tx,
            }),
        }
    }

    /// The socket URL this client connects to.
    pub fn url(&self) -> &str {
        &self.shared.url
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Register a persistent payload listener.
    pub fn on<F, R>(&self, listener: F) -> Disposer
    where
        F: Fn(&SocketPayload) -> R + Send + Sync + 'static,
    {
        self.shared.emitter.on(listener)
    }

    /// Register a listener for the next payload only.
    pub fn once<F, R>(&self, listener: F)
    where
        F: FnOnce(&SocketPayload) -> R + Send + 'static,
    {
        self.shared.emitter.once(listener)
    }

    /// Register a listener for failed opens, closes with a code other than
    /// 1000, and undecodable frames.
    pub fn on_error<F, R>(&self, listener: F) -> Disposer
    where
        F: Fn(&SwarmError) -> R + Send + Sync + 'static,
    {
        self.shared.errors.on(listener)
    }

    /// Start connecting in a background task.
    ///
    /// `on_open` runs after every successful (re)connect. Calling `connect`
    /// while a driver is already running is a no-op. Must be called from
    /// within a tokio runtime.
    pub fn connect(&self, on_open: Option<OnOpen>) {
        let mut driver = self.shared.driver.lock();
        let running = driver.as_ref().is_some_and(|handle| !handle.is_finished());
        if running && self.state().is_active() {
            debug!("already connecting or connected, skipping");
            return;
        }

        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        info!("connecting to websocket at {}", self.shared.url);
        self.set_state(epoch, ConnectionState::Connecting);

        let client = self.clone();
        *driver = Some(tokio::spawn(async move {
            client.run(epoch, on_open).await;
        }));
    }

    /// Send `{event, data}` if the connection is open.
    ///
    /// `data` defaults to `{}`. Returns `Ok(false)` without transmitting when
    /// the connection is not open; nothing is queued.
    pub fn send(&self, event: &str, data: Option<serde_json::Value>) -> SwarmResult<bool> {
        let frame = serde_json::to_string(&OutboundMessage::new(event, data))?;

        let outbound = self.shared.outbound.lock();
        match outbound.as_ref() {
            Some(tx) if self.state() == ConnectionState::Open => {
                Ok(tx.send(OutboundFrame::Text(frame)).is_ok())
            }
            _ => {
                debug!("dropping '{event}': socket is {}", self.state());
                Ok(false)
            }
        }
    }

    /// Close the connection and cancel any pending reconnect.
    pub fn close(&self) {
        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(handle) = self.shared.driver.lock().take() {
            handle.abort();
        }
        if let Some(tx) = self.shared.outbound.lock().take() {
            let _ = tx.send(OutboundFrame::Close {
                code: NORMAL_CLOSE_CODE,
            });
        }

        self.set_state(epoch, ConnectionState::Closed);
        info!("socket closed by client");
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.shared.epoch.load(Ordering::SeqCst) == epoch
    }

    /// Update the state and notify watchers, unless a newer `connect` or
    /// `close` has superseded `epoch`.
    fn set_state(&self, epoch: u64, new_state: ConnectionState) {
        if !self.is_current(epoch) {
            return;
        }
        self.shared.state_tx.send_if_modified(|state| {
            if *state == new_state {
                return false;
            }
            info!("socket state: {} -> {}", *state, new_state);
            *state = new_state;
            true
        });
    }

    fn report_error(&self, err: SwarmError) {
        warn!("socket error: {err}");
        let errors = &self.shared.errors;
        if catch_unwind(AssertUnwindSafe(|| errors.emit(&err))).is_err() {
            error!("error listener panicked while handling '{err}'");
        }
    }

    async fn run(self, epoch: u64, on_open: Option<OnOpen>) {
        loop {
            self.set_state(epoch, ConnectionState::Connecting);

            let code = match self.shared.transport.open(&self.shared.url).await {
                Ok(connection) => {
                    let code = self.serve(epoch, connection, on_open.as_ref()).await;
                    if code != NORMAL_CLOSE_CODE && self.is_current(epoch) {
                        self.report_error(SwarmError::SocketClosed { code });
                    }
                    code
                }
                Err(e) => {
                    self.report_error(e);
                    ABNORMAL_CLOSE_CODE
                }
            };

            if !self.is_current(epoch) {
                return;
            }

            if code == TERMINAL_CLOSE_CODE {
                error!("server closed the socket with code {code}, not reconnecting");
                self.set_state(epoch, ConnectionState::Closed);
                return;
            }

            self.set_state(epoch, ConnectionState::Reconnecting);
            info!(
                "socket closed with code {code}, reconnecting in {:.1}s",
                self.shared.reconnect_delay.as_secs_f64()
            );
            sleep(self.shared.reconnect_delay).await;

            if !self.is_current(epoch) {
                return;
            }
        }
    }

    /// Pump one open connection until it closes. Returns the close code.
    async fn serve(&self, epoch: u64, connection: Connection, on_open: Option<&OnOpen>) -> u16 {
        let Connection {
            outbound,
            mut inbound,
        } = connection;

        {
            let mut slot = self.shared.outbound.lock();
            if !self.is_current(epoch) {
                let _ = outbound.send(OutboundFrame::Close {
                    code: NORMAL_CLOSE_CODE,
                });
                return NORMAL_CLOSE_CODE;
            }
            *slot = Some(outbound);
        }
        self.set_state(epoch, ConnectionState::Open);
        info!("connected to {}", self.shared.url);

        if let Some(on_open) = on_open {
            if catch_unwind(AssertUnwindSafe(|| on_open(self))).is_err() {
                self.report_error(SwarmError::Internal("open callback panicked".into()));
            }
        }

        let code = loop {
            match inbound.recv().await {
                Some(InboundFrame::Text(text)) => self.handle_frame(&text),
                Some(InboundFrame::Closed { code }) => break code,
                None => break ABNORMAL_CLOSE_CODE,
            }
        };

        if self.is_current(epoch) {
            self.shared.outbound.lock().take();
        }
        code
    }

    fn handle_frame(&self, text: &str) {
        let payload = match SocketPayload::from_frame(text) {
            Ok(Some(payload)) => payload,
            Ok(None) => return,
            Err(e) => {
                self.report_error(e);
                return;
            }
        };

        debug!("socket payload: {}", payload.kind);
        let emitter = &self.shared.emitter;
        if catch_unwind(AssertUnwindSafe(|| emitter.emit(&payload))).is_err() {
            self.report_error(SwarmError::Internal(format!(
                "listener panicked while handling '{}'",
                payload.kind
            )));
        }
    }
}

impl std::fmt::Debug for SocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketClient")
            .field("url", &self.shared.url)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{timeout, Instant};

    /// Server side of one fake connection.
    struct ServerEnd {
        to_client: mpsc::UnboundedSender<InboundFrame>,
        from_client: mpsc::UnboundedReceiver<OutboundFrame>,
    }

    impl ServerEnd {
        fn push(&self, frame: &str) {
            self.to_client
                .send(InboundFrame::Text(frame.to_string()))
                .unwrap();
        }

        fn close(&self, code: u16) {
            self.to_client.send(InboundFrame::Closed { code }).unwrap();
        }
    }

    /// Transport handing the server end of every opened connection to the test.
    struct FakeTransport {
        accepted: mpsc::UnboundedSender<ServerEnd>,
        failures_left: AtomicUsize,
        opened_urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn open(&self, url: &str) -> SwarmResult<Connection> {
            self.opened_urls.lock().push(url.to_string());
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(SwarmError::Socket("connection refused".into()));
            }

            let (to_client, inbound) = mpsc::unbounded_channel();
            let (outbound, from_client) = mpsc::unbounded_channel();
            let _ = self.accepted.send(ServerEnd {
                to_client,
                from_client,
            });
            Ok(Connection { outbound, inbound })
        }
    }

    fn fake_client(failures: usize) -> (SocketClient, Arc<FakeTransport>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (accepted, accepted_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(FakeTransport {
            accepted,
            failures_left: AtomicUsize::new(failures),
            opened_urls: Mutex::new(Vec::new()),
        });
        let client = SocketClient::with_transport(
            &SocketOptions::new().port(9999),
            &PageLocation::new("http:", "localhost", 8080),
            transport.clone(),
        );
        (client, transport, accepted_rx)
    }

    async fn wait_for_state(client: &SocketClient, state: ConnectionState) {
        let mut rx = client.state_receiver();
        rx.wait_for(|s| *s == state).await.unwrap();
    }

    #[tokio::test]
    async fn test_new_client_is_idle() {
        let (client, _transport, _accepted) = fake_client(0);
        assert_eq!(client.state(), ConnectionState::Idle);
        assert_eq!(client.url(), "ws://localhost:9999/ws");
    }

    #[tokio::test]
    async fn test_payloads_are_emitted_in_order() {
        let (client, _transport, mut accepted) = fake_client(0);
        let (seen_tx, mut seen) = mpsc::unbounded_channel::<SocketPayload>();
        let _sub = client.on(move |payload: &SocketPayload| seen_tx.send(payload.clone()));

        client.connect(None);
        let server = accepted.recv().await.unwrap();
        server.push(r#"{"type":"reload","data":""}"#);
        server.push("");
        server.push(r#"{"type":"reload-css","data":"{}"}"#);

        assert_eq!(seen.recv().await.unwrap(), SocketPayload::reload());
        assert_eq!(seen.recv().await.unwrap().kind, "reload-css");
        assert_eq!(client.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_malformed_frame_reaches_error_listeners() {
        let (client, _transport, mut accepted) = fake_client(0);
        let (payload_tx, mut payloads) = mpsc::unbounded_channel::<SocketPayload>();
        let (error_tx, mut errors) = mpsc::unbounded_channel::<String>();
        let _sub = client.on(move |payload: &SocketPayload| payload_tx.send(payload.clone()));
        let _err = client.on_error(move |err: &SwarmError| error_tx.send(err.to_string()));

        client.connect(None);
        let server = accepted.recv().await.unwrap();
        server.push("{not json");
        server.push(r#"{"type":"reload","data":""}"#);

        assert!(errors.recv().await.unwrap().starts_with("invalid payload"));
        assert_eq!(payloads.recv().await.unwrap().kind, "reload");
        assert!(payloads.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_panicking_listener_keeps_connection_alive() {
        let (client, _transport, mut accepted) = fake_client(0);
        let (payload_tx, mut payloads) = mpsc::unbounded_channel::<String>();
        let _boom = client.on(|payload: &SocketPayload| {
            if payload.kind == "boom" {
                panic!("listener failed");
            }
        });
        let _sub = client.on(move |payload: &SocketPayload| payload_tx.send(payload.kind.clone()));

        client.connect(None);
        let server = accepted.recv().await.unwrap();
        server.push(r#"{"type":"boom","data":""}"#);
        server.push(r#"{"type":"reload","data":""}"#);

        assert_eq!(payloads.recv().await.unwrap(), "reload");
        assert_eq!(client.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_panicking_open_callback_keeps_connection_alive() {
        let (client, _transport, mut accepted) = fake_client(0);
        let (error_tx, mut errors) = mpsc::unbounded_channel::<String>();
        let (payload_tx, mut payloads) = mpsc::unbounded_channel::<String>();
        let _err = client.on_error(move |err: &SwarmError| error_tx.send(err.to_string()));
        let _sub = client.on(move |payload: &SocketPayload| payload_tx.send(payload.kind.clone()));
        let on_open: OnOpen = Arc::new(|_: &SocketClient| panic!("open callback failed"));

        client.connect(Some(on_open));
        let mut server = accepted.recv().await.unwrap();

        assert!(errors.recv().await.unwrap().starts_with("internal error"));
        server.push(r#"{"type":"reload","data":""}"#);
        assert_eq!(payloads.recv().await.unwrap(), "reload");
        assert_eq!(client.state(), ConnectionState::Open);

        assert!(client.send("save", None).unwrap());
        assert!(matches!(server.from_client.recv().await, Some(OutboundFrame::Text(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_error_listener_keeps_reconnecting() {
        let (client, transport, mut accepted) = fake_client(1);
        let _boom = client.on_error(|_: &SwarmError| panic!("error listener failed"));

        client.connect(None);
        let _server = accepted.recv().await.unwrap();

        wait_for_state(&client, ConnectionState::Open).await;
        assert_eq!(transport.opened_urls.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_codes_other_than_normal_are_reported() {
        let (client, _transport, mut accepted) = fake_client(0);
        let (error_tx, mut errors) = mpsc::unbounded_channel::<u16>();
        let _err = client.on_error(move |err: &SwarmError| {
            if let SwarmError::SocketClosed { code } = err {
                let _ = error_tx.send(*code);
            }
        });

        client.connect(None);
        accepted.recv().await.unwrap().close(NORMAL_CLOSE_CODE);
        accepted.recv().await.unwrap().close(1001);
        accepted.recv().await.unwrap().close(TERMINAL_CLOSE_CODE);
        wait_for_state(&client, ConnectionState::Closed).await;

        assert_eq!(errors.recv().await.unwrap(), 1001);
        assert_eq!(errors.recv().await.unwrap(), TERMINAL_CLOSE_CODE);
        assert!(errors.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_fixed_delay() {
        let (client, _transport, mut accepted) = fake_client(0);
        client.connect(None);

        let server = accepted.recv().await.unwrap();
        wait_for_state(&client, ConnectionState::Open).await;

        let closed_at = Instant::now();
        server.close(1000);
        let _second = accepted.recv().await.unwrap();

        let waited = closed_at.elapsed();
        assert!(waited >= Duration::from_secs(5) && waited < Duration::from_secs(6));
        wait_for_state(&client, ConnectionState::Open).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_close_code_stops_reconnecting() {
        let (client, transport, mut accepted) = fake_client(0);
        client.connect(None);

        let server = accepted.recv().await.unwrap();
        server.close(TERMINAL_CLOSE_CODE);
        wait_for_state(&client, ConnectionState::Closed).await;

        assert!(timeout(Duration::from_secs(60), accepted.recv()).await.is_err());
        assert_eq!(transport.opened_urls.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_open_is_retried_and_reported() {
        let (client, transport, mut accepted) = fake_client(2);
        let errors = Arc::new(AtomicUsize::new(0));
        let _err = {
            let errors = Arc::clone(&errors);
            client.on_error(move |_: &SwarmError| errors.fetch_add(1, Ordering::SeqCst))
        };

        let started = Instant::now();
        client.connect(None);
        let _server = accepted.recv().await.unwrap();

        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(10) && waited < Duration::from_secs(11));
        assert_eq!(errors.load(Ordering::SeqCst), 2);
        assert_eq!(
            *transport.opened_urls.lock(),
            vec!["ws://localhost:9999/ws"; 3]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_open_runs_after_every_connect() {
        let (client, _transport, mut accepted) = fake_client(0);
        let opens = Arc::new(AtomicUsize::new(0));
        let on_open: OnOpen = {
            let opens = Arc::clone(&opens);
            Arc::new(move |client: &SocketClient| {
                opens.fetch_add(1, Ordering::SeqCst);
                client.send("hello", None).unwrap();
            })
        };

        client.connect(Some(on_open));
        let mut first = accepted.recv().await.unwrap();
        assert_eq!(
            first.from_client.recv().await.unwrap(),
            OutboundFrame::Text(r#"{"event":"hello","data":{}}"#.into())
        );

        first.close(1001);
        let mut second = accepted.recv().await.unwrap();
        assert!(matches!(second.from_client.recv().await, Some(OutboundFrame::Text(_))));
        assert_eq!(opens.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_send_when_not_open_is_dropped() {
        let (client, _transport, _accepted) = fake_client(0);
        assert!(!client.send("save", Some(serde_json::json!({"a": 1}))).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_reconnecting_is_dropped() {
        let (client, _transport, mut accepted) = fake_client(0);
        client.connect(None);
        let server = accepted.recv().await.unwrap();
        server.close(1006);
        wait_for_state(&client, ConnectionState::Reconnecting).await;

        assert!(!client.send("save", None).unwrap());
    }

    #[tokio::test]
    async fn test_send_when_open_transmits() {
        let (client, _transport, mut accepted) = fake_client(0);
        client.connect(None);
        let mut server = accepted.recv().await.unwrap();
        wait_for_state(&client, ConnectionState::Open).await;

        assert!(client.send("save", Some(serde_json::json!({"file": "a.css"}))).unwrap());
        let OutboundFrame::Text(frame) = server.from_client.recv().await.unwrap() else {
            panic!("expected a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value, serde_json::json!({"event": "save", "data": {"file": "a.css"}}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_reconnect() {
        let (client, transport, mut accepted) = fake_client(0);
        client.connect(None);
        let server = accepted.recv().await.unwrap();
        server.close(1000);
        wait_for_state(&client, ConnectionState::Reconnecting).await;

        client.close();

        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(timeout(Duration::from_secs(60), accepted.recv()).await.is_err());
        assert_eq!(transport.opened_urls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_close_sends_normal_close_frame() {
        let (client, _transport, mut accepted) = fake_client(0);
        client.connect(None);
        let mut server = accepted.recv().await.unwrap();
        wait_for_state(&client, ConnectionState::Open).await;

        client.close();

        assert_eq!(
            server.from_client.recv().await.unwrap(),
            OutboundFrame::Close { code: NORMAL_CLOSE_CODE }
        );
        assert!(!client.send("late", None).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_twice_keeps_one_driver() {
        let (client, transport, mut accepted) = fake_client(0);
        client.connect(None);
        client.connect(None);

        let _server = accepted.recv().await.unwrap();
        assert!(timeout(Duration::from_secs(1), accepted.recv()).await.is_err());
        assert_eq!(transport.opened_urls.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_after_close_starts_again() {
        let (client, _transport, mut accepted) = fake_client(0);
        client.connect(None);
        let _first = accepted.recv().await.unwrap();
        client.close();

        client.connect(None);
        let _second = accepted.recv().await.unwrap();
        wait_for_state(&client, ConnectionState::Open).await;
    }
}
