use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::CloseFrame;

use crate::jsonrpc::{self, Params};
use crate::notification::Notification;
use crate::value::Value;
use crate::Error;
use crate::Result;

type WSMessage = tokio_tungstenite::tungstenite::Message;
type WSStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WSSink = SplitSink<WSStream, WSMessage>;

/// Close code and reason reported when the socket shuts, surfaced verbatim in
/// every disconnection error produced for that event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Close {
    pub code: u16,
    pub reason: Option<String>,
}

impl Close {
    // 1005: the peer closed without sending a status code
    const NO_STATUS: u16 = 1005;
    // 1006: the connection died without a close handshake
    const ABNORMAL: u16 = 1006;

    fn abnormal() -> Self {
        Self {
            code: Self::ABNORMAL,
            reason: None,
        }
    }

    fn from_frame(frame: Option<CloseFrame>) -> Self {
        match frame {
            Some(frame) => Self {
                code: frame.code.into(),
                reason: if frame.reason.is_empty() {
                    None
                } else {
                    Some(frame.reason.to_string())
                },
            },
            None => Self {
                code: Self::NO_STATUS,
                reason: None,
            },
        }
    }
}

impl fmt::Display for Close {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "code {}, reason \"{}\"", self.code, reason),
            None => write!(f, "code {}", self.code),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectConfig {
    url: String,
    secret: String,
    queue_unmatched_requests: bool,
}

impl ConnectConfig {
    pub fn new(host: &str, port: u16, secret: &str) -> Self {
        Self {
            url: format!("ws://{host}:{port}"),
            secret: secret.to_string(),
            queue_unmatched_requests: false,
        }
    }

    /// By default a server request carrying an id nobody allocated is logged
    /// and dropped, since it indicates protocol desynchronization. Enabling
    /// this routes such requests through notification parsing instead.
    pub fn queue_unmatched_requests(mut self, enabled: bool) -> Self {
        self.queue_unmatched_requests = enabled;
        self
    }
}

impl IntoClientRequest for &ConnectConfig {
    fn into_client_request(self) -> tungstenite::Result<tungstenite::handshake::client::Request> {
        let mut request = self.url.as_str().into_client_request()?;
        let bearer = format!("Bearer {}", self.secret);
        let value = HeaderValue::from_str(&bearer)
            .map_err(|e| tungstenite::Error::HttpFormat(e.into()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(request)
    }
}

enum Link {
    Disconnected,
    Connecting,
    Connected(Arc<AsyncMutex<WSSink>>),
}

struct Shared {
    link: Link,
    last_close: Close,
    next_id: i64,
    pending: HashMap<i64, oneshot::Sender<Result<Value>>>,
    queue: VecDeque<Notification>,
    waiter: Option<oneshot::Sender<Result<Notification>>>,
    epoch: u64,
}

impl Shared {
    fn new() -> Self {
        Self {
            link: Link::Disconnected,
            last_close: Close::abnormal(),
            next_id: 0,
            pending: HashMap::new(),
            queue: VecDeque::new(),
            waiter: None,
            epoch: 0,
        }
    }
}

/// One logical session with a management server. Cheap to clone; all clones
/// share the same socket, correlation table and notification queue.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Opens the socket and resolves once the upgrade handshake completes.
    pub async fn connect(config: ConnectConfig) -> Result<Self> {
        let connection = Self {
            inner: Arc::new(ConnectionInner {
                config,
                state: Mutex::new(Shared::new()),
            }),
        };
        connection.open().await?;
        Ok(connection)
    }

    /// Reopens the socket after a disconnect. Fails fast with
    /// [`Error::AlreadyConnected`] unless the session is disconnected.
    /// Request ids and queued notifications carry over.
    pub async fn reconnect(&self) -> Result<()> {
        self.open().await
    }

    async fn open(&self) -> Result<()> {
        {
            let mut shared = self.inner.shared();
            match shared.link {
                Link::Disconnected => shared.link = Link::Connecting,
                _ => return Err(Error::AlreadyConnected),
            }
        }
        match tokio_tungstenite::connect_async(&self.inner.config).await {
            Ok((ws, _)) => {
                let (sink, stream) = ws.split();
                let epoch = {
                    let mut shared = self.inner.shared();
                    shared.epoch += 1;
                    shared.link = Link::Connected(Arc::new(AsyncMutex::new(sink)));
                    shared.epoch
                };
                tracing::info!("connected to {}", self.inner.config.url);
                tokio::spawn(ConnectionInner::read_loop(self.inner.clone(), stream, epoch));
                Ok(())
            }
            Err(e) => {
                self.inner.shared().link = Link::Disconnected;
                Err(Error::Connect(e))
            }
        }
    }

    /// Issues a call and suspends until its response arrives. Fails with
    /// [`Error::Rpc`] on a server error response and with
    /// [`Error::Disconnected`] if the connection drops first.
    pub async fn call(&self, method: &str, params: Option<Params>) -> Result<Value> {
        self.inner.call(method, params).await
    }

    /// Pops the oldest queued notification, or suspends until one arrives.
    /// At most one caller may be suspended here at a time; a second caller
    /// gets [`Error::AlreadyWaiting`]. On a disconnected session this fails
    /// with [`Error::Disconnected`] even when events are still queued; they
    /// become consumable again after [`Connection::reconnect`].
    pub async fn next_notification(&self) -> Result<Notification> {
        self.inner.next_notification().await
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.inner.shared().link, Link::Connected(_))
    }

    /// Starts a close handshake. Outstanding calls and waiters fail with a
    /// disconnection error once the socket actually closes.
    pub async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}

struct ConnectionInner {
    config: ConnectConfig,
    state: Mutex<Shared>,
}

impl ConnectionInner {
    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn call(&self, method: &str, params: Option<Params>) -> Result<Value> {
        let (id, sink, rx) = {
            let mut shared = self.shared();
            let sink = match &shared.link {
                Link::Connected(sink) => sink.clone(),
                _ => return Err(Error::Disconnected(shared.last_close.clone())),
            };
            let id = shared.next_id;
            shared.next_id += 1;
            let (tx, rx) = oneshot::channel();
            shared.pending.insert(id, tx);
            (id, sink, rx)
        };

        let request = jsonrpc::Request {
            method: method.to_string(),
            params,
            id: Some(id),
        };
        let text = match serde_json::to_string(&request) {
            Ok(text) => text,
            Err(e) => {
                self.shared().pending.remove(&id);
                return Err(Error::Encode(e));
            }
        };
        let sent = { sink.lock().await.send(WSMessage::Text(text.into())).await };
        if let Err(e) = sent {
            self.shared().pending.remove(&id);
            return Err(Error::Websocket(e));
        }

        match rx.await {
            Ok(outcome) => outcome,
            // the waiter can only vanish unresolved if the session is torn down
            Err(_) => Err(Error::Disconnected(Close::abnormal())),
        }
    }

    async fn next_notification(&self) -> Result<Notification> {
        let rx = {
            let mut shared = self.shared();
            if !matches!(shared.link, Link::Connected(_)) {
                return Err(Error::Disconnected(shared.last_close.clone()));
            }
            if let Some(notification) = shared.queue.pop_front() {
                return Ok(notification);
            }
            // a waiter whose receiver was dropped never consumes anything,
            // reclaim the slot instead of wedging it
            if matches!(&shared.waiter, Some(waiter) if !waiter.is_closed()) {
                return Err(Error::AlreadyWaiting);
            }
            let (tx, rx) = oneshot::channel();
            shared.waiter = Some(tx);
            rx
        };
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Disconnected(Close::abnormal())),
        }
    }

    async fn close(&self) -> Result<()> {
        let sink = {
            let shared = self.shared();
            match &shared.link {
                Link::Connected(sink) => sink.clone(),
                _ => return Ok(()),
            }
        };
        let mut sink = sink.lock().await;
        sink.send(WSMessage::Close(None))
            .await
            .map_err(Error::Websocket)
    }

    async fn read_loop(inner: Arc<Self>, mut stream: SplitStream<WSStream>, epoch: u64) {
        let close = loop {
            match stream.next().await {
                Some(Ok(WSMessage::Text(text))) => inner.route_frame(&text),
                Some(Ok(WSMessage::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => inner.route_frame(text),
                    Err(e) => tracing::warn!("dropping non-utf8 binary frame: {e}"),
                },
                Some(Ok(WSMessage::Close(frame))) => break Close::from_frame(frame),
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    tracing::error!("websocket error: {e}");
                    break Close::abnormal();
                }
                None => break Close::abnormal(),
            }
        };
        inner.handle_disconnect(epoch, close);
    }

    fn route_frame(&self, text: &str) {
        let inbound = match serde_json::from_str::<jsonrpc::Inbound>(text) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::warn!("dropping malformed frame: {e}");
                return;
            }
        };
        match inbound {
            jsonrpc::Inbound::Error { id, error } => self.resolve(id, Err(Error::Rpc(error))),
            jsonrpc::Inbound::Result { id, result } => self.resolve(id, Ok(result)),
            jsonrpc::Inbound::Request(request) => self.handle_request(request),
        }
    }

    fn resolve(&self, id: i64, outcome: Result<Value>) {
        let waiter = self.shared().pending.remove(&id);
        match waiter {
            // the caller may have stopped listening, e.g. raced a timeout
            Some(tx) => {
                let _ = tx.send(outcome);
            }
            None => tracing::warn!("dropping response {id} with no matching pending call"),
        }
    }

    fn handle_request(&self, request: jsonrpc::Request) {
        if request.id.is_some() && !self.config.queue_unmatched_requests {
            tracing::warn!(
                "dropping server request {} with unexpected id {:?}",
                request.method,
                request.id
            );
            return;
        }
        match Notification::parse(&request) {
            Ok(Some(notification)) => self.enqueue(notification),
            Ok(None) => {}
            Err(e) => tracing::warn!(
                "dropping undecodable notification {}: {e}",
                request.method
            ),
        }
    }

    fn enqueue(&self, notification: Notification) {
        let mut shared = self.shared();
        match shared.waiter.take() {
            Some(waiter) => {
                // a live waiter consumes the event directly, it never touches
                // the queue; an abandoned one gives it back
                if let Err(Ok(notification)) = waiter.send(Ok(notification)) {
                    shared.queue.push_back(notification);
                }
            }
            None => shared.queue.push_back(notification),
        }
    }

    fn handle_disconnect(&self, epoch: u64, close: Close) {
        let (pending, waiter) = {
            let mut shared = self.shared();
            if shared.epoch != epoch {
                // a stale read loop outlived its connection
                return;
            }
            shared.link = Link::Disconnected;
            shared.last_close = close.clone();
            (std::mem::take(&mut shared.pending), shared.waiter.take())
        };
        tracing::info!("websocket closed: {close}");
        for (_, tx) in pending {
            let _ = tx.send(Err(Error::Disconnected(close.clone())));
        }
        if let Some(waiter) = waiter {
            let _ = waiter.send(Err(Error::Disconnected(close)));
        }
    }
}
