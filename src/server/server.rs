//! OSC transport server.
//!
//! [`OscServer`] binds one UDP socket or TCP listener, decodes every inbound
//! frame and hands the packet to the registered listeners.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::{Mutex, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use super::dispatch::{ListenerId, ListenerRegistry};
use super::session::ServerSession;
use crate::codec;
use crate::core::{
    BasicPacketFactory, DEFAULT_MAX_FRAME_SIZE, DEFAULT_RECV_BUFFER_SIZE, Listener, PacketFactory,
};
use crate::transport::{FrameBuffer, Transport, TransportError};

/// Errors that can occur in the OSC server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("bind to {addr} failed: {source}")]
    BindFailed {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying error.
        source: io::Error,
    },

    /// `start` called on a server that is already running.
    #[error("server already running on {0}")]
    AlreadyRunning(SocketAddr),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Transport kind.
    pub transport: Transport,

    /// Size of the receive buffer (largest datagram accepted).
    pub recv_buffer_size: usize,

    /// Largest stream frame accepted before the session is closed.
    pub max_frame_size: usize,

    /// Constructs decoded packets.
    pub factory: Arc<dyn PacketFactory>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            factory: Arc::new(BasicPacketFactory),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("transport", &self.transport)
            .field("recv_buffer_size", &self.recv_buffer_size)
            .field("max_frame_size", &self.max_frame_size)
            .finish_non_exhaustive()
    }
}

/// Builder for creating an `OscServer`.
#[derive(Debug)]
pub struct OscServerBuilder {
    config: ServerConfig,
}

impl OscServerBuilder {
    /// Create a new server builder.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Set the transport kind.
    pub fn transport(mut self, transport: Transport) -> Self {
        self.config.transport = transport;
        self
    }

    /// Set the receive buffer size.
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.config.recv_buffer_size = size;
        self
    }

    /// Set the maximum stream frame size.
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Set the packet factory used by the decoder.
    pub fn factory(mut self, factory: Arc<dyn PacketFactory>) -> Self {
        self.config.factory = factory;
        self
    }

    /// Build the server configuration.
    pub fn build(self) -> ServerConfig {
        self.config
    }
}

impl Default for OscServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared by the receive tasks.
struct Context {
    listeners: Arc<ListenerRegistry>,
    factory: Arc<dyn PacketFactory>,
    recv_buffer_size: usize,
    max_frame_size: usize,
}

impl Context {
    /// Decode one frame and dispatch it. Malformed frames are logged and
    /// dropped.
    fn handle_frame(&self, session: &mut ServerSession, frame: &[u8]) {
        session.record_frame(frame.len());
        match codec::decode_with(frame, self.factory.as_ref()) {
            Ok(packet) => {
                let invoked = self.listeners.dispatch(&packet);
                debug!(session = %session.id(), bytes = frame.len(), invoked, "packet dispatched");
            }
            Err(err) => {
                session.record_decode_error();
                warn!(
                    session = %session.id(),
                    addr = %session.addr(),
                    error = %err,
                    "dropping malformed packet"
                );
            }
        }
    }
}

struct Running {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// An OSC server.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use osc_protocol::server::{OscServer, OscServerBuilder};
///
/// let server = OscServer::new(OscServerBuilder::new().build());
/// server.add_listener(Arc::new(MyListener));
/// let addr = server.start("0.0.0.0:10000".parse()?).await?;
/// // ...
/// server.stop().await;
/// ```
pub struct OscServer {
    config: ServerConfig,
    listeners: Arc<ListenerRegistry>,
    running: Mutex<Option<Running>>,
}

impl OscServer {
    /// Create a stopped server.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            listeners: Arc::new(ListenerRegistry::new()),
            running: Mutex::new(None),
        }
    }

    /// Bind `addr` and begin receiving. Returns the bound address.
    pub async fn start(&self, addr: SocketAddr) -> Result<SocketAddr, ServerError> {
        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref() {
            return Err(ServerError::AlreadyRunning(current.local_addr));
        }

        let context = Arc::new(Context {
            listeners: Arc::clone(&self.listeners),
            factory: Arc::clone(&self.config.factory),
            recv_buffer_size: self.config.recv_buffer_size,
            max_frame_size: self.config.max_frame_size,
        });
        let (shutdown, shutdown_rx) = watch::channel(false);
        let bind_failed = |source| ServerError::BindFailed { addr, source };

        let (local_addr, task) = match self.config.transport {
            Transport::Datagram => {
                let socket = UdpSocket::bind(addr).await.map_err(bind_failed)?;
                let local_addr = socket.local_addr()?;
                let task = tokio::spawn(run_datagram(socket, local_addr, context, shutdown_rx));
                (local_addr, task)
            }
            Transport::Stream => {
                let listener = TcpListener::bind(addr).await.map_err(bind_failed)?;
                let local_addr = listener.local_addr()?;
                let task = tokio::spawn(run_stream(listener, context, shutdown_rx));
                (local_addr, task)
            }
        };

        info!(%local_addr, transport = ?self.config.transport, "server started");
        *running = Some(Running {
            local_addr,
            shutdown,
            task,
        });
        Ok(local_addr)
    }

    /// Stop receiving and release the endpoint.
    ///
    /// Waits for in-flight dispatches to finish. No-op if not running.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };

        running.shutdown.send_replace(true);
        if let Err(err) = running.task.await {
            error!(error = %err, "server task failed");
        }
        info!(local_addr = %running.local_addr, "server stopped");
    }

    /// Register a listener. Returns a handle usable with
    /// [`remove_listener_id`](Self::remove_listener_id).
    pub fn add_listener(&self, listener: Arc<dyn Listener>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Unregister `listener`, matched by `Arc` identity.
    pub fn remove_listener<L: Listener + ?Sized>(&self, listener: &Arc<L>) -> bool {
        self.listeners.remove(listener)
    }

    /// Unregister the listener identified by `id`.
    pub fn remove_listener_id(&self, id: ListenerId) -> bool {
        self.listeners.remove_id(id)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }

    /// Check if the server is running.
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl fmt::Debug for OscServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OscServer")
            .field("config", &self.config)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl Drop for OscServer {
    fn drop(&mut self) {
        // Signal the receive tasks if stop was never called
        if let Some(running) = self.running.get_mut().take() {
            running.shutdown.send_replace(true);
        }
    }
}

async fn run_datagram(
    socket: UdpSocket,
    local_addr: SocketAddr,
    context: Arc<Context>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut session = ServerSession::new(local_addr, Transport::Datagram);
    let mut buf = vec![0u8; context.recv_buffer_size];

    loop {
        let received = tokio::select! {
            received = socket.recv_from(&mut buf) => received,
            _ = shutdown.changed() => break,
        };

        match received {
            Ok((len, peer)) => {
                debug!(%peer, len, "datagram received");
                context.handle_frame(&mut session, &buf[..len]);
            }
            Err(err) => warn!(error = %err, "datagram receive failed"),
        }
    }

    info!(
        session = %session.id(),
        frames = session.frames_received(),
        decode_errors = session.decode_errors(),
        "datagram socket closed"
    );
}

async fn run_stream(
    listener: TcpListener,
    context: Arc<Context>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut sessions = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let session = ServerSession::new(peer, Transport::Stream);
                    debug!(session = %session.id(), %peer, "session accepted");
                    sessions.spawn(run_stream_session(
                        stream,
                        session,
                        Arc::clone(&context),
                        shutdown.clone(),
                    ));
                }
                Err(err) => warn!(error = %err, "accept failed"),
            },
            Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
            _ = shutdown.changed() => break,
        }
    }

    drop(listener);
    while sessions.join_next().await.is_some() {}
}

async fn run_stream_session(
    mut stream: TcpStream,
    mut session: ServerSession,
    context: Arc<Context>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut frames = FrameBuffer::new(context.max_frame_size);
    let mut buf = vec![0u8; context.recv_buffer_size];

    'session: loop {
        let read = tokio::select! {
            read = stream.read(&mut buf) => read,
            _ = shutdown.changed() => break,
        };

        match read {
            Ok(0) => break,
            Ok(n) => {
                frames.extend(&buf[..n]);
                loop {
                    match frames.next_frame() {
                        Ok(Some(frame)) => context.handle_frame(&mut session, &frame),
                        Ok(None) => break,
                        Err(err) => {
                            warn!(session = %session.id(), error = %err, "framing lost, closing session");
                            break 'session;
                        }
                    }
                }
            }
            Err(err) => {
                let err = TransportError::classify(err);
                if err.is_closed_session() {
                    debug!(session = %session.id(), error = %err, "peer closed session");
                } else {
                    warn!(session = %session.id(), error = %err, "session read failed");
                }
                break;
            }
        }
    }

    info!(
        session = %session.id(),
        peer = %session.addr(),
        frames = session.frames_received(),
        decode_errors = session.decode_errors(),
        age = ?session.age(),
        "session closed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Argument, Bundle, Message, Packet};
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::sync::mpsc;

    const WAIT: Duration = Duration::from_secs(5);

    struct Forward {
        tx: mpsc::UnboundedSender<Message>,
    }

    impl Listener for Forward {
        fn on_message(&self, message: &Message) {
            let _ = self.tx.send(message.clone());
        }
    }

    fn forward() -> (Arc<Forward>, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Forward { tx }), rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Message>) -> Message {
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("listener not invoked in time")
            .expect("listener channel closed")
    }

    fn local() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    fn stream_server() -> OscServer {
        OscServer::new(OscServerBuilder::new().transport(Transport::Stream).build())
    }

    #[test]
    fn test_server_builder() {
        let config = OscServerBuilder::new()
            .transport(Transport::Stream)
            .recv_buffer_size(1024)
            .max_frame_size(4096)
            .build();

        assert_eq!(config.transport, Transport::Stream);
        assert_eq!(config.recv_buffer_size, 1024);
        assert_eq!(config.max_frame_size, 4096);
        assert_eq!(ServerConfig::default().recv_buffer_size, 65535);
    }

    #[tokio::test]
    async fn test_datagram_dispatch() {
        let server = OscServer::new(ServerConfig::default());
        let (listener, mut rx) = forward();
        server.add_listener(listener);
        let addr = server.start(local()).await.unwrap();

        let socket = UdpSocket::bind(local()).await.unwrap();
        let bytes = hex::decode("2f666f6f000000002c6900000000002a").unwrap();
        socket.send_to(&bytes, addr).await.unwrap();

        let message = next(&mut rx).await;
        assert_eq!(message.address(), "/foo");
        assert_eq!(message.arguments(), [Argument::Int(42)]);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_malformed_datagram_does_not_stop_server() {
        let server = OscServer::new(ServerConfig::default());
        let (listener, mut rx) = forward();
        server.add_listener(listener);
        let addr = server.start(local()).await.unwrap();

        let socket = UdpSocket::bind(local()).await.unwrap();
        socket.send_to(b"/bad", addr).await.unwrap();
        let valid = codec::encode(&Message::new("/ok").into()).unwrap();
        socket.send_to(&valid, addr).await.unwrap();

        assert_eq!(next(&mut rx).await.address(), "/ok");
        server.stop().await;
    }

    #[cfg(feature = "client")]
    #[tokio::test]
    async fn test_stream_bundle_from_client() {
        use crate::client::{OscClient, OscClientBuilder};

        let server = stream_server();
        let (listener, mut rx) = forward();
        server.add_listener(listener);
        let addr = server.start(local()).await.unwrap();

        let client = OscClient::new(
            OscClientBuilder::new()
                .transport(Transport::Stream)
                .max_attempts(1)
                .build(),
        );
        client.connect(addr).await.unwrap();

        let bundle = Bundle::new()
            .with_packet(Message::new("/a"))
            .with_packet(Bundle::new().with_packet(Message::new("/b")))
            .with_packet(Message::new("/c"));
        client.send(bundle).await.unwrap();
        client.send(Message::new("/d")).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(next(&mut rx).await.address().to_string());
        }
        assert_eq!(seen, ["/a", "/b", "/c", "/d"]);

        client.disconnect().await;
        server.stop().await;
    }

    #[tokio::test]
    async fn test_bad_frame_closes_only_its_session() {
        let server = stream_server();
        let (listener, mut rx) = forward();
        server.add_listener(listener);
        let addr = server.start(local()).await.unwrap();

        let mut bad = TcpStream::connect(addr).await.unwrap();
        bad.write_all(&(-4i32).to_be_bytes()).await.unwrap();

        let mut good = TcpStream::connect(addr).await.unwrap();
        let packet: Packet = Message::new("/good").with_arg(1).into();
        let frame = crate::transport::encode_frame(&packet, Transport::Stream).unwrap();
        good.write_all(&frame).await.unwrap();

        assert_eq!(next(&mut rx).await.address(), "/good");

        // The poisoned session is closed by the server
        let mut buf = [0u8; 1];
        let read = tokio::time::timeout(WAIT, bad.read(&mut buf)).await.unwrap();
        assert!(matches!(read, Ok(0) | Err(_)));

        server.stop().await;
    }

    #[tokio::test]
    async fn test_removed_listener_not_invoked() {
        let server = OscServer::new(ServerConfig::default());
        let (kept, mut kept_rx) = forward();
        let (removed, mut removed_rx) = forward();
        server.add_listener(kept);
        server.add_listener(removed.clone());
        assert!(server.remove_listener(&removed));
        assert_eq!(server.listener_count(), 1);

        let addr = server.start(local()).await.unwrap();
        let socket = UdpSocket::bind(local()).await.unwrap();
        let bytes = codec::encode(&Message::new("/x").into()).unwrap();
        socket.send_to(&bytes, addr).await.unwrap();

        assert_eq!(next(&mut kept_rx).await.address(), "/x");
        assert!(removed_rx.try_recv().is_err());
        server.stop().await;
    }

    #[tokio::test]
    async fn test_factory_shapes_decoded_packets() {
        struct Widen;

        impl PacketFactory for Widen {
            fn map_argument(&self, argument: Argument) -> Argument {
                match argument {
                    Argument::Int(i) => Argument::Long(i64::from(i)),
                    other => other,
                }
            }
        }

        let server = OscServer::new(OscServerBuilder::new().factory(Arc::new(Widen)).build());
        let (listener, mut rx) = forward();
        server.add_listener(listener);
        let addr = server.start(local()).await.unwrap();

        let socket = UdpSocket::bind(local()).await.unwrap();
        let bytes = codec::encode(&Message::new("/n").with_arg(7).into()).unwrap();
        socket.send_to(&bytes, addr).await.unwrap();

        assert_eq!(next(&mut rx).await.arguments(), [Argument::Long(7)]);
        server.stop().await;
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let server = stream_server();
        assert!(!server.is_running().await);

        let addr = server.start(local()).await.unwrap();
        assert_eq!(server.local_addr().await, Some(addr));
        assert!(matches!(
            server.start(local()).await,
            Err(ServerError::AlreadyRunning(a)) if a == addr
        ));

        server.stop().await;
        assert!(!server.is_running().await);
        assert_eq!(server.local_addr().await, None);

        // Endpoint released; the same port can be bound again
        let rebound = server.start(addr).await.unwrap();
        assert_eq!(rebound, addr);
        server.stop().await;
        server.stop().await;
    }
}
