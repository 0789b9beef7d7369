//! OSC transport client.
//!
//! [`OscClient`] sends packets to one peer over UDP or TCP. Packets sent
//! while the link is down are queued and flushed in order once a connection
//! is established.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex, Notify, watch};
use tracing::{debug, error, info, warn};

use crate::core::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, OscError, OscResult,
};
use crate::packet::Packet;
use crate::transport::{
    AttemptCounter, ConnectionState, Link, RetryPolicy, Transport, TransportError, encode_frame,
};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Transport kind.
    pub transport: Transport,

    /// Timeout for a single connection attempt.
    pub connect_timeout: Duration,

    /// Total connection attempts per cycle, including the first.
    pub max_attempts: u32,

    /// Delay between consecutive attempts.
    pub retry_delay: Duration,
}

impl ClientConfig {
    /// Retry policy derived from this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            retry_delay: self.retry_delay,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Builder for creating an `OscClient`.
#[derive(Debug)]
pub struct OscClientBuilder {
    config: ClientConfig,
}

impl OscClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Set the transport kind.
    pub fn transport(mut self, transport: Transport) -> Self {
        self.config.transport = transport;
        self
    }

    /// Set the per-attempt connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the maximum number of connection attempts.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Set the delay between connection attempts.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for OscClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Link and pending queue, guarded together so a drain on connect never
/// interleaves with an enqueue from `send`.
#[derive(Debug, Default)]
struct Io {
    endpoint: Option<SocketAddr>,
    link: Option<Link>,
    pending: VecDeque<Packet>,
}

/// One connection cycle: its attempt budget and cancellation signal.
///
/// Every `connect`, and every reconnect started by `send`, runs under a
/// fresh cycle. Only the current, uncancelled cycle may publish a state.
#[derive(Debug)]
struct Cycle {
    id: u64,
    attempts: AttemptCounter,
    cancelled: AtomicBool,
    cancel: Notify,
}

impl Cycle {
    fn new(id: u64, max_attempts: u32) -> Self {
        Self {
            id,
            attempts: AttemptCounter::new(max_attempts),
            cancelled: AtomicBool::new(false),
            cancel: Notify::new(),
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.attempts.poison();
        self.cancel.notify_waiters();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Sleep for `delay` unless cancelled. Returns `false` on cancellation.
    async fn wait_retry(&self, delay: Duration) -> bool {
        let notified = self.cancel.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => !self.is_cancelled(),
            _ = &mut notified => false,
        }
    }
}

#[derive(Debug)]
struct Inner {
    config: ClientConfig,
    state: watch::Sender<ConnectionState>,
    cycle: StdMutex<Arc<Cycle>>,
    next_cycle: AtomicU64,
    io: Mutex<Io>,
}

/// An OSC client bound to one transport kind.
///
/// Cloning is cheap; clones share the link, queue and state.
///
/// # Example
///
/// ```ignore
/// use osc_protocol::client::{OscClient, OscClientBuilder};
/// use osc_protocol::packet::Message;
///
/// let client = OscClient::new(OscClientBuilder::new().build());
/// client.connect("127.0.0.1:10000".parse()?).await?;
/// client.send(Message::new("/play").with_arg(1)).await?;
/// client.disconnect().await;
/// ```
#[derive(Debug, Clone)]
pub struct OscClient {
    inner: Arc<Inner>,
}

impl OscClient {
    /// Create a disconnected client.
    pub fn new(config: ClientConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                cycle: StdMutex::new(Arc::new(Cycle::new(0, config.max_attempts))),
                config,
                state,
                next_cycle: AtomicU64::new(1),
                io: Mutex::new(Io::default()),
            }),
        }
    }

    /// Connect to `endpoint`, retrying per the configured policy.
    ///
    /// Returns once connected (the pending queue has been flushed) or once
    /// every attempt has failed, in which case the state is
    /// [`ConnectionState::Failed`]. A concurrent [`disconnect`](Self::disconnect),
    /// or a later `connect`, cancels the cycle; a cancelled cycle returns an
    /// error and leaves the state to whoever cancelled it.
    pub async fn connect(&self, endpoint: SocketAddr) -> OscResult<()> {
        self.inner.io.lock().await.endpoint = Some(endpoint);
        let cycle = self.inner.begin_cycle();
        self.inner.run_connect(&cycle, endpoint).await
    }

    /// Send a packet.
    ///
    /// When connected the packet is encoded and written immediately; encode
    /// and write errors are returned without changing the connection state.
    /// Otherwise the packet is queued and `Ok` is returned. An unreachable
    /// peer puts the packet back at the head of the queue and starts a
    /// background reconnect cycle.
    pub async fn send(&self, packet: impl Into<Packet>) -> OscResult<()> {
        let packet = packet.into();
        let mut io = self.inner.io.lock().await;

        let Some(link) = io.link.as_mut() else {
            io.pending.push_back(packet);
            debug!(pending = io.pending.len(), "not connected, packet queued");
            return Ok(());
        };

        let frame = encode_frame(&packet, link.transport())?;
        match link.send_frame(&frame).await {
            Ok(()) => {
                debug!(bytes = frame.len(), "packet sent");
                Ok(())
            }
            Err(err) if err.is_retryable() => {
                warn!(error = %err, "peer unreachable, packet requeued");
                io.link = None;
                io.pending.push_front(packet);
                let endpoint = io.endpoint;
                let cycle = self.inner.begin_reconnect_cycle();
                drop(io);

                if let (Some(endpoint), Some(cycle)) = (endpoint, cycle) {
                    self.spawn_reconnect(cycle, endpoint);
                }
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Close the link and cancel any connection cycle in progress.
    ///
    /// Queued packets are kept; a later [`connect`](Self::connect) flushes them.
    pub async fn disconnect(&self) {
        self.inner.lock_cycle().cancel();

        let mut io = self.inner.io.lock().await;
        if let Some(link) = io.link.take() {
            if let Ok(peer) = link.peer_addr() {
                info!(%peer, "disconnected");
            }
        }
        self.inner.state.send_replace(ConnectionState::Disconnected);
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Watch connection state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Check if the client is connected.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Connection attempts made in the current cycle.
    pub fn connection_attempts(&self) -> u32 {
        self.inner.lock_cycle().attempts.attempts()
    }

    /// Snapshot of the pending queue, oldest first.
    pub async fn pending_packets(&self) -> Vec<Packet> {
        self.inner.io.lock().await.pending.iter().cloned().collect()
    }

    /// Number of queued packets.
    pub async fn pending_len(&self) -> usize {
        self.inner.io.lock().await.pending.len()
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    fn spawn_reconnect(&self, cycle: Arc<Cycle>, endpoint: SocketAddr) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            // Failure is already logged and reflected in the state
            let _ = inner.run_connect(&cycle, endpoint).await;
        });
    }
}

impl Inner {
    async fn run_connect(&self, cycle: &Cycle, endpoint: SocketAddr) -> OscResult<()> {
        let policy = self.config.retry_policy();
        let mut last_error = String::from("no attempt made");

        while !cycle.is_cancelled() {
            let Some(attempt) = cycle.attempts.begin() else {
                break;
            };
            if !self.set_state_for(cycle, ConnectionState::Connecting) {
                break;
            }
            debug!(%endpoint, cycle = cycle.id, attempt, max = policy.max_attempts, "connecting");

            let result = tokio::select! {
                result = Link::connect(self.config.transport, endpoint, self.config.connect_timeout) => result,
                _ = cycle.cancel.notified() => break,
            };

            match result {
                Ok(link) => match self.establish(cycle, link).await {
                    Ok(true) => {
                        info!(%endpoint, attempt, "connected");
                        return Ok(());
                    }
                    Ok(false) => break,
                    Err(err) => last_error = err.to_string(),
                },
                Err(err) => last_error = err.to_string(),
            }

            if !cycle.attempts.has_remaining() {
                break;
            }
            warn!(
                %endpoint,
                attempt,
                error = %last_error,
                delay = ?policy.retry_delay,
                "connection attempt failed, retrying"
            );
            if !cycle.wait_retry(policy.retry_delay).await {
                break;
            }
        }

        let attempts = cycle.attempts.attempts();
        if cycle.is_cancelled() || !self.set_state_for(cycle, ConnectionState::Failed) {
            debug!(%endpoint, cycle = cycle.id, attempts, "connection cycle cancelled");
            return Err(OscError::ConnectivityFailure {
                attempts,
                reason: String::from("connection cycle cancelled"),
            });
        }

        error!(%endpoint, attempts, error = %last_error, "giving up on connection");
        Err(OscError::ConnectivityFailure {
            attempts,
            reason: last_error,
        })
    }

    /// Flush the pending queue through `link` and install it.
    ///
    /// Returns `Ok(false)` if `cycle` was cancelled or replaced meanwhile. A
    /// write failure during the flush leaves the unsent packets queued.
    async fn establish(&self, cycle: &Cycle, mut link: Link) -> Result<bool, TransportError> {
        let mut io = self.io.lock().await;
        if !self.is_current(cycle) {
            return Ok(false);
        }

        let transport = link.transport();
        let flushed = io.pending.len();
        while let Some(packet) = io.pending.pop_front() {
            let frame = match encode_frame(&packet, transport) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(error = %err, "dropping queued packet that cannot be encoded");
                    continue;
                }
            };
            if let Err(err) = link.send_frame(&frame).await {
                io.pending.push_front(packet);
                return Err(err);
            }
        }
        if flushed > 0 {
            debug!(flushed, "pending queue flushed");
        }

        if !self.set_state_for(cycle, ConnectionState::Connected) {
            return Ok(false);
        }
        io.link = Some(link);
        Ok(true)
    }

    /// Replace the current cycle, cancelling the one it supersedes.
    fn begin_cycle(&self) -> Arc<Cycle> {
        let cycle = Arc::new(self.new_cycle());
        let mut current = self.lock_cycle();
        current.cancel();
        *current = Arc::clone(&cycle);
        cycle
    }

    /// Start a reconnect after a send found the peer unreachable.
    ///
    /// Returns `None` if a `disconnect` has already cancelled the cycle that
    /// established the link; the state is then left to it.
    fn begin_reconnect_cycle(&self) -> Option<Arc<Cycle>> {
        let cycle = Arc::new(self.new_cycle());
        let mut current = self.lock_cycle();
        if current.is_cancelled() {
            return None;
        }
        current.cancel();
        *current = Arc::clone(&cycle);
        self.state.send_replace(ConnectionState::Connecting);
        Some(cycle)
    }

    fn new_cycle(&self) -> Cycle {
        let id = self.next_cycle.fetch_add(1, Ordering::Relaxed);
        Cycle::new(id, self.config.max_attempts)
    }

    /// Publish `state` if `cycle` is still the live one.
    fn set_state_for(&self, cycle: &Cycle, state: ConnectionState) -> bool {
        let current = self.lock_cycle();
        if current.id != cycle.id || cycle.is_cancelled() {
            return false;
        }
        self.state.send_replace(state);
        true
    }

    fn is_current(&self, cycle: &Cycle) -> bool {
        let current = self.lock_cycle();
        current.id == cycle.id && !cycle.is_cancelled()
    }

    // Never held across an await, so a poisoned lock still holds a valid cycle.
    fn lock_cycle(&self) -> MutexGuard<'_, Arc<Cycle>> {
        self.cycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
