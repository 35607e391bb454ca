use crate::core::bridge::{BinaryRecv, BinarySendStatus, BridgeResponse, BridgeRoute, Direction};
use crate::core::config::ManagerConfig;
use crate::core::dispatcher::{Dispatcher, EventReceiver, UnclaimedEvents};
use crate::core::entry::ConnectionSnapshot;
use crate::core::registry::Registry;
use crate::protocol::Command;
use crate::traits::transport::SocketNotice;
use crate::traits::*;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Close reason sent to every socket when the manager shuts down
pub const SHUTDOWN_REASON: &str = "manager shutdown";

/// Command for the manager task
pub(crate) enum ManagerCommand {
    /// Create or replace a connection
    Open {
        id: Identity,
        protocols: Vec<String>,
        reconnect: Option<ReconnectPolicy>,
    },
    /// Send a text frame (dropped if not open)
    Send { id: Identity, data: String },
    /// Close on purpose
    Close {
        id: Identity,
        code: Option<CloseCode>,
        reason: Option<String>,
    },
    /// Replace the reconnect policy without reopening
    ConfigureReconnect {
        id: Identity,
        reconnect: Option<ReconnectPolicy>,
    },
    /// Register an event subscriber for one identity
    Subscribe {
        id: Identity,
        sender: UnboundedSender<crate::core::event::Event>,
    },
    /// Forward a binary frame
    SendBinary {
        id: Identity,
        data: Vec<u8>,
        reply: oneshot::Sender<BinarySendStatus>,
    },
    /// Long-poll for the next binary frame
    RecvBinary {
        id: Identity,
        reply: oneshot::Sender<BinaryRecv>,
    },
    /// Status of one connection
    Snapshot {
        id: Identity,
        reply: oneshot::Sender<Option<ConnectionSnapshot>>,
    },
    /// Status of all connections
    ListConnections {
        reply: oneshot::Sender<Vec<ConnectionSnapshot>>,
    },
    /// Tear everything down and stop
    Shutdown { reply: oneshot::Sender<()> },
}

/// A reconnect timer fired
#[derive(Debug)]
pub(crate) struct ReconnectDue {
    pub identity: Identity,
    pub token: u64,
}

/// Everything the manager task processes
///
/// Commands, socket signals and timer firings share one queue and are
/// applied strictly in the order they were posted.
pub(crate) enum Inbound {
    Command(ManagerCommand),
    Signal(SocketNotice),
    ReconnectDue(ReconnectDue),
}

/// Manager for multiple WebSocket connections
///
/// A cheap, cloneable handle to a single manager task that owns the
/// connection registry. Every operation is a message to that task, so all
/// registry mutation, socket signals and timer firings happen one step at a
/// time on one task, in the order they were posted, and no lock guards the
/// registry.
///
/// Dropping every handle (or calling [`shutdown`](Self::shutdown)) tears all
/// connections down.
///
/// # Example
/// ```ignore
/// use sockmux::{ConnectionManager, ReconnectPolicy, TungsteniteTransport};
///
/// let (manager, mut unclaimed) = ConnectionManager::new(TungsteniteTransport::new());
/// let mut events = manager.subscribe("wss://api.example.com/feed")?;
///
/// manager.open(
///     "wss://api.example.com/feed",
///     vec![],
///     Some(ReconnectPolicy::new().max_retries(5)),
/// )?;
///
/// while let Some(event) = events.recv().await {
///     println!("event: {:?}", event);
/// }
/// ```
#[derive(Clone)]
pub struct ConnectionManager {
    inbox: UnboundedSender<Inbound>,
}

impl ConnectionManager {
    /// Start a manager with default configuration
    ///
    /// Must be called from within a tokio runtime. Returns the handle and
    /// the stream of events no subscriber claimed.
    pub fn new<T: Transport>(transport: T) -> (Self, UnclaimedEvents) {
        Self::with_config(ManagerConfig::default(), transport)
    }

    /// Start a manager with explicit configuration
    pub fn with_config<T: Transport>(config: ManagerConfig, transport: T) -> (Self, UnclaimedEvents) {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (dispatcher, unclaimed) = Dispatcher::new();

        let task = ManagerTask {
            config,
            transport: Arc::new(transport),
            registry: Registry::new(),
            dispatcher,
            inbox: inbox_tx.downgrade(),
            next_socket_id: 0,
            next_timer_token: 0,
        };

        tokio::spawn(task.run(inbox_rx));
        debug!("Connection manager task started");

        (Self { inbox: inbox_tx }, unclaimed)
    }

    fn submit(&self, command: ManagerCommand) -> Result<()> {
        self.inbox
            .send(Inbound::Command(command))
            .map_err(|_| SockmuxError::ManagerClosed)
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> ManagerCommand) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.submit(build(tx))?;
        rx.await.map_err(|_| SockmuxError::ManagerClosed)
    }

    /// Open (or replace) the connection for `id`
    ///
    /// An existing connection with the same identity is closed with
    /// 1000 / "replaced" first; its retry count carries over.
    ///
    /// # Arguments
    /// * `id` - Connection identity; for [`TungsteniteTransport`](crate::TungsteniteTransport) this is the URL
    /// * `protocols` - Requested sub-protocols, in preference order (may be empty)
    /// * `reconnect` - Policy for unintentional closes; `None` disables reconnection
    ///
    /// # Returns
    /// `Ok(())` once the command is queued. Connection progress arrives as
    /// events. Fails with [`SockmuxError::Configuration`] for an invalid policy
    /// and [`SockmuxError::ManagerClosed`] once the manager task is gone.
    pub fn open(
        &self,
        id: impl Into<Identity>,
        protocols: Vec<String>,
        reconnect: Option<ReconnectPolicy>,
    ) -> Result<()> {
        if let Some(policy) = &reconnect {
            policy.validate()?;
        }
        self.submit(ManagerCommand::Open {
            id: id.into(),
            protocols,
            reconnect,
        })
    }

    /// Send a text frame
    ///
    /// Silently dropped when there is no such connection or it is not open.
    pub fn send(&self, id: impl Into<Identity>, data: impl Into<String>) -> Result<()> {
        self.submit(ManagerCommand::Send {
            id: id.into(),
            data: data.into(),
        })
    }

    /// Close on purpose (defaults: 1000 and an empty reason)
    ///
    /// Cancels any pending reconnection and releases a parked binary
    /// receiver. A no-op for unknown identities.
    pub fn close(
        &self,
        id: impl Into<Identity>,
        code: Option<CloseCode>,
        reason: Option<String>,
    ) -> Result<()> {
        self.submit(ManagerCommand::Close {
            id: id.into(),
            code,
            reason,
        })
    }

    /// Replace the reconnect policy of an existing connection without reopening it
    pub fn configure_reconnect(
        &self,
        id: impl Into<Identity>,
        reconnect: Option<ReconnectPolicy>,
    ) -> Result<()> {
        if let Some(policy) = &reconnect {
            policy.validate()?;
        }
        self.submit(ManagerCommand::ConfigureReconnect {
            id: id.into(),
            reconnect,
        })
    }

    /// Apply a wire command
    pub fn execute(&self, command: Command) -> Result<()> {
        match command {
            Command::Open {
                id,
                protocols,
                reconnect,
            } => self.open(id, protocols, reconnect),
            Command::Send { id, data } => self.send(id, data),
            Command::Close { id, code, reason } => self.close(id, code, reason),
            Command::ConfigureReconnect { id, reconnect } => self.configure_reconnect(id, reconnect),
        }
    }

    /// Receive the events of one identity
    ///
    /// Subscribers are tried in registration order; the first live one
    /// receives each event. Unclaimed events go to the stream returned by
    /// [`new`](Self::new).
    pub fn subscribe(&self, id: impl Into<Identity>) -> Result<EventReceiver> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.submit(ManagerCommand::Subscribe {
            id: id.into(),
            sender,
        })?;
        Ok(receiver)
    }

    /// Forward a binary frame if the connection is open
    pub async fn send_binary(
        &self,
        id: impl Into<Identity>,
        data: impl Into<Vec<u8>>,
    ) -> Result<BinarySendStatus> {
        let id = id.into();
        let data = data.into();
        self.request(|reply| ManagerCommand::SendBinary { id, data, reply })
            .await
    }

    /// Wait for the next binary frame
    ///
    /// Resolves immediately with the oldest buffered frame, otherwise waits
    /// until a frame arrives or the connection closes or is replaced
    /// ([`BinaryRecv::Terminated`]).
    pub async fn recv_binary(&self, id: impl Into<Identity>) -> Result<BinaryRecv> {
        let id = id.into();
        self.request(|reply| ManagerCommand::RecvBinary { id, reply })
            .await
    }

    /// Iterate binary frames of one connection
    pub fn binary_frames(&self, id: impl Into<Identity>) -> BinaryFrames {
        BinaryFrames {
            manager: self.clone(),
            identity: id.into(),
        }
    }

    /// Serve a `"send/<id>"` or `"recv/<id>"` bridge request
    ///
    /// # Arguments
    /// * `route` - Direction and percent-encoded identity, e.g. `recv/wss%3A%2F%2Fhost%2Ffeed`
    /// * `body` - Frame to forward for `send`; ignored for `recv`
    ///
    /// # Returns
    /// A response with status 200 (forwarded or frame delivered), 503 (not
    /// open) or 499 (receive ended by close or replacement)
    pub async fn handle_bridge_request(&self, route: &str, body: Vec<u8>) -> Result<BridgeResponse> {
        let route = BridgeRoute::parse(route)?;
        debug!("Bridge request {}", route);

        match route.direction {
            Direction::Send => Ok(self.send_binary(route.identity, body).await?.into_response()),
            Direction::Recv => Ok(self.recv_binary(route.identity).await?.into_response()),
        }
    }

    /// Status of one connection
    pub async fn snapshot(&self, id: impl Into<Identity>) -> Result<Option<ConnectionSnapshot>> {
        let id = id.into();
        self.request(|reply| ManagerCommand::Snapshot { id, reply })
            .await
    }

    /// Status of every connection, sorted by identity
    pub async fn connections(&self) -> Result<Vec<ConnectionSnapshot>> {
        self.request(|reply| ManagerCommand::ListConnections { reply })
            .await
    }

    /// Close every connection and stop the manager task
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down connection manager");
        self.request(|reply| ManagerCommand::Shutdown { reply })
            .await
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("closed", &self.inbox.is_closed())
            .finish()
    }
}

/// Repeated long-poll over one connection's binary frames
#[derive(Debug, Clone)]
pub struct BinaryFrames {
    manager: ConnectionManager,
    identity: Identity,
}

impl BinaryFrames {
    /// Next frame, or `None` once the connection is closed or replaced
    pub async fn next(&mut self) -> Option<Vec<u8>> {
        match self.manager.recv_binary(self.identity.clone()).await {
            Ok(BinaryRecv::Frame(frame)) => Some(frame),
            Ok(BinaryRecv::Terminated) | Err(_) => None,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

/// State owned by the manager task
pub(crate) struct ManagerTask {
    pub(super) config: ManagerConfig,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) registry: Registry,
    pub(super) dispatcher: Dispatcher,
    /// Weak, so only live handles keep the task running
    pub(super) inbox: WeakUnboundedSender<Inbound>,
    pub(super) next_socket_id: SocketId,
    pub(super) next_timer_token: u64,
}

impl ManagerTask {
    async fn run(mut self, mut inbox: UnboundedReceiver<Inbound>) {
        while let Some(message) = inbox.recv().await {
            match message {
                Inbound::Command(ManagerCommand::Shutdown { reply }) => {
                    self.teardown();
                    let _ = reply.send(());
                    debug!("Connection manager task stopped");
                    return;
                }
                Inbound::Command(command) => self.handle_command(command),
                Inbound::Signal(notice) => self.handle_signal(notice),
                Inbound::ReconnectDue(due) => self.handle_reconnect_due(due),
            }
        }

        debug!("All manager handles dropped");
        self.teardown();
        debug!("Connection manager task stopped");
    }

    fn handle_command(&mut self, command: ManagerCommand) {
        match command {
            ManagerCommand::Open {
                id,
                protocols,
                reconnect,
            } => self.open(id, protocols, reconnect),
            ManagerCommand::Send { id, data } => self.send_text(&id, data),
            ManagerCommand::Close { id, code, reason } => self.close(&id, code, reason),
            ManagerCommand::ConfigureReconnect { id, reconnect } => {
                self.configure_reconnect(&id, reconnect)
            }
            ManagerCommand::Subscribe { id, sender } => self.dispatcher.subscribe_with(id, sender),
            ManagerCommand::SendBinary { id, data, reply } => {
                let _ = reply.send(self.send_binary(&id, data));
            }
            ManagerCommand::RecvBinary { id, reply } => self.recv_binary(&id, reply),
            ManagerCommand::Snapshot { id, reply } => {
                let _ = reply.send(self.registry.get(&id).map(|entry| entry.snapshot()));
            }
            ManagerCommand::ListConnections { reply } => {
                let _ = reply.send(self.registry.snapshots());
            }
            // Handled by the run loop
            ManagerCommand::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    /// Close every connection on purpose and empty the registry
    fn teardown(&mut self) {
        if self.registry.is_empty() {
            debug!("No connections to tear down");
            return;
        }

        info!("Tearing down {} connection(s)", self.registry.len());
        for mut entry in self.registry.drain() {
            entry.begin_close(CloseCode::GoingAway, SHUTDOWN_REASON);
        }
    }

    pub(super) fn allocate_socket_id(&mut self) -> SocketId {
        self.next_socket_id += 1;
        self.next_socket_id
    }

    pub(super) fn allocate_timer_token(&mut self) -> u64 {
        self.next_timer_token += 1;
        self.next_timer_token
    }
}
