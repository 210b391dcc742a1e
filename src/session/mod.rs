//! Session socket to the appliance.
//!
//! A session owns one connection at a time:
//!
//! ```text
//! Disconnected ─► Connecting ─► Authenticating ─► Monitoring ─► Ready
//!       ▲                                                         │
//!       └───────────────────── I/O failure / teardown ────────────┘
//! ```
//!
//! After the password exchange a single driver task owns the framed stream.
//! It writes queued requests (assigning session ids), reads and dispatches
//! inbound datagrams, and runs the discovery chain. Everything the bridge
//! layer needs is published as [`SessionEvent`]s.

mod discovery;

pub use discovery::DiscoveryPhase;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::datagram::{
    Datagram, DatagramType, GetAllNodesInformationReq, GetSceneInformationReq,
    HouseStatusMonitorEnableReq, InformationRequestState, PasswordEnterReq,
};
use crate::error::{Error, Result};
use crate::protocol::FrameCodec;
use crate::transport::{BoxedStream, Connector};
use crate::types::{Scope, SessionId};

/// Capacity of the session event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Upper bound for flushing and shutting down the stream on teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

type FrameStream = Framed<BoxedStream, FrameCodec>;

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Authenticating,
    /// Monitoring enabled, discovery running.
    Monitoring,
    /// Discovery finished.
    Ready,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Event published by a session.
#[derive(Debug)]
pub enum SessionEvent {
    /// Inbound datagram not handled by the session itself.
    Datagram(Datagram),
    /// Appliance-reported or connection error.
    Error(Error),
    /// The connection ended without a teardown.
    Closed,
}

/// State visible outside the driver task.
#[derive(Default)]
struct Shared {
    state: RwLock<SessionState>,
    phase: RwLock<DiscoveryPhase>,
}

impl Shared {
    fn set_state(&self, state: SessionState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            debug!(from = %previous, to = %state, "session state changed");
        }
    }
}

/// Handles of the running driver task.
struct Connection {
    outbound: mpsc::UnboundedSender<Datagram>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Session socket to one appliance.
pub struct Session {
    connector: Arc<dyn Connector>,
    password: String,
    auth_timeout: Duration,
    shared: Arc<Shared>,
    connection: Mutex<Option<Connection>>,
    event_tx: mpsc::Sender<SessionEvent>,
}

impl Session {
    /// Create a disconnected session and the receiver for its events.
    pub fn new(
        connector: Arc<dyn Connector>,
        password: impl Into<String>,
        auth_timeout: Duration,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let session = Self {
            connector,
            password: password.into(),
            auth_timeout,
            shared: Arc::new(Shared::default()),
            connection: Mutex::new(None),
            event_tx,
        };
        (session, event_rx)
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.read()
    }

    pub fn discovery_phase(&self) -> DiscoveryPhase {
        *self.shared.phase.read()
    }

    /// Whether a driver task is running.
    pub fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .as_ref()
            .is_some_and(|c| !c.task.is_finished())
    }

    /// Connect, authenticate and enable monitoring.
    ///
    /// Any previous connection is torn down first. On failure the session
    /// is left disconnected.
    pub async fn connect(&self) -> Result<()> {
        self.teardown().await;
        self.shared.set_state(SessionState::Connecting);
        info!(peer = %self.connector.peer(), "connecting to gateway");

        match self.establish().await {
            Ok(()) => {
                info!(peer = %self.connector.peer(), "gateway session established");
                Ok(())
            }
            Err(e) => {
                self.shared.set_state(SessionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn establish(&self) -> Result<()> {
        let stream = self.connector.connect().await?;
        let mut frames = Framed::new(stream, FrameCodec::new());

        self.shared.set_state(SessionState::Authenticating);
        if let Err(e) = self.authenticate(&mut frames).await {
            let _ = timeout(CLOSE_TIMEOUT, SinkExt::<Datagram>::close(&mut frames)).await;
            return Err(e);
        }

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        outbound
            .send(HouseStatusMonitorEnableReq::empty().into())
            .map_err(|_| Error::ConnectionClosed)?;

        *self.shared.phase.write() = DiscoveryPhase::Idle;
        self.shared.set_state(SessionState::Monitoring);

        let cancel = CancellationToken::new();
        let driver = Driver {
            frames,
            outbound: outbound_rx,
            events: self.event_tx.clone(),
            shared: Arc::clone(&self.shared),
            cancel: cancel.clone(),
            discovery: DiscoveryPhase::Idle,
            next_session: SessionId::default(),
        };
        let task = tokio::spawn(driver.run());

        *self.connection.lock() = Some(Connection {
            outbound,
            cancel,
            task,
        });
        Ok(())
    }

    /// Send the password and wait for exactly one reply.
    async fn authenticate(&self, frames: &mut FrameStream) -> Result<()> {
        let request = PasswordEnterReq::new(&self.password)?;
        frames
            .send(Datagram::from(request))
            .await
            .map_err(|e| Error::Authentication(format!("sending password failed: {e}")))?;

        let reply = timeout(self.auth_timeout, frames.next())
            .await
            .map_err(|_| Error::Authentication("no reply to password".into()))?;

        match reply {
            Some(Ok(Ok(Datagram::PasswordEnterCfm(cfm)))) if cfm.is_success() => {
                debug!("password accepted");
                Ok(())
            }
            Some(Ok(Ok(Datagram::PasswordEnterCfm(cfm)))) => Err(Error::Authentication(format!(
                "password rejected (status {})",
                cfm.status().unwrap_or(u8::MAX)
            ))),
            Some(Ok(Ok(other))) => Err(Error::Authentication(format!(
                "unexpected reply {}",
                other.command()
            ))),
            Some(Ok(Err(e))) => Err(Error::Authentication(format!("malformed reply: {e}"))),
            Some(Err(e)) => Err(Error::Authentication(e.to_string())),
            None => Err(Error::Authentication("connection closed".into())),
        }
    }

    /// Queue a datagram for sending. Session-scoped requests get their
    /// session id assigned right before they are written.
    pub fn send(&self, datagram: impl Into<Datagram>) -> Result<()> {
        let datagram = datagram.into();
        let guard = self.connection.lock();
        let connection = guard.as_ref().ok_or(Error::ConnectionClosed)?;
        connection
            .outbound
            .send(datagram)
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Read the system table again, restarting discovery.
    pub fn request_state(&self) -> Result<()> {
        self.send(GetAllNodesInformationReq::empty())
    }

    /// Stop the driver task, then close the stream. Idempotent.
    pub async fn teardown(&self) {
        let connection = self.connection.lock().take();
        let Some(connection) = connection else {
            return;
        };

        connection.cancel.cancel();
        if let Err(e) = connection.task.await {
            warn!(error = %e, "session task failed");
        }
        self.shared.set_state(SessionState::Disconnected);
        debug!("session torn down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.get_mut().take() {
            connection.cancel.cancel();
        }
    }
}

// ============================================================================
// Driver task
// ============================================================================

/// Owns the stream of one connection.
struct Driver {
    frames: FrameStream,
    outbound: mpsc::UnboundedReceiver<Datagram>,
    events: mpsc::Sender<SessionEvent>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    discovery: DiscoveryPhase,
    next_session: SessionId,
}

impl Driver {
    async fn run(mut self) {
        let failure = loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break None,

                Some(datagram) = self.outbound.recv() => {
                    if let Err(e) = self.write(datagram).await {
                        break Some(e);
                    }
                }

                item = self.frames.next() => match item {
                    Some(Ok(Ok(datagram))) => match self.dispatch(datagram).await {
                        Err(e) if e.is_fatal_to_connection() => break Some(e),
                        Err(e) => debug!(error = %e, "dropping inbound datagram"),
                        Ok(()) => {}
                    },
                    // A bad frame only costs that frame
                    Some(Ok(Err(e))) => debug!(error = %e, "dropping inbound frame"),
                    Some(Err(e)) => break Some(e),
                    None => break Some(Error::ConnectionClosed),
                },
            }
        };

        // Refuse new requests; already queued ones stay readable
        self.outbound.close();
        self.shared.set_state(SessionState::Disconnected);
        match failure {
            None => {
                if timeout(CLOSE_TIMEOUT, self.flush_and_close()).await.is_err() {
                    debug!("stream shutdown timed out");
                }
            }
            Some(e) => {
                warn!(error = %e, "gateway connection lost");
                if !matches!(e, Error::ConnectionClosed) {
                    self.emit(SessionEvent::Error(e)).await;
                }
                self.emit(SessionEvent::Closed).await;
            }
        }
    }

    /// Write requests queued before the teardown, then close the stream.
    async fn flush_and_close(&mut self) {
        while let Ok(datagram) = self.outbound.try_recv() {
            if let Err(e) = self.write(datagram).await {
                debug!(error = %e, "dropping queued requests");
                break;
            }
        }
        let _ = SinkExt::<Datagram>::close(&mut self.frames).await;
    }

    async fn write(&mut self, mut datagram: Datagram) -> Result<()> {
        if let Some(request) = datagram.as_session_request_mut() {
            let id = self.next_session.take_next();
            request.set_session_id(id)?;
            debug!(command = %datagram.command(), session_id = %id, "sending request");
        } else {
            trace!(command = %datagram.command(), "sending request");
        }

        self.discovery.on_outbound(&datagram);
        self.publish_phase();
        self.frames.send(datagram).await
    }

    async fn dispatch(&mut self, datagram: Datagram) -> Result<()> {
        if let Some(response) = datagram.as_session_response() {
            debug!(
                command = %datagram.command(),
                session_id = %response.session_id()?,
                finished = response.is_final(),
                "received session response"
            );
        } else {
            trace!(command = %datagram.command(), "received datagram");
        }

        if let Some(request) = self.discovery.on_inbound(&datagram) {
            self.write(request).await?;
        }
        self.publish_phase();

        match &datagram {
            Datagram::ErrorNtf(ntf) => {
                let code = ntf.error()?;
                warn!(error = %code, "gateway reported an error");
                self.emit(SessionEvent::Error(Error::Gateway(code))).await;
            }

            // Confirmations without further meaning
            Datagram::PasswordEnterCfm(_)
            | Datagram::HouseStatusMonitorDisableCfm(_)
            | Datagram::GetAllNodesInformationCfm(_)
            | Datagram::GetAllGroupsInformationCfm(_)
            | Datagram::GetSceneListCfm(_)
            | Datagram::SetUtcCfm(_) => {}

            // Discovery signals, handled above
            Datagram::HouseStatusMonitorEnableCfm(_)
            | Datagram::GetAllNodesInformationFinishedNtf(_)
            | Datagram::GetAllGroupsInformationFinishedNtf(_) => {}

            Datagram::GetNodeInformationCfm(cfm) => {
                if cfm.state()? == InformationRequestState::RequestRejectedInvalidId {
                    self.invalid_identifier(Scope::Node, cfm.node_id()?).await;
                }
            }
            Datagram::GetGroupInformationCfm(cfm) => {
                if cfm.state()? == InformationRequestState::RequestRejectedInvalidId {
                    self.invalid_identifier(Scope::Group, cfm.group_id()?).await;
                }
            }
            Datagram::GetSceneInformationCfm(cfm) => {
                if cfm.state()? == InformationRequestState::RequestRejectedInvalidId {
                    self.invalid_identifier(Scope::Scene, cfm.scene_id()?).await;
                }
            }

            Datagram::SceneInformationChangedNtf(ntf) => {
                let request = GetSceneInformationReq::new(ntf.scene_id()?)?;
                self.write(request.into()).await?;
            }

            _ => self.emit(SessionEvent::Datagram(datagram)).await,
        }

        Ok(())
    }

    async fn invalid_identifier(&self, scope: Scope, id: u8) {
        warn!(%scope, id, "gateway rejected identifier");
        self.emit(SessionEvent::Error(Error::InvalidIdentifier { scope, id }))
            .await;
    }

    fn publish_phase(&self) {
        let mut phase = self.shared.phase.write();
        if *phase != self.discovery {
            *phase = self.discovery;
            drop(phase);
            let state = if self.discovery.is_done() {
                SessionState::Ready
            } else {
                SessionState::Monitoring
            };
            self.shared.set_state(state);
        }
    }

    /// Publish an event without blocking cancellation.
    async fn emit(&self, event: SessionEvent) {
        tokio::select! {
            _ = self.events.send(event) => {}
            () = self.cancel.cancelled() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::io::DuplexStream;

    use crate::datagram::{Command, PasswordEnterCfm};

    /// Hands out one prepared stream.
    struct OneShot(Mutex<Option<DuplexStream>>);

    #[async_trait]
    impl Connector for OneShot {
        async fn connect(&self) -> Result<BoxedStream> {
            let stream = self.0.lock().take().ok_or(Error::ConnectionClosed)?;
            Ok(Box::new(stream))
        }

        fn peer(&self) -> String {
            "test".into()
        }
    }

    fn session() -> (Session, mpsc::Receiver<SessionEvent>, FrameStream) {
        let (client, server) = tokio::io::duplex(4096);
        let connector = Arc::new(OneShot(Mutex::new(Some(client))));
        let (session, events) = Session::new(connector, "secret", Duration::from_secs(1));
        let appliance = Framed::new(Box::new(server) as BoxedStream, FrameCodec::new());
        (session, events, appliance)
    }

    async fn expect(appliance: &mut FrameStream, command: Command) -> Datagram {
        let datagram = appliance.next().await.unwrap().unwrap().unwrap();
        assert_eq!(datagram.command(), command);
        datagram
    }

    #[tokio::test]
    async fn test_rejected_password() {
        let (session, _events, mut appliance) = session();

        let gateway = tokio::spawn(async move {
            let request = expect(&mut appliance, Command::PasswordEnterReq).await;
            if let Datagram::PasswordEnterReq(req) = request {
                assert_eq!(req.password().unwrap(), "secret");
            }
            let cfm = PasswordEnterCfm::from_bytes(&[1]).unwrap();
            appliance.send(Datagram::from(cfm)).await.unwrap();
        });

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(!session.is_connected());
        gateway.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let (session, _events, _appliance) = session();
        assert!(matches!(
            session.send(GetAllNodesInformationReq::empty()),
            Err(Error::ConnectionClosed)
        ));
        // teardown of an idle session is a no-op
        session.teardown().await;
        session.teardown().await;
    }

    #[tokio::test]
    async fn test_monitoring_enabled_after_login() {
        let (session, _events, mut appliance) = session();

        let login = async {
            expect(&mut appliance, Command::PasswordEnterReq).await;
            appliance
                .send(Datagram::from(PasswordEnterCfm::empty()))
                .await
                .unwrap();
        };
        let (result, ()) = tokio::join!(session.connect(), login);
        result.unwrap();

        expect(&mut appliance, Command::HouseStatusMonitorEnableReq).await;
        assert_eq!(session.state(), SessionState::Monitoring);
        assert!(session.is_connected());

        session.teardown().await;
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(appliance.next().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_session_driven_from_worker_task() {
        let (session, mut events, mut appliance) = session();
        let session = Arc::new(session);

        let client = Arc::clone(&session);
        let connect = tokio::spawn(async move { client.connect().await });

        expect(&mut appliance, Command::PasswordEnterReq).await;
        appliance
            .send(Datagram::from(PasswordEnterCfm::empty()))
            .await
            .unwrap();
        connect.await.unwrap().unwrap();
        expect(&mut appliance, Command::HouseStatusMonitorEnableReq).await;

        drop(appliance);
        assert!(matches!(events.recv().await, Some(SessionEvent::Closed)));
        assert_eq!(session.state(), SessionState::Disconnected);
    }
}
