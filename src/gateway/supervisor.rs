//! Connection supervision.
//!
//! One task owns the connection policy. It connects on start, sets the
//! appliance clock, sends a keep-alive every heartbeat interval and
//! reconnects when no inbound traffic arrived for `interval + grace_period`.
//! A session lost to a recoverable error is reconnected at once; any other
//! loss waits for the next keep-alive tick. A reboot tears the connection down and reconnects
//! after the grace period.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Gateway, GatewayEvent};
use crate::catalog::NameCatalog;
use crate::config::{Config, HeartbeatConfig};
use crate::error::Result;
use crate::session::{SessionEvent, SessionState};
use crate::telegram::Telegram;
use crate::transport::{Connector, TlsConnector};
use crate::types::ConnectionState;

/// Requests handled by the supervisor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Reconnect,
    Reboot,
}

/// Supervised gateway connection.
pub struct VeluxGateway {
    gateway: Arc<Gateway>,
    control: mpsc::UnboundedSender<Control>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl VeluxGateway {
    /// Start supervising a connection described by the configuration.
    pub fn start(config: &Config) -> Result<Self> {
        let connector = Arc::new(TlsConnector::from_config(&config.gateway)?);
        Ok(Self::with_connector(
            connector,
            &config.gateway.password,
            config.gateway.auth_timeout,
            config.heartbeat.clone(),
        ))
    }

    /// Start supervising a connection over any connector.
    pub fn with_connector(
        connector: Arc<dyn Connector>,
        password: &str,
        auth_timeout: Duration,
        heartbeat: HeartbeatConfig,
    ) -> Self {
        let (gateway, session_events) = Gateway::new(connector, password, auth_timeout);
        let gateway = Arc::new(gateway);
        let (control, control_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let supervisor = Supervisor {
            gateway: Arc::clone(&gateway),
            session_events,
            control: control_rx,
            cancel: cancel.clone(),
            heartbeat,
            last_heartbeat: Instant::now(),
            pending_reconnect: None,
            reconnect_on_close: true,
        };
        let task = tokio::spawn(supervisor.run());

        Self {
            gateway,
            control,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// Subscribe to host events.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.gateway.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.gateway.state()
    }

    pub fn session_state(&self) -> SessionState {
        self.gateway.session_state()
    }

    /// Snapshot of the name catalog.
    pub fn catalog(&self) -> NameCatalog {
        self.gateway.catalog()
    }

    /// Execute a host telegram.
    pub fn send_request(&self, telegram: &Telegram) {
        self.gateway.send_request(telegram);
    }

    /// Parse and execute a host telegram; unparseable text is reported as error.
    pub fn send_text(&self, text: &str) {
        match Telegram::parse(text) {
            Some(telegram) => self.send_request(&telegram),
            None => self
                .gateway
                .report(&crate::Error::UnsupportedTelegram(text.trim().to_string())),
        }
    }

    pub fn set_clock(&self, time: SystemTime) -> Result<()> {
        self.gateway.set_clock(time)
    }

    /// Read the system table again.
    pub fn request_state(&self) -> Result<()> {
        self.gateway.request_state()
    }

    /// Send a keep-alive request now, independent of the timer.
    pub fn keep_alive(&self) -> Result<()> {
        self.gateway.keep_alive()
    }

    /// Tear down and connect again; cancels a pending reboot reconnect.
    pub fn reconnect(&self) {
        let _ = self.control.send(Control::Reconnect);
    }

    /// Reboot the appliance and reconnect after the grace period.
    pub fn request_reboot(&self) {
        let _ = self.control.send(Control::Reboot);
    }

    /// Stop supervising and close the connection.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "supervisor task failed");
            }
        }
    }
}

impl Drop for VeluxGateway {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ============================================================================
// Supervisor task
// ============================================================================

struct Supervisor {
    gateway: Arc<Gateway>,
    session_events: mpsc::Receiver<SessionEvent>,
    control: mpsc::UnboundedReceiver<Control>,
    cancel: CancellationToken,
    heartbeat: HeartbeatConfig,
    last_heartbeat: Instant,
    /// Reconnect deadline after a reboot.
    pending_reconnect: Option<Instant>,
    /// Whether the failure that ended the session allows an immediate
    /// reconnect. Otherwise the next keep-alive tick retries.
    reconnect_on_close: bool,
}

impl Supervisor {
    async fn run(mut self) {
        self.connect().await;

        let period = self.heartbeat.interval;
        let mut keep_alive = interval_at(Instant::now() + period, period);
        keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let reconnect_at = self.pending_reconnect.unwrap_or_else(Instant::now);

            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,

                Some(control) = self.control.recv() => match control {
                    Control::Reconnect => self.reconnect().await,
                    Control::Reboot => self.reboot().await,
                },

                Some(event) = self.session_events.recv() => self.on_session_event(event).await,

                () = sleep_until(reconnect_at), if self.pending_reconnect.is_some() => {
                    self.pending_reconnect = None;
                    info!("reconnecting after reboot");
                    self.reconnect().await;
                }

                _ = keep_alive.tick() => self.keep_alive().await,
            }
        }

        self.disconnect().await;
        debug!("supervisor stopped");
    }

    async fn on_session_event(&mut self, event: SessionEvent) {
        match &event {
            SessionEvent::Datagram(_) => self.last_heartbeat = Instant::now(),
            SessionEvent::Error(e) if e.is_fatal_to_connection() => {
                self.reconnect_on_close = e.should_reconnect();
            }
            _ => {}
        }

        // Events of an older connection may still be queued
        let closed = matches!(event, SessionEvent::Closed)
            && self.gateway.session_state() == SessionState::Disconnected;
        self.gateway.handle_session_event(event);
        if closed {
            self.on_closed().await;
        }
    }

    async fn on_closed(&mut self) {
        let recoverable = std::mem::replace(&mut self.reconnect_on_close, true);
        if recoverable {
            warn!("gateway connection closed, reconnecting");
            self.reconnect().await;
        } else {
            warn!("gateway connection lost, retrying on next keep-alive");
            self.disconnect().await;
        }
    }

    async fn connect(&mut self) {
        self.gateway.set_state(ConnectionState::Connecting);

        match self.gateway.connect().await {
            Ok(()) => {
                self.last_heartbeat = Instant::now();
                self.reconnect_on_close = true;
                if let Err(e) = self.gateway.set_clock(SystemTime::now()) {
                    self.gateway.report(&e);
                }
                self.gateway.set_state(ConnectionState::Connected);
            }
            Err(e) => {
                warn!(error = %e, "connecting to gateway failed");
                self.gateway.report(&e);
                self.gateway.set_state(ConnectionState::Disconnected);
            }
        }
    }

    async fn disconnect(&mut self) {
        if self.gateway.state() != ConnectionState::Disconnected {
            self.gateway.set_state(ConnectionState::Disconnecting);
        }
        self.gateway.disconnect().await;
        self.gateway.set_state(ConnectionState::Disconnected);
    }

    async fn reconnect(&mut self) {
        self.pending_reconnect = None;
        self.disconnect().await;
        self.connect().await;
    }

    async fn reboot(&mut self) {
        // May fail when the connection is already gone
        if let Err(e) = self.gateway.request_reboot() {
            debug!(error = %e, "reboot request not sent");
        }
        self.disconnect().await;

        let grace = self.heartbeat.grace_period;
        info!(delay = ?grace, "gateway rebooting");
        self.pending_reconnect = Some(Instant::now() + grace);
    }

    async fn keep_alive(&mut self) {
        if self.pending_reconnect.is_some() {
            return;
        }

        let deadline = self.last_heartbeat + self.heartbeat.interval + self.heartbeat.grace_period;
        if !self.gateway.is_connected() {
            info!("gateway not connected, reconnecting");
            self.reconnect().await;
        } else if Instant::now() > deadline {
            warn!(
                silent_for = ?self.last_heartbeat.elapsed(),
                "no heartbeat from gateway, reconnecting"
            );
            self.reconnect().await;
        } else if let Err(e) = self.gateway.keep_alive() {
            self.gateway.report(&e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::error::Error;
    use crate::transport::BoxedStream;

    #[derive(Default)]
    struct Unreachable {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl Connector for Unreachable {
        async fn connect(&self) -> Result<BoxedStream> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(Error::ConnectionTimeout)
        }

        fn peer(&self) -> String {
            "unreachable".into()
        }
    }

    fn heartbeat() -> HeartbeatConfig {
        HeartbeatConfig {
            interval: Duration::from_secs(60),
            grace_period: Duration::from_secs(10),
        }
    }

    fn supervisor(connector: Arc<Unreachable>) -> Supervisor {
        let (gateway, session_events) = Gateway::new(connector, "secret", Duration::from_secs(1));
        let (_control, control) = mpsc::unbounded_channel();
        Supervisor {
            gateway: Arc::new(gateway),
            session_events,
            control,
            cancel: CancellationToken::new(),
            heartbeat: heartbeat(),
            last_heartbeat: Instant::now(),
            pending_reconnect: None,
            reconnect_on_close: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_connect_reports_and_retries() {
        let connector = Arc::new(Unreachable::default());
        let gateway = VeluxGateway::with_connector(
            connector.clone(),
            "secret",
            Duration::from_secs(1),
            heartbeat(),
        );
        let mut events = gateway.subscribe();

        assert_eq!(
            events.recv().await.unwrap(),
            GatewayEvent::State(ConnectionState::Connecting)
        );
        match events.recv().await.unwrap() {
            GatewayEvent::Error(text) => assert!(text.starts_with("ConnectionError")),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(
            events.recv().await.unwrap(),
            GatewayEvent::State(ConnectionState::Disconnected)
        );
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);

        gateway.shutdown().await;
        assert_eq!(gateway.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparseable_text_is_reported() {
        let gateway = VeluxGateway::with_connector(
            Arc::new(Unreachable::default()),
            "secret",
            Duration::from_secs(1),
            heartbeat(),
        );
        let mut events = gateway.subscribe();
        gateway.shutdown().await;
        while events.try_recv().is_ok() {}

        gateway.send_text("   ");
        match events.try_recv().unwrap() {
            GatewayEvent::Error(text) => assert!(text.starts_with("UnsupportedTelegram")),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_recoverable_loss_reconnects_at_once() {
        let connector = Arc::new(Unreachable::default());
        let mut supervisor = supervisor(connector.clone());

        supervisor
            .on_session_event(SessionEvent::Error(Error::ConnectionTimeout))
            .await;
        supervisor.on_session_event(SessionEvent::Closed).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);

        // A plain close counts as a recoverable loss
        supervisor.on_session_event(SessionEvent::Closed).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unrecoverable_loss_waits_for_keep_alive() {
        let connector = Arc::new(Unreachable::default());
        let mut supervisor = supervisor(connector.clone());
        let mut events = supervisor.gateway.subscribe();

        supervisor
            .on_session_event(SessionEvent::Error(Error::Authentication(
                "password rejected".into(),
            )))
            .await;
        supervisor.on_session_event(SessionEvent::Closed).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
        assert_eq!(supervisor.gateway.state(), ConnectionState::Disconnected);
        match events.try_recv().unwrap() {
            GatewayEvent::Error(text) => assert!(text.starts_with("AuthenticationError")),
            other => panic!("unexpected event {other:?}"),
        }

        // Non-fatal errors leave the close policy alone
        supervisor
            .on_session_event(SessionEvent::Error(Error::Rejected("busy".into())))
            .await;
        supervisor.on_session_event(SessionEvent::Closed).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);

        supervisor.keep_alive().await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);
    }
}
