//! Host-facing orchestration.
//!
//! [`Gateway`] translates between host telegrams and appliance datagrams and
//! keeps the name catalog current. [`VeluxGateway`] wraps it with connection
//! supervision: keep-alive, liveness watchdog, reconnect and reboot.
//!
//! ```text
//!  host ──telegram──► Gateway::send_request ──datagram──► Session
//!  host ◄──GatewayEvent── Gateway::on_inbound ◄──SessionEvent── Session
//! ```

mod supervisor;

pub use supervisor::VeluxGateway;

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::catalog::NameCatalog;
use crate::datagram::{
    ActivateProductgroupReq, ActivateSceneReq, ChangeType, CommandSendReq, Datagram,
    DatagramType, FromTelegram, GetStateReq, GroupCommandRequestState, GroupInformation,
    NodeCommandRequestState, NodeInformation, RebootReq, SceneCommandRequestState, SetUtcReq,
    StopSceneReq,
};
use crate::error::{Error, Result};
use crate::session::{Session, SessionEvent, SessionState};
use crate::telegram::{Mode, Telegram};
use crate::transport::Connector;
use crate::types::{ConnectionState, Scope};

/// Capacity of the host event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Event delivered to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    /// Inbound traffic was received; used as liveness signal.
    Heartbeat,
    /// Appliance event rendered as a telegram.
    Response(Telegram),
    /// Informational text, e.g. catalog contents.
    Info(String),
    /// Error text, prefixed with the error kind.
    Error(String),
    /// Connection state of the supervisor changed.
    State(ConnectionState),
}

/// Translates between host telegrams and appliance datagrams.
pub struct Gateway {
    session: Session,
    catalog: Arc<RwLock<NameCatalog>>,
    state: RwLock<ConnectionState>,
    event_tx: broadcast::Sender<GatewayEvent>,
}

impl Gateway {
    /// Create a gateway over a disconnected session.
    ///
    /// The returned receiver carries the session's events; feed them to
    /// [`Gateway::handle_session_event`].
    pub fn new(
        connector: Arc<dyn Connector>,
        password: impl Into<String>,
        auth_timeout: Duration,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (session, session_events) = Session::new(connector, password, auth_timeout);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let gateway = Self {
            session,
            catalog: Arc::new(RwLock::new(NameCatalog::new())),
            state: RwLock::new(ConnectionState::Disconnected),
            event_tx,
        };
        (gateway, session_events)
    }

    /// Subscribe to host events.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.event_tx.subscribe()
    }

    /// Host-facing connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            info!(from = %previous, to = %state, "gateway state changed");
            self.publish(GatewayEvent::State(state));
        }
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Snapshot of the name catalog.
    pub fn catalog(&self) -> NameCatalog {
        self.catalog.read().clone()
    }

    /// Connect the session. The catalog is rebuilt by discovery.
    pub async fn connect(&self) -> Result<()> {
        *self.catalog.write() = NameCatalog::new();
        self.session.connect().await
    }

    /// Tear down the session. Idempotent.
    pub async fn disconnect(&self) {
        self.session.teardown().await;
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Route one session event to the host.
    pub fn handle_session_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Datagram(datagram) => self.on_inbound(&datagram),
            SessionEvent::Error(e) => self.report(&e),
            SessionEvent::Closed => debug!("session closed"),
        }
    }

    /// Handle one inbound datagram: heartbeat, catalog upkeep, then
    /// translation to a response telegram.
    pub fn on_inbound(&self, datagram: &Datagram) {
        self.publish(GatewayEvent::Heartbeat);

        match self.collect(datagram) {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => {
                debug!(command = %datagram.command(), error = %e, "catalog update failed");
                return;
            }
        }

        if let Some(e) = rejection(datagram) {
            warn!(command = %datagram.command(), error = %e, "request rejected");
            self.report(&e);
            return;
        }

        let catalog = self.catalog.read();
        let resolve = |scope: Scope, id: u8| catalog.resolve_name(scope, id);
        let rendered = datagram.to_telegram(&resolve);
        drop(catalog);

        match rendered {
            Some(Ok(telegram)) => self.publish(GatewayEvent::Response(telegram)),
            Some(Err(e)) => {
                debug!(command = %datagram.command(), error = %e, "datagram has no telegram form");
                self.report(&Error::UnknownDatagram(datagram.command()));
            }
            None => debug!(command = %datagram.command(), "ignoring datagram"),
        }
    }

    /// Update the catalog. Returns `true` when the datagram is fully handled.
    fn collect(&self, datagram: &Datagram) -> Result<bool> {
        let mut catalog = self.catalog.write();

        let handled = match datagram {
            Datagram::GetNodeInformationNtf(ntf) => {
                catalog.collect(Scope::Node, &ntf.name()?, ntf.node_id()?);
                false
            }
            Datagram::GetAllNodesInformationNtf(ntf) => {
                catalog.collect(Scope::Node, &ntf.name()?, ntf.node_id()?);
                false
            }
            Datagram::NodeInformationChangedNtf(ntf) => {
                catalog.collect(Scope::Node, &ntf.name()?, ntf.node_id()?);
                true
            }

            Datagram::GetGroupInformationNtf(ntf) => {
                catalog.collect(Scope::Group, &ntf.name()?, ntf.group_id()?);
                false
            }
            Datagram::GetAllGroupsInformationNtf(ntf) => {
                catalog.collect(Scope::Group, &ntf.name()?, ntf.group_id()?);
                false
            }
            Datagram::GroupInformationChangedNtf(ntf) => match ntf.change_type()? {
                ChangeType::Modified => {
                    catalog.collect(Scope::Group, &ntf.name()?, ntf.group_id()?);
                    false
                }
                // The layout after a deletion is stale
                ChangeType::Deleted => {
                    info!(group = ntf.group_id()?, "group deleted");
                    true
                }
            },

            Datagram::GetSceneListNtf(ntf) => {
                for (id, name) in ntf.scenes()? {
                    catalog.collect(Scope::Scene, &name, id);
                }
                true
            }
            Datagram::GetSceneInformationNtf(ntf) => {
                catalog.collect(Scope::Scene, &ntf.name()?, ntf.scene_id()?);
                true
            }

            _ => false,
        };

        Ok(handled)
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// Execute a host telegram. Failures are reported as error events.
    pub fn send_request(&self, telegram: &Telegram) {
        if telegram.mode == Some(Mode::Info) {
            self.publish(GatewayEvent::Info(self.describe_catalog(telegram.scope)));
            return;
        }

        let result = self
            .build_request(telegram)
            .and_then(|datagram| {
                debug!(command = %datagram.command(), %telegram, "sending request");
                self.session.send(datagram)
            });
        if let Err(e) = result {
            warn!(%telegram, error = %e, "request not sent");
            self.report(&e);
        }
    }

    /// Translate a request telegram to its datagram.
    ///
    /// Names are resolved through the catalog; unknown names become the
    /// unset identifier.
    pub fn build_request(&self, telegram: &Telegram) -> Result<Datagram> {
        match telegram.mode {
            Some(Mode::Request) => {}
            Some(Mode::Response | Mode::Info) => {
                return Err(Error::OutgoingTelegram(telegram.to_string()))
            }
            None => return Err(Error::UnsupportedTelegram(telegram.to_string())),
        }

        let catalog = self.catalog.read();
        let resolve = |scope: Scope, name: &str| catalog.resolve_identifier(scope, name);

        let action = telegram.action.to_ascii_lowercase();
        let datagram: Datagram = match (telegram.scope, action.as_str()) {
            (Some(Scope::Node), _) => CommandSendReq::from_telegram(telegram, &resolve)
                .map_err(|e| unsupported(telegram, &e))?
                .into(),
            (Some(Scope::Group), _) => ActivateProductgroupReq::from_telegram(telegram, &resolve)
                .map_err(|e| unsupported(telegram, &e))?
                .into(),
            (Some(Scope::Scene), "start") => ActivateSceneReq::from_telegram(telegram, &resolve)
                .map_err(|e| unsupported(telegram, &e))?
                .into(),
            (Some(Scope::Scene), "stop") => StopSceneReq::from_telegram(telegram, &resolve)
                .map_err(|e| unsupported(telegram, &e))?
                .into(),
            _ => return Err(Error::UnsupportedTelegram(telegram.to_string())),
        };

        Ok(datagram)
    }

    fn describe_catalog(&self, scope: Option<Scope>) -> String {
        let catalog = self.catalog.read();
        let scopes = scope.map_or_else(|| Scope::ALL.to_vec(), |scope| vec![scope]);

        scopes
            .into_iter()
            .map(|scope| {
                let toc = catalog.table_of_contents(scope);
                if toc.is_empty() {
                    format!("catalog of {scope}s is empty")
                } else {
                    format!("{scope}s: {toc}")
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Set the appliance clock.
    pub fn set_clock(&self, time: SystemTime) -> Result<()> {
        self.session.send(SetUtcReq::new(time)?)
    }

    /// Cheap state query used as keep-alive.
    pub fn keep_alive(&self) -> Result<()> {
        self.session.send(GetStateReq::empty())
    }

    /// Read the system table again.
    pub fn request_state(&self) -> Result<()> {
        self.session.request_state()
    }

    pub fn request_reboot(&self) -> Result<()> {
        self.session.send(RebootReq::empty())
    }

    /// Deliver an error to the host.
    pub(crate) fn report(&self, error: &Error) {
        self.publish(GatewayEvent::Error(error.to_event_text()));
    }

    fn publish(&self, event: GatewayEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

fn unsupported(telegram: &Telegram, error: &Error) -> Error {
    Error::UnsupportedTelegram(format!("{telegram} ({error})"))
}

/// Rejection reported by a command confirmation, if any.
fn rejection(datagram: &Datagram) -> Option<Error> {
    let state = match datagram {
        Datagram::CommandSendCfm(cfm) => match cfm.state() {
            Ok(NodeCommandRequestState::RequestAccepted) => return None,
            state => state.map(|s| s.to_string()),
        },
        Datagram::ActivateSceneCfm(cfm) => match cfm.state() {
            Ok(SceneCommandRequestState::RequestAccepted) => return None,
            state => state.map(|s| s.to_string()),
        },
        Datagram::StopSceneCfm(cfm) => match cfm.state() {
            Ok(SceneCommandRequestState::RequestAccepted) => return None,
            state => state.map(|s| s.to_string()),
        },
        Datagram::ActivateProductgroupCfm(cfm) => match cfm.state() {
            Ok(GroupCommandRequestState::RequestAccepted) => return None,
            state => state.map(|s| s.to_string()),
        },
        _ => return None,
    };

    let state = state.unwrap_or_else(|e| e.to_string());
    Some(Error::Rejected(format!("{}: {state}", datagram.command())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::datagram::{
        ActivateSceneCfm, Command, CommandSendCfm, GetAllGroupsInformationNtf,
        GetAllNodesInformationNtf, GetSceneListNtf, GroupInformationChangedNtf,
    };
    use crate::telegram::Parameter;
    use crate::transport::BoxedStream;
    use crate::types::UNSET_ID;

    struct Unreachable;

    #[async_trait]
    impl Connector for Unreachable {
        async fn connect(&self) -> Result<BoxedStream> {
            Err(Error::ConnectionTimeout)
        }

        fn peer(&self) -> String {
            "unreachable".into()
        }
    }

    fn gateway() -> Gateway {
        Gateway::new(Arc::new(Unreachable), "secret", Duration::from_secs(1)).0
    }

    fn node_ntf(id: u8, name: &str) -> Datagram {
        let mut data = vec![0u8; GetAllNodesInformationNtf::SIZE];
        data[0] = id;
        data[4..4 + name.len()].copy_from_slice(name.as_bytes());
        GetAllNodesInformationNtf::from_bytes(&data).unwrap().into()
    }

    fn drain(events: &mut broadcast::Receiver<GatewayEvent>) -> Vec<GatewayEvent> {
        std::iter::from_fn(|| events.try_recv().ok()).collect()
    }

    #[test]
    fn test_node_information_is_collected_and_forwarded() {
        let gateway = gateway();
        let mut events = gateway.subscribe();

        gateway.on_inbound(&node_ntf(3, "Kitchen"));

        assert_eq!(gateway.catalog().resolve_identifier(Scope::Node, "kitchen"), 3);
        let events = drain(&mut events);
        assert_eq!(events[0], GatewayEvent::Heartbeat);
        match &events[1] {
            GatewayEvent::Response(telegram) => {
                assert_eq!(telegram.mode, Some(Mode::Response));
                assert_eq!(telegram.scope, Some(Scope::Node));
                assert_eq!(telegram.name, "Kitchen");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_group_information_is_collected_and_forwarded() {
        let gateway = gateway();
        let mut events = gateway.subscribe();

        let mut ntf = GetAllGroupsInformationNtf::empty();
        ntf.payload_mut().write_u8(0, 4).unwrap();
        ntf.payload_mut().write_string(4, "Upstairs", 64).unwrap();
        ntf.payload_mut().write_u8(72, 0b0000_0101).unwrap();
        gateway.on_inbound(&ntf.into());

        assert_eq!(gateway.catalog().resolve_identifier(Scope::Group, "upstairs"), 4);
        let events = drain(&mut events);
        assert_eq!(events.len(), 2);
        match &events[1] {
            GatewayEvent::Response(telegram) => {
                assert_eq!(telegram.scope, Some(Scope::Group));
                assert_eq!(telegram.name, "Upstairs");
                assert_eq!(telegram.parameter(Parameter::Nodes), Some("0-2"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_deleted_group_is_not_forwarded() {
        let gateway = gateway();
        let mut events = gateway.subscribe();

        let mut ntf = GroupInformationChangedNtf::empty();
        ntf.payload_mut().write_u8(0, 0).unwrap();
        ntf.payload_mut().write_u8(1, 9).unwrap();
        ntf.payload_mut().write_string(5, "Garden", 64).unwrap();
        gateway.on_inbound(&ntf.into());

        assert_eq!(gateway.catalog().resolve_identifier(Scope::Group, "garden"), UNSET_ID);
        assert_eq!(drain(&mut events), vec![GatewayEvent::Heartbeat]);
    }

    #[test]
    fn test_scene_list_is_collected_silently() {
        let gateway = gateway();
        let mut events = gateway.subscribe();

        let mut ntf = GetSceneListNtf::empty();
        ntf.push_scene(0, "Morning").unwrap();
        ntf.push_scene(1, "Night").unwrap();
        gateway.on_inbound(&ntf.into());

        assert_eq!(gateway.catalog().table_of_contents(Scope::Scene), "Morning=0, Night=1");
        assert_eq!(drain(&mut events), vec![GatewayEvent::Heartbeat]);
    }

    #[test]
    fn test_rejected_confirmation_reports_error() {
        let gateway = gateway();
        let mut events = gateway.subscribe();

        gateway.on_inbound(&CommandSendCfm::from_bytes(&[0, 1, 0]).unwrap().into());
        gateway.on_inbound(&CommandSendCfm::from_bytes(&[0, 1, 1]).unwrap().into());
        gateway.on_inbound(&ActivateSceneCfm::from_bytes(&[0, 2, 1]).unwrap().into());

        let errors: Vec<_> = drain(&mut events)
            .into_iter()
            .filter_map(|event| match event {
                GatewayEvent::Error(text) => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("RequestRejected"));
        assert!(errors[1].contains("RequestRejectedInvalidId"));
    }

    #[test]
    fn test_build_request_dispatch() {
        let gateway = gateway();
        gateway.on_inbound(&node_ntf(7, "Bathroom"));

        let telegram = Telegram::parse("request://node/bathroom#max").unwrap();
        let datagram = gateway.build_request(&telegram).unwrap();
        assert_eq!(datagram.command(), Command::CommandSendReq);
        if let Datagram::CommandSendReq(req) = datagram {
            assert_eq!(req.nodes().unwrap(), vec![7]);
        }

        let telegram = Telegram::parse("request://scene:2#START").unwrap();
        assert_eq!(
            gateway.build_request(&telegram).unwrap().command(),
            Command::ActivateSceneReq
        );

        let telegram = Telegram::parse("request://scene:2#stop").unwrap();
        assert_eq!(
            gateway.build_request(&telegram).unwrap().command(),
            Command::StopSceneReq
        );

        let telegram = Telegram::parse("request://group:1?target=0").unwrap();
        assert_eq!(
            gateway.build_request(&telegram).unwrap().command(),
            Command::ActivateProductgroupReq
        );
    }

    #[test]
    fn test_unresolved_name_uses_unset_identifier() {
        let gateway = gateway();
        let telegram = Telegram::parse("request://node/Unknown%20Window#max").unwrap();

        let datagram = gateway.build_request(&telegram).unwrap();
        if let Datagram::CommandSendReq(req) = datagram {
            assert_eq!(req.nodes().unwrap(), vec![UNSET_ID]);
        } else {
            panic!("unexpected datagram");
        }
    }

    #[test]
    fn test_build_request_rejections() {
        let gateway = gateway();

        let telegram = Telegram::parse("response://node:1").unwrap();
        assert!(matches!(
            gateway.build_request(&telegram),
            Err(Error::OutgoingTelegram(_))
        ));

        let telegram = Telegram::parse("request://scene:1#pause").unwrap();
        assert!(matches!(
            gateway.build_request(&telegram),
            Err(Error::UnsupportedTelegram(_))
        ));

        let telegram = Telegram::parse("request://room:1").unwrap();
        assert!(matches!(
            gateway.build_request(&telegram),
            Err(Error::UnsupportedTelegram(_))
        ));
    }

    #[test]
    fn test_info_request_lists_catalog() {
        let gateway = gateway();
        let mut events = gateway.subscribe();

        gateway.send_request(&Telegram::parse("info://node").unwrap());
        gateway.on_inbound(&node_ntf(1, "Hall"));
        drain(&mut events);
        gateway.send_request(&Telegram::parse("info://node").unwrap());
        gateway.send_request(&Telegram::parse("info://scene").unwrap());

        let events = drain(&mut events);
        assert_eq!(events[0], GatewayEvent::Info("nodes: Hall=1".into()));
        assert_eq!(
            events[1],
            GatewayEvent::Info("catalog of scenes is empty".into())
        );
    }

    #[test]
    fn test_send_without_connection_reports_error() {
        let gateway = gateway();
        let mut events = gateway.subscribe();

        gateway.send_request(&Telegram::parse("request://node:1#max").unwrap());

        match drain(&mut events).as_slice() {
            [GatewayEvent::Error(text)] => assert!(text.contains("connection closed")),
            other => panic!("unexpected events {other:?}"),
        }
        assert!(gateway.keep_alive().is_err());
    }

    #[test]
    fn test_state_changes_are_published_once() {
        let gateway = gateway();
        let mut events = gateway.subscribe();

        gateway.set_state(ConnectionState::Connecting);
        gateway.set_state(ConnectionState::Connecting);
        gateway.set_state(ConnectionState::Disconnected);

        assert_eq!(
            drain(&mut events),
            vec![
                GatewayEvent::State(ConnectionState::Connecting),
                GatewayEvent::State(ConnectionState::Disconnected),
            ]
        );
    }
}
