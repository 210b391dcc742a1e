//! The closed catalog of datagram types known to the bridge.

use super::*;
use crate::error::Result;
use crate::telegram::Telegram;

/// Catalog entry: payload size and constructor for one command.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub command: Command,
    pub size: usize,
    pub build: fn(Payload) -> Datagram,
}

fn build<T: DatagramType + Into<Datagram>>(payload: Payload) -> Datagram {
    T::wrap(payload).into()
}

macro_rules! registry {
    ($($name:ident),+ $(,)?) => {
        /// Any datagram of the catalog.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Datagram {
            $($name($name),)+
        }

        impl Datagram {
            pub fn command(&self) -> Command {
                match self {
                    $(Self::$name(_) => <$name as DatagramType>::COMMAND,)+
                }
            }

            pub fn payload(&self) -> &Payload {
                match self {
                    $(Self::$name(d) => d.payload(),)+
                }
            }
        }

        $(
            impl From<$name> for Datagram {
                fn from(d: $name) -> Self {
                    Self::$name(d)
                }
            }
        )+

        const ENTRIES: &[CatalogEntry] = &[
            $(
                CatalogEntry {
                    command: <$name as DatagramType>::COMMAND,
                    size: <$name as DatagramType>::SIZE,
                    build: build::<$name>,
                },
            )+
        ];
    };
}

registry! {
    ErrorNtf,
    RebootReq,
    RebootCfm,
    GetStateReq,
    GetStateCfm,
    SetUtcReq,
    SetUtcCfm,
    PasswordEnterReq,
    PasswordEnterCfm,
    HouseStatusMonitorEnableReq,
    HouseStatusMonitorEnableCfm,
    HouseStatusMonitorDisableReq,
    HouseStatusMonitorDisableCfm,
    GetNodeInformationReq,
    GetNodeInformationCfm,
    GetNodeInformationNtf,
    GetAllNodesInformationReq,
    GetAllNodesInformationCfm,
    GetAllNodesInformationNtf,
    GetAllNodesInformationFinishedNtf,
    NodeInformationChangedNtf,
    NodeStatePositionChangedNtf,
    GetGroupInformationReq,
    GetGroupInformationCfm,
    GetGroupInformationNtf,
    GetAllGroupsInformationReq,
    GetAllGroupsInformationCfm,
    GetAllGroupsInformationNtf,
    GetAllGroupsInformationFinishedNtf,
    GroupInformationChangedNtf,
    GetSceneListReq,
    GetSceneListCfm,
    GetSceneListNtf,
    GetSceneInformationReq,
    GetSceneInformationCfm,
    GetSceneInformationNtf,
    SceneInformationChangedNtf,
    ActivateSceneReq,
    ActivateSceneCfm,
    StopSceneReq,
    StopSceneCfm,
    CommandSendReq,
    CommandSendCfm,
    CommandRunStatusNtf,
    CommandRemainingTimeNtf,
    SessionFinishedNtf,
    ActivateProductgroupReq,
    ActivateProductgroupCfm,
}

/// Find the catalog entry for `command`; `None` for commands the bridge does not model.
pub fn lookup(command: Command) -> Option<&'static CatalogEntry> {
    ENTRIES.iter().find(|entry| entry.command == command)
}

impl Datagram {
    /// Session id accessor for outbound session-scoped requests.
    pub fn as_session_request_mut(&mut self) -> Option<&mut dyn SessionRequest> {
        match self {
            Self::CommandSendReq(d) => Some(d),
            Self::ActivateProductgroupReq(d) => Some(d),
            Self::ActivateSceneReq(d) => Some(d),
            Self::StopSceneReq(d) => Some(d),
            _ => None,
        }
    }

    /// Session view of inbound confirmations and notifications.
    pub fn as_session_response(&self) -> Option<&dyn SessionResponse> {
        match self {
            Self::CommandSendCfm(d) => Some(d),
            Self::CommandRunStatusNtf(d) => Some(d),
            Self::CommandRemainingTimeNtf(d) => Some(d),
            Self::SessionFinishedNtf(d) => Some(d),
            Self::ActivateSceneCfm(d) => Some(d),
            Self::StopSceneCfm(d) => Some(d),
            Self::ActivateProductgroupCfm(d) => Some(d),
            _ => None,
        }
    }

    /// Render the datagram as a host telegram, if it has a telegram form.
    pub fn to_telegram(&self, resolve: NameResolver<'_>) -> Option<Result<Telegram>> {
        let encoder: &dyn ToTelegram = match self {
            Self::GetNodeInformationNtf(d) => d,
            Self::GetAllNodesInformationNtf(d) => d,
            Self::NodeStatePositionChangedNtf(d) => d,
            Self::GetGroupInformationNtf(d) => d,
            Self::GetAllGroupsInformationNtf(d) => d,
            Self::GroupInformationChangedNtf(d) => d,
            Self::CommandRunStatusNtf(d) => d,
            Self::CommandRemainingTimeNtf(d) => d,
            _ => return None,
        };
        Some(encoder.to_telegram(resolve))
    }
}
