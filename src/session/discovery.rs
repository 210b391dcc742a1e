//! Cascading discovery of the system table.
//!
//! ```text
//! monitor enabled ──► all nodes ──► nodes finished ──► all groups
//!                                                        │
//!        Done ◄── scene list (0 remaining) ◄── groups finished
//! ```
//!
//! Each request is issued only after the previous step's finished signal.
//! The scene list has no finished notification; the phase ends with the
//! last scene-list notification (no scenes remaining) or an empty list.

use tracing::debug;

use crate::datagram::{
    Datagram, DatagramType, GetAllGroupsInformationReq, GetAllNodesInformationReq,
    GetSceneListReq,
};

/// Discovery progress of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveryPhase {
    /// Not started.
    #[default]
    Idle,
    /// Waiting for node information.
    Nodes,
    /// Waiting for group information.
    Groups,
    /// Waiting for the scene list.
    Scenes,
    /// System table read completely.
    Done,
}

impl DiscoveryPhase {
    /// Advance on an inbound datagram.
    ///
    /// Returns the request that starts the next step, if any.
    pub fn on_inbound(&mut self, datagram: &Datagram) -> Option<Datagram> {
        use DiscoveryPhase::*;

        let (next, request): (_, Option<Datagram>) = match (*self, datagram) {
            (_, Datagram::HouseStatusMonitorEnableCfm(_)) => {
                (Nodes, Some(GetAllNodesInformationReq::empty().into()))
            }

            (Nodes, Datagram::GetAllNodesInformationFinishedNtf(_)) => {
                (Groups, Some(GetAllGroupsInformationReq::empty().into()))
            }
            // An empty table sends no notifications, hence no finished signal
            (Nodes, Datagram::GetAllNodesInformationCfm(cfm))
                if cfm.is_empty_table().unwrap_or(false) =>
            {
                (Groups, Some(GetAllGroupsInformationReq::empty().into()))
            }

            (Groups, Datagram::GetAllGroupsInformationFinishedNtf(_)) => {
                (Scenes, Some(GetSceneListReq::empty().into()))
            }
            (Groups, Datagram::GetAllGroupsInformationCfm(cfm))
                if cfm.status().unwrap_or(0) != 0 =>
            {
                (Scenes, Some(GetSceneListReq::empty().into()))
            }

            (Scenes, Datagram::GetSceneListNtf(ntf)) if ntf.remaining().unwrap_or(0) == 0 => {
                (Done, None)
            }
            (Scenes, Datagram::GetSceneListCfm(cfm)) if cfm.total_scenes().unwrap_or(0) == 0 => {
                (Done, None)
            }

            _ => return None,
        };

        debug!(from = ?*self, to = ?next, "discovery advanced");
        *self = next;
        request
    }

    /// Track outbound requests; a manual node query restarts the chain.
    pub fn on_outbound(&mut self, datagram: &Datagram) {
        if matches!(datagram, Datagram::GetAllNodesInformationReq(_)) && *self != Self::Nodes {
            debug!(from = ?*self, "discovery restarted");
            *self = Self::Nodes;
        }
    }

    pub fn is_done(self) -> bool {
        self == Self::Done
    }
}
