//! Core types used throughout the bridge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier value meaning "not set" or "not found" for nodes, groups and scenes.
pub const UNSET_ID: u8 = u8::MAX;

/// Addressable entity kind in the appliance's system table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// A single actuator (window, shutter, blind, ...).
    Node,
    /// A product group of nodes.
    Group,
    /// A recorded scene.
    Scene,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Node, Scope::Group, Scope::Scene];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Group => "group",
            Self::Scene => "scene",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown scope: {s}"))
    }
}

/// 16-bit correlator between a session-scoped request and its confirmations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct SessionId(pub u16);

impl SessionId {
    /// Return this id and advance to the next one, wrapping at `u16::MAX`.
    pub fn take_next(&mut self) -> SessionId {
        let current = *self;
        self.0 = self.0.wrapping_add(1);
        current
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for SessionId {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

/// Host-facing connection state of the gateway supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Disconnecting => "Disconnecting",
        };
        f.write_str(name)
    }
}
