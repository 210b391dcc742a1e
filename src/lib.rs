//! # KLF-200 Bridge
//!
//! Bridge between a building-automation host and the Velux KLF-200 gateway.
//!
//! The host speaks URI-style telegrams (`request://node/Kitchen?target=25600`),
//! the appliance speaks SLIP-framed binary datagrams over TLS on port 51200.
//! This crate translates in both directions, keeps a name catalog of the
//! appliance's nodes, groups and scenes, and supervises the connection with a
//! heartbeat and reconnect policy.
//!
//! ## Architecture
//!
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Host (telegram strings, events)                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │         VeluxGateway supervisor (heartbeat, reconnect)          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   Gateway orchestrator  ◄──►  NameCatalog  ◄──►  Telegram       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │      Session (auth, discovery chain, session ids, read loop)    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │           Datagram catalog  /  SLIP frame codec                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │              TLS 1.2 transport (pinned issuer)                  │
//! └─────────────────────────────────────────────────────────────────┘

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow stylistic lints that don't affect correctness
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]      // Many functions can't be const due to trait bounds
#![allow(clippy::doc_markdown)]              // ASCII diagrams in docs
#![allow(clippy::unreadable_literal)]        // Wire constants are written as in the protocol tables
#![allow(clippy::cast_possible_truncation)]  // Field widths are fixed by the wire format
#![allow(clippy::cast_lossless)]             // Explicit widening in enum conversions
#![allow(clippy::similar_names)]             // node/nodes, scene/scenes are intentionally named
#![allow(clippy::significant_drop_tightening)] // Lock ordering is intentional
#![allow(clippy::option_if_let_else)]        // More readable in context
#![allow(clippy::use_self)]                  // Explicit type names in matches
#![allow(clippy::redundant_pub_crate)]       // Explicit visibility
#![allow(clippy::cognitive_complexity)]      // Complex state machines
#![allow(clippy::too_many_lines)]            // Complete implementations
#![allow(clippy::future_not_send)]           // Async internals
#![allow(clippy::match_same_arms)]           // Explicit arm per variant is clearer
#![allow(clippy::return_self_not_must_use)]  // Builder methods don't need must_use
#![allow(clippy::ignored_unit_patterns)]     // Ok(_) vs Ok(()) is stylistic

pub mod catalog;
pub mod config;
pub mod datagram;
pub mod error;
pub mod gateway;
pub mod position;
pub mod protocol;
pub mod session;
pub mod telegram;
pub mod transport;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default TLS port of the appliance
pub const DEFAULT_PORT: u16 = 51200;

/// Fixed length of the password field in the authentication request
pub const PASSWORD_LENGTH: usize = 32;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::catalog::NameCatalog;
    pub use crate::config::Config;
    pub use crate::datagram::{Command, Datagram, DatagramType, Payload, WireEnum};
    pub use crate::error::{Error, Result};
    pub use crate::gateway::{Gateway, GatewayEvent, VeluxGateway};
    pub use crate::protocol::{decode_frame, encode_frame, FrameCodec};
    pub use crate::session::{Session, SessionEvent};
    pub use crate::telegram::{Mode, Parameter, Telegram};
    pub use crate::transport::{Connector, TlsConnector};
    pub use crate::types::*;
}
