//! Typed datagrams of the KLF-200 protocol.
//!
//! Every protocol command has a plain struct wrapping a fixed-size [`Payload`].
//! Field accessors read and write the payload at the offsets the appliance
//! uses. The [`Datagram`] enum and [`lookup`] form the closed command catalog
//! used by the frame decoder.
//!
//! Capabilities are expressed as traits:
//! - [`SessionRequest`]: outbound requests carrying a session id
//! - [`SessionResponse`]: inbound confirmations/notifications for a session
//! - [`FromTelegram`]: requests built from a host telegram
//! - [`ToTelegram`]: inbound events rendered as a host telegram

/// Declare a wire enumeration with its on-wire width.
///
/// Generates the enum, [`WireEnum`], `Display` (variant name) and a
/// case-insensitive `FromStr`.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $repr:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr($repr)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant = $value
            ),+
        }

        impl $crate::datagram::WireEnum for $name {
            const WIDTH: usize = std::mem::size_of::<$repr>();
            const VARIANTS: &'static [Self] = &[$(Self::$variant),+];

            fn from_raw(raw: u64) -> Option<Self> {
                match raw {
                    $(v if v == $value as u64 => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn raw(self) -> u64 {
                self as $repr as u64
            }

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::datagram::WireEnum::name(*self))
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                <Self as $crate::datagram::WireEnum>::from_name(s)
                    .ok_or_else(|| format!(concat!("unknown ", stringify!($name), ": {}"), s))
            }
        }
    };
}

/// Declare a datagram struct bound to one command and payload size.
macro_rules! datagram {
    (
        $(#[$meta:meta])*
        $name:ident = $command:ident, $size:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            payload: $crate::datagram::Payload,
        }

        impl $crate::datagram::DatagramType for $name {
            const COMMAND: $crate::datagram::Command = $crate::datagram::Command::$command;
            const SIZE: usize = $size;

            fn wrap(payload: $crate::datagram::Payload) -> Self {
                Self { payload }
            }

            fn payload(&self) -> &$crate::datagram::Payload {
                &self.payload
            }

            fn payload_mut(&mut self) -> &mut $crate::datagram::Payload {
                &mut self.payload
            }
        }

        impl Default for $name {
            fn default() -> Self {
                <Self as $crate::datagram::DatagramType>::empty()
            }
        }
    };
}

/// Implement [`SessionRequest`] for a request with the session id at offset 0.
macro_rules! session_request {
    ($($name:ident),+ $(,)?) => {
        $(
            impl $crate::datagram::SessionRequest for $name {
                fn session_id(&self) -> $crate::error::Result<$crate::types::SessionId> {
                    Ok($crate::types::SessionId(self.payload.read_u16(0)?))
                }

                fn set_session_id(&mut self, id: $crate::types::SessionId) -> $crate::error::Result<()> {
                    self.payload.write_u16(0, id.0)?;
                    Ok(())
                }
            }
        )+
    };
}

/// Implement [`SessionResponse`] for a non-final response with the session id at offset 0.
macro_rules! session_response {
    ($($name:ident),+ $(,)?) => {
        $(
            impl $crate::datagram::SessionResponse for $name {
                fn session_id(&self) -> $crate::error::Result<$crate::types::SessionId> {
                    Ok($crate::types::SessionId(self.payload.read_u16(0)?))
                }
            }
        )+
    };
}

mod actuator;
mod command;
mod enums;
mod gateway;
mod group;
mod node;
mod payload;
mod registry;
mod scene;

pub use actuator::*;
pub use command::Command;
pub use enums::*;
pub use gateway::*;
pub use group::*;
pub use node::*;
pub use payload::Payload;
pub use registry::{lookup, CatalogEntry, Datagram};
pub use scene::*;

use crate::error::{DatagramError, Result};
use crate::telegram::Telegram;
use crate::types::{Scope, SessionId};

/// Resolves a name to an identifier (`255` when unknown).
pub type IdentifierResolver<'a> = &'a dyn Fn(Scope, &str) -> u8;

/// Resolves an identifier to a name (empty when unknown).
pub type NameResolver<'a> = &'a dyn Fn(Scope, u8) -> String;

/// Enumeration stored in a fixed-width payload field.
pub trait WireEnum: Copy + Sized + 'static {
    /// Width of the field in bytes (1, 2, 4 or 8).
    const WIDTH: usize;
    const VARIANTS: &'static [Self];

    fn from_raw(raw: u64) -> Option<Self>;
    fn raw(self) -> u64;
    fn name(self) -> &'static str;

    /// Find a variant by name, ignoring ASCII case.
    fn from_name(name: &str) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|v| v.name().eq_ignore_ascii_case(name))
    }
}

/// A concrete datagram type bound to one command id.
pub trait DatagramType: Sized {
    const COMMAND: Command;
    /// Payload size in bytes, fixed per command.
    const SIZE: usize;

    #[doc(hidden)]
    fn wrap(payload: Payload) -> Self;

    fn payload(&self) -> &Payload;

    fn payload_mut(&mut self) -> &mut Payload;

    /// Create the datagram with a zero-filled payload.
    fn empty() -> Self {
        Self::wrap(Payload::zeroed(Self::SIZE))
    }

    /// Create the datagram from raw payload bytes (zero-filled if shorter).
    fn from_bytes(data: &[u8]) -> std::result::Result<Self, DatagramError> {
        Payload::from_bytes(Self::SIZE, data).map(Self::wrap)
    }
}

/// Outbound request that is correlated by a session id.
pub trait SessionRequest {
    fn session_id(&self) -> Result<SessionId>;
    fn set_session_id(&mut self, id: SessionId) -> Result<()>;
}

/// Inbound confirmation or notification belonging to a session.
pub trait SessionResponse {
    fn session_id(&self) -> Result<SessionId>;

    /// Whether this is the last datagram of its session.
    fn is_final(&self) -> bool {
        false
    }
}

/// Request that can be configured from a host telegram.
pub trait FromTelegram: Sized {
    fn from_telegram(telegram: &Telegram, resolve: IdentifierResolver<'_>) -> Result<Self>;
}

/// Inbound datagram that can be rendered as a host telegram.
pub trait ToTelegram {
    fn to_telegram(&self, resolve: NameResolver<'_>) -> Result<Telegram>;
}
