//! Error types for the KLF-200 bridge.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::datagram::{Command, GatewayError};
use crate::types::Scope;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the bridge.
#[derive(Error, Debug)]
pub enum Error {
    // Wire errors (drop the frame, keep the connection)
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("unknown command: 0x{0:04X}")]
    UnknownCommand(u16),

    #[error("datagram error: {0}")]
    Datagram(#[from] DatagramError),

    // Connection errors (fatal to the connection)
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("connection to {addr} failed: {reason}")]
    Connection { addr: String, reason: String },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("connection timeout")]
    ConnectionTimeout,

    #[error("authentication failed: {0}")]
    Authentication(String),

    // Translation errors (reported as text, connection unaffected)
    #[error("unsupported telegram: {0}")]
    UnsupportedTelegram(String),

    #[error("outgoing telegram must be a request: {0}")]
    OutgoingTelegram(String),

    #[error("unknown datagram: {0}")]
    UnknownDatagram(Command),

    #[error("gateway reported error: {0}")]
    Gateway(GatewayError),

    #[error("invalid identifier: no {scope} with id {id}")]
    InvalidIdentifier { scope: Scope, id: u8 },

    #[error("request rejected: {0}")]
    Rejected(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Frame codec errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame is not enclosed by SLIP END markers")]
    Envelope,

    #[error("unescaped END marker inside frame at offset {0}")]
    UnexpectedEnd(usize),

    #[error("invalid SLIP escape sequence 0xDB 0x{0:02X}")]
    InvalidEscape(u8),

    #[error("truncated frame: {0} bytes")]
    Truncated(usize),

    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("unsupported protocol id: {0}")]
    UnsupportedProtocol(u8),

    #[error("length byte {declared} does not match frame length {actual}")]
    LengthMismatch { declared: u8, actual: usize },

    #[error("payload too large for {command}: {size} bytes (max {max})")]
    PayloadTooLarge { command: Command, size: usize, max: usize },

    #[error("frame exceeds {max} bytes without END marker")]
    Oversized { max: usize },
}

/// Datagram buffer and field errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatagramError {
    #[error("field at offset {offset} with length {len} exceeds buffer of {size} bytes")]
    OutOfBounds { offset: usize, len: usize, size: usize },

    #[error("value of {len} bytes does not fit field of {max} bytes")]
    ValueTooLong { len: usize, max: usize },

    #[error("value out of range: {0}")]
    OutOfRange(String),
}

/// Transport layer errors.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("TLS configuration failed: {0}")]
    TlsConfig(String),

    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("invalid server name: {0}")]
    ServerName(String),
}

impl Error {
    /// Check if error is fatal to the connection.
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::Connection { .. }
                | Error::ConnectionClosed
                | Error::ConnectionTimeout
                | Error::Authentication(_)
                | Error::Io(_)
        )
    }

    /// Check if error indicates the connection should be re-established.
    pub fn should_reconnect(&self) -> bool {
        matches!(
            self,
            Error::ConnectionClosed | Error::ConnectionTimeout | Error::Io(_)
        )
    }

    /// Short, stable name of the error kind, used as prefix for textual error events.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Frame(_) => ErrorKind::Frame,
            Error::UnknownCommand(_) => ErrorKind::UnknownCommand,
            Error::Datagram(_) => ErrorKind::Datagram,
            Error::Transport(_) | Error::Connection { .. } | Error::ConnectionTimeout => {
                ErrorKind::Connection
            }
            Error::ConnectionClosed | Error::Io(_) => ErrorKind::SocketIo,
            Error::Authentication(_) => ErrorKind::Authentication,
            Error::UnsupportedTelegram(_) => ErrorKind::UnsupportedTelegram,
            Error::OutgoingTelegram(_) => ErrorKind::OutgoingTelegram,
            Error::UnknownDatagram(_) => ErrorKind::UnknownDatagram,
            Error::Gateway(_) => ErrorKind::Gateway,
            Error::InvalidIdentifier { .. } => ErrorKind::InvalidIdentifier,
            Error::Rejected(_) => ErrorKind::Rejected,
            Error::Config(_) | Error::InvalidConfig(_) => ErrorKind::Config,
            Error::Other(_) => ErrorKind::Other,
        }
    }

    /// Render the error as the text delivered through the host error channel.
    pub fn to_event_text(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

/// Error classification delivered with textual error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Frame,
    UnknownCommand,
    Datagram,
    Connection,
    SocketIo,
    Authentication,
    UnsupportedTelegram,
    OutgoingTelegram,
    UnknownDatagram,
    Gateway,
    InvalidIdentifier,
    Rejected,
    Config,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Frame => "FrameError",
            Self::UnknownCommand => "UnknownCommand",
            Self::Datagram => "DatagramError",
            Self::Connection => "ConnectionError",
            Self::SocketIo => "SocketIoException",
            Self::Authentication => "AuthenticationError",
            Self::UnsupportedTelegram => "UnsupportedTelegram",
            Self::OutgoingTelegram => "OutgoingTelegram",
            Self::UnknownDatagram => "UnknownDatagram",
            Self::Gateway => "GatewayError",
            Self::InvalidIdentifier => "InvalidIdentifier",
            Self::Rejected => "RequestRejected",
            Self::Config => "ConfigError",
            Self::Other => "Error",
        };
        f.write_str(name)
    }
}
