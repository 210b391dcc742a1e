//! Transport layer for the bridge.
//!
//! The appliance only speaks TLS 1.2 on TCP port 51200 with a self-signed
//! certificate. The session layer is written against [`Connector`] so it can
//! run over any byte stream; [`TlsConnector`] is the production connector.

mod tls;

pub use tls::{IssuerPin, PinnedIssuerVerifier, TlsConnector};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

/// Bidirectional byte stream to the appliance.
///
/// `Sync` lets the connection driver borrow its stream across awaits on a
/// multi-threaded runtime.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Sync + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Sync + Unpin> AsyncStream for T {}

/// Type-erased stream returned by a [`Connector`].
pub type BoxedStream = Box<dyn AsyncStream>;

/// Opens fresh streams to the appliance.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a new stream, including any handshake.
    async fn connect(&self) -> Result<BoxedStream>;

    /// Human-readable peer description for logs.
    fn peer(&self) -> String;
}
