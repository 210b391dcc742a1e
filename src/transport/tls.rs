//! TLS 1.2 client with issuer pinning.
//!
//! The appliance presents a self-signed certificate whose chain cannot be
//! validated. Instead the issuer distinguished name is compared against a
//! pinned issuer, attribute by attribute. Handshake signatures are still
//! verified with the crypto provider.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector as RustlsConnector;
use tracing::{debug, warn};

use super::{BoxedStream, Connector};
use crate::config::GatewayConfig;
use crate::error::{Error, Result, TransportError};

// ============================================================================
// Issuer pinning
// ============================================================================

/// Issuer distinguished name as attribute/value pairs.
///
/// Two pins are equal when they hold the same attributes with the same
/// values, regardless of order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerPin(BTreeMap<String, String>);

impl IssuerPin {
    /// Parse `"CN=..., O=..., C=..."`. Segments without exactly one `=` are ignored.
    pub fn parse(issuer: &str) -> Result<Self> {
        let mut attributes = BTreeMap::new();
        for segment in issuer.split(',') {
            let mut parts = segment.split('=');
            if let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) {
                attributes.insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        if attributes.is_empty() {
            return Err(TransportError::Certificate(format!("empty issuer: {issuer:?}")).into());
        }
        Ok(Self(attributes))
    }

    /// Issuer of a DER encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, certificate) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| TransportError::Certificate(e.to_string()))?;
        Self::parse(&certificate.issuer().to_string())
    }

    /// Issuer of a certificate file, PEM or DER.
    pub fn from_certificate_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        if data.starts_with(b"-----BEGIN") {
            let (_, pem) = x509_parser::pem::parse_x509_pem(&data)
                .map_err(|e| TransportError::Certificate(format!("{}: {e}", path.display())))?;
            Self::from_der(&pem.contents)
        } else {
            Self::from_der(&data)
        }
    }

    /// Whether a presented certificate was issued by this issuer.
    pub fn matches(&self, der: &[u8]) -> bool {
        Self::from_der(der).is_ok_and(|presented| presented == *self)
    }
}

impl fmt::Display for IssuerPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Accepts exactly the server certificates issued by a pinned issuer.
#[derive(Debug)]
pub struct PinnedIssuerVerifier {
    pin: IssuerPin,
    algorithms: WebPkiSupportedAlgorithms,
}

impl PinnedIssuerVerifier {
    pub fn new(pin: IssuerPin, provider: &CryptoProvider) -> Self {
        Self {
            pin,
            algorithms: provider.signature_verification_algorithms,
        }
    }
}

impl ServerCertVerifier for PinnedIssuerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        if self.pin.matches(end_entity) {
            Ok(ServerCertVerified::assertion())
        } else {
            warn!(expected = %self.pin, "server certificate issuer does not match");
            Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Opens TLS 1.2 streams to the appliance.
pub struct TlsConnector {
    host: String,
    port: u16,
    server_name: ServerName<'static>,
    connect_timeout: Duration,
    connector: RustlsConnector,
}

impl TlsConnector {
    /// Create a connector for `host:port` trusting certificates from `pin`.
    pub fn new(host: &str, port: u16, pin: IssuerPin, connect_timeout: Duration) -> Result<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let verifier = PinnedIssuerVerifier::new(pin, &provider);

        let config = ClientConfig::builder_with_provider(provider)
            .with_protocol_versions(&[&rustls::version::TLS12])
            .map_err(|e| TransportError::TlsConfig(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();

        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| TransportError::ServerName(format!("{host}: {e}")))?;

        Ok(Self {
            host: host.to_string(),
            port,
            server_name,
            connect_timeout,
            connector: RustlsConnector::from(Arc::new(config)),
        })
    }

    /// Create a connector from the gateway section of the configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let pin = match (&config.certificate, &config.issuer) {
            (Some(path), _) => IssuerPin::from_certificate_file(path)?,
            (None, Some(issuer)) => IssuerPin::parse(issuer)?,
            (None, None) => {
                return Err(Error::InvalidConfig(
                    "gateway.certificate or gateway.issuer is required".into(),
                ))
            }
        };
        Self::new(&config.host, config.port, pin, config.connect_timeout)
    }
}

#[async_trait]
impl Connector for TlsConnector {
    async fn connect(&self) -> Result<BoxedStream> {
        let addr = self.peer();

        let tcp = timeout(self.connect_timeout, TcpStream::connect((self.host.as_str(), self.port)))
            .await
            .map_err(|_| Error::ConnectionTimeout)?
            .map_err(|e| Error::Connection {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;
        tcp.set_nodelay(true)?;

        let stream = timeout(
            self.connect_timeout,
            self.connector.connect(self.server_name.clone(), tcp),
        )
        .await
        .map_err(|_| Error::ConnectionTimeout)?
        .map_err(|e| TransportError::Handshake(e.to_string()))?;

        debug!(peer = %addr, "TLS session established");
        Ok(Box::new(stream))
    }

    fn peer(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for TlsConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConnector")
            .field("peer", &self.peer())
            .finish_non_exhaustive()
    }
}
