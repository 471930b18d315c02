//! Socket transport.
//!
//! Owns the TCP or TLS stream and frames it with [`LineCodec`]. Connections
//! are long-lived and idle for stretches, so no read timeout is set; the
//! server probes liveness with PING and TCP keepalive covers dead peers.
//!
//! TLS verification can be relaxed per configuration: `self_signed`
//! tolerates an unverifiable issuer chain, `cert_expired` tolerates an
//! expired certificate. Any other verification failure aborts the
//! connection.

use std::net::IpAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpSocket, TcpStream};
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::client::WebPkiServerVerifier;
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{
    CertificateError, ClientConfig as TlsClientConfig, DigitallySignedStruct,
    Error as TlsError, RootCertStore, SignatureScheme,
};
use tokio_rustls::TlsConnector;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::codec::LineCodec;
use crate::config::Config;
use crate::error::{ClientError, Result};

/// A connected, line-framed stream.
pub enum Transport {
    /// Plain TCP.
    Tcp(Framed<TcpStream, LineCodec>),
    /// TLS over TCP.
    Tls(Framed<TlsStream<TcpStream>, LineCodec>),
}

impl Transport {
    /// Open a stream to the configured server.
    pub async fn connect(config: &Config) -> Result<Self> {
        let stream = open_tcp(config).await?;
        if let Err(e) = enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }

        if config.secure {
            let connector = tls_connector(config)?;
            let server_name = ServerName::try_from(config.server.clone())
                .map_err(|_| ClientError::InvalidServerName(config.server.clone()))?;
            let stream = connector.connect(server_name, stream).await?;
            debug!(server = %config.server, "tls connection established");
            Ok(Self::Tls(Framed::new(stream, LineCodec::new())))
        } else {
            debug!(server = %config.server, "tcp connection established");
            Ok(Self::Tcp(Framed::new(stream, LineCodec::new())))
        }
    }

    /// Read the next line. `Ok(None)` means the peer closed the stream.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        macro_rules! read_framed {
            ($framed:expr) => {
                match $framed.next().await {
                    Some(Ok(line)) => Ok(Some(line)),
                    Some(Err(e)) => Err(e),
                    None => Ok(None),
                }
            };
        }
        match self {
            Self::Tcp(framed) => read_framed!(framed),
            Self::Tls(framed) => read_framed!(framed),
        }
    }

    /// Write one line (the codec appends CRLF).
    pub async fn write_line(&mut self, line: String) -> Result<()> {
        match self {
            Self::Tcp(framed) => framed.send(line).await,
            Self::Tls(framed) => framed.send(line).await,
        }
    }
}

async fn open_tcp(config: &Config) -> Result<TcpStream> {
    let target = (config.server.as_str(), config.port);

    let Some(ref local) = config.local_address else {
        return Ok(TcpStream::connect(target).await?);
    };

    let local_ip: IpAddr = local.parse().map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid local address: {local}"),
        )
    })?;

    let mut last_err = None;
    for addr in tokio::net::lookup_host(target).await? {
        if addr.is_ipv4() != local_ip.is_ipv4() {
            continue;
        }
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.bind((local_ip, 0).into())?;
        match socket.connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err
        .unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no matching address family")
        })
        .into())
}

fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};
    use std::time::Duration;

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));
    sock.set_tcp_keepalive(&keepalive)
}

fn tls_connector(config: &Config) -> Result<TlsConnector> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let mut tls_config = TlsClientConfig::builder()
        .with_root_certificates(roots.clone())
        .with_no_client_auth();

    if config.self_signed || config.cert_expired {
        let inner = WebPkiServerVerifier::builder(Arc::new(roots))
            .build()
            .map_err(|e| TlsError::General(e.to_string()))?;
        tls_config
            .dangerous()
            .set_certificate_verifier(Arc::new(LaxCertVerifier {
                inner,
                allow_self_signed: config.self_signed,
                allow_expired: config.cert_expired,
            }));
    }

    Ok(TlsConnector::from(Arc::new(tls_config)))
}

/// Verifier that tolerates exactly the configured relaxations and defers
/// everything else to the standard webpki verifier.
#[derive(Debug)]
struct LaxCertVerifier {
    inner: Arc<WebPkiServerVerifier>,
    allow_self_signed: bool,
    allow_expired: bool,
}

impl LaxCertVerifier {
    fn tolerated(&self, error: &CertificateError) -> bool {
        match error {
            CertificateError::Expired => self.allow_expired,
            CertificateError::UnknownIssuer | CertificateError::InvalidPurpose => {
                self.allow_self_signed
            }
            _ => false,
        }
    }
}

impl ServerCertVerifier for LaxCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, TlsError> {
        match self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            Ok(verified) => Ok(verified),
            Err(TlsError::InvalidCertificate(cert_err)) if self.tolerated(&cert_err) => {
                warn!(error = ?cert_err, "accepting certificate per trust relaxation");
                Ok(ServerCertVerified::assertion())
            }
            Err(e) => Err(e),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
