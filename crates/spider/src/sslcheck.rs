//! TLS certificate expiry prober.
//!
//! Connects to each configured domain, reads the peer certificate from
//! the handshake, and emits one record when any domain crosses a
//! configured days-to-expiry threshold, is already expired, or cannot
//! be probed at all. Certificate verification is disabled on purpose:
//! an expired or self-signed certificate would otherwise abort the
//! handshake before it could be inspected. The connection is closed
//! right after the handshake; no data is transferred.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_rustls::TlsConnector;

use domain::{CertProbe, Record, RecordKind, RecordPayload, SpiderKind, Subscription};

use crate::error::SpiderError;
use crate::traits::{FetchContext, RawResponse, Spider};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const TLS_PORT: u16 = 443;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub struct SslCheckSpider {
    domains: Vec<String>,
    /// Days-to-expiry values that trigger a notification.
    expired_days: Vec<i64>,
}

impl SslCheckSpider {
    pub fn new(domains: Vec<String>, expired_days: Vec<i64>) -> Self {
        Self {
            domains,
            expired_days,
        }
    }
}

#[async_trait]
impl Spider for SslCheckSpider {
    fn kind(&self) -> SpiderKind {
        SpiderKind::SslCheck
    }

    fn record_kind(&self) -> RecordKind {
        RecordKind::Certificate
    }

    async fn fetch(
        &self,
        _subscription: &Subscription,
        _ctx: &FetchContext,
    ) -> crate::Result<RawResponse> {
        let probes = join_all(
            self.domains
                .iter()
                .map(|domain| probe_certificate(domain, TLS_PORT)),
        )
        .await;
        Ok(RawResponse::Probes(probes))
    }

    fn parse(&self, _subscription: &Subscription, raw: &RawResponse) -> crate::Result<Vec<Record>> {
        let RawResponse::Probes(probes) = raw else {
            return Err(SpiderError::Parse("expected certificate probes".to_string()));
        };
        let now = Utc::now().timestamp_millis();

        let mut lines = Vec::new();
        let mut reported = Vec::new();
        for probe in probes {
            if let Some(line) = self.report_line(probe, now) {
                lines.push(line);
                reported.push(probe.clone());
            }
        }
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![Record {
            id: self.only_id(&now.to_string()),
            title: None,
            content: Some(lines.join("\n\n")),
            url: None,
            source: Some("TLS certificate expiry".to_string()),
            push_time: now,
            extend: None,
            payload: RecordPayload::Certificate { probes: reported },
        }])
    }
}

impl SslCheckSpider {
    /// One report line per domain worth notifying about, `None` when the
    /// certificate is healthy and not at a configured threshold.
    fn report_line(&self, probe: &CertProbe, now: i64) -> Option<String> {
        if let Some(error) = &probe.error {
            return Some(format!("⚠️ {}\nprobe failed: {}", probe.hostname, error));
        }
        let not_after = probe.not_after?;
        let days_left = ((not_after - now) as f64 / DAY_MS as f64).round() as i64;
        if days_left > 0 && !self.expired_days.contains(&days_left) {
            return None;
        }

        let marker = if days_left <= 0 {
            "❌ expired"
        } else if days_left <= 7 {
            "⚠️"
        } else {
            "✅"
        };
        Some(format!(
            "{} {}\nvalid until: {}\nremaining: {} days",
            marker,
            probe.hostname,
            domain::record::human_time(not_after),
            days_left
        ))
    }
}

/// Probe one host, capturing failures into the probe itself.
async fn probe_certificate(host: &str, port: u16) -> CertProbe {
    match try_probe(host, port).await {
        Ok(probe) => probe,
        Err(e) => {
            tracing::warn!("Certificate probe for {} failed: {}", host, e);
            CertProbe {
                hostname: host.to_string(),
                error: Some(e.to_string()),
                ..CertProbe::default()
            }
        }
    }
}

async fn try_probe(
    host: &str,
    port: u16,
) -> Result<CertProbe, Box<dyn std::error::Error + Send + Sync>> {
    let provider = rustls::crypto::aws_lc_rs::default_provider();
    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoVerify(provider)))
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let stream = timeout(PROBE_TIMEOUT, TcpStream::connect((host, port))).await??;
    let server_name = ServerName::try_from(host.to_string())?;
    let tls = timeout(PROBE_TIMEOUT, connector.connect(server_name, stream)).await??;

    let (_, connection) = tls.get_ref();
    let certs = connection
        .peer_certificates()
        .ok_or("no peer certificates")?;
    let leaf = certs.first().ok_or("empty certificate chain")?;
    let (_, cert) = x509_parser::parse_x509_certificate(leaf.as_ref())?;

    let not_before = cert.validity().not_before.timestamp() * 1000;
    let not_after = cert.validity().not_after.timestamp() * 1000;
    let now = Utc::now().timestamp_millis();
    Ok(CertProbe {
        hostname: host.to_string(),
        not_before: Some(not_before),
        not_after: Some(not_after),
        expired: Some(!(not_before <= now && now <= not_after)),
        error: None,
    })
}

/// Accepts any server certificate; only the handshake's certificate data
/// is read, never application data.
#[derive(Debug)]
struct NoVerify(CryptoProvider);

impl ServerCertVerifier for NoVerify {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0
            .signature_verification_algorithms
            .supported_schemes()
    }
}
