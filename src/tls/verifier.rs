use std::sync::{Arc, Mutex, PoisonError};

use rustls::DigitallySignedStruct;
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{RootCertStore, SignatureScheme};

/// The certificate chain a peer presented, end-entity first.
///
/// Filled in by [`RecordingVerifier`] during the handshake and read after the
/// response arrives. Each transport owns its own slot.
#[derive(Debug, Clone, Default)]
pub struct PeerChain(Arc<Mutex<Vec<CertificateDer<'static>>>>);

impl PeerChain {
    fn record(&self, end_entity: &CertificateDer<'_>, intermediates: &[CertificateDer<'_>]) {
        let chain = std::iter::once(end_entity)
            .chain(intermediates)
            .map(|cert| cert.clone().into_owned())
            .collect();
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = chain;
    }

    pub fn snapshot(&self) -> Vec<CertificateDer<'static>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// The system trust store, so locally installed CAs (an inspecting proxy's,
/// say) are trusted. Falls back to the bundled Mozilla roots when it is empty.
fn trust_roots() -> RootCertStore {
    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        log::warn!("Failed to load system certificates: {err}");
    }
    roots_from(native.certs)
}

fn roots_from(certs: Vec<CertificateDer<'static>>) -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);
    if ignored > 0 {
        log::debug!("Ignored {ignored} unparsable system certificates");
    }
    if added == 0 {
        log::debug!("System trust store is empty, using bundled roots");
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }
    roots
}

/// Wraps a real verifier and records the chain it is asked to verify.
#[derive(Debug)]
pub struct RecordingVerifier {
    inner: Arc<dyn ServerCertVerifier>,
    chain: PeerChain,
}

impl RecordingVerifier {
    /// Verifies against the system trust store, or accepts anything when
    /// `accept_invalid_certs` is set.
    pub fn new(
        provider: Arc<CryptoProvider>,
        accept_invalid_certs: bool,
    ) -> Result<(Arc<Self>, PeerChain), rustls::Error> {
        let inner: Arc<dyn ServerCertVerifier> = if accept_invalid_certs {
            Arc::new(AcceptAnyCertificate { provider })
        } else {
            WebPkiServerVerifier::builder_with_provider(Arc::new(trust_roots()), provider)
                .build()
                .map_err(|e| rustls::Error::General(format!("failed to create webpki verifier: {e}")))?
        };
        let chain = PeerChain::default();
        let verifier = Arc::new(Self {
            inner,
            chain: chain.clone(),
        });
        Ok((verifier, chain))
    }
}

impl ServerCertVerifier for RecordingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        self.chain.record(end_entity, intermediates);
        self.inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Skips chain validation but still checks handshake signatures.
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
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
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_probe::testing::cert_with_org;

    fn provider() -> Arc<CryptoProvider> {
        Arc::new(rustls::crypto::ring::default_provider())
    }

    #[test]
    fn test_chain_is_recorded_even_when_verification_fails() {
        let (verifier, chain) = RecordingVerifier::new(provider(), false).unwrap();
        let leaf = cert_with_org(None);
        let intermediate = cert_with_org(None);
        let name = ServerName::try_from("example.com").unwrap();

        let result = verifier.verify_server_cert(
            &leaf,
            std::slice::from_ref(&intermediate),
            &name,
            &[],
            UnixTime::now(),
        );

        assert!(result.is_err());
        assert_eq!(chain.snapshot(), vec![leaf, intermediate]);
    }

    #[test]
    fn test_system_roots_are_used_when_present() {
        let roots = roots_from(vec![cert_with_org(Some("Corp Proxy CA"))]);
        assert_eq!(roots.len(), 1);
    }

    #[test]
    fn test_bundled_roots_when_system_store_is_empty() {
        let roots = roots_from(Vec::new());
        assert_eq!(roots.len(), webpki_roots::TLS_SERVER_ROOTS.len());
    }

    #[test]
    fn test_bundled_roots_when_system_store_is_unparsable() {
        let roots = roots_from(vec![CertificateDer::from(vec![0u8; 16])]);
        assert_eq!(roots.len(), webpki_roots::TLS_SERVER_ROOTS.len());
    }

    #[test]
    fn test_accept_invalid_certs_accepts_self_signed() {
        let (verifier, chain) = RecordingVerifier::new(provider(), true).unwrap();
        let leaf = cert_with_org(None);
        let name = ServerName::try_from("example.com").unwrap();

        let result = verifier.verify_server_cert(&leaf, &[], &name, &[], UnixTime::now());

        assert!(result.is_ok());
        assert_eq!(chain.snapshot().len(), 1);
    }
}
