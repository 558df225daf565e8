use std::io;
use std::sync::Arc;

use futures::TryStreamExt;
use reqwest::redirect::Policy;
use reqwest::{Client, Version};
use rustls::ClientConfig;
use rustls::client::danger::ServerCertVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::CertificateDer;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use super::error::{BoxError, FetchError};
use super::protocol::Protocol;
use super::target::Target;
use crate::config::ProbeSettings;
use crate::tls::{PeerChain, RecordingVerifier};

/// An owned, streaming response body. Dropping it releases the connection.
pub type BodyReader = Box<dyn AsyncRead + Send + Unpin>;

/// A response whose body has not been read yet.
pub struct Fetched {
    pub version: Version,
    pub status: u16,
    /// Peer certificates, end-entity first. Empty if the handshake exposed none.
    pub peer_chain: Vec<CertificateDer<'static>>,
    pub body: BodyReader,
}

/// Performs one GET of a target over one pinned protocol.
pub trait Fetch {
    fn fetch(
        &self,
        target: &Target,
        protocol: Protocol,
    ) -> impl Future<Output = Result<Fetched, FetchError>> + Send;
}

/// Builds the TLS configuration for `protocol`, offering exactly its ALPN token.
pub fn tls_config(
    protocol: Protocol,
    provider: Arc<CryptoProvider>,
    verifier: Arc<dyn ServerCertVerifier>,
) -> Result<ClientConfig, rustls::Error> {
    let mut config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();
    config.alpn_protocols = vec![protocol.alpn().to_vec()];
    Ok(config)
}

/// A client that can only speak one protocol, plus the slot its verifier
/// records the peer chain into.
pub struct PinnedTransport {
    protocol: Protocol,
    client: Client,
    peer_chain: PeerChain,
}

impl PinnedTransport {
    pub fn build(protocol: Protocol, settings: &ProbeSettings) -> Result<Self, BoxError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let (verifier, peer_chain) =
            RecordingVerifier::new(provider.clone(), settings.accept_invalid_certs)?;
        let tls = tls_config(protocol, provider, verifier)?;

        let builder = Client::builder()
            .use_preconfigured_tls(tls)
            .timeout(settings.timeout())
            .connect_timeout(settings.connect_timeout())
            .user_agent(settings.user_agent.as_str())
            .redirect(Policy::none());

        // HTTP/2 gets no prior knowledge: a peer that completes the handshake
        // without h2 answers over HTTP/1.1, which shows up as a downgrade.
        let builder = match protocol {
            Protocol::Http3 => builder
                .http3_prior_knowledge()
                .http3_max_idle_timeout(settings.quic_idle_timeout()),
            Protocol::Http2 => builder,
            Protocol::Http11 => builder.http1_only(),
        };

        log::debug!(
            "Built {protocol} transport (alpn={:?}, timeout={:?})",
            String::from_utf8_lossy(protocol.alpn()),
            settings.timeout()
        );

        Ok(Self {
            protocol,
            client: builder.build()?,
            peer_chain,
        })
    }

    pub async fn get(&self, target: &Target) -> Result<Fetched, FetchError> {
        let mut request = self.client.get(target.url().clone());
        if self.protocol == Protocol::Http3 {
            request = request.version(Version::HTTP_3);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(self.protocol, e))?;

        let version = response.version();
        let status = response.status().as_u16();
        let stream = Box::pin(response.bytes_stream().map_err(io::Error::other));

        Ok(Fetched {
            version,
            status,
            peer_chain: self.peer_chain.snapshot(),
            body: Box::new(StreamReader::new(stream)),
        })
    }
}

/// The real network fetcher. Every call builds a fresh pinned transport so no
/// connection or TLS state is shared between probes.
pub struct HttpFetcher {
    settings: ProbeSettings,
}

impl HttpFetcher {
    pub fn new(settings: ProbeSettings) -> Self {
        Self { settings }
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, target: &Target, protocol: Protocol) -> Result<Fetched, FetchError> {
        let transport = PinnedTransport::build(protocol, &self.settings)
            .map_err(|e| FetchError::new(protocol, e))?;
        transport.get(target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier(provider: &Arc<CryptoProvider>) -> Arc<dyn ServerCertVerifier> {
        let (verifier, _) = RecordingVerifier::new(provider.clone(), false).unwrap();
        verifier
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_fetch_futures_are_send() {
        let target = Target::parse("example.com").unwrap();
        let fetcher = HttpFetcher::new(ProbeSettings::default());
        assert_send(&fetcher.fetch(&target, Protocol::Http2));

        let scripted = crate::http_probe::testing::ScriptedFetcher::new();
        assert_send(&scripted.fetch(&target, Protocol::Http11));
    }

    #[test]
    fn test_each_protocol_offers_exactly_one_alpn_token() {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        for protocol in Protocol::PRIORITY {
            let config = tls_config(protocol, provider.clone(), verifier(&provider)).unwrap();
            assert_eq!(config.alpn_protocols, vec![protocol.alpn().to_vec()]);
        }
    }

    #[test]
    fn test_configurations_are_independent() {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let h2 = tls_config(Protocol::Http2, provider.clone(), verifier(&provider)).unwrap();
        let h1 = tls_config(Protocol::Http11, provider.clone(), verifier(&provider)).unwrap();
        assert_ne!(h2.alpn_protocols, h1.alpn_protocols);
    }

    #[tokio::test]
    async fn test_tcp_transports_build() {
        let settings = ProbeSettings::default();
        for protocol in [Protocol::Http2, Protocol::Http11] {
            let transport = PinnedTransport::build(protocol, &settings).unwrap();
            assert_eq!(transport.protocol, protocol);
            assert!(transport.peer_chain.snapshot().is_empty());
        }
    }
}
