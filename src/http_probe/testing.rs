//! A scripted [`Fetch`] for exercising the prober without a network.

use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

use reqwest::Version;
use rustls::pki_types::CertificateDer;
use tokio_util::io::StreamReader;

use super::prelude::*;

#[derive(Clone)]
pub enum Script {
    Respond {
        version: Version,
        status: u16,
        chain: Vec<CertificateDer<'static>>,
        body: Vec<u8>,
    },
    /// Headers arrive, then the body fails after `prefix`.
    BrokenBody {
        version: Version,
        prefix: &'static [u8],
    },
    Fail {
        message: String,
        timed_out: bool,
    },
}

impl Script {
    pub fn page(version: Version, body: &[u8]) -> Self {
        Script::Respond {
            version,
            status: 200,
            chain: Vec::new(),
            body: body.to_vec(),
        }
    }

    pub fn with_chain(self, chain: Vec<CertificateDer<'static>>) -> Self {
        match self {
            Script::Respond {
                version,
                status,
                body,
                ..
            } => Script::Respond {
                version,
                status,
                chain,
                body,
            },
            other => other,
        }
    }

    pub fn broken_body(version: Version, prefix: &'static [u8]) -> Self {
        Script::BrokenBody { version, prefix }
    }

    pub fn fail(message: &str) -> Self {
        Script::Fail {
            message: message.to_string(),
            timed_out: false,
        }
    }

    /// What an h2-only client reports when the peer does not pick h2.
    pub fn alpn_mismatch() -> Self {
        Script::fail("http2: unexpected ALPN protocol \"\"; want \"h2\"")
    }

    pub fn timeout() -> Self {
        Script::Fail {
            message: "operation timed out".to_string(),
            timed_out: true,
        }
    }
}

/// Answers each protocol from its script and records the order of calls.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: HashMap<Protocol, Script>,
    calls: Mutex<Vec<Protocol>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, protocol: Protocol, script: Script) -> Self {
        self.scripts.insert(protocol, script);
        self
    }

    pub fn calls(&self) -> Vec<Protocol> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetch for ScriptedFetcher {
    async fn fetch(&self, _target: &Target, protocol: Protocol) -> Result<Fetched, FetchError> {
        self.calls.lock().unwrap().push(protocol);

        let Some(script) = self.scripts.get(&protocol).cloned() else {
            return Err(FetchError::new(protocol, "connection refused"));
        };

        match script {
            Script::Respond {
                version,
                status,
                chain,
                body,
            } => Ok(Fetched {
                version,
                status,
                peer_chain: chain,
                body: Box::new(io::Cursor::new(body)),
            }),
            Script::BrokenBody { version, prefix } => {
                let chunks = futures::stream::iter(vec![
                    Ok(prefix),
                    Err(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "connection reset by peer",
                    )),
                ]);
                Ok(Fetched {
                    version,
                    status: 200,
                    peer_chain: Vec::new(),
                    body: Box::new(StreamReader::new(chunks)),
                })
            }
            Script::Fail { message, timed_out } => {
                let source = io::Error::other(message);
                Err(if timed_out {
                    FetchError::timeout(protocol, source)
                } else {
                    FetchError::new(protocol, source)
                })
            }
        }
    }
}

pub fn cert_with_org(org: Option<&str>) -> CertificateDer<'static> {
    let key = rcgen::KeyPair::generate().unwrap();
    let mut params = rcgen::CertificateParams::new(vec!["example.com".to_string()]).unwrap();
    if let Some(org) = org {
        params
            .distinguished_name
            .push(rcgen::DnType::OrganizationName, org);
    }
    params.self_signed(&key).unwrap().der().clone()
}
