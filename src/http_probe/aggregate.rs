use super::prelude::*;
use super::probe::inspect;
use super::report;

/// What a probing session established about one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    protocols: Vec<Protocol>,
    organizations: Vec<String>,
}

impl CapabilitySet {
    /// Folds one outcome in.
    ///
    /// Successful probes add their negotiated protocol. The first non-empty
    /// organisation list is kept and later ones are ignored.
    pub fn absorb(mut self, outcome: &ProbeOutcome) -> Self {
        let Some(success) = outcome.success() else {
            return self;
        };

        if !self.protocols.contains(&success.negotiated) {
            self.protocols.push(success.negotiated);
            self.protocols.sort();
        }
        if self.organizations.is_empty() && !success.organizations.is_empty() {
            self.organizations = success.organizations.clone();
        }
        self
    }

    /// Supported protocols, newest first.
    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }

    pub fn supports(&self, protocol: Protocol) -> bool {
        self.protocols.contains(&protocol)
    }

    pub fn organizations(&self) -> &[String] {
        &self.organizations
    }
}

pub struct ProbeSession {
    pub target: Target,
    /// One outcome per protocol, in probe order.
    pub outcomes: Vec<ProbeOutcome>,
    pub capabilities: CapabilitySet,
}

/// Probes every protocol in priority order, one after the other.
/// A failing protocol never stops the ones after it.
pub async fn probe_all<F: Fetch>(fetcher: &F, target: &Target) -> ProbeSession {
    let mut outcomes = Vec::with_capacity(Protocol::PRIORITY.len());
    for protocol in Protocol::PRIORITY {
        outcomes.push(probe(fetcher, target, protocol).await);
    }

    let capabilities = outcomes
        .iter()
        .fold(CapabilitySet::default(), CapabilitySet::absorb);

    log::info!(
        "{target} supports {:?}",
        capabilities
            .protocols()
            .iter()
            .map(|p| p.id())
            .collect::<Vec<_>>()
    );

    ProbeSession {
        target: target.clone(),
        outcomes,
        capabilities,
    }
}

pub async fn aggregate<F: Fetch>(fetcher: &F, target: &Target) -> CapabilitySet {
    probe_all(fetcher, target).await.capabilities
}

/// The first protocol that answered, with what it returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestResponse {
    pub requested: Protocol,
    pub success: ProbeSuccess,
}

/// Fetches `target` over the best protocol that works.
///
/// Protocols that fail to connect are skipped. A response that cannot be read
/// is an error, as is running out of protocols.
pub async fn fetch_best<F: Fetch>(fetcher: &F, target: &Target) -> Result<BestResponse, ProbeError> {
    for protocol in Protocol::PRIORITY {
        match fetcher.fetch(target, protocol).await {
            Ok(fetched) => {
                let success = inspect(fetched).await?;
                return Ok(BestResponse {
                    requested: protocol,
                    success,
                });
            }
            Err(err) => log::debug!("{}", report(&err)),
        }
    }

    Err(ProbeError::NoProtocolAvailable {
        target: target.to_string(),
    })
}
