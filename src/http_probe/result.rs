use super::protocol::{Protocol, is_downgraded};

/// What a successful probe learned about the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSuccess {
    /// The protocol the response actually travelled over.
    pub negotiated: Protocol,
    pub status: u16,
    pub title: Option<String>,
    /// Subject organisations of the peer chain, one entry per certificate.
    pub organizations: Vec<String>,
}

/// How one probe ended. Only `Success` carries response details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Success(ProbeSuccess),
    /// The origin refused the requested protocol during negotiation.
    Unsupported,
    /// Nothing came back before the transport gave up.
    TimedOut,
    /// Any other failure, with the rendered error chain.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Unsupported,
    TimedOut,
    OtherFailure,
}

/// The result of probing one target with one protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    requested: Protocol,
    status: ProbeStatus,
}

impl ProbeOutcome {
    pub fn new(requested: Protocol, status: ProbeStatus) -> Self {
        Self { requested, status }
    }

    pub fn requested(&self) -> Protocol {
        self.requested
    }

    pub fn status(&self) -> &ProbeStatus {
        &self.status
    }

    pub fn kind(&self) -> OutcomeKind {
        match self.status {
            ProbeStatus::Success(_) => OutcomeKind::Success,
            ProbeStatus::Unsupported => OutcomeKind::Unsupported,
            ProbeStatus::TimedOut => OutcomeKind::TimedOut,
            ProbeStatus::Failed(_) => OutcomeKind::OtherFailure,
        }
    }

    pub fn success(&self) -> Option<&ProbeSuccess> {
        match &self.status {
            ProbeStatus::Success(success) => Some(success),
            _ => None,
        }
    }

    pub fn negotiated(&self) -> Option<Protocol> {
        self.success().map(|s| s.negotiated)
    }

    pub fn title(&self) -> Option<&str> {
        self.success().and_then(|s| s.title.as_deref())
    }

    pub fn organizations(&self) -> &[String] {
        self.success().map_or(&[], |s| s.organizations.as_slice())
    }

    /// True for a success that completed over a different protocol than requested.
    pub fn is_downgraded(&self) -> bool {
        self.negotiated()
            .is_some_and(|negotiated| is_downgraded(self.requested, negotiated))
    }
}
