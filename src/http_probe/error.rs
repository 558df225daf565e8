use thiserror::Error;

use super::protocol::Protocol;
use crate::title::TitleError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failed attempt to obtain a response for one protocol.
///
/// The prober classifies these by walking the whole `source()` chain, so the
/// underlying transport error is kept intact.
#[derive(Debug, Error)]
#[error("{protocol} request failed")]
pub struct FetchError {
    protocol: Protocol,
    timed_out: bool,
    #[source]
    source: BoxError,
}

impl FetchError {
    pub fn new(protocol: Protocol, source: impl Into<BoxError>) -> Self {
        Self {
            protocol,
            timed_out: false,
            source: source.into(),
        }
    }

    /// A failure the transport itself flagged as a timeout.
    pub fn timeout(protocol: Protocol, source: impl Into<BoxError>) -> Self {
        Self {
            protocol,
            timed_out: true,
            source: source.into(),
        }
    }

    pub fn from_reqwest(protocol: Protocol, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(protocol, err)
        } else {
            Self::new(protocol, err)
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn is_timeout(&self) -> bool {
        self.timed_out
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("unrecognized protocol version {0}")]
    UnrecognizedVersion(String),

    #[error("failed to extract title")]
    Title(#[from] TitleError),

    #[error("failed to connect to {target} with any protocol")]
    NoProtocolAvailable { target: String },
}

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("no target given")]
    Empty,

    #[error("invalid target {input:?}")]
    Invalid {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("target {0:?} has no host")]
    MissingHost(String),
}
