use std::time::Duration;

use serde::Deserialize;

/// Settings shared by every transport the probe builds.
/// All keys are optional in the YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProbeSettings {
    /// Upper bound for one whole request, handshake and headers included.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Upper bound for establishing the TCP connection.
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    /// How long a QUIC connection may stay silent before it is considered dead.
    #[serde(default = "default_quic_idle_timeout_seconds")]
    pub quic_idle_timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Skip certificate chain validation.
    /// Useful behind TLS-inspecting proxies whose CA is not in the bundled roots.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_connect_timeout_seconds() -> u64 {
    5
}

fn default_quic_idle_timeout_seconds() -> u64 {
    5
}

fn default_user_agent() -> String {
    format!("alpnprobe/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            quic_idle_timeout_seconds: default_quic_idle_timeout_seconds(),
            user_agent: default_user_agent(),
            accept_invalid_certs: false,
        }
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn quic_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.quic_idle_timeout_seconds)
    }
}
