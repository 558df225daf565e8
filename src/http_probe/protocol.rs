use std::fmt;

use reqwest::Version;

use super::error::ProbeError;

/// The HTTP protocol variants a target is probed for.
///
/// Declaration order is newest first and matches [`Protocol::PRIORITY`], so the
/// derived `Ord` sorts capability sets the same way they are probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protocol {
    Http3,
    Http2,
    Http11,
}

impl Protocol {
    /// Probe order. The first success reflects the best protocol the origin serves.
    pub const PRIORITY: [Protocol; 3] = [Protocol::Http3, Protocol::Http2, Protocol::Http11];

    /// The single ALPN token offered when this protocol is requested.
    pub fn alpn(self) -> &'static [u8] {
        match self {
            Protocol::Http3 => b"h3",
            Protocol::Http2 => b"h2",
            Protocol::Http11 => b"http/1.1",
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Protocol::Http3 => "http3",
            Protocol::Http2 => "h2",
            Protocol::Http11 => "http/1.1",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Protocol::Http3 => "HTTP/3 (QUIC)",
            Protocol::Http2 => "HTTP/2 (TCP MULTIPLEXING)",
            Protocol::Http11 => "HTTP/1.1 (TRADITIONAL)",
        }
    }

    /// Maps the version a response reports onto the probed set.
    ///
    /// HTTP/1.0 answers travel over the `http/1.1` ALPN token and fold into
    /// [`Protocol::Http11`]. Anything else is rejected rather than guessed.
    pub fn from_version(version: Version) -> Result<Protocol, ProbeError> {
        match version {
            Version::HTTP_3 => Ok(Protocol::Http3),
            Version::HTTP_2 => Ok(Protocol::Http2),
            Version::HTTP_11 | Version::HTTP_10 => Ok(Protocol::Http11),
            other => Err(ProbeError::UnrecognizedVersion(format!("{other:?}"))),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// True when the negotiated protocol differs from the one requested.
pub fn is_downgraded(requested: Protocol, negotiated: Protocol) -> bool {
    requested != negotiated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_protocol_is_not_downgraded() {
        for p in Protocol::PRIORITY {
            assert!(!is_downgraded(p, p));
        }
    }

    #[test]
    fn test_different_protocols_are_downgraded() {
        for p in Protocol::PRIORITY {
            for q in Protocol::PRIORITY {
                if p != q {
                    assert!(is_downgraded(p, q), "{p} -> {q}");
                }
            }
        }
    }

    #[test]
    fn test_version_mapping_is_closed() {
        assert_eq!(Protocol::from_version(Version::HTTP_3).unwrap(), Protocol::Http3);
        assert_eq!(Protocol::from_version(Version::HTTP_2).unwrap(), Protocol::Http2);
        assert_eq!(Protocol::from_version(Version::HTTP_11).unwrap(), Protocol::Http11);
        assert_eq!(Protocol::from_version(Version::HTTP_10).unwrap(), Protocol::Http11);

        let err = Protocol::from_version(Version::HTTP_09).unwrap_err();
        assert!(err.to_string().contains("HTTP/0.9"));
    }

    #[test]
    fn test_priority_is_newest_first() {
        let mut sorted = Protocol::PRIORITY;
        sorted.sort();
        assert_eq!(sorted, Protocol::PRIORITY);
        assert_eq!(Protocol::PRIORITY[0].alpn(), b"h3");
    }
}
