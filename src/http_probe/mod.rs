pub mod aggregate;
pub mod error;
pub mod probe;
pub mod protocol;
pub mod result;
pub mod target;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub mod prelude {
    pub use super::aggregate::{
        BestResponse, CapabilitySet, ProbeSession, aggregate, fetch_best, probe_all,
    };
    pub use super::error::{FetchError, ProbeError, TargetError};
    pub use super::probe::probe;
    pub use super::protocol::{Protocol, is_downgraded};
    pub use super::result::{OutcomeKind, ProbeOutcome, ProbeStatus, ProbeSuccess};
    pub use super::target::Target;
    pub use super::transport::{Fetch, Fetched, HttpFetcher};
}

use std::fmt::Write;

/// Renders an error and every `source()` below it.
pub fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, "\n\nCaused by: {}", src);
        err = src;
    }
    s
}
