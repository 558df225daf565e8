use super::prelude::*;
use super::report;
use crate::tls::organization_names;
use crate::title::extract_title;

/// Error text that means the peer would not agree on the offered ALPN token.
const ALPN_MISMATCH_MARKERS: &[&str] = &[
    "unexpected ALPN protocol",
    "NoApplicationProtocol",
    "no_application_protocol",
    "SelectedUnofferedApplicationProtocol",
];

/// Error text that means the connection went quiet until the transport gave up.
const IDLE_TIMEOUT_MARKERS: &[&str] = &["no recent network activity", "idle timeout", "timed out"];

/// Probes `target` once over `requested` and classifies the result.
///
/// Never fails: every error becomes one of the non-success statuses.
pub async fn probe<F: Fetch>(fetcher: &F, target: &Target, requested: Protocol) -> ProbeOutcome {
    log::debug!("Probing {target} over {requested}");

    let status = match fetcher.fetch(target, requested).await {
        Ok(fetched) => match inspect(fetched).await {
            Ok(success) => ProbeStatus::Success(success),
            Err(err) => ProbeStatus::Failed(report(&err)),
        },
        Err(err) => classify(&err),
    };

    log::debug!("{requested} probe of {target} finished: {status:?}");
    ProbeOutcome::new(requested, status)
}

/// Reads everything the probe reports out of a response.
///
/// The body is owned here and dropped on every return path, which closes the
/// stream whether or not a title was found.
pub(super) async fn inspect(fetched: Fetched) -> Result<ProbeSuccess, ProbeError> {
    let Fetched {
        version,
        status,
        peer_chain,
        body,
    } = fetched;

    let negotiated = Protocol::from_version(version)?;
    let organizations = organization_names(&peer_chain);
    let title = extract_title(body).await?;

    Ok(ProbeSuccess {
        negotiated,
        status,
        title,
        organizations,
    })
}

fn classify(err: &FetchError) -> ProbeStatus {
    let detail = report(err);
    if ALPN_MISMATCH_MARKERS.iter().any(|m| detail.contains(m)) {
        ProbeStatus::Unsupported
    } else if err.is_timeout() || IDLE_TIMEOUT_MARKERS.iter().any(|m| detail.contains(m)) {
        ProbeStatus::TimedOut
    } else {
        ProbeStatus::Failed(detail)
    }
}
