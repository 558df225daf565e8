//! Terminal rendering of probe results.

use unicode_truncate::UnicodeTruncateStr;

use crate::http_probe::prelude::*;

fn to_fixed_width(input: &str, width: usize) -> String {
    let (truncated, _) = input.unicode_truncate(width);
    format!("{:<width$}", truncated, width = width)
}

fn downgrade_note(requested: Protocol) -> String {
    format!(" (Downgraded from {requested})")
}

/// Wide enough for the longest label with the longest downgrade note.
fn label_width() -> usize {
    let label = Protocol::PRIORITY.iter().map(|p| p.label().len()).max();
    let note = Protocol::PRIORITY.iter().map(|p| downgrade_note(*p).len()).max();
    label.unwrap_or(0) + note.unwrap_or(0)
}

fn describe(requested: Protocol, success: &ProbeSuccess) -> String {
    let mut label = success.negotiated.label().to_string();
    if is_downgraded(requested, success.negotiated) {
        label.push_str(&downgrade_note(requested));
    }

    format!(
        "{} [{}] [{}] [{}]",
        to_fixed_width(&label, label_width()),
        success.organizations.join(" -> "),
        success.status,
        success.title.as_deref().unwrap_or_default()
    )
}

/// One line per outcome.
pub fn render_outcome(target: &Target, outcome: &ProbeOutcome) -> String {
    let protocol = outcome.requested();
    match outcome.status() {
        ProbeStatus::Success(success) => {
            format!("✅ {target}: {}", describe(protocol, success))
        }
        ProbeStatus::Unsupported => {
            format!("❌ {target}: Protocol {protocol} is not available for {target}")
        }
        ProbeStatus::TimedOut => {
            format!("❌ {target}: Protocol {protocol} timed out for {target}")
        }
        ProbeStatus::Failed(detail) => {
            format!("❌ Error fetching details for protocol {protocol}: {detail}")
        }
    }
}

pub fn render_capabilities(target: &Target, capabilities: &CapabilitySet) -> String {
    if capabilities.protocols().is_empty() {
        return format!("{target}: no protocol could be confirmed");
    }

    let protocols: Vec<&str> = capabilities.protocols().iter().map(|p| p.id()).collect();
    format!(
        "{target}: supports [{}] [{}]",
        protocols.join(", "),
        capabilities.organizations().join(" -> ")
    )
}

pub fn render_session(session: &ProbeSession) -> Vec<String> {
    session
        .outcomes
        .iter()
        .map(|outcome| render_outcome(&session.target, outcome))
        .chain(std::iter::once(render_capabilities(
            &session.target,
            &session.capabilities,
        )))
        .collect()
}

pub fn render_best(target: &Target, best: &BestResponse) -> String {
    format!("✅ {target}: {}", describe(best.requested, &best.success))
}
