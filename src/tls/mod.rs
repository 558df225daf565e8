pub mod certificate;
pub mod verifier;

pub use certificate::organization_names;
pub use verifier::{PeerChain, RecordingVerifier};
