use std::fmt;

use url::Url;

use super::error::TargetError;

const SECURE_SCHEME: &str = "https://";
const PLAIN_SCHEME: &str = "http://";

/// The origin being probed. Always carries the `https` scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    url: Url,
}

impl Target {
    pub fn parse(input: &str) -> Result<Target, TargetError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TargetError::Empty);
        }

        let normalized = if has_prefix(input, SECURE_SCHEME) {
            input.to_string()
        } else if has_prefix(input, PLAIN_SCHEME) {
            format!("{SECURE_SCHEME}{}", &input[PLAIN_SCHEME.len()..])
        } else {
            format!("{SECURE_SCHEME}{input}")
        };

        let url = Url::parse(&normalized).map_err(|source| TargetError::Invalid {
            input: input.to_string(),
            source,
        })?;
        if url.host_str().is_none_or(str::is_empty) {
            return Err(TargetError::MissingHost(input.to_string()));
        }

        Ok(Target { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

fn has_prefix(input: &str, prefix: &str) -> bool {
    input
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}
