//! Verification channel resolution.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Out-of-band medium used to deliver a one-time code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Mobile,
}

impl Channel {
    /// Wire name, as used in API payloads and config.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Mobile => "mobile",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static membership sets deciding which languages need OTP confirmation.
///
/// `resolve` returns `None` for languages that are applied directly. A code
/// listed in both sets resolves to [`Channel::Email`]: email is checked first.
#[derive(Debug, Clone)]
pub struct ChannelResolver {
    email: HashSet<String>,
    mobile: HashSet<String>,
}

impl ChannelResolver {
    pub fn new<E, M, S>(email: E, mobile: M) -> Self
    where
        E: IntoIterator<Item = S>,
        M: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            email: email.into_iter().map(Into::into).collect(),
            mobile: mobile.into_iter().map(Into::into).collect(),
        }
    }

    pub fn resolve(&self, language: &str) -> Option<Channel> {
        if self.email.contains(language) {
            Some(Channel::Email)
        } else if self.mobile.contains(language) {
            Some(Channel::Mobile)
        } else {
            None
        }
    }
}

impl Default for ChannelResolver {
    fn default() -> Self {
        Self::new(["fr"], ["en", "hi", "es", "pt", "zh"])
    }
}
