//! Subscriber records and the registration candidate clients post.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Store-assigned subscriber identifier, rendered in decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub fn new(value: u64) -> Self {
        SubscriberId(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubscriberId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // `u64::from_str` accepts a leading '+', which is not an id we ever hand out
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(anyhow::anyhow!("Invalid subscriber id: '{}'", s));
        }
        s.parse::<u64>()
            .map(SubscriberId)
            .map_err(|e| anyhow::anyhow!("Invalid subscriber id: '{}' ({})", s, e))
    }
}

// Ids travel as JSON strings so clients never have to care about integer width.
impl Serialize for SubscriberId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SubscriberId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A registered notification target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    #[serde(rename = "webhookURL")]
    pub webhook_url: String,
}

/// Registration body as posted by a client. Nothing is checked at this point.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriberCandidate {
    #[serde(rename = "webhookURL", default)]
    pub webhook_url: Option<String>,
}
