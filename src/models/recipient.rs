//! Device tokens, platforms and recipients.
//!
//! Raw platform strings from callers are normalized once into a closed
//! `RouteTag` before routing; tokens and their unread counters are paired into
//! `Target` records at the API boundary and never re-zipped afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque registration identifier issued by a provider for one device
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PushToken(String);

impl PushToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Builds a token from raw device bytes, as reported by the APN feedback channel
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty or whitespace-only tokens are never sent
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for PushToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PushToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PushToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PushToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&String> for PushToken {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

/// Provider backends the engine can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Apple Push Notification service
    Apn,
    /// Firebase Cloud Messaging (legacy HTTP)
    Fcm,
    /// Google Cloud Messaging (legacy)
    Gcm,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Apn, Backend::Fcm, Backend::Gcm];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Apn => "apn",
            Backend::Fcm => "fcm",
            Backend::Gcm => "gcm",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "apn" | "apns" => Ok(Backend::Apn),
            "fcm" => Ok(Backend::Fcm),
            "gcm" => Ok(Backend::Gcm),
            other => Err(format!("Unknown push backend '{other}'")),
        }
    }
}

/// Canonical device platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    /// Backends able to serve this platform, most preferred first
    pub fn backends(&self) -> &'static [Backend] {
        match self {
            Platform::Android => &[Backend::Fcm, Backend::Gcm],
            Platform::Ios => &[Backend::Apn, Backend::Fcm],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" | "iphone" => Ok(Platform::Ios),
            other => Err(format!("Unsupported platform '{other}'")),
        }
    }
}

/// Normalized form of a caller-supplied platform tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteTag {
    /// A device platform, routed through its backend priority list
    Platform(Platform),
    /// An explicit backend, routed only to that adapter
    Backend(Backend),
}

impl RouteTag {
    /// Case-insensitive normalization; `None` when the tag is not recognized
    pub fn parse(raw: &str) -> Option<Self> {
        if let Ok(platform) = raw.parse::<Platform>() {
            return Some(RouteTag::Platform(platform));
        }
        raw.parse::<Backend>().ok().map(RouteTag::Backend)
    }

    /// Candidate backends in priority order
    pub fn candidates(&self) -> &[Backend] {
        match self {
            RouteTag::Platform(platform) => platform.backends(),
            RouteTag::Backend(backend) => std::slice::from_ref(backend),
        }
    }
}

/// One batch item supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub token: PushToken,
    /// Raw platform or backend tag, e.g. "android", "iPhone", "fcm"
    pub platform: String,
    #[serde(default)]
    pub unread: Option<u32>,
}

impl Recipient {
    pub fn new(token: impl Into<PushToken>, platform: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            platform: platform.into(),
            unread: None,
        }
    }

    pub fn with_unread(mut self, unread: u32) -> Self {
        self.unread = Some(unread);
        self
    }

    pub fn route(&self) -> Option<RouteTag> {
        RouteTag::parse(&self.platform)
    }
}

/// A token paired with its per-device unread counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub token: PushToken,
    pub unread: u32,
}

impl Target {
    pub fn new(token: impl Into<PushToken>, unread: u32) -> Self {
        Self {
            token: token.into(),
            unread,
        }
    }
}

impl From<&Recipient> for Target {
    fn from(recipient: &Recipient) -> Self {
        Self {
            token: recipient.token.clone(),
            unread: recipient.unread.unwrap_or(0),
        }
    }
}

/// One or many tokens for a direct backend send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens(pub Vec<PushToken>);

impl From<&str> for Tokens {
    fn from(value: &str) -> Self {
        Tokens(vec![value.into()])
    }
}

impl From<String> for Tokens {
    fn from(value: String) -> Self {
        Tokens(vec![value.into()])
    }
}

impl From<PushToken> for Tokens {
    fn from(value: PushToken) -> Self {
        Tokens(vec![value])
    }
}

impl From<Vec<PushToken>> for Tokens {
    fn from(value: Vec<PushToken>) -> Self {
        Tokens(value)
    }
}

impl From<Vec<String>> for Tokens {
    fn from(value: Vec<String>) -> Self {
        Tokens(value.into_iter().map(PushToken::from).collect())
    }
}

impl From<Vec<&str>> for Tokens {
    fn from(value: Vec<&str>) -> Self {
        Tokens(value.into_iter().map(PushToken::from).collect())
    }
}

impl From<&[&str]> for Tokens {
    fn from(value: &[&str]) -> Self {
        Tokens(value.iter().copied().map(PushToken::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Tokens {
    fn from(value: [&str; N]) -> Self {
        Tokens(value.into_iter().map(PushToken::from).collect())
    }
}

/// Unread badge counters for a direct send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UnreadCounters {
    /// Every badge is cleared (0)
    #[default]
    None,
    /// Same counter for every token
    Uniform(u32),
    /// One counter per token, positionally; missing entries default to 0
    PerToken(Vec<u32>),
}

impl UnreadCounters {
    /// Pairs tokens with their counters
    pub fn pair(&self, tokens: Vec<PushToken>) -> Vec<Target> {
        match self {
            UnreadCounters::None => tokens.into_iter().map(|t| Target::new(t, 0)).collect(),
            UnreadCounters::Uniform(count) => tokens
                .into_iter()
                .map(|t| Target::new(t, *count))
                .collect(),
            UnreadCounters::PerToken(counts) => tokens
                .into_iter()
                .enumerate()
                .map(|(i, t)| Target::new(t, counts.get(i).copied().unwrap_or(0)))
                .collect(),
        }
    }
}

impl From<u32> for UnreadCounters {
    fn from(value: u32) -> Self {
        UnreadCounters::Uniform(value)
    }
}

impl From<Vec<u32>> for UnreadCounters {
    fn from(value: Vec<u32>) -> Self {
        UnreadCounters::PerToken(value)
    }
}
