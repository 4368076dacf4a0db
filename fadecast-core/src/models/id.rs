use nanoid::nanoid;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Generate a 12-character nanoid for entity IDs
pub fn generate_id() -> String {
    nanoid!(12)
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(generate_id())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id! {
    /// Public channel identity (the `hash` handed out in share links)
    ChannelId
}

string_id! {
    /// Reference to the user that owns a channel
    OwnerId
}

string_id! {
    /// Client-generated viewer token, persisted on the viewer's side
    ViewerId
}

/// Four-digit human-readable channel lookup key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BroadcastCode(u16);

impl BroadcastCode {
    pub const MAX: u16 = 9999;

    /// Pick a uniformly random code in `0000..=9999`
    #[must_use]
    pub fn random() -> Self {
        Self(rand::thread_rng().gen_range(0..=Self::MAX))
    }

    #[must_use]
    pub const fn from_value(value: u16) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Parse exactly four ASCII digits
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        if code.len() != 4 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        code.parse().ok().map(Self)
    }

    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for BroadcastCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl TryFrom<String> for BroadcastCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("broadcast code must be 4 digits, got '{value}'"))
    }
}

impl From<BroadcastCode> for String {
    fn from(code: BroadcastCode) -> Self {
        code.to_string()
    }
}
