//! Field-naming conventions for the JSON wire format.
//!
//! A convention maps a payload field identifier to its wire name. It is
//! applied in both directions by `crate::wire`, so the same value governs
//! request serialization and response decoding.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How payload field identifiers are spelled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NamingConvention {
    /// `UserId` -> `user_id`.
    #[default]
    #[serde(rename = "snake_case")]
    SnakeCase,
    /// `user_id` -> `userId`.
    #[serde(rename = "camelCase")]
    CamelCase,
    /// `UserId` -> `user-id`.
    #[serde(rename = "kebab-case")]
    KebabCase,
    /// Identifiers are used unchanged.
    #[serde(rename = "verbatim")]
    Verbatim,
}

impl NamingConvention {
    /// Wire name for `identifier`.
    pub fn apply<'a>(&self, identifier: &'a str) -> Cow<'a, str> {
        match self {
            NamingConvention::Verbatim => Cow::Borrowed(identifier),
            NamingConvention::SnakeCase => join_words(identifier, "_"),
            NamingConvention::KebabCase => join_words(identifier, "-"),
            NamingConvention::CamelCase => {
                let mut out = String::with_capacity(identifier.len());
                for (i, word) in split_words(identifier).into_iter().enumerate() {
                    if i == 0 {
                        out.push_str(&word);
                        continue;
                    }
                    let mut chars = word.chars();
                    if let Some(first) = chars.next() {
                        out.extend(first.to_uppercase());
                        out.push_str(chars.as_str());
                    }
                }
                Cow::Owned(out)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NamingConvention::SnakeCase => "snake_case",
            NamingConvention::CamelCase => "camelCase",
            NamingConvention::KebabCase => "kebab-case",
            NamingConvention::Verbatim => "verbatim",
        }
    }
}

impl fmt::Display for NamingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamingConvention {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "snake_case" | "snake" => Ok(NamingConvention::SnakeCase),
            "camelCase" | "camel" => Ok(NamingConvention::CamelCase),
            "kebab-case" | "kebab" => Ok(NamingConvention::KebabCase),
            "verbatim" | "none" => Ok(NamingConvention::Verbatim),
            other => Err(ConfigError::UnknownNaming(other.to_string())),
        }
    }
}

fn join_words<'a>(identifier: &'a str, separator: &str) -> Cow<'a, str> {
    let joined = split_words(identifier).join(separator);
    if joined == identifier {
        Cow::Borrowed(identifier)
    } else {
        Cow::Owned(joined)
    }
}

/// Split an identifier into lower-case words.
///
/// `_`, `-` and whitespace separate words. An upper-case letter starts a new
/// word after a lower-case letter or digit, and inside a run of capitals the
/// last capital starts a new word when a lower-case letter follows it.
fn split_words(identifier: &str) -> Vec<String> {
    let chars: Vec<char> = identifier.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
