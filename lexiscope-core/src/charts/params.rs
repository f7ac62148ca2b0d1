//! Request parameters
//!
//! Requests arrive as a flat string bag (query string, CLI `--param`
//! pairs). Charts read typed values out of it through the helpers here, so
//! every malformed value is rejected before a plan is built.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::types::UserId;

/// Flat `name -> value` request parameters.
///
/// Empty values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamBag {
    values: BTreeMap<String, String>,
}

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.insert(name, value);
        self
    }

    /// Parse a `name=value` pair.
    pub fn parse_pair(pair: &str) -> Result<(String, String)> {
        match pair.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.to_string()))
            }
            _ => Err(Error::invalid_parameter(
                pair,
                "expected a name=value pair",
            )),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// First present value among `names` (a parameter and its aliases),
    /// with the name it was found under.
    pub fn get_any<'a>(&'a self, names: &[&'a str]) -> Option<(&'a str, &'a str)> {
        names
            .iter()
            .find_map(|name| self.get(name).map(|value| (*name, value)))
    }

    /// The optional `userId` scope.
    pub fn user(&self) -> Result<Option<UserId>> {
        match self.get("userId") {
            None => Ok(None),
            Some(id) if id.len() > UserId::WIDTH => Err(Error::invalid_parameter(
                "userId",
                format!("longer than {} bytes", UserId::WIDTH),
            )),
            Some(id) => Ok(Some(UserId::new(id))),
        }
    }

    pub fn required_u64(&self, name: &str) -> Result<u64> {
        let value = self
            .get(name)
            .ok_or_else(|| Error::invalid_parameter(name, "required"))?;
        value
            .parse()
            .map_err(|_| Error::invalid_parameter(name, format!("not a non-negative integer: {:?}", value)))
    }

    /// `true`/`false` flag with a default.
    pub fn flag(&self, name: &str, default: bool) -> Result<bool> {
        match self.get(name) {
            None => Ok(default),
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(Error::invalid_parameter(
                name,
                format!("expected true or false, got {:?}", other),
            )),
        }
    }

    /// Enum-valued parameter looked up under `names`, `default` when absent.
    pub fn choice<T: Choice>(&self, names: &[&str], default: T) -> Result<T> {
        let Some((name, value)) = self.get_any(names) else {
            return Ok(default);
        };

        T::VALUES
            .iter()
            .find(|(text, _)| *text == value)
            .map(|(_, choice)| *choice)
            .ok_or_else(|| {
                let expected: Vec<&str> = T::VALUES.iter().map(|(text, _)| *text).collect();
                Error::invalid_parameter(
                    name,
                    format!("expected one of {}, got {:?}", expected.join("|"), value),
                )
            })
    }
}

impl FromIterator<(String, String)> for ParamBag {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Closed set of accepted values for a parameter.
pub trait Choice: Copy + 'static {
    const VALUES: &'static [(&'static str, Self)];
}

/// Word key used for grouping and tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupVariant {
    Text,
    Lemma,
    Stem,
}

impl GroupVariant {
    /// `Word` column holding this key.
    pub fn column(&self) -> &'static str {
        match self {
            GroupVariant::Text => "text",
            GroupVariant::Lemma => "lemma",
            GroupVariant::Stem => "stem",
        }
    }
}

impl Choice for GroupVariant {
    const VALUES: &'static [(&'static str, Self)] = &[
        ("text", GroupVariant::Text),
        ("lemma", GroupVariant::Lemma),
        ("stem", GroupVariant::Stem),
    ];
}

/// Word-tracking normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    /// Occurrences per user who typed the word that month
    Absolute,
    /// Share of all words, high-volume buckets only
    Relative,
}

impl Choice for Scale {
    const VALUES: &'static [(&'static str, Self)] = &[
        ("absolute", Scale::Absolute),
        ("relative", Scale::Relative),
    ];
}

/// Message size unit for message length charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthVariant {
    Word,
    Char,
}

impl LengthVariant {
    pub fn column(&self) -> &'static str {
        match self {
            LengthVariant::Word => "words",
            LengthVariant::Char => "symbols",
        }
    }
}

impl Choice for LengthVariant {
    const VALUES: &'static [(&'static str, Self)] = &[
        ("word", LengthVariant::Word),
        ("char", LengthVariant::Char),
    ];
}

/// Volume measure of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Volume {
    Message,
    Word,
    Symbols,
}

impl Choice for Volume {
    const VALUES: &'static [(&'static str, Self)] = &[
        ("message", Volume::Message),
        ("word", Volume::Word),
        ("symbols", Volume::Symbols),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values_are_absent() {
        let params = ParamBag::new().with("userId", "").with("scale", "  ");
        assert_eq!(params.user().unwrap(), None);
        assert_eq!(params.choice(&["scale"], Scale::Absolute).unwrap(), Scale::Absolute);
    }

    #[test]
    fn test_choice_accepts_aliases_and_rejects_unknown() {
        let params = ParamBag::new().with("group", "lemma");
        assert_eq!(
            params
                .choice(&["groupVariant", "group"], GroupVariant::Text)
                .unwrap(),
            GroupVariant::Lemma
        );

        let params = ParamBag::new().with("groupVariant", "root");
        match params.choice(&["groupVariant", "group"], GroupVariant::Text) {
            Err(Error::InvalidParameter { name, message }) => {
                assert_eq!(name, "groupVariant");
                assert!(message.contains("text|lemma|stem"));
            }
            other => panic!("expected invalid parameter, got {:?}", other),
        }
    }

    #[test]
    fn test_required_u64() {
        let params = ParamBag::new().with("minWordCount", "10");
        assert_eq!(params.required_u64("minWordCount").unwrap(), 10);

        assert!(ParamBag::new().required_u64("minWordCount").is_err());
        let params = ParamBag::new().with("minWordCount", "10; DROP TABLE Word");
        assert!(params.required_u64("minWordCount").is_err());
        let params = ParamBag::new().with("minWordCount", "-1");
        assert!(params.required_u64("minWordCount").is_err());
    }

    #[test]
    fn test_flag() {
        assert!(ParamBag::new().flag("article", true).unwrap());
        let params = ParamBag::new().with("article", "false");
        assert!(!params.flag("article", true).unwrap());
        let params = ParamBag::new().with("article", "no");
        assert!(params.flag("article", true).is_err());
    }

    #[test]
    fn test_user_id_width() {
        let params = ParamBag::new().with("userId", &"a".repeat(65));
        assert!(params.user().is_err());
        let params = ParamBag::new().with("userId", "u1");
        assert_eq!(params.user().unwrap(), Some(UserId::new("u1")));
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            ParamBag::parse_pair("trackedWord=a=b").unwrap(),
            ("trackedWord".to_string(), "a=b".to_string())
        );
        assert!(ParamBag::parse_pair("novalue").is_err());
        assert!(ParamBag::parse_pair("=x").is_err());
    }
}
