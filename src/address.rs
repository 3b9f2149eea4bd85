//! URL-like identifiers for fetchable resources.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

const SEGMENT_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'\'')
    .add(b'`')
    .add(b'<')
    .add(b'>')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

/// Target of a fetch, e.g. `http://host/episodes.json`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Validate and wrap an absolute address of the form `scheme://rest`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let Some((scheme, rest)) = raw.split_once("://") else {
            bail!("address `{raw}` is missing a scheme");
        };
        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            bail!("address `{raw}` has an invalid scheme");
        }
        if rest.is_empty() {
            bail!("address `{raw}` has no host or path");
        }
        Ok(Address(raw.trim_end_matches('/').to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append one path segment, percent-encoding anything that would
    /// change the address structure.
    pub fn join(&self, segment: &str) -> Address {
        let encoded = utf8_percent_encode(segment, SEGMENT_ENCODE);
        Address(format!("{}/{}", self.0, encoded))
    }

    /// Append a literal relative path such as `episodes/index.json`.
    pub fn join_path(&self, path: &str) -> Address {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.clone(), |acc, segment| acc.join(segment))
    }

    pub fn scheme(&self) -> &str {
        self.0.split_once("://").map_or("", |(scheme, _)| scheme)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Address::parse(s)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
