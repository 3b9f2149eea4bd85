//! Declarative descriptions of fetchable, parsable values.

use std::fmt;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use serde::de::DeserializeOwned;

use crate::address::Address;

type ParseFn<A> = dyn Fn(&[u8]) -> Result<A> + Send + Sync;

/// An address plus a pure function turning the fetched bytes into `A`.
///
/// Resources hold no mutable state; clones share the parse function.
pub struct Resource<A> {
    address: Address,
    parse: Arc<ParseFn<A>>,
}

impl<A> Resource<A> {
    pub fn new<F>(address: Address, parse: F) -> Self
    where
        F: Fn(&[u8]) -> Result<A> + Send + Sync + 'static,
    {
        Resource {
            address,
            parse: Arc::new(parse),
        }
    }

    /// Build a resource from a parse function that only reports absence.
    pub fn from_option<F>(address: Address, parse: F) -> Self
    where
        F: Fn(&[u8]) -> Option<A> + Send + Sync + 'static,
    {
        let target = address.to_string();
        Resource::new(address, move |bytes| {
            parse(bytes).ok_or_else(|| anyhow!("payload from {target} did not match"))
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn parse(&self, bytes: &[u8]) -> Result<A> {
        (self.parse)(bytes)
    }
}

impl<A: DeserializeOwned> Resource<A> {
    /// A resource decoded from JSON into `A`.
    ///
    /// Missing fields or wrong types fail the parse.
    pub fn json(address: Address) -> Self {
        Resource::new(address, |bytes| Ok(serde_json::from_slice(bytes)?))
    }
}

impl<A> Clone for Resource<A> {
    fn clone(&self) -> Self {
        Resource {
            address: self.address.clone(),
            parse: Arc::clone(&self.parse),
        }
    }
}

impl<A> fmt::Debug for Resource<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Title {
        title: String,
    }

    fn addr() -> Address {
        Address::parse("memory://feed/title.json").unwrap()
    }

    #[test]
    fn json_parses_expected_shape() -> Result<()> {
        let resource = Resource::<Title>::json(addr());
        assert_eq!(
            resource.parse(br#"{"title":"T"}"#)?,
            Title { title: "T".into() }
        );
        Ok(())
    }

    #[test]
    fn json_rejects_missing_field() {
        let resource = Resource::<Title>::json(addr());
        let err = resource.parse(br#"{"name":"T"}"#).unwrap_err();
        assert!(err.to_string().contains("missing field `title`"), "{err}");
    }

    #[test]
    fn from_option_reports_absence() {
        let resource = Resource::from_option(addr(), |bytes| {
            std::str::from_utf8(bytes).ok().map(str::to_owned)
        });
        assert!(resource.parse(b"ok").is_ok());
        let err = resource.parse(&[0xff, 0xfe]).unwrap_err();
        assert!(err.to_string().contains("memory://feed/title.json"), "{err}");
    }

    #[test]
    fn clones_share_address_and_parser() -> Result<()> {
        let resource = Resource::new(addr(), |bytes| Ok(bytes.len()));
        let copy = resource.clone();
        assert_eq!(copy.address(), resource.address());
        assert_eq!(copy.parse(b"four")?, 4);
        Ok(())
    }
}
