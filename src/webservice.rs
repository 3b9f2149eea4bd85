//! Binds a transport to resources: fetch, then parse.

use std::sync::Arc;

use tracing::debug;

use crate::future::Future;
use crate::resource::Resource;
use crate::result::{Cause, CauseKind};
use crate::transport::Transport;

/// Loads resources through a shared transport.
///
/// Cheap to clone, so a handle can be moved into a `flat_map` step that
/// loads a dependent resource.
pub struct Webservice<T: ?Sized> {
    transport: Arc<T>,
}

impl<T: Transport> Webservice<T> {
    pub fn new(transport: T) -> Self {
        Webservice {
            transport: Arc::new(transport),
        }
    }
}

impl<T: Transport + ?Sized> Webservice<T> {
    pub fn from_shared(transport: Arc<T>) -> Self {
        Webservice { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch `resource.address()` and parse the bytes, ignoring metadata.
    ///
    /// Transport failures pass through unchanged; parse failures become
    /// [`CauseKind::Parse`] causes.
    pub fn load<A>(&self, resource: &Resource<A>) -> Future<A>
    where
        A: Send + Sync + 'static,
    {
        debug!(address = %resource.address(), "loading resource");
        let resource = resource.clone();
        self.transport.fetch(resource.address()).try_map(move |payload| {
            resource.parse(&payload.bytes).map_err(|err| {
                Cause::new(
                    CauseKind::Parse,
                    format!("parsing {} failed: {err:#}", resource.address()),
                )
                .into()
            })
        })
    }
}

impl<T: ?Sized> Clone for Webservice<T> {
    fn clone(&self) -> Self {
        Webservice {
            transport: Arc::clone(&self.transport),
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde::Deserialize;

    use super::*;
    use crate::address::Address;
    use crate::transport::MemoryTransport;

    #[derive(Clone, Debug, Deserialize, PartialEq)]
    struct Count {
        count: u32,
    }

    #[test]
    fn load_fetches_then_parses() -> Result<()> {
        let address = Address::parse("memory://feed/count.json")?;
        let service =
            Webservice::new(MemoryTransport::new().with(address.clone(), r#"{"count":3}"#));
        let loaded = service.load(&Resource::<Count>::json(address.clone()));
        assert_eq!(loaded.wait()?, Count { count: 3 });
        assert_eq!(service.transport().requests(), vec![address]);
        Ok(())
    }

    #[test]
    fn parse_failure_is_parse_cause() -> Result<()> {
        let address = Address::parse("memory://feed/count.json")?;
        let service =
            Webservice::new(MemoryTransport::new().with(address.clone(), r#"{"count":"x"}"#));
        let cause = service
            .load(&Resource::<Count>::json(address))
            .wait()
            .unwrap_err();
        assert_eq!(cause.kind(), CauseKind::Parse);
        assert!(cause.message().contains("count.json"), "{}", cause.message());
        Ok(())
    }

    #[test]
    fn transport_failure_skips_parse() -> Result<()> {
        let address = Address::parse("memory://feed/count.json")?;
        let transport = MemoryTransport::new();
        transport.fail(address.clone(), Cause::transport("unreachable"));
        let resource = Resource::new(address, |_| -> anyhow::Result<Count> {
            panic!("parse must not run after a transport failure")
        });
        let outcome = Webservice::new(transport).load(&resource).wait();
        assert_eq!(outcome, Err(Cause::transport("unreachable")));
        Ok(())
    }

    #[test]
    fn shared_trait_object_transport() -> Result<()> {
        let address = Address::parse("memory://feed/count.json")?;
        let transport: Arc<dyn Transport> =
            Arc::new(MemoryTransport::new().with(address.clone(), r#"{"count":9}"#));
        let service = Webservice::from_shared(transport);
        let count = service.load(&Resource::<Count>::json(address)).wait()?;
        assert_eq!(count.count, 9);
        Ok(())
    }

    #[test]
    fn resources_are_reusable_across_loads() -> Result<()> {
        let address = Address::parse("memory://feed/count.json")?;
        let service =
            Webservice::new(MemoryTransport::new().with(address.clone(), r#"{"count":1}"#));
        let resource = Resource::<Count>::json(address);
        assert_eq!(service.load(&resource).wait()?, service.load(&resource).wait()?);
        assert_eq!(service.transport().requests().len(), 2);
        Ok(())
    }
}
