//! Single-assignment futures and declarative fetch-then-parse resources.

pub mod address;
pub mod episodes;
pub mod fixtures;
pub mod future;
pub mod resource;
pub mod result;
pub mod transport;
pub mod webservice;

#[cfg(test)]
mod testing;

pub type Result<T> = result::Result<T>;

pub use address::Address;
pub use episodes::{
    Episode, EpisodeDetails, details_resource, episodes_resource, first_episode_details,
};
pub use fixtures::{BackgroundFixtures, FixtureServer};
pub use future::{Completer, Future};
pub use resource::Resource;
pub use result::{Cause, CauseKind, wrap};
pub use transport::{HttpTransport, MemoryTransport, Metadata, Payload, Transport};
pub use webservice::Webservice;
