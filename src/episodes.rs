//! Episode list and episode detail resources.
//!
//! ```text
//! GET <base>/episodes.json       -> [{"id": "...", "title": "..."}]
//! GET <base>/episodes/<id>.json  -> {"title": "...", "description": "..."}
//! ```

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::future::Future;
use crate::resource::Resource;
use crate::result::Cause;
use crate::transport::Transport;
use crate::webservice::Webservice;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeDetails {
    pub title: String,
    pub description: String,
}

pub fn episodes_resource(base: &Address) -> Resource<Vec<Episode>> {
    Resource::json(base.join("episodes.json"))
}

pub fn details_resource(base: &Address, id: &str) -> Resource<EpisodeDetails> {
    Resource::json(base.join("episodes").join(&format!("{id}.json")))
}

impl Episode {
    pub fn details_address(&self, base: &Address) -> Address {
        self.details_resource(base).address().clone()
    }

    pub fn details_resource(&self, base: &Address) -> Resource<EpisodeDetails> {
        details_resource(base, &self.id)
    }
}

/// Load the episode list, then the details of its first entry.
pub fn first_episode_details<T>(service: &Webservice<T>, base: &Address) -> Future<EpisodeDetails>
where
    T: Transport + ?Sized + 'static,
{
    let next = service.clone();
    let details_base = base.clone();
    service
        .load(&episodes_resource(base))
        .flat_map(move |episodes| match episodes.first() {
            Some(first) => next.load(&first.details_resource(&details_base)),
            None => Future::failed(Cause::transform("episode list is empty")),
        })
}
