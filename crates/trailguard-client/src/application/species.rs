//! Species catalogue hook.

use trailguard_core::domain::catalog::Species;
use trailguard_core::protocol::endpoints;

use crate::application::api::{request_fetcher, SharedTransport};
use crate::application::cache::{Query, QueryOptions, ResourceCache};
use crate::application::keys;

pub struct SpeciesSync {
    cache: ResourceCache,
    transport: SharedTransport,
}

impl SpeciesSync {
    pub fn new(cache: ResourceCache, transport: SharedTransport) -> Self {
        Self { cache, transport }
    }

    /// The species catalogue, under `["species"]`.
    pub fn list_species(&self) -> Query<Vec<Species>> {
        self.cache.subscribe(
            keys::species(),
            request_fetcher(&self.transport, endpoints::list_species()),
            QueryOptions::default(),
        )
    }
}
