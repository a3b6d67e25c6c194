use std::{collections::VecDeque, sync::Arc};

use futures::future::join_all;
use futures_locks::Mutex;

use super::{
    identity::{Credentials, Identity},
    manager::SubstitutionManager,
};
use crate::{config::Config, fetch::PageFetcher};

/// Keeps one [`SubstitutionManager`] per identity, at most
/// `config.cache_capacity` of them.
///
/// When full, the store inserted first is dropped. This bounds memory and
/// upstream traffic; it is not an LRU.
pub struct SubstitutionUpdater<F> {
    fetcher: F,
    config: Config,
    managers: Mutex<VecDeque<Arc<SubstitutionManager>>>,
}

impl<F: PageFetcher> SubstitutionUpdater<F> {
    pub fn new(fetcher: F, config: Config) -> Self {
        let capacity = config.cache_capacity.max(1);
        Self {
            fetcher,
            config,
            managers: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    #[cfg(test)]
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn len(&self) -> usize {
        self.managers.lock().await.len()
    }

    #[cfg(test)]
    pub async fn contains(&self, identity: &Identity) -> bool {
        self.find(identity).await.is_some()
    }

    async fn find(&self, identity: &Identity) -> Option<Arc<SubstitutionManager>> {
        self.managers
            .lock()
            .await
            .iter()
            .find(|manager| manager.identity() == identity)
            .cloned()
    }

    /// Returns the store for `credentials`, loading it on first use.
    ///
    /// A cached store is refreshed first when stale; if that refresh fails the
    /// stale data is served. A first load that fails is returned as an error and
    /// nothing is cached. The `example` login gets fresh demo data every time.
    pub async fn get_or_create(
        &self,
        credentials: Credentials,
    ) -> crate::Result<Arc<SubstitutionManager>> {
        if credentials.is_example() {
            return Ok(Arc::new(SubstitutionManager::example(
                self.config.refresh_interval(),
            )));
        }

        if let Some(manager) = self.find(&credentials.identity()).await {
            if manager.maybe_refresh(&self.fetcher, &self.config).await {
                log::info!("Updated data for {}", manager.identity());
            }
            return Ok(manager);
        }

        self.create_substitution_manager(credentials).await
    }

    async fn create_substitution_manager(
        &self,
        credentials: Credentials,
    ) -> crate::Result<Arc<SubstitutionManager>> {
        let manager = SubstitutionManager::load(&self.fetcher, &self.config, credentials).await?;

        let mut managers = self.managers.lock().await;
        // a concurrent first request for the same identity may have won
        if let Some(existing) = managers
            .iter()
            .find(|cached| cached.identity() == manager.identity())
        {
            return Ok(Arc::clone(existing));
        }
        while managers.len() >= self.config.cache_capacity.max(1) {
            if let Some(evicted) = managers.pop_front() {
                log::info!("Evicting cached data for {}", evicted.identity());
            }
        }
        let manager = Arc::new(manager);
        log::info!("Caching data for {}", manager.identity());
        managers.push_back(Arc::clone(&manager));
        Ok(manager)
    }

    /// Refreshes the store of `credentials` regardless of staleness, returning
    /// it and whether new data was loaded.
    ///
    /// An identity without a store gets a first load, which fails like
    /// [`Self::get_or_create`] does.
    pub async fn refresh_now(
        &self,
        credentials: Credentials,
    ) -> crate::Result<(Arc<SubstitutionManager>, bool)> {
        if credentials.is_example() {
            return Ok((self.get_or_create(credentials).await?, true));
        }
        match self.find(&credentials.identity()).await {
            Some(manager) => {
                let refreshed = manager.refresh(&self.fetcher, &self.config).await;
                Ok((manager, refreshed))
            }
            None => Ok((self.create_substitution_manager(credentials).await?, true)),
        }
    }

    /// Refreshes every cached store whose data is stale, returning how many
    /// were updated.
    pub async fn refresh_stale(&self) -> usize {
        let managers: Vec<_> = self.managers.lock().await.iter().cloned().collect();
        join_all(
            managers
                .iter()
                .map(|manager| manager.maybe_refresh(&self.fetcher, &self.config)),
        )
        .await
        .into_iter()
        .filter(|refreshed| *refreshed)
        .count()
    }
}
