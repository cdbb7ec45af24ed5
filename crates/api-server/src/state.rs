//! Shared application state
//!
//! One `AppState` is built at startup and cloned into every handler. All
//! stores live behind `Arc`s; the stats engine shares the same store
//! instances so every rollup sees the latest writes.

use std::path::Path;
use std::sync::Arc;

use revend_core::bottle::BottleStore;
use revend_core::business::BusinessStore;
use revend_core::machine::MachineStore;
use revend_core::stats::StatsEngine;
use revend_core::{Error, Result};

use crate::auth::{TokenService, UserStore};

struct AppStateInner {
    users: UserStore,
    businesses: Arc<BusinessStore>,
    machines: Arc<MachineStore>,
    bottles: Arc<BottleStore>,
    stats: StatsEngine,
    tokens: TokenService,
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

impl AppState {
    /// Open (or create) every store under `data_dir`
    pub async fn new(data_dir: impl AsRef<Path>, tokens: TokenService) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let users = UserStore::new(data_dir.join("users.json"))
            .await
            .map_err(|err| Error::Storage(err.to_string()))?;
        let businesses = Arc::new(BusinessStore::new(data_dir.join("businesses.json")).await?);
        let machines = Arc::new(MachineStore::new(data_dir.join("machines.json")).await?);
        let bottles = Arc::new(BottleStore::new(data_dir.join("bottles.json")).await?);
        let stats = StatsEngine::new(
            Arc::clone(&businesses),
            Arc::clone(&machines),
            Arc::clone(&bottles),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                users,
                businesses,
                machines,
                bottles,
                stats,
                tokens,
            }),
        })
    }

    pub fn users(&self) -> &UserStore {
        &self.inner.users
    }

    pub fn businesses(&self) -> &BusinessStore {
        &self.inner.businesses
    }

    pub fn machines(&self) -> &MachineStore {
        &self.inner.machines
    }

    pub fn bottles(&self) -> &BottleStore {
        &self.inner.bottles
    }

    pub fn stats(&self) -> &StatsEngine {
        &self.inner.stats
    }

    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }
}
