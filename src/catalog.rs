//! Query surface over the catalog store.
//!
//! [`Catalog`] owns the store, the service config and the image generator,
//! and is shared by every request handler. Reads go straight to the store;
//! [`Catalog::reload`] reruns the load pipeline under a single permit, so
//! overlapping reloads queue up instead of racing on the images directory.
//!
//! ## Failure posture
//!
//! | Load result              | Store              |
//! |--------------------------|--------------------|
//! | success                  | replaced           |
//! | `DatasetError::Empty`    | replaced, empty    |
//! | any other `DatasetError` | left as it was     |
//!
//! Either way the caller gets a [`Status`] with the count now being served.

use crate::config::ServiceConfig;
use crate::dataset::DatasetError;
use crate::generator::ImageGenerator;
use crate::pipeline::{self, LoadEvent, LoadStats};
use crate::store::CatalogStore;
use crate::types::ResolvedItem;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

pub const STATUS_MESSAGE: &str = "Dining Hall API";
pub const RELOADED_MESSAGE: &str = "Data reloaded";

/// Body of the status and reload responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub message: &'static str,
    pub total_items: usize,
}

pub struct Catalog {
    config: ServiceConfig,
    generator: Arc<dyn ImageGenerator>,
    store: CatalogStore,
    reload_permit: Mutex<()>,
}

impl Catalog {
    /// An empty catalog. Call [`Catalog::reload`] to populate it.
    pub fn new(config: ServiceConfig, generator: Arc<dyn ImageGenerator>) -> Self {
        Self {
            config,
            generator,
            store: CatalogStore::new(),
            reload_permit: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn status(&self) -> Status {
        Status {
            message: STATUS_MESSAGE,
            total_items: self.store.count(),
        }
    }

    pub fn all(&self) -> Vec<ResolvedItem> {
        self.store.list_all()
    }

    /// Rerun the load pipeline and report the count now served.
    pub fn reload(&self) -> Status {
        if let Err(e) = self.load(None) {
            error!(error = %e, "reload failed, keeping the current catalog");
        }
        Status {
            message: RELOADED_MESSAGE,
            total_items: self.store.count(),
        }
    }

    /// Run the pipeline and apply its result to the store.
    ///
    /// Returns the load counters, or the dataset error that left the store
    /// untouched. An empty dataset clears the store and reports zero rows.
    pub fn load(&self, events: Option<Sender<LoadEvent>>) -> Result<LoadStats, DatasetError> {
        let _permit = match self.reload_permit.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        match pipeline::load(&self.config, self.generator.as_ref(), events) {
            Ok(outcome) => {
                self.store.replace_all(outcome.items);
                info!(total_items = self.store.count(), "catalog replaced");
                Ok(outcome.stats)
            }
            Err(DatasetError::Empty(path)) => {
                warn!(path = %path.display(), "dataset is empty, serving no items");
                self.store.replace_all(BTreeMap::new());
                Ok(LoadStats::default())
            }
            Err(e) => Err(e),
        }
    }
}
