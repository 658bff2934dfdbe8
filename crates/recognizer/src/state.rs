use std::sync::Arc;

use crate::catalog::CatalogService;
use crate::config::ConfigStore;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    pub config: ConfigStore,
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(config: ConfigStore, catalog: CatalogService) -> Self {
        Self {
            inner: Arc::new(InnerState { config, catalog }),
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.inner.config
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }
}
