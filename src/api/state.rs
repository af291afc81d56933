use std::sync::Arc;

use crate::resolve::SourceSelector;
use crate::storage::CacheStore;

#[derive(Clone)]
pub struct AppState {
    pub selector: SourceSelector,
    pub store: Arc<dyn CacheStore>,
    pub cors_origin: String,
}

impl AppState {
    pub fn new(selector: SourceSelector, cors_origin: impl Into<String>) -> Self {
        Self {
            store: selector.store().clone(),
            selector,
            cors_origin: cors_origin.into(),
        }
    }
}
