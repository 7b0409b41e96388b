pub mod config;
pub mod response;
pub mod store;
pub mod types;
pub mod users;
pub mod validators;

use std::sync::Arc;

use crate::config::Config;
use crate::store::{DynamoStore, UserStore};

/// Shared application state
pub struct AppState<S: UserStore = DynamoStore> {
    pub store: S,
    pub table_name: String,
}

impl<S: UserStore> AppState<S> {
    pub fn new(store: S, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            store,
            table_name: config.table_name.clone(),
        })
    }
}
