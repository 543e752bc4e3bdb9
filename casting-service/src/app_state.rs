use std::sync::Arc;

use axum::extract::FromRef;
use common_auth::Authorizer;

use crate::store::CastingStore;

/// Shared application state used by handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CastingStore>,
    pub authorizer: Arc<Authorizer>,
}

impl AppState {
    pub fn new(store: Arc<CastingStore>, authorizer: Arc<Authorizer>) -> Self {
        Self { store, authorizer }
    }
}

impl FromRef<AppState> for Arc<Authorizer> {
    fn from_ref(state: &AppState) -> Self {
        state.authorizer.clone()
    }
}
