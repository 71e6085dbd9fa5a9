use std::sync::Arc;

use smash_store::Registry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
}
