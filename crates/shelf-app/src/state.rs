use std::sync::Arc;

use axum::extract::FromRef;
use shelf_auth::token::TokenManager;
use shelf_dal::Pool;

use crate::favorites::FavoritesPolicy;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool, tokens: TokenManager) -> Self {
        AppState {
            state: Arc::new(AppStateInner {
                pool,
                tokens,
                app_config,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.state.tokens
    }
}

/// Validation context of payloads checked by `axum_valid::Garde`
impl FromRef<AppState> for () {
    fn from_ref(_state: &AppState) -> Self {}
}

struct AppStateInner {
    pool: Pool,
    tokens: TokenManager,
    app_config: AppConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub favorites: FavoritesPolicy,
    pub default_page_size: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            favorites: FavoritesPolicy::default(),
            default_page_size: 100,
        }
    }
}
