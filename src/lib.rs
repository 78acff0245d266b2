use config::Config;
use rate_limit::RateLimiter;
use storage::HybridStore;

pub mod config;
pub mod error;
pub mod generation;
pub mod middleware;
pub mod rate_limit;
pub mod router;
pub mod routes;
pub mod storage;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub http: reqwest::Client,
    pub rate_limiter: RateLimiter,
    pub storage: HybridStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let storage = HybridStore::from_config(&config);
        Self {
            config,
            http: reqwest::Client::new(),
            rate_limiter: RateLimiter::default(),
            storage,
        }
    }
}
