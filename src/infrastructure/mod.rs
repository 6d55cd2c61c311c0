// Infrastructure layer - External dependencies and adapters
pub mod api_client;
pub mod config;
pub mod logging;
pub mod retry;
pub mod ttl_cache;
