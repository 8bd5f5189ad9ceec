//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_credentialed_fetcher;
mod in_memory_shared_state_store;
mod os_random_source;
mod redis_shared_state_store;
mod static_discovery;
mod url_pattern_discovery;

pub use http_credentialed_fetcher::HttpCredentialedFetcher;
pub use in_memory_shared_state_store::InMemorySharedStateStore;
pub use os_random_source::OsRandomSource;
pub use redis_shared_state_store::RedisSharedStateStore;
pub use static_discovery::StaticDiscovery;
pub use url_pattern_discovery::UrlPatternDiscovery;
