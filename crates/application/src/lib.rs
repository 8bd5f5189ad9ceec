//! Application services and ports.

#![forbid(unsafe_code)]

mod cookie_refresh;

pub use cookie_refresh::{
    CookieRefreshConfig, CookieRefreshService, CookieRefreshSession, CredentialedFetcher,
    DEFAULT_COOKIE_PATH, DiscoveryService, EXPIRES_AT_KEY, FetchedResponse, RandomSource,
    RefreshExecutor, RefreshScheduler, ScheduledTimer, SharedStateStore, StoreEvent,
    StoreSubscription,
};
