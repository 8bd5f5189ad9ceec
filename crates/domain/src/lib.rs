//! Domain types and invariants for cookie refresh coordination.

#![forbid(unsafe_code)]

mod refresh;

pub use refresh::{
    CookieRefreshResult, CookieStatus, RefreshOutcome, StatusSnapshot, parse_expires_at,
};
