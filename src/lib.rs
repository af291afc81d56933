//! # Clan Tracker
//!
//! Player and clan stats tracker that layers a local cache over a live stats feed.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (clans, members, matches, bundles)
//! - **storage**: Persisted cache store (JSONL tables)
//! - **fetch**: HTTP client for the stats API
//! - **provider**: Live stats providers and field normalization
//! - **resolve**: Per-lookup source selection and merging
//! - **sync**: Detached reconciliation and provisioning
//! - **calculate**: Aggregates, playstyle, strengths/weaknesses, synergy
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod calculate;
pub mod config;
pub mod fetch;
pub mod models;
pub mod provider;
pub mod resolve;
pub mod storage;
pub mod sync;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration such as "500ms", "10s", "2m" or "1h".
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        return ms.parse().ok().map(Duration::from_millis);
    }

    let (digits, unit_secs) = match s.char_indices().last()? {
        (i, 'h') => (&s[..i], 3600),
        (i, 'm') => (&s[..i], 60),
        (i, 's') => (&s[..i], 1),
        _ => (s, 1),
    };
    let value: u64 = digits.parse().ok()?;
    value.checked_mul(unit_secs).map(Duration::from_secs)
}
