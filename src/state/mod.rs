//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `UrlState`: lifecycle of one URL record (pending, in-flight, visited, failed, skipped)
//! - `HostState`: per-host politeness bookkeeping used by the rate limiter
//! - `SessionStats`: aggregate counters for the whole crawl

mod host_state;
mod session;
mod url_state;

pub use host_state::HostState;
pub use session::{SessionSnapshot, SessionStats};
pub use url_state::UrlState;
