//! Inbox watching and dispatch.
//!
//! # Architecture
//!
//! ```text
//! notify listener thread
//!   - one RecommendedWatcher on the input directory
//!   - forwards raw events into a bounded channel
//!         |
//! InboxWatcher (single dispatcher task)
//!   - startup backlog scan, then channel events
//!   - InboxFilter picks arrivals (create, rename-into)
//!   - ClaimRegistry drops duplicate reports
//!   - Pipeline processes one file at a time
//! ```

mod claims;
mod error;
mod filter;
mod inbox;

pub use claims::{Claim, ClaimRegistry};
pub use error::WatchError;
pub use filter::InboxFilter;
pub use inbox::{DispatchStats, InboxWatcher, InboxWatcherBuilder, scan_backlog};
