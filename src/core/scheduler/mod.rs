//! # Scheduler Module
//!
//! Holds files that matched a rule until their grace period runs out.
//!
//! ## Lifecycle
//! ```text
//! detected ──▶ Scheduled ──▶ Moving ──▶ Moved | Skipped | Failed
//!                  │
//!                  └──▶ Cancelled
//! ```
//!
//! Leaving `Scheduled` is a compare-and-swap on the entry's state tag, so a
//! timer fire, a manual move and a cancel can race freely: exactly one wins
//! and the others see a stale entry and do nothing.

mod pending;
mod timer;
mod types;

pub use pending::{Detection, PendingScheduler};
pub use types::{PendingFile, PendingState};
