//! Lifecycle of periodic work.
//!
//! # Data Flow
//! ```text
//! Component::start
//!     → TaskGroup::spawn (one task per periodic activity)
//!     → each task selects on its ticker and its shutdown receiver
//!
//! Component::stop
//!     → TaskGroup::stop → Shutdown::trigger
//!     → join with a grace period, abort stragglers
//! ```
//!
//! # Design Decisions
//! - Every component owns its own group; stopping one never touches another
//! - A stopped group can be started again

pub mod shutdown;

pub use shutdown::{Shutdown, TaskGroup};
