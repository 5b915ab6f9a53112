//! Time-addressable lineup resolution
//!
//! Answers "what is playing on channel N at time T" for live playback and for
//! guide generation.
//!
//! # Overview
//!
//! A channel's lineup repeats forever from the channel's start time. For every
//! channel an [`AccumulateTable`] of item start offsets is computed once, and a
//! query becomes a modulo plus a binary search. Sequential queries can pass
//! the previous answer as a hint, turning the lookup into O(1).
//!
//! Redirect items are resolved against the target channel at the same instant
//! and the two airing windows are intersected. Cycles and redirects to
//! channels that do not exist are logged and answered with flex over the
//! redirect's window.
//!
//! # Modules
//!
//! - [`accumulate`] - Prefix sums and lookup
//! - [`lineup`] - Single lineup and multi-channel resolution
//! - [`error`] - Resolver errors

pub mod accumulate;
pub mod error;
pub mod lineup;

// Re-export main types
pub use accumulate::AccumulateTable;
pub use error::{ResolveError, ResolveResult};
pub use lineup::{resolve_in_lineup, LineupResolver, ResolverSettings};
