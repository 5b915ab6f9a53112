//! slotcast - Slot-based channel scheduling and program guides
//!
//! Turns a pool of programs and a slot schedule into a looping channel
//! lineup, answers "what is airing at time T", and builds the electronic
//! program guide for a set of channels.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Programs, lineups and guide entries
//! - [`scheduler`] - Time-slot and random-slot lineup generation
//! - [`resolver`] - Lineup lookup with redirect following
//! - [`guide`] - Guide building and single-flight refresh
//! - [`utils`] - Time helpers and retry backoff
//!
//! # Example
//!
//! ```no_run
//! use slotcast::config::Config;
//! use slotcast::scheduler::{generate_time_slots_with, TimeSlotSchedule};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let schedule: TimeSlotSchedule = serde_json::from_str(&std::fs::read_to_string("slots.json")?)?;
//!     let programs: Vec<slotcast::Program> = serde_json::from_str(&std::fs::read_to_string("programs.json")?)?;
//!     let generated = generate_time_slots_with(
//!         &schedule,
//!         &programs,
//!         slotcast::utils::now_millis(),
//!         config.generation_limits(),
//!     )?;
//!     println!("{} items", generated.lineup.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod guide;
pub mod models;
pub mod resolver;
pub mod scheduler;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result, SlotcastErrorTrait};
    pub use crate::guide::{Guide, GuideBuilder, GuideService, GuideWindow};
    pub use crate::models::{
        ChannelLineup, CurrentPlaying, GeneratedSchedule, GuideEntry, Lineup, Millis, Program,
        ShowId,
    };
    pub use crate::resolver::LineupResolver;
    pub use crate::scheduler::{RandomSlotSchedule, TimeSlotSchedule};
}

// Direct re-exports for convenience
pub use models::{ChannelLineup, GeneratedSchedule, Lineup, Millis, Program};
