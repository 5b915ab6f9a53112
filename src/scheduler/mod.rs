//! Slot-based lineup generation
//!
//! This module turns declarative channel programming rules into a concrete,
//! repeating lineup of programs.
//!
//! # Overview
//!
//! A scheduling run walks a virtual clock from the start of the local period
//! containing "now" up to the configured horizon. At every step a slot is
//! chosen, programs are pulled from the slot's show cursor, padded to the
//! configured alignment and written to the lineup. The finished lineup always
//! spans a whole number of periods, so it can be repeated forever.
//!
//! # Features
//!
//! - **Time Slots**: slots starting at fixed offsets into the period, with a
//!   lateness tolerance after which a slot is skipped and aired as flex
//! - **Random Slots**: weighted random selection with per-slot cooldowns keyed
//!   by slot identity
//! - **Show Cursors**: episode order anchored at the first program listed for a
//!   show, or a shuffle that reshuffles each half of the permutation on wrap
//! - **Padding**: per-episode or per-slot padding with leftover time placed at
//!   the end or spread round-robin over the packed programs
//! - **Reproducibility**: an optional seed makes a run fully deterministic
//!   (ChaCha8)
//!
//! # Modules
//!
//! - [`iterator`] - Show cursors
//! - [`grouping`] - Program pool grouped by show
//! - [`slots`] - Slot schedule configuration and validation
//! - [`packing`] - Lineup writer, padding and slack distribution
//! - [`time_slots`] - Time-of-day scheduler
//! - [`random_slots`] - Weighted random scheduler
//!
//! # Quick Start
//!
//! ```ignore
//! use slotcast::scheduler::{generate_time_slots, ScheduleSettings, TimeSlot, TimeSlotSchedule};
//! use slotcast::models::{ShowId, HOUR_MS, MINUTE_MS};
//!
//! let schedule = TimeSlotSchedule::new(vec![
//!     TimeSlot::new(0, "tv.The Office".parse()?),
//!     TimeSlot::new(30 * MINUTE_MS, ShowId::Flex),
//! ])
//! .with_settings(ScheduleSettings::default().with_period(HOUR_MS).with_pad(5 * MINUTE_MS));
//!
//! let generated = generate_time_slots(&schedule, &programs, now)?;
//! assert_eq!(generated.lineup.total_duration % HOUR_MS, 0);
//! ```
//!
//! # Errors
//!
//! Configuration problems are reported as [`SchedulerError::Validation`]
//! naming the offending field, and no lineup is produced. Problems found while
//! walking, such as a show that cannot be iterated, are logged and the
//! affected window airs flex instead.

pub mod error;
pub mod grouping;
pub mod iterator;
pub mod packing;
pub mod random_slots;
pub mod slots;
pub mod time_slots;

// Re-export main types
pub use error::{SchedulerError, SchedulerResult};
pub use grouping::{ShowGrouping, ShowGroupings};
pub use iterator::{OrderedShow, ShowIterator, ShuffledShow};
pub use packing::{
    distribute_slack, make_padded, GenerationLimits, LineupWriter, PaddedProgram,
    DEFAULT_MAX_LINEUP_ITEMS, SLACK_MS,
};
pub use random_slots::{
    generate_random_slots, generate_random_slots_async, generate_random_slots_with,
};
pub use slots::{
    FlexPreference, PadStyle, RandomDistribution, RandomSlot, RandomSlotSchedule,
    ScheduleSettings, SlotOrder, TimeSlot, TimeSlotSchedule, DEFAULT_MAX_DAYS, MAX_DAYS_LIMIT,
};
pub use time_slots::{generate_time_slots, generate_time_slots_async, generate_time_slots_with};
