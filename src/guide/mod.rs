//! Electronic program guide generation
//!
//! # Overview
//!
//! [`GuideBuilder`] walks every channel across a time window with the lineup
//! resolver, feeding each answer back as the hint for the next lookup, and
//! converts what it finds into [`GuideEntry`](crate::models::GuideEntry)
//! records. Adjacent flex-equivalent airings (flex, unresolvable redirects,
//! and programs no longer than the channel's minimum guide duration) are
//! melded into one entry, and runs longer than the maximum flex length are
//! split into near-equal chunks.
//!
//! [`GuideService`] owns the published guide and the refresh protocol:
//!
//! ```text
//!            request_refresh()                 build ok, covers latest
//!   Idle ───────────────────────► Building ─────────────────────────► Idle
//!                                  │    ▲
//!                  build failed    │    │  backoff elapsed
//!                                  ▼    │
//!                               Building(retry)
//! ```
//!
//! Only one build is ever in flight. Callers arriving during a build record
//! their window and wait on a watch channel until a published guide covers
//! it; nobody polls.
//!
//! # Modules
//!
//! - [`builder`] - Channel walking, entry conversion and melding
//! - [`service`] - Single-flight refresh with backoff
//! - [`error`] - Guide errors

pub mod builder;
pub mod error;
pub mod service;

// Re-export main types
pub use builder::{
    split_run, ChannelGuide, Guide, GuideBuilder, GuideSettings, GuideSource, GuideWindow,
};
pub use error::{GuideError, GuideResult};
pub use service::{GuideService, RefreshStatus};
