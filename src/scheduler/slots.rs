//! Slot schedule configuration and validation

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::error::{SchedulerError, SchedulerResult};
use super::grouping::ShowGroupings;
use crate::models::{Millis, ShowId, DAY_MS, MINUTE_MS};

/// Default number of days a generated lineup covers
pub const DEFAULT_MAX_DAYS: i64 = 365;

/// Upper bound accepted for `maxDays`
pub const MAX_DAYS_LIMIT: i64 = 36_500;

fn default_period() -> Millis {
    DAY_MS
}

fn default_max_days() -> i64 {
    DEFAULT_MAX_DAYS
}

fn default_weight() -> f64 {
    1.0
}

// ============================================================================
// Modes
// ============================================================================

/// How a slot walks through its show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotOrder {
    /// Episode order
    #[default]
    Next,
    /// Shuffled order
    Shuffle,
}

/// Where leftover slot time goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlexPreference {
    /// Spread across the packed programs
    #[default]
    Distribute,
    /// After the last packed program
    End,
}

/// Padding granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadStyle {
    /// Pad the slot as a whole
    Slot,
    /// Pad each program to the next multiple of `pad`
    #[default]
    Episode,
}

/// How random slots are weighted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RandomDistribution {
    /// Every eligible slot is equally likely
    Uniform,
    /// Slots are picked proportionally to their weight
    #[default]
    Weighted,
}

// ============================================================================
// Slots
// ============================================================================

/// A slot starting at a fixed offset into the period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    /// Offset from the start of the period
    pub time: Millis,
    pub show_id: ShowId,
    #[serde(default)]
    pub order: SlotOrder,
}

impl TimeSlot {
    pub fn new(time: Millis, show_id: ShowId) -> Self {
        Self {
            time,
            show_id,
            order: SlotOrder::Next,
        }
    }

    pub fn with_order(mut self, order: SlotOrder) -> Self {
        self.order = order;
        self
    }
}

/// A slot picked at random whenever the clock needs filling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomSlot {
    /// Stable identity used for cooldown tracking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub show_id: ShowId,

    #[serde(default)]
    pub order: SlotOrder,

    /// Time budget of one airing
    pub duration: Millis,

    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Minimum time between two selections of this slot
    #[serde(default)]
    pub cooldown: Millis,
}

impl RandomSlot {
    pub fn new(show_id: ShowId, duration: Millis) -> Self {
        Self {
            id: None,
            show_id,
            order: SlotOrder::Next,
            duration,
            weight: 1.0,
            cooldown: 0,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_order(mut self, order: SlotOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Millis) -> Self {
        self.cooldown = cooldown;
        self
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Settings shared by both slot schedule kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSettings {
    /// Alignment programs are padded to
    #[serde(default)]
    pub pad: Millis,

    /// Length of one repetition of the schedule
    #[serde(default = "default_period")]
    pub period: Millis,

    #[serde(default = "default_max_days")]
    pub max_days: i64,

    #[serde(default)]
    pub flex_preference: FlexPreference,

    #[serde(default)]
    pub pad_style: PadStyle,

    /// Minutes added to UTC to get local time
    #[serde(default)]
    pub time_zone_offset: i64,

    /// Seed for reproducible lineups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            pad: 0,
            period: DAY_MS,
            max_days: DEFAULT_MAX_DAYS,
            flex_preference: FlexPreference::default(),
            pad_style: PadStyle::default(),
            time_zone_offset: 0,
            seed: None,
        }
    }
}

impl ScheduleSettings {
    pub fn with_pad(mut self, pad: Millis) -> Self {
        self.pad = pad;
        self
    }

    pub fn with_period(mut self, period: Millis) -> Self {
        self.period = period;
        self
    }

    pub fn with_max_days(mut self, max_days: i64) -> Self {
        self.max_days = max_days;
        self
    }

    pub fn with_flex_preference(mut self, preference: FlexPreference) -> Self {
        self.flex_preference = preference;
        self
    }

    pub fn with_pad_style(mut self, style: PadStyle) -> Self {
        self.pad_style = style;
        self
    }

    pub fn with_time_zone_offset(mut self, minutes: i64) -> Self {
        self.time_zone_offset = minutes;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Pad in effect, a pad of zero means no padding
    pub fn effective_pad(&self) -> Millis {
        self.pad.max(1)
    }

    /// Start of the local period containing `now`
    pub fn period_start(&self, now: Millis) -> Millis {
        let local = now + self.time_zone_offset * MINUTE_MS;
        now - local.rem_euclid(self.period)
    }

    /// Length of the generated lineup
    ///
    /// `max_days` rounded up to a whole number of periods.
    pub fn horizon(&self) -> Millis {
        let days = self.max_days.saturating_mul(DAY_MS);
        let period = self.period.max(1);
        let periods = days / period + Millis::from(days % period != 0);
        periods.max(1).saturating_mul(period)
    }

    /// Validate the shared settings
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.period <= 0 {
            return Err(SchedulerError::validation(
                "period",
                format!("Period must be positive, got {}", self.period),
            ));
        }

        if self.pad < 0 {
            return Err(SchedulerError::validation(
                "pad",
                format!("Pad cannot be negative, got {}", self.pad),
            ));
        }

        if self.max_days < 1 {
            return Err(SchedulerError::validation(
                "maxDays",
                format!("At least one day must be generated, got {}", self.max_days),
            ));
        }

        if self.max_days > MAX_DAYS_LIMIT {
            return Err(SchedulerError::validation(
                "maxDays",
                format!(
                    "At most {} days can be generated, got {}",
                    MAX_DAYS_LIMIT, self.max_days
                ),
            ));
        }

        if self.time_zone_offset.abs() >= 24 * 60 {
            return Err(SchedulerError::validation(
                "timeZoneOffset",
                format!("Offset of {} minutes is out of range", self.time_zone_offset),
            ));
        }

        Ok(())
    }
}

fn validate_target(field: String, show: &ShowId, groupings: &ShowGroupings) -> SchedulerResult<()> {
    if show.is_grouping() && !groupings.contains(show) {
        return Err(SchedulerError::validation(
            field,
            format!("Show '{}' has no programs in the pool", show),
        ));
    }
    Ok(())
}

// ============================================================================
// Schedules
// ============================================================================

/// Fixed time-of-day schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotSchedule {
    pub slots: Vec<TimeSlot>,

    /// How late a slot may start before it is skipped
    #[serde(default)]
    pub lateness: Millis,

    #[serde(flatten)]
    pub settings: ScheduleSettings,
}

impl TimeSlotSchedule {
    pub fn new(slots: Vec<TimeSlot>) -> Self {
        Self {
            slots,
            lateness: 0,
            settings: ScheduleSettings::default(),
        }
    }

    pub fn with_lateness(mut self, lateness: Millis) -> Self {
        self.lateness = lateness;
        self
    }

    pub fn with_settings(mut self, settings: ScheduleSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Validate the schedule against the program pool
    pub fn validate(&self, groupings: &ShowGroupings) -> SchedulerResult<()> {
        self.settings.validate()?;

        if self.slots.is_empty() {
            return Err(SchedulerError::validation("slots", "At least one slot is required"));
        }

        if self.lateness < 0 {
            return Err(SchedulerError::validation(
                "lateness",
                format!("Lateness cannot be negative, got {}", self.lateness),
            ));
        }

        let mut times = HashSet::new();
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.time < 0 || slot.time >= self.settings.period {
                return Err(SchedulerError::validation(
                    format!("slots[{i}].time"),
                    format!(
                        "Slot time {} is outside the period [0, {})",
                        slot.time, self.settings.period
                    ),
                ));
            }
            if !times.insert(slot.time) {
                return Err(SchedulerError::validation(
                    format!("slots[{i}].time"),
                    format!("Duplicate slot time {}", slot.time),
                ));
            }
            validate_target(format!("slots[{i}].showId"), &slot.show_id, groupings)?;
        }

        Ok(())
    }

    /// Slots ordered by start time
    pub fn sorted_slots(&self) -> Vec<TimeSlot> {
        let mut slots = self.slots.clone();
        slots.sort_by_key(|slot| slot.time);
        slots
    }
}

/// Weighted random schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomSlotSchedule {
    pub slots: Vec<RandomSlot>,

    #[serde(default)]
    pub random_distribution: RandomDistribution,

    #[serde(flatten)]
    pub settings: ScheduleSettings,
}

impl RandomSlotSchedule {
    pub fn new(slots: Vec<RandomSlot>) -> Self {
        Self {
            slots,
            random_distribution: RandomDistribution::default(),
            settings: ScheduleSettings::default(),
        }
    }

    pub fn with_distribution(mut self, distribution: RandomDistribution) -> Self {
        self.random_distribution = distribution;
        self
    }

    pub fn with_settings(mut self, settings: ScheduleSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Validate the schedule against the program pool
    pub fn validate(&self, groupings: &ShowGroupings) -> SchedulerResult<()> {
        self.settings.validate()?;

        if self.slots.is_empty() {
            return Err(SchedulerError::validation("slots", "At least one slot is required"));
        }

        let mut ids = HashSet::new();
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.duration <= 0 {
                return Err(SchedulerError::validation(
                    format!("slots[{i}].duration"),
                    format!("Duration must be positive, got {}", slot.duration),
                ));
            }
            if !slot.weight.is_finite() || slot.weight < 0.0 {
                return Err(SchedulerError::validation(
                    format!("slots[{i}].weight"),
                    format!("Weight must be a non-negative number, got {}", slot.weight),
                ));
            }
            if slot.cooldown < 0 {
                return Err(SchedulerError::validation(
                    format!("slots[{i}].cooldown"),
                    format!("Cooldown cannot be negative, got {}", slot.cooldown),
                ));
            }
            if let Some(id) = &slot.id {
                if !ids.insert(id.as_str()) {
                    return Err(SchedulerError::validation(
                        format!("slots[{i}].id"),
                        format!("Duplicate slot id '{}'", id),
                    ));
                }
            }
            validate_target(format!("slots[{i}].showId"), &slot.show_id, groupings)?;
        }

        if self.random_distribution == RandomDistribution::Weighted
            && self.slots.iter().all(|slot| slot.weight <= 0.0)
        {
            return Err(SchedulerError::validation(
                "slots",
                "At least one slot needs a positive weight",
            ));
        }

        Ok(())
    }

    /// Cooldown keys, one per slot
    ///
    /// A slot is keyed by its `id` when it has one. Otherwise it is keyed by
    /// its show and its position among the slots airing that show, so
    /// reordering unrelated slots keeps the keys stable.
    pub fn slot_keys(&self) -> Vec<String> {
        let mut occurrences: HashMap<&ShowId, usize> = HashMap::new();
        self.slots
            .iter()
            .map(|slot| {
                let n = occurrences.entry(&slot.show_id).or_insert(0);
                *n += 1;
                match &slot.id {
                    Some(id) => format!("id:{id}"),
                    None => format!("show:{}#{}", slot.show_id, *n),
                }
            })
            .collect()
    }
}
