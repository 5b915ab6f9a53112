//! Weighted random slot scheduler

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use tracing::debug;

use super::error::{SchedulerError, SchedulerResult};
use super::grouping::ShowGroupings;
use super::packing::{GenerationLimits, SlotRun};
use super::slots::{RandomDistribution, RandomSlot, RandomSlotSchedule};
use crate::models::{GeneratedSchedule, Millis, Program, MINUTE_MS};

/// Last selection time of every slot, keyed by slot identity
#[derive(Debug, Default)]
struct Cooldowns {
    last_played: HashMap<String, Millis>,
}

impl Cooldowns {
    fn is_ready(&self, key: &str, slot: &RandomSlot, now: Millis) -> bool {
        self.last_played
            .get(key)
            .map_or(true, |&last| now - last >= slot.cooldown)
    }

    /// Time until the first slot still cooling down becomes available
    fn soonest_expiry(&self, keys: &[String], slots: &[RandomSlot], now: Millis) -> Option<Millis> {
        keys.iter()
            .zip(slots)
            .filter_map(|(key, slot)| {
                let last = *self.last_played.get(key)?;
                let wait = last + slot.cooldown - now;
                (wait > 0).then_some(wait)
            })
            .min()
    }

    fn record(&mut self, key: &str, now: Millis) {
        self.last_played.insert(key.to_string(), now);
    }
}

/// Cumulative-weight draw among the eligible slots
fn pick_slot(
    slots: &[RandomSlot],
    eligible: &[usize],
    distribution: RandomDistribution,
    rng: &mut ChaCha8Rng,
) -> Option<usize> {
    let weight = |i: usize| match distribution {
        RandomDistribution::Uniform => 1.0,
        RandomDistribution::Weighted => slots[i].weight,
    };

    let total: f64 = eligible.iter().map(|&i| weight(i)).sum();
    if total <= 0.0 {
        return None;
    }

    let draw = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    let mut chosen = None;
    for &i in eligible {
        let w = weight(i);
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        chosen = Some(i);
        if draw < cumulative {
            break;
        }
    }
    chosen
}

/// Generate a lineup from a random slot schedule with default limits
pub fn generate_random_slots(
    schedule: &RandomSlotSchedule,
    programs: &[Program],
    now: Millis,
) -> SchedulerResult<GeneratedSchedule> {
    generate_random_slots_with(schedule, programs, now, GenerationLimits::default())
}

/// Generate a lineup from a random slot schedule
///
/// Each step draws one slot among those out of cooldown. When every slot is
/// cooling down the clock jumps to the first expiry with flex.
pub fn generate_random_slots_with(
    schedule: &RandomSlotSchedule,
    programs: &[Program],
    now: Millis,
    limits: GenerationLimits,
) -> SchedulerResult<GeneratedSchedule> {
    let groupings = ShowGroupings::from_programs(programs);
    schedule.validate(&groupings)?;

    let settings = &schedule.settings;
    let slots = &schedule.slots;
    let keys = schedule.slot_keys();
    let idle_wait = settings.effective_pad().max(MINUTE_MS);

    let mut run = SlotRun::new(settings, limits, groupings, now);
    let mut cooldowns = Cooldowns::default();
    let mut waits = 0usize;

    while run.in_progress() {
        if run.realign(Millis::MAX) {
            continue;
        }

        let t = run.now();
        let eligible: Vec<usize> = (0..slots.len())
            .filter(|&i| cooldowns.is_ready(&keys[i], &slots[i], t))
            .collect();

        match pick_slot(slots, &eligible, schedule.random_distribution, run.rng()) {
            Some(i) => {
                cooldowns.record(&keys[i], t);
                let slot = &slots[i];
                run.fill_slot(&slot.show_id, slot.order, slot.duration);
            }
            None => {
                waits += 1;
                let wait = cooldowns.soonest_expiry(&keys, slots, t).unwrap_or(idle_wait);
                run.push_flex(wait);
            }
        }
    }

    debug!(waits, "Random slot walk complete");
    Ok(run.finish())
}

/// Generate on the blocking pool so async callers are not starved
pub async fn generate_random_slots_async(
    schedule: RandomSlotSchedule,
    programs: Vec<Program>,
    now: Millis,
    limits: GenerationLimits,
) -> SchedulerResult<GeneratedSchedule> {
    tokio::task::spawn_blocking(move || generate_random_slots_with(&schedule, &programs, now, limits))
        .await
        .map_err(|e| SchedulerError::generation_failed(e.to_string()))?
}
