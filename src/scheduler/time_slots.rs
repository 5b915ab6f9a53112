//! Fixed time-of-day slot scheduler

use tracing::debug;

use super::error::{SchedulerError, SchedulerResult};
use super::grouping::ShowGroupings;
use super::packing::{GenerationLimits, SlotRun};
use super::slots::{TimeSlot, TimeSlotSchedule};
use crate::models::{GeneratedSchedule, Millis, Program};

/// Slot covering a point of the period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotWindow {
    index: usize,
    /// Nominal start, negative when the slot began in the previous period
    start: Millis,
    end: Millis,
}

/// Find the slot whose window contains `period_time`
///
/// `slots` must be sorted by time and non-empty.
fn locate_slot(slots: &[TimeSlot], period: Millis, period_time: Millis) -> SlotWindow {
    let after = slots.partition_point(|slot| slot.time <= period_time);
    if after == 0 {
        let index = slots.len() - 1;
        return SlotWindow {
            index,
            start: slots[index].time - period,
            end: slots[0].time,
        };
    }

    let index = after - 1;
    let end = slots
        .get(after)
        .map(|slot| slot.time)
        .unwrap_or(slots[0].time + period);
    SlotWindow {
        index,
        start: slots[index].time,
        end,
    }
}

/// Generate a lineup from a time slot schedule with default limits
pub fn generate_time_slots(
    schedule: &TimeSlotSchedule,
    programs: &[Program],
    now: Millis,
) -> SchedulerResult<GeneratedSchedule> {
    generate_time_slots_with(schedule, programs, now, GenerationLimits::default())
}

/// Generate a lineup from a time slot schedule
///
/// The lineup starts at the beginning of the local period containing `now`.
pub fn generate_time_slots_with(
    schedule: &TimeSlotSchedule,
    programs: &[Program],
    now: Millis,
    limits: GenerationLimits,
) -> SchedulerResult<GeneratedSchedule> {
    let groupings = ShowGroupings::from_programs(programs);
    schedule.validate(&groupings)?;

    let settings = &schedule.settings;
    let slots = schedule.sorted_slots();
    let mut run = SlotRun::new(settings, limits, groupings, now);
    let mut missed = 0usize;

    while run.in_progress() {
        let period_time = run.period_time();
        let window = locate_slot(&slots, settings.period, period_time);
        let remaining = window.end - period_time;
        let late = period_time - window.start;

        // Slot starts win over pad alignment
        if late > run.slack() && run.realign(remaining) {
            continue;
        }

        if late > schedule.lateness + run.slack() {
            missed += 1;
            run.push_flex(remaining);
            continue;
        }

        let slot = &slots[window.index];
        run.fill_slot(&slot.show_id, slot.order, remaining);
    }

    debug!(missed, "Time slot walk complete");
    Ok(run.finish())
}

/// Generate on the blocking pool so async callers are not starved
pub async fn generate_time_slots_async(
    schedule: TimeSlotSchedule,
    programs: Vec<Program>,
    now: Millis,
    limits: GenerationLimits,
) -> SchedulerResult<GeneratedSchedule> {
    tokio::task::spawn_blocking(move || generate_time_slots_with(&schedule, &programs, now, limits))
        .await
        .map_err(|e| SchedulerError::generation_failed(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentKey, ContentProgram, ShowId, DAY_MS, HOUR_MS, MINUTE_MS};
    use crate::scheduler::slots::{FlexPreference, ScheduleSettings};

    fn slots(times: &[Millis]) -> Vec<TimeSlot> {
        times
            .iter()
            .map(|&t| TimeSlot::new(t, ShowId::Flex))
            .collect()
    }

    fn episode(show: &str, key: &str, number: u32, minutes: i64) -> Program {
        Program::Content(ContentProgram::episode(
            ContentKey::new("plex", key),
            show,
            1,
            number,
            key,
            minutes * MINUTE_MS,
        ))
    }

    #[test]
    fn test_locate_slot() {
        let sorted = slots(&[HOUR_MS, 6 * HOUR_MS]);

        let w = locate_slot(&sorted, DAY_MS, 2 * HOUR_MS);
        assert_eq!(w, SlotWindow { index: 0, start: HOUR_MS, end: 6 * HOUR_MS });

        let w = locate_slot(&sorted, DAY_MS, 7 * HOUR_MS);
        assert_eq!(w, SlotWindow { index: 1, start: 6 * HOUR_MS, end: DAY_MS + HOUR_MS });

        // Before the first slot the last slot of the previous period applies
        let w = locate_slot(&sorted, DAY_MS, 0);
        assert_eq!(w, SlotWindow { index: 1, start: 6 * HOUR_MS - DAY_MS, end: HOUR_MS });
    }

    #[test]
    fn test_single_slot_wraps_to_itself() {
        let sorted = slots(&[0]);
        let w = locate_slot(&sorted, HOUR_MS, 10 * MINUTE_MS);
        assert_eq!(w, SlotWindow { index: 0, start: 0, end: HOUR_MS });
    }

    #[test]
    fn test_two_half_hour_slots() {
        let pool = vec![episode("A", "a1", 1, 20), episode("B", "b1", 1, 20)];
        let schedule = TimeSlotSchedule::new(vec![
            TimeSlot::new(0, ShowId::Tv("A".to_string())),
            TimeSlot::new(30 * MINUTE_MS, ShowId::Tv("B".to_string())),
        ])
        .with_settings(
            ScheduleSettings::default()
                .with_period(HOUR_MS)
                .with_pad(5 * MINUTE_MS)
                .with_max_days(1),
        );

        let generated = generate_time_slots(&schedule, &pool, 0).unwrap();
        let lineup = generated.lineup;

        assert_eq!(generated.start_time, 0);
        assert_eq!(lineup.total_duration, DAY_MS);
        assert_eq!(lineup.len(), 96);
        for hour in lineup.items.chunks(4) {
            assert_eq!(hour[0], pool[0]);
            assert_eq!(hour[1], Program::flex(10 * MINUTE_MS));
            assert_eq!(hour[2], pool[1]);
            assert_eq!(hour[3], Program::flex(10 * MINUTE_MS));
        }
    }

    #[test]
    fn test_packs_multiple_episodes() {
        let pool = vec![
            episode("A", "a1", 1, 22),
            episode("A", "a2", 2, 22),
            episode("A", "a3", 3, 22),
        ];
        let schedule = TimeSlotSchedule::new(vec![TimeSlot::new(0, ShowId::Tv("A".to_string()))])
            .with_settings(
                ScheduleSettings::default()
                    .with_period(HOUR_MS)
                    .with_pad(5 * MINUTE_MS)
                    .with_max_days(1)
                    .with_flex_preference(FlexPreference::End),
            );

        let lineup = generate_time_slots(&schedule, &pool, 0).unwrap().lineup;

        // Two 22 minute episodes padded to 25 minutes, then 10 minutes of slack
        assert_eq!(lineup.items[0], pool[0]);
        assert_eq!(lineup.items[1], Program::flex(3 * MINUTE_MS));
        assert_eq!(lineup.items[2], pool[1]);
        assert_eq!(lineup.items[3], Program::flex(13 * MINUTE_MS));
        assert_eq!(lineup.items[4], pool[2]);
        assert_eq!(lineup.total_duration, DAY_MS);
    }

    #[test]
    fn test_long_program_slides_and_next_slot_is_missed() {
        let pool = vec![episode("A", "a1", 1, 40), episode("B", "b1", 1, 20)];
        let schedule = TimeSlotSchedule::new(vec![
            TimeSlot::new(0, ShowId::Tv("A".to_string())),
            TimeSlot::new(30 * MINUTE_MS, ShowId::Tv("B".to_string())),
        ])
        .with_settings(
            ScheduleSettings::default()
                .with_period(HOUR_MS)
                .with_pad(5 * MINUTE_MS)
                .with_max_days(1),
        );

        let lineup = generate_time_slots(&schedule, &pool, 0).unwrap().lineup;

        assert_eq!(lineup.items[0], pool[0]);
        assert_eq!(lineup.items[1], Program::flex(20 * MINUTE_MS));
        assert_eq!(lineup.items[2], pool[0]);
    }

    #[test]
    fn test_lateness_allows_late_start() {
        let pool = vec![episode("A", "a1", 1, 40), episode("B", "b1", 1, 15)];
        let schedule = TimeSlotSchedule::new(vec![
            TimeSlot::new(0, ShowId::Tv("A".to_string())),
            TimeSlot::new(30 * MINUTE_MS, ShowId::Tv("B".to_string())),
        ])
        .with_lateness(15 * MINUTE_MS)
        .with_settings(
            ScheduleSettings::default()
                .with_period(HOUR_MS)
                .with_pad(5 * MINUTE_MS)
                .with_max_days(1)
                .with_flex_preference(FlexPreference::End),
        );

        let lineup = generate_time_slots(&schedule, &pool, 0).unwrap().lineup;

        assert_eq!(lineup.items[0], pool[0]);
        assert_eq!(lineup.items[1], pool[1]);
        assert_eq!(lineup.items[2], Program::flex(5 * MINUTE_MS));
    }

    #[test]
    fn test_starts_with_flex_before_first_slot() {
        let pool = vec![episode("A", "a1", 1, 30)];
        let schedule = TimeSlotSchedule::new(vec![TimeSlot::new(6 * HOUR_MS, ShowId::Tv("A".to_string()))])
            .with_settings(ScheduleSettings::default().with_max_days(1));

        let lineup = generate_time_slots(&schedule, &pool, 0).unwrap().lineup;
        assert_eq!(lineup.items[0], Program::flex(6 * HOUR_MS));
        assert_eq!(lineup.items[1], pool[0]);
    }

    #[test]
    fn test_validation_failure_yields_no_lineup() {
        let schedule = TimeSlotSchedule::new(vec![]);
        let err = generate_time_slots(&schedule, &[], 0).unwrap_err();
        assert_eq!(err.field(), Some("slots"));
    }

    #[tokio::test]
    async fn test_generate_async() {
        let schedule = TimeSlotSchedule::new(vec![TimeSlot::new(0, ShowId::Flex)])
            .with_settings(ScheduleSettings::default().with_max_days(2));
        let generated = generate_time_slots_async(schedule, vec![], 0, GenerationLimits::default())
            .await
            .unwrap();
        assert_eq!(generated.lineup.items, vec![Program::flex(2 * DAY_MS)]);
    }
}
