//! Lineup assembly shared by both slot schedulers
//!
//! A [`SlotRun`] walks a virtual clock from the start of the period. Each
//! scheduler decides which slot covers the clock and how much time it gets;
//! the run pulls programs for the slot, pads them and writes them out.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use super::grouping::ShowGroupings;
use super::slots::{FlexPreference, PadStyle, ScheduleSettings, SlotOrder};
use crate::models::{GeneratedSchedule, Lineup, Millis, Program, ShowId};

/// Misalignment tolerated before the clock is realigned to the pad
pub const SLACK_MS: Millis = 9_999;

/// Item ceiling of a generated lineup
pub const DEFAULT_MAX_LINEUP_ITEMS: usize = 40_000;

/// Bounds applied to a scheduling run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationLimits {
    pub max_items: usize,
    pub slack: Millis,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_LINEUP_ITEMS,
            slack: SLACK_MS,
        }
    }
}

// ============================================================================
// Lineup Writer
// ============================================================================

/// Append-only lineup buffer that merges adjacent flex
#[derive(Debug, Clone, Default)]
pub struct LineupWriter {
    items: Vec<Program>,
    total: Millis,
}

impl LineupWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time written so far
    pub fn elapsed(&self) -> Millis {
        self.total
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push_flex(&mut self, duration: Millis) {
        if duration <= 0 {
            return;
        }
        self.total += duration;
        if let Some(Program::Flex(last)) = self.items.last_mut() {
            last.duration += duration;
            return;
        }
        self.items.push(Program::flex(duration));
    }

    pub fn push(&mut self, program: Program) {
        if program.is_flex() {
            self.push_flex(program.duration());
            return;
        }
        if program.duration() <= 0 {
            return;
        }
        self.total += program.duration();
        self.items.push(program);
    }

    fn pop(&mut self) -> Option<Program> {
        let program = self.items.pop()?;
        self.total -= program.duration();
        Some(program)
    }

    /// Close the lineup on a period boundary
    ///
    /// Items past `horizon` or beyond the item ceiling are dropped, then the
    /// lineup is padded with flex up to the next multiple of `period`.
    pub fn finish(mut self, period: Millis, horizon: Millis, max_items: usize) -> Lineup {
        while self.total > horizon || (!self.items.is_empty() && self.items.len() >= max_items) {
            if self.pop().is_none() {
                break;
            }
        }

        let remainder = self.total.rem_euclid(period);
        if self.total == 0 {
            self.push_flex(period);
        } else if remainder != 0 {
            self.push_flex(period - remainder);
        }

        Lineup {
            total_duration: self.total,
            items: self.items,
        }
    }
}

// ============================================================================
// Padding
// ============================================================================

/// A packed program with the flex that follows it
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedProgram {
    pub program: Program,
    pub pad: Millis,
}

impl PaddedProgram {
    pub fn total(&self) -> Millis {
        self.program.duration() + self.pad
    }
}

/// Pad a program up to the next multiple of `pad`
///
/// Programs already within `slack` of a boundary are left alone.
pub fn make_padded(program: Program, pad: Millis, slack: Millis) -> PaddedProgram {
    let remainder = program.duration().rem_euclid(pad);
    let extra = if remainder > slack && pad - remainder > slack {
        pad - remainder
    } else {
        0
    };
    PaddedProgram { program, pad: extra }
}

/// Spread leftover slot time over the packed programs
pub fn distribute_slack(
    items: &mut [PaddedProgram],
    slack: Millis,
    pad: Millis,
    preference: FlexPreference,
    style: PadStyle,
) {
    let Some(last) = items.len().checked_sub(1) else {
        return;
    };
    if slack <= 0 {
        return;
    }

    match (preference, style) {
        (FlexPreference::End, _) => items[last].pad += slack,
        (FlexPreference::Distribute, PadStyle::Slot) => {
            let share = slack / items.len() as Millis;
            for item in items.iter_mut() {
                item.pad += share;
            }
            items[last].pad += slack - share * items.len() as Millis;
        }
        (FlexPreference::Distribute, PadStyle::Episode) => {
            let whole = slack / pad;
            items[last].pad += slack % pad;

            // Least padded first, every item gets an equal share of whole pads
            let n = items.len() as Millis;
            let mut order: Vec<usize> = (0..items.len()).collect();
            order.sort_by_key(|&i| items[i].pad);
            for (rank, &i) in order.iter().enumerate() {
                let extra = Millis::from((rank as Millis) < whole % n);
                items[i].pad += (whole / n + extra) * pad;
            }
        }
    }
}

// ============================================================================
// Slot Run
// ============================================================================

/// State of one scheduling run
pub(crate) struct SlotRun<'a> {
    settings: &'a ScheduleSettings,
    limits: GenerationLimits,
    groupings: ShowGroupings,
    rng: ChaCha8Rng,
    writer: LineupWriter,
    start: Millis,
    horizon: Millis,
}

impl<'a> SlotRun<'a> {
    pub(crate) fn new(
        settings: &'a ScheduleSettings,
        limits: GenerationLimits,
        groupings: ShowGroupings,
        now: Millis,
    ) -> Self {
        let rng = match settings.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let start = settings.period_start(now);

        debug!(
            start,
            horizon = settings.horizon(),
            shows = groupings.len(),
            "Starting slot run"
        );

        Self {
            settings,
            limits,
            groupings,
            rng,
            writer: LineupWriter::new(),
            start,
            horizon: settings.horizon(),
        }
    }

    pub(crate) fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Absolute virtual time
    pub(crate) fn now(&self) -> Millis {
        self.start + self.writer.elapsed()
    }

    /// Offset of the virtual clock into the current period
    pub(crate) fn period_time(&self) -> Millis {
        self.writer.elapsed().rem_euclid(self.settings.period)
    }

    pub(crate) fn slack(&self) -> Millis {
        self.limits.slack
    }

    pub(crate) fn in_progress(&self) -> bool {
        self.writer.elapsed() < self.horizon && self.writer.len() < self.limits.max_items
    }

    /// Emit flex up to the next pad boundary when the clock drifted
    ///
    /// The flex never runs past `limit`.
    pub(crate) fn realign(&mut self, limit: Millis) -> bool {
        let pad = self.settings.effective_pad();
        let offset = self.writer.elapsed().rem_euclid(pad);
        if offset > self.limits.slack && pad - offset > self.limits.slack && limit > 0 {
            self.writer.push_flex((pad - offset).min(limit));
            return true;
        }
        false
    }

    pub(crate) fn push_flex(&mut self, duration: Millis) {
        self.writer.push_flex(duration);
    }

    /// Fill `remaining` with programs of `show`
    pub(crate) fn fill_slot(&mut self, show: &ShowId, order: SlotOrder, remaining: Millis) {
        match show {
            ShowId::Flex => {
                self.writer.push_flex(remaining);
                return;
            }
            ShowId::Redirect(channel) => {
                self.writer.push(Program::redirect(*channel, remaining));
                return;
            }
            _ => {}
        }

        let pad = match self.settings.pad_style {
            PadStyle::Slot => 1,
            PadStyle::Episode => self.settings.effective_pad(),
        };
        let slack = self.limits.slack;
        let room = self.limits.max_items.saturating_sub(self.writer.len()) / 2;

        let cursor = match self.groupings.cursor(show, order, &mut self.rng) {
            Ok(cursor) => cursor,
            Err(e) => {
                warn!(show = %show, error = %e, "Show cannot be iterated, airing flex instead");
                self.writer.push_flex(remaining);
                return;
            }
        };

        let first = cursor.current().clone();
        cursor.advance();

        if first.duration() > remaining {
            self.writer.push(first);
            return;
        }

        let mut head = make_padded(first, pad, slack);
        head.pad = head.pad.min(remaining - head.program.duration());
        let mut packed = vec![head];
        let mut used = packed[0].total();
        while packed.len() < room.max(1) {
            let next = make_padded(cursor.current().clone(), pad, slack);
            if used + next.total() > remaining {
                break;
            }
            used += next.total();
            packed.push(next);
            cursor.advance();
        }

        distribute_slack(
            &mut packed,
            remaining - used,
            self.settings.effective_pad(),
            self.settings.flex_preference,
            self.settings.pad_style,
        );

        for item in packed {
            self.writer.push(item.program);
            self.writer.push_flex(item.pad);
        }
    }

    pub(crate) fn finish(self) -> GeneratedSchedule {
        let lineup = self
            .writer
            .finish(self.settings.period, self.horizon, self.limits.max_items);

        debug!(
            items = lineup.len(),
            total_duration = lineup.total_duration,
            "Finished slot run"
        );

        GeneratedSchedule {
            start_time: self.start,
            lineup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentKey, ContentProgram, HOUR_MS, MINUTE_MS};

    fn movie(key: &str, minutes: i64) -> Program {
        Program::Content(ContentProgram::movie(
            ContentKey::new("plex", key),
            key,
            minutes * MINUTE_MS,
        ))
    }

    fn padded(minutes: i64, pad: i64) -> PaddedProgram {
        PaddedProgram {
            program: movie("m", minutes),
            pad: pad * MINUTE_MS,
        }
    }

    #[test]
    fn test_writer_merges_flex() {
        let mut writer = LineupWriter::new();
        writer.push_flex(MINUTE_MS);
        writer.push(Program::flex(MINUTE_MS));
        writer.push(movie("a", 10));
        writer.push_flex(0);
        writer.push_flex(MINUTE_MS);

        assert_eq!(writer.len(), 3);
        assert_eq!(writer.elapsed(), 13 * MINUTE_MS);
    }

    #[test]
    fn test_finish_pads_to_period() {
        let mut writer = LineupWriter::new();
        writer.push(movie("a", 50));
        let lineup = writer.finish(HOUR_MS, HOUR_MS, 100);

        assert_eq!(lineup.total_duration, HOUR_MS);
        assert_eq!(lineup.items[1], Program::flex(10 * MINUTE_MS));
        assert!(lineup.is_consistent());
    }

    #[test]
    fn test_finish_trims_past_horizon() {
        let mut writer = LineupWriter::new();
        writer.push(movie("a", 50));
        writer.push(movie("b", 50));
        let lineup = writer.finish(HOUR_MS, HOUR_MS, 100);

        assert_eq!(lineup.len(), 2);
        assert_eq!(lineup.total_duration, HOUR_MS);
        assert_eq!(lineup.items[0], movie("a", 50));
    }

    #[test]
    fn test_finish_empty_lineup_is_one_period_of_flex() {
        let lineup = LineupWriter::new().finish(HOUR_MS, HOUR_MS, 100);
        assert_eq!(lineup.items, vec![Program::flex(HOUR_MS)]);
    }

    #[test]
    fn test_finish_respects_item_ceiling() {
        let mut writer = LineupWriter::new();
        for i in 0..10 {
            writer.push(movie(&format!("m{i}"), 1));
        }
        let lineup = writer.finish(HOUR_MS, 10 * HOUR_MS, 5);
        assert!(lineup.len() <= 5);
        assert_eq!(lineup.total_duration % HOUR_MS, 0);
    }

    #[test]
    fn test_make_padded() {
        let pad = 5 * MINUTE_MS;
        assert_eq!(make_padded(movie("a", 22), pad, SLACK_MS).pad, 3 * MINUTE_MS);
        assert_eq!(make_padded(movie("a", 20), pad, SLACK_MS).pad, 0);

        // Within slack of the boundary
        let almost = movie("a", 20).with_duration(20 * MINUTE_MS - 5_000);
        assert_eq!(make_padded(almost, pad, SLACK_MS).pad, 0);
    }

    #[test]
    fn test_distribute_end() {
        let mut items = vec![padded(20, 0), padded(20, 0)];
        distribute_slack(
            &mut items,
            10 * MINUTE_MS,
            5 * MINUTE_MS,
            FlexPreference::End,
            PadStyle::Episode,
        );
        assert_eq!(items[0].pad, 0);
        assert_eq!(items[1].pad, 10 * MINUTE_MS);
    }

    #[test]
    fn test_distribute_evenly_per_slot() {
        let mut items = vec![padded(10, 0), padded(10, 0), padded(10, 0)];
        distribute_slack(&mut items, 10_001, 1, FlexPreference::Distribute, PadStyle::Slot);

        assert_eq!(items[0].pad, 3_333);
        assert_eq!(items[1].pad, 3_333);
        assert_eq!(items[2].pad, 3_335);
    }

    #[test]
    fn test_distribute_round_robin_least_padded_first() {
        let pad = 5 * MINUTE_MS;
        let mut items = vec![padded(20, 5), padded(20, 0), padded(20, 0)];
        distribute_slack(
            &mut items,
            2 * pad + 30_000,
            pad,
            FlexPreference::Distribute,
            PadStyle::Episode,
        );

        assert_eq!(items[0].pad, pad);
        assert_eq!(items[1].pad, pad);
        assert_eq!(items[2].pad, pad + 30_000);
    }

    #[test]
    fn test_distribute_large_slack_in_equal_shares() {
        let mut items = vec![padded(10, 0), padded(10, 0), padded(10, 0)];
        distribute_slack(
            &mut items,
            10 * HOUR_MS + 1,
            1,
            FlexPreference::Distribute,
            PadStyle::Episode,
        );

        // 36_000_001 whole pads of 1 ms over three items
        assert_eq!(items[0].pad, 12_000_001);
        assert_eq!(items[1].pad, 12_000_000);
        assert_eq!(items[2].pad, 12_000_000);
    }

    #[test]
    fn test_distribute_preserves_total() {
        let pad = 5 * MINUTE_MS;
        let mut items = vec![padded(7, 3), padded(12, 0), padded(1, 4), padded(9, 1)];
        let before: Millis = items.iter().map(PaddedProgram::total).sum();
        let slack = 47 * MINUTE_MS + 1_234;
        distribute_slack(&mut items, slack, pad, FlexPreference::Distribute, PadStyle::Episode);
        let after: Millis = items.iter().map(PaddedProgram::total).sum();
        assert_eq!(after - before, slack);
    }
}
