//! Prefix sums over lineup durations

use super::error::{ResolveError, ResolveResult};
use crate::models::{Lineup, Millis};

/// Start offset of every lineup item
///
/// `offsets[0] == 0`, `offsets[i + 1] == offsets[i] + duration(items[i])` and
/// the last offset is the lineup's total duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulateTable {
    offsets: Vec<Millis>,
}

impl AccumulateTable {
    /// Build the table for one channel's lineup
    pub fn build(channel: u32, lineup: &Lineup) -> ResolveResult<Self> {
        if lineup.is_empty() {
            return Err(ResolveError::EmptyLineup { channel });
        }

        let mut offsets = Vec::with_capacity(lineup.len() + 1);
        let mut total: Millis = 0;
        offsets.push(total);
        for (index, program) in lineup.iter().enumerate() {
            let duration = program.duration();
            if duration < 0 {
                return Err(ResolveError::NegativeDuration {
                    channel,
                    index,
                    duration,
                });
            }
            total += duration;
            offsets.push(total);
        }

        if total == 0 {
            return Err(ResolveError::ZeroTotal { channel });
        }
        if total != lineup.total_duration {
            return Err(ResolveError::InconsistentTotal {
                channel,
                recorded: lineup.total_duration,
                actual: total,
            });
        }

        Ok(Self { offsets })
    }

    pub fn offsets(&self) -> &[Millis] {
        &self.offsets
    }

    /// Number of lineup items covered
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total(&self) -> Millis {
        self.offsets[self.offsets.len() - 1]
    }

    /// Offset at which item `index` starts
    pub fn start_of(&self, index: usize) -> Millis {
        self.offsets[index]
    }

    /// Index of the item playing at `offset` into the lineup
    ///
    /// `offset` must lie in `[0, total)`. Zero-length items are never
    /// returned.
    pub fn locate(&self, offset: Millis) -> usize {
        self.offsets.partition_point(|&start| start <= offset) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Program;
    use proptest::prelude::*;

    fn lineup(durations: &[Millis]) -> Lineup {
        Lineup::new(durations.iter().map(|&d| Program::flex(d)).collect())
    }

    #[test]
    fn test_build_offsets() {
        let table = AccumulateTable::build(1, &lineup(&[10, 20, 30])).unwrap();
        assert_eq!(table.offsets(), &[0, 10, 30, 60]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.total(), 60);
    }

    #[test]
    fn test_locate_boundaries() {
        let table = AccumulateTable::build(1, &lineup(&[10, 20, 30])).unwrap();
        assert_eq!(table.locate(0), 0);
        assert_eq!(table.locate(9), 0);
        assert_eq!(table.locate(10), 1);
        assert_eq!(table.locate(29), 1);
        assert_eq!(table.locate(30), 2);
        assert_eq!(table.locate(59), 2);
    }

    #[test]
    fn test_locate_skips_zero_length_items() {
        let table = AccumulateTable::build(1, &lineup(&[10, 0, 0, 5])).unwrap();
        assert_eq!(table.locate(10), 3);
        assert_eq!(table.locate(9), 0);
    }

    #[test]
    fn test_build_rejects_bad_lineups() {
        assert_eq!(
            AccumulateTable::build(3, &Lineup::default()),
            Err(ResolveError::EmptyLineup { channel: 3 })
        );
        assert_eq!(
            AccumulateTable::build(3, &lineup(&[0, 0])),
            Err(ResolveError::ZeroTotal { channel: 3 })
        );
        assert!(matches!(
            AccumulateTable::build(3, &lineup(&[5, -1])),
            Err(ResolveError::NegativeDuration { index: 1, .. })
        ));

        let mut inconsistent = lineup(&[5, 5]);
        inconsistent.total_duration = 11;
        assert!(matches!(
            AccumulateTable::build(3, &inconsistent),
            Err(ResolveError::InconsistentTotal { actual: 10, recorded: 11, .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_table_is_increasing_and_ends_at_total(durations in prop::collection::vec(1i64..100_000, 1..60)) {
            let lineup = lineup(&durations);
            let table = AccumulateTable::build(1, &lineup).unwrap();
            let offsets = table.offsets();

            prop_assert_eq!(offsets[0], 0);
            prop_assert!(offsets.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(table.total(), lineup.total_duration);
        }

        #[test]
        fn prop_locate_brackets_offset(
            durations in prop::collection::vec(0i64..10_000, 1..40),
            probe in any::<u64>(),
        ) {
            let total: Millis = durations.iter().sum();
            prop_assume!(total > 0);

            let table = AccumulateTable::build(1, &lineup(&durations)).unwrap();
            let offset = (probe % total as u64) as Millis;
            let i = table.locate(offset);

            prop_assert!(table.start_of(i) <= offset);
            prop_assert!(offset < table.start_of(i + 1));
        }
    }
}
