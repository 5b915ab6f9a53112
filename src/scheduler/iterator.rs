//! Per-show program cursors
//!
//! A show is iterated either in episode order, starting from the first
//! program the pool listed for it, or in a shuffled order that reshuffles
//! each half of the permutation when it wraps around.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use super::error::{SchedulerError, SchedulerResult};
use crate::models::{Program, ShowId};

/// Cursor over the programs of one show
pub trait ShowIterator: Send {
    /// Program under the cursor
    fn current(&self) -> &Program;

    /// Move to the next program, wrapping at the end
    fn advance(&mut self);

    /// Number of programs in the cycle
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Ordered
// ============================================================================

/// Episode-order cursor
#[derive(Debug, Clone)]
pub struct OrderedShow {
    programs: Vec<Program>,
    position: usize,
}

impl OrderedShow {
    /// Build an ordered cursor
    ///
    /// Programs are stable-sorted by their in-show index. The cursor starts at
    /// `founder` when it is part of the show.
    pub fn new(show: &ShowId, programs: &[Program], founder: Option<&Program>) -> SchedulerResult<Self> {
        if programs.is_empty() {
            return Err(SchedulerError::empty_show(show));
        }

        let mut programs = programs.to_vec();
        programs.sort_by_key(Program::sort_index);

        let position = founder
            .and_then(Program::content_key)
            .and_then(|key| programs.iter().position(|p| p.content_key() == Some(key)))
            .unwrap_or(0);

        Ok(Self { programs, position })
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl ShowIterator for OrderedShow {
    fn current(&self) -> &Program {
        &self.programs[self.position]
    }

    fn advance(&mut self) {
        self.position = (self.position + 1) % self.programs.len();
    }

    fn len(&self) -> usize {
        self.programs.len()
    }
}

// ============================================================================
// Shuffled
// ============================================================================

/// Shuffled cursor
///
/// On wraparound the permutation is cut at its midpoint and each half is
/// reshuffled on its own, so programs that closed the previous cycle stay in
/// the back half of the next one.
#[derive(Debug, Clone)]
pub struct ShuffledShow {
    programs: Vec<Program>,
    order: Vec<usize>,
    position: usize,
    rng: ChaCha8Rng,
}

impl ShuffledShow {
    pub fn new(show: &ShowId, programs: &[Program], mut rng: ChaCha8Rng) -> SchedulerResult<Self> {
        if programs.is_empty() {
            return Err(SchedulerError::empty_show(show));
        }

        let mut order: Vec<usize> = (0..programs.len()).collect();
        order.shuffle(&mut rng);

        Ok(Self {
            programs: programs.to_vec(),
            order,
            position: 0,
            rng,
        })
    }

    fn reshuffle_halves(&mut self) {
        let mid = self.order.len() / 2;
        let (front, back) = self.order.split_at_mut(mid);
        front.shuffle(&mut self.rng);
        back.shuffle(&mut self.rng);
    }
}

impl ShowIterator for ShuffledShow {
    fn current(&self) -> &Program {
        &self.programs[self.order[self.position]]
    }

    fn advance(&mut self) {
        self.position += 1;
        if self.position == self.order.len() {
            self.position = 0;
            self.reshuffle_halves();
        }
    }

    fn len(&self) -> usize {
        self.programs.len()
    }
}
