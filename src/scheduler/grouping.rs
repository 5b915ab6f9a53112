//! Program pool grouped by show
//!
//! Groupings are built once per scheduling run. Cursors are created on first
//! use and shared by every slot that targets the same show, so two slots
//! airing the same show continue each other's sequence.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::error::{SchedulerError, SchedulerResult};
use super::iterator::{OrderedShow, ShowIterator, ShuffledShow};
use super::slots::SlotOrder;
use crate::models::{ContentKey, Program, ShowId};

/// Candidate programs of one show plus its lazily built cursors
#[derive(Debug, Clone)]
pub struct ShowGrouping {
    id: ShowId,
    programs: Vec<Program>,
    seen: HashSet<ContentKey>,
    orderer: Option<OrderedShow>,
    shuffler: Option<ShuffledShow>,
}

impl ShowGrouping {
    fn new(id: ShowId) -> Self {
        Self {
            id,
            programs: Vec::new(),
            seen: HashSet::new(),
            orderer: None,
            shuffler: None,
        }
    }

    /// Add a program unless its content is already part of the show
    fn insert(&mut self, program: &Program) -> bool {
        if let Some(key) = program.content_key() {
            if !self.seen.insert(key.clone()) {
                return false;
            }
        }
        self.programs.push(program.clone());
        true
    }

    pub fn id(&self) -> &ShowId {
        &self.id
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    /// First program of the show found in the pool
    pub fn founder(&self) -> Option<&Program> {
        self.programs.first()
    }

    /// Cursor for the given order, building it on first use
    pub fn cursor(&mut self, order: SlotOrder, rng: &mut ChaCha8Rng) -> SchedulerResult<&mut dyn ShowIterator> {
        match order {
            SlotOrder::Next => {
                let orderer = match self.orderer.take() {
                    Some(orderer) => orderer,
                    None => OrderedShow::new(&self.id, &self.programs, self.founder())?,
                };
                Ok(self.orderer.insert(orderer))
            }
            SlotOrder::Shuffle => {
                let shuffler = match self.shuffler.take() {
                    Some(shuffler) => shuffler,
                    None => {
                        let seeded = ChaCha8Rng::seed_from_u64(rng.gen());
                        ShuffledShow::new(&self.id, &self.programs, seeded)?
                    }
                };
                Ok(self.shuffler.insert(shuffler))
            }
        }
    }
}

/// All show groupings of one scheduling run
#[derive(Debug, Clone, Default)]
pub struct ShowGroupings {
    shows: HashMap<ShowId, ShowGrouping>,
}

impl ShowGroupings {
    /// Group a program pool by show
    ///
    /// Programs without a positive duration are dropped, as are flex, filler
    /// and redirect entries, which never form a show.
    pub fn from_programs(programs: &[Program]) -> Self {
        let mut shows: HashMap<ShowId, ShowGrouping> = HashMap::new();
        let mut dropped = 0usize;
        let mut duplicates = 0usize;

        for program in programs {
            let Some(id) = program.show_id().filter(ShowId::is_grouping) else {
                continue;
            };

            if program.duration() <= 0 {
                warn!(
                    show = %id,
                    duration = program.duration(),
                    "Dropping program without a positive duration"
                );
                dropped += 1;
                continue;
            }

            let grouping = shows
                .entry(id.clone())
                .or_insert_with(|| ShowGrouping::new(id));
            if !grouping.insert(program) {
                duplicates += 1;
            }
        }

        debug!(
            shows = shows.len(),
            dropped,
            duplicates,
            "Grouped program pool"
        );

        Self { shows }
    }

    pub fn len(&self) -> usize {
        self.shows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }

    pub fn contains(&self, show: &ShowId) -> bool {
        self.shows.contains_key(show)
    }

    pub fn get(&self, show: &ShowId) -> Option<&ShowGrouping> {
        self.shows.get(show)
    }

    /// Cursor for a show
    ///
    /// A show missing from the pool behaves like an empty show.
    pub fn cursor(
        &mut self,
        show: &ShowId,
        order: SlotOrder,
        rng: &mut ChaCha8Rng,
    ) -> SchedulerResult<&mut dyn ShowIterator> {
        match self.shows.get_mut(show) {
            Some(grouping) => grouping.cursor(order, rng),
            None => Err(SchedulerError::empty_show(show)),
        }
    }
}
