//! Channel lineup resolution

use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::accumulate::AccumulateTable;
use super::error::{ResolveError, ResolveResult};
use crate::models::{ChannelLineup, CurrentPlaying, Lineup, Millis, Program, HOUR_MS};

/// Resolver settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Length of the flex answered for a channel whose lineup is unusable
    pub fallback_duration: Millis,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            fallback_duration: HOUR_MS,
        }
    }
}

/// Find the item of a single lineup airing at `at`
///
/// Redirects are returned as is. `hint` is the previous answer for the same
/// lineup; when `at` is exactly where it ends the next item is returned
/// without a search.
pub fn resolve_in_lineup(
    lineup: &Lineup,
    table: &AccumulateTable,
    start_time: Millis,
    at: Millis,
    hint: Option<&CurrentPlaying>,
) -> CurrentPlaying {
    if let Some(next) = hint.and_then(|hint| next_after_hint(lineup, hint, at)) {
        return next;
    }

    if at < start_time {
        return CurrentPlaying {
            index: None,
            start: at,
            program: Program::flex(start_time - at),
        };
    }

    let offset = (at - start_time).rem_euclid(table.total());
    let index = table.locate(offset);
    CurrentPlaying {
        index: Some(index),
        start: at - (offset - table.start_of(index)),
        program: lineup.items[index].clone(),
    }
}

fn next_after_hint(lineup: &Lineup, hint: &CurrentPlaying, at: Millis) -> Option<CurrentPlaying> {
    let index = hint.index?;
    let hinted = lineup.get(index)?;
    if hint.end() != at || hinted.duration() != hint.program.duration() {
        return None;
    }

    let mut next = index;
    for _ in 0..lineup.len() {
        next = (next + 1) % lineup.len();
        let program = &lineup.items[next];
        if program.duration() > 0 {
            return Some(CurrentPlaying {
                index: Some(next),
                start: at,
                program: program.clone(),
            });
        }
    }
    None
}

struct ResolvedChannel {
    channel: ChannelLineup,
    table: ResolveResult<AccumulateTable>,
}

/// Answers what every channel airs at a point in time
///
/// Channel lineups are immutable once loaded; one accumulate table is kept
/// per channel for the resolver's lifetime.
pub struct LineupResolver {
    channels: BTreeMap<u32, ResolvedChannel>,
    settings: ResolverSettings,
}

impl LineupResolver {
    pub fn new(channels: Vec<ChannelLineup>) -> Self {
        Self::with_settings(channels, ResolverSettings::default())
    }

    pub fn with_settings(channels: Vec<ChannelLineup>, settings: ResolverSettings) -> Self {
        let channels = channels
            .into_iter()
            .map(|channel| {
                let table = AccumulateTable::build(channel.number, &channel.lineup);
                if let Err(e) = &table {
                    warn!(
                        channel = channel.number,
                        error = %e,
                        "Lineup cannot be resolved, channel will air flex"
                    );
                }
                (channel.number, ResolvedChannel { channel, table })
            })
            .collect();

        Self { channels, settings }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn channel(&self, number: u32) -> Option<&ChannelLineup> {
        self.channels.get(&number).map(|c| &c.channel)
    }

    /// Channel numbers in ascending order
    pub fn channel_numbers(&self) -> Vec<u32> {
        self.channels.keys().copied().collect()
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelLineup> {
        self.channels.values().map(|c| &c.channel)
    }

    /// Accumulate table of a channel, or why it could not be built
    pub fn table(&self, number: u32) -> ResolveResult<&AccumulateTable> {
        let resolved = self
            .channels
            .get(&number)
            .ok_or(ResolveError::UnknownChannel(number))?;
        resolved.table.as_ref().map_err(|e| e.clone())
    }

    /// What `number` is airing at `at`
    pub fn current_playing(&self, number: u32, at: Millis) -> ResolveResult<CurrentPlaying> {
        self.resolve(number, at, None)
    }

    /// What `number` is airing at `at`, following redirects
    ///
    /// Pass the previous answer for the same channel as `hint` when walking
    /// forward in time.
    pub fn resolve(
        &self,
        number: u32,
        at: Millis,
        hint: Option<&CurrentPlaying>,
    ) -> ResolveResult<CurrentPlaying> {
        if !self.channels.contains_key(&number) {
            return Err(ResolveError::UnknownChannel(number));
        }
        let mut path = vec![number];
        Ok(self.resolve_on_path(number, at, hint, &mut path))
    }

    fn resolve_on_path(
        &self,
        number: u32,
        at: Millis,
        hint: Option<&CurrentPlaying>,
        path: &mut Vec<u32>,
    ) -> CurrentPlaying {
        let Some(resolved) = self.channels.get(&number) else {
            return self.fallback(at);
        };
        let table = match &resolved.table {
            Ok(table) => table,
            Err(e) => {
                debug!(channel = number, error = %e, "Answering fallback flex");
                return self.fallback(at);
            }
        };

        let playing = resolve_in_lineup(
            &resolved.channel.lineup,
            table,
            resolved.channel.start_time,
            at,
            hint,
        );

        let target = match &playing.program {
            Program::Redirect(redirect) => Some(redirect.channel),
            _ => None,
        };
        match target {
            Some(target) => self.follow_redirect(number, target, playing, at, path),
            None => playing,
        }
    }

    fn follow_redirect(
        &self,
        number: u32,
        target: u32,
        playing: CurrentPlaying,
        at: Millis,
        path: &mut Vec<u32>,
    ) -> CurrentPlaying {
        if path.contains(&target) {
            warn!(
                channel = number,
                target,
                path = ?path,
                "Redirect cycle, airing flex instead"
            );
            return flex_over(playing);
        }
        if !self.channels.contains_key(&target) {
            warn!(
                channel = number,
                target,
                "Redirect to unknown channel, airing flex instead"
            );
            return flex_over(playing);
        }

        path.push(target);
        let other = self.resolve_on_path(target, at, None, path);
        path.pop();

        let start = playing.start.max(other.start);
        let end = playing.end().min(other.end());
        CurrentPlaying {
            index: None,
            start,
            program: other.program.with_duration(end - start),
        }
    }

    fn fallback(&self, at: Millis) -> CurrentPlaying {
        CurrentPlaying {
            index: None,
            start: at,
            program: Program::flex(self.settings.fallback_duration),
        }
    }
}

/// Replace a redirect with flex over the same window
fn flex_over(playing: CurrentPlaying) -> CurrentPlaying {
    CurrentPlaying {
        index: playing.index,
        start: playing.start,
        program: Program::flex(playing.program.duration()),
    }
}
