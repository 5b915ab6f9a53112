//! Guide construction from resolved lineups

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::error::{GuideError, GuideResult};
use crate::models::{
    millis_to_datetime, ChannelLineup, ContentKind, CurrentPlaying, GuideEntry, Millis, SubTitle,
    HOUR_MS, MINUTE_MS,
};
use crate::resolver::LineupResolver;

/// Guide display rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuideSettings {
    /// Longest single flex entry shown
    pub max_flex_duration: Millis,

    /// Grid a flex run starting before the window is clipped to
    pub flex_alignment: Millis,
}

impl Default for GuideSettings {
    fn default() -> Self {
        Self {
            max_flex_duration: 6 * HOUR_MS,
            flex_alignment: 5 * MINUTE_MS,
        }
    }
}

/// Half-open time range `[start, end)` a guide covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideWindow {
    pub start: Millis,
    pub end: Millis,
}

impl GuideWindow {
    pub fn new(start: Millis, length: Millis) -> Self {
        Self {
            start,
            end: start.saturating_add(length),
        }
    }

    pub fn len(&self) -> Millis {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Guide entries of one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelGuide {
    pub number: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub programs: Vec<GuideEntry>,
}

/// A complete guide for every channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guide {
    /// Start of the covered window
    pub target: Millis,
    /// End of the covered window
    pub until: Millis,
    pub built_at: DateTime<Utc>,
    pub channels: BTreeMap<u32, ChannelGuide>,
}

impl Guide {
    pub fn channel(&self, number: u32) -> Option<&ChannelGuide> {
        self.channels.get(&number)
    }

    /// Whether this guide answers a request for `[target, limit)`
    pub fn satisfies(&self, target: Millis, limit: Millis) -> bool {
        self.target >= target && self.until >= limit
    }
}

/// Anything that can produce a guide for a window
///
/// Builds are CPU-bound and run on the blocking pool.
pub trait GuideSource: Send + Sync + 'static {
    fn build(&self, window: GuideWindow) -> GuideResult<Guide>;
}

// ============================================================================
// Builder
// ============================================================================

/// Walks every channel across a window and turns the result into entries
pub struct GuideBuilder {
    resolver: LineupResolver,
    settings: GuideSettings,
}

impl GuideBuilder {
    pub fn new(resolver: LineupResolver) -> Self {
        Self {
            resolver,
            settings: GuideSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: GuideSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn resolver(&self) -> &LineupResolver {
        &self.resolver
    }

    pub fn settings(&self) -> &GuideSettings {
        &self.settings
    }

    /// Build the guide of every channel
    ///
    /// Fails as a whole when any channel fails.
    pub fn build_guide(&self, window: GuideWindow) -> GuideResult<Guide> {
        if window.is_empty() {
            return Err(GuideError::EmptyWindow {
                start: window.start,
                end: window.end,
            });
        }

        let mut channels = BTreeMap::new();
        for number in self.resolver.channel_numbers() {
            channels.insert(number, self.build_channel(number, window)?);
        }

        debug!(
            channels = channels.len(),
            start = window.start,
            end = window.end,
            "Built guide"
        );

        Ok(Guide {
            target: window.start,
            until: window.end,
            built_at: Utc::now(),
            channels,
        })
    }

    /// Build the guide of one channel
    pub fn build_channel(&self, number: u32, window: GuideWindow) -> GuideResult<ChannelGuide> {
        let channel = self
            .resolver
            .channel(number)
            .ok_or(crate::resolver::ResolveError::UnknownChannel(number))?;

        let airings = self.walk(number, window)?;
        let programs = self.meld(channel, &airings, window)?;

        Ok(ChannelGuide {
            number,
            name: channel.name.clone(),
            icon: channel.icon.clone(),
            programs,
        })
    }

    /// Resolve consecutive airings until the window is covered
    fn walk(&self, number: u32, window: GuideWindow) -> GuideResult<Vec<CurrentPlaying>> {
        let mut airings: Vec<CurrentPlaying> = Vec::new();
        let mut at = window.start;

        while at < window.end {
            let playing = self.resolver.resolve(number, at, airings.last())?;
            if playing.end() <= at {
                return Err(GuideError::ZeroDuration { channel: number, at });
            }
            at = playing.end();
            airings.push(playing);
        }

        Ok(airings)
    }

    /// Turn airings into entries, melding runs of flex-equivalent items
    fn meld(
        &self,
        channel: &ChannelLineup,
        airings: &[CurrentPlaying],
        window: GuideWindow,
    ) -> GuideResult<Vec<GuideEntry>> {
        let mut entries = Vec::with_capacity(airings.len());
        let mut run: Option<(Millis, Millis)> = None;

        for playing in airings {
            if is_flex_equivalent(channel, playing) {
                run = match run {
                    Some((start, _)) => Some((start, playing.end())),
                    None => Some((playing.start, playing.end())),
                };
                continue;
            }

            if let Some((start, end)) = run.take() {
                self.push_flex_run(channel, start, end, window, &mut entries)?;
            }
            entries.push(content_entry(channel, playing)?);
        }

        if let Some((start, end)) = run {
            self.push_flex_run(channel, start, end, window, &mut entries)?;
        }

        Ok(entries)
    }

    fn push_flex_run(
        &self,
        channel: &ChannelLineup,
        start: Millis,
        end: Millis,
        window: GuideWindow,
        entries: &mut Vec<GuideEntry>,
    ) -> GuideResult<()> {
        let align = self.settings.flex_alignment.max(1);
        let start = if start < window.start {
            start.max(window.start - window.start.rem_euclid(align))
        } else {
            start
        };

        for (chunk_start, chunk_end) in split_run(start, end, self.settings.max_flex_duration) {
            entries.push(flex_entry(channel, chunk_start, chunk_end)?);
        }
        Ok(())
    }
}

impl GuideSource for GuideBuilder {
    fn build(&self, window: GuideWindow) -> GuideResult<Guide> {
        self.build_guide(window)
    }
}

// ============================================================================
// Entries
// ============================================================================

fn is_flex_equivalent(channel: &ChannelLineup, playing: &CurrentPlaying) -> bool {
    let program = &playing.program;
    program.is_flex() || program.duration() <= channel.guide_minimum_duration
}

/// Split `[start, end)` into near-equal chunks no longer than `cap`
pub fn split_run(start: Millis, end: Millis, cap: Millis) -> Vec<(Millis, Millis)> {
    let length = end - start;
    if length <= 0 {
        return Vec::new();
    }
    if cap <= 0 || length <= cap {
        return vec![(start, end)];
    }

    let chunks = (length + cap - 1) / cap;
    let base = length / chunks;
    let longer = length % chunks;

    let mut bounds = Vec::with_capacity(chunks as usize);
    let mut at = start;
    for i in 0..chunks {
        let size = if i < longer { base + 1 } else { base };
        bounds.push((at, at + size));
        at += size;
    }
    bounds
}

fn to_datetime(ms: Millis) -> GuideResult<DateTime<Utc>> {
    millis_to_datetime(ms).ok_or(GuideError::TimeOutOfRange(ms))
}

fn flex_entry(channel: &ChannelLineup, start: Millis, end: Millis) -> GuideResult<GuideEntry> {
    Ok(GuideEntry {
        start: to_datetime(start)?,
        stop: to_datetime(end)?,
        title: channel
            .guide_flex_title
            .clone()
            .unwrap_or_else(|| channel.name.clone()),
        sub_title: None,
        icon: channel.icon.clone(),
        summary: None,
        rating: None,
        flex: true,
    })
}

fn content_entry(channel: &ChannelLineup, playing: &CurrentPlaying) -> GuideResult<GuideEntry> {
    let Some(content) = playing.program.content() else {
        return flex_entry(channel, playing.start, playing.end());
    };

    let (title, sub_title) = match (&content.kind, &content.show_title) {
        (ContentKind::Episode, Some(show)) => (
            show.clone(),
            Some(SubTitle {
                season: content.season,
                episode: content.episode,
                title: content.title.clone(),
            }),
        ),
        _ => (content.title.clone(), None),
    };

    Ok(GuideEntry {
        start: to_datetime(playing.start)?,
        stop: to_datetime(playing.end())?,
        title,
        sub_title,
        icon: content.icon.clone().or_else(|| channel.icon.clone()),
        summary: content.summary.clone(),
        rating: content.rating.clone(),
        flex: false,
    })
}
