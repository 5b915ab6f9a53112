// Core data structures shared by the scheduler, resolver and guide builder

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Milliseconds, used for both durations and epoch timestamps
pub type Millis = i64;

pub const SECOND_MS: Millis = 1_000;
pub const MINUTE_MS: Millis = 60 * SECOND_MS;
pub const HOUR_MS: Millis = 60 * MINUTE_MS;
pub const DAY_MS: Millis = 24 * HOUR_MS;
pub const WEEK_MS: Millis = 7 * DAY_MS;

/// Convert epoch milliseconds to a UTC timestamp
pub fn millis_to_datetime(ms: Millis) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

// ============================================================================
// Content Identity
// ============================================================================

/// Normalized identity of a piece of media on a media server
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentKey {
    /// Media server the content lives on
    pub server_key: String,

    /// Server-side key of the content
    pub key: String,
}

impl ContentKey {
    pub fn new(server_key: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            server_key: server_key.into().trim().to_string(),
            key: key.into().trim().to_string(),
        }
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.server_key, self.key)
    }
}

/// Kind of media backing a content program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Movie,
    #[default]
    Episode,
    MusicVideo,
    Other,
}

/// A playable piece of media
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentProgram {
    pub key: ContentKey,
    pub duration: Millis,
    pub title: String,

    #[serde(default)]
    pub kind: ContentKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
}

impl ContentProgram {
    /// Create a movie
    pub fn movie(key: ContentKey, title: impl Into<String>, duration: Millis) -> Self {
        Self {
            key,
            duration,
            title: title.into(),
            kind: ContentKind::Movie,
            show_title: None,
            season: None,
            episode: None,
            icon: None,
            summary: None,
            rating: None,
        }
    }

    /// Create an episode of a show
    pub fn episode(
        key: ContentKey,
        show_title: impl Into<String>,
        season: u32,
        episode: u32,
        title: impl Into<String>,
        duration: Millis,
    ) -> Self {
        Self {
            key,
            duration,
            title: title.into(),
            kind: ContentKind::Episode,
            show_title: Some(show_title.into()),
            season: Some(season),
            episode: Some(episode),
            icon: None,
            summary: None,
            rating: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_rating(mut self, rating: impl Into<String>) -> Self {
        self.rating = Some(rating.into());
        self
    }

    /// Show this content belongs to
    ///
    /// Movies share a single grouping; everything else groups by show title,
    /// falling back to the content title.
    pub fn show_id(&self) -> ShowId {
        match self.kind {
            ContentKind::Movie => ShowId::Movie,
            _ => ShowId::Tv(self.show_title.clone().unwrap_or_else(|| self.title.clone())),
        }
    }
}

// ============================================================================
// Programs
// ============================================================================

/// Redirect to whatever another channel is airing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectProgram {
    pub channel: u32,
    pub duration: Millis,
}

/// Filler time with no content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlexProgram {
    pub duration: Millis,
}

/// Entry of a user-curated custom show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomProgram {
    pub custom_show_id: String,

    /// Position inside the custom show
    #[serde(default)]
    pub index: u32,

    pub duration: Millis,
    pub content: ContentProgram,
}

/// Entry pulled from a filler list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillerProgram {
    pub filler_list_id: String,
    pub duration: Millis,
    pub content: ContentProgram,
}

/// A single lineup item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Program {
    Content(ContentProgram),
    Redirect(RedirectProgram),
    Flex(FlexProgram),
    Custom(CustomProgram),
    Filler(FillerProgram),
}

impl Program {
    pub fn flex(duration: Millis) -> Self {
        Self::Flex(FlexProgram { duration })
    }

    pub fn redirect(channel: u32, duration: Millis) -> Self {
        Self::Redirect(RedirectProgram { channel, duration })
    }

    pub fn duration(&self) -> Millis {
        match self {
            Self::Content(c) => c.duration,
            Self::Redirect(r) => r.duration,
            Self::Flex(f) => f.duration,
            Self::Custom(c) => c.duration,
            Self::Filler(f) => f.duration,
        }
    }

    /// Copy of this program with its duration replaced
    pub fn with_duration(&self, duration: Millis) -> Self {
        let mut program = self.clone();
        match &mut program {
            Self::Content(c) => c.duration = duration,
            Self::Redirect(r) => r.duration = duration,
            Self::Flex(f) => f.duration = duration,
            Self::Custom(c) => c.duration = duration,
            Self::Filler(f) => f.duration = duration,
        }
        program
    }

    pub fn is_flex(&self) -> bool {
        matches!(self, Self::Flex(_))
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect(_))
    }

    /// Backing content, if any
    pub fn content(&self) -> Option<&ContentProgram> {
        match self {
            Self::Content(c) => Some(c),
            Self::Custom(c) => Some(&c.content),
            Self::Filler(f) => Some(&f.content),
            Self::Redirect(_) | Self::Flex(_) => None,
        }
    }

    pub fn content_key(&self) -> Option<&ContentKey> {
        self.content().map(|c| &c.key)
    }

    /// Grouping this program is scheduled under
    ///
    /// Flex and filler never form a show of their own.
    pub fn show_id(&self) -> Option<ShowId> {
        match self {
            Self::Content(c) => Some(c.show_id()),
            Self::Custom(c) => Some(ShowId::Custom(c.custom_show_id.clone())),
            Self::Redirect(r) => Some(ShowId::Redirect(r.channel)),
            Self::Flex(_) | Self::Filler(_) => None,
        }
    }

    /// Position of this program inside its show
    pub fn sort_index(&self) -> (u32, u32) {
        match self {
            Self::Content(c) => (c.season.unwrap_or(0), c.episode.unwrap_or(0)),
            Self::Custom(c) => (c.index, 0),
            _ => (0, 0),
        }
    }
}

// ============================================================================
// Show Identifiers
// ============================================================================

/// Error returned when a show identifier cannot be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid show id '{0}'. Expected flex., redirect.<channel>, movie., tv.<title> or custom.<id>")]
pub struct ParseShowIdError(pub String);

/// Grouping key a slot targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ShowId {
    /// `flex.`
    Flex,
    /// `redirect.<channel>`
    Redirect(u32),
    /// `movie.`
    Movie,
    /// `tv.<show title>`
    Tv(String),
    /// `custom.<custom show id>`
    Custom(String),
}

impl ShowId {
    /// Whether this id refers to programs drawn from the pool
    pub fn is_grouping(&self) -> bool {
        matches!(self, Self::Movie | Self::Tv(_) | Self::Custom(_))
    }
}

impl fmt::Display for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flex => write!(f, "flex."),
            Self::Redirect(channel) => write!(f, "redirect.{channel}"),
            Self::Movie => write!(f, "movie."),
            Self::Tv(title) => write!(f, "tv.{title}"),
            Self::Custom(id) => write!(f, "custom.{id}"),
        }
    }
}

impl FromStr for ShowId {
    type Err = ParseShowIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseShowIdError(s.to_string());

        if s == "flex." {
            return Ok(Self::Flex);
        }
        if s == "movie." {
            return Ok(Self::Movie);
        }
        if let Some(channel) = s.strip_prefix("redirect.") {
            return channel.parse().map(Self::Redirect).map_err(|_| invalid());
        }
        if let Some(title) = s.strip_prefix("tv.").filter(|t| !t.is_empty()) {
            return Ok(Self::Tv(title.to_string()));
        }
        if let Some(id) = s.strip_prefix("custom.").filter(|t| !t.is_empty()) {
            return Ok(Self::Custom(id.to_string()));
        }
        Err(invalid())
    }
}

impl TryFrom<String> for ShowId {
    type Error = ParseShowIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ShowId> for String {
    fn from(id: ShowId) -> Self {
        id.to_string()
    }
}

// ============================================================================
// Lineups
// ============================================================================

/// The repeating program sequence of one channel
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lineup {
    pub items: Vec<Program>,
    pub total_duration: Millis,
}

impl Lineup {
    pub fn new(items: Vec<Program>) -> Self {
        let total_duration = items.iter().map(Program::duration).sum();
        Self {
            items,
            total_duration,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Program> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Program> {
        self.items.iter()
    }

    /// Whether the recorded total matches the item durations
    pub fn is_consistent(&self) -> bool {
        self.items.iter().map(Program::duration).sum::<Millis>() == self.total_duration
    }
}

/// Output of a scheduling run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSchedule {
    /// Epoch the lineup starts repeating from
    pub start_time: Millis,
    pub lineup: Lineup,
}

/// A channel as seen by the resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelLineup {
    pub number: u32,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Epoch the lineup is anchored to
    pub start_time: Millis,

    pub lineup: Lineup,

    /// Programs at or below this length are shown as flex in the guide
    #[serde(default)]
    pub guide_minimum_duration: Millis,

    /// Title used for flex entries in the guide
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide_flex_title: Option<String>,
}

impl ChannelLineup {
    pub fn new(number: u32, name: impl Into<String>, start_time: Millis, lineup: Lineup) -> Self {
        Self {
            number,
            name: name.into(),
            icon: None,
            start_time,
            lineup,
            guide_minimum_duration: 0,
            guide_flex_title: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_guide_minimum_duration(mut self, duration: Millis) -> Self {
        self.guide_minimum_duration = duration;
        self
    }

    pub fn with_guide_flex_title(mut self, title: impl Into<String>) -> Self {
        self.guide_flex_title = Some(title.into());
        self
    }
}

/// What a channel is airing at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentPlaying {
    /// Lineup position, `None` for synthesized items
    pub index: Option<usize>,

    /// When the program started airing
    pub start: Millis,

    pub program: Program,
}

impl CurrentPlaying {
    pub fn end(&self) -> Millis {
        self.start + self.program.duration()
    }

    /// How far into the program `at` is
    pub fn elapsed_at(&self, at: Millis) -> Millis {
        (at - self.start).clamp(0, self.program.duration())
    }
}

// ============================================================================
// Guide Entries
// ============================================================================

/// Episode details shown below the title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTitle {
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub title: String,
}

/// One displayed block of an electronic program guide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideEntry {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_title: Option<SubTitle>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,

    /// Whether this entry stands for flex time
    #[serde(default)]
    pub flex: bool,
}

impl GuideEntry {
    pub fn duration_ms(&self) -> Millis {
        (self.stop - self.start).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(key: &str, season: u32, number: u32, minutes: i64) -> Program {
        Program::Content(ContentProgram::episode(
            ContentKey::new("plex", key),
            "Show",
            season,
            number,
            format!("Episode {number}"),
            minutes * MINUTE_MS,
        ))
    }

    #[test]
    fn test_show_id_parse() {
        assert_eq!("flex.".parse::<ShowId>().unwrap(), ShowId::Flex);
        assert_eq!("movie.".parse::<ShowId>().unwrap(), ShowId::Movie);
        assert_eq!("redirect.12".parse::<ShowId>().unwrap(), ShowId::Redirect(12));
        assert_eq!(
            "tv.The Office".parse::<ShowId>().unwrap(),
            ShowId::Tv("The Office".to_string())
        );
        assert_eq!(
            "custom.abc".parse::<ShowId>().unwrap(),
            ShowId::Custom("abc".to_string())
        );

        assert!("redirect.x".parse::<ShowId>().is_err());
        assert!("tv.".parse::<ShowId>().is_err());
        assert!("show".parse::<ShowId>().is_err());
    }

    #[test]
    fn test_show_id_display_matches_parse() {
        let id = ShowId::Tv("Cheers".to_string());
        assert_eq!(id.to_string().parse::<ShowId>().unwrap(), id);
    }

    #[test]
    fn test_program_show_grouping() {
        let movie = Program::Content(ContentProgram::movie(
            ContentKey::new("plex", "m1"),
            "Heat",
            170 * MINUTE_MS,
        ));
        assert_eq!(movie.show_id(), Some(ShowId::Movie));
        assert_eq!(
            episode("e1", 1, 1, 22).show_id(),
            Some(ShowId::Tv("Show".to_string()))
        );
        assert_eq!(Program::flex(1000).show_id(), None);
        assert_eq!(
            Program::redirect(4, 1000).show_id(),
            Some(ShowId::Redirect(4))
        );
    }

    #[test]
    fn test_with_duration() {
        let program = episode("e1", 1, 2, 22);
        let shorter = program.with_duration(5 * MINUTE_MS);
        assert_eq!(shorter.duration(), 5 * MINUTE_MS);
        assert_eq!(shorter.content_key(), program.content_key());
    }

    #[test]
    fn test_lineup_total() {
        let lineup = Lineup::new(vec![episode("a", 1, 1, 20), Program::flex(10 * MINUTE_MS)]);
        assert_eq!(lineup.total_duration, 30 * MINUTE_MS);
        assert!(lineup.is_consistent());

        let mut broken = lineup.clone();
        broken.total_duration += 1;
        assert!(!broken.is_consistent());
    }

    #[test]
    fn test_program_json_tagging() {
        let json = serde_json::to_string(&Program::redirect(7, 60_000)).unwrap();
        assert!(json.contains("\"type\":\"redirect\""));

        let parsed: Program =
            serde_json::from_str(r#"{"type":"flex","duration":30000}"#).unwrap();
        assert_eq!(parsed, Program::flex(30_000));
    }

    #[test]
    fn test_slot_show_id_deserializes_from_string() {
        let id: ShowId = serde_json::from_str("\"redirect.3\"").unwrap();
        assert_eq!(id, ShowId::Redirect(3));
        assert!(serde_json::from_str::<ShowId>("\"nope\"").is_err());
    }

    #[test]
    fn test_current_playing_bounds() {
        let playing = CurrentPlaying {
            index: Some(0),
            start: 1_000,
            program: Program::flex(500),
        };
        assert_eq!(playing.end(), 1_500);
        assert_eq!(playing.elapsed_at(1_200), 200);
        assert_eq!(playing.elapsed_at(9_999), 500);
    }
}
