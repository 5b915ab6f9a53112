//! Common test utilities

use slotcast::models::{
    ChannelLineup, ContentKey, ContentProgram, Lineup, Millis, Program, ShowId, MINUTE_MS,
};

/// Create a movie lasting `minutes`
pub fn movie(key: &str, minutes: i64) -> Program {
    Program::Content(ContentProgram::movie(
        ContentKey::new("plex", key),
        format!("Movie {key}"),
        minutes * MINUTE_MS,
    ))
}

/// Create an episode of `show` lasting `minutes`
pub fn episode(show: &str, key: &str, number: u32, minutes: i64) -> Program {
    Program::Content(ContentProgram::episode(
        ContentKey::new("plex", key),
        show,
        1,
        number,
        format!("{show} #{number}"),
        minutes * MINUTE_MS,
    ))
}

/// Grouping id of a TV show
#[allow(dead_code)]
pub fn tv(show: &str) -> ShowId {
    ShowId::Tv(show.to_string())
}

/// Channel anchored at the epoch
#[allow(dead_code)]
pub fn channel(number: u32, items: Vec<Program>) -> ChannelLineup {
    ChannelLineup::new(number, format!("Channel {number}"), 0, Lineup::new(items))
}

/// Start offsets of every lineup item
#[allow(dead_code)]
pub fn start_offsets(lineup: &Lineup) -> Vec<Millis> {
    lineup
        .iter()
        .scan(0, |at, program| {
            let start = *at;
            *at += program.duration();
            Some(start)
        })
        .collect()
}
