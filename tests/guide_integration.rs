//! Integration tests for guide building and refresh
//!
//! These tests verify the complete workflow of:
//! - Guide entries for generated and redirecting channels
//! - Flex melding and splitting
//! - Coalesced refreshes and retried failures

mod common;

use chrono::Utc;
use common::{channel, episode, movie};
use futures::future::join_all;
use slotcast::guide::{
    Guide, GuideBuilder, GuideError, GuideResult, GuideService, GuideSettings, GuideSource,
    GuideWindow,
};
use slotcast::models::{ChannelLineup, Millis, Program, HOUR_MS, MINUTE_MS};
use slotcast::resolver::LineupResolver;
use slotcast::utils::retry::RetryConfig;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source that counts builds and takes a while to finish each one
struct SlowSource {
    builds: AtomicU32,
    failures_left: AtomicU32,
    delay: Duration,
}

impl SlowSource {
    fn new(delay_ms: u64, failures: u32) -> Arc<Self> {
        Arc::new(Self {
            builds: AtomicU32::new(0),
            failures_left: AtomicU32::new(failures),
            delay: Duration::from_millis(delay_ms),
        })
    }

    fn builds(&self) -> u32 {
        self.builds.load(Ordering::SeqCst)
    }
}

impl GuideSource for SlowSource {
    fn build(&self, window: GuideWindow) -> GuideResult<Guide> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(GuideError::source_failed("media server unreachable"));
        }
        Ok(Guide {
            target: window.start,
            until: window.end,
            built_at: Utc::now(),
            channels: BTreeMap::new(),
        })
    }
}

fn builder(channels: Vec<ChannelLineup>) -> GuideBuilder {
    GuideBuilder::new(LineupResolver::new(channels)).with_settings(GuideSettings {
        max_flex_duration: 2 * HOUR_MS,
        flex_alignment: 5 * MINUTE_MS,
    })
}

fn durations(guide: &Guide, number: u32) -> Vec<Millis> {
    guide
        .channel(number)
        .unwrap()
        .programs
        .iter()
        .map(|entry| entry.duration_ms())
        .collect()
}

// ============================================================================
// Builder Tests
// ============================================================================

#[test]
fn test_long_flex_is_split_into_capped_entries() {
    let guide = builder(vec![channel(
        1,
        vec![movie("m1", 60), Program::flex(5 * HOUR_MS)],
    )])
    .build_guide(GuideWindow::new(0, 6 * HOUR_MS))
    .unwrap();

    let entries = &guide.channel(1).unwrap().programs;
    assert!(!entries[0].flex);
    assert_eq!(entries[0].title, "Movie m1");

    let flex: Vec<Millis> = entries.iter().filter(|e| e.flex).map(|e| e.duration_ms()).collect();
    assert_eq!(flex.len(), 3);
    assert!(flex.iter().all(|&d| d <= 2 * HOUR_MS));
    assert_eq!(flex.iter().sum::<Millis>(), 5 * HOUR_MS);
}

#[test]
fn test_redirects_and_short_items_meld_into_flex() {
    let guide = builder(vec![
        channel(
            1,
            vec![
                episode("News", "n1", 1, 30),
                Program::flex(10 * MINUTE_MS),
                Program::redirect(9, 20 * MINUTE_MS),
            ],
        ),
        channel(2, vec![movie("m1", 60)]),
    ])
    .build_guide(GuideWindow::new(0, HOUR_MS))
    .unwrap();

    // Flex and an unresolvable redirect make one 30 minute entry
    assert_eq!(durations(&guide, 1), vec![30 * MINUTE_MS, 30 * MINUTE_MS]);
    assert_eq!(durations(&guide, 2), vec![HOUR_MS]);
}

#[test]
fn test_redirect_shows_target_programs() {
    let guide = builder(vec![
        channel(1, vec![Program::redirect(2, HOUR_MS)]),
        channel(2, vec![movie("a", 20), movie("b", 40)]),
    ])
    .build_guide(GuideWindow::new(0, HOUR_MS))
    .unwrap();

    let titles: Vec<&str> = guide
        .channel(1)
        .unwrap()
        .programs
        .iter()
        .map(|e| e.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Movie a", "Movie b"]);
    assert_eq!(durations(&guide, 1), durations(&guide, 2));
}

#[test]
fn test_guide_serializes_with_iso_times() {
    let guide = builder(vec![channel(1, vec![movie("m1", 60)])])
        .build_guide(GuideWindow::new(0, HOUR_MS))
        .unwrap();

    let json = serde_json::to_value(&guide).unwrap();
    let entry = &json["channels"]["1"]["programs"][0];
    assert_eq!(entry["start"], "1970-01-01T00:00:00Z");
    assert_eq!(entry["stop"], "1970-01-01T01:00:00Z");
}

// ============================================================================
// Service Tests
// ============================================================================

#[tokio::test]
async fn test_concurrent_refreshes_share_one_build() {
    let service = GuideService::new(RetryConfig::with_delays(5, 20));
    let source = SlowSource::new(50, 0);

    let requests = (0..8).map(|_| service.request_refresh(source.clone(), 0, HOUR_MS));
    let guides = join_all(requests).await;

    assert_eq!(source.builds(), 1);
    let first = guides[0].as_ref().unwrap();
    for guide in &guides {
        assert!(Arc::ptr_eq(first, guide.as_ref().unwrap()));
    }
}

#[tokio::test]
async fn test_wider_request_during_build_is_covered() {
    let service = GuideService::new(RetryConfig::with_delays(5, 20));
    let source = SlowSource::new(30, 0);

    let (narrow, wide) = tokio::join!(
        service.request_refresh(source.clone(), 0, HOUR_MS),
        service.request_refresh(source.clone(), 0, 4 * HOUR_MS),
    );

    assert!(narrow.unwrap().satisfies(0, HOUR_MS));
    assert!(wide.unwrap().satisfies(0, 4 * HOUR_MS));
    assert!(source.builds() <= 2);
}

#[tokio::test]
async fn test_failures_are_retried_until_success() {
    let service = GuideService::new(RetryConfig::with_delays(5, 20));
    let source = SlowSource::new(1, 4);
    let mut updates = service.subscribe();

    let guide = service.request_refresh(source.clone(), 0, HOUR_MS).await.unwrap();

    assert_eq!(source.builds(), 5);
    assert_eq!(guide.until, HOUR_MS);
    assert!(updates.has_changed().unwrap());
    assert!(updates.borrow_and_update().is_some());

    let status = service.status().await;
    assert_eq!(status.failures, 0);
    assert_eq!(status.builds, 1);
    assert_eq!(
        status.cached_window,
        Some(GuideWindow {
            start: 0,
            end: HOUR_MS
        })
    );
}

#[tokio::test]
async fn test_service_with_guide_builder() {
    let service = GuideService::default();
    let source = Arc::new(builder(vec![
        channel(1, vec![movie("m1", 45), Program::flex(15 * MINUTE_MS)]),
        channel(2, vec![Program::redirect(1, HOUR_MS)]),
    ]));

    let guide = service.request_refresh(source, 0, 3 * HOUR_MS).await.unwrap();

    assert_eq!(guide.channels.len(), 2);
    assert_eq!(durations(&guide, 1), durations(&guide, 2));
    assert_eq!(guide.channel(1).unwrap().programs.len(), 6);
}

#[tokio::test]
async fn test_cached_guide_is_served_while_refresh_keeps_failing() {
    let service = GuideService::new(RetryConfig::with_delays(50, 200));
    let healthy = SlowSource::new(1, 0);
    let first = service.request_refresh(healthy.clone(), 0, HOUR_MS).await.unwrap();

    let flaky = SlowSource::new(1, 3);
    let waiter = tokio::spawn({
        let service = service.clone();
        let flaky = flaky.clone();
        async move { service.request_refresh(flaky, 0, 4 * HOUR_MS).await }
    });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while flaky.builds() < 2 {
        assert!(tokio::time::Instant::now() < deadline, "refresh never retried");
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    // Retries are running and the old guide is still published
    assert!(Arc::ptr_eq(&service.current().unwrap(), &first));
    let status = service.status().await;
    assert!(status.building);
    assert!(status.failures >= 1);
    assert_eq!(
        status.cached_window,
        Some(GuideWindow {
            start: 0,
            end: HOUR_MS
        })
    );

    // Narrower requests are still answered from the cache
    let cached = service
        .request_refresh(healthy.clone(), 0, 30 * MINUTE_MS)
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&cached, &first));
    assert_eq!(healthy.builds(), 1);

    let wide = waiter.await.unwrap().unwrap();
    assert_eq!(flaky.builds(), 4);
    assert!(wide.satisfies(0, 4 * HOUR_MS));
    assert!(Arc::ptr_eq(&service.current().unwrap(), &wide));
}
