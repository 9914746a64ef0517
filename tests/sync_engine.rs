// Sync engine tests — the engine against a scripted Slack API and an
// in-memory SQLite store.
//
// Timing tests run on tokio's paused clock, so the 1.2s throttle delay and
// the 5 minute cooldown cost nothing in wall time.

#![cfg(feature = "sqlite")]

mod common;

use std::time::Duration;

use common::{msg, reacted, ts, FakeSlack, Injected};
use slack_bestof::config::Channel;
use slack_bestof::db::{open_sqlite_in_memory, Database};
use slack_bestof::pipeline::sync::{SyncEngine, BEGINNING_OF_TIME};
use slack_bestof::slack::throttle::{Throttle, THROTTLE_DELAY};

fn channel(id: &str, name: &str) -> Channel {
    Channel {
        id: id.to_string(),
        name: name.to_string(),
    }
}

fn five_messages() -> Vec<slack_bestof::slack::types::SlackMessage> {
    (1..=5).map(|n| msg(&ts(n), "alice")).collect()
}

// ============================================================
// Paging and resumption
// ============================================================

#[tokio::test(start_paused = true)]
async fn first_sync_pages_through_all_history() {
    let slack = FakeSlack::new("acme");
    slack.set_history("C1", five_messages());
    let db = open_sqlite_in_memory().unwrap();

    let mut engine = SyncEngine::new(&slack, db.as_ref(), 2);
    let stats = engine.run(&[channel("C1", "general")]).await.unwrap();

    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].pages, 3);
    assert_eq!(stats[0].fetched, 5);
    assert_eq!(stats[0].inserted, 5);
    assert_eq!(stats[0].resumed_from, None);
    assert_eq!(db.message_count().await.unwrap(), 5);

    let requests = slack.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.oldest == BEGINNING_OF_TIME));
    assert!(requests.iter().all(|r| r.limit == 2));
    // Each page is bounded by the oldest message of the page before it
    assert_eq!(requests[0].latest, None);
    assert_eq!(requests[1].latest, Some(ts(4)));
    assert_eq!(requests[2].latest, Some(ts(2)));
}

#[tokio::test(start_paused = true)]
async fn resync_without_new_messages_changes_nothing() {
    let slack = FakeSlack::new("acme");
    let mut history = five_messages();
    history.push(reacted(&ts(5), "bob", &[("tada", &["alice"])]));
    history.remove(4);
    slack.set_history("C1", history);
    let db = open_sqlite_in_memory().unwrap();
    let channels = [channel("C1", "general")];

    SyncEngine::new(&slack, db.as_ref(), 100)
        .run(&channels)
        .await
        .unwrap();
    let before = db.messages_with_reactions(&["C1".to_string()]).await.unwrap();
    slack.clear_requests();

    let stats = SyncEngine::new(&slack, db.as_ref(), 100)
        .run(&channels)
        .await
        .unwrap();

    assert_eq!(stats[0].inserted, 0);
    assert_eq!(stats[0].resumed_from, Some(ts(5)));
    assert_eq!(db.message_count().await.unwrap(), 5);
    assert_eq!(before.len(), 1);
    assert_eq!(
        db.messages_with_reactions(&["C1".to_string()]).await.unwrap(),
        before
    );
    assert_eq!(slack.requests()[0].oldest, ts(5));
}

#[tokio::test(start_paused = true)]
async fn resync_fetches_only_newer_messages() {
    let slack = FakeSlack::new("acme");
    slack.set_history("C1", five_messages());
    let db = open_sqlite_in_memory().unwrap();
    let channels = [channel("C1", "general")];

    SyncEngine::new(&slack, db.as_ref(), 100)
        .run(&channels)
        .await
        .unwrap();

    slack.post("C1", vec![msg(&ts(6), "bob"), msg(&ts(7), "carol")]);
    slack.clear_requests();

    let stats = SyncEngine::new(&slack, db.as_ref(), 100)
        .run(&channels)
        .await
        .unwrap();

    assert_eq!(slack.requests()[0].oldest, ts(5));
    assert_eq!(stats[0].fetched, 2);
    assert_eq!(stats[0].inserted, 2);
    assert_eq!(stats[0].duplicates, 0);
    assert_eq!(db.message_count().await.unwrap(), 7);
    assert_eq!(db.latest_message_ts("C1").await.unwrap(), Some(ts(7)));
}

#[tokio::test(start_paused = true)]
async fn channels_sync_in_config_order() {
    let slack = FakeSlack::new("acme");
    slack.set_history("C2", vec![msg(&ts(1), "alice")]);
    slack.set_history("C1", vec![msg(&ts(2), "bob")]);
    let db = open_sqlite_in_memory().unwrap();

    let stats = SyncEngine::new(&slack, db.as_ref(), 100)
        .run(&[channel("C2", "random"), channel("C1", "general")])
        .await
        .unwrap();

    let order: Vec<String> = slack.requests().into_iter().map(|r| r.channel).collect();
    assert_eq!(order, vec!["C2", "C1"]);
    assert_eq!(stats[0].channel_name, "random");
    assert_eq!(stats[1].channel_name, "general");
    assert_eq!(db.latest_message_ts("C1").await.unwrap(), Some(ts(2)));
    assert_eq!(db.latest_message_ts("C2").await.unwrap(), Some(ts(1)));
}

#[tokio::test(start_paused = true)]
async fn empty_channel_is_one_empty_page() {
    let slack = FakeSlack::new("acme");
    slack.set_history("C1", Vec::new());
    let db = open_sqlite_in_memory().unwrap();

    let stats = SyncEngine::new(&slack, db.as_ref(), 100)
        .run(&[channel("C1", "quiet")])
        .await
        .unwrap();

    assert_eq!(stats[0].pages, 1);
    assert_eq!(stats[0].fetched, 0);
    assert_eq!(db.message_count().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn stored_documents_keep_reactions() {
    let slack = FakeSlack::new("acme");
    slack.set_history(
        "C1",
        vec![
            msg(&ts(1), "alice"),
            reacted(&ts(2), "bob", &[("+1", &["alice", "carol"])]),
        ],
    );
    let db = open_sqlite_in_memory().unwrap();

    SyncEngine::new(&slack, db.as_ref(), 100)
        .run(&[channel("C1", "general")])
        .await
        .unwrap();

    let stored = db.messages_with_reactions(&["C1".to_string()]).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].ts(), ts(2));
    assert_eq!(stored[0].channel_name, "general");
    assert_eq!(stored[0].reacting_users().len(), 2);
}

// ============================================================
// Rate limiting
// ============================================================

#[tokio::test(start_paused = true)]
async fn rate_limited_page_is_retried_until_it_succeeds() {
    let slack = FakeSlack::new("acme");
    slack.set_history("C1", five_messages());
    slack.fail_next([Injected::RateLimited, Injected::RateLimited]);
    let db = open_sqlite_in_memory().unwrap();

    let mut engine = SyncEngine::new(&slack, db.as_ref(), 2);
    let stats = engine.run(&[channel("C1", "general")]).await.unwrap();

    assert_eq!(stats[0].rejections, 2);
    assert_eq!(stats[0].inserted, 5);
    assert_eq!(engine.throttle().rejections(), 2);
    assert!(engine.throttle().is_throttled());

    let requests = slack.requests();
    // Two rejected attempts, then the same first page again
    assert_eq!(requests.len(), 5);
    assert_eq!(requests[0], requests[1]);
    assert_eq!(requests[1], requests[2]);

    // Every call after the first rejection waited out the delay
    let times = slack.request_times();
    for pair in times[1..].windows(2) {
        assert!(pair[1] - pair[0] >= THROTTLE_DELAY);
    }
    assert!(times[1] - times[0] >= THROTTLE_DELAY);
}

#[tokio::test(start_paused = true)]
async fn unthrottled_calls_do_not_wait() {
    let slack = FakeSlack::new("acme");
    slack.set_history("C1", five_messages());
    let db = open_sqlite_in_memory().unwrap();

    SyncEngine::new(&slack, db.as_ref(), 1)
        .run(&[channel("C1", "general")])
        .await
        .unwrap();

    let times = slack.request_times();
    assert_eq!(times.len(), 5);
    assert_eq!(times[4] - times[0], Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn throttle_lifts_after_cooldown() {
    let slack = FakeSlack::new("acme");
    slack.set_history("C1", vec![msg(&ts(1), "alice")]);
    slack.fail_next([Injected::RateLimited]);
    let db = open_sqlite_in_memory().unwrap();
    let channels = [channel("C1", "general")];

    let mut engine = SyncEngine::new(&slack, db.as_ref(), 100);
    engine.run(&channels).await.unwrap();
    assert!(engine.throttle().is_throttled());

    tokio::time::sleep(Duration::from_secs(301)).await;
    slack.post("C1", vec![msg(&ts(2), "bob"), msg(&ts(3), "bob")]);
    slack.clear_requests();

    let started = tokio::time::Instant::now();
    engine.run(&channels).await.unwrap();

    assert!(!engine.throttle().is_throttled());
    assert_eq!(slack.request_times()[0], started);
    assert_eq!(db.message_count().await.unwrap(), 3);
}

#[tokio::test(start_paused = true)]
async fn other_api_errors_are_fatal() {
    let slack = FakeSlack::new("acme");
    slack.set_history("C1", five_messages());
    slack.fail_next([Injected::Api("not_in_channel")]);
    let db = open_sqlite_in_memory().unwrap();

    let err = SyncEngine::new(&slack, db.as_ref(), 100)
        .run(&[channel("C1", "general")])
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("not_in_channel"));
    assert_eq!(slack.requests().len(), 1);
    assert_eq!(db.message_count().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn fatal_error_stops_before_later_channels() {
    let slack = FakeSlack::new("acme");
    slack.set_history("C2", vec![msg(&ts(1), "alice")]);
    let db = open_sqlite_in_memory().unwrap();

    // C1 has no history configured, so the fake answers channel_not_found
    let result = SyncEngine::new(&slack, db.as_ref(), 100)
        .run(&[channel("C1", "missing"), channel("C2", "random")])
        .await;

    assert!(result.is_err());
    assert!(slack.requests().iter().all(|r| r.channel == "C1"));
    assert_eq!(db.message_count().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn throttle_carries_over_to_the_next_channel() {
    let slack = FakeSlack::new("acme");
    slack.set_history("C1", vec![msg(&ts(1), "alice")]);
    slack.set_history("C2", vec![msg(&ts(2), "bob")]);
    slack.fail_next([Injected::RateLimited]);
    let db = open_sqlite_in_memory().unwrap();

    let delay = Duration::from_millis(250);
    let mut engine = SyncEngine::new(&slack, db.as_ref(), 100)
        .with_throttle(Throttle::new(delay, Duration::from_secs(60)));
    let stats = engine
        .run(&[channel("C1", "general"), channel("C2", "random")])
        .await
        .unwrap();

    assert_eq!(stats[0].rejections, 1);
    assert_eq!(stats[1].rejections, 0);
    assert_eq!(engine.throttle().delay(), delay);

    // C1: rejected, then retried. C2's first call is still paced.
    let requests = slack.requests();
    let times = slack.request_times();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].channel, "C1");
    assert_eq!(requests[2].channel, "C2");
    assert!(times[2] - times[1] >= delay);
}

#[tokio::test(start_paused = true)]
async fn team_lookup_waits_out_rate_limits() {
    let slack = FakeSlack::new("acme");
    slack.fail_next([Injected::RateLimited, Injected::RateLimited]);
    let db = open_sqlite_in_memory().unwrap();

    let mut engine = SyncEngine::new(&slack, db.as_ref(), 100);
    let started = tokio::time::Instant::now();
    let domain = engine.team_domain().await.unwrap();

    assert_eq!(domain, "acme");
    assert_eq!(slack.team_calls(), 3);
    assert_eq!(engine.throttle().rejections(), 2);
    assert!(started.elapsed() >= THROTTLE_DELAY * 2);
}

#[tokio::test(start_paused = true)]
async fn team_lookup_other_errors_are_fatal() {
    let slack = FakeSlack::new("acme");
    slack.fail_next([Injected::Api("invalid_auth")]);
    let db = open_sqlite_in_memory().unwrap();

    let err = SyncEngine::new(&slack, db.as_ref(), 100)
        .team_domain()
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("invalid_auth"));
    assert_eq!(slack.team_calls(), 1);
}
