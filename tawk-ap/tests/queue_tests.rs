//! Explicit queue operations: jump, remove and enqueue

mod helpers;

use helpers::*;
use std::time::Duration;
use tawk_ap::playback::EngineSettings;
use tawk_common::events::{PlayerEvent, QueueChangeTrigger};

async fn playing_with_queue(h: &Harness) {
    h.engine.play(source("a"), None).await.unwrap();
    let added = h
        .engine
        .enqueue(vec![source("b"), source("c")])
        .await
        .unwrap();
    assert_eq!(added, 2);
}

#[tokio::test(start_paused = true)]
async fn test_enqueue_appends_after_current() {
    let mut h = Harness::new(EngineSettings::default());
    playing_with_queue(&h).await;

    let snapshot = h.snapshot().await;
    assert_eq!(ids(&snapshot.queue), vec!["a", "b", "c"]);
    assert_eq!(snapshot.queue_index, 0);
    assert_eq!(Harness::current_id(&snapshot), Some("a"));

    assert!(h.drain_events().iter().any(|e| matches!(
        e,
        PlayerEvent::QueueChanged {
            trigger: QueueChangeTrigger::UserEnqueue,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_enqueue_drops_replies_when_excluded() {
    let h = Harness::new(EngineSettings::default());
    h.engine.play(source("a"), None).await.unwrap();
    h.engine.set_include_replies(false).await.unwrap();

    let added = h
        .engine
        .enqueue(vec![source("r").reply_to("a"), source("b")])
        .await
        .unwrap();

    assert_eq!(added, 1);
    assert_eq!(ids(&h.snapshot().await.queue), vec!["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn test_remove_refuses_current_item() {
    let h = Harness::new(EngineSettings::default());
    playing_with_queue(&h).await;

    assert!(!h.engine.remove_from_queue(0).await.unwrap());
    assert_eq!(ids(&h.snapshot().await.queue), vec!["a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_remove_out_of_range_is_noop() {
    let h = Harness::new(EngineSettings::default());
    playing_with_queue(&h).await;

    assert!(!h.engine.remove_from_queue(7).await.unwrap());
    assert_eq!(h.snapshot().await.queue.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_remove_after_current_keeps_index() {
    let h = Harness::new(EngineSettings::default());
    playing_with_queue(&h).await;

    assert!(h.engine.remove_from_queue(2).await.unwrap());

    let snapshot = h.snapshot().await;
    assert_eq!(ids(&snapshot.queue), vec!["a", "b"]);
    assert_eq!(snapshot.queue_index, 0);
    assert_eq!(Harness::current_id(&snapshot), Some("a"));
}

#[tokio::test(start_paused = true)]
async fn test_play_queue_item_jumps_without_intro() {
    let h = Harness::new(EngineSettings::default());
    h.engine.play(source("a"), None).await.unwrap();
    h.engine
        .enqueue(vec![source("b"), signed("c", "cat")])
        .await
        .unwrap();

    h.engine.play_queue_item(2).await.unwrap();

    let snapshot = h.snapshot().await;
    assert_eq!(Harness::current_id(&snapshot), Some("c"));
    assert_eq!(snapshot.queue_index, 2);
    assert!(snapshot.is_playing);
    assert_eq!(h.open_main_urls(), vec![audio_url("c")]);
    assert_eq!(h.started_count(&signature_url("cat")), 0);
}

#[tokio::test(start_paused = true)]
async fn test_remove_before_current_shifts_index() {
    let h = Harness::new(EngineSettings::default());
    playing_with_queue(&h).await;
    h.engine.play_queue_item(2).await.unwrap();

    assert!(h.engine.remove_from_queue(0).await.unwrap());

    let snapshot = h.snapshot().await;
    assert_eq!(ids(&snapshot.queue), vec!["b", "c"]);
    assert_eq!(snapshot.queue_index, 1);
    assert_eq!(Harness::current_id(&snapshot), Some("c"));
}

#[tokio::test(start_paused = true)]
async fn test_play_queue_item_out_of_range_is_noop() {
    let h = Harness::new(EngineSettings::default());
    playing_with_queue(&h).await;

    h.engine.play_queue_item(9).await.unwrap();

    let snapshot = h.snapshot().await;
    assert_eq!(Harness::current_id(&snapshot), Some("a"));
    assert!(snapshot.is_playing);
    assert_eq!(h.started_count(&audio_url("a")), 1);
}

#[tokio::test(start_paused = true)]
async fn test_new_parent_replaces_queue() {
    let h = Harness::new(EngineSettings::default());
    playing_with_queue(&h).await;

    h.engine.play(source("d"), None).await.unwrap();

    let snapshot = h.snapshot().await;
    assert_eq!(ids(&snapshot.queue), vec!["d"]);
    assert_eq!(snapshot.queue_index, 0);
}

#[tokio::test(start_paused = true)]
async fn test_replies_enqueued_during_intro_are_kept() {
    let h = Harness::new(EngineSettings::default());
    h.backend.set_duration(signature_url("pat"), 2.0);
    h.backend.set_duration(audio_url("p"), 1.0);

    let engine = h.engine.clone();
    let play = tokio::spawn(async move { engine.play(signed("p", "pat"), None).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let added = h
        .engine
        .enqueue(vec![source("r1").reply_to("p")])
        .await
        .unwrap();
    assert_eq!(added, 1);
    let snapshot = h.snapshot().await;
    assert_eq!(Harness::current_id(&snapshot), Some("p"));
    assert_eq!(ids(&snapshot.queue), vec!["p", "r1"]);

    play.await.unwrap().unwrap();
    let snapshot = h.snapshot().await;
    assert_eq!(ids(&snapshot.queue), vec!["p", "r1"]);
    assert_eq!(snapshot.queue_index, 0);
    assert!(snapshot.is_playing);
    assert_eq!(h.open_main_urls(), vec![audio_url("p")]);

    // The reply follows its parent
    assert!(
        h.wait_until(Duration::from_secs(10), |s| Harness::current_id(s) == Some("r1"))
            .await
    );
    assert_eq!(h.snapshot().await.queue_index, 1);
}
