mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{orchestrator, saved, wait_for, MockGenerator, MockStore};
use easel_canvas::{CanvasEvent, EntityId};

#[tokio::test(start_paused = true)]
async fn test_only_final_edit_regenerates() {
    let generator = Arc::new(MockGenerator::new());
    let orch = Arc::new(orchestrator(generator.clone(), Arc::new(MockStore::default())));
    let watcher = orch.spawn_prompt_watcher();
    let mut events = orch.subscribe();

    orch.mount().await;
    orch.update_prompt("a").await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    orch.update_prompt("a fox").await;

    let event = wait_for(&mut events, |e| {
        matches!(e, CanvasEvent::RegenerationCompleted { .. })
    })
    .await;
    assert!(matches!(
        event,
        CanvasEvent::RegenerationCompleted { ref entity_id, .. } if entity_id.as_str() == "gen-1"
    ));
    assert_eq!(generator.prompts(), vec!["a fox".to_string()]);

    watcher.abort();
}

#[tokio::test(start_paused = true)]
async fn test_selection_cancels_pending_edit() {
    let generator = Arc::new(MockGenerator::new());
    let orch = Arc::new(orchestrator(generator.clone(), Arc::new(MockStore::default())));
    let watcher = orch.spawn_prompt_watcher();

    orch.mount().await;
    orch.place_saved_image(saved("b", "boat")).await.unwrap();
    orch.select_entity(&EntityId::from("initial-placeholder"))
        .await
        .unwrap();

    orch.update_prompt("typed for the placeholder").await;
    orch.select_entity(&EntityId::from("b")).await.unwrap();
    assert_eq!(orch.debounced_prompt(), "boat");

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(generator.image_calls.load(Ordering::SeqCst), 0);
    assert_eq!(orch.snapshot().await.entities[1].prompt, "boat");

    watcher.abort();
}

#[tokio::test(start_paused = true)]
async fn test_watcher_stops_with_orchestrator() {
    let orch = Arc::new(orchestrator(
        Arc::new(MockGenerator::new()),
        Arc::new(MockStore::default()),
    ));
    let watcher = orch.spawn_prompt_watcher();

    drop(orch);
    tokio::time::timeout(Duration::from_secs(1), watcher)
        .await
        .expect("watcher should stop")
        .unwrap();
}
