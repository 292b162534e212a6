//! End-to-end pipeline tests: normalize → persist → evaluate → publish →
//! broadcast

use std::time::Duration;

use pretty_assertions::assert_eq;

use aquaguard::evaluator::AlertLevel;

use crate::helpers::*;

const TOPIC: &str = "tanks/tank1/sensor";

#[tokio::test]
async fn in_range_reading_is_persisted_and_broadcast_without_alert() {
    let pipeline = build_pipeline(Duration::from_secs(60));
    let (_id, mut feed) = pipeline.broadcaster.subscribe().await;

    pipeline
        .coordinator
        .process(TOPIC, &sensor_payload("temperature", 25.0))
        .await;

    assert_eq!(pipeline.publisher.len(), 0);

    let frame = feed.recv().await.unwrap();
    assert!(frame.contains(r#""type":"sensor:update""#));
    assert!(frame.contains(r#""tankId":"tank1""#));
    assert!(frame.contains(r#""temperature":25.0"#));

    // persistence is asynchronous; give the writer a moment
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pipeline.memory.len(), 1);
    assert_eq!(pipeline.memory.points()[0].tank_id, "tank1");
}

#[tokio::test]
async fn violating_reading_reaches_every_output() {
    let pipeline = build_pipeline(Duration::from_secs(60));
    let (_id, mut feed) = pipeline.broadcaster.subscribe().await;

    pipeline
        .coordinator
        .process(TOPIC, &sensor_payload("temperature", 35.0))
        .await;

    let alerts = pipeline.publisher.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].level, AlertLevel::High);
    assert_eq!(alerts[0].value, 35.0);
    assert_eq!(alerts[0].tank_id, "tank1");

    // alert frame first, then the reading itself
    let alert_frame = feed.recv().await.unwrap();
    assert!(alert_frame.contains(r#""type":"alert""#));
    assert!(alert_frame.contains(r#""level":"HIGH""#));

    let reading_frame = feed.recv().await.unwrap();
    assert!(reading_frame.contains(r#""type":"sensor:update""#));
}

#[tokio::test]
async fn alert_body_carries_the_wire_shape() {
    let pipeline = build_pipeline(Duration::from_secs(60));

    pipeline
        .coordinator
        .process(TOPIC, &sensor_payload("ph", 6.0))
        .await;

    let alerts = pipeline.publisher.alerts();
    let body = serde_json::to_value(&alerts[0]).unwrap();

    assert_eq!(body["tankId"], "tank1");
    assert_eq!(body["metric"], "ph");
    assert_eq!(body["level"], "LOW");
    assert_eq!(body["value"], 6.0);
    assert!(body["id"].as_str().unwrap().starts_with("tank1:ph:LOW:"));
    assert!(body["ts"].is_string());
}

#[tokio::test]
async fn repeat_violation_is_debounced_across_messages() {
    let pipeline = build_pipeline(Duration::from_secs(60));

    pipeline
        .coordinator
        .process(TOPIC, &sensor_payload("temperature", 35.0))
        .await;
    pipeline
        .coordinator
        .process(TOPIC, &sensor_payload("temperature", 36.0))
        .await;

    assert_eq!(pipeline.publisher.len(), 1);
}

#[tokio::test]
async fn violation_after_window_fires_fresh_alert() {
    let pipeline = build_pipeline(Duration::from_millis(50));

    pipeline
        .coordinator
        .process(TOPIC, &sensor_payload("temperature", 35.0))
        .await;

    tokio::time::sleep(Duration::from_millis(60)).await;

    pipeline
        .coordinator
        .process(TOPIC, &sensor_payload("temperature", 36.0))
        .await;

    let alerts = pipeline.publisher.alerts();
    assert_eq!(alerts.len(), 2);
    assert_ne!(alerts[0].id, alerts[1].id);
}

#[tokio::test]
async fn empty_payload_still_broadcasts_with_topic_tank_id() {
    let pipeline = build_pipeline(Duration::from_secs(60));
    let (_id, mut feed) = pipeline.broadcaster.subscribe().await;

    pipeline.coordinator.process(TOPIC, b"{}").await;

    assert_eq!(pipeline.publisher.len(), 0);

    let frame = feed.recv().await.unwrap();
    assert!(frame.contains(r#""tankId":"tank1""#));
    assert!(!frame.contains("temperature"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(pipeline.memory.is_empty());
}

#[tokio::test]
async fn malformed_payload_degrades_without_stopping_the_stream() {
    let pipeline = build_pipeline(Duration::from_secs(60));
    let (_id, mut feed) = pipeline.broadcaster.subscribe().await;

    pipeline.coordinator.process(TOPIC, b"!! not json !!").await;
    pipeline
        .coordinator
        .process(TOPIC, &sensor_payload("temperature", 35.0))
        .await;

    // both messages produced a frame; the second also alerted
    let first = feed.recv().await.unwrap();
    assert!(first.contains(r#""type":"sensor:update""#));
    assert_eq!(pipeline.publisher.len(), 1);
}

#[tokio::test]
async fn string_values_are_normalized_end_to_end() {
    let pipeline = build_pipeline(Duration::from_secs(60));
    let (_id, mut feed) = pipeline.broadcaster.subscribe().await;

    pipeline
        .coordinator
        .process(TOPIC, br#"{"temp": "24.5"}"#)
        .await;

    let frame = feed.recv().await.unwrap();
    assert!(frame.contains(r#""temperature":24.5"#));
}
