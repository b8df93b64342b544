//! Routing API integration tests.
//!
//! Exercises `/api/v1/...` over HTTP against `TestStudioServer`.

use serde_json::{json, Value};
use std::sync::Arc;
use studio_controller::models::OutputCatalog;
use studio_controller::observability::HealthState;
use studio_controller::presence::{ConnectionRegistry, MembershipTable};
use studio_controller::routes::AppState;
use studio_controller::routing::RoutingMatrix;
use studio_controller::signaling::SignalingBroker;
use studio_test_utils::{test_config, three_person_room, FailingStore, TestRoom, TestStudioServer};
use tokio_util::sync::CancellationToken;

async fn seeded_server() -> Result<TestStudioServer, anyhow::Error> {
    TestStudioServer::spawn(three_person_room().into_store()).await
}

async fn create_route(
    server: &TestStudioServer,
    body: Value,
) -> Result<reqwest::Response, anyhow::Error> {
    Ok(reqwest::Client::new()
        .post(format!("{}/api/v1/routes", server.url()))
        .json(&body)
        .send()
        .await?)
}

/// Create a route that must succeed and return its id.
async fn create_route_ok(server: &TestStudioServer, body: Value) -> Result<String, anyhow::Error> {
    let response = create_route(server, body).await?;
    anyhow::ensure!(response.status() == 201, "create failed: {}", response.status());
    let route: Value = response.json().await?;
    route["id"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("route without id"))
}

#[tokio::test]
async fn test_auto_route_fans_out_to_others_and_default_output() -> Result<(), anyhow::Error> {
    let server = seeded_server().await?;

    let response = reqwest::Client::new()
        .post(format!(
            "{}/api/v1/rooms/studio-a/participants/alice/auto-route",
            server.url()
        ))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let routes: Vec<Value> = response.json().await?;
    let [audio, video] = routes.as_slice() else {
        anyhow::bail!("expected two routes, got {}", routes.len());
    };

    assert_eq!(audio["type"], "audio");
    assert_eq!(audio["source_id"], "mic-alice");
    assert_eq!(audio["destinations"], json!(["bob", "carol", "obs_main"]));
    assert_eq!(audio["volume"], 0.8);
    assert_eq!(audio["is_active"], true);

    assert_eq!(video["type"], "video");
    assert_eq!(video["source_id"], "cam-alice");
    assert_eq!(video["destinations"], json!(["bob", "carol", "obs_camera1"]));
    assert_eq!(video["quality"], "1080p");

    Ok(())
}

#[tokio::test]
async fn test_auto_route_without_sources_is_empty() -> Result<(), anyhow::Error> {
    let store = TestRoom::new("r1")
        .with_participant("a", "A")
        .with_participant("b", "B")
        .into_store();
    let server = TestStudioServer::spawn(store).await?;

    let routes: Vec<Value> = reqwest::Client::new()
        .post(format!(
            "{}/api/v1/rooms/r1/participants/a/auto-route",
            server.url()
        ))
        .send()
        .await?
        .json()
        .await?;

    assert!(routes.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_route_volume_out_of_range_is_400() -> Result<(), anyhow::Error> {
    let server = seeded_server().await?;
    let route_id = create_route_ok(
        &server,
        json!({"room_id": "studio-a", "type": "audio", "source_id": "mic-bob"}),
    )
    .await?;

    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/routes/{}/volume", server.url(), route_id);

    let response = client.post(&url).json(&json!({"volume": 1.7})).send().await?;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let response = client.post(&url).json(&json!({"volume": 0.3})).send().await?;
    assert_eq!(response.status(), 200);
    let route: Value = response.json().await?;
    assert_eq!(route["volume"], 0.3);

    Ok(())
}

#[tokio::test]
async fn test_video_route_volume_is_400() -> Result<(), anyhow::Error> {
    let server = seeded_server().await?;

    let response = create_route(
        &server,
        json!({"room_id": "studio-a", "type": "video", "source_id": "cam-bob", "volume": 0.5}),
    )
    .await?;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let route_id = create_route_ok(
        &server,
        json!({"room_id": "studio-a", "type": "video", "source_id": "cam-bob"}),
    )
    .await?;
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/routes/{}", server.url(), route_id);

    let response = client
        .patch(&url)
        .json(&json!({"volume": 0.5, "quality": "720p"}))
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // Rejected update leaves the route untouched
    let route: Value = client.get(&url).send().await?.json().await?;
    assert_eq!(route["volume"], Value::Null);
    assert_eq!(route["quality"], Value::Null);

    Ok(())
}

#[tokio::test]
async fn test_add_then_remove_destination_round_trips() -> Result<(), anyhow::Error> {
    let server = seeded_server().await?;
    let route_id = create_route_ok(
        &server,
        json!({
            "room_id": "studio-a",
            "type": "audio",
            "source_id": "mic-bob",
            "destinations": ["alice"]
        }),
    )
    .await?;

    let client = reqwest::Client::new();
    let url = format!(
        "{}/api/v1/routes/{}/destinations/obs_audio1",
        server.url(),
        route_id
    );

    let added: Value = client.post(&url).send().await?.json().await?;
    assert_eq!(added["destinations"], json!(["alice", "obs_audio1"]));

    // Adding twice keeps one copy
    let again: Value = client.post(&url).send().await?.json().await?;
    assert_eq!(again["destinations"], json!(["alice", "obs_audio1"]));

    let removed: Value = client.delete(&url).send().await?.json().await?;
    assert_eq!(removed["destinations"], json!(["alice"]));

    Ok(())
}

#[tokio::test]
async fn test_toggle_and_update_route() -> Result<(), anyhow::Error> {
    let server = seeded_server().await?;
    let route_id = create_route_ok(
        &server,
        json!({"room_id": "studio-a", "type": "video", "source_id": "cam-carol"}),
    )
    .await?;
    let client = reqwest::Client::new();

    let toggled: Value = client
        .post(format!("{}/api/v1/routes/{}/toggle", server.url(), route_id))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(toggled["is_active"], false);

    let updated: Value = client
        .patch(format!("{}/api/v1/routes/{}", server.url(), route_id))
        .json(&json!({"quality": "720p", "destinations": ["alice", "alice", "bob"]}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(updated["quality"], "720p");
    assert_eq!(updated["destinations"], json!(["alice", "bob"]));
    assert_eq!(updated["is_active"], false);

    Ok(())
}

#[tokio::test]
async fn test_delete_route_then_get_is_404() -> Result<(), anyhow::Error> {
    let server = seeded_server().await?;
    let route_id = create_route_ok(
        &server,
        json!({"room_id": "studio-a", "type": "audio", "source_id": "mic-alice"}),
    )
    .await?;
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/routes/{}", server.url(), route_id);

    let response = client.delete(&url).send().await?;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["message"], "Route deleted");

    let response = client.get(&url).send().await?;
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let response = client.delete(&url).send().await?;
    assert_eq!(response.status(), 404);

    Ok(())
}

#[tokio::test]
async fn test_create_route_rejects_inconsistent_source() -> Result<(), anyhow::Error> {
    let server = seeded_server().await?;

    // Audio id submitted as video
    let response = create_route(
        &server,
        json!({"room_id": "studio-a", "type": "video", "source_id": "mic-alice"}),
    )
    .await?;
    assert_eq!(response.status(), 400);

    // Right source, wrong room
    let response = create_route(
        &server,
        json!({"room_id": "studio-b", "type": "audio", "source_id": "mic-alice"}),
    )
    .await?;
    assert_eq!(response.status(), 400);

    let response = create_route(
        &server,
        json!({"room_id": "studio-a", "type": "audio", "source_id": "ghost"}),
    )
    .await?;
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "UNKNOWN_SOURCE");

    Ok(())
}

#[tokio::test]
async fn test_routing_matrix_snapshot() -> Result<(), anyhow::Error> {
    let server = seeded_server().await?;
    create_route_ok(
        &server,
        json!({"room_id": "studio-a", "type": "audio", "source_id": "mic-alice"}),
    )
    .await?;

    let snapshot: Value = reqwest::Client::new()
        .get(format!("{}/api/v1/rooms/studio-a/matrix", server.url()))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(snapshot["room_id"], "studio-a");
    assert_eq!(snapshot["audio_sources"].as_array().map(Vec::len), Some(3));
    assert_eq!(snapshot["video_sources"].as_array().map(Vec::len), Some(3));
    assert_eq!(snapshot["routes"].as_array().map(Vec::len), Some(1));
    assert_eq!(snapshot["participants"].as_array().map(Vec::len), Some(3));
    assert_eq!(snapshot["obs_outputs"].as_array().map(Vec::len), Some(5));
    assert_eq!(snapshot["obs_outputs"][0]["id"], "obs_main");

    Ok(())
}

#[tokio::test]
async fn test_unknown_room_snapshot_is_empty() -> Result<(), anyhow::Error> {
    let server = seeded_server().await?;

    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/rooms/nowhere/routes", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let routes: Vec<Value> = response.json().await?;
    assert!(routes.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_store_failure_is_500_without_detail() -> Result<(), anyhow::Error> {
    let store = Arc::new(FailingStore::with_message("pg: relation does not exist"));
    let state = AppState {
        config: test_config()?,
        broker: Arc::new(SignalingBroker::new(
            Arc::new(ConnectionRegistry::new()),
            Arc::new(MembershipTable::new()),
        )),
        matrix: Arc::new(RoutingMatrix::new(
            store.clone(),
            store.clone(),
            store,
            OutputCatalog::default(),
        )),
        health: Arc::new(HealthState::new()),
        shutdown: CancellationToken::new(),
    };
    let server = TestStudioServer::spawn_with_state(state, None).await?;

    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/rooms/studio-a/matrix", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 500);

    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "STORE_ERROR");
    let message = body["error"]["message"].as_str().unwrap_or_default();
    assert!(!message.contains("relation"), "store detail leaked: {message}");

    Ok(())
}

#[tokio::test]
async fn test_health_and_ready() -> Result<(), anyhow::Error> {
    let server = seeded_server().await?;
    let client = reqwest::Client::new();

    let response = client.get(format!("{}/health", server.url())).send().await?;
    assert_eq!(response.status(), 200);

    let response = client.get(format!("{}/ready", server.url())).send().await?;
    assert_eq!(response.status(), 200);

    server.state().health.set_not_ready();
    let response = client.get(format!("{}/ready", server.url())).send().await?;
    assert_eq!(response.status(), 503);

    Ok(())
}
