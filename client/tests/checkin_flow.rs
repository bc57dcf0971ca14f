#![cfg(not(coverage))]

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use httpmock::prelude::*;
use serde_json::json;
use tikit_client::{
    state::{CategoryFilter, TemporarySessionEvent},
    utils::{FileStore, FixedClock, KeyValueStore},
    CheckinContext, CheckinError, ClientConfig, Services,
};

fn lookup_json() -> serde_json::Value {
    json!({
        "id": 7,
        "name": "Jornada mañana",
        "code": "PUERTA-2",
        "startDate": "2025-03-01",
        "endDate": "2025-03-01",
        "startTime": "09:00",
        "endTime": "13:00",
        "createdAt": "2025-02-01T10:00:00Z",
        "event": { "id": 3, "name": "Expo Tikit" },
        "registrantTypes": [
            { "id": 1, "name": "General", "registered": 80 },
            { "id": 2, "name": "VIP", "registered": 20 }
        ]
    })
}

fn checkin_json(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "guest": { "id": 90, "firstName": "Ana", "lastName": "Rojas", "email": "ana@example.com" },
        "eventSession": { "id": 7, "name": "Jornada mañana" },
        "method": "qr"
    })
}

fn services(server: &MockServer, path: &std::path::Path, clock: Arc<FixedClock>) -> Services {
    let config = ClientConfig::new(server.url("/api"))
        .with_service_account("svc@tikit.cl", "svc-pass")
        .with_storage_path(path);
    let storage = Arc::new(FileStore::open(path).unwrap());
    Services::new(config, storage, clock).unwrap()
}

#[tokio::test]
async fn temporary_session_survives_restart_and_ends_cleanly() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/login");
            then.status(200)
                .json_body(json!({ "token": "svc-token", "refresh_token": "svc-refresh" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/event-sessions/PUERTA-2")
                .header("Authorization", "Bearer svc-token");
            then.status(200).json_body(lookup_json());
        })
        .await;
    let register = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/checkins/register")
                .header("Authorization", "Bearer svc-token")
                .json_body(json!({
                    "event": 3,
                    "eventSession": 7,
                    "guest": "opaque-payload",
                    "registrantTypeIds": [2]
                }));
            then.status(201).json_body(checkin_json(5));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
    ));

    let grant = {
        let first = services(&server, &path, clock.clone());
        first.auth.validate_session_code("PUERTA-2").await.unwrap()
    };

    // A fresh process sees the same grant from disk.
    clock.advance(Duration::hours(1));
    let second = services(&server, &path, clock.clone());
    let restored = second.auth.temporary_session().unwrap().unwrap();
    assert_eq!(restored, grant);
    assert!(!second.auth.restore().await);

    let filter = CategoryFilter::only([2]);
    second.category_filters.save(grant.session_id, &filter).unwrap();
    let filter = second.category_filters.load(grant.session_id).unwrap();

    let record = second
        .checkins
        .register_for_temporary_session(&restored, "opaque-payload", &filter)
        .await
        .unwrap();
    register.assert_async().await;
    assert_eq!(record.guest.full_name(), "Ana Rojas");

    let context = CheckinContext::temporary(&restored);
    assert_eq!(second.checkins.cached_checkins(&context).len(), 1);

    let mut events = second.temporary_sessions.subscribe();
    second.auth.end_temporary_session().unwrap();
    assert_eq!(events.try_recv().unwrap(), TemporarySessionEvent::Ended);
    assert!(second.checkins.cached_checkins(&context).is_empty());

    let reopened = FileStore::open(&path).unwrap();
    assert_eq!(reopened.get("temporarySessionData").unwrap(), None);
    assert_eq!(reopened.get("categoryFilter_7").unwrap().as_deref(), Some("[2]"));
}

#[tokio::test]
async fn expired_grant_is_gone_after_restart() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/login");
            then.status(200)
                .json_body(json!({ "token": "svc-token", "refresh_token": "svc-refresh" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/event-sessions/PUERTA-2");
            then.status(200).json_body(lookup_json());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/checkins/register");
            then.status(409)
                .json_body(json!({ "message": "Guest is not registered for this event" }));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
    ));

    let first = services(&server, &path, clock.clone());
    let grant = first.auth.validate_session_code("PUERTA-2").await.unwrap();
    let err = first
        .checkins
        .register_for_temporary_session(&grant, "payload", &CategoryFilter::all())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckinError::Rejected { status: 409, .. }));
    assert_eq!(
        err.to_string(),
        "Esta persona no está registrada en este evento o sesión."
    );

    clock.advance(Duration::hours(6) + Duration::seconds(1));
    let second = services(&server, &path, clock);
    assert_eq!(second.auth.temporary_session().unwrap(), None);
}
