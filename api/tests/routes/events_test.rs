#[cfg(test)]
mod tests {
    use crate::helpers::{TestApp, make_test_app};
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use db::models::{location_ping, student};
    use serde_json::{Value, json};
    use services::factories::{FAR_AWAY, Fixture, LOBBY_CENTER, VENUE_CENTER};

    /// Creates an event through the API with the schedule offset from now.
    async fn create_event(
        app: &TestApp,
        fx: &Fixture,
        opens_in: Duration,
        starts_in: Duration,
        ends_in: Duration,
    ) -> Value {
        let now = Utc::now();
        let (status, json) = app
            .post(
                "/api/events",
                json!({
                    "name": "Orientation",
                    "registration_location_id": fx.lobby.id,
                    "venue_location_id": fx.venue.id,
                    "registration_open_at": (now + opens_in).to_rfc3339(),
                    "start_at": (now + starts_in).to_rfc3339(),
                    "end_at": (now + ends_in).to_rfc3339(),
                    "eligibility": { "all_students": true }
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["data"].clone()
    }

    async fn registration_event(app: &TestApp, fx: &Fixture) -> Value {
        create_event(
            app,
            fx,
            Duration::minutes(-10),
            Duration::minutes(20),
            Duration::minutes(80),
        )
        .await
    }

    async fn ongoing_event(app: &TestApp, fx: &Fixture) -> Value {
        create_event(
            app,
            fx,
            Duration::minutes(-40),
            Duration::minutes(-10),
            Duration::minutes(50),
        )
        .await
    }

    async fn student(app: &TestApp, number: &str) -> i64 {
        student::Model::create(app.db(), number, "Student", None, None)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn create_and_fetch_event() {
        let app = make_test_app().await;
        let fx = Fixture::new(app.db()).await;

        let ev = create_event(
            &app,
            &fx,
            Duration::hours(1),
            Duration::hours(2),
            Duration::hours(3),
        )
        .await;
        assert_eq!(ev["status"], "upcoming");
        assert_eq!(ev["location_monitoring_enabled"], true);

        let (status, json) = app.get(&format!("/api/events/{}", ev["id"])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["name"], "Orientation");
        assert_eq!(json["data"]["eligibility"]["all_students"], true);
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let app = make_test_app().await;

        let (status, json) = app.get("/api/events/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "event 999 not found");
    }

    #[tokio::test]
    async fn backwards_schedule_is_rejected() {
        let app = make_test_app().await;
        let fx = Fixture::new(app.db()).await;
        let now = Utc::now();

        let (status, json) = app
            .post(
                "/api/events",
                json!({
                    "name": "Backwards",
                    "registration_location_id": fx.lobby.id,
                    "venue_location_id": fx.venue.id,
                    "registration_open_at": now.to_rfc3339(),
                    "start_at": (now + Duration::hours(2)).to_rfc3339(),
                    "end_at": (now + Duration::hours(1)).to_rfc3339()
                }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn cancel_is_allowed_once() {
        let app = make_test_app().await;
        let fx = Fixture::new(app.db()).await;
        let ev = registration_event(&app, &fx).await;
        let uri = format!("/api/events/{}/cancel", ev["id"]);

        let (status, json) = app.post(&uri, json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "cancelled");

        let (status, json) = app.post(&uri, json!({})).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["message"], "event cannot be cancelled while it is cancelled");
    }

    #[tokio::test]
    async fn check_in_during_registration() {
        let app = make_test_app().await;
        let fx = Fixture::new(app.db()).await;
        let ev = registration_event(&app, &fx).await;
        let student_id = student(&app, "2025-0001").await;
        let uri = format!("/api/events/{}/check-in", ev["id"]);
        let body = json!({
            "student_id": student_id,
            "claimed_location_id": fx.lobby.id,
            "latitude": LOBBY_CENTER.lat,
            "longitude": LOBBY_CENTER.lon
        });

        let (status, json) = app.post(&uri, body.clone()).await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        assert_eq!(json["data"]["status"], "registered");

        let (status, json) = app.post(&uri, body).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["message"], "attendance already recorded");
    }

    #[tokio::test]
    async fn check_in_outside_geofence_is_forbidden() {
        let app = make_test_app().await;
        let fx = Fixture::new(app.db()).await;
        let ev = registration_event(&app, &fx).await;
        let student_id = student(&app, "2025-0001").await;

        let (status, json) = app
            .post(
                &format!("/api/events/{}/check-in", ev["id"]),
                json!({
                    "student_id": student_id,
                    "claimed_location_id": fx.lobby.id,
                    "latitude": FAR_AWAY.lat,
                    "longitude": FAR_AWAY.lon
                }),
            )
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["message"], "you are outside the allowed area");

        let (_, json) = app.get(&format!("/api/events/{}/records", ev["id"])).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn late_check_in_then_pings() {
        let app = make_test_app().await;
        let fx = Fixture::new(app.db()).await;
        let ev = ongoing_event(&app, &fx).await;
        assert_eq!(ev["status"], "ongoing");
        let student_id = student(&app, "2025-0001").await;
        let id = &ev["id"];

        let (status, json) = app
            .post(
                &format!("/api/events/{id}/check-in"),
                json!({
                    "student_id": student_id,
                    "claimed_location_id": fx.venue.id,
                    "latitude": VENUE_CENTER.lat,
                    "longitude": VENUE_CENTER.lon
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        assert_eq!(json["data"]["status"], "late");

        let pings = format!("/api/events/{id}/pings");
        let (status, json) = app
            .post(
                &pings,
                json!({
                    "student_id": student_id,
                    "claimed_location_id": fx.venue.id,
                    "latitude": VENUE_CENTER.lat,
                    "longitude": VENUE_CENTER.lon,
                    "client_timestamp": Utc::now().to_rfc3339()
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["data"]["inside"], true);
        assert_eq!(json["data"]["flagged_outside"], false);

        let (status, _) = app
            .post(
                &pings,
                json!({
                    "student_id": student_id,
                    "claimed_location_id": fx.lobby.id,
                    "latitude": VENUE_CENTER.lat,
                    "longitude": VENUE_CENTER.lon,
                    "client_timestamp": Utc::now().to_rfc3339()
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .post(
                &pings,
                json!({
                    "student_id": student_id,
                    "claimed_location_id": fx.venue.id,
                    "latitude": 123.0,
                    "longitude": VENUE_CENTER.lon,
                    "client_timestamp": Utc::now().to_rfc3339()
                }),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, json) = app.get(&format!("/api/events/{id}/records")).await;
        assert_eq!(status, StatusCode::OK);
        let records = json["data"].as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["student_id"], student_id);
        assert_eq!(records[0]["status"], "late");
    }

    #[tokio::test]
    async fn ping_without_record_is_not_found() {
        let app = make_test_app().await;
        let fx = Fixture::new(app.db()).await;
        let ev = ongoing_event(&app, &fx).await;
        let student_id = student(&app, "2025-0001").await;

        let (status, _) = app
            .post(
                &format!("/api/events/{}/pings", ev["id"]),
                json!({
                    "student_id": student_id,
                    "claimed_location_id": fx.venue.id,
                    "latitude": VENUE_CENTER.lat,
                    "longitude": VENUE_CENTER.lon,
                    "client_timestamp": Utc::now().to_rfc3339()
                }),
            )
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ping_before_event_starts_is_conflict() {
        let app = make_test_app().await;
        let fx = Fixture::new(app.db()).await;
        let ev = registration_event(&app, &fx).await;
        let student_id = student(&app, "2025-0001").await;

        let (status, json) = app
            .post(
                &format!("/api/events/{}/pings", ev["id"]),
                json!({
                    "student_id": student_id,
                    "claimed_location_id": fx.venue.id,
                    "latitude": VENUE_CENTER.lat,
                    "longitude": VENUE_CENTER.lon,
                    "client_timestamp": Utc::now().to_rfc3339()
                }),
            )
            .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            json["message"],
            "event is registration, location updates are only accepted while it is ongoing"
        );
    }

    #[tokio::test]
    async fn ping_without_client_timestamp_is_rejected() {
        let app = make_test_app().await;
        let fx = Fixture::new(app.db()).await;
        let ev = ongoing_event(&app, &fx).await;
        let student_id = student(&app, "2025-0001").await;
        let id = &ev["id"];

        let (status, _) = app
            .post(
                &format!("/api/events/{id}/check-in"),
                json!({
                    "student_id": student_id,
                    "claimed_location_id": fx.venue.id,
                    "latitude": VENUE_CENTER.lat,
                    "longitude": VENUE_CENTER.lon
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = app
            .post(
                &format!("/api/events/{id}/pings"),
                json!({
                    "student_id": student_id,
                    "claimed_location_id": fx.venue.id,
                    "latitude": VENUE_CENTER.lat,
                    "longitude": VENUE_CENTER.lon
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(
            json["message"].as_str().unwrap().contains("client_timestamp"),
            "{json}"
        );

        let event_id = id.as_i64().unwrap();
        let log = location_ping::Model::find_for_record(app.db(), event_id, student_id)
            .await
            .unwrap();
        assert!(log.is_empty());
    }
}
