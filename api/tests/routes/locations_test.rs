#[cfg(test)]
mod tests {
    use crate::helpers::make_test_app;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn create_circle_location() {
        let app = make_test_app().await;

        let (status, json) = app
            .post(
                "/api/locations",
                json!({
                    "name": "Main Gym",
                    "boundary": {
                        "type": "circle",
                        "center": { "lat": 14.1498, "lon": 120.9555 },
                        "radius_meters": 50.0
                    }
                }),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["name"], "Main Gym");
        assert_eq!(json["data"]["boundary"]["type"], "circle");
    }

    #[tokio::test]
    async fn create_polygon_with_hole() {
        let app = make_test_app().await;

        let (status, json) = app
            .post(
                "/api/locations",
                json!({
                    "name": "Quad",
                    "boundary": {
                        "type": "polygon",
                        "rings": [
                            [
                                { "lat": 0.0, "lon": 0.0 },
                                { "lat": 0.0, "lon": 1.0 },
                                { "lat": 1.0, "lon": 1.0 },
                                { "lat": 1.0, "lon": 0.0 }
                            ],
                            [
                                { "lat": 0.4, "lon": 0.4 },
                                { "lat": 0.4, "lon": 0.6 },
                                { "lat": 0.6, "lon": 0.6 }
                            ]
                        ]
                    }
                }),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["boundary"]["rings"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn degenerate_polygon_is_unprocessable() {
        let app = make_test_app().await;

        let (status, json) = app
            .post(
                "/api/locations",
                json!({
                    "name": "Line",
                    "boundary": {
                        "type": "polygon",
                        "rings": [[{ "lat": 0.0, "lon": 0.0 }, { "lat": 1.0, "lon": 1.0 }]]
                    }
                }),
            )
            .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn non_positive_radius_is_unprocessable() {
        let app = make_test_app().await;

        let (status, _) = app
            .post(
                "/api/locations",
                json!({
                    "name": "Dot",
                    "boundary": { "type": "circle", "center": { "lat": 0.0, "lon": 0.0 }, "radius_meters": 0.0 }
                }),
            )
            .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn empty_name_is_bad_request() {
        let app = make_test_app().await;

        let (status, json) = app
            .post(
                "/api/locations",
                json!({
                    "name": "",
                    "boundary": { "type": "circle", "center": { "lat": 0.0, "lon": 0.0 }, "radius_meters": 5.0 }
                }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Name must be between 1 and 200 characters");
    }
}
