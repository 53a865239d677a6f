use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::LOCATION},
};
use serde_json::{Value, json};
use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

async fn test_app(tag: &str) -> Router {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "mergington-route-{tag}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));

    let database_url = format!("sqlite:{}", temp_path.display());
    let db = mergington::db::spawn(&database_url)
        .await
        .expect("failed to spawn DbActor");

    let static_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static");
    let state = mergington::server::router::MergingtonState::new(db, static_dir);
    mergington::server::router::mergington_router(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(builder.body(body).expect("failed to build request"))
        .await
        .expect("request failed");

    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn chess_club_scenario() {
    let app = test_app("scenario").await;

    let (status, body) = send(
        &app,
        "POST",
        "/activities",
        Some(json!({ "name": "Chess Club", "max_participants": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "message": "Created", "name": "Chess Club" }));

    let (status, body) = send(
        &app,
        "POST",
        "/activities/Chess%20Club/signup?email=alice@x.com",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Signed up alice@x.com for Chess Club");

    let (status, _) = send(
        &app,
        "POST",
        "/activities/Chess%20Club/signup?email=bob@x.com",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        "/activities/Chess%20Club/signup?email=carol@x.com",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "ACTIVITY_FULL");
    assert_eq!(body["error"]["message"], "Activity is full");

    let (status, body) = send(
        &app,
        "DELETE",
        "/activities/Chess%20Club/unregister?email=alice@x.com",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Unregistered alice@x.com from Chess Club");

    let (status, _) = send(
        &app,
        "POST",
        "/activities/Chess%20Club/signup?email=carol@x.com",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/activities", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{
            "name": "Chess Club",
            "description": null,
            "schedule": null,
            "max_participants": 2,
            "participants": ["bob@x.com", "carol@x.com"]
        }])
    );
}

#[tokio::test]
async fn create_rejects_duplicates_and_bad_bodies() {
    let app = test_app("create").await;

    let payload = json!({
        "name": "Test Activity",
        "description": "Desc",
        "schedule": "Now",
        "max_participants": 10
    });
    let (status, _) = send(&app, "POST", "/activities", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", "/activities", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "ACTIVITY_EXISTS");
    assert_eq!(body["error"]["message"], "Activity already exists");

    let (status, body) = send(&app, "POST", "/activities", Some(json!({ "name": "  " }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    let (status, _) = send(
        &app,
        "POST",
        "/activities",
        Some(json!({ "description": "no name" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        "POST",
        "/activities",
        Some(json!({ "name": "Negative", "max_participants": -3 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/activities")
                .header("content-type", "application/json")
                .body(Body::from("not-json"))
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert!(resp.status().is_client_error());

    let (_, body) = send(&app, "GET", "/activities", None).await;
    let names: Vec<&str> = body
        .as_array()
        .expect("list body is an array")
        .iter()
        .filter_map(|a| a["name"].as_str())
        .collect();
    assert_eq!(names, ["Test Activity"]);
}

#[tokio::test]
async fn signup_and_unregister_flow() {
    let app = test_app("flow").await;

    let (status, _) = send(
        &app,
        "POST",
        "/activities",
        Some(json!({ "name": "Gym", "max_participants": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let signup = "/activities/Gym/signup?email=student@example.com";
    let unregister = "/activities/Gym/unregister?email=student@example.com";

    let (status, _) = send(&app, "POST", signup, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", signup, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "ALREADY_SIGNED_UP");

    let (status, _) = send(&app, "DELETE", unregister, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "DELETE", unregister, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "NOT_SIGNED_UP");
    assert_eq!(
        body["error"]["message"],
        "Student is not signed up for this activity"
    );

    let (status, _) = send(&app, "POST", signup, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/activities", None).await;
    assert_eq!(body[0]["participants"], json!(["student@example.com"]));
}

#[tokio::test]
async fn unknown_activity_is_not_found_for_any_email() {
    let app = test_app("missing").await;

    for email in ["a@x.com", "someone.else@example.org"] {
        let (status, body) = send(
            &app,
            "POST",
            &format!("/activities/Nowhere/signup?email={email}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Activity not found");

        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/activities/Nowhere/unregister?email={email}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn email_parameter_is_required() {
    let app = test_app("email").await;

    send(&app, "POST", "/activities", Some(json!({ "name": "Band" }))).await;

    let (status, body) = send(&app, "POST", "/activities/Band/signup", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    let (status, _) = send(&app, "POST", "/activities/Band/signup?email=%20%20", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app, "DELETE", "/activities/Band/unregister", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn email_with_invalid_utf8_is_rejected() {
    let app = test_app("utf8").await;

    send(&app, "POST", "/activities", Some(json!({ "name": "Band" }))).await;

    let (status, body) = send(&app, "POST", "/activities/Band/signup?email=%FF", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    let (_, body) = send(&app, "GET", "/activities", None).await;
    assert_eq!(body[0]["participants"], json!([]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_signups_at_capacity_never_fail_internally() {
    let app = test_app("capacity-load").await;

    for round in 0..30 {
        let name = format!("Tiny{round}");
        let (status, _) = send(
            &app,
            "POST",
            "/activities",
            Some(json!({ "name": name, "max_participants": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let mut tasks = Vec::new();
        for i in 0..20 {
            let app = app.clone();
            let uri = format!("/activities/{name}/signup?email=s{i}@x.com");
            tasks.push(tokio::spawn(async move {
                send(&app, "POST", &uri, None).await.0
            }));
        }

        let mut ok = 0;
        let mut rejected = 0;
        for task in tasks {
            let status = task.await.expect("signup task panicked");
            assert!(!status.is_server_error(), "round {round}: got {status}");
            if status == StatusCode::OK {
                ok += 1;
            } else {
                assert_eq!(status, StatusCode::BAD_REQUEST, "round {round}");
                rejected += 1;
            }
        }
        assert_eq!(ok, 3, "round {round}");
        assert_eq!(rejected, 17, "round {round}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_unregisters_mixed_with_signups_never_fail_internally() {
    let app = test_app("unregister-load").await;

    let (status, _) = send(&app, "POST", "/activities", Some(json!({ "name": "Open" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    for round in 0..30 {
        let mut signups = Vec::new();
        let mut unregisters = Vec::new();
        for i in 0..10 {
            let app_signup = app.clone();
            let uri = format!("/activities/Open/signup?email=r{round}s{i}@x.com");
            signups.push(tokio::spawn(async move {
                send(&app_signup, "POST", &uri, None).await.0
            }));
            let app_unregister = app.clone();
            let uri = format!("/activities/Open/unregister?email=ghost{i}@x.com");
            unregisters.push(tokio::spawn(async move {
                send(&app_unregister, "DELETE", &uri, None).await.0
            }));
        }

        for task in signups {
            let status = task.await.expect("signup task panicked");
            assert_eq!(status, StatusCode::OK, "round {round}");
        }
        for task in unregisters {
            let status = task.await.expect("unregister task panicked");
            assert_eq!(status, StatusCode::BAD_REQUEST, "round {round}");
        }
    }
}

#[tokio::test]
async fn root_redirects_to_front_end_and_static_is_served() {
    let app = test_app("static").await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
        Some("/static/index.html")
    );
    assert!(resp.headers().contains_key("x-request-id"));

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/static/index.html")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, _) = send(&app, "GET", "/no/such/route", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = test_app("reqid").await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/activities")
                .header("x-request-id", "abc123")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("abc123")
    );
}
