#[macro_use]
mod common;

use actix_web::middleware::Logger;
use actix_web::{http::header, http::StatusCode, rt, test, App, HttpServer};
use chrono::{DateTime, Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::net::TcpListener;

use taskdeck::envelope::ErrorEnvelope;
use taskdeck::error::ErrorBody;
use taskdeck::models::{Task, TaskCategory, TaskStatus};
use taskdeck::routes;

fn window(start_in: Duration, length: Duration) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc::now() + start_in;
    (start, start + length)
}

fn task_payload(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Value {
    json!({
        "title": title,
        "category": "Work",
        "description": "Quarterly numbers",
        "status": "Completed",
        "start": start,
        "end": end,
        "userId": 1
    })
}

#[test_log::test(actix_rt::test)]
async fn test_task_crud_flow() {
    let state = common::state();
    let app = test_app!(state);
    let (start, end) = window(Duration::hours(1), Duration::hours(2));

    // Create ignores the requested status.
    let req = test::TestRequest::post()
        .uri("/tasks")
        .set_json(task_payload("Write report", start, end))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Task = test::read_body_json(resp).await;
    assert_eq!(created.title, "Write report");
    assert_eq!(created.category, TaskCategory::Work);
    assert_eq!(created.status, TaskStatus::Pending);
    assert_eq!(created.user_id, 1);

    let req = test::TestRequest::get()
        .uri(&format!("/tasks/{}", created.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Task = test::read_body_json(resp).await;
    assert_eq!(fetched, created);

    let req = test::TestRequest::get().uri("/tasks").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let all: Vec<Task> = test::read_body_json(resp).await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, TaskStatus::Pending);

    let req = test::TestRequest::patch()
        .uri(&format!("/tasks/{}", created.id))
        .set_json(json!({ "title": "Write final report", "category": "Home" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Task = test::read_body_json(resp).await;
    assert_eq!(updated.title, "Write final report");
    assert_eq!(updated.category, TaskCategory::Home);
    assert_eq!(updated.description.as_deref(), Some("Quarterly numbers"));

    let req = test::TestRequest::delete()
        .uri(&format!("/tasks/{}", created.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, "success");

    let req = test::TestRequest::get()
        .uri(&format!("/tasks/{}", created.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.status_code, 404);
    assert_eq!(body.message, format!("Task with id {} not found.", created.id));
}

#[actix_rt::test]
async fn test_invalid_schedules_are_rejected() {
    let state = common::state();
    let app = test_app!(state);

    let (past_start, past_end) = window(-Duration::days(2), Duration::hours(1));
    let (start, end) = window(Duration::hours(3), Duration::hours(1));
    let cases = vec![
        ("past window", task_payload("Past", past_start, past_end)),
        ("end before start", task_payload("Backwards", end, start)),
        (
            "missing end",
            json!({ "title": "Open", "category": "Work", "start": start, "userId": 1 }),
        ),
    ];

    for (name, payload) in cases {
        let req = test::TestRequest::post()
            .uri("/tasks")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "case: {}", name);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.path.as_deref(), Some("/tasks"), "case: {}", name);
    }

    let req = test::TestRequest::get().uri("/tasks").to_request();
    let all: Vec<Task> = test::call_and_read_body_json(&app, req).await;
    assert!(all.is_empty());
}

#[actix_rt::test]
async fn test_invalid_category_and_id() {
    let state = common::state();
    let app = test_app!(state);
    let (start, end) = window(Duration::hours(1), Duration::hours(1));

    let mut payload = task_payload("Groceries", start, end);
    payload["category"] = json!("Errands");
    let req = test::TestRequest::post()
        .uri("/tasks")
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert!(body.message.contains("Work, Personal and Home"));

    let req = test::TestRequest::get().uri("/tasks/abc").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::delete().uri("/tasks/999").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_update_with_one_date_requires_both() {
    let state = common::state();
    let app = test_app!(state);
    let (start, end) = window(Duration::hours(1), Duration::hours(1));

    let req = test::TestRequest::post()
        .uri("/tasks")
        .set_json(task_payload("Call plumber", start, end))
        .to_request();
    let created: Task = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::patch()
        .uri(&format!("/tasks/{}", created.id))
        .set_json(json!({ "end": end + Duration::hours(1) }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!("/tasks/{}", created.id))
        .to_request();
    let fetched: Task = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched.end, created.end);
}

#[actix_rt::test]
async fn test_live_server_health_and_error_envelope() {
    let state = common::state();
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server_state = state.clone();
    let server = HttpServer::new(move || {
        let app_state = server_state.clone();
        App::new()
            .wrap(ErrorEnvelope)
            .wrap(Logger::default())
            .configure(move |cfg| routes::config(cfg, &app_state))
    })
    .workers(1)
    .listen(listener)
    .expect("Failed to listen")
    .run();
    let handle = server.handle();
    rt::spawn(server);

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{}", port);

    let resp = client
        .get(format!("{}/health", base))
        .send()
        .await
        .expect("health request failed");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let health: Value = resp.json().await.unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["service"], "taskdeck");

    let resp = client
        .post(format!("{}/tasks", base))
        .header(header::CONTENT_TYPE.as_str(), "application/json")
        .body(r#"{"title": ""}"#)
        .send()
        .await
        .expect("create request failed");
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.status_code, 400);
    assert_eq!(body.path.as_deref(), Some("/tasks"));

    let resp = client
        .get(format!("{}/no-such-route", base))
        .send()
        .await
        .expect("unknown route request failed");
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.message, "Not Found");

    handle.stop(true).await;
}
