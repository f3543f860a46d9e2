//! ClickUp client tests against an in-process fake API server.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use deferack::clock::ManualClock;
use deferack::error::Error;
use deferack::model::TaskId;
use deferack::scheduler::{DeferredScheduler, DelayRange, SchedulerConfig};
use deferack::source::{ClickUpClient, TaskSource};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TOKEN: &str = "pk_test_token";
const LIST: &str = "901";

// ---------------------------------------------------------------------------
// Fake server
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeApi {
    /// (id, status) in list order
    tasks: Vec<(String, String)>,
    page_size: usize,
    list_queries: Vec<HashMap<String, String>>,
    puts: Vec<(String, Value)>,
}

type Shared = Arc<Mutex<FakeApi>>;

fn unauthorized(headers: &HeaderMap) -> Option<Response> {
    let ok = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == TOKEN);
    (!ok).then(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"err": "Token invalid", "ECODE": "OAUTH_025"})),
        )
            .into_response()
    })
}

fn task_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Task {id}"),
        "status": {"status": status, "type": "custom", "color": "#d3d3d3"},
    })
}

async fn list_tasks(
    State(api): State<Shared>,
    Path(list_id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    if list_id == "garbage" {
        return "<html>maintenance</html>".into_response();
    }

    let mut api = api.lock().unwrap();
    api.list_queries.push(query.clone());
    let wanted = query.get("statuses[]").cloned().unwrap_or_default();
    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let size = if api.page_size == 0 { 100 } else { api.page_size };

    let matching: Vec<Value> = api
        .tasks
        .iter()
        .filter(|(_, status)| status.eq_ignore_ascii_case(&wanted))
        .map(|(id, status)| task_json(id, status))
        .collect();
    let start = (page * size).min(matching.len());
    let end = (start + size).min(matching.len());
    let page_tasks = matching[start..end].to_vec();

    Json(json!({
        "tasks": page_tasks,
        "last_page": end >= matching.len(),
    }))
    .into_response()
}

async fn get_task(State(api): State<Shared>, Path(id): Path<String>, headers: HeaderMap) -> Response {
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    let api = api.lock().unwrap();
    match api.tasks.iter().find(|(tid, _)| *tid == id) {
        Some((tid, status)) => Json(task_json(tid, status)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"err": "Task not found, deleted", "ECODE": "ITEM_013"})),
        )
            .into_response(),
    }
}

async fn put_task(
    State(api): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    let mut api = api.lock().unwrap();
    api.puts.push((id.clone(), body.clone()));
    let Some(new_status) = body.get("status").and_then(Value::as_str) else {
        return (StatusCode::BAD_REQUEST, "missing status").into_response();
    };
    match api.tasks.iter_mut().find(|(tid, _)| *tid == id) {
        Some(task) => {
            task.1 = new_status.to_string();
            Json(task_json(&task.0, &task.1)).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"err": "Task not found"}))).into_response(),
    }
}

async fn spawn_server(api: FakeApi) -> (String, Shared) {
    let shared: Shared = Arc::new(Mutex::new(api));
    let app = Router::new()
        .route("/list/{list_id}/task", get(list_tasks))
        .route("/task/{id}", get(get_task).put(put_task))
        .with_state(Arc::clone(&shared));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), shared)
}

fn api_with(tasks: &[(&str, &str)], page_size: usize) -> FakeApi {
    FakeApi {
        tasks: tasks
            .iter()
            .map(|(id, s)| (id.to_string(), s.to_string()))
            .collect(),
        page_size,
        ..Default::default()
    }
}

fn client(base: &str, token: &str, list: &str) -> ClickUpClient {
    ClickUpClient::new(
        &SecretString::from(token.to_string()),
        list,
        Some(base),
        Duration::from_secs(5),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Adapter operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_follows_pages_and_filters_by_status() {
    let (base, api) = spawn_server(api_with(
        &[
            ("a", "to be reviewed"),
            ("b", "in progress"),
            ("c", "to be reviewed"),
            ("d", "to be reviewed"),
            ("e", "acknowledged"),
            ("f", "To Be Reviewed"),
            ("g", "to be reviewed"),
        ],
        2,
    ))
    .await;

    let ids = client(&base, TOKEN, LIST)
        .list_in_status("to be reviewed")
        .await
        .unwrap();
    let expected: Vec<TaskId> = ["a", "c", "d", "f", "g"].into_iter().map(TaskId::from).collect();
    assert_eq!(ids, expected);

    let api = api.lock().unwrap();
    assert_eq!(api.list_queries.len(), 3);
    for (page, query) in api.list_queries.iter().enumerate() {
        assert_eq!(query.get("archived").map(String::as_str), Some("false"));
        assert_eq!(query.get("page"), Some(&page.to_string()));
    }
}

#[tokio::test]
async fn list_on_empty_status_returns_nothing() {
    let (base, api) = spawn_server(api_with(&[("a", "in progress")], 0)).await;
    let ids = client(&base, TOKEN, LIST)
        .list_in_status("to be reviewed")
        .await
        .unwrap();
    assert!(ids.is_empty());
    assert_eq!(api.lock().unwrap().list_queries.len(), 1);
}

#[tokio::test]
async fn get_status_reads_nested_status_name() {
    let (base, _) = spawn_server(api_with(&[("a", "in progress")], 0)).await;
    let status = client(&base, TOKEN, LIST)
        .get_status(&TaskId::from("a"))
        .await
        .unwrap();
    assert_eq!(status, "in progress");
}

#[tokio::test]
async fn set_status_puts_json_body() {
    let (base, api) = spawn_server(api_with(&[("a", "to be reviewed")], 0)).await;
    client(&base, TOKEN, LIST)
        .set_status(&TaskId::from("a"), "acknowledged")
        .await
        .unwrap();

    let api = api.lock().unwrap();
    assert_eq!(api.puts, vec![("a".to_string(), json!({"status": "acknowledged"}))]);
    assert_eq!(api.tasks[0].1, "acknowledged");
}

#[tokio::test]
async fn rejected_token_surfaces_api_error() {
    let (base, _) = spawn_server(api_with(&[("a", "to be reviewed")], 0)).await;
    let err = client(&base, "wrong", LIST)
        .list_in_status("to be reviewed")
        .await
        .unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Token invalid [OAUTH_025]");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_task_is_a_404() {
    let (base, _) = spawn_server(api_with(&[], 0)).await;
    let err = client(&base, TOKEN, LIST)
        .get_status(&TaskId::from("gone"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Api { status: 404, .. }), "got {err:?}");
}

#[tokio::test]
async fn non_json_body_is_a_decode_error() {
    let (base, _) = spawn_server(api_with(&[], 0)).await;
    let err = client(&base, TOKEN, "garbage")
        .list_in_status("to be reviewed")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_server_is_an_http_error() {
    let err = client("http://127.0.0.1:1", TOKEN, LIST)
        .list_in_status("to be reviewed")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http(_)), "got {err:?}");
}

#[test]
fn token_with_newline_is_rejected() {
    let err = ClickUpClient::new(
        &SecretString::from("pk\nbad".to_string()),
        LIST,
        None,
        Duration::from_secs(5),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

// ---------------------------------------------------------------------------
// Scheduler over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scheduler_acknowledges_through_the_api() {
    let (base, api) = spawn_server(api_with(
        &[("a", "to be reviewed"), ("b", "to be reviewed"), ("c", "open")],
        0,
    ))
    .await;
    let clock = ManualClock::starting_now();
    let mut scheduler = DeferredScheduler::new(
        Arc::new(client(&base, TOKEN, LIST)),
        Arc::new(clock.clone()),
        SchedulerConfig {
            target_status: "to be reviewed".to_string(),
            final_status: "acknowledged".to_string(),
            delay: DelayRange::fixed(Duration::from_secs(60)),
            poll_interval: Duration::from_secs(60),
        },
    );

    assert_eq!(scheduler.run_once().await.armed, 2);

    // b gets picked up by a person while deferred
    api.lock().unwrap().tasks[1].1 = "in progress".to_string();
    clock.advance(Duration::from_secs(60));

    let report = scheduler.run_once().await;
    assert_eq!(report.acknowledged, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.pending_after, 0);

    let api = api.lock().unwrap();
    let statuses: Vec<&str> = api.tasks.iter().map(|(_, s)| s.as_str()).collect();
    assert_eq!(statuses, vec!["acknowledged", "in progress", "open"]);
    assert_eq!(api.puts.len(), 1);
}
