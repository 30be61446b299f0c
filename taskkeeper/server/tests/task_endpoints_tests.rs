use axum::Router;
use axum::http::StatusCode;
use insta::assert_json_snapshot;
use serde_json::{Value, json};

mod common;

use common::{ADMIN_SECRET, create_user, login, send, setup_app, user_with_session};

async fn post_task(
    app: &Router,
    session: &str,
    owner: &str,
    title: &str,
    start: i64,
    finish: i64,
) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/v1/tasks",
        Some(session),
        Some(json!({
            "userID": owner,
            "title": title,
            "description": "bar",
            "start": start,
            "finish": finish,
        })),
    )
    .await
}

fn titles(body: &Value) -> Vec<&str> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|task| task["title"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn can_run_task_lifecycle_across_roles() {
    let ctx = setup_app().await.expect("Failed to setup app");
    let app = &ctx.app;

    let u1_id = create_user(app, None, "u1", None).await;
    let u1 = login(app, "u1", "u1_password").await;
    create_user(app, None, "u2", None).await;
    let u2 = login(app, "u2", "u2_password").await;
    let (_, manager) = user_with_session(app, "manager", 2).await;

    let (status, created) = post_task(app, &u1, &u1_id, "foo", 1, 100).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["userID"], u1_id.as_str());
    let task_uri = format!("/api/v1/tasks/{}", created["id"].as_str().unwrap());

    let (status, body) = post_task(app, &u2, &u1_id, "foo", 1, 100).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_json_snapshot!(body, @r#"
    {
      "error": "UNAUTHORIZED",
      "message": "not permitted to act on a task belonging to another user"
    }
    "#);

    let (status, fetched) = send(app, "GET", &task_uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, patched) = send(
        app,
        "PATCH",
        &task_uri,
        Some(&u1),
        Some(json!({ "title": "renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["title"], "renamed");
    assert_eq!(patched["start"], 1);
    assert_eq!(patched["finish"], 100);
    assert_eq!(patched["description"], "bar");

    let (status, deleted) = send(app, "DELETE", &task_uri, Some(&u1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, patched);

    let (status, _) = send(app, "DELETE", &task_uri, Some(&u1), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn can_narrow_listing_to_own_tasks() {
    let ctx = setup_app().await.unwrap();
    let app = &ctx.app;
    let (foo_id, foo) = user_with_session(app, "foo", 1).await;
    let (bar_id, bar) = user_with_session(app, "bar", 1).await;
    let (_, manager) = user_with_session(app, "baz", 2).await;
    post_task(app, &foo, &foo_id, "mine", 1, 2).await;
    post_task(app, &bar, &bar_id, "theirs", 1, 2).await;

    let (status, body) = send(app, "GET", "/api/v1/tasks", Some(&foo), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), ["mine"]);

    let uri = format!("/api/v1/tasks?userID={foo_id}");
    let (status, body) = send(app, "GET", &uri, Some(&foo), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), ["mine"]);

    let uri = format!("/api/v1/tasks?userID={bar_id}");
    let (status, body) = send(app, "GET", &uri, Some(&foo), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_json_snapshot!(body, @r#"
    {
      "error": "FORBIDDEN",
      "message": "role User lacks the ViewAllTasks permission"
    }
    "#);

    let (status, body) = send(app, "GET", "/api/v1/tasks", Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(app, "GET", &uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), ["theirs"]);
}

#[tokio::test]
async fn can_filter_listing_by_time_window() {
    let ctx = setup_app().await.unwrap();
    let app = &ctx.app;
    let (foo_id, foo) = user_with_session(app, "foo", 1).await;
    post_task(app, &foo, &foo_id, "early", 100, 1000).await;
    post_task(app, &foo, &foo_id, "late", 5000, 6000).await;

    let (_, body) = send(app, "GET", "/api/v1/tasks?from=95&to=105", Some(&foo), None).await;
    assert_eq!(titles(&body), ["early"]);

    let (_, body) = send(app, "GET", "/api/v1/tasks?from=1001", Some(&foo), None).await;
    assert_eq!(titles(&body), ["late"]);

    let (_, body) = send(app, "GET", "/api/v1/tasks?from=1&to=50", Some(&foo), None).await;
    assert!(titles(&body).is_empty());

    let (status, body) = send(app, "GET", "/api/v1/tasks?from=soon", Some(&foo), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_snapshot!(body, @r#"
    {
      "error": "VALIDATION_ERROR",
      "message": "from field required as int"
    }
    "#);
}

#[tokio::test]
async fn can_hide_foreign_tasks_as_not_found() {
    let ctx = setup_app().await.unwrap();
    let app = &ctx.app;
    let (foo_id, foo) = user_with_session(app, "foo", 1).await;
    let (_, bar) = user_with_session(app, "bar", 1).await;
    let (_, manager) = user_with_session(app, "baz", 2).await;
    let (_, created) = post_task(app, &foo, &foo_id, "mine", 1, 2).await;
    let uri = format!("/api/v1/tasks/{}", created["id"].as_str().unwrap());

    let (status, _) = send(app, "GET", &uri, Some(&bar), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let patch = Some(json!({ "title": "stolen" }));
    let (status, _) = send(app, "PATCH", &uri, Some(&bar), patch.clone()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Managers may look but not touch.
    let (status, _) = send(app, "PATCH", &uri, Some(&manager), patch).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(app, "DELETE", &uri, Some(&bar), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(app, "GET", &uri, Some(&foo), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "mine");
}

#[tokio::test]
async fn can_let_admins_manage_any_task() {
    let ctx = setup_app().await.unwrap();
    let app = &ctx.app;
    let admin = login(app, "boss", ADMIN_SECRET).await;
    let (foo_id, foo) = user_with_session(app, "foo", 1).await;

    let (status, created) = post_task(app, &admin, &foo_id, "assigned", 1, 2).await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/v1/tasks/{}", created["id"].as_str().unwrap());

    let (status, body) = send(app, "GET", &uri, Some(&foo), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "assigned");

    let (status, body) = send(app, "PATCH", &uri, Some(&admin), Some(json!({ "finish": 9 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["finish"], 9);

    let missing_owner = uuid::Uuid::new_v4().to_string();
    let (status, _) = post_task(app, &admin, &missing_owner, "orphan", 1, 2).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn can_validate_task_documents() {
    let ctx = setup_app().await.unwrap();
    let app = &ctx.app;
    let (foo_id, foo) = user_with_session(app, "foo", 1).await;

    let (status, body) = post_task(app, &foo, &foo_id, "inverted", 100, 50).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "start field required as less than finish");

    let (status, body) = send(
        app,
        "POST",
        "/api/v1/tasks",
        Some(&foo),
        Some(json!({ "title": "ownerless", "start": 1, "finish": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "userID field required as user id");

    let (_, created) = post_task(app, &foo, &foo_id, "mine", 10, 100).await;
    let uri = format!("/api/v1/tasks/{}", created["id"].as_str().unwrap());

    let (status, body) = send(app, "PATCH", &uri, Some(&foo), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "body is empty");

    let (status, _) = send(app, "PATCH", &uri, Some(&foo), Some(json!({ "start": 500 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(app, "GET", "/api/v1/tasks/nope", Some(&foo), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_snapshot!(body, @r#"
    {
      "error": "VALIDATION_ERROR",
      "message": "taskID field required as uuid"
    }
    "#);
}

#[tokio::test]
async fn can_route_tasks_under_their_owner() {
    let ctx = setup_app().await.unwrap();
    let app = &ctx.app;
    let (foo_id, foo) = user_with_session(app, "foo", 1).await;
    let (bar_id, _) = user_with_session(app, "bar", 1).await;

    let uri = format!("/api/v1/users/{foo_id}/tasks");
    let (status, body) = send(
        app,
        "POST",
        &uri,
        Some(&foo),
        Some(json!({ "title": "nested", "start": 1, "finish": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["userID"], foo_id.as_str());

    let (status, body) = send(app, "GET", &format!("{uri}?from=1"), Some(&foo), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), ["nested"]);

    let foreign = format!("/api/v1/users/{bar_id}/tasks");
    let (status, _) = send(app, "GET", &foreign, Some(&foo), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        app,
        "POST",
        &foreign,
        Some(&foo),
        Some(json!({ "title": "nested", "start": 1, "finish": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn can_report_undecodable_bound_as_validation_error() {
    let ctx = setup_app().await.unwrap();
    let app = &ctx.app;
    let (foo_id, foo) = user_with_session(app, "foo", 1).await;

    let (status, body) = send(
        app,
        "POST",
        "/api/v1/tasks",
        Some(&foo),
        Some(json!({ "userID": foo_id, "title": "foo", "start": "abc", "finish": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_snapshot!(body, @r#"
    {
      "error": "VALIDATION_ERROR",
      "message": "start: invalid type: string \"abc\", expected i64"
    }
    "#);
}
