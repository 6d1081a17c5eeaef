/// Integration tests for the TaskFlow API
///
/// These run the full router against a real PostgreSQL database with
/// recording doubles for email and object storage. They skip themselves
/// when DATABASE_URL is not set.
///
/// Tests share one database, so every assertion over listings narrows
/// with a per-test unique search marker instead of trusting totals.

mod common;

use axum::http::StatusCode;
use common::{multipart_upload, TestContext};
use serde_json::json;
use taskflow_shared::models::user::UserRole;
use uuid::Uuid;

fn marker() -> String {
    Uuid::new_v4().simple().to_string()
}

#[tokio::test]
async fn test_register_login_profile_flow() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let email = format!("flow-{}@example.com", marker());
    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "email": email,
                "password": "Passw0rd!",
                "first_name": "Ada",
                "last_name": "Lovelace"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "register failed: {}", body);
    assert!(body["access_token"].is_string());
    assert_eq!(body["user"]["role"], "user");
    // Password material must never appear in responses
    assert!(body["user"].get("password_hash").is_none());

    // Registration queued a verification email
    {
        let sent = ctx.mailer.sent.lock().unwrap();
        assert!(sent.iter().any(|e| e.to == email));
    }

    let (status, login_body) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "Passw0rd!" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = login_body["access_token"].as_str().unwrap().to_string();

    let (status, profile) = ctx
        .request("GET", "/v1/auth/profile", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"].as_str().unwrap().to_lowercase(), email);

    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(&email)
        .execute(&ctx.db)
        .await
        .ok();
    ctx.cleanup().await;
}

#[tokio::test]
async fn test_refresh_token_rotation() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let email = format!("rotate-{}@example.com", marker());
    let (_, body) = ctx
        .request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "email": email,
                "password": "Passw0rd!",
                "first_name": "Rey",
                "last_name": "Fresh"
            })),
        )
        .await;
    let old_refresh = body["refresh_token"].as_str().unwrap().to_string();

    let (status, refreshed) = ctx
        .request(
            "POST",
            "/v1/auth/refresh-token",
            None,
            Some(json!({ "refresh_token": old_refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(refreshed["access_token"].is_string());

    // The old handle was rotated out, replaying it must fail
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/refresh-token",
            None,
            Some(json!({ "refresh_token": old_refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(&email)
        .execute(&ctx.db)
        .await
        .ok();
    ctx.cleanup().await;
}

#[tokio::test]
async fn test_task_lifecycle_records_activity() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let user = ctx.create_user(UserRole::User).await;
    let token = ctx.token_for(&user);
    let title = format!("Lifecycle {}", marker());

    let (status, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&token),
            Some(json!({ "title": title, "description": "end to end" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", task);
    assert_eq!(task["status"], "todo");
    assert_eq!(task["priority"], "medium");
    let task_id = task["id"].as_str().unwrap().to_string();

    let (status, updated) = ctx
        .request(
            "PUT",
            &format!("/v1/tasks/{}", task_id),
            Some(&token),
            Some(json!({ "status": "in-progress" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "in-progress");

    // Exactly one broadcast for a status-only update, carrying both ends
    // of the transition
    let broadcasts = ctx.realtime.on_channel(&format!("task:{}", task_id));
    assert_eq!(broadcasts.len(), 1, "broadcasts: {:?}", broadcasts);
    assert_eq!(broadcasts[0]["type"], "task_status_changed");
    assert_eq!(broadcasts[0]["metadata"]["oldStatus"], "todo");
    assert_eq!(broadcasts[0]["metadata"]["newStatus"], "in-progress");

    let (status, activity) = ctx
        .request(
            "GET",
            &format!("/v1/tasks/{}/activity", task_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = activity
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["activity_type"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"task_created"));
    assert!(kinds.contains(&"task_status_changed"));

    // Entries carry the acting user
    for entry in activity.as_array().unwrap() {
        assert_eq!(entry["user"]["id"], json!(user.id));
    }

    let (status, _) = ctx
        .request("DELETE", &format!("/v1/tasks/{}", task_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .request("GET", &format!("/v1/tasks/{}", task_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The deletion entry survives the task with a null task reference
    let (_, my_activity) = ctx.request("GET", "/v1/activity", Some(&token), None).await;
    let deleted_entry = my_activity
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["activity_type"] == "task_deleted")
        .expect("no task_deleted entry");
    assert!(deleted_entry["task_id"].is_null());
    assert!(deleted_entry["task"].is_null());

    // Deletion is log-only; nothing new on the task channel
    assert_eq!(
        ctx.realtime.on_channel(&format!("task:{}", task_id)).len(),
        1
    );

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_list_scoping_by_role() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let creator = ctx.create_user(UserRole::User).await;
    let outsider = ctx.create_user(UserRole::User).await;
    let assignee = ctx.create_user(UserRole::User).await;
    let manager = ctx.create_user(UserRole::Manager).await;
    let admin = ctx.create_user(UserRole::Admin).await;

    let tag = marker();
    let creator_token = ctx.token_for(&creator);

    // One unassigned and one assigned task from the same creator
    ctx.request(
        "POST",
        "/v1/tasks",
        Some(&creator_token),
        Some(json!({ "title": format!("Unassigned {}", tag) })),
    )
    .await;
    ctx.request(
        "POST",
        "/v1/tasks",
        Some(&creator_token),
        Some(json!({ "title": format!("Assigned {}", tag), "assigned_to": assignee.id })),
    )
    .await;

    let list = |token: String, tag: String| {
        let ctx = &ctx;
        async move {
            let (status, body) = ctx
                .request(
                    "GET",
                    &format!("/v1/tasks?search={}", tag),
                    Some(&token),
                    None,
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            body["tasks"].as_array().unwrap().len()
        }
    };

    // Creator sees both of their tasks
    assert_eq!(list(ctx.token_for(&creator), tag.clone()).await, 2);
    // An uninvolved USER sees neither
    assert_eq!(list(ctx.token_for(&outsider), tag.clone()).await, 0);
    // The assignee sees the one they hold
    assert_eq!(list(ctx.token_for(&assignee), tag.clone()).await, 1);
    // A MANAGER sees assigned tasks but not the unassigned one
    assert_eq!(list(ctx.token_for(&manager), tag.clone()).await, 1);
    // An ADMIN sees everything
    assert_eq!(list(ctx.token_for(&admin), tag.clone()).await, 2);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_assignment_notifies_assignee_by_email() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let manager = ctx.create_user(UserRole::Manager).await;
    let assignee = ctx.create_user(UserRole::User).await;
    let token = ctx.token_for(&manager);

    let (_, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&token),
            Some(json!({ "title": format!("Handoff {}", marker()) })),
        )
        .await;
    let task_id = task["id"].as_str().unwrap();

    let (status, updated) = ctx
        .request(
            "PUT",
            &format!("/v1/tasks/{}", task_id),
            Some(&token),
            Some(json!({ "assigned_to": assignee.id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["assigned_to_user"]["id"], json!(assignee.id));

    {
        let sent = ctx.mailer.sent.lock().unwrap();
        let email = sent
            .iter()
            .find(|e| e.to == assignee.email)
            .expect("no assignment email");
        assert!(email.subject.contains("assigned"));
        assert!(
            email.html.contains(&manager.full_name()),
            "assigner name missing from {}",
            email.html
        );
    }

    // Exactly one personal push to the new assignee
    let pushes = ctx.realtime.on_channel(&format!("user:{}", assignee.id));
    assert_eq!(pushes.len(), 1, "pushes: {:?}", pushes);
    assert_eq!(pushes[0]["type"], "task_assigned");

    // Unassigning sends nothing new
    let before = ctx.mailer.sent.lock().unwrap().len();
    ctx.request(
        "PUT",
        &format!("/v1/tasks/{}", task_id),
        Some(&token),
        Some(json!({ "assigned_to": null })),
    )
    .await;
    assert_eq!(ctx.mailer.sent.lock().unwrap().len(), before);
    assert_eq!(
        ctx.realtime.on_channel(&format!("user:{}", assignee.id)).len(),
        1
    );

    // But it is still on the record
    let (_, activity) = ctx
        .request(
            "GET",
            &format!("/v1/tasks/{}/activity", task_id),
            Some(&token),
            None,
        )
        .await;
    let unassigned = activity
        .as_array()
        .unwrap()
        .iter()
        .any(|e| {
            e["activity_type"] == "task_assigned"
                && e["description"].as_str().unwrap().starts_with("Unassigned")
        });
    assert!(unassigned, "no unassignment entry: {}", activity);

    // An assignee that does not exist is a missing resource
    let (status, _) = ctx
        .request(
            "PUT",
            &format!("/v1/tasks/{}", task_id),
            Some(&token),
            Some(json!({ "assigned_to": uuid::Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_update_policy_for_user_role() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let creator = ctx.create_user(UserRole::User).await;
    let outsider = ctx.create_user(UserRole::User).await;
    let manager = ctx.create_user(UserRole::Manager).await;

    let (_, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&ctx.token_for(&creator)),
            Some(json!({ "title": format!("Guarded {}", marker()) })),
        )
        .await;
    let task_id = task["id"].as_str().unwrap();

    // An uninvolved USER cannot touch it
    let (status, _) = ctx
        .request(
            "PUT",
            &format!("/v1/tasks/{}", task_id),
            Some(&ctx.token_for(&outsider)),
            Some(json!({ "status": "review" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A MANAGER can
    let (status, _) = ctx
        .request(
            "PUT",
            &format!("/v1/tasks/{}", task_id),
            Some(&ctx.token_for(&manager)),
            Some(json!({ "status": "review" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // But a USER cannot delete someone else's task
    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("/v1/tasks/{}", task_id),
            Some(&ctx.token_for(&outsider)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_comments_are_author_owned() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let author = ctx.create_user(UserRole::User).await;
    let admin = ctx.create_user(UserRole::Admin).await;
    let author_token = ctx.token_for(&author);

    let (_, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&author_token),
            Some(json!({ "title": format!("Discussed {}", marker()) })),
        )
        .await;
    let task_id = task["id"].as_str().unwrap();

    let (status, comment) = ctx
        .request(
            "POST",
            &format!("/v1/tasks/{}/comments", task_id),
            Some(&author_token),
            Some(json!({ "content": "first!" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = comment["id"].as_str().unwrap();

    // The detail view carries the comment with its author stitched on
    let (status, detail) = ctx
        .request("GET", &format!("/v1/tasks/{}", task_id), Some(&author_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let comments = detail["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["user"]["id"], json!(author.id));
    assert!(detail["attachments"].as_array().unwrap().is_empty());

    // Not even an admin can edit or delete someone else's comment
    let (status, _) = ctx
        .request(
            "PUT",
            &format!("/v1/comments/{}", comment_id),
            Some(&ctx.token_for(&admin)),
            Some(json!({ "content": "overwritten" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("/v1/comments/{}", comment_id),
            Some(&ctx.token_for(&admin)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The author can
    let (status, edited) = ctx
        .request(
            "PUT",
            &format!("/v1/comments/{}", comment_id),
            Some(&author_token),
            Some(json!({ "content": "edited" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["content"], "edited");

    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("/v1/comments/{}", comment_id),
            Some(&author_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_favorites_roundtrip_and_duplicate_conflict() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let user = ctx.create_user(UserRole::User).await;
    let token = ctx.token_for(&user);

    let (_, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&token),
            Some(json!({ "title": format!("Starred {}", marker()) })),
        )
        .await;
    let task_id = task["id"].as_str().unwrap();

    let favorite_uri = format!("/v1/tasks/{}/favorite", task_id);

    let (status, _) = ctx.request("POST", &favorite_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = ctx.request("POST", &favorite_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, check) = ctx.request("GET", &favorite_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["favorited"], json!(true));

    let (status, favorites) = ctx.request("GET", "/v1/favorites", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(favorites
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["id"].as_str() == Some(task_id)));

    let (status, _) = ctx
        .request("DELETE", &favorite_uri, Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, check) = ctx.request("GET", &favorite_uri, Some(&token), None).await;
    assert_eq!(check["favorited"], json!(false));

    let (status, _) = ctx
        .request("DELETE", &favorite_uri, Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_file_upload_validation_and_storage() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let user = ctx.create_user(UserRole::User).await;
    let token = ctx.token_for(&user);

    let (_, task) = ctx
        .request(
            "POST",
            "/v1/tasks",
            Some(&token),
            Some(json!({ "title": format!("Attachments {}", marker()) })),
        )
        .await;
    let task_id = task["id"].as_str().unwrap();
    let upload_uri = format!("/v1/tasks/{}/files", task_id);

    // Happy path
    let request = multipart_upload(&upload_uri, &token, "shot.png", "image/png", b"fake png");
    let (status, attachment) = ctx.send(request).await;
    assert_eq!(status, StatusCode::CREATED, "upload failed: {}", attachment);
    assert_eq!(attachment["filename"], "shot.png");
    assert_eq!(ctx.storage.uploads.lock().unwrap().len(), 1);

    // Disallowed type is rejected before any byte reaches storage
    let request = multipart_upload(&upload_uri, &token, "evil.html", "text/html", b"<html>");
    let (status, _) = ctx.send(request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(ctx.storage.uploads.lock().unwrap().len(), 1);

    // One byte over the cap
    let oversized = vec![0u8; 10 * 1024 * 1024 + 1];
    let request = multipart_upload(&upload_uri, &token, "big.png", "image/png", &oversized);
    let (status, _) = ctx.send(request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(ctx.storage.uploads.lock().unwrap().len(), 1);

    // Well over the cap, where the router's body limit trips first
    let huge = vec![0u8; 11 * 1024 * 1024];
    let request = multipart_upload(&upload_uri, &token, "huge.png", "image/png", &huge);
    let (status, _) = ctx.send(request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(ctx.storage.uploads.lock().unwrap().len(), 1);

    // Deleting the attachment removes the remote object too
    let attachment_id = attachment["id"].as_str().unwrap();
    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("/v1/files/{}", attachment_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctx.storage.deletes.lock().unwrap().len(), 1);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_user_listing_requires_elevated_role() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let user = ctx.create_user(UserRole::User).await;
    let manager = ctx.create_user(UserRole::Manager).await;

    let (status, _) = ctx
        .request("GET", "/v1/users", Some(&ctx.token_for(&user)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = ctx
        .request("GET", "/v1/users", Some(&ctx.token_for(&manager)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(users.as_array().unwrap().len() >= 2);

    // A USER can still read their own record
    let (status, me) = ctx
        .request(
            "GET",
            &format!("/v1/users/{}", user.id),
            Some(&ctx.token_for(&user)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], json!(user.id));

    // But nobody else's
    let (status, _) = ctx
        .request(
            "GET",
            &format!("/v1/users/{}", manager.id),
            Some(&ctx.token_for(&user)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let (status, _) = ctx.request("GET", "/v1/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .request("GET", "/v1/tasks", Some("not-a-real-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Health stays public
    let (status, health) = ctx.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["database"], "connected");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_validation_errors_are_structured() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "email": "not-an-email",
                "password": "short",
                "first_name": "",
                "last_name": "X"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert!(body["details"].as_array().unwrap().len() >= 2);

    ctx.cleanup().await;
}
