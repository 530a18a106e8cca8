mod common;

use axum::http::{Method, StatusCode};
use common::*;
use contest_portal::{
    dispatch::TypedResponse,
    models::{Announcement, DocumentLink, Problem, ShowNameResponse, User, UserProfile},
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

fn decode<T: DeserializeOwned>(response: &TypedResponse) -> T {
    serde_json::from_value(response.body.clone()).expect("body matches model")
}

async fn send(
    repo: &Arc<MockRepository>,
    method: Method,
    uri: &str,
    body: &str,
    context: contest_portal::auth::RequestContext,
) -> TypedResponse {
    test_dispatcher(repo.clone())
        .dispatch(request(method, uri, body, context))
        .await
}

// --- System ---

#[tokio::test]
async fn ping_requires_login() {
    let repo = Arc::new(MockRepository::seeded());
    assert_eq!(send(&repo, Method::GET, "/ping", "", anonymous()).await.status, StatusCode::UNAUTHORIZED);

    let response = send(&repo, Method::GET, "/ping", "", as_user(5)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "pong");
}

// --- Announcements ---

#[tokio::test]
async fn users_see_only_shown_announcements() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::GET, "/announcement", "", as_user(5)).await;

    assert_eq!(response.status, StatusCode::OK);
    let listed: Vec<Announcement> = decode(&response);
    assert_eq!(listed.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1]);
}

#[tokio::test]
async fn admins_see_hidden_announcements_newest_first() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::GET, "/announcement", "", as_admin()).await;

    let listed: Vec<Announcement> = decode(&response);
    assert_eq!(listed.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2, 1]);
}

#[tokio::test]
async fn contest_announcements_are_scoped() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::GET, "/announcement/contest/10", "", as_user(5)).await;

    let listed: Vec<Announcement> = decode(&response);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].contest_id, Some(10));
}

#[tokio::test]
async fn admin_creates_announcement() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::POST, "/announcement", r#"{"value":"Round 2"}"#, as_admin()).await;

    assert_eq!(response.status, StatusCode::CREATED);
    let created: Announcement = decode(&response);
    assert_eq!(created.value, "Round 2");
    assert!(created.show);
    assert_eq!(created.contest_id, None);
}

#[tokio::test]
async fn contest_announcement_carries_contest_id() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(
        &repo,
        Method::POST,
        "/announcement/contest/42",
        r#"{"value":"Freeze in 1h"}"#,
        as_admin(),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(decode::<Announcement>(&response).contest_id, Some(42));
}

#[tokio::test]
async fn announcement_without_value_is_400_message() {
    let repo = Arc::new(MockRepository::seeded());
    for body in ["{}", r#"{"value":"   "}"#] {
        let response = send(&repo, Method::POST, "/announcement", body, as_admin()).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["message"], "No value is sent");
    }
    assert_eq!(repo.announcements.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn delete_missing_announcement_is_404() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::DELETE, "/announcement/99", "", as_admin()).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "Announcement not found");
}

#[tokio::test]
async fn delete_returns_removed_announcement() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::DELETE, "/announcement/2", "", as_admin()).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(decode::<Announcement>(&response).value, "Draft");
    assert_eq!(repo.announcements.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn show_toggles_visibility() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::PATCH, "/announcement/2", r#"{"show":true}"#, as_admin()).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(decode::<Announcement>(&response).show);
}

#[tokio::test]
async fn update_changes_only_provided_fields() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::PUT, "/announcement/1", r#"{"value":"Welcome!"}"#, as_admin()).await;

    let updated: Announcement = decode(&response);
    assert_eq!(updated.value, "Welcome!");
    assert!(updated.show);
}

// --- Users ---

#[tokio::test]
async fn user_listing_is_admin_only() {
    let repo = Arc::new(MockRepository::seeded());
    assert_eq!(send(&repo, Method::GET, "/user", "", as_user(5)).await.status, StatusCode::FORBIDDEN);

    let response = send(&repo, Method::GET, "/user", "", as_admin()).await;
    assert_eq!(decode::<Vec<User>>(&response).len(), 3);
}

#[tokio::test]
async fn online_users_route_wins_over_user_id() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::GET, "/user/online", "", as_user(6)).await;

    assert_eq!(response.status, StatusCode::OK);
    let online: Vec<User> = decode(&response);
    assert_eq!(online.iter().map(|u| u.id).collect::<Vec<_>>(), vec![5]);
}

#[tokio::test]
async fn profile_hides_role() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::GET, "/user/1/profile", "", as_user(5)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.get("role").is_none());
    assert_eq!(decode::<UserProfile>(&response).username, "root");

    let missing = send(&repo, Method::GET, "/user/404/profile", "", as_user(5)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_updates_user_role() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::PUT, "/user/5", r#"{"role":"admin","rating":1800}"#, as_admin()).await;

    assert_eq!(response.status, StatusCode::OK);
    let updated: User = decode(&response);
    assert_eq!(updated.role, "admin");
    assert_eq!(updated.rating, 1800);
}

#[tokio::test]
async fn unknown_role_is_400_message() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::PUT, "/user/5", r#"{"role":"root"}"#, as_admin()).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "unknown role: root");
    assert_eq!(repo.users.lock().unwrap()[1].role, "user");
}

#[tokio::test]
async fn rating_beyond_32_bits_is_stored() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::PUT, "/user/5", r#"{"rating":3000000000}"#, as_admin()).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(decode::<User>(&response).rating, 3_000_000_000);
}

#[tokio::test]
async fn rating_beyond_i64_is_400_issue() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::PUT, "/user/5", r#"{"rating":10000000000000000000}"#, as_admin()).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "validation_error");
    assert_eq!(response.body["issues"][0]["field"], "body.rating");
    assert_eq!(response.body["issues"][0]["received"], "integer out of range");
    assert_eq!(repo.users.lock().unwrap()[1].rating, 1500);
}

#[tokio::test]
async fn user_renames_themself() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::PATCH, "/user/5/name", r#"{"showName":" Ally "}"#, as_user(5)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        decode::<ShowNameResponse>(&response),
        ShowNameResponse { show_name: "Ally".to_string() }
    );
}

#[tokio::test]
async fn admin_renames_anyone() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::PATCH, "/user/6/name", r#"{"showName":"Robert"}"#, as_admin()).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(repo.users.lock().unwrap()[2].show_name, "Robert");
}

#[tokio::test]
async fn blank_show_name_is_400_message() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::PATCH, "/user/5/name", r#"{"showName":""}"#, as_user(5)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["message"].is_string());
}

#[tokio::test]
async fn rename_of_missing_user_is_404() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::PATCH, "/user/77/name", r#"{"showName":"Ghost"}"#, as_admin()).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// --- Problems ---

#[tokio::test]
async fn problem_search_filters_by_name() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::GET, "/problem?search=PATH", "", as_user(5)).await;

    let found: Vec<Problem> = decode(&response);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].sname, "sssp");
}

#[tokio::test]
async fn problem_list_rejects_unknown_query() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::GET, "/problem?limit=5", "", as_user(5)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(repo.call_count(), 0);
}

#[tokio::test]
async fn single_problem_and_missing_problem() {
    let repo = Arc::new(MockRepository::seeded());
    let found = send(&repo, Method::GET, "/problem/2", "", as_user(5)).await;
    assert_eq!(decode::<Problem>(&found).name, "Shortest Path");

    let missing = send(&repo, Method::GET, "/problem/9", "", as_user(5)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["message"], "Problem not found");
}

#[tokio::test]
async fn problem_document_is_a_presigned_link() {
    let repo = Arc::new(MockRepository::seeded());
    let response = send(&repo, Method::GET, "/problem/doc/1", "", as_user(5)).await;

    assert_eq!(response.status, StatusCode::OK);
    let link: DocumentLink = decode(&response);
    assert!(link.url.contains("docs/aplusb.pdf"));
    assert_eq!(link.expires_in, 600);
}
