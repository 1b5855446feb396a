mod common;

use axum::http::{StatusCode, header};
use tempfile::TempDir;

#[tokio::test]
async fn test_redirect_to_original_url() {
    let server = common::create_test_server(common::create_test_state());
    let (_, short_url) = common::shorten_as_new_user(&server, "https://example.com/page?q=1").await;

    let response = server.get(&format!("/{}", common::ident_of(&short_url))).await;

    response.assert_status(StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://example.com/page?q=1"
    );
}

#[tokio::test]
async fn test_redirect_unknown_ident() {
    let server = common::create_test_server(common::create_test_state());

    let response = server.get("/doesnotexist").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_redirect_does_not_create_identity() {
    let server = common::create_test_server(common::create_test_state());

    let response = server.get("/whatever").await;

    assert!(common::session_cookie(&response).is_none());
}

#[tokio::test]
async fn test_redirect_deleted_link_is_gone() {
    let state = common::create_test_state();
    let server = common::create_test_server(state.clone());
    let (cookie, short_url) = common::shorten_as_new_user(&server, "https://example.com").await;
    let ident = common::ident_of(&short_url);

    server
        .delete("/api/user/urls")
        .add_header(header::COOKIE, cookie)
        .json(&vec![ident.clone()])
        .await
        .assert_status(StatusCode::ACCEPTED);

    state.deletion.stop(common::STOP_TIMEOUT).await.unwrap();

    let response = server.get(&format!("/{ident}")).await;
    response.assert_status(StatusCode::GONE);
}

#[tokio::test]
async fn test_links_survive_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short-url-db.json");

    let short_url = {
        let state = common::create_persistent_state(&path).await;
        let server = common::create_test_server(state.clone());
        let (_, short_url) = common::shorten_as_new_user(&server, "https://example.com").await;
        state.deletion.stop(common::STOP_TIMEOUT).await.unwrap();
        short_url
    };

    let server = common::create_test_server(common::create_persistent_state(&path).await);
    let response = server.get(&format!("/{}", common::ident_of(&short_url))).await;

    response.assert_status(StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://example.com"
    );
}
