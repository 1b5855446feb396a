#![allow(dead_code)]

use axum::http::{HeaderValue, header};
use axum_test::{TestResponse, TestServer};
use clap::Parser;
use shortener::config::Config;
use shortener::infrastructure::memory::FileStorage;
use shortener::routes::app_router;
use shortener::server::{Storage, build_state};
use shortener::state::AppState;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub fn test_config() -> Config {
    Config::try_parse_from([
        "shortener",
        "-f",
        "",
        "-b",
        "http://localhost:8080",
        "--token-secret",
        "test-signing-secret",
        "--deletion-flush-interval-ms",
        "50",
    ])
    .unwrap()
}

pub fn file_storage(store: FileStorage) -> Storage {
    let store = Arc::new(store);
    Storage {
        links: store.clone(),
        users: store,
    }
}

pub fn create_test_state() -> AppState {
    build_state(&test_config(), &file_storage(FileStorage::in_memory()))
}

pub async fn create_persistent_state(path: &Path) -> AppState {
    let store = FileStorage::open(path).await.unwrap();
    build_state(&test_config(), &file_storage(store))
}

pub fn create_test_server(state: AppState) -> TestServer {
    TestServer::new(app_router(state)).unwrap()
}

/// Returns the `token=...` pair from the response's `Set-Cookie` header, if any.
pub fn session_cookie(response: &TestResponse) -> Option<HeaderValue> {
    let set_cookie = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    let pair = set_cookie.split(';').next()?.trim();
    pair.starts_with("token=")
        .then(|| HeaderValue::from_str(pair).ok())
        .flatten()
}

/// Shortens `url` through the plain-text endpoint and returns the session
/// cookie and the short URL.
pub async fn shorten_as_new_user(server: &TestServer, url: &str) -> (HeaderValue, String) {
    let response = server.post("/").text(url).await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let cookie = session_cookie(&response).unwrap();
    (cookie, response.text())
}

/// Extracts the ident from a short URL.
pub fn ident_of(short_url: &str) -> String {
    short_url.rsplit('/').next().unwrap().to_string()
}
