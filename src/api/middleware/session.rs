//! Cookie-based session identity.
//!
//! Every request gets a [`Session`] extension. Requests carrying a valid
//! `token` cookie are bound to its user; everything else is anonymous until a
//! handler asks for an identity with [`Session::user_id_or_create`], at which
//! point a user is allocated and a fresh token is sent back in `Set-Cookie`.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header::COOKIE, header::SET_COOKIE},
    middleware::Next,
    response::Response,
};
use serde_json::json;
use std::sync::{Arc, OnceLock};
use tokio::sync::OnceCell;

use crate::application::services::AuthService;
use crate::domain::repositories::UserRepository;
use crate::error::AppError;
use crate::state::AppState;

/// Name of the cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

#[derive(Default)]
struct SessionInner {
    user_id: OnceCell<i64>,
    issued_token: OnceLock<String>,
}

/// Identity of the current request.
///
/// Cheap to clone; clones share state, so an identity created by a handler is
/// visible to the middleware that inserted the session.
#[derive(Clone, Default)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// A session with no identity yet.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session bound to an already verified user.
    pub fn authenticated(user_id: i64) -> Self {
        let session = Self::default();
        let _ = session.inner.user_id.set(user_id);
        session
    }

    /// The current user, if the request has one.
    pub fn user_id(&self) -> Option<i64> {
        self.inner.user_id.get().copied()
    }

    /// The current user, or `401 Unauthorized` for anonymous requests.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] if the session has no identity.
    pub fn require_user_id(&self) -> Result<i64, AppError> {
        self.user_id().ok_or_else(|| {
            AppError::unauthorized(
                "Unauthorized",
                json!({ "reason": "Session cookie is missing or invalid" }),
            )
        })
    }

    /// The current user, allocating one and issuing its token if needed.
    ///
    /// At most one user is created per request, however often this is called.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the user cannot be stored or the
    /// token cannot be signed.
    pub async fn user_id_or_create(
        &self,
        auth: &AuthService<dyn UserRepository>,
    ) -> Result<i64, AppError> {
        self.inner
            .user_id
            .get_or_try_init(|| async {
                let user_id = auth.create_user_identity().await?;
                let token = auth.issue_token(user_id)?;
                let _ = self.inner.issued_token.set(token);
                Ok::<_, AppError>(user_id)
            })
            .await
            .copied()
    }

    /// Token issued during this request, if any.
    pub fn issued_token(&self) -> Option<&str> {
        self.inner.issued_token.get().map(String::as_str)
    }
}

/// Resolves the request identity and emits the session cookie when one is issued.
///
/// # Errors
///
/// Returns `401 Unauthorized` if a correctly signed token names user `0`.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/api/user/urls", get(list_user_links_handler))
///     .layer(middleware::from_fn_with_state(state.clone(), session::layer));
/// ```
pub async fn layer(
    State(st): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = match token_from_cookies(req.headers()) {
        None => Session::anonymous(),
        Some(token) => match st.auth_service.parse_token(&token) {
            Ok(parsed) if parsed.valid && parsed.user_id == 0 => {
                return Err(AppError::unauthorized(
                    "Unauthorized",
                    json!({ "reason": "Session token carries no user" }),
                ));
            }
            Ok(parsed) if parsed.valid => Session::authenticated(parsed.user_id),
            Ok(_) => {
                tracing::debug!("Session token expired or not signed by us");
                Session::anonymous()
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unparseable session token");
                Session::anonymous()
            }
        },
    };

    req.extensions_mut().insert(session.clone());
    let mut response = next.run(req).await;

    if let Some(token) = session.issued_token() {
        match HeaderValue::from_str(&format!("{TOKEN_COOKIE}={token}; Path=/; HttpOnly")) {
            Ok(cookie) => {
                response.headers_mut().append(SET_COOKIE, cookie);
            }
            Err(e) => tracing::error!(error = %e, "Issued token is not a valid header value"),
        }
    }

    Ok(response)
}

fn token_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|cookie_header| cookie_header.to_str().ok())
        .flat_map(|cookie_str| cookie_str.split(';'))
        .find_map(|cookie| {
            let mut parts = cookie.trim().splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(TOKEN_COOKIE), Some(value)) if !value.is_empty() => Some(value.to_string()),
                _ => None,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockUserRepository;
    use std::time::Duration;

    fn auth_with(repo: MockUserRepository) -> AuthService<dyn UserRepository> {
        let repo: Arc<dyn UserRepository> = Arc::new(repo);
        AuthService::new(repo, "secret".to_string(), Duration::from_secs(60))
    }

    #[test]
    fn test_token_from_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; token=abc.def.ghi; lang=en"),
        );

        assert_eq!(token_from_cookies(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_token_from_cookies_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("tokenx=1; token="));

        assert_eq!(token_from_cookies(&headers), None);
        assert_eq!(token_from_cookies(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_user_created_once_per_request() {
        let mut repo = MockUserRepository::new();
        repo.expect_create_user().times(1).returning(|| Ok(12));
        let auth = auth_with(repo);

        let session = Session::anonymous();
        assert_eq!(session.user_id_or_create(&auth).await.unwrap(), 12);
        assert_eq!(session.user_id_or_create(&auth).await.unwrap(), 12);

        let token = session.issued_token().unwrap();
        let parsed = auth.parse_token(token).unwrap();
        assert_eq!(parsed.user_id, 12);
        assert!(parsed.valid);
    }

    #[tokio::test]
    async fn test_authenticated_session_issues_nothing() {
        let mut repo = MockUserRepository::new();
        repo.expect_create_user().times(0);
        let auth = auth_with(repo);

        let session = Session::authenticated(4);

        assert_eq!(session.user_id_or_create(&auth).await.unwrap(), 4);
        assert!(session.issued_token().is_none());
    }

    #[test]
    fn test_anonymous_requires_identity() {
        let result = Session::anonymous().require_user_id();
        assert!(matches!(result, Err(AppError::Unauthorized { .. })));
        assert_eq!(Session::authenticated(3).require_user_id().unwrap(), 3);
    }
}
