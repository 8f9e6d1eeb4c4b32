//! Request middleware: access log and Basic Auth.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, info, warn};

/// Paths reachable without credentials. Also kept out of the access log.
const PUBLIC_PATHS: [&str; 1] = ["/api/v1/health"];

/// Authenticated username, attached to the response by [`basic_auth_middleware`].
#[derive(Clone)]
pub(crate) struct AuthUser(pub(crate) String);

#[derive(Clone)]
pub(crate) struct Credentials {
    pub(crate) user: String,
    pub(crate) password: String,
}

// ============================================================
// Access log
// ============================================================

/// One `info` line per API request with client, user, status and latency.
///
/// Must wrap the auth layer so rejected requests are logged too.
pub(crate) async fn access_log(req: Request, next: Next) -> Response {
    if PUBLIC_PATHS.contains(&req.uri().path()) {
        return next.run(req).await;
    }
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "-".to_owned(), |ci| ci.0.ip().to_string());
    let started = Instant::now();

    let response = next.run(req).await;

    let user = response
        .extensions()
        .get::<AuthUser>()
        .map_or("-", |u| u.0.as_str());
    info!(
        client,
        user,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "{method} {path}"
    );
    response
}

// ============================================================
// Basic Auth middleware
// ============================================================

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"hostcheck\"")],
        "Unauthorized",
    )
        .into_response()
}

/// Decodes `Basic <base64(user:pass)>`. Returns `None` on any malformation.
fn parse_basic(header_value: &str) -> Option<(String, String)> {
    use base64::Engine;
    let encoded = header_value.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_owned(), pass.to_owned()))
}

pub(crate) async fn basic_auth_middleware(
    State(creds): State<Arc<Credentials>>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_owned();
    if PUBLIC_PATHS.contains(&path.as_str()) {
        return next.run(req).await;
    }

    let Some(header_value) = req.headers().get(header::AUTHORIZATION) else {
        warn!(path = %path, "auth failed: no authorization header");
        return unauthorized();
    };
    let Some((user, pass)) = header_value.to_str().ok().and_then(parse_basic) else {
        warn!(path = %path, "auth failed: malformed credentials");
        return unauthorized();
    };

    if user != creds.user || pass != creds.password {
        warn!(user = %user, path = %path, "auth failed: invalid credentials");
        return unauthorized();
    }

    debug!(user = %user, path = %path, "authenticated");
    let auth_user = AuthUser(user);
    req.extensions_mut().insert(auth_user.clone());
    let mut response = next.run(req).await;
    response.extensions_mut().insert(auth_user);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::routing::get;
    use tower::ServiceExt;

    fn router(creds: Credentials) -> Router {
        Router::new()
            .route("/api/v1/health", get(|| async { "ok" }))
            .route("/api/v1/report", get(|| async { "report" }))
            .layer(axum::middleware::from_fn_with_state(
                Arc::new(creds),
                basic_auth_middleware,
            ))
            .layer(axum::middleware::from_fn(access_log))
    }

    fn creds() -> Credentials {
        Credentials {
            user: "admin".to_string(),
            password: "s3cret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_access_log_passes_responses_through() {
        let app = router(creds());
        // "admin:s3cret"
        let req = Request::builder()
            .uri("/api/v1/report")
            .header(header::AUTHORIZATION, "Basic YWRtaW46czNjcmV0")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.extensions().get::<AuthUser>().map(|u| u.0.as_str()),
            Some("admin")
        );

        let req = Request::builder()
            .uri("/api/v1/report")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn test_health_stays_public() {
        let req = Request::builder()
            .uri("/api/v1/health")
            .body(Body::empty())
            .unwrap();
        let resp = router(creds()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.extensions().get::<AuthUser>().is_none());
    }

    #[test]
    fn test_parses_basic_header() {
        // "admin:s3cret:with:colons"
        let header = "Basic YWRtaW46czNjcmV0OndpdGg6Y29sb25z";
        assert_eq!(
            parse_basic(header),
            Some(("admin".to_string(), "s3cret:with:colons".to_string()))
        );
    }

    #[test]
    fn test_rejects_malformed_headers() {
        assert_eq!(parse_basic("Bearer abc"), None);
        assert_eq!(parse_basic("Basic !!!"), None);
        // "nocolon"
        assert_eq!(parse_basic("Basic bm9jb2xvbg=="), None);
    }
}
