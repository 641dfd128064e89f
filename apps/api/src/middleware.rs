use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use qbox_core::{AppError, UserIdentity};

use crate::error::ApiResult;
use crate::state::AppState;

/// Header carrying the authenticated subject set by the fronting auth gateway.
pub const AUTH_SUBJECT_HEADER: &str = "x-auth-subject";
/// Optional header carrying the subject's display name.
pub const AUTH_NAME_HEADER: &str = "x-auth-name";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

pub async fn require_identity(mut request: Request, next: Next) -> ApiResult<Response> {
    let identity = identity_from_headers(request.headers())?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

pub async fn rate_limit_access(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| *address);
    let client = client_key(request.headers(), peer, state.trust_forwarded_for);

    state
        .rate_limit_service
        .check_rate_limit(&state.access_rate_limit_rule, &client)
        .await?;

    Ok(next.run(request).await)
}

/// Identifies the caller for rate limiting.
///
/// The first `x-forwarded-for` hop is only honoured behind a trusted proxy.
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded_for: bool) -> String {
    let forwarded = trust_forwarded_for
        .then(|| header_text(headers, FORWARDED_FOR_HEADER))
        .flatten()
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match (forwarded, peer) {
        (Some(forwarded), _) => forwarded.to_owned(),
        (None, Some(peer)) => peer.ip().to_string(),
        (None, None) => "unknown".to_owned(),
    }
}

fn identity_from_headers(headers: &HeaderMap) -> Result<UserIdentity, AppError> {
    let subject = header_text(headers, AUTH_SUBJECT_HEADER)
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;
    let display_name = header_text(headers, AUTH_NAME_HEADER).unwrap_or(subject);

    Ok(UserIdentity::new(subject, display_name))
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
