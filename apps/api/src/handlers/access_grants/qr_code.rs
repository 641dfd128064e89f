use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue};
use qbox_core::AppError;

use super::*;

pub async fn access_grant_qr_code_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<UserIdentity>,
    Path(grant_id): Path<String>,
) -> ApiResult<([(HeaderName, HeaderValue); 2], Vec<u8>)> {
    let qr_code = state
        .access_grant_service
        .qr_code(AccessGrantId::parse(&grant_id)?)
        .await?;

    let content_type = HeaderValue::from_str(&qr_code.content_type).map_err(|error| {
        AppError::Internal(format!("invalid stored qr code content type: {error}"))
    })?;

    // The image embeds the access token.
    Ok((
        [
            (CONTENT_TYPE, content_type),
            (CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        qr_code.bytes,
    ))
}
