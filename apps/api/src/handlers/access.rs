use axum::Json;
use axum::extract::{Path, State};

use qbox_application::ConsumeAccessInput;
use qbox_core::AppError;

use crate::dto::{ConsumeAccessRequest, ConsumeAccessResponse};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

pub async fn consume_access_handler(
    State(state): State<AppState>,
    Path(access_token): Path<String>,
    ApiJson(payload): ApiJson<ConsumeAccessRequest>,
) -> ApiResult<Json<ConsumeAccessResponse>> {
    let access_token = access_token.trim();
    let body_token = payload
        .access_token
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if body_token.is_some_and(|body_token| body_token != access_token) {
        return Err(AppError::Validation(
            "access_token in the body does not match the path".to_owned(),
        )
        .into());
    }

    let outcome = state
        .access_grant_service
        .consume_grant(ConsumeAccessInput {
            access_token: access_token.to_owned(),
            user_identifier: payload.user_identifier,
            user_name: payload.user_name,
        })
        .await?;

    Ok(Json(ConsumeAccessResponse::from(outcome)))
}
