use super::*;

const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Debug, Default, serde::Deserialize)]
pub struct AccessGrantListQuery {
    pub qbox_id: Option<String>,
    pub active_only: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn create_access_grant_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    ApiJson(payload): ApiJson<CreateAccessGrantRequest>,
) -> ApiResult<(StatusCode, Json<IssuedAccessGrantResponse>)> {
    let issued = state
        .access_grant_service
        .issue_grant(
            Some(&user),
            IssueAccessGrantInput {
                qbox_id: payload.qbox_id,
                name: payload.name,
                location: payload.location,
                address: payload.address,
                max_users: payload.max_users.unwrap_or(DEFAULT_MAX_USERS),
                duration_type: DurationType::from_str(payload.duration_type.trim())?,
                valid_duration: payload.valid_duration,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IssuedAccessGrantResponse {
            grant: AccessGrantResponse::from_grant(
                &issued.grant,
                Utc::now(),
                &state.public_base_url,
            ),
            access_token: issued.access_token,
            qr_code_rendered: issued.qr_code_rendered,
        }),
    ))
}

pub async fn list_access_grants_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<UserIdentity>,
    Query(query): Query<AccessGrantListQuery>,
) -> ApiResult<Json<Vec<AccessGrantResponse>>> {
    let grants = state
        .access_grant_service
        .list_grants(AccessGrantQuery {
            qbox_id: query.qbox_id,
            active_only: query.active_only.unwrap_or(false),
            limit: query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
            offset: query.offset.unwrap_or(0),
        })
        .await?;

    let now = Utc::now();
    Ok(Json(
        grants
            .iter()
            .map(|grant| AccessGrantResponse::from_grant(grant, now, &state.public_base_url))
            .collect(),
    ))
}

pub async fn get_access_grant_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<UserIdentity>,
    Path(grant_id): Path<String>,
) -> ApiResult<Json<AccessGrantResponse>> {
    let grant = state
        .access_grant_service
        .get_grant(AccessGrantId::parse(&grant_id)?)
        .await?;

    Ok(Json(AccessGrantResponse::from_grant(
        &grant,
        Utc::now(),
        &state.public_base_url,
    )))
}

pub async fn update_access_grant_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(grant_id): Path<String>,
    ApiJson(payload): ApiJson<UpdateAccessGrantRequest>,
) -> ApiResult<Json<AccessGrantResponse>> {
    let grant = state
        .access_grant_service
        .update_grant(
            &user,
            AccessGrantId::parse(&grant_id)?,
            AccessGrantUpdate::try_from(payload)?,
        )
        .await?;

    Ok(Json(AccessGrantResponse::from_grant(
        &grant,
        Utc::now(),
        &state.public_base_url,
    )))
}

pub async fn revoke_access_grant_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(grant_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .access_grant_service
        .revoke_grant(&user, AccessGrantId::parse(&grant_id)?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_access_grant_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(grant_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .access_grant_service
        .delete_grant(&user, AccessGrantId::parse(&grant_id)?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_access_events_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<UserIdentity>,
    Path(grant_id): Path<String>,
) -> ApiResult<Json<Vec<AccessEventResponse>>> {
    let events = state
        .access_grant_service
        .list_access_events(AccessGrantId::parse(&grant_id)?)
        .await?
        .into_iter()
        .map(AccessEventResponse::from)
        .collect();

    Ok(Json(events))
}
