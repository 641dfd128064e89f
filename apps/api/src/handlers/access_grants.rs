use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;

use qbox_application::{AccessGrantQuery, DEFAULT_MAX_USERS, IssueAccessGrantInput};
use qbox_core::UserIdentity;
use qbox_domain::{AccessGrantId, AccessGrantUpdate, DurationType};

use crate::dto::{
    AccessEventResponse, AccessGrantResponse, CreateAccessGrantRequest,
    IssuedAccessGrantResponse, UpdateAccessGrantRequest,
};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

mod manage;
mod qr_code;


pub use manage::{
    create_access_grant_handler, delete_access_grant_handler, get_access_grant_handler,
    list_access_events_handler, list_access_grants_handler, revoke_access_grant_handler,
    update_access_grant_handler,
};
pub use qr_code::access_grant_qr_code_handler;
