use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let management_routes = Router::new()
        .route(
            "/access-qr-codes",
            get(handlers::access_grants::list_access_grants_handler)
                .post(handlers::access_grants::create_access_grant_handler),
        )
        .route(
            "/access-qr-codes/",
            get(handlers::access_grants::list_access_grants_handler)
                .post(handlers::access_grants::create_access_grant_handler),
        )
        .route(
            "/access-qr-codes/{grant_id}",
            get(handlers::access_grants::get_access_grant_handler)
                .patch(handlers::access_grants::update_access_grant_handler)
                .delete(handlers::access_grants::delete_access_grant_handler),
        )
        .route(
            "/access-qr-codes/{grant_id}/revoke",
            post(handlers::access_grants::revoke_access_grant_handler),
        )
        .route(
            "/access-qr-codes/{grant_id}/qr-code",
            get(handlers::access_grants::access_grant_qr_code_handler),
        )
        .route(
            "/access-qr-codes/{grant_id}/access-events",
            get(handlers::access_grants::list_access_events_handler),
        )
        .route_layer(from_fn(middleware::require_identity));

    let access_routes = Router::new()
        .route(
            "/access/{access_token}",
            post(handlers::access::consume_access_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit_access,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(management_routes)
        .merge(access_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
