//! Axum router and all HTTP handlers for oms-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers (CORS, tracing) so tests can drive the bare router.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, OriginalUri, Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use oms_auth::Principal;
use oms_domain::{OmsError, Order};

use crate::{
    api_types::{AssetResponse, HealthResponse, LoginRequest, LoginResponse, OrderResponse, PagedResponse},
    auth::require_principal,
    error::ApiFailure,
    state::AppState,
    validation::{self, QueryParams, MALFORMED_BODY},
};

type ApiResult<T> = Result<T, ApiFailure>;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/v1/orders", post(create_order).get(fetch_orders))
        .route("/api/v1/orders/:order_id/cancel", post(cancel_order))
        .route("/api/v1/admin/orders/:order_id/match", post(match_order))
        .route("/api/v1/assets", get(fetch_assets))
        .route("/api/v1/assets/:asset_name", get(fetch_asset))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_principal,
        ));

    Router::new()
        .route("/actuator", get(actuator_index))
        .route("/actuator/health", get(health))
        .route("/api/v1/auth/login", post(login))
        .merge(protected)
        .fallback(not_found)
        .with_state(state)
}

fn path_uuid(raw: &str, name: &str, path: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiFailure::new(OmsError::Validation(format!("{name}: must be a valid UUID")), path))
}

fn query_params(q: Result<Query<QueryParams>, QueryRejection>, path: &str) -> ApiResult<QueryParams> {
    q.map(|Query(p)| p).map_err(|e| {
        ApiFailure::new(OmsError::Validation(format!("Malformed query string: {e}")), path)
    })
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>, path: &str) -> ApiResult<T> {
    body.map(|Json(v)| v).map_err(|e| {
        tracing::debug!(error = %e, "unreadable request body");
        ApiFailure::new(OmsError::Validation(MALFORMED_BODY.to_string()), path)
    })
}

// ---------------------------------------------------------------------------
// GET /actuator, /actuator/health
// ---------------------------------------------------------------------------

pub(crate) async fn actuator_index() -> impl IntoResponse {
    Json(json!({
        "_links": {
            "self": { "href": "/actuator", "templated": false },
            "health": { "href": "/actuator/health", "templated": false }
        }
    }))
}

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    match st.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "UP".to_string(),
            }),
        ),
        Err(e) => {
            tracing::warn!(service = st.build.service, error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "DOWN".to_string(),
                }),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// POST /api/v1/auth/login
// ---------------------------------------------------------------------------

pub(crate) async fn login(
    State(st): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let path = uri.path();
    let req = json_body(body, path)?;
    let token = st
        .customers
        .login(&st.tokens, &req.email, &req.password)
        .await
        .map_err(ApiFailure::at(path))?;
    Ok(Json(LoginResponse {
        token_type: "Bearer".to_string(),
        access_token: token.value,
        expires_at: token.expires_at,
    }))
}

// ---------------------------------------------------------------------------
// /api/v1/orders
// ---------------------------------------------------------------------------

pub(crate) async fn create_order(
    State(st): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let path = uri.path();
    let body = json_body(body, path)?;
    let fail = ApiFailure::at(path);

    let req = validation::create_order_request(&body).map_err(&fail)?;
    st.guard
        .check_customer_access(Some(&principal), req.customer_id)
        .map_err(&fail)?;
    let order = Order::place(req.customer_id, &req.asset_name, req.side, req.size, req.price)
        .map_err(&fail)?;
    let order = st.orders.create_order(order).await.map_err(&fail)?;

    info!(order_id = %order.id, principal = %principal.name, "orders/create");
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))).into_response())
}

pub(crate) async fn fetch_orders(
    State(st): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Json<PagedResponse<OrderResponse>>> {
    let path = uri.path();
    let fail = ApiFailure::at(path);
    let params = query_params(query, path)?;

    let (filter, page) = validation::order_query(&params).map_err(&fail)?;
    st.guard
        .check_customer_access(Some(&principal), filter.customer_id)
        .map_err(&fail)?;
    let page = st.orders.fetch_orders(&filter, page).await.map_err(&fail)?;
    Ok(Json(PagedResponse::from_page(page)))
}

pub(crate) async fn cancel_order(
    State(st): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    Path(order_id): Path<String>,
) -> ApiResult<StatusCode> {
    let path = uri.path();
    let order_id = path_uuid(&order_id, "orderId", path)?;
    st.orders
        .cancel_order(Some(&principal), order_id)
        .await
        .map_err(ApiFailure::at(path))?;
    info!(%order_id, principal = %principal.name, "orders/cancel");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// POST /api/v1/admin/orders/{orderId}/match
// ---------------------------------------------------------------------------

pub(crate) async fn match_order(
    State(st): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    Path(order_id): Path<String>,
) -> ApiResult<StatusCode> {
    let path = uri.path();
    st.guard
        .require_admin(Some(&principal))
        .map_err(ApiFailure::at(path))?;
    let order_id = path_uuid(&order_id, "orderId", path)?;
    st.orders
        .match_order(order_id)
        .await
        .map_err(ApiFailure::at(path))?;
    info!(%order_id, principal = %principal.name, "admin/orders/match");
    Ok(StatusCode::ACCEPTED)
}

// ---------------------------------------------------------------------------
// /api/v1/assets
// ---------------------------------------------------------------------------

pub(crate) async fn fetch_assets(
    State(st): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Json<PagedResponse<AssetResponse>>> {
    let path = uri.path();
    let fail = ApiFailure::at(path);
    let params = query_params(query, path)?;

    let (filter, page) = validation::asset_query(&params).map_err(&fail)?;
    st.guard
        .check_customer_access(Some(&principal), filter.customer_id)
        .map_err(&fail)?;
    let page = st
        .assets
        .fetch_customer_assets(&filter, page)
        .await
        .map_err(&fail)?;
    Ok(Json(PagedResponse::from_page(page)))
}

pub(crate) async fn fetch_asset(
    State(st): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    Path(asset_name): Path<String>,
    query: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Json<AssetResponse>> {
    let path = uri.path();
    let fail = ApiFailure::at(path);
    let params = query_params(query, path)?;

    let customer_id = validation::required_uuid(&params, "customerId").map_err(&fail)?;
    st.guard
        .check_customer_access(Some(&principal), customer_id)
        .map_err(&fail)?;
    let asset = st
        .assets
        .retrieve_customer_asset(customer_id, &asset_name)
        .await
        .map_err(&fail)?;
    Ok(Json(AssetResponse::from(asset)))
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

pub(crate) async fn not_found(OriginalUri(uri): OriginalUri) -> ApiFailure {
    ApiFailure::new(OmsError::NotFound("No endpoint found".to_string()), uri.path())
}
