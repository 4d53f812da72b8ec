use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use shared::*;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::OrderError;
use crate::models::{DiningTable, Payment};
use crate::store::{OrderFilter, OrderStore};
use crate::workflow::OrderWorkflow;

pub struct AppState<S> {
    pub workflow: Arc<OrderWorkflow<S>>,
}

impl<S> AppState<S> {
    pub fn new(workflow: OrderWorkflow<S>) -> Self {
        Self {
            workflow: Arc::new(workflow),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            workflow: self.workflow.clone(),
        }
    }
}

pub fn create_router<S: OrderStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/orders", get(list_orders::<S>).post(create_order::<S>))
        .route("/orders/tables", get(list_tables::<S>))
        .route("/orders/payments", get(list_payments::<S>))
        .route(
            "/orders/:id",
            get(get_order::<S>)
                .put(update_order::<S>)
                .delete(delete_order::<S>),
        )
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(tower_http::cors::Any)
                        .allow_methods(tower_http::cors::Any)
                        .allow_headers(tower_http::cors::Any),
                ),
        )
}

pub async fn list_orders<S: OrderStore>(
    State(state): State<AppState<S>>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<OrderView>>, OrderError> {
    Ok(Json(state.workflow.list_orders(filter).await?))
}

pub async fn create_order<S: OrderStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<OrderInput>,
) -> Result<(StatusCode, Json<OrderView>), OrderError> {
    let order = state.workflow.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order<S: OrderStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<i32>,
) -> Result<Json<OrderView>, OrderError> {
    Ok(Json(state.workflow.get_order(id).await?))
}

pub async fn update_order<S: OrderStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<i32>,
    Json(request): Json<OrderInput>,
) -> Result<Json<OrderView>, OrderError> {
    Ok(Json(state.workflow.update_order(id, request).await?))
}

pub async fn delete_order<S: OrderStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, OrderError> {
    state.workflow.delete_order(id).await?;
    Ok(Json(json!({ "id": id })))
}

pub async fn list_tables<S: OrderStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<DiningTable>>, OrderError> {
    Ok(Json(state.workflow.list_tables().await?))
}

pub async fn list_payments<S: OrderStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Payment>>, OrderError> {
    Ok(Json(state.workflow.list_payments().await?))
}

pub async fn health_check() -> &'static str {
    "OK"
}
