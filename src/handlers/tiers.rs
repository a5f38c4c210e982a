use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::services::tiers::{CreerTiersRequest, TiersFilter};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListTiersQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub type_tiers: Option<String>,
    pub q: Option<String>,
}

impl ListTiersQuery {
    fn filter(&self) -> TiersFilter {
        TiersFilter {
            type_tiers: self.type_tiers.clone(),
            q: self.q.clone(),
        }
    }
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

pub fn tiers_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_tiers).get(list_tiers))
        .route("/:id", get(get_tiers))
}

async fn create_tiers(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(payload): Json<CreerTiersRequest>,
) -> impl IntoResponse {
    match state.services.tiers.create(ctx, payload).await {
        Ok(created) => (StatusCode::CREATED, Json(ApiResponse::success(created))).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn list_tiers(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<ListTiersQuery>,
) -> ApiResult<crate::services::tiers::TiersListResponse> {
    let result = state
        .services
        .tiers
        .list(ctx, query.filter(), query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn get_tiers(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<crate::entities::tiers::Model> {
    let result = state.services.tiers.get(ctx, id).await?;
    Ok(Json(ApiResponse::success(result)))
}
