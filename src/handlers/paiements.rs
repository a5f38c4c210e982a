use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::services::paiements::PaiementFilter;
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListPaiementsQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub transaction_id: Option<Uuid>,
    pub statut: Option<String>,
    pub type_paiement: Option<String>,
    pub date_debut: Option<chrono::DateTime<chrono::Utc>>,
    pub date_fin: Option<chrono::DateTime<chrono::Utc>>,
}

impl ListPaiementsQuery {
    fn filter(&self) -> PaiementFilter {
        PaiementFilter {
            transaction_id: self.transaction_id,
            statut: self.statut.clone(),
            type_paiement: self.type_paiement.clone(),
            date_debut: self.date_debut,
            date_fin: self.date_fin,
        }
    }
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

pub fn paiements_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_paiements))
        .route("/:id", get(get_paiement))
}

async fn list_paiements(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<ListPaiementsQuery>,
) -> ApiResult<crate::services::paiements::PaiementListResponse> {
    let result = state
        .services
        .paiements
        .list(ctx, query.filter(), query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn get_paiement(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<crate::entities::paiement::Model> {
    let result = state.services.paiements.get(ctx, id).await?;
    Ok(Json(ApiResponse::success(result)))
}
