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
use validator::Validate;

use crate::auth::AuthContext;
use crate::services::achats::{AchatFilter, CreerAchatRequest};
use crate::services::ventes::{AjouterPaiementRequest, AnnulerVenteRequest};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListAchatsQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub statut: Option<String>,
    pub fournisseur_id: Option<Uuid>,
    pub date_debut: Option<chrono::DateTime<chrono::Utc>>,
    pub date_fin: Option<chrono::DateTime<chrono::Utc>>,
}

impl ListAchatsQuery {
    fn filter(&self) -> AchatFilter {
        AchatFilter {
            statut: self.statut.clone(),
            fournisseur_id: self.fournisseur_id,
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

pub fn achats_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_achat).get(list_achats))
        .route("/:id", get(get_achat))
        .route("/:id/paiements", post(ajouter_paiement))
        .route("/:id/annuler", post(annuler_achat))
}

async fn create_achat(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(payload): Json<CreerAchatRequest>,
) -> impl IntoResponse {
    match state.services.achats.create(ctx, payload).await {
        Ok(created) => (StatusCode::CREATED, Json(ApiResponse::success(created))).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn list_achats(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<ListAchatsQuery>,
) -> ApiResult<crate::services::achats::AchatListResponse> {
    let result = state
        .services
        .achats
        .list(ctx, query.filter(), query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn get_achat(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<crate::services::achats::AchatDetailResponse> {
    let detail = state.services.achats.get_detail(ctx, id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

async fn ajouter_paiement(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<AjouterPaiementRequest>,
) -> ApiResult<crate::services::achats::AchatAvecTransaction> {
    let result = state
        .services
        .achats
        .record_payment(ctx, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn annuler_achat(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnnulerVenteRequest>,
) -> ApiResult<crate::entities::achat::Model> {
    payload.validate().map_err(crate::errors::ServiceError::from)?;
    let result = state
        .services
        .achats
        .cancel(ctx, id, payload.motif)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}
