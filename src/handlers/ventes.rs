use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::services::ventes::{
    AjouterPaiementRequest, AnnulerVenteRequest, CreerEcheancierRequest, DefinirLignesRequest,
    DefinirPaiementRequest, GenererEcheancierRequest, InitierVenteRequest, MajEcheanceRequest,
    TransformerVenteRequest, VenteFilter,
};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListVentesQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub statut: Option<String>,
    pub client_id: Option<Uuid>,
    pub type_document: Option<String>,
    pub date_debut: Option<chrono::DateTime<chrono::Utc>>,
    pub date_fin: Option<chrono::DateTime<chrono::Utc>>,
}

impl ListVentesQuery {
    fn filter(&self) -> VenteFilter {
        VenteFilter {
            statut: self.statut.clone(),
            client_id: self.client_id,
            type_document: self.type_document.clone(),
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

pub fn ventes_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(initiate_vente).get(list_ventes))
        .route("/:id", get(get_vente))
        .route("/:id/lignes", put(set_lignes))
        .route("/:id/paiement", put(set_paiement))
        .route("/:id/echeancier", post(create_echeancier).get(get_echeancier))
        .route("/:id/echeancier/generer", post(generer_echeancier))
        .route("/:id/valider", post(valider_vente))
        .route("/:id/annuler", post(annuler_vente))
        .route("/:id/paiements", post(ajouter_paiement).get(list_paiements))
        .route("/:id/transformer", post(transformer_vente))
        .route("/echeances/:id/statut", put(update_echeance))
}

async fn initiate_vente(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(payload): Json<InitierVenteRequest>,
) -> impl IntoResponse {
    match state.services.ventes.initiate(ctx, payload).await {
        Ok(created) => (StatusCode::CREATED, Json(ApiResponse::success(created))).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn list_ventes(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<ListVentesQuery>,
) -> ApiResult<crate::services::ventes::VenteListResponse> {
    let result = state
        .services
        .ventes
        .list(ctx, query.filter(), query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn get_vente(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<crate::services::ventes::VenteDetailResponse> {
    let detail = state.services.ventes.get_detail(ctx, id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

async fn set_lignes(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<DefinirLignesRequest>,
) -> ApiResult<crate::services::ventes::VenteAvecTransaction> {
    let result = state.services.ventes.set_lines(ctx, id, payload).await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn set_paiement(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<DefinirPaiementRequest>,
) -> ApiResult<crate::services::ventes::VenteAvecTransaction> {
    let result = state
        .services
        .ventes
        .set_payment_method(ctx, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn create_echeancier(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreerEcheancierRequest>,
) -> ApiResult<crate::services::ventes::EcheancierResponse> {
    let result = state
        .services
        .ventes
        .create_schedule(ctx, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn generer_echeancier(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<GenererEcheancierRequest>,
) -> ApiResult<crate::services::ventes::EcheancierResponse> {
    let result = state
        .services
        .ventes
        .generate_schedule(ctx, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn get_echeancier(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Option<crate::services::ventes::EcheancierResponse>> {
    let result = state.services.ventes.get_schedule(ctx, id).await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn valider_vente(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<crate::services::ventes::VenteDetailResponse> {
    let result = state.services.ventes.validate(ctx, id).await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn annuler_vente(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnnulerVenteRequest>,
) -> ApiResult<crate::entities::vente::Model> {
    let result = state.services.ventes.cancel(ctx, id, payload).await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn ajouter_paiement(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<AjouterPaiementRequest>,
) -> ApiResult<crate::services::ventes::VenteAvecTransaction> {
    let result = state
        .services
        .ventes
        .record_payment(ctx, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn list_paiements(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<crate::entities::paiement::Model>> {
    let result = state.services.ventes.list_payments(ctx, id).await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn transformer_vente(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransformerVenteRequest>,
) -> ApiResult<crate::services::ventes::VenteAvecTransaction> {
    let result = state.services.ventes.transform(ctx, id, payload).await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn update_echeance(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<MajEcheanceRequest>,
) -> ApiResult<crate::services::ventes::EcheancierResponse> {
    let result = state
        .services
        .ventes
        .update_installment_status(ctx, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}
