use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::services::facturation::EnvoyerFactureRequest;
use crate::{ApiResponse, ApiResult, AppState};

pub fn factures_routes() -> Router<AppState> {
    Router::new()
        .route("/:id/document", get(telecharger_document))
        .route("/:id/envoyer", post(envoyer_facture))
}

/// Renders the invoice document and streams it back.
async fn telecharger_document(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.services.facturation.render(ctx, id).await {
        Ok(rendu) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", rendu.nom_fichier),
                ),
            ],
            rendu.contenu,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn envoyer_facture(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<EnvoyerFactureRequest>,
) -> ApiResult<crate::services::facturation::EnvoiFactureResponse> {
    let result = state
        .services
        .facturation
        .send_by_email(ctx, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}
