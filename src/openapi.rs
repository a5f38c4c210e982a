//! OpenAPI document and Swagger UI wiring.

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::entities;
use crate::errors::ErrorResponse;
use crate::services::{achats, documents, facturation, tiers, ventes};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gescom API",
        description = "Sales and purchase management: workflow, installment schedules, payments, invoicing",
        license(name = "MIT")
    ),
    components(schemas(
        ErrorResponse,
        entities::vente::StatutVente,
        entities::vente::ModePaiement,
        entities::vente::TypeDocument,
        entities::paiement::TypePaiement,
        entities::paiement::StatutPaiement,
        entities::echeance::StatutEcheance,
        entities::echeance::TypeEcheance,
        ventes::InitierVenteRequest,
        ventes::DefinirLignesRequest,
        ventes::LigneInput,
        ventes::RemiseGlobaleInput,
        ventes::DefinirPaiementRequest,
        ventes::PaiementInput,
        ventes::CreerEcheancierRequest,
        ventes::EcheanceInput,
        ventes::GenererEcheancierRequest,
        ventes::AnnulerVenteRequest,
        ventes::AjouterPaiementRequest,
        ventes::MajEcheanceRequest,
        ventes::TransformerVenteRequest,
        achats::CreerAchatRequest,
        tiers::CreerTiersRequest,
        facturation::EnvoyerFactureRequest,
        documents::FactureProjection,
        documents::EntrepriseInfo,
        documents::ClientInfo,
        documents::LigneProjection,
        documents::RemiseProjection,
        documents::EcheanceProjection,
    )),
    tags(
        (name = "ventes", description = "Sale workflow"),
        (name = "achats", description = "Purchase recording"),
        (name = "tiers", description = "Clients and suppliers"),
        (name = "factures", description = "Invoice rendering and delivery"),
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at `/docs`, serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
