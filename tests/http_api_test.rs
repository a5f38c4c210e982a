mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::TestApp;
use gescom_api::auth::{ENTREPRISE_HEADER, USER_HEADER};

fn with_auth(
    builder: axum::http::request::Builder,
    ctx: gescom_api::auth::AuthContext,
) -> axum::http::request::Builder {
    builder
        .header(ENTREPRISE_HEADER, ctx.entreprise_id.to_string())
        .header(USER_HEADER, ctx.user_id.to_string())
}

#[tokio::test]
async fn status_endpoint_is_public() {
    let app = TestApp::new().await;
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/v1/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let payload: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(payload["data"]["service"], "gescom-api");
    assert_eq!(payload["success"], true);
}

#[tokio::test]
async fn missing_tenant_headers_are_rejected() {
    let app = TestApp::new().await;
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/v1/ventes")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sale_workflow_over_http() {
    let app = TestApp::new().await;
    let router = app.router();

    // Create the client
    let response = router
        .clone()
        .oneshot(
            with_auth(Request::builder().method("POST").uri("/api/v1/tiers"), app.ctx)
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "type_tiers": "CLIENT",
                        "nom": "Trabelsi",
                        "email": "trabelsi@example.tn"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let payload: Value = serde_json::from_slice(&body).unwrap();
    let client_id: Uuid = payload["data"]["id"].as_str().unwrap().parse().unwrap();

    // Initiate the sale
    let response = router
        .clone()
        .oneshot(
            with_auth(Request::builder().method("POST").uri("/api/v1/ventes"), app.ctx)
                .header("content-type", "application/json")
                .body(Body::from(json!({ "client_id": client_id }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let payload: Value = serde_json::from_slice(&body).unwrap();
    let vente_id = payload["data"]["vente"]["id"].as_str().unwrap().to_string();
    assert_eq!(payload["data"]["vente"]["statut"], "BROUILLON");

    // Set the lines
    let response = router
        .clone()
        .oneshot(
            with_auth(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/api/v1/ventes/{vente_id}/lignes")),
                app.ctx,
            )
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "lignes": [{
                        "designation": "Article",
                        "quantite": "2",
                        "prix_unitaire_ht": "50",
                        "taux_tva": "19"
                    }]
                })
                .to_string(),
            ))
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let payload: Value = serde_json::from_slice(&body).unwrap();
    let total_ttc: rust_decimal::Decimal = payload["data"]["transaction"]["montant_total_ttc"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(total_ttc, rust_decimal_macros::dec!(119));

    // Pay cash and close
    let response = router
        .clone()
        .oneshot(
            with_auth(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/api/v1/ventes/{vente_id}/paiement")),
                app.ctx,
            )
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "mode_paiement": "ESPECES",
                    "paiements": [{
                        "type_paiement": "ESPECES",
                        "montant": "119",
                        "statut": "ENCAISSE"
                    }]
                })
                .to_string(),
            ))
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let payload: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(payload["data"]["vente"]["statut"], "PAYEE");

    // Cross-tenant read is structurally impossible
    let response = router
        .clone()
        .oneshot(
            with_auth(
                Request::builder().uri(format!("/api/v1/ventes/{vente_id}")),
                app.other_tenant(),
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn validation_error_payload_is_structured() {
    let app = TestApp::new().await;

    // Unknown client: typed NotFound with a readable message
    let response = app
        .router()
        .oneshot(
            with_auth(Request::builder().method("POST").uri("/api/v1/ventes"), app.ctx)
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "client_id": Uuid::new_v4() }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let payload: Value = serde_json::from_slice(&body).unwrap();
    assert!(payload["message"].as_str().unwrap().contains("Client"));
    assert!(payload["timestamp"].is_string());
}
