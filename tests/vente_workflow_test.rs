mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::TestApp;
use gescom_api::{
    entities::echeance::{StatutEcheance, TypeEcheance},
    entities::echeancier::StatutEcheancier,
    entities::paiement::{StatutPaiement, TypePaiement},
    entities::vente::{ModePaiement, StatutVente, TypeDocument},
    errors::ServiceError,
    services::echeancier::Intervalle,
    services::ventes::{
        AjouterPaiementRequest, AnnulerVenteRequest, CreerEcheancierRequest, DefinirLignesRequest,
        DefinirPaiementRequest, EcheanceInput, GenererEcheancierRequest, InitierVenteRequest,
        LigneInput, MajEcheanceRequest, PaiementInput, RemiseGlobaleInput, TransformerVenteRequest,
        VenteFilter,
    },
};
use gescom_api::entities::remise::TypeRemise;

fn ligne(designation: &str, quantite: Decimal, prix_ht: Decimal, tva: Decimal) -> LigneInput {
    LigneInput {
        article_id: None,
        designation: designation.to_string(),
        description: None,
        quantite,
        prix_unitaire_ht: prix_ht,
        taux_tva: tva,
        remise: Decimal::ZERO,
    }
}

fn paiement_especes(montant: Decimal) -> PaiementInput {
    PaiementInput {
        type_paiement: TypePaiement::Especes,
        montant,
        date_paiement: None,
        reference: None,
        banque: None,
        statut: Some(StatutPaiement::Encaisse),
        notes_paiement: None,
    }
}

async fn initiate_with_lines(
    app: &TestApp,
    lignes: Vec<LigneInput>,
) -> gescom_api::services::ventes::VenteAvecTransaction {
    let client = app.create_client("Ben Salah").await;
    let created = app
        .state
        .services
        .ventes
        .initiate(
            app.ctx,
            InitierVenteRequest {
                client_id: client.id,
                type_document: None,
                notes: None,
            },
        )
        .await
        .expect("vente initiated");

    app.state
        .services
        .ventes
        .set_lines(
            app.ctx,
            created.vente.id,
            DefinirLignesRequest {
                lignes,
                remise_globale: None,
            },
        )
        .await
        .expect("lines set")
}

#[tokio::test]
async fn cash_sale_end_to_end() {
    let app = TestApp::new().await;
    let result = initiate_with_lines(&app, vec![ligne("Article A", dec!(2), dec!(50), dec!(19))])
        .await;

    assert_eq!(result.transaction.montant_total_ht, dec!(100.00));
    assert_eq!(result.transaction.montant_taxes, dec!(19.00));
    assert_eq!(result.transaction.montant_total_ttc, dec!(119.00));
    assert_eq!(result.vente.reste_a_payer, dec!(119.00));

    let paid = app
        .state
        .services
        .ventes
        .set_payment_method(
            app.ctx,
            result.vente.id,
            DefinirPaiementRequest {
                mode_paiement: ModePaiement::Especes,
                paiements: vec![paiement_especes(dec!(119))],
            },
        )
        .await
        .expect("payment set");

    assert_eq!(paid.vente.statut, StatutVente::Payee.to_string());
    assert_eq!(paid.vente.montant_paye, dec!(119));
    assert_eq!(paid.vente.reste_a_payer, Decimal::ZERO);
    assert_eq!(paid.transaction.statut, "VALIDEE");
}

#[tokio::test]
async fn installment_sale_end_to_end() {
    let app = TestApp::new().await;
    let result = initiate_with_lines(
        &app,
        vec![ligne("Service", dec!(3), dec!(100), Decimal::ZERO)],
    )
    .await;
    assert_eq!(result.transaction.montant_total_ttc, dec!(300.00));

    app.state
        .services
        .ventes
        .set_payment_method(
            app.ctx,
            result.vente.id,
            DefinirPaiementRequest {
                mode_paiement: ModePaiement::ChequesMultiples,
                paiements: vec![],
            },
        )
        .await
        .expect("mode set");

    let date_debut = Utc::now();
    let schedule = app
        .state
        .services
        .ventes
        .generate_schedule(
            app.ctx,
            result.vente.id,
            GenererEcheancierRequest {
                nombre_echeances: 3,
                date_debut: Some(date_debut),
                intervalle: Some(Intervalle::Jours(30)),
                type_paiement: Some(TypeEcheance::Cheque),
                banque: Some("BIAT".to_string()),
            },
        )
        .await
        .expect("schedule generated");

    let montants: Vec<Decimal> = schedule.echeances.iter().map(|e| e.montant).collect();
    assert_eq!(montants, vec![dec!(100), dec!(100), dec!(100)]);
    for (i, echeance) in schedule.echeances.iter().enumerate() {
        let expected = date_debut + Duration::days(30 * (i as i64 + 1));
        assert_eq!(echeance.date_echeance.timestamp(), expected.timestamp());
    }

    let validated = app
        .state
        .services
        .ventes
        .validate(app.ctx, result.vente.id)
        .await
        .expect("validated");
    assert_eq!(validated.vente.statut, StatutVente::Validee.to_string());
    let facture = validated.facture.expect("facture emitted");
    assert_eq!(facture.statut, "VALIDEE");

    // Receive the first installment: partial payment
    let after_first = app
        .state
        .services
        .ventes
        .update_installment_status(
            app.ctx,
            schedule.echeances[0].id,
            MajEcheanceRequest {
                statut: StatutEcheance::Recu,
                date_encaissement: None,
                notes: None,
            },
        )
        .await
        .expect("first installment received");
    assert_eq!(
        after_first.echeancier.statut,
        StatutEcheancier::Actif.to_string()
    );

    let detail = app
        .state
        .services
        .ventes
        .get_detail(app.ctx, result.vente.id)
        .await
        .expect("detail");
    assert_eq!(detail.vente.montant_paye, dec!(100));
    assert_eq!(
        detail.vente.statut,
        StatutVente::PartiellementPayee.to_string()
    );

    // Receive the remaining two: fully paid, schedule finished
    for echeance in &schedule.echeances[1..] {
        app.state
            .services
            .ventes
            .update_installment_status(
                app.ctx,
                echeance.id,
                MajEcheanceRequest {
                    statut: StatutEcheance::Recu,
                    date_encaissement: None,
                    notes: None,
                },
            )
            .await
            .expect("installment received");
    }

    let detail = app
        .state
        .services
        .ventes
        .get_detail(app.ctx, result.vente.id)
        .await
        .expect("detail");
    assert_eq!(detail.vente.statut, StatutVente::Payee.to_string());
    assert_eq!(detail.vente.reste_a_payer, Decimal::ZERO);
    assert_eq!(
        detail.echeancier.expect("echeancier").statut,
        StatutEcheancier::Termine.to_string()
    );
    assert_eq!(detail.facture.expect("facture").statut, "PAYEE");
}

#[tokio::test]
async fn validate_requires_at_least_one_line() {
    let app = TestApp::new().await;
    let client = app.create_client("Client Vide").await;
    let created = app
        .state
        .services
        .ventes
        .initiate(
            app.ctx,
            InitierVenteRequest {
                client_id: client.id,
                type_document: None,
                notes: None,
            },
        )
        .await
        .expect("initiated");

    let err = app
        .state
        .services
        .ventes
        .validate(app.ctx, created.vente.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::EmptyTransaction);
}

#[tokio::test]
async fn validate_requires_balanced_schedule_for_multi_instrument_modes() {
    let app = TestApp::new().await;
    let result = initiate_with_lines(
        &app,
        vec![ligne("Service", dec!(3), dec!(100), Decimal::ZERO)],
    )
    .await;

    app.state
        .services
        .ventes
        .set_payment_method(
            app.ctx,
            result.vente.id,
            DefinirPaiementRequest {
                mode_paiement: ModePaiement::EffetsMultiples,
                paiements: vec![],
            },
        )
        .await
        .expect("mode set");

    // No schedule at all: validation refuses
    let err = app
        .state
        .services
        .ventes
        .validate(app.ctx, result.vente.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // Unbalanced schedule (295 against 300): rejected, nothing persisted
    let echeances: Vec<EcheanceInput> = (0..3)
        .map(|i| EcheanceInput {
            date_echeance: Utc::now() + Duration::days(30 * (i + 1)),
            montant: if i == 2 { dec!(95) } else { dec!(100) },
            type_paiement: TypeEcheance::Effet,
            reference: Some(format!("EFF-{i}")),
            banque: None,
        })
        .collect();

    let err = app
        .state
        .services
        .ventes
        .create_schedule(
            app.ctx,
            result.vente.id,
            CreerEcheancierRequest {
                echeances,
                force: false,
                notes_echeancier: None,
            },
        )
        .await
        .unwrap_err();
    match err {
        ServiceError::ScheduleMismatch { attendu, constate } => {
            assert_eq!(attendu, dec!(300.00));
            assert_eq!(constate, dec!(295));
            let message = ServiceError::ScheduleMismatch { attendu, constate }.to_string();
            assert!(message.contains("295"));
            assert!(message.contains("300"));
        }
        other => panic!("expected ScheduleMismatch, got {other:?}"),
    }

    let schedule = app
        .state
        .services
        .ventes
        .get_schedule(app.ctx, result.vente.id)
        .await
        .expect("query ok");
    assert!(schedule.is_none(), "no installment should be persisted");
}

#[tokio::test]
async fn cancelled_sale_is_terminal() {
    let app = TestApp::new().await;
    let result = initiate_with_lines(
        &app,
        vec![ligne("Service", dec!(3), dec!(100), Decimal::ZERO)],
    )
    .await;

    app.state
        .services
        .ventes
        .set_payment_method(
            app.ctx,
            result.vente.id,
            DefinirPaiementRequest {
                mode_paiement: ModePaiement::ChequesMultiples,
                paiements: vec![],
            },
        )
        .await
        .expect("mode set");

    let schedule = app
        .state
        .services
        .ventes
        .generate_schedule(
            app.ctx,
            result.vente.id,
            GenererEcheancierRequest {
                nombre_echeances: 2,
                date_debut: None,
                intervalle: None,
                type_paiement: None,
                banque: None,
            },
        )
        .await
        .expect("schedule generated");

    let cancelled = app
        .state
        .services
        .ventes
        .cancel(
            app.ctx,
            result.vente.id,
            AnnulerVenteRequest {
                motif: "Erreur de saisie".to_string(),
            },
        )
        .await
        .expect("cancelled");
    assert_eq!(cancelled.statut, StatutVente::Annulee.to_string());
    assert!(cancelled.motif_annulation.is_some());

    // Cancelling twice is refused
    let err = app
        .state
        .services
        .ventes
        .cancel(
            app.ctx,
            result.vente.id,
            AnnulerVenteRequest {
                motif: "encore".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));

    // No further operation may change it
    let err = app
        .state
        .services
        .ventes
        .set_lines(
            app.ctx,
            result.vente.id,
            DefinirLignesRequest {
                lignes: vec![ligne("X", dec!(1), dec!(1), Decimal::ZERO)],
                remise_globale: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));

    let err = app
        .state
        .services
        .ventes
        .record_payment(
            app.ctx,
            result.vente.id,
            AjouterPaiementRequest {
                type_paiement: TypePaiement::Especes,
                montant: dec!(10),
                date_paiement: None,
                reference: None,
                banque: None,
                notes_paiement: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));

    let err = app
        .state
        .services
        .ventes
        .update_installment_status(
            app.ctx,
            schedule.echeances[0].id,
            MajEcheanceRequest {
                statut: StatutEcheance::Recu,
                date_encaissement: None,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));

    // Status is unchanged after all the refused attempts
    let detail = app
        .state
        .services
        .ventes
        .get_detail(app.ctx, result.vente.id)
        .await
        .expect("detail");
    assert_eq!(detail.vente.statut, StatutVente::Annulee.to_string());
    assert_eq!(detail.transaction.statut, "ANNULEE");
}

#[tokio::test]
async fn cancel_requires_reason() {
    let app = TestApp::new().await;
    let result = initiate_with_lines(&app, vec![ligne("A", dec!(1), dec!(10), Decimal::ZERO)])
        .await;

    let err = app
        .state
        .services
        .ventes
        .cancel(
            app.ctx,
            result.vente.id,
            AnnulerVenteRequest {
                motif: "".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn record_payment_rejected_on_paid_sale() {
    let app = TestApp::new().await;
    let result = initiate_with_lines(&app, vec![ligne("A", dec!(2), dec!(50), dec!(19))]).await;

    app.state
        .services
        .ventes
        .set_payment_method(
            app.ctx,
            result.vente.id,
            DefinirPaiementRequest {
                mode_paiement: ModePaiement::Especes,
                paiements: vec![paiement_especes(dec!(119))],
            },
        )
        .await
        .expect("paid");

    let err = app
        .state
        .services
        .ventes
        .record_payment(
            app.ctx,
            result.vente.id,
            AjouterPaiementRequest {
                type_paiement: TypePaiement::Especes,
                montant: dec!(1),
                date_paiement: None,
                reference: None,
                banque: None,
                notes_paiement: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));
}

#[tokio::test]
async fn partial_then_full_payment_after_validation() {
    let app = TestApp::new().await;
    let result = initiate_with_lines(
        &app,
        vec![ligne("Service", dec!(1), dec!(200), Decimal::ZERO)],
    )
    .await;

    app.state
        .services
        .ventes
        .set_payment_method(
            app.ctx,
            result.vente.id,
            DefinirPaiementRequest {
                mode_paiement: ModePaiement::ChequeUnique,
                paiements: vec![],
            },
        )
        .await
        .expect("mode set");
    app.state
        .services
        .ventes
        .validate(app.ctx, result.vente.id)
        .await
        .expect("validated");

    let after_partial = app
        .state
        .services
        .ventes
        .record_payment(
            app.ctx,
            result.vente.id,
            AjouterPaiementRequest {
                type_paiement: TypePaiement::Cheque,
                montant: dec!(80),
                date_paiement: None,
                reference: Some("CHQ-100".to_string()),
                banque: Some("STB".to_string()),
                notes_paiement: None,
            },
        )
        .await
        .expect("partial payment");
    assert_eq!(
        after_partial.vente.statut,
        StatutVente::PartiellementPayee.to_string()
    );
    assert_eq!(after_partial.vente.reste_a_payer, dec!(120));

    let after_full = app
        .state
        .services
        .ventes
        .record_payment(
            app.ctx,
            result.vente.id,
            AjouterPaiementRequest {
                type_paiement: TypePaiement::Virement,
                montant: dec!(120),
                date_paiement: None,
                reference: Some("VIR-7".to_string()),
                banque: None,
                notes_paiement: None,
            },
        )
        .await
        .expect("full payment");
    assert_eq!(after_full.vente.statut, StatutVente::Payee.to_string());
    assert_eq!(after_full.vente.reste_a_payer, Decimal::ZERO);
}

#[tokio::test]
async fn global_discount_scales_all_totals() {
    let app = TestApp::new().await;
    let client = app.create_client("Remisé").await;
    let created = app
        .state
        .services
        .ventes
        .initiate(
            app.ctx,
            InitierVenteRequest {
                client_id: client.id,
                type_document: None,
                notes: None,
            },
        )
        .await
        .expect("initiated");

    let result = app
        .state
        .services
        .ventes
        .set_lines(
            app.ctx,
            created.vente.id,
            DefinirLignesRequest {
                lignes: vec![ligne("Gros lot", dec!(10), dec!(100), dec!(19))],
                remise_globale: Some(RemiseGlobaleInput {
                    type_remise: TypeRemise::Pourcentage,
                    valeur: dec!(10),
                }),
            },
        )
        .await
        .expect("lines set");

    assert_eq!(result.transaction.montant_total_ht, dec!(900.00));
    assert_eq!(result.transaction.montant_taxes, dec!(171.00));
    assert_eq!(result.transaction.montant_total_ttc, dec!(1071.00));
    assert_eq!(result.vente.remise_globale, dec!(10));
}

#[tokio::test]
async fn set_lines_replaces_previous_lines() {
    let app = TestApp::new().await;
    let result = initiate_with_lines(&app, vec![ligne("Ancien", dec!(1), dec!(10), Decimal::ZERO)])
        .await;

    let updated = app
        .state
        .services
        .ventes
        .set_lines(
            app.ctx,
            result.vente.id,
            DefinirLignesRequest {
                lignes: vec![
                    ligne("Nouveau A", dec!(1), dec!(40), Decimal::ZERO),
                    ligne("Nouveau B", dec!(1), dec!(60), Decimal::ZERO),
                ],
                remise_globale: None,
            },
        )
        .await
        .expect("lines replaced");
    assert_eq!(updated.transaction.montant_total_ht, dec!(100.00));

    let detail = app
        .state
        .services
        .ventes
        .get_detail(app.ctx, result.vente.id)
        .await
        .expect("detail");
    assert_eq!(detail.lignes.len(), 2);
    assert!(detail.lignes.iter().all(|l| l.designation.starts_with("Nouveau")));
}

#[tokio::test]
async fn tenant_isolation_is_structural() {
    let app = TestApp::new().await;
    let result = initiate_with_lines(&app, vec![ligne("A", dec!(1), dec!(10), Decimal::ZERO)])
        .await;

    let err = app
        .state
        .services
        .ventes
        .get_detail(app.other_tenant(), result.vente.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let listed = app
        .state
        .services
        .ventes
        .list(app.other_tenant(), VenteFilter::default(), 1, 20)
        .await
        .expect("list ok");
    assert_eq!(listed.total, 0);
}

#[tokio::test]
async fn numbering_is_sequential_per_tenant() {
    let app = TestApp::new().await;
    let client = app.create_client("Numéroté").await;

    let mut numeros = Vec::new();
    for _ in 0..3 {
        let created = app
            .state
            .services
            .ventes
            .initiate(
                app.ctx,
                InitierVenteRequest {
                    client_id: client.id,
                    type_document: None,
                    notes: None,
                },
            )
            .await
            .expect("initiated");
        numeros.push(created.transaction.numero_transaction);
    }

    let re = Regex::new(r"^V-\d{4}-(\d{4})$").unwrap();
    let seqs: Vec<u32> = numeros
        .iter()
        .map(|n| re.captures(n).expect("format")[1].parse().unwrap())
        .collect();
    assert_eq!(seqs, vec![seqs[0], seqs[0] + 1, seqs[0] + 2]);
}

#[tokio::test]
async fn version_increments_on_every_mutating_step() {
    let app = TestApp::new().await;
    let result = initiate_with_lines(&app, vec![ligne("A", dec!(1), dec!(100), Decimal::ZERO)])
        .await;
    let version_after_lines = result.vente.version;
    assert!(version_after_lines > 1);

    let paid = app
        .state
        .services
        .ventes
        .set_payment_method(
            app.ctx,
            result.vente.id,
            DefinirPaiementRequest {
                mode_paiement: ModePaiement::Especes,
                paiements: vec![paiement_especes(dec!(100))],
            },
        )
        .await
        .expect("payment set");
    assert!(paid.vente.version > version_after_lines);
}

#[tokio::test]
async fn devis_transforms_into_bon_livraison_then_facture() {
    let app = TestApp::new().await;
    let client = app.create_client("Transformé").await;
    let created = app
        .state
        .services
        .ventes
        .initiate(
            app.ctx,
            InitierVenteRequest {
                client_id: client.id,
                type_document: Some(TypeDocument::FactureProforma),
                notes: None,
            },
        )
        .await
        .expect("devis initiated");
    assert!(created.vente.numero_document.starts_with("DP-"));

    app.state
        .services
        .ventes
        .set_lines(
            app.ctx,
            created.vente.id,
            DefinirLignesRequest {
                lignes: vec![ligne("Prestation", dec!(2), dec!(75), dec!(19))],
                remise_globale: None,
            },
        )
        .await
        .expect("lines set");

    let bl = app
        .state
        .services
        .ventes
        .transform(
            app.ctx,
            created.vente.id,
            TransformerVenteRequest { mode_paiement: None },
        )
        .await
        .expect("transformed to BL");
    assert_eq!(bl.vente.type_document, TypeDocument::BonLivraison.to_string());
    assert!(bl.vente.numero_document.starts_with("BL-"));
    assert_eq!(bl.vente.document_source, Some(created.vente.id));
    assert_eq!(bl.transaction.montant_total_ttc, dec!(178.50));

    // Source devis is marked transformed and cannot transform twice
    let source = app
        .state
        .services
        .ventes
        .get_detail(app.ctx, created.vente.id)
        .await
        .expect("detail");
    assert_eq!(source.vente.statut, StatutVente::Transforme.to_string());

    let err = app
        .state
        .services
        .ventes
        .transform(
            app.ctx,
            created.vente.id,
            TransformerVenteRequest { mode_paiement: None },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));

    let facture = app
        .state
        .services
        .ventes
        .transform(
            app.ctx,
            bl.vente.id,
            TransformerVenteRequest {
                mode_paiement: Some(ModePaiement::Especes),
            },
        )
        .await
        .expect("transformed to facture");
    assert_eq!(facture.vente.type_document, TypeDocument::Facture.to_string());
    assert_eq!(facture.vente.mode_paiement, ModePaiement::Especes.to_string());
    // Lines are carried over
    let detail = app
        .state
        .services
        .ventes
        .get_detail(app.ctx, facture.vente.id)
        .await
        .expect("detail");
    assert_eq!(detail.lignes.len(), 1);
    assert_eq!(detail.lignes[0].designation, "Prestation");
}

#[tokio::test]
async fn duplicate_matricule_fiscal_is_rejected() {
    let app = TestApp::new().await;

    let request = |nom: &str| gescom_api::services::tiers::CreerTiersRequest {
        type_tiers: gescom_api::entities::tiers::TypeTiers::Client,
        nom: nom.to_string(),
        prenom: None,
        raison_sociale: None,
        email: None,
        telephone: None,
        adresse: None,
        matricule_fiscal: Some("1234567A".to_string()),
    };

    app.state
        .services
        .tiers
        .create(app.ctx, request("Premier"))
        .await
        .expect("first created");

    let err = app
        .state
        .services
        .tiers
        .create(app.ctx, request("Deuxième"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Duplicate(_));
}

#[tokio::test]
async fn initiate_with_unknown_client_fails() {
    let app = TestApp::new().await;
    let err = app
        .state
        .services
        .ventes
        .initiate(
            app.ctx,
            InitierVenteRequest {
                client_id: uuid::Uuid::new_v4(),
                type_document: None,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
