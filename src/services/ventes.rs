use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthContext,
    db::DbPool,
    entities::echeance::{self, Entity as EcheanceEntity, StatutEcheance, TypeEcheance},
    entities::echeancier::{self, Entity as EcheancierEntity, StatutEcheancier},
    entities::facture::{self, Entity as FactureEntity},
    entities::ligne_transaction::{self, Entity as LigneEntity},
    entities::paiement::{self, Entity as PaiementEntity, StatutPaiement, TypePaiement},
    entities::remise::{self, Entity as RemiseEntity, TypeRemise},
    entities::tiers::{self, Entity as TiersEntity, TypeTiers},
    entities::transaction::{
        self, Entity as TransactionEntity, StatutTransaction, TypeTransaction,
    },
    entities::vente::{self, Entity as VenteEntity, ModePaiement, StatutVente, TypeDocument},
    errors::ServiceError,
    events::{Event, EventSender},
    services::echeancier::{generer_echeances_equitables, EcheanceSpec, Intervalle},
    services::montants::{self, LigneTotaux},
    services::numerotation::{NumerotationService, TypePiece},
    services::reconciliation,
};

// ---------------------------------------------------------------------------
// Request/Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct InitierVenteRequest {
    pub client_id: Uuid,
    /// Defaults to FACTURE.
    pub type_document: Option<TypeDocument>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LigneInput {
    pub article_id: Option<Uuid>,
    #[validate(length(min = 1, message = "La désignation est obligatoire"))]
    pub designation: String,
    pub description: Option<String>,
    pub quantite: Decimal,
    pub prix_unitaire_ht: Decimal,
    #[serde(default)]
    pub taux_tva: Decimal,
    /// Per-line discount percentage (0..=100).
    #[serde(default)]
    pub remise: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RemiseGlobaleInput {
    pub type_remise: TypeRemise,
    pub valeur: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct DefinirLignesRequest {
    #[validate(length(min = 1, message = "Au moins une ligne est requise"))]
    pub lignes: Vec<LigneInput>,
    pub remise_globale: Option<RemiseGlobaleInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaiementInput {
    pub type_paiement: TypePaiement,
    pub montant: Decimal,
    pub date_paiement: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub banque: Option<String>,
    pub statut: Option<StatutPaiement>,
    pub notes_paiement: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DefinirPaiementRequest {
    pub mode_paiement: ModePaiement,
    #[serde(default)]
    pub paiements: Vec<PaiementInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EcheanceInput {
    pub date_echeance: DateTime<Utc>,
    pub montant: Decimal,
    pub type_paiement: TypeEcheance,
    pub reference: Option<String>,
    pub banque: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreerEcheancierRequest {
    pub echeances: Vec<EcheanceInput>,
    /// Allows a schedule on a payment mode that normally does not need one.
    #[serde(default)]
    pub force: bool,
    pub notes_echeancier: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenererEcheancierRequest {
    pub nombre_echeances: i32,
    pub date_debut: Option<DateTime<Utc>>,
    /// Defaults to 30-day spacing when absent.
    pub intervalle: Option<Intervalle>,
    pub type_paiement: Option<TypeEcheance>,
    pub banque: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct AnnulerVenteRequest {
    #[validate(length(min = 1, message = "Motif d'annulation requis"))]
    pub motif: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AjouterPaiementRequest {
    pub type_paiement: TypePaiement,
    pub montant: Decimal,
    pub date_paiement: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub banque: Option<String>,
    pub notes_paiement: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MajEcheanceRequest {
    pub statut: StatutEcheance,
    pub date_encaissement: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransformerVenteRequest {
    /// Payment mode for the target document (BL -> facture).
    pub mode_paiement: Option<ModePaiement>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct VenteFilter {
    pub statut: Option<String>,
    pub client_id: Option<Uuid>,
    pub type_document: Option<String>,
    pub date_debut: Option<DateTime<Utc>>,
    pub date_fin: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct VenteAvecTransaction {
    pub vente: vente::Model,
    pub transaction: transaction::Model,
}

#[derive(Debug, Serialize)]
pub struct VenteListResponse {
    pub ventes: Vec<vente::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Serialize)]
pub struct VenteDetailResponse {
    pub vente: vente::Model,
    pub transaction: transaction::Model,
    pub client: Option<tiers::Model>,
    pub lignes: Vec<ligne_transaction::Model>,
    pub remises: Vec<remise::Model>,
    pub paiements: Vec<paiement::Model>,
    pub echeancier: Option<echeancier::Model>,
    pub echeances: Vec<echeance::Model>,
    pub facture: Option<facture::Model>,
}

#[derive(Debug, Serialize)]
pub struct EcheancierResponse {
    pub echeancier: echeancier::Model,
    pub echeances: Vec<echeance::Model>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Stepwise sale workflow: client -> lines -> payment method -> installment
/// schedule -> validation, with payment reconciliation after every
/// money-moving write.
#[derive(Clone)]
pub struct VenteService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    numerotation: NumerotationService,
}

impl VenteService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db,
            event_sender,
            numerotation: NumerotationService::new(),
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send event");
            }
        }
    }

    /// Step 1: create the draft transaction + sale for a validated client.
    #[instrument(skip(self, request), fields(client_id = %request.client_id, entreprise_id = %ctx.entreprise_id))]
    pub async fn initiate(
        &self,
        ctx: AuthContext,
        request: InitierVenteRequest,
    ) -> Result<VenteAvecTransaction, ServiceError> {
        let db = &*self.db;

        let client = TiersEntity::find()
            .filter(tiers::Column::Id.eq(request.client_id))
            .filter(tiers::Column::TypeTiers.eq(TypeTiers::Client.to_string()))
            .filter(tiers::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Client non trouvé".to_string()))?;

        let type_document = request.type_document.unwrap_or(TypeDocument::Facture);
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let numero_transaction = self
            .numerotation
            .next_number(
                &txn,
                TypePiece::Transaction(TypeTransaction::Vente),
                ctx.entreprise_id,
            )
            .await?;

        let transaction_model = transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            type_transaction: Set(TypeTransaction::Vente.to_string()),
            tiers_id: Set(client.id),
            numero_transaction: Set(numero_transaction),
            date_transaction: Set(now),
            montant_total_ht: Set(Decimal::ZERO),
            montant_total_ttc: Set(Decimal::ZERO),
            montant_taxes: Set(Decimal::ZERO),
            statut: Set(StatutTransaction::Brouillon.to_string()),
            notes: Set(request.notes.clone()),
            entreprise_id: Set(ctx.entreprise_id),
            cree_par: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::from_db)?;

        let numero_document = self
            .numerotation
            .next_number(&txn, TypePiece::Document(type_document), ctx.entreprise_id)
            .await?;

        let vente_model = vente::ActiveModel {
            id: Set(Uuid::new_v4()),
            transaction_id: Set(transaction_model.id),
            client_id: Set(client.id),
            date_vente: Set(now),
            date_echeance: Set(None),
            type_document: Set(type_document.to_string()),
            numero_document: Set(numero_document),
            mode_paiement: Set(ModePaiement::Especes.to_string()),
            remise_globale: Set(Decimal::ZERO),
            statut: Set(StatutVente::Brouillon.to_string()),
            montant_paye: Set(Decimal::ZERO),
            reste_a_payer: Set(Decimal::ZERO),
            motif_annulation: Set(None),
            date_annulation: Set(None),
            document_source: Set(None),
            notes_internes: Set(request.notes),
            entreprise_id: Set(ctx.entreprise_id),
            cree_par: Set(ctx.user_id),
            version: Set(1),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::from_db)?;

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(vente_id = %vente_model.id, numero = %vente_model.numero_document, "vente initiée");
        self.emit(Event::VenteInitiee(vente_model.id)).await;

        Ok(VenteAvecTransaction {
            vente: vente_model,
            transaction: transaction_model,
        })
    }

    /// Step 2: replace all lines and discounts, recompute totals.
    #[instrument(skip(self, request), fields(vente_id = %vente_id))]
    pub async fn set_lines(
        &self,
        ctx: AuthContext,
        vente_id: Uuid,
        request: DefinirLignesRequest,
    ) -> Result<VenteAvecTransaction, ServiceError> {
        request.validate()?;
        for ligne in &request.lignes {
            validate_ligne(ligne)?;
        }

        let db = &*self.db;
        let vente_model = self.find_brouillon(ctx, vente_id).await?;
        let transaction_model = self.find_transaction(ctx, vente_model.transaction_id).await?;

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        // Full replace: lines and discounts are recreated from scratch
        // inside this transaction, so a failure cannot leave the sale
        // lineless.
        LigneEntity::delete_many()
            .filter(ligne_transaction::Column::TransactionId.eq(transaction_model.id))
            .exec(&txn)
            .await
            .map_err(ServiceError::from_db)?;
        RemiseEntity::delete_many()
            .filter(remise::Column::TransactionId.eq(transaction_model.id))
            .exec(&txn)
            .await
            .map_err(ServiceError::from_db)?;

        let mut lignes_totaux: Vec<LigneTotaux> = Vec::with_capacity(request.lignes.len());
        for ligne in &request.lignes {
            let calcul = montants::ligne_totaux(
                ligne.quantite,
                ligne.prix_unitaire_ht,
                ligne.remise,
                ligne.taux_tva,
            );
            lignes_totaux.push(calcul);

            let ligne_model = ligne_transaction::ActiveModel {
                id: Set(Uuid::new_v4()),
                transaction_id: Set(transaction_model.id),
                article_id: Set(ligne.article_id),
                designation: Set(ligne.designation.clone()),
                description: Set(ligne.description.clone()),
                quantite: Set(ligne.quantite),
                prix_unitaire_ht: Set(ligne.prix_unitaire_ht),
                taux_tva: Set(ligne.taux_tva),
                remise: Set(ligne.remise),
                montant_ht: Set(calcul.montant_ht),
                montant_tva: Set(calcul.montant_tva),
                montant_ttc: Set(calcul.montant_ttc),
                entreprise_id: Set(ctx.entreprise_id),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::from_db)?;

            if ligne.remise > Decimal::ZERO {
                let montant_remise = montants::round2(
                    ligne.quantite * ligne.prix_unitaire_ht * ligne.remise / Decimal::from(100),
                );
                remise::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    transaction_id: Set(transaction_model.id),
                    ligne_transaction_id: Set(Some(ligne_model.id)),
                    type_remise: Set(TypeRemise::Pourcentage.to_string()),
                    valeur: Set(ligne.remise),
                    montant: Set(montant_remise),
                    description: Set(Some(format!("Remise sur {}", ligne_model.designation))),
                    est_globale: Set(false),
                    entreprise_id: Set(ctx.entreprise_id),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(ServiceError::from_db)?;
            }
        }

        let mut totaux = montants::totaux(&lignes_totaux);
        let mut remise_globale_pct = Decimal::ZERO;

        if let Some(remise_globale) = &request.remise_globale {
            if remise_globale.valeur > Decimal::ZERO {
                let total_ht_avant = totaux.montant_ht;
                let (nouveaux, montant) = montants::apply_remise_globale(
                    totaux,
                    remise_globale.type_remise,
                    remise_globale.valeur,
                )?;
                totaux = nouveaux;
                remise_globale_pct = match remise_globale.type_remise {
                    TypeRemise::Pourcentage => remise_globale.valeur,
                    TypeRemise::MontantFixe => {
                        montants::round2(montant / total_ht_avant * Decimal::from(100))
                    }
                };

                remise::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    transaction_id: Set(transaction_model.id),
                    ligne_transaction_id: Set(None),
                    type_remise: Set(remise_globale.type_remise.to_string()),
                    valeur: Set(remise_globale.valeur),
                    montant: Set(montant),
                    description: Set(Some("Remise globale".to_string())),
                    est_globale: Set(true),
                    entreprise_id: Set(ctx.entreprise_id),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(ServiceError::from_db)?;
            }
        }

        let mut transaction_active: transaction::ActiveModel = transaction_model.into();
        transaction_active.montant_total_ht = Set(totaux.montant_ht);
        transaction_active.montant_total_ttc = Set(totaux.montant_ttc);
        transaction_active.montant_taxes = Set(totaux.montant_taxes);
        let transaction_model = transaction_active
            .update(&txn)
            .await
            .map_err(ServiceError::from_db)?;

        let montant_paye = vente_model.montant_paye;
        let nombre_lignes = request.lignes.len();
        let vente_model = self
            .persist_vente(&txn, vente_model, |active| {
                active.remise_globale = Set(remise_globale_pct);
                active.reste_a_payer =
                    Set(reconciliation::reste_a_payer(totaux.montant_ttc, montant_paye));
            })
            .await?;

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(
            vente_id = %vente_model.id,
            montant_total_ttc = %totaux.montant_ttc,
            nombre_lignes,
            "lignes définies"
        );
        self.emit(Event::LignesDefinies {
            vente_id: vente_model.id,
            nombre_lignes,
            montant_total_ttc: totaux.montant_ttc,
        })
        .await;

        Ok(VenteAvecTransaction {
            vente: vente_model,
            transaction: transaction_model,
        })
    }

    /// Step 3: set the payment method and replace recorded payments.
    #[instrument(skip(self, request), fields(vente_id = %vente_id, mode = %request.mode_paiement))]
    pub async fn set_payment_method(
        &self,
        ctx: AuthContext,
        vente_id: Uuid,
        request: DefinirPaiementRequest,
    ) -> Result<VenteAvecTransaction, ServiceError> {
        for paiement_input in &request.paiements {
            validate_paiement(
                paiement_input.type_paiement,
                paiement_input.montant,
                paiement_input.reference.as_deref(),
            )?;
        }

        let db = &*self.db;
        let vente_model = self.find_brouillon(ctx, vente_id).await?;
        let transaction_model = self.find_transaction(ctx, vente_model.transaction_id).await?;

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        PaiementEntity::delete_many()
            .filter(paiement::Column::TransactionId.eq(transaction_model.id))
            .exec(&txn)
            .await
            .map_err(ServiceError::from_db)?;

        let mut inserted: Vec<paiement::Model> = Vec::with_capacity(request.paiements.len());
        for paiement_input in &request.paiements {
            let statut = paiement_input.statut.unwrap_or_else(|| {
                match paiement_input.type_paiement {
                    TypePaiement::Especes => StatutPaiement::Encaisse,
                    _ => StatutPaiement::EnAttente,
                }
            });
            let model = paiement::ActiveModel {
                id: Set(Uuid::new_v4()),
                transaction_id: Set(transaction_model.id),
                type_paiement: Set(paiement_input.type_paiement.to_string()),
                montant: Set(paiement_input.montant),
                date_paiement: Set(paiement_input.date_paiement.unwrap_or_else(Utc::now)),
                reference: Set(paiement_input.reference.clone()),
                banque: Set(paiement_input.banque.clone()),
                statut: Set(statut.to_string()),
                date_statut: Set(None),
                notes_paiement: Set(paiement_input.notes_paiement.clone()),
                entreprise_id: Set(ctx.entreprise_id),
                cree_par: Set(ctx.user_id),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::from_db)?;
            inserted.push(model);
        }

        let montant_paye = reconciliation::montant_paye(&inserted);
        let total_ttc = transaction_model.montant_total_ttc;

        // Immediate single cash payment covering the total closes the sale.
        let paiement_comptant = request.mode_paiement == ModePaiement::Especes
            && inserted.len() == 1
            && montants::within_tolerance(montant_paye, total_ttc);

        let mode_paiement = request.mode_paiement;
        let vente_model = self
            .persist_vente(&txn, vente_model, |active| {
                active.mode_paiement = Set(mode_paiement.to_string());
                active.montant_paye = Set(montant_paye);
                active.reste_a_payer = Set(reconciliation::reste_a_payer(total_ttc, montant_paye));
                if paiement_comptant {
                    active.statut = Set(StatutVente::Payee.to_string());
                }
            })
            .await?;

        let transaction_model = if paiement_comptant {
            let mut transaction_active: transaction::ActiveModel = transaction_model.into();
            transaction_active.statut = Set(StatutTransaction::Validee.to_string());
            transaction_active
                .update(&txn)
                .await
                .map_err(ServiceError::from_db)?
        } else {
            transaction_model
        };

        txn.commit().await.map_err(ServiceError::from_db)?;

        self.emit(Event::ModePaiementDefini {
            vente_id: vente_model.id,
            mode_paiement: vente_model.mode_paiement.clone(),
        })
        .await;

        Ok(VenteAvecTransaction {
            vente: vente_model,
            transaction: transaction_model,
        })
    }

    /// Step 4 (manual): replace the installment schedule with caller-provided
    /// installments, after checking the balance gate.
    #[instrument(skip(self, request), fields(vente_id = %vente_id))]
    pub async fn create_schedule(
        &self,
        ctx: AuthContext,
        vente_id: Uuid,
        request: CreerEcheancierRequest,
    ) -> Result<EcheancierResponse, ServiceError> {
        let db = &*self.db;
        let vente_model = self.find_vente(ctx, vente_id).await?;
        ensure_not_cancelled(&vente_model)?;
        let transaction_model = self.find_transaction(ctx, vente_model.transaction_id).await?;

        let mode = parse_mode(&vente_model.mode_paiement)?;
        if !mode.requires_echeancier() && !request.force {
            return Err(ServiceError::ValidationError(
                "Ce mode de paiement ne nécessite pas d'échéancier".to_string(),
            ));
        }
        if request.echeances.is_empty() {
            return Err(ServiceError::ValidationError(
                "Au moins une échéance est requise".to_string(),
            ));
        }
        for echeance_input in &request.echeances {
            if echeance_input.montant <= Decimal::ZERO {
                return Err(ServiceError::InvalidAmount(echeance_input.montant));
            }
        }

        // Amount still owed by installments: the TTC total minus what has
        // already been paid (cash portion of a mixed payment).
        let montant_du = reconciliation::reste_a_payer(
            transaction_model.montant_total_ttc,
            vente_model.montant_paye,
        );
        let somme: Decimal = request.echeances.iter().map(|e| e.montant).sum();
        if !montants::within_tolerance(somme, montant_du) {
            // Balance gate fails before any write: nothing is persisted.
            return Err(ServiceError::ScheduleMismatch {
                attendu: montant_du,
                constate: somme,
            });
        }

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        self.delete_schedule(&txn, transaction_model.id).await?;

        let echeancier_model = echeancier::ActiveModel {
            id: Set(Uuid::new_v4()),
            transaction_id: Set(transaction_model.id),
            vente_id: Set(Some(vente_model.id)),
            montant_total: Set(montant_du),
            nombre_echeances: Set(request.echeances.len() as i32),
            statut: Set(StatutEcheancier::Actif.to_string()),
            notes_echeancier: Set(request.notes_echeancier.clone()),
            entreprise_id: Set(ctx.entreprise_id),
            cree_par: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::from_db)?;

        let mut echeances = Vec::with_capacity(request.echeances.len());
        for echeance_input in &request.echeances {
            let model = echeance::ActiveModel {
                id: Set(Uuid::new_v4()),
                transaction_id: Set(transaction_model.id),
                echeancier_id: Set(echeancier_model.id),
                date_echeance: Set(echeance_input.date_echeance),
                montant: Set(echeance_input.montant),
                type_paiement: Set(echeance_input.type_paiement.to_string()),
                reference: Set(echeance_input.reference.clone()),
                banque: Set(echeance_input.banque.clone()),
                statut: Set(StatutEcheance::ARecevoir.to_string()),
                date_encaissement: Set(None),
                notes: Set(None),
                entreprise_id: Set(ctx.entreprise_id),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::from_db)?;
            echeances.push(model);
        }

        let derniere_echeance = echeances.iter().map(|e| e.date_echeance).max();
        let vente_id = vente_model.id;
        self.persist_vente(&txn, vente_model, |active| {
            active.date_echeance = Set(derniere_echeance);
        })
        .await?;

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(
            vente_id = %vente_id,
            nombre_echeances = echeances.len(),
            montant_total = %montant_du,
            "échéancier créé"
        );
        self.emit(Event::EcheancierCree {
            vente_id,
            nombre_echeances: echeances.len() as i32,
            montant_total: montant_du,
        })
        .await;

        Ok(EcheancierResponse {
            echeancier: echeancier_model,
            echeances,
        })
    }

    /// Step 4 (automatic): generate an equitable schedule over the amount due.
    #[instrument(skip(self, request), fields(vente_id = %vente_id, nombre = request.nombre_echeances))]
    pub async fn generate_schedule(
        &self,
        ctx: AuthContext,
        vente_id: Uuid,
        request: GenererEcheancierRequest,
    ) -> Result<EcheancierResponse, ServiceError> {
        let db = &*self.db;
        let vente_model = self.find_vente(ctx, vente_id).await?;
        ensure_not_cancelled(&vente_model)?;
        let transaction_model = self.find_transaction(ctx, vente_model.transaction_id).await?;

        let montant_du = reconciliation::reste_a_payer(
            transaction_model.montant_total_ttc,
            vente_model.montant_paye,
        );
        let specs: Vec<EcheanceSpec> = generer_echeances_equitables(
            montant_du,
            request.nombre_echeances,
            request.date_debut.unwrap_or_else(Utc::now),
            request.intervalle.unwrap_or(Intervalle::Jours(30)),
            request.type_paiement.unwrap_or(TypeEcheance::Cheque),
            request.banque.clone(),
        )?;

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        self.delete_schedule(&txn, transaction_model.id).await?;

        let echeancier_model = echeancier::ActiveModel {
            id: Set(Uuid::new_v4()),
            transaction_id: Set(transaction_model.id),
            vente_id: Set(Some(vente_model.id)),
            montant_total: Set(montant_du),
            nombre_echeances: Set(request.nombre_echeances),
            statut: Set(StatutEcheancier::Actif.to_string()),
            notes_echeancier: Set(None),
            entreprise_id: Set(ctx.entreprise_id),
            cree_par: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::from_db)?;

        let mut echeances = Vec::with_capacity(specs.len());
        for spec in &specs {
            let model = echeance::ActiveModel {
                id: Set(Uuid::new_v4()),
                transaction_id: Set(transaction_model.id),
                echeancier_id: Set(echeancier_model.id),
                date_echeance: Set(spec.date_echeance),
                montant: Set(spec.montant),
                type_paiement: Set(spec.type_paiement.to_string()),
                reference: Set(Some(spec.reference.clone())),
                banque: Set(spec.banque.clone()),
                statut: Set(StatutEcheance::ARecevoir.to_string()),
                date_encaissement: Set(None),
                notes: Set(None),
                entreprise_id: Set(ctx.entreprise_id),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::from_db)?;
            echeances.push(model);
        }

        let derniere_echeance = echeances.iter().map(|e| e.date_echeance).max();
        let vente_id = vente_model.id;
        self.persist_vente(&txn, vente_model, |active| {
            active.date_echeance = Set(derniere_echeance);
        })
        .await?;

        txn.commit().await.map_err(ServiceError::from_db)?;

        self.emit(Event::EcheancierCree {
            vente_id,
            nombre_echeances: request.nombre_echeances,
            montant_total: montant_du,
        })
        .await;

        Ok(EcheancierResponse {
            echeancier: echeancier_model,
            echeances,
        })
    }

    /// Step 5: validate the sale, derive its final status and emit the
    /// invoice record.
    #[instrument(skip(self), fields(vente_id = %vente_id))]
    pub async fn validate(
        &self,
        ctx: AuthContext,
        vente_id: Uuid,
    ) -> Result<VenteDetailResponse, ServiceError> {
        let db = &*self.db;
        let vente_model = self.find_brouillon(ctx, vente_id).await?;
        let transaction_model = self.find_transaction(ctx, vente_model.transaction_id).await?;

        let lignes = LigneEntity::find()
            .filter(ligne_transaction::Column::TransactionId.eq(transaction_model.id))
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;
        if lignes.is_empty() {
            return Err(ServiceError::EmptyTransaction);
        }

        let mode = parse_mode(&vente_model.mode_paiement)?;
        if mode.requires_echeancier() {
            let echeancier_model = EcheancierEntity::find()
                .filter(echeancier::Column::TransactionId.eq(transaction_model.id))
                .one(db)
                .await
                .map_err(ServiceError::from_db)?
                .ok_or_else(|| {
                    ServiceError::ValidationError(
                        "Un échéancier est requis pour ce mode de paiement".to_string(),
                    )
                })?;

            let echeances = EcheanceEntity::find()
                .filter(echeance::Column::EcheancierId.eq(echeancier_model.id))
                .all(db)
                .await
                .map_err(ServiceError::from_db)?;

            if !reconciliation::est_equilibre(&echeances, echeancier_model.montant_total) {
                let constate: Decimal = echeances.iter().map(|e| e.montant).sum();
                return Err(ServiceError::ScheduleMismatch {
                    attendu: echeancier_model.montant_total,
                    constate,
                });
            }
        }

        let paiements = PaiementEntity::find()
            .filter(paiement::Column::TransactionId.eq(transaction_model.id))
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;
        let montant_paye = reconciliation::montant_paye(&paiements);
        let total_ttc = transaction_model.montant_total_ttc;
        let statut = reconciliation::derive_statut(StatutVente::Validee, total_ttc, montant_paye);

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let vente_model = self
            .persist_vente(&txn, vente_model, |active| {
                active.statut = Set(statut.to_string());
                active.montant_paye = Set(montant_paye);
                active.reste_a_payer = Set(reconciliation::reste_a_payer(total_ttc, montant_paye));
            })
            .await?;

        let mut transaction_active: transaction::ActiveModel = transaction_model.into();
        transaction_active.statut = Set(StatutTransaction::Validee.to_string());
        let transaction_model = transaction_active
            .update(&txn)
            .await
            .map_err(ServiceError::from_db)?;

        let numero_facture = self
            .numerotation
            .next_number(&txn, TypePiece::Facture, ctx.entreprise_id)
            .await?;
        let facture_model = facture::ActiveModel {
            id: Set(Uuid::new_v4()),
            transaction_id: Set(transaction_model.id),
            vente_id: Set(vente_model.id),
            numero_facture: Set(numero_facture),
            date_facture: Set(Utc::now()),
            date_echeance: Set(vente_model.date_echeance),
            statut: Set(statut.to_string()),
            url_fichier: Set(None),
            envoye: Set(false),
            date_envoi: Set(None),
            destinataire_email: Set(None),
            entreprise_id: Set(ctx.entreprise_id),
            cree_par: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::from_db)?;

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(
            vente_id = %vente_model.id,
            statut = %vente_model.statut,
            numero_facture = %facture_model.numero_facture,
            "vente validée"
        );
        self.emit(Event::VenteValidee {
            vente_id: vente_model.id,
            statut: vente_model.statut.clone(),
        })
        .await;
        self.emit(Event::FactureGeneree {
            facture_id: facture_model.id,
            numero_facture: facture_model.numero_facture.clone(),
        })
        .await;

        self.detail_for(ctx, vente_model, transaction_model).await
    }

    /// Cancels a sale. Terminal: cascades to the transaction and invoice.
    #[instrument(skip(self, request), fields(vente_id = %vente_id))]
    pub async fn cancel(
        &self,
        ctx: AuthContext,
        vente_id: Uuid,
        request: AnnulerVenteRequest,
    ) -> Result<vente::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db;
        let vente_model = self.find_vente(ctx, vente_id).await?;
        if parse_statut(&vente_model.statut)? == StatutVente::Annulee {
            return Err(ServiceError::InvalidState(
                "Vente déjà annulée".to_string(),
            ));
        }
        let transaction_model = self.find_transaction(ctx, vente_model.transaction_id).await?;

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let motif = request.motif.clone();
        let vente_model = self
            .persist_vente(&txn, vente_model, |active| {
                active.statut = Set(StatutVente::Annulee.to_string());
                active.motif_annulation = Set(Some(motif));
                active.date_annulation = Set(Some(Utc::now()));
            })
            .await?;

        let mut transaction_active: transaction::ActiveModel = transaction_model.into();
        transaction_active.statut = Set(StatutTransaction::Annulee.to_string());
        transaction_active
            .update(&txn)
            .await
            .map_err(ServiceError::from_db)?;

        if let Some(facture_model) = FactureEntity::find()
            .filter(facture::Column::VenteId.eq(vente_model.id))
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
        {
            let mut facture_active: facture::ActiveModel = facture_model.into();
            facture_active.statut = Set(StatutVente::Annulee.to_string());
            facture_active
                .update(&txn)
                .await
                .map_err(ServiceError::from_db)?;
        }

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(vente_id = %vente_model.id, "vente annulée");
        self.emit(Event::VenteAnnulee(vente_model.id)).await;

        Ok(vente_model)
    }

    /// Post-validation top-up payment.
    #[instrument(skip(self, request), fields(vente_id = %vente_id, montant = %request.montant))]
    pub async fn record_payment(
        &self,
        ctx: AuthContext,
        vente_id: Uuid,
        request: AjouterPaiementRequest,
    ) -> Result<VenteAvecTransaction, ServiceError> {
        validate_paiement(
            request.type_paiement,
            request.montant,
            request.reference.as_deref(),
        )?;

        let db = &*self.db;
        let vente_model = self.find_vente(ctx, vente_id).await?;
        match parse_statut(&vente_model.statut)? {
            StatutVente::Annulee => {
                return Err(ServiceError::InvalidState(
                    "Impossible d'ajouter un paiement à une vente annulée".to_string(),
                ))
            }
            StatutVente::Payee => {
                return Err(ServiceError::InvalidState(
                    "Cette vente est déjà entièrement payée".to_string(),
                ))
            }
            _ => {}
        }
        let transaction_model = self.find_transaction(ctx, vente_model.transaction_id).await?;

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        paiement::ActiveModel {
            id: Set(Uuid::new_v4()),
            transaction_id: Set(transaction_model.id),
            type_paiement: Set(request.type_paiement.to_string()),
            montant: Set(request.montant),
            date_paiement: Set(request.date_paiement.unwrap_or_else(Utc::now)),
            reference: Set(request.reference.clone()),
            banque: Set(request.banque.clone()),
            statut: Set(StatutPaiement::Recu.to_string()),
            date_statut: Set(Some(Utc::now())),
            notes_paiement: Set(request.notes_paiement.clone()),
            entreprise_id: Set(ctx.entreprise_id),
            cree_par: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::from_db)?;

        let vente_model = self
            .reconcile_vente(&txn, vente_model, &transaction_model)
            .await?;

        txn.commit().await.map_err(ServiceError::from_db)?;

        self.emit(Event::PaiementEnregistre {
            transaction_id: transaction_model.id,
            montant: request.montant,
        })
        .await;

        Ok(VenteAvecTransaction {
            vente: vente_model,
            transaction: transaction_model,
        })
    }

    /// Marks an installment received/rejected/deferred. Receiving one
    /// synthesizes a payment and recomputes both the sale and the schedule.
    #[instrument(skip(self, request), fields(echeance_id = %echeance_id, statut = %request.statut))]
    pub async fn update_installment_status(
        &self,
        ctx: AuthContext,
        echeance_id: Uuid,
        request: MajEcheanceRequest,
    ) -> Result<EcheancierResponse, ServiceError> {
        let db = &*self.db;

        let echeance_model = EcheanceEntity::find()
            .filter(echeance::Column::Id.eq(echeance_id))
            .filter(echeance::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Échéance non trouvée".to_string()))?;

        let vente_model = VenteEntity::find()
            .filter(vente::Column::TransactionId.eq(echeance_model.transaction_id))
            .filter(vente::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?;

        if let Some(v) = &vente_model {
            ensure_not_cancelled(v)?;
        }

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        // Receiving twice must not synthesize a second payment.
        let deja_recue =
            StatutEcheance::from_str(&echeance_model.statut) == Ok(StatutEcheance::Recu);
        let date_encaissement = request.date_encaissement.unwrap_or_else(Utc::now);
        let mut echeance_active: echeance::ActiveModel = echeance_model.clone().into();
        echeance_active.statut = Set(request.statut.to_string());
        if request.statut == StatutEcheance::Recu {
            echeance_active.date_encaissement = Set(Some(date_encaissement));
        }
        if let Some(notes) = &request.notes {
            echeance_active.notes = Set(Some(notes.clone()));
        }
        let echeance_model = echeance_active
            .update(&txn)
            .await
            .map_err(ServiceError::from_db)?;

        if request.statut == StatutEcheance::Recu && !deja_recue {
            // Synthesize the matching payment: instrument type, amount and
            // reference are copied from the installment.
            paiement::ActiveModel {
                id: Set(Uuid::new_v4()),
                transaction_id: Set(echeance_model.transaction_id),
                type_paiement: Set(echeance_model.type_paiement.clone()),
                montant: Set(echeance_model.montant),
                date_paiement: Set(date_encaissement),
                reference: Set(echeance_model.reference.clone()),
                banque: Set(echeance_model.banque.clone()),
                statut: Set(StatutPaiement::Recu.to_string()),
                date_statut: Set(Some(date_encaissement)),
                notes_paiement: Set(Some(format!(
                    "Échéance encaissée - {}",
                    request.notes.clone().unwrap_or_default()
                ))),
                entreprise_id: Set(ctx.entreprise_id),
                cree_par: Set(ctx.user_id),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::from_db)?;

            if let Some(vente_model) = vente_model {
                let transaction_model = self
                    .find_transaction_on(&txn, ctx, vente_model.transaction_id)
                    .await?;
                self.reconcile_vente(&txn, vente_model, &transaction_model)
                    .await?;
            }
        }

        // Recompute the owning schedule: TERMINE iff everything is received.
        let echeancier_model = EcheancierEntity::find()
            .filter(echeancier::Column::Id.eq(echeance_model.echeancier_id))
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Échéancier non trouvé".to_string()))?;

        let echeances = EcheanceEntity::find()
            .filter(echeance::Column::EcheancierId.eq(echeancier_model.id))
            .order_by_asc(echeance::Column::DateEcheance)
            .all(&txn)
            .await
            .map_err(ServiceError::from_db)?;

        let statut_echeancier = reconciliation::statut_echeancier(&echeances);
        let mut echeancier_active: echeancier::ActiveModel = echeancier_model.into();
        echeancier_active.statut = Set(statut_echeancier.to_string());
        let echeancier_model = echeancier_active
            .update(&txn)
            .await
            .map_err(ServiceError::from_db)?;

        txn.commit().await.map_err(ServiceError::from_db)?;

        self.emit(Event::EcheanceMiseAJour {
            echeance_id: echeance_model.id,
            statut: echeance_model.statut.clone(),
        })
        .await;
        if statut_echeancier == StatutEcheancier::Termine {
            self.emit(Event::EcheancierTermine(echeancier_model.id)).await;
        }

        Ok(EcheancierResponse {
            echeancier: echeancier_model,
            echeances,
        })
    }

    /// Transforms a devis into a bon de livraison, or a bon de livraison
    /// into a facture. The source keeps its lines and totals; the target
    /// starts a fresh BROUILLON lifecycle.
    #[instrument(skip(self, request), fields(vente_id = %vente_id))]
    pub async fn transform(
        &self,
        ctx: AuthContext,
        vente_id: Uuid,
        request: TransformerVenteRequest,
    ) -> Result<VenteAvecTransaction, ServiceError> {
        let db = &*self.db;
        let source = self.find_vente(ctx, vente_id).await?;
        ensure_not_cancelled(&source)?;
        if parse_statut(&source.statut)? == StatutVente::Transforme {
            return Err(ServiceError::InvalidState(
                "Document déjà transformé".to_string(),
            ));
        }

        let type_source = TypeDocument::from_str(&source.type_document)
            .map_err(|_| ServiceError::InternalError("type de document corrompu".to_string()))?;
        let type_cible = match type_source {
            TypeDocument::FactureProforma => TypeDocument::BonLivraison,
            TypeDocument::BonLivraison => TypeDocument::Facture,
            _ => {
                return Err(ServiceError::InvalidState(format!(
                    "La transformation depuis {} n'est pas prise en charge",
                    source.type_document
                )))
            }
        };

        let transaction_source = self.find_transaction(ctx, source.transaction_id).await?;
        let lignes = LigneEntity::find()
            .filter(ligne_transaction::Column::TransactionId.eq(transaction_source.id))
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;

        let txn = db.begin().await.map_err(ServiceError::from_db)?;
        let now = Utc::now();

        let numero_transaction = self
            .numerotation
            .next_number(
                &txn,
                TypePiece::Transaction(TypeTransaction::Vente),
                ctx.entreprise_id,
            )
            .await?;
        let transaction_cible = transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            type_transaction: Set(TypeTransaction::Vente.to_string()),
            tiers_id: Set(transaction_source.tiers_id),
            numero_transaction: Set(numero_transaction),
            date_transaction: Set(now),
            montant_total_ht: Set(transaction_source.montant_total_ht),
            montant_total_ttc: Set(transaction_source.montant_total_ttc),
            montant_taxes: Set(transaction_source.montant_taxes),
            statut: Set(StatutTransaction::Brouillon.to_string()),
            notes: Set(transaction_source.notes.clone()),
            entreprise_id: Set(ctx.entreprise_id),
            cree_par: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::from_db)?;

        for ligne in &lignes {
            ligne_transaction::ActiveModel {
                id: Set(Uuid::new_v4()),
                transaction_id: Set(transaction_cible.id),
                article_id: Set(ligne.article_id),
                designation: Set(ligne.designation.clone()),
                description: Set(ligne.description.clone()),
                quantite: Set(ligne.quantite),
                prix_unitaire_ht: Set(ligne.prix_unitaire_ht),
                taux_tva: Set(ligne.taux_tva),
                remise: Set(ligne.remise),
                montant_ht: Set(ligne.montant_ht),
                montant_tva: Set(ligne.montant_tva),
                montant_ttc: Set(ligne.montant_ttc),
                entreprise_id: Set(ctx.entreprise_id),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::from_db)?;
        }

        let numero_document = self
            .numerotation
            .next_number(&txn, TypePiece::Document(type_cible), ctx.entreprise_id)
            .await?;
        let mode_paiement = request
            .mode_paiement
            .map(|m| m.to_string())
            .unwrap_or_else(|| source.mode_paiement.clone());

        let cible = vente::ActiveModel {
            id: Set(Uuid::new_v4()),
            transaction_id: Set(transaction_cible.id),
            client_id: Set(source.client_id),
            date_vente: Set(now),
            date_echeance: Set(None),
            type_document: Set(type_cible.to_string()),
            numero_document: Set(numero_document),
            mode_paiement: Set(mode_paiement),
            remise_globale: Set(source.remise_globale),
            statut: Set(StatutVente::Brouillon.to_string()),
            montant_paye: Set(Decimal::ZERO),
            reste_a_payer: Set(transaction_cible.montant_total_ttc),
            motif_annulation: Set(None),
            date_annulation: Set(None),
            document_source: Set(Some(source.id)),
            notes_internes: Set(source.notes_internes.clone()),
            entreprise_id: Set(ctx.entreprise_id),
            cree_par: Set(ctx.user_id),
            version: Set(1),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::from_db)?;

        let source_id = source.id;
        self.persist_vente(&txn, source, |active| {
            active.statut = Set(StatutVente::Transforme.to_string());
        })
        .await?;

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(
            source_id = %source_id,
            cible_id = %cible.id,
            type_cible = %cible.type_document,
            "document transformé"
        );
        self.emit(Event::VenteTransformee {
            source_id,
            cible_id: cible.id,
        })
        .await;

        Ok(VenteAvecTransaction {
            vente: cible,
            transaction: transaction_cible,
        })
    }

    /// Lists sales with filters and pagination, newest first.
    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        ctx: AuthContext,
        filter: VenteFilter,
        page: u64,
        per_page: u64,
    ) -> Result<VenteListResponse, ServiceError> {
        let db = &*self.db;
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let mut query = VenteEntity::find()
            .filter(vente::Column::EntrepriseId.eq(ctx.entreprise_id));
        if let Some(statut) = &filter.statut {
            query = query.filter(vente::Column::Statut.eq(statut.clone()));
        }
        if let Some(client_id) = filter.client_id {
            query = query.filter(vente::Column::ClientId.eq(client_id));
        }
        if let Some(type_document) = &filter.type_document {
            query = query.filter(vente::Column::TypeDocument.eq(type_document.clone()));
        }
        if let Some(date_debut) = filter.date_debut {
            query = query.filter(vente::Column::DateVente.gte(date_debut));
        }
        if let Some(date_fin) = filter.date_fin {
            query = query.filter(vente::Column::DateVente.lte(date_fin));
        }

        let paginator = query
            .order_by_desc(vente::Column::DateVente)
            .paginate(db, per_page);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::from_db)?;
        let ventes = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::from_db)?;

        Ok(VenteListResponse {
            ventes,
            total,
            page,
            per_page,
        })
    }

    /// Full aggregate view of one sale.
    #[instrument(skip(self), fields(vente_id = %vente_id))]
    pub async fn get_detail(
        &self,
        ctx: AuthContext,
        vente_id: Uuid,
    ) -> Result<VenteDetailResponse, ServiceError> {
        let vente_model = self.find_vente(ctx, vente_id).await?;
        let transaction_model = self.find_transaction(ctx, vente_model.transaction_id).await?;
        self.detail_for(ctx, vente_model, transaction_model).await
    }

    /// Payments recorded against a sale, newest first.
    #[instrument(skip(self), fields(vente_id = %vente_id))]
    pub async fn list_payments(
        &self,
        ctx: AuthContext,
        vente_id: Uuid,
    ) -> Result<Vec<paiement::Model>, ServiceError> {
        let db = &*self.db;
        let vente_model = self.find_vente(ctx, vente_id).await?;
        PaiementEntity::find()
            .filter(paiement::Column::TransactionId.eq(vente_model.transaction_id))
            .order_by_desc(paiement::Column::DatePaiement)
            .all(db)
            .await
            .map_err(ServiceError::from_db)
    }

    /// Schedule attached to a sale, if any.
    #[instrument(skip(self), fields(vente_id = %vente_id))]
    pub async fn get_schedule(
        &self,
        ctx: AuthContext,
        vente_id: Uuid,
    ) -> Result<Option<EcheancierResponse>, ServiceError> {
        let db = &*self.db;
        let vente_model = self.find_vente(ctx, vente_id).await?;

        let Some(echeancier_model) = EcheancierEntity::find()
            .filter(echeancier::Column::TransactionId.eq(vente_model.transaction_id))
            .filter(echeancier::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
        else {
            return Ok(None);
        };

        let echeances = EcheanceEntity::find()
            .filter(echeance::Column::EcheancierId.eq(echeancier_model.id))
            .order_by_asc(echeance::Column::DateEcheance)
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;

        Ok(Some(EcheancierResponse {
            echeancier: echeancier_model,
            echeances,
        }))
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn find_vente(
        &self,
        ctx: AuthContext,
        vente_id: Uuid,
    ) -> Result<vente::Model, ServiceError> {
        VenteEntity::find()
            .filter(vente::Column::Id.eq(vente_id))
            .filter(vente::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Vente non trouvée".to_string()))
    }

    async fn find_brouillon(
        &self,
        ctx: AuthContext,
        vente_id: Uuid,
    ) -> Result<vente::Model, ServiceError> {
        let vente_model = self.find_vente(ctx, vente_id).await?;
        if parse_statut(&vente_model.statut)? != StatutVente::Brouillon {
            return Err(ServiceError::InvalidState(
                "Vente déjà validée".to_string(),
            ));
        }
        Ok(vente_model)
    }

    async fn find_transaction(
        &self,
        ctx: AuthContext,
        transaction_id: Uuid,
    ) -> Result<transaction::Model, ServiceError> {
        self.find_transaction_on(&*self.db, ctx, transaction_id).await
    }

    async fn find_transaction_on<C: ConnectionTrait>(
        &self,
        db: &C,
        ctx: AuthContext,
        transaction_id: Uuid,
    ) -> Result<transaction::Model, ServiceError> {
        TransactionEntity::find()
            .filter(transaction::Column::Id.eq(transaction_id))
            .filter(transaction::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Transaction associée non trouvée".to_string()))
    }

    async fn delete_schedule<C: ConnectionTrait>(
        &self,
        db: &C,
        transaction_id: Uuid,
    ) -> Result<(), ServiceError> {
        EcheanceEntity::delete_many()
            .filter(echeance::Column::TransactionId.eq(transaction_id))
            .exec(db)
            .await
            .map_err(ServiceError::from_db)?;
        EcheancierEntity::delete_many()
            .filter(echeancier::Column::TransactionId.eq(transaction_id))
            .exec(db)
            .await
            .map_err(ServiceError::from_db)?;
        Ok(())
    }

    /// Applies `mutate` to the sale and persists it guarded by the version
    /// token. A concurrent writer that bumped the version first wins; this
    /// write is rejected.
    async fn persist_vente<C: ConnectionTrait>(
        &self,
        db: &C,
        vente_model: vente::Model,
        mutate: impl FnOnce(&mut vente::ActiveModel),
    ) -> Result<vente::Model, ServiceError> {
        let vente_id = vente_model.id;
        let expected_version = vente_model.version;

        let mut active: vente::ActiveModel = vente_model.into();
        mutate(&mut active);
        active.id = ActiveValue::Unchanged(vente_id);
        active.version = Set(expected_version + 1);
        active.updated_at = Set(Some(Utc::now()));

        let result = VenteEntity::update_many()
            .set(active)
            .filter(vente::Column::Id.eq(vente_id))
            .filter(vente::Column::Version.eq(expected_version))
            .exec(db)
            .await
            .map_err(ServiceError::from_db)?;

        if result.rows_affected == 0 {
            error!(vente_id = %vente_id, expected_version, "version conflict on vente update");
            return Err(ServiceError::ConcurrentModification(vente_id));
        }

        VenteEntity::find_by_id(vente_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Vente non trouvée".to_string()))
    }

    /// Recomputes montant_paye / reste_a_payer / statut from the current
    /// payment set and persists them together, mirroring the invoice.
    async fn reconcile_vente<C: ConnectionTrait>(
        &self,
        db: &C,
        vente_model: vente::Model,
        transaction_model: &transaction::Model,
    ) -> Result<vente::Model, ServiceError> {
        let paiements = PaiementEntity::find()
            .filter(paiement::Column::TransactionId.eq(transaction_model.id))
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;

        let montant_paye = reconciliation::montant_paye(&paiements);
        let total_ttc = transaction_model.montant_total_ttc;
        let statut_courant = parse_statut(&vente_model.statut)?;
        let statut = reconciliation::derive_statut(statut_courant, total_ttc, montant_paye);

        let vente_model = self
            .persist_vente(db, vente_model, |active| {
                active.montant_paye = Set(montant_paye);
                active.reste_a_payer = Set(reconciliation::reste_a_payer(total_ttc, montant_paye));
                active.statut = Set(statut.to_string());
            })
            .await?;

        if let Some(facture_model) = FactureEntity::find()
            .filter(facture::Column::VenteId.eq(vente_model.id))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
        {
            let mut facture_active: facture::ActiveModel = facture_model.into();
            facture_active.statut = Set(statut.to_string());
            facture_active
                .update(db)
                .await
                .map_err(ServiceError::from_db)?;
        }

        Ok(vente_model)
    }

    async fn detail_for(
        &self,
        ctx: AuthContext,
        vente_model: vente::Model,
        transaction_model: transaction::Model,
    ) -> Result<VenteDetailResponse, ServiceError> {
        let db = &*self.db;

        let client = TiersEntity::find()
            .filter(tiers::Column::Id.eq(vente_model.client_id))
            .filter(tiers::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?;

        let lignes = LigneEntity::find()
            .filter(ligne_transaction::Column::TransactionId.eq(transaction_model.id))
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;

        let remises = RemiseEntity::find()
            .filter(remise::Column::TransactionId.eq(transaction_model.id))
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;

        let paiements = PaiementEntity::find()
            .filter(paiement::Column::TransactionId.eq(transaction_model.id))
            .order_by_desc(paiement::Column::DatePaiement)
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;

        let echeancier_model = EcheancierEntity::find()
            .filter(echeancier::Column::TransactionId.eq(transaction_model.id))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?;

        let echeances = match &echeancier_model {
            Some(e) => EcheanceEntity::find()
                .filter(echeance::Column::EcheancierId.eq(e.id))
                .order_by_asc(echeance::Column::DateEcheance)
                .all(db)
                .await
                .map_err(ServiceError::from_db)?,
            None => Vec::new(),
        };

        let facture_model = FactureEntity::find()
            .filter(facture::Column::VenteId.eq(vente_model.id))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?;

        Ok(VenteDetailResponse {
            vente: vente_model,
            transaction: transaction_model,
            client,
            lignes,
            remises,
            paiements,
            echeancier: echeancier_model,
            echeances,
            facture: facture_model,
        })
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_ligne(ligne: &LigneInput) -> Result<(), ServiceError> {
    if ligne.designation.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "La désignation est obligatoire".to_string(),
        ));
    }
    if ligne.quantite <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "Quantité invalide pour {}: {}",
            ligne.designation, ligne.quantite
        )));
    }
    if ligne.prix_unitaire_ht < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "Prix unitaire négatif pour {}",
            ligne.designation
        )));
    }
    if ligne.taux_tva < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "Taux de TVA négatif pour {}",
            ligne.designation
        )));
    }
    if ligne.remise < Decimal::ZERO || ligne.remise > Decimal::from(100) {
        return Err(ServiceError::ValidationError(format!(
            "Remise hors bornes pour {}: {}",
            ligne.designation, ligne.remise
        )));
    }
    Ok(())
}

fn validate_paiement(
    type_paiement: TypePaiement,
    montant: Decimal,
    reference: Option<&str>,
) -> Result<(), ServiceError> {
    if montant <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "Le montant du paiement doit être supérieur à 0 (reçu: {montant})"
        )));
    }
    if type_paiement.requires_reference()
        && reference.map(|r| r.trim().is_empty()).unwrap_or(true)
    {
        return Err(ServiceError::ValidationError(format!(
            "Une référence est obligatoire pour un paiement {type_paiement}"
        )));
    }
    Ok(())
}

fn ensure_not_cancelled(vente_model: &vente::Model) -> Result<(), ServiceError> {
    if parse_statut(&vente_model.statut)? == StatutVente::Annulee {
        return Err(ServiceError::InvalidState(
            "Impossible de modifier une vente annulée".to_string(),
        ));
    }
    Ok(())
}

fn parse_statut(raw: &str) -> Result<StatutVente, ServiceError> {
    StatutVente::from_str(raw)
        .map_err(|_| ServiceError::InternalError(format!("statut de vente corrompu: {raw}")))
}

fn parse_mode(raw: &str) -> Result<ModePaiement, ServiceError> {
    ModePaiement::from_str(raw)
        .map_err(|_| ServiceError::InternalError(format!("mode de paiement corrompu: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ligne(designation: &str, quantite: Decimal, remise: Decimal) -> LigneInput {
        LigneInput {
            article_id: None,
            designation: designation.to_string(),
            description: None,
            quantite,
            prix_unitaire_ht: dec!(10),
            taux_tva: dec!(19),
            remise,
        }
    }

    #[test]
    fn ligne_validation_rejects_bad_input() {
        assert!(validate_ligne(&ligne("ok", dec!(1), Decimal::ZERO)).is_ok());
        assert!(validate_ligne(&ligne("", dec!(1), Decimal::ZERO)).is_err());
        assert!(validate_ligne(&ligne("x", Decimal::ZERO, Decimal::ZERO)).is_err());
        assert!(validate_ligne(&ligne("x", dec!(1), dec!(101))).is_err());
    }

    #[test]
    fn paiement_validation_requires_reference_for_instruments() {
        assert!(validate_paiement(TypePaiement::Especes, dec!(10), None).is_ok());
        assert!(validate_paiement(TypePaiement::Cheque, dec!(10), None).is_err());
        assert!(validate_paiement(TypePaiement::Cheque, dec!(10), Some("  ")).is_err());
        assert!(validate_paiement(TypePaiement::Cheque, dec!(10), Some("CHQ-1")).is_ok());
        assert!(validate_paiement(TypePaiement::Especes, Decimal::ZERO, None).is_err());
    }
}
