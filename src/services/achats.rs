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
    entities::achat::{self, Entity as AchatEntity},
    entities::ligne_transaction::{self, Entity as LigneEntity},
    entities::paiement::{self, Entity as PaiementEntity, StatutPaiement},
    entities::tiers::{self, Entity as TiersEntity, TypeTiers},
    entities::transaction::{
        self, Entity as TransactionEntity, StatutTransaction, TypeTransaction,
    },
    entities::vente::StatutVente,
    errors::ServiceError,
    events::{Event, EventSender},
    services::montants::{self, LigneTotaux},
    services::numerotation::{NumerotationService, TypePiece},
    services::reconciliation,
    services::ventes::{AjouterPaiementRequest, LigneInput, PaiementInput},
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreerAchatRequest {
    pub fournisseur_id: Uuid,
    pub date_achat: Option<DateTime<Utc>>,
    #[validate(length(min = 1, message = "Au moins une ligne est requise"))]
    pub lignes: Vec<LigneInput>,
    #[serde(default)]
    pub paiements: Vec<PaiementInput>,
    pub notes_internes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AchatAvecTransaction {
    pub achat: achat::Model,
    pub transaction: transaction::Model,
}

#[derive(Debug, Serialize)]
pub struct AchatListResponse {
    pub achats: Vec<achat::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Serialize)]
pub struct AchatDetailResponse {
    pub achat: achat::Model,
    pub transaction: transaction::Model,
    pub fournisseur: Option<tiers::Model>,
    pub lignes: Vec<ligne_transaction::Model>,
    pub paiements: Vec<paiement::Model>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AchatFilter {
    pub statut: Option<String>,
    pub fournisseur_id: Option<Uuid>,
    pub date_debut: Option<DateTime<Utc>>,
    pub date_fin: Option<DateTime<Utc>>,
}

/// Purchase recording. Unlike sales, a purchase arrives complete (the
/// supplier document already exists) and is persisted validated in one
/// step; payment reconciliation afterwards is shared with sales.
#[derive(Clone)]
pub struct AchatService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    numerotation: NumerotationService,
}

impl AchatService {
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

    /// Records a purchase with its lines and optional payments. Totals are
    /// recomputed server-side from the lines.
    #[instrument(skip(self, request), fields(fournisseur_id = %request.fournisseur_id, entreprise_id = %ctx.entreprise_id))]
    pub async fn create(
        &self,
        ctx: AuthContext,
        request: CreerAchatRequest,
    ) -> Result<AchatAvecTransaction, ServiceError> {
        request.validate()?;

        let db = &*self.db;

        let fournisseur = TiersEntity::find()
            .filter(tiers::Column::Id.eq(request.fournisseur_id))
            .filter(tiers::Column::TypeTiers.eq(TypeTiers::Fournisseur.to_string()))
            .filter(tiers::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Fournisseur non trouvé".to_string()))?;

        let date_achat = request.date_achat.unwrap_or_else(Utc::now);

        let mut lignes_totaux: Vec<LigneTotaux> = Vec::with_capacity(request.lignes.len());
        for ligne in &request.lignes {
            if ligne.quantite <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Quantité invalide pour {}: {}",
                    ligne.designation, ligne.quantite
                )));
            }
            lignes_totaux.push(montants::ligne_totaux(
                ligne.quantite,
                ligne.prix_unitaire_ht,
                ligne.remise,
                ligne.taux_tva,
            ));
        }
        let totaux = montants::totaux(&lignes_totaux);

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let numero_transaction = self
            .numerotation
            .next_number(
                &txn,
                TypePiece::Transaction(TypeTransaction::Achat),
                ctx.entreprise_id,
            )
            .await?;

        let transaction_model = transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            type_transaction: Set(TypeTransaction::Achat.to_string()),
            tiers_id: Set(fournisseur.id),
            numero_transaction: Set(numero_transaction),
            date_transaction: Set(date_achat),
            montant_total_ht: Set(totaux.montant_ht),
            montant_total_ttc: Set(totaux.montant_ttc),
            montant_taxes: Set(totaux.montant_taxes),
            statut: Set(StatutTransaction::Validee.to_string()),
            notes: Set(request.notes_internes.clone()),
            entreprise_id: Set(ctx.entreprise_id),
            cree_par: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::from_db)?;

        for (ligne, calcul) in request.lignes.iter().zip(&lignes_totaux) {
            ligne_transaction::ActiveModel {
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
        }

        let mut paiements: Vec<paiement::Model> = Vec::with_capacity(request.paiements.len());
        for paiement_input in &request.paiements {
            if paiement_input.montant <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Le montant du paiement doit être supérieur à 0 (reçu: {})",
                    paiement_input.montant
                )));
            }
            let statut = paiement_input
                .statut
                .unwrap_or(StatutPaiement::Decaisse);
            let model = paiement::ActiveModel {
                id: Set(Uuid::new_v4()),
                transaction_id: Set(transaction_model.id),
                type_paiement: Set(paiement_input.type_paiement.to_string()),
                montant: Set(paiement_input.montant),
                date_paiement: Set(paiement_input.date_paiement.unwrap_or(date_achat)),
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
            paiements.push(model);
        }

        let montant_paye = reconciliation::montant_paye(&paiements);
        let statut = reconciliation::derive_statut(
            StatutVente::Validee,
            totaux.montant_ttc,
            montant_paye,
        );

        let achat_model = achat::ActiveModel {
            id: Set(Uuid::new_v4()),
            transaction_id: Set(transaction_model.id),
            fournisseur_id: Set(fournisseur.id),
            date_achat: Set(date_achat),
            statut: Set(statut.to_string()),
            montant_paye: Set(montant_paye),
            reste_a_payer: Set(reconciliation::reste_a_payer(totaux.montant_ttc, montant_paye)),
            motif_annulation: Set(None),
            date_annulation: Set(None),
            notes_internes: Set(request.notes_internes.clone()),
            entreprise_id: Set(ctx.entreprise_id),
            cree_par: Set(ctx.user_id),
            version: Set(1),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::from_db)?;

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(
            achat_id = %achat_model.id,
            numero = %transaction_model.numero_transaction,
            montant_total_ttc = %totaux.montant_ttc,
            "achat créé"
        );
        self.emit(Event::AchatCree(achat_model.id)).await;

        Ok(AchatAvecTransaction {
            achat: achat_model,
            transaction: transaction_model,
        })
    }

    /// Records a supplier payment against the purchase and re-derives its
    /// status, exactly like the sale-side reconciliation.
    #[instrument(skip(self, request), fields(achat_id = %achat_id, montant = %request.montant))]
    pub async fn record_payment(
        &self,
        ctx: AuthContext,
        achat_id: Uuid,
        request: AjouterPaiementRequest,
    ) -> Result<AchatAvecTransaction, ServiceError> {
        if request.montant <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Le montant du paiement doit être supérieur à 0 (reçu: {})",
                request.montant
            )));
        }

        let db = &*self.db;
        let achat_model = self.find_achat(ctx, achat_id).await?;
        match StatutVente::from_str(&achat_model.statut) {
            Ok(StatutVente::Annulee) => {
                return Err(ServiceError::InvalidState(
                    "Impossible d'ajouter un paiement à un achat annulé".to_string(),
                ))
            }
            Ok(StatutVente::Payee) => {
                return Err(ServiceError::InvalidState(
                    "Cet achat est déjà entièrement payé".to_string(),
                ))
            }
            _ => {}
        }

        let transaction_model = self.find_transaction(ctx, achat_model.transaction_id).await?;

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        paiement::ActiveModel {
            id: Set(Uuid::new_v4()),
            transaction_id: Set(transaction_model.id),
            type_paiement: Set(request.type_paiement.to_string()),
            montant: Set(request.montant),
            date_paiement: Set(request.date_paiement.unwrap_or_else(Utc::now)),
            reference: Set(request.reference.clone()),
            banque: Set(request.banque.clone()),
            statut: Set(StatutPaiement::Decaisse.to_string()),
            date_statut: Set(Some(Utc::now())),
            notes_paiement: Set(request.notes_paiement.clone()),
            entreprise_id: Set(ctx.entreprise_id),
            cree_par: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::from_db)?;

        let paiements = PaiementEntity::find()
            .filter(paiement::Column::TransactionId.eq(transaction_model.id))
            .all(&txn)
            .await
            .map_err(ServiceError::from_db)?;

        let montant_paye = reconciliation::montant_paye(&paiements);
        let total_ttc = transaction_model.montant_total_ttc;
        let statut_courant = StatutVente::from_str(&achat_model.statut)
            .map_err(|_| ServiceError::InternalError("statut d'achat corrompu".to_string()))?;
        let statut = reconciliation::derive_statut(statut_courant, total_ttc, montant_paye);

        let achat_model = self
            .persist_achat(&txn, achat_model, |active| {
                active.montant_paye = Set(montant_paye);
                active.reste_a_payer = Set(reconciliation::reste_a_payer(total_ttc, montant_paye));
                active.statut = Set(statut.to_string());
            })
            .await?;

        txn.commit().await.map_err(ServiceError::from_db)?;

        self.emit(Event::PaiementEnregistre {
            transaction_id: transaction_model.id,
            montant: request.montant,
        })
        .await;

        Ok(AchatAvecTransaction {
            achat: achat_model,
            transaction: transaction_model,
        })
    }

    /// Cancels a purchase (terminal, reason required).
    #[instrument(skip(self), fields(achat_id = %achat_id))]
    pub async fn cancel(
        &self,
        ctx: AuthContext,
        achat_id: Uuid,
        motif: String,
    ) -> Result<achat::Model, ServiceError> {
        if motif.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Motif d'annulation requis".to_string(),
            ));
        }

        let db = &*self.db;
        let achat_model = self.find_achat(ctx, achat_id).await?;
        if StatutVente::from_str(&achat_model.statut) == Ok(StatutVente::Annulee) {
            return Err(ServiceError::InvalidState("Achat déjà annulé".to_string()));
        }
        let transaction_model = self.find_transaction(ctx, achat_model.transaction_id).await?;

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let achat_model = self
            .persist_achat(&txn, achat_model, |active| {
                active.statut = Set(StatutVente::Annulee.to_string());
                active.motif_annulation = Set(Some(motif.clone()));
                active.date_annulation = Set(Some(Utc::now()));
            })
            .await?;

        let mut transaction_active: transaction::ActiveModel = transaction_model.into();
        transaction_active.statut = Set(StatutTransaction::Annulee.to_string());
        transaction_active
            .update(&txn)
            .await
            .map_err(ServiceError::from_db)?;

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(achat_id = %achat_model.id, "achat annulé");
        self.emit(Event::AchatAnnule(achat_model.id)).await;

        Ok(achat_model)
    }

    /// Lists purchases with filters and pagination, newest first.
    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        ctx: AuthContext,
        filter: AchatFilter,
        page: u64,
        per_page: u64,
    ) -> Result<AchatListResponse, ServiceError> {
        let db = &*self.db;
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let mut query = AchatEntity::find()
            .filter(achat::Column::EntrepriseId.eq(ctx.entreprise_id));
        if let Some(statut) = &filter.statut {
            query = query.filter(achat::Column::Statut.eq(statut.clone()));
        }
        if let Some(fournisseur_id) = filter.fournisseur_id {
            query = query.filter(achat::Column::FournisseurId.eq(fournisseur_id));
        }
        if let Some(date_debut) = filter.date_debut {
            query = query.filter(achat::Column::DateAchat.gte(date_debut));
        }
        if let Some(date_fin) = filter.date_fin {
            query = query.filter(achat::Column::DateAchat.lte(date_fin));
        }

        let paginator = query
            .order_by_desc(achat::Column::DateAchat)
            .paginate(db, per_page);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::from_db)?;
        let achats = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::from_db)?;

        Ok(AchatListResponse {
            achats,
            total,
            page,
            per_page,
        })
    }

    /// Full aggregate view of one purchase.
    #[instrument(skip(self), fields(achat_id = %achat_id))]
    pub async fn get_detail(
        &self,
        ctx: AuthContext,
        achat_id: Uuid,
    ) -> Result<AchatDetailResponse, ServiceError> {
        let db = &*self.db;
        let achat_model = self.find_achat(ctx, achat_id).await?;
        let transaction_model = self.find_transaction(ctx, achat_model.transaction_id).await?;

        let fournisseur = TiersEntity::find()
            .filter(tiers::Column::Id.eq(achat_model.fournisseur_id))
            .filter(tiers::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?;

        let lignes = LigneEntity::find()
            .filter(ligne_transaction::Column::TransactionId.eq(transaction_model.id))
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;

        let paiements = PaiementEntity::find()
            .filter(paiement::Column::TransactionId.eq(transaction_model.id))
            .order_by_desc(paiement::Column::DatePaiement)
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;

        Ok(AchatDetailResponse {
            achat: achat_model,
            transaction: transaction_model,
            fournisseur,
            lignes,
            paiements,
        })
    }

    async fn find_achat(
        &self,
        ctx: AuthContext,
        achat_id: Uuid,
    ) -> Result<achat::Model, ServiceError> {
        AchatEntity::find()
            .filter(achat::Column::Id.eq(achat_id))
            .filter(achat::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Achat non trouvé".to_string()))
    }

    async fn find_transaction(
        &self,
        ctx: AuthContext,
        transaction_id: Uuid,
    ) -> Result<transaction::Model, ServiceError> {
        TransactionEntity::find()
            .filter(transaction::Column::Id.eq(transaction_id))
            .filter(transaction::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Transaction associée non trouvée".to_string()))
    }

    async fn persist_achat<C: ConnectionTrait>(
        &self,
        db: &C,
        achat_model: achat::Model,
        mutate: impl FnOnce(&mut achat::ActiveModel),
    ) -> Result<achat::Model, ServiceError> {
        let achat_id = achat_model.id;
        let expected_version = achat_model.version;

        let mut active: achat::ActiveModel = achat_model.into();
        mutate(&mut active);
        active.id = ActiveValue::Unchanged(achat_id);
        active.version = Set(expected_version + 1);
        active.updated_at = Set(Some(Utc::now()));

        let result = AchatEntity::update_many()
            .set(active)
            .filter(achat::Column::Id.eq(achat_id))
            .filter(achat::Column::Version.eq(expected_version))
            .exec(db)
            .await
            .map_err(ServiceError::from_db)?;

        if result.rows_affected == 0 {
            error!(achat_id = %achat_id, expected_version, "version conflict on achat update");
            return Err(ServiceError::ConcurrentModification(achat_id));
        }

        AchatEntity::find_by_id(achat_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Achat non trouvé".to_string()))
    }
}
