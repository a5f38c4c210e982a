use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

/// Workflow wrapper around a VENTE transaction. Carries the payment state
/// (montant_paye / reste_a_payer) and the document lifecycle status.
///
/// `version` is the optimistic-concurrency token: every mutating workflow
/// step increments it, and a stale token is rejected with
/// `ConcurrentModification`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ventes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub client_id: Uuid,
    pub date_vente: DateTime<Utc>,
    /// Latest due date across the installment schedule, if any.
    pub date_echeance: Option<DateTime<Utc>>,
    pub type_document: String,
    pub numero_document: String,
    pub mode_paiement: String,
    pub remise_globale: Decimal,
    pub statut: String,
    pub montant_paye: Decimal,
    pub reste_a_payer: Decimal,
    pub motif_annulation: Option<String>,
    pub date_annulation: Option<DateTime<Utc>>,
    /// Source document when this sale was produced by a transformation
    /// (devis -> bon de livraison -> facture).
    pub document_source: Option<Uuid>,
    pub notes_internes: Option<String>,
    pub entreprise_id: Uuid,
    pub cree_par: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatutVente {
    Brouillon,
    Validee,
    PartiellementPayee,
    Payee,
    Annulee,
    Transforme,
}

impl StatutVente {
    /// ANNULEE is terminal: no transition leaves it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StatutVente::Annulee)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModePaiement {
    Especes,
    ChequeUnique,
    EffetUnique,
    ChequesMultiples,
    EffetsMultiples,
    PaiementMixte,
}

impl ModePaiement {
    /// Modes that require a balanced installment schedule before validation.
    pub fn requires_echeancier(&self) -> bool {
        matches!(
            self,
            ModePaiement::ChequesMultiples
                | ModePaiement::EffetsMultiples
                | ModePaiement::PaiementMixte
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeDocument {
    Facture,
    BonLivraison,
    FactureProforma,
    Avoir,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transaction::Entity",
        from = "Column::TransactionId",
        to = "super::transaction::Column::Id"
    )]
    Transaction,
    #[sea_orm(
        belongs_to = "super::tiers::Entity",
        from = "Column::ClientId",
        to = "super::tiers::Column::Id"
    )]
    Client,
    #[sea_orm(has_many = "super::facture::Entity")]
    Factures,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl Related<super::tiers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::facture::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Factures.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        if let ActiveValue::NotSet = active_model.updated_at {
            active_model.updated_at = Set(Some(now));
        }

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn statut_round_trips_through_screaming_snake_case() {
        assert_eq!(StatutVente::PartiellementPayee.to_string(), "PARTIELLEMENT_PAYEE");
        assert_eq!(
            StatutVente::from_str("PARTIELLEMENT_PAYEE").unwrap(),
            StatutVente::PartiellementPayee
        );
        assert!(StatutVente::from_str("INCONNU").is_err());
    }

    #[test]
    fn schedule_requiring_modes() {
        assert!(ModePaiement::ChequesMultiples.requires_echeancier());
        assert!(ModePaiement::EffetsMultiples.requires_echeancier());
        assert!(ModePaiement::PaiementMixte.requires_echeancier());
        assert!(!ModePaiement::Especes.requires_echeancier());
        assert!(!ModePaiement::ChequeUnique.requires_echeancier());
    }

    #[test]
    fn annulee_is_terminal() {
        assert!(StatutVente::Annulee.is_terminal());
        assert!(!StatutVente::Payee.is_terminal());
        assert!(!StatutVente::Brouillon.is_terminal());
    }
}
