use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// One commercial movement (sale or purchase). Totals are recomputed by the
/// line-item step and must never be mutated anywhere else.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub type_transaction: String,
    pub tiers_id: Uuid,
    pub numero_transaction: String,
    pub date_transaction: DateTime<Utc>,
    pub montant_total_ht: Decimal,
    pub montant_total_ttc: Decimal,
    pub montant_taxes: Decimal,
    pub statut: String,
    pub notes: Option<String>,
    pub entreprise_id: Uuid,
    pub cree_par: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeTransaction {
    Vente,
    Achat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatutTransaction {
    Brouillon,
    Validee,
    Annulee,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tiers::Entity",
        from = "Column::TiersId",
        to = "super::tiers::Column::Id"
    )]
    Tiers,
    #[sea_orm(has_many = "super::ligne_transaction::Entity")]
    Lignes,
    #[sea_orm(has_many = "super::paiement::Entity")]
    Paiements,
    #[sea_orm(has_many = "super::echeance::Entity")]
    Echeances,
}

impl Related<super::tiers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tiers.def()
    }
}

impl Related<super::ligne_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lignes.def()
    }
}

impl Related<super::paiement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Paiements.def()
    }
}

impl Related<super::echeance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Echeances.def()
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
