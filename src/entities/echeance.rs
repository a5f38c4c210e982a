use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

/// One entry in an installment schedule. When marked RECU a corresponding
/// Paiement is synthesized and the owning schedule recomputes its status.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "echeances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub echeancier_id: Uuid,
    pub date_echeance: DateTime<Utc>,
    pub montant: Decimal,
    pub type_paiement: String,
    pub reference: Option<String>,
    pub banque: Option<String>,
    pub statut: String,
    pub date_encaissement: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub entreprise_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payment instrument carried by an installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeEcheance {
    Cheque,
    Effet,
    Virement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatutEcheance {
    ARecevoir,
    Recu,
    Rejete,
    Reporte,
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
        belongs_to = "super::echeancier::Entity",
        from = "Column::EcheancierId",
        to = "super::echeancier::Column::Id"
    )]
    Echeancier,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl Related<super::echeancier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Echeancier.def()
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
    fn statut_a_recevoir_serializes_with_underscore() {
        assert_eq!(StatutEcheance::ARecevoir.to_string(), "A_RECEVOIR");
        assert_eq!(
            StatutEcheance::from_str("A_RECEVOIR").unwrap(),
            StatutEcheance::ARecevoir
        );
    }
}
