use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generated invoice record. A rendering of the transaction's monetary
/// state at emission time, never the source of truth for it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "factures")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transaction_id: Uuid,
    #[sea_orm(unique)]
    pub vente_id: Uuid,
    #[sea_orm(unique)]
    pub numero_facture: String,
    pub date_facture: DateTime<Utc>,
    pub date_echeance: Option<DateTime<Utc>>,
    /// Mirrors the vente statut at every payment event.
    pub statut: String,
    pub url_fichier: Option<String>,
    pub envoye: bool,
    pub date_envoi: Option<DateTime<Utc>>,
    pub destinataire_email: Option<String>,
    pub entreprise_id: Uuid,
    pub cree_par: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vente::Entity",
        from = "Column::VenteId",
        to = "super::vente::Column::Id"
    )]
    Vente,
    #[sea_orm(
        belongs_to = "super::transaction::Entity",
        from = "Column::TransactionId",
        to = "super::transaction::Column::Id"
    )]
    Transaction,
}

impl Related<super::vente::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vente.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
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
