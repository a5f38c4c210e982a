use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthContext,
    db::DbPool,
    entities::paiement::{self, Entity as PaiementEntity},
    errors::ServiceError,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PaiementFilter {
    pub transaction_id: Option<Uuid>,
    pub statut: Option<String>,
    pub type_paiement: Option<String>,
    pub date_debut: Option<DateTime<Utc>>,
    pub date_fin: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct PaiementListResponse {
    pub paiements: Vec<paiement::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Read side of the payment ledger. Writes always go through the sale and
/// purchase workflows so amounts and statuses stay reconciled.
#[derive(Clone)]
pub struct PaiementService {
    db: Arc<DbPool>,
}

impl PaiementService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(paiement_id = %paiement_id))]
    pub async fn get(
        &self,
        ctx: AuthContext,
        paiement_id: Uuid,
    ) -> Result<paiement::Model, ServiceError> {
        PaiementEntity::find()
            .filter(paiement::Column::Id.eq(paiement_id))
            .filter(paiement::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Paiement non trouvé".to_string()))
    }

    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        ctx: AuthContext,
        filter: PaiementFilter,
        page: u64,
        per_page: u64,
    ) -> Result<PaiementListResponse, ServiceError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let mut query = PaiementEntity::find()
            .filter(paiement::Column::EntrepriseId.eq(ctx.entreprise_id));
        if let Some(transaction_id) = filter.transaction_id {
            query = query.filter(paiement::Column::TransactionId.eq(transaction_id));
        }
        if let Some(statut) = &filter.statut {
            query = query.filter(paiement::Column::Statut.eq(statut.clone()));
        }
        if let Some(type_paiement) = &filter.type_paiement {
            query = query.filter(paiement::Column::TypePaiement.eq(type_paiement.clone()));
        }
        if let Some(date_debut) = filter.date_debut {
            query = query.filter(paiement::Column::DatePaiement.gte(date_debut));
        }
        if let Some(date_fin) = filter.date_fin {
            query = query.filter(paiement::Column::DatePaiement.lte(date_fin));
        }

        let paginator = query
            .order_by_desc(paiement::Column::DatePaiement)
            .paginate(&*self.db, per_page);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::from_db)?;
        let paiements = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::from_db)?;

        Ok(PaiementListResponse {
            paiements,
            total,
            page,
            per_page,
        })
    }
}
