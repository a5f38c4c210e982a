use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthContext,
    db::DbPool,
    entities::tiers::{self, Entity as TiersEntity, TypeTiers},
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreerTiersRequest {
    pub type_tiers: TypeTiers,
    #[validate(length(min = 1, message = "Le nom est obligatoire"))]
    pub nom: String,
    pub prenom: Option<String>,
    pub raison_sociale: Option<String>,
    #[validate(email(message = "Email invalide"))]
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub adresse: Option<String>,
    pub matricule_fiscal: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TiersFilter {
    pub type_tiers: Option<String>,
    /// Substring search over nom / prénom / raison sociale.
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TiersListResponse {
    pub tiers: Vec<tiers::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Counterparty directory (clients and suppliers).
#[derive(Clone)]
pub struct TiersService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl TiersService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a counterparty. A duplicate matricule fiscal within the
    /// tenant surfaces as `Duplicate`.
    #[instrument(skip(self, request), fields(entreprise_id = %ctx.entreprise_id))]
    pub async fn create(
        &self,
        ctx: AuthContext,
        request: CreerTiersRequest,
    ) -> Result<tiers::Model, ServiceError> {
        request.validate()?;

        let model = tiers::ActiveModel {
            id: Set(Uuid::new_v4()),
            type_tiers: Set(request.type_tiers.to_string()),
            nom: Set(request.nom),
            prenom: Set(request.prenom),
            raison_sociale: Set(request.raison_sociale),
            email: Set(request.email),
            telephone: Set(request.telephone),
            adresse: Set(request.adresse),
            matricule_fiscal: Set(request.matricule_fiscal),
            solde_courant: Set(Decimal::ZERO),
            entreprise_id: Set(ctx.entreprise_id),
            cree_par: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(ServiceError::from_db)?;

        info!(tiers_id = %model.id, type_tiers = %model.type_tiers, "tiers créé");
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::TiersCree(model.id)).await {
                warn!(error = %e, "failed to send event");
            }
        }

        Ok(model)
    }

    #[instrument(skip(self), fields(tiers_id = %tiers_id))]
    pub async fn get(
        &self,
        ctx: AuthContext,
        tiers_id: Uuid,
    ) -> Result<tiers::Model, ServiceError> {
        TiersEntity::find()
            .filter(tiers::Column::Id.eq(tiers_id))
            .filter(tiers::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Tiers non trouvé".to_string()))
    }

    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        ctx: AuthContext,
        filter: TiersFilter,
        page: u64,
        per_page: u64,
    ) -> Result<TiersListResponse, ServiceError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let mut query = TiersEntity::find()
            .filter(tiers::Column::EntrepriseId.eq(ctx.entreprise_id));
        if let Some(type_tiers) = &filter.type_tiers {
            query = query.filter(tiers::Column::TypeTiers.eq(type_tiers.clone()));
        }
        if let Some(q) = &filter.q {
            let pattern = format!("%{q}%");
            query = query.filter(
                Condition::any()
                    .add(tiers::Column::Nom.like(pattern.clone()))
                    .add(tiers::Column::Prenom.like(pattern.clone()))
                    .add(tiers::Column::RaisonSociale.like(pattern)),
            );
        }

        let paginator = query
            .order_by_asc(tiers::Column::Nom)
            .paginate(&*self.db, per_page);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::from_db)?;
        let tiers = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::from_db)?;

        Ok(TiersListResponse {
            tiers,
            total,
            page,
            per_page,
        })
    }
}
