use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthContext,
    db::DbPool,
    entities::echeance::{self, Entity as EcheanceEntity},
    entities::facture::{self, Entity as FactureEntity},
    entities::ligne_transaction::{self, Entity as LigneEntity},
    entities::remise::{self, Entity as RemiseEntity},
    entities::tiers::{self, Entity as TiersEntity},
    entities::transaction::{self, Entity as TransactionEntity},
    entities::vente::{self, Entity as VenteEntity, TypeDocument},
    errors::ServiceError,
    events::{Event, EventSender},
    services::documents::{
        ClientInfo, DocumentRenderer, EcheanceProjection, EntrepriseInfo, FactureProjection,
        LigneProjection, MailAttachment, MailMessage, MailTransport, RemiseProjection,
    },
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EnvoyerFactureRequest {
    /// Defaults to the client's email when absent.
    pub email: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EnvoiFactureResponse {
    pub facture: facture::Model,
    pub message_id: String,
    pub destinataire: String,
}

/// Rendered document bytes plus the refreshed invoice record.
pub struct FactureRendue {
    pub facture: facture::Model,
    pub contenu: Vec<u8>,
    pub nom_fichier: String,
}

/// Invoice projection, rendering and delivery. Monetary state always comes
/// from the transaction/vente aggregate; the facture row only mirrors it.
#[derive(Clone)]
pub struct FacturationService {
    db: Arc<DbPool>,
    renderer: Arc<dyn DocumentRenderer>,
    mail: Arc<dyn MailTransport>,
    entreprise: EntrepriseInfo,
    event_sender: Option<Arc<EventSender>>,
}

impl FacturationService {
    pub fn new(
        db: Arc<DbPool>,
        renderer: Arc<dyn DocumentRenderer>,
        mail: Arc<dyn MailTransport>,
        entreprise: EntrepriseInfo,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            renderer,
            mail,
            entreprise,
            event_sender,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send event");
            }
        }
    }

    /// Builds the canonical projection for a facture.
    #[instrument(skip(self), fields(facture_id = %facture_id))]
    pub async fn build_projection(
        &self,
        ctx: AuthContext,
        facture_id: Uuid,
    ) -> Result<(facture::Model, vente::Model, FactureProjection), ServiceError> {
        let db = &*self.db;

        let facture_model = self.find_facture(ctx, facture_id).await?;

        let vente_model = VenteEntity::find()
            .filter(vente::Column::Id.eq(facture_model.vente_id))
            .filter(vente::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Vente associée non trouvée".to_string()))?;

        let transaction_model = TransactionEntity::find()
            .filter(transaction::Column::Id.eq(facture_model.transaction_id))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| {
                ServiceError::NotFound("Transaction associée non trouvée".to_string())
            })?;

        let client = TiersEntity::find()
            .filter(tiers::Column::Id.eq(vente_model.client_id))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Client non trouvé".to_string()))?;

        let lignes = LigneEntity::find()
            .filter(ligne_transaction::Column::TransactionId.eq(transaction_model.id))
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;

        let remise_globale = RemiseEntity::find()
            .filter(remise::Column::TransactionId.eq(transaction_model.id))
            .filter(remise::Column::EstGlobale.eq(true))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?;

        let echeances = EcheanceEntity::find()
            .filter(echeance::Column::TransactionId.eq(transaction_model.id))
            .order_by_asc(echeance::Column::DateEcheance)
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;

        let projection = FactureProjection {
            numero_facture: facture_model.numero_facture.clone(),
            date_facture: facture_model.date_facture,
            statut: facture_model.statut.clone(),
            entreprise: self.entreprise.clone(),
            client: ClientInfo {
                nom: client.nom,
                prenom: client.prenom,
                raison_sociale: client.raison_sociale,
                adresse: client.adresse,
                telephone: client.telephone,
                email: client.email,
                matricule_fiscal: client.matricule_fiscal,
            },
            lignes: lignes
                .into_iter()
                .map(|l| LigneProjection {
                    designation: l.designation,
                    quantite: l.quantite,
                    prix_unitaire_ht: l.prix_unitaire_ht,
                    taux_tva: l.taux_tva,
                    remise: l.remise,
                    montant_ht: l.montant_ht,
                    montant_ttc: l.montant_ttc,
                })
                .collect(),
            remise_globale: remise_globale.map(|r| RemiseProjection {
                type_remise: r.type_remise,
                valeur: r.valeur,
                montant: r.montant,
            }),
            montant_total_ht: transaction_model.montant_total_ht,
            montant_taxes: transaction_model.montant_taxes,
            montant_total_ttc: transaction_model.montant_total_ttc,
            montant_paye: vente_model.montant_paye,
            reste_a_payer: vente_model.reste_a_payer,
            echeances: echeances
                .into_iter()
                .map(|e| EcheanceProjection {
                    date_echeance: e.date_echeance,
                    montant: e.montant,
                    type_paiement: e.type_paiement,
                    reference: e.reference,
                    statut: e.statut,
                })
                .collect(),
        };

        Ok((facture_model, vente_model, projection))
    }

    /// Renders the facture and records the resulting file reference.
    #[instrument(skip(self), fields(facture_id = %facture_id))]
    pub async fn render(
        &self,
        ctx: AuthContext,
        facture_id: Uuid,
    ) -> Result<FactureRendue, ServiceError> {
        let (facture_model, vente_model, projection) =
            self.build_projection(ctx, facture_id).await?;

        let type_document = TypeDocument::from_str(&vente_model.type_document)
            .unwrap_or(TypeDocument::Facture);
        let contenu = self.renderer.render(&projection, type_document).await?;

        let nom_fichier = format!(
            "facture_{}.pdf",
            facture_model.numero_facture.replace('/', "_")
        );
        let url_fichier = format!("/documents/{nom_fichier}");

        let mut facture_active: facture::ActiveModel = facture_model.into();
        facture_active.url_fichier = Set(Some(url_fichier));
        let facture_model = facture_active
            .update(&*self.db)
            .await
            .map_err(ServiceError::from_db)?;

        info!(
            facture_id = %facture_model.id,
            nom_fichier = %nom_fichier,
            octets = contenu.len(),
            "facture rendue"
        );

        Ok(FactureRendue {
            facture: facture_model,
            contenu,
            nom_fichier,
        })
    }

    /// Renders and emails the facture. Recipient falls back to the client's
    /// address; no address at all is a validation failure.
    #[instrument(skip(self, request), fields(facture_id = %facture_id))]
    pub async fn send_by_email(
        &self,
        ctx: AuthContext,
        facture_id: Uuid,
        request: EnvoyerFactureRequest,
    ) -> Result<EnvoiFactureResponse, ServiceError> {
        let (_, _, projection) = self.build_projection(ctx, facture_id).await?;

        let destinataire = request
            .email
            .clone()
            .or_else(|| projection.client.email.clone())
            .ok_or_else(|| {
                ServiceError::ValidationError(
                    "Aucune adresse email spécifiée pour l'envoi".to_string(),
                )
            })?;

        let rendu = self.render(ctx, facture_id).await?;
        let numero = rendu.facture.numero_facture.clone();

        let message_id = self
            .mail
            .send(MailMessage {
                to: destinataire.clone(),
                subject: format!("Facture {numero}"),
                body: request.message.unwrap_or_else(|| {
                    format!("Veuillez trouver ci-joint votre facture {numero}.")
                }),
                attachments: vec![MailAttachment {
                    filename: rendu.nom_fichier.clone(),
                    content: rendu.contenu,
                }],
            })
            .await?;

        let mut facture_active: facture::ActiveModel = rendu.facture.into();
        facture_active.envoye = Set(true);
        facture_active.date_envoi = Set(Some(Utc::now()));
        facture_active.destinataire_email = Set(Some(destinataire.clone()));
        let facture_model = facture_active
            .update(&*self.db)
            .await
            .map_err(ServiceError::from_db)?;

        self.emit(Event::FactureEnvoyee {
            facture_id: facture_model.id,
            destinataire: destinataire.clone(),
        })
        .await;

        Ok(EnvoiFactureResponse {
            facture: facture_model,
            message_id,
            destinataire,
        })
    }

    /// Invoice record for a sale, if one has been emitted.
    #[instrument(skip(self), fields(vente_id = %vente_id))]
    pub async fn find_by_vente(
        &self,
        ctx: AuthContext,
        vente_id: Uuid,
    ) -> Result<Option<facture::Model>, ServiceError> {
        FactureEntity::find()
            .filter(facture::Column::VenteId.eq(vente_id))
            .filter(facture::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from_db)
    }

    async fn find_facture(
        &self,
        ctx: AuthContext,
        facture_id: Uuid,
    ) -> Result<facture::Model, ServiceError> {
        FactureEntity::find()
            .filter(facture::Column::Id.eq(facture_id))
            .filter(facture::Column::EntrepriseId.eq(ctx.entreprise_id))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Facture non trouvée".to_string()))
    }
}
