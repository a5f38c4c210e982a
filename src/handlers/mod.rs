pub mod achats;
pub mod factures;
pub mod paiements;
pub mod tiers;
pub mod ventes;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::documents::{
    DocumentRenderer, EntrepriseInfo, LoggingMailTransport, MailTransport, TextDocumentRenderer,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub ventes: Arc<crate::services::ventes::VenteService>,
    pub achats: Arc<crate::services::achats::AchatService>,
    pub tiers: Arc<crate::services::tiers::TiersService>,
    pub paiements: Arc<crate::services::paiements::PaiementService>,
    pub facturation: Arc<crate::services::facturation::FacturationService>,
}

impl AppServices {
    /// Builds the service container with the default renderer and mail
    /// transport.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        entreprise: EntrepriseInfo,
    ) -> Self {
        Self::with_collaborators(
            db_pool,
            event_sender,
            entreprise,
            Arc::new(TextDocumentRenderer),
            Arc::new(LoggingMailTransport),
        )
    }

    /// Builds the service container with explicit external collaborators
    /// (document renderer, mail transport).
    pub fn with_collaborators(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        entreprise: EntrepriseInfo,
        renderer: Arc<dyn DocumentRenderer>,
        mail: Arc<dyn MailTransport>,
    ) -> Self {
        let ventes = Arc::new(crate::services::ventes::VenteService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let achats = Arc::new(crate::services::achats::AchatService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let tiers = Arc::new(crate::services::tiers::TiersService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let paiements = Arc::new(crate::services::paiements::PaiementService::new(
            db_pool.clone(),
        ));
        let facturation = Arc::new(crate::services::facturation::FacturationService::new(
            db_pool,
            renderer,
            mail,
            entreprise,
            Some(event_sender),
        ));

        Self {
            ventes,
            achats,
            tiers,
            paiements,
            facturation,
        }
    }
}
