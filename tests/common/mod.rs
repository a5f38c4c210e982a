use std::sync::Arc;

use axum::Router;
use tokio::sync::mpsc;
use uuid::Uuid;

use gescom_api::{
    auth::AuthContext,
    config::AppConfig,
    db,
    entities::tiers::TypeTiers,
    events::{self, EventSender},
    handlers::AppServices,
    services::tiers::CreerTiersRequest,
    AppState,
};

/// Test harness: application state backed by a throwaway SQLite database.
pub struct TestApp {
    pub state: AppState,
    pub ctx: AuthContext,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_file = std::env::temp_dir().join(format!("gescom_test_{}.db", Uuid::new_v4()));
        let database_url = format!("sqlite://{}?mode=rwc", db_file.display());

        let mut cfg = AppConfig::new(database_url, "127.0.0.1", 18_080);
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.entreprise_nom = "Société de Test".to_string();

        let db_pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("database connection");
        db::run_migrations(&db_pool).await.expect("migrations");

        let db_arc = Arc::new(db_pool);
        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            cfg.entreprise_info(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let ctx = AuthContext::new(Uuid::new_v4(), Uuid::new_v4());

        Self {
            state,
            ctx,
            _event_task: event_task,
        }
    }

    /// Identity in a different tenant, for isolation tests.
    #[allow(dead_code)]
    pub fn other_tenant(&self) -> AuthContext {
        AuthContext::new(Uuid::new_v4(), Uuid::new_v4())
    }

    /// Full HTTP router with the application state applied.
    #[allow(dead_code)]
    pub fn router(&self) -> Router {
        Router::new()
            .nest("/api/v1", gescom_api::api_v1_routes())
            .layer(axum::middleware::from_fn(
                gescom_api::request_id::request_id_middleware,
            ))
            .with_state(self.state.clone())
    }

    #[allow(dead_code)]
    pub async fn create_client(&self, nom: &str) -> gescom_api::entities::tiers::Model {
        self.state
            .services
            .tiers
            .create(
                self.ctx,
                CreerTiersRequest {
                    type_tiers: TypeTiers::Client,
                    nom: nom.to_string(),
                    prenom: None,
                    raison_sociale: None,
                    email: Some(format!(
                        "{}@example.tn",
                        nom.to_lowercase().replace(' ', ".")
                    )),
                    telephone: None,
                    adresse: Some("Tunis".to_string()),
                    matricule_fiscal: None,
                },
            )
            .await
            .expect("client created")
    }

    #[allow(dead_code)]
    pub async fn create_fournisseur(&self, nom: &str) -> gescom_api::entities::tiers::Model {
        self.state
            .services
            .tiers
            .create(
                self.ctx,
                CreerTiersRequest {
                    type_tiers: TypeTiers::Fournisseur,
                    nom: nom.to_string(),
                    prenom: None,
                    raison_sociale: Some(format!("{nom} SARL")),
                    email: None,
                    telephone: None,
                    adresse: None,
                    matricule_fiscal: None,
                },
            )
            .await
            .expect("fournisseur created")
    }
}
