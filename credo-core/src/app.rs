use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::get;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::config::{Config, ConfigError, MailTransport};
use crate::controllers::{self, AppState};
use crate::mail::{HttpMailer, LogMailer, Mailer};
use crate::migrations::Migrator;
use crate::openapi::ApiDoc;
use crate::services::{LifecycleService, SessionService};
use crate::store::{AccountStore, SeaOrmAccountStore};

const API_DOCS_PATH: &str = "/api-docs";
const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// The Credo application: configuration, database, and the two services.
pub struct App {
    pub config: Arc<Config>,
    pub db: DatabaseConnection,
    store: Arc<dyn AccountStore>,
    session: Arc<SessionService>,
    lifecycle: Arc<LifecycleService>,
}

impl App {
    /// Create the application from environment configuration.
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::from_env()?;
        Self::with_config(config).await
    }

    /// Create the application with a given config.
    pub async fn with_config(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let db = crate::db::connect(&config).await?;

        // Check for CLI database operations (--migrate, --rollback) and exit if present
        Self::handle_db_cli_args(&db).await?;

        tracing::info!("Running pending database migrations...");
        Migrator::up(&db, None).await?;
        tracing::info!("Migrations complete.");

        let config = Arc::new(config);
        let mailer = mailer_from_config(&config)?;
        let store: Arc<dyn AccountStore> = Arc::new(SeaOrmAccountStore::new(db.clone()));
        let session = Arc::new(SessionService::new(store.clone(), config.clone())?);
        let lifecycle = Arc::new(LifecycleService::new(store.clone(), mailer, config.clone()));

        Ok(App {
            config,
            db,
            store,
            session,
            lifecycle,
        })
    }

    /// Replace the mail transport.
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.lifecycle = Arc::new(LifecycleService::new(
            self.store.clone(),
            mailer,
            self.config.clone(),
        ));
        self
    }

    /// Handle CLI database operations passed as command-line arguments.
    /// If --migrate or --rollback is detected, perform the operation and exit the process.
    async fn handle_db_cli_args(db: &DatabaseConnection) -> Result<(), Box<dyn std::error::Error>> {
        let args: Vec<String> = std::env::args().collect();

        if args.iter().any(|arg| arg == "--migrate") {
            tracing::info!("Running pending database migrations...");
            Migrator::up(db, None).await?;
            tracing::info!("Migrations complete.");
            std::process::exit(0);
        }

        if let Some(pos) = args.iter().position(|arg| arg == "--rollback") {
            let steps = args
                .get(pos + 1)
                .and_then(|n| n.parse::<u32>().ok())
                .unwrap_or(1);
            tracing::info!("Rolling back {} migration(s)...", steps);
            Migrator::down(db, Some(steps)).await?;
            tracing::info!("Rollback complete.");
            std::process::exit(0);
        }

        Ok(())
    }

    pub fn state(&self) -> AppState {
        AppState {
            config: self.config.clone(),
            session: self.session.clone(),
            lifecycle: self.lifecycle.clone(),
        }
    }

    /// Build the axum router: API routes, docs, CORS and (in development) tracing.
    pub fn router(&self) -> Router {
        let openapi_spec = ApiDoc::openapi();
        let openapi_json = openapi_spec.clone();

        let mut router = controllers::routes()
            .with_state(self.state())
            .merge(Scalar::with_url(API_DOCS_PATH, openapi_spec))
            .route(
                OPENAPI_JSON_PATH,
                get(move || {
                    let spec = openapi_json.clone();
                    async move { axum::Json(spec) }
                }),
            );

        match HeaderValue::from_str(&self.config.cors_origin) {
            Ok(origin) => {
                router = router.layer(
                    CorsLayer::new()
                        .allow_origin(origin)
                        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
                        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                        .allow_credentials(true),
                );
            }
            Err(e) => {
                tracing::warn!(
                    origin = %self.config.cors_origin,
                    error = %e,
                    "invalid CORS origin, CORS disabled"
                );
            }
        }

        // Only add tracing/request-id middleware in development mode.
        if self.config.is_dev() {
            use tower_http::LatencyUnit;
            use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse};

            let x_request_id = axum::http::HeaderName::from_static("x-request-id");
            router = router
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                        .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                        .on_response(
                            DefaultOnResponse::new()
                                .level(tracing::Level::INFO)
                                .latency_unit(LatencyUnit::Millis),
                        ),
                );
        }

        router
    }

    /// Bind, serve, and shut down gracefully on Ctrl-C.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.config.server_addr();
        let router = self.router();

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!(
            "Credo server running on http://{} (docs at {})",
            addr,
            API_DOCS_PATH
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

fn mailer_from_config(config: &Config) -> Result<Arc<dyn Mailer>, ConfigError> {
    match config.mail.transport {
        MailTransport::Log => {
            tracing::info!("Using log mail transport");
            Ok(Arc::new(LogMailer))
        }
        MailTransport::Http => {
            let mailer = HttpMailer::from_config(&config.mail)
                .ok_or(ConfigError::Missing("MAIL_API_URL"))?;
            tracing::info!("Using HTTP mail transport");
            Ok(Arc::new(mailer))
        }
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    tracing::info!("Shutting down Credo server...");
}
