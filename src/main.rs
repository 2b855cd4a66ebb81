//! Testlab add-on server - Main entry point.
//!
//! Builds the pipeline collaborators once and starts the Actix-web server.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use testlab_addon_lib::api::{self, ApiDoc};
use testlab_addon_lib::config::Config;
use testlab_addon_lib::db::{AppRegistry, BuildRegistry, DbPool, ReportRegistry};
use testlab_addon_lib::middleware::RequestLogger;
use testlab_addon_lib::services::{
    Aggregator, ArtifactFetcher, ArtifactStore, CiSystem, DeviceOutcomeMerger,
    DeviceTestingService, HttpArtifactFetcher, HttpCiClient, JunitParser, Storage,
    StepVerdictReporter, TestSummaryService, ToolResultsClient,
};

/// Perform health check (for Docker healthcheck).
fn health_check() -> bool {
    // Simple check - just verify we can load config
    Config::from_env().is_ok()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Check for --health-check flag (used by Docker HEALTHCHECK)
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if health_check() { 0 } else { 1 });
    }

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL and S3 credentials must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Testlab Add-on Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let pool = match DbPool::new(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };
    info!("Database connection established");

    if let Err(e) = pool.run_migrations().await {
        error!("{}", e);
        std::process::exit(1);
    }

    let storage = match Storage::new(&config.storage).await {
        Ok(storage) => storage,
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            std::process::exit(1);
        }
    };

    // One HTTP client shared by every outbound collaborator; timeouts are per request
    let http = reqwest::Client::new();

    let store: Arc<dyn ArtifactStore> = Arc::new(storage);
    let fetcher: Arc<dyn ArtifactFetcher> = Arc::new(HttpArtifactFetcher::new(
        store.clone(),
        http.clone(),
        config.pipeline.fetch_timeout,
    ));
    let aggregator = Aggregator::new(
        fetcher,
        Arc::new(JunitParser),
        config.pipeline.max_concurrent_fetches,
    );
    let device_testing: Arc<dyn DeviceTestingService> =
        Arc::new(ToolResultsClient::new(http.clone(), &config.device_testing));
    let merger = DeviceOutcomeMerger::new(device_testing, config.pipeline.reconciliation);
    let ci: Arc<dyn CiSystem> = Arc::new(HttpCiClient::new(http, &config.ci));

    let shared = Arc::new(pool.clone());
    let reports: Arc<dyn ReportRegistry> = shared.clone();
    let builds: Arc<dyn BuildRegistry> = shared.clone();
    let apps: Arc<dyn AppRegistry> = shared;

    let summary = TestSummaryService::new(
        reports.clone(),
        builds.clone(),
        aggregator.clone(),
        merger,
        config.pipeline.batch_policy,
    );
    let reporter = StepVerdictReporter::new(reports.clone(), apps, aggregator, ci);

    info!(
        "Pipeline: {} concurrent fetches, {:?} batches, {:?} reconciliation",
        config.pipeline.max_concurrent_fetches,
        config.pipeline.batch_policy,
        config.pipeline.reconciliation
    );

    let bind_address = config.bind_address();
    let worker_count = if config.is_development() {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!("Starting server at http://{} ({} workers)", bind_address, cpus);
        cpus
    };

    let pool_data = web::Data::new(pool);
    let reports_data = web::Data::from(reports);
    let builds_data = web::Data::from(builds);
    let store_data = web::Data::from(store);
    let summary_data = web::Data::new(summary);
    let reporter_data = web::Data::new(reporter);

    HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(pool_data.clone())
            .app_data(reports_data.clone())
            .app_data(builds_data.clone())
            .app_data(store_data.clone())
            .app_data(summary_data.clone())
            .app_data(reporter_data.clone())
            .service(
                web::scope("/api/v1")
                    .configure(api::configure_health_routes)
                    .configure(api::configure_report_routes)
                    .configure(api::configure_summary_routes)
                    .configure(api::configure_build_routes),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run()
    .await
}
