//! ColdStore Billing Server
//!
//! HTTP API for cold-storage warehousing: intake and release tracking,
//! tariff management, period billing runs and the scheduled contract sweep.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use coldstore_api::{
    configure_billing, configure_contracts, configure_gate_entries, configure_health,
    configure_intakes, configure_releases, configure_tariffs,
};
use coldstore_core::traits::SystemClock;
use coldstore_core::AppConfig;
use coldstore_db::{
    create_pool, PgAccountResolver, PgContractRepository, PgGateEntryRepository,
    PgIntakeRepository, PgInvoiceIssuer, PgReleaseRepository, PgSequencer, PgStockMover,
    PgTariffRepository, PgTemperatureLogRepository,
};
use coldstore_services::{
    BillingRunService, ContractBillingSweep, ContractService, GateEntryService, IntakeService,
    ReleaseService,
};
use std::env;
use std::io;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_actix_web::TracingLogger;

/// Configure API routes
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(configure_tariffs)
            .configure(configure_intakes)
            .configure(configure_releases)
            .configure(configure_billing)
            .configure(configure_contracts)
            .configure(configure_gate_entries),
    );
}

/// Initialize tracing/logging
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "coldstore={},coldstore_api={},coldstore_services={},coldstore_db={},actix_web=info,sqlx=warn",
            log_level, log_level, log_level, log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    if env::var("LOG_FORMAT").as_deref() == Ok("json") {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting ColdStore Billing v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    info!("Connecting to database...");
    let pool = create_pool(&config.database.url, Some(config.database.max_connections))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e.to_string()))?;

    sqlx::migrate!("crates/coldstore-db/migrations")
        .run(&pool)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    info!("Database migrations applied");

    // Repositories and warehouse collaborators
    let intake_repo = Arc::new(PgIntakeRepository::new(pool.clone()));
    let tariff_repo = Arc::new(PgTariffRepository::new(pool.clone()));
    let release_repo = Arc::new(PgReleaseRepository::new(pool.clone()));
    let contract_repo = Arc::new(PgContractRepository::new(pool.clone()));
    let gate_repo = Arc::new(PgGateEntryRepository::new(pool.clone()));
    let temperature_repo = Arc::new(PgTemperatureLogRepository::new(pool.clone()));
    let sequencer = Arc::new(PgSequencer::new(pool.clone()));
    let stock_mover = Arc::new(PgStockMover::new(pool.clone()));
    let invoice_issuer = Arc::new(PgInvoiceIssuer::new(pool.clone()));
    let account_resolver = Arc::new(PgAccountResolver::new(pool.clone()));
    let clock = Arc::new(SystemClock);

    // Services
    let intake_service = web::Data::new(IntakeService::new(
        intake_repo.clone(),
        tariff_repo.clone(),
        temperature_repo,
        sequencer.clone(),
        stock_mover.clone(),
        clock.clone(),
    ));
    let release_service = web::Data::new(ReleaseService::new(
        release_repo,
        intake_repo.clone(),
        tariff_repo.clone(),
        sequencer.clone(),
        stock_mover,
        invoice_issuer.clone(),
        account_resolver.clone(),
        clock.clone(),
    ));
    let billing_service = Arc::new(BillingRunService::new(
        intake_repo,
        tariff_repo,
        invoice_issuer,
        account_resolver,
        clock.clone(),
    ));
    let contract_service = web::Data::new(ContractService::new(
        contract_repo.clone(),
        sequencer.clone(),
        clock.clone(),
    ));
    let gate_service = web::Data::new(GateEntryService::new(gate_repo, sequencer, clock.clone()));

    let sweep = Arc::new(ContractBillingSweep::new(
        contract_repo,
        billing_service.clone(),
        clock,
        config.billing.sweep_interval_secs,
    ));
    if config.billing.sweep_enabled {
        sweep.clone().spawn();
    } else {
        info!("Contract billing sweep disabled by configuration");
    }

    let billing_data = web::Data::from(billing_service);
    let sweep_data = web::Data::from(sweep);

    let bind_addr = config.server_addr();
    let workers = config.server.workers;
    info!("Starting HTTP server on {} with {} workers", bind_addr, workers);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(intake_service.clone())
            .app_data(release_service.clone())
            .app_data(contract_service.clone())
            .app_data(gate_service.clone())
            .app_data(web::Data::clone(&billing_data))
            .app_data(web::Data::clone(&sweep_data))
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_routes)
            .configure(configure_health)
            .route(
                "/",
                web::get().to(|| async {
                    HttpResponse::Found()
                        .append_header(("Location", "/health"))
                        .finish()
                }),
            )
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await
}
