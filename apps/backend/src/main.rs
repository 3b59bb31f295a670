use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use backend::config::AppConfig;
use backend::draft::ticker::run_ticker;
use backend::error::AppError;
use backend::idempotency::reaper::run_reaper;
use backend::infra::state::build_state;
use backend::middleware::cors::cors_middleware;
use backend::middleware::request_trace::RequestTrace;
use backend::middleware::structured_logger::StructuredLogger;
use backend::middleware::trace_span::TraceSpan;
use backend::realtime::{DraftEventSink, NullEventSink, RedisEventSink};
use backend::routes;
use backend::state::security_config::SecurityConfig;
use backend::telemetry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = telemetry::init_tracing() {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }

    // Environment variables must be set by the runtime environment
    // (docker-compose env_file, or sourced .env for local dev).
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let app_state = match build_app_state(&config).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to build application state");
            std::process::exit(1);
        }
    };
    info!(db_kind = ?config.db.kind, "Database connected");

    let shutdown = CancellationToken::new();
    let ticker = tokio::spawn(run_ticker(
        app_state.engine.clone(),
        config.tick_interval,
        config.tick_concurrency,
        shutdown.clone(),
    ));
    let reaper = tokio::spawn(run_reaper(
        app_state.runner.clone(),
        config.reap_interval,
        shutdown.clone(),
    ));

    let data = web::Data::new(app_state);
    let origins = config.cors_allowed_origins.clone();

    info!(host = %config.host, port = config.port, "Starting league backend");
    let served = HttpServer::new(move || {
        App::new()
            .wrap(cors_middleware(&origins))
            .wrap(StructuredLogger)
            .wrap(TraceSpan)
            .wrap(RequestTrace)
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await;

    shutdown.cancel();
    for (name, handle) in [("ticker", ticker), ("reaper", reaper)] {
        if let Err(e) = handle.await {
            warn!(job = name, error = %e, "Background job ended abnormally");
        }
    }
    info!("Shutdown complete");
    served
}

async fn build_app_state(config: &AppConfig) -> Result<backend::AppState, AppError> {
    let events: Arc<dyn DraftEventSink> = match &config.redis_url {
        Some(url) => Arc::new(RedisEventSink::connect(url).await?),
        None => {
            info!("REDIS_URL not set; draft events are discarded");
            Arc::new(NullEventSink)
        }
    };
    let ttl = time::Duration::try_from(config.idempotency_ttl)
        .map_err(|e| AppError::config(format!("IDEMPOTENCY_TTL_SECS out of range: {e}")))?;

    build_state()
        .with_db(config.db.clone())
        .with_security(SecurityConfig::new(config.jwt_secret.as_bytes()))
        .with_idempotency_ttl(ttl)
        .with_events(events)
        .build()
        .await
}
