use std::{process, sync::Arc, time::Duration};

use tokio::{task::JoinHandle, try_join};
use tracing::{Dispatch, Level, debug, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use vitrine::{
    application::{catalog::CatalogService, error::AppError},
    cache::{CacheConfig, ResponseCache},
    config,
    infra::{
        cms::{CmsClient, CmsClientConfig, CmsHealthMonitor, HealthCheck, LivenessProbe},
        error::InfraError,
        http::{self, AdminState, HttpState, MaintenanceGate, MaintenanceSwitch},
        telemetry,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Probe(_) => run_probe(settings).await,
    }
}

struct ApplicationContext {
    http_state: HttpState,
    admin_state: AdminState,
    gate: MaintenanceGate,
    cache: Arc<ResponseCache>,
}

fn build_application_context(settings: &config::Settings) -> Result<ApplicationContext, AppError> {
    let cache = Arc::new(ResponseCache::new(&CacheConfig::from(&settings.cache)));
    let client = Arc::new(CmsClient::new(
        CmsClientConfig::from(&settings.cms),
        Arc::clone(&cache),
    )?);

    let probe: Arc<dyn LivenessProbe> = client.clone();
    let health = Arc::new(CmsHealthMonitor::new(probe, settings.health.ttl));
    let switch = Arc::new(MaintenanceSwitch::new(settings.maintenance.enabled));

    let health_check: Arc<dyn HealthCheck> = health.clone();
    let gate = MaintenanceGate::new(
        Arc::clone(&switch),
        health_check,
        settings.maintenance.excluded_prefixes.iter().cloned(),
    );

    let http_state = HttpState {
        catalog: Arc::new(CatalogService::new(client)),
        health: Arc::clone(&health),
    };
    let admin_state = AdminState {
        switch,
        cache: Arc::clone(&cache),
        health,
    };

    Ok(ApplicationContext {
        http_state,
        admin_state,
        gate,
        cache,
    })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings)?;

    if settings.maintenance.enabled {
        info!(
            target = "vitrine::serve",
            "starting with forced maintenance enabled"
        );
    }

    let probe_handle = spawn_health_probe(
        Arc::clone(&app.admin_state.health),
        settings.health.probe_interval,
    );
    let sweep_handle = spawn_cache_sweep(Arc::clone(&app.cache));

    let result = serve_http(&settings, app.http_state, app.admin_state, app.gate).await;

    for handle in [probe_handle, sweep_handle] {
        handle.abort();
        let _ = handle.await;
    }

    result
}

async fn run_probe(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings)?;
    let state = app.admin_state.health.refresh().await;

    if state.is_available {
        info!(
            target = "vitrine::probe",
            base_url = %settings.cms.base_url,
            "CMS is reachable"
        );
        Ok(())
    } else {
        Err(AppError::unexpected(format!(
            "CMS at {} is unreachable",
            settings.cms.base_url
        )))
    }
}

fn spawn_health_probe(health: Arc<CmsHealthMonitor>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let state = health.refresh().await;
            debug!(
                target = "vitrine::serve",
                available = state.is_available,
                consecutive_failures = state.consecutive_failures,
                "background CMS probe finished"
            );
        }
    })
}

fn spawn_cache_sweep(cache: Arc<ResponseCache>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cache.config().sweep_interval);
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            let removed = cache.purge_expired();
            if removed > 0 {
                debug!(target = "vitrine::serve", removed, "swept expired cache entries");
            }
        }
    })
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
    gate: MaintenanceGate,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state, gate);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "vitrine::serve",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        cms = %settings.cms.base_url,
        "listening"
    );

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    try_join!(public_server, admin_server)
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "vitrine::serve", "shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "vitrine::serve",
            error = %err,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}
