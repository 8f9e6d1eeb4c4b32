mod auth;
mod background;
mod handlers;
mod openapi;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use clap::Parser;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use hostcheck_core::analysis::{Analyzer, DiagnosticEvaluator};
use hostcheck_core::catalog::RequirementCatalog;
use hostcheck_core::collector::{
    CachedProbe, DetachedSource, EnvironmentFacts, EnvironmentProbe, FactsProbe,
    LiveMetricsSource, PostgresCollector,
};
use hostcheck_core::live::LiveMetricsSampler;
use hostcheck_core::live::settings::{JsonFileSettingsStore, MemorySettingsStore, SettingsStore};

use auth::Credentials;
use openapi::ApiDoc;
use state::AppState;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// ============================================================
// CLI
// ============================================================

#[derive(Parser)]
#[command(name = "hostcheck-web", about = "hostcheck web API server", version = hostcheck_core::VERSION)]
struct Args {
    /// Listen address.
    #[arg(long, default_value = "0.0.0.0:8080", env = "HOSTCHECK_LISTEN")]
    listen: String,

    /// JSON document with the host's environment facts (versions, extensions, config, resources).
    /// Without it every environment value reports "Not available".
    #[arg(long, env = "HOSTCHECK_ENVIRONMENT")]
    environment: Option<PathBuf>,

    /// Directory used for the file system speed check. Defaults to the system temp dir.
    #[arg(long, env = "HOSTCHECK_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// JSON file holding the live monitor settings. Kept in memory when not set.
    #[arg(long, env = "HOSTCHECK_SETTINGS")]
    settings: Option<PathBuf>,

    /// JSON file replacing the built-in requirement baselines.
    #[arg(long, env = "HOSTCHECK_CATALOG")]
    catalog: Option<PathBuf>,

    /// Do not connect to PostgreSQL; live metrics report "Not available".
    #[arg(long, env = "HOSTCHECK_NO_DATABASE")]
    no_database: bool,

    /// Application table prefix used by the live metrics queries.
    #[arg(long, default_value = "wp_", env = "HOSTCHECK_TABLE_PREFIX")]
    table_prefix: String,

    /// Upper bound for a single request, in seconds.
    #[arg(long, default_value = "10", env = "HOSTCHECK_REQUEST_TIMEOUT")]
    request_timeout: u64,

    /// Basic Auth username. If set, --auth-password is also required.
    #[arg(long, env = "HOSTCHECK_AUTH_USER")]
    auth_user: Option<String>,

    /// Basic Auth password.
    #[arg(long, env = "HOSTCHECK_AUTH_PASSWORD")]
    auth_password: Option<String>,
}

// ============================================================
// Main
// ============================================================

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hostcheck_web=info")),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };
    if let Err(e) = runtime.block_on(async_main(args)) {
        error!(error = %e, "server stopped");
        process::exit(1);
    }
}

async fn async_main(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        version = hostcheck_core::VERSION,
        git_sha = hostcheck_core::GIT_SHA,
        "starting"
    );

    let creds = match (&args.auth_user, &args.auth_password) {
        (Some(user), Some(password)) => {
            info!("basic auth enabled");
            Some(Arc::new(Credentials {
                user: user.clone(),
                password: password.clone(),
            }))
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err("--auth-user and --auth-password must both be set".into());
        }
        _ => None,
    };

    let catalog = match &args.catalog {
        Some(path) => {
            info!(path = %path.display(), "loading requirement catalog");
            RequirementCatalog::from_json_file(path)?
        }
        None => RequirementCatalog::default(),
    };

    let analyzer = Analyzer::new(DiagnosticEvaluator::new(
        Arc::new(catalog),
        create_probe(&args)?,
    ));
    let sampler = create_sampler(&args);
    let state = AppState::new(analyzer, sampler)
        .with_request_timeout(Duration::from_secs(args.request_timeout));

    let warm_sampler = state.sampler.clone();
    tokio::spawn(async move {
        background::warm_loop(warm_sampler).await;
    });

    let app = build_router(state, creds).into_make_service_with_connect_info::<SocketAddr>();

    let addr: SocketAddr = args.listen.parse()?;
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState, creds: Option<Arc<Credentials>>) -> Router {
    let mut app = Router::new()
        .route("/api/v1/health", get(handlers::handle_health))
        .route("/api/v1/report", get(handlers::handle_report))
        .route("/api/v1/live", get(handlers::handle_live))
        .route("/api/v1/live/refresh", post(handlers::handle_refresh))
        .route(
            "/api/v1/live/settings",
            get(handlers::handle_get_settings).post(handlers::handle_save_settings),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state);

    if let Some(creds) = creds {
        app = app.layer(axum::middleware::from_fn_with_state(
            creds,
            auth::basic_auth_middleware,
        ));
    }

    // outermost, so it sees responses produced by the auth layer
    app.layer(axum::middleware::from_fn(auth::access_log))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
}

fn create_probe(args: &Args) -> Result<Arc<dyn EnvironmentProbe>, Box<dyn std::error::Error>> {
    let facts = match &args.environment {
        Some(path) => {
            info!(path = %path.display(), "loading environment facts");
            FactsProbe::from_json_file(path)?
        }
        None => {
            warn!("no environment facts file, environment values will be unavailable");
            FactsProbe::new(EnvironmentFacts::default())
        }
    };
    let scratch = args.scratch_dir.clone().unwrap_or_else(std::env::temp_dir);
    Ok(Arc::new(CachedProbe::new(facts.with_scratch_dir(scratch))))
}

fn create_sampler(args: &Args) -> LiveMetricsSampler {
    let store: Arc<dyn SettingsStore> = match &args.settings {
        Some(path) => Arc::new(JsonFileSettingsStore::new(path.clone())),
        None => Arc::new(MemorySettingsStore::new()),
    };

    if args.no_database {
        info!("data store probes disabled");
        return LiveMetricsSampler::new(Box::new(DetachedSource), store);
    }

    let collectors = PostgresCollector::from_env().map(|pg| {
        let live = pg.with_table_prefix(&args.table_prefix);
        let slow = PostgresCollector::from_env().map(|s| s.with_table_prefix(&args.table_prefix));
        (live, slow)
    });
    match collectors {
        Ok((live, slow)) => {
            let live: Box<dyn LiveMetricsSource> = Box::new(live);
            let sampler = LiveMetricsSampler::new(live, store);
            match slow {
                Ok(slow) => sampler.with_slow_query_source(Box::new(slow)),
                Err(_) => sampler,
            }
        }
        Err(e) => {
            warn!(error = %e, "PostgreSQL not configured, live metrics will be unavailable");
            LiveMetricsSampler::new(Box::new(DetachedSource), store)
        }
    }
}
