//! API server entry point.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use api::{AppState, Config, HttpSettings};
use domain::{Authenticator, BoxError, Catalog, Shop};
use integrations::{
    BcryptHashHandler, JwtTokenHandler, RandomPasswordGenerator, S3StorageClient, SesEmailClient,
    StripePaymentClient, UuidGenerator,
};
use persistence::{
    PostgresBookRepository, PostgresOrderRepository, PostgresUserRepository, RedisCartRepository,
};
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn run(config: Config) -> Result<(), BoxError> {
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    let pool = persistence::connect(&config.database_uri).await?;
    persistence::run_migrations(&pool, Path::new(&config.migration_source)).await?;
    let redis = persistence::connect_redis(
        &config.redis.addr,
        config.redis.password.as_deref(),
        config.redis.db,
    )
    .await?;

    let storage = S3StorageClient::from_env(
        &config.aws.region,
        config.aws.s3_bucket.clone(),
        config.aws.s3_endpoint.as_deref(),
    )
    .await;
    let email = SesEmailClient::from_env(
        &config.aws.region,
        config.aws.ses_source_email.clone(),
        config.aws.ses_endpoint.as_deref(),
    )
    .await;
    let payments = StripePaymentClient::new(config.stripe.api_key.clone())?;
    let ids = Arc::new(UuidGenerator);

    let authenticator = Arc::new(Authenticator::new(
        Arc::new(PostgresUserRepository::new(pool.clone())),
        Arc::new(JwtTokenHandler::new(&config.jwt_secret)),
        Arc::new(BcryptHashHandler::default()),
        Arc::new(email),
        ids.clone(),
        Arc::new(RandomPasswordGenerator::default()),
    ));
    let catalog = Arc::new(Catalog::new(
        Arc::new(PostgresBookRepository::new(pool.clone())),
        Arc::new(storage),
        ids.clone(),
    ));
    let shop = Arc::new(Shop::new(
        catalog.clone(),
        Arc::new(RedisCartRepository::new(redis, config.redis.cart_ttl)),
        Arc::new(PostgresOrderRepository::new(pool.clone())),
        Arc::new(payments),
        ids,
    ));

    let state = Arc::new(AppState {
        authenticator,
        catalog,
        shop,
        webhook_secret: config.stripe.webhook_secret.clone(),
    });
    let settings = HttpSettings {
        request_timeout: config.server_timeout,
        rate_limit_per_hour: config.rate_limit_per_hour,
        ..HttpSettings::default()
    };
    let app = api::create_app(state, metrics_handle, settings);

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    tracing::info!(addr = %config.server_addr, env = ?config.env, "starting API server");

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    })
    .into_future();

    let grace = config.server_timeout;
    let drained = async move {
        // Only starts counting once shutdown has been requested.
        let _ = stop_rx.wait_for(|stopping| *stopping).await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => result?,
        () = drained => {
            tracing::warn!(?grace, "in-flight requests did not finish in time");
        }
    }

    pool.close().await;
    tracing::info!("server shut down gracefully");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("configuration error: {error}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "server failed");
            ExitCode::FAILURE
        }
    }
}
