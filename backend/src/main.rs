//! Backend entry-point: loads settings, wires adapters and background workers,
//! and serves the REST API.

mod server;

use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr};
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use fluxcart::domain::ports::{
    DisabledReceiptMailer, IdempotencyRepository, PaymentGateway, ProductSearch, ReceiptMailer,
};
use fluxcart::domain::{GroupBuySettlementWorker, IdempotencyConfig};
use fluxcart::inbound::http::health::HealthState;
use fluxcart::inbound::http::session_config::{BuildMode, session_settings};
use fluxcart::outbound::mail::RelayReceiptMailer;
use fluxcart::outbound::notifications::{ReceiptDelivery, receipt_channel};
use fluxcart::outbound::payment::StripeGateway;
use fluxcart::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use fluxcart::outbound::search::MeilisearchSearch;
use fluxcart::settings::AppSettings;

use server::{Collaborators, Repositories, ServerConfig, build_http_state, create_server};

/// Interval between purges of expired idempotency records.
const IDEMPOTENCY_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load().wrap_err("failed to load settings")?;
    let session = session_settings(
        &settings.session_toggles(),
        BuildMode::from_debug_assertions(),
    )
    .wrap_err("invalid session configuration")?;
    info!(fingerprint = %session.key_fingerprint(), "session key loaded");
    let bind_addr = settings.bind_addr()?;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let pool = connect_database(&settings).await?;
    let repositories = Repositories::select(pool.as_ref(), clock.clone());
    if pool.is_none() {
        warn!("no database configured; using the in-memory store");
    }

    let gateway = build_gateway(&settings, clock.clone())?;
    let search = build_search(&settings)?;
    let mailer = build_mailer(&settings)?;

    let (dispatcher, receipt_worker) = receipt_channel(
        settings.receipt_queue_capacity(),
        ReceiptDelivery::new(
            repositories.orders.clone(),
            repositories.users.clone(),
            mailer,
            settings.web_url(),
        ),
    );
    let http_state = build_http_state(
        &repositories,
        Collaborators {
            gateway,
            search,
            notifier: Arc::new(dispatcher),
        },
        clock.clone(),
        settings.web_url(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut workers = vec![tokio::spawn(receipt_worker.run(shutdown_rx.clone()))];
    if settings.settlement_enabled() {
        let settlement = GroupBuySettlementWorker::new(
            repositories.settlement_ports(),
            clock,
            settings.settlement_config(),
        );
        let shutdown = shutdown_rx.clone();
        workers.push(tokio::spawn(async move { settlement.run(shutdown).await }));
    } else {
        info!("group-buy settlement worker disabled");
    }
    workers.push(tokio::spawn(purge_idempotency_records(
        repositories.idempotency.clone(),
        settings.idempotency_config(),
        shutdown_rx,
    )));

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(
        health_state,
        ServerConfig::new(session, bind_addr, http_state),
    )?;
    info!(%bind_addr, "listening");
    let served = server.await;

    if shutdown_tx.send(true).is_err() {
        warn!("background workers already stopped");
    }
    for worker in workers {
        if let Err(error) = worker.await {
            warn!(%error, "background worker panicked");
        }
    }
    served.wrap_err("server terminated with an error")
}

async fn connect_database(settings: &AppSettings) -> Result<Option<DbPool>> {
    let Some(url) = settings.database_url.as_deref() else {
        return Ok(None);
    };
    let applied = run_migrations(url)
        .await
        .wrap_err("failed to run database migrations")?;
    if !applied.is_empty() {
        info!(migrations = ?applied, "applied database migrations");
    }
    let pool = DbPool::new(PoolConfig::new(url))
        .await
        .wrap_err("failed to create database pool")?;
    Ok(Some(pool))
}

fn build_gateway(
    settings: &AppSettings,
    clock: Arc<dyn Clock>,
) -> Result<Option<Arc<dyn PaymentGateway>>> {
    let Some(config) = settings.stripe_config()? else {
        info!("payment provider not configured; checkout is simulated");
        return Ok(None);
    };
    if config.webhook_secret.is_none() {
        warn!("payment webhook secret not configured; webhooks will be rejected");
    }
    let gateway =
        StripeGateway::new(config, clock).wrap_err("failed to build payment provider client")?;
    Ok(Some(Arc::new(gateway)))
}

fn build_search(settings: &AppSettings) -> Result<Option<Arc<dyn ProductSearch>>> {
    let Some(config) = settings.search_config()? else {
        return Ok(None);
    };
    let search = MeilisearchSearch::new(config).wrap_err("failed to build search client")?;
    Ok(Some(Arc::new(search)))
}

fn build_mailer(settings: &AppSettings) -> Result<Arc<dyn ReceiptMailer>> {
    let Some(config) = settings.mail_relay_config()? else {
        info!("mail relay not configured; receipts are skipped");
        return Ok(Arc::new(DisabledReceiptMailer));
    };
    let mailer = RelayReceiptMailer::new(config).wrap_err("failed to build mail relay client")?;
    Ok(Arc::new(mailer))
}

/// Delete expired idempotency records every hour until shutdown.
async fn purge_idempotency_records(
    repository: Arc<dyn IdempotencyRepository>,
    config: IdempotencyConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    while !*shutdown.borrow() {
        match repository.cleanup_expired(config.ttl()).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "purged expired idempotency records"),
            Err(error) => warn!(%error, "idempotency purge failed"),
        }
        tokio::select! {
            () = tokio::time::sleep(IDEMPOTENCY_PURGE_INTERVAL) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}
