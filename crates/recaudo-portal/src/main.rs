use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result as AnyResult};
use recaudo_debts::ArrearsPolicy;
use recaudo_platform::{HttpPaymentGateway, PgLedgerStore, ServiceConfig, connect_database};
use recaudo_portal::{AppState, app};
use tracing::info;

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "recaudo_portal=info,tower_http=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:4000")?;
    let pool = connect_database(&config.database_url, config.db_statement_timeout).await?;
    let gateway = HttpPaymentGateway::from_config(&config)
        .context("failed to build payment gateway client")?;

    let state = AppState::new(
        Arc::new(PgLedgerStore::new(pool)),
        ArrearsPolicy {
            annual_rate_percent: config.annual_interest_rate,
        },
        Arc::new(gateway),
        config.production,
    );
    let router = app(state);

    let addr: SocketAddr = config
        .http_addr
        .parse()
        .with_context(|| format!("HTTP_ADDR '{}' is not a socket address", config.http_addr))?;
    info!(
        "portal for {} listening on {}",
        config.municipality.display_name, addr
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
