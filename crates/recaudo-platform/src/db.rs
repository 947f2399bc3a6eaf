use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions},
};

pub async fn connect_database(database_url: &str, statement_timeout: Duration) -> Result<PgPool> {
    let options = PgConnectOptions::from_str(database_url)
        .context("DATABASE_URL is not a valid postgres url")?
        .options([(
            "statement_timeout",
            format!("{}", statement_timeout.as_millis()),
        )]);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(statement_timeout)
        .connect_with(options)
        .await
        .context("failed to connect to postgres")?;

    Ok(pool)
}
