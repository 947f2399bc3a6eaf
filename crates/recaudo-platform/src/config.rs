use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};
use rust_decimal::Decimal;

pub const DEFAULT_API_GATEWAY_URL: &str = "http://localhost:3000";
pub const DEFAULT_FRONTEND_PUBLIC_URL: &str = "http://localhost:4000";
pub const DEFAULT_MUNICIPIO_ID: &str = "manzano";
pub const DEFAULT_MUNICIPIO_NOMBRE: &str = "Municipalidad de Manzano";

/// The municipality this deployment collects for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MunicipalityConfig {
    pub id: String,
    pub display_name: String,
}

impl Default for MunicipalityConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_MUNICIPIO_ID.to_string(),
            display_name: DEFAULT_MUNICIPIO_NOMBRE.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub http_addr: String,
    pub api_gateway_url: String,
    pub frontend_public_url: String,
    pub gateway_timeout: Duration,
    pub db_statement_timeout: Duration,
    pub annual_interest_rate: Decimal,
    pub production: bool,
    pub municipality: MunicipalityConfig,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        Self::from_lookup(default_http_addr, |key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(default_http_addr: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = var("DATABASE_URL").context("DATABASE_URL is required")?;
        let http_addr = var("HTTP_ADDR").unwrap_or_else(|| default_http_addr.to_string());
        let api_gateway_url = var("API_GATEWAY_URL")
            .unwrap_or_else(|| DEFAULT_API_GATEWAY_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let frontend_public_url = var("FRONTEND_PUBLIC_URL")
            .unwrap_or_else(|| DEFAULT_FRONTEND_PUBLIC_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let gateway_timeout = Duration::from_secs(parse_or(
            "GATEWAY_TIMEOUT_SECS",
            var("GATEWAY_TIMEOUT_SECS"),
            30u64,
        )?);
        let db_statement_timeout = Duration::from_secs(parse_or(
            "DB_STATEMENT_TIMEOUT_SECS",
            var("DB_STATEMENT_TIMEOUT_SECS"),
            15u64,
        )?);
        let annual_interest_rate = parse_or(
            "ANNUAL_INTEREST_RATE",
            var("ANNUAL_INTEREST_RATE"),
            Decimal::new(40, 0),
        )?;
        if annual_interest_rate.is_sign_negative() {
            anyhow::bail!("ANNUAL_INTEREST_RATE must not be negative");
        }

        let production = var("APP_ENV")
            .map(|env| env.trim().eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let defaults = MunicipalityConfig::default();
        let municipality = MunicipalityConfig {
            id: var("MUNICIPIO_ID").unwrap_or(defaults.id),
            display_name: var("MUNICIPIO_NOMBRE").unwrap_or(defaults.display_name),
        };

        Ok(Self {
            database_url,
            http_addr,
            api_gateway_url,
            frontend_public_url,
            gateway_timeout,
            db_statement_timeout,
            annual_interest_rate,
            production,
            municipality,
        })
    }

    /// Where the payment gateway posts its confirmations back to us.
    pub fn callback_url(&self) -> String {
        format!("{}/api/pagos/confirmacion", self.frontend_public_url)
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
