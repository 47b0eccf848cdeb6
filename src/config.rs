use std::path::PathBuf;

use anyhow::{bail, Context};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::auth::repo_types::Role;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// One entry of the default account list created at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAccount {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub mobile_number: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub seed_accounts: Vec<SeedAccount>,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

const MAX_TTL_MINUTES: i64 = 24 * 60;

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source. Missing `DATABASE_URL` or
    /// `JWT_SECRET` is an error.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = var("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .context("DATABASE_URL is not set")?;

        let secret = var("JWT_SECRET").context("JWT_SECRET is not set")?;
        if secret.trim().is_empty() {
            bail!("JWT_SECRET is empty");
        }

        let ttl_minutes = match var("JWT_TTL_MINUTES") {
            Some(v) => {
                let ttl = v
                    .parse::<i64>()
                    .with_context(|| format!("invalid JWT_TTL_MINUTES {v:?}"))?;
                if !(1..=MAX_TTL_MINUTES).contains(&ttl) {
                    bail!("JWT_TTL_MINUTES must be between 1 and {MAX_TTL_MINUTES}, got {ttl}");
                }
                ttl
            }
            None => 60,
        };

        let jwt = JwtConfig {
            secret,
            issuer: var("JWT_ISSUER").unwrap_or_else(|| "accounts-backend".into()),
            audience: var("JWT_AUDIENCE").unwrap_or_else(|| "accounts-users".into()),
            ttl_minutes,
        };

        let port = match var("APP_PORT") {
            Some(v) => v.parse::<u16>().with_context(|| format!("invalid APP_PORT {v:?}"))?,
            None => 5001,
        };

        let seed_accounts = match var("SEED_ACCOUNTS_FILE") {
            Some(path) => load_seed_accounts(PathBuf::from(path))?,
            None => Vec::new(),
        };

        Ok(Self {
            database_url,
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            jwt,
            seed_accounts,
        })
    }
}

fn load_seed_accounts(path: PathBuf) -> anyhow::Result<Vec<SeedAccount>> {
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("read seed accounts file {}", path.display()))?;
    parse_seed_accounts(&raw).with_context(|| format!("parse seed accounts file {}", path.display()))
}

pub(crate) fn parse_seed_accounts(raw: &str) -> anyhow::Result<Vec<SeedAccount>> {
    let mut accounts: Vec<SeedAccount> = serde_json::from_str(raw)?;
    for account in &mut accounts {
        account.email = normalize_email(&account.email);
        if !is_valid_email(&account.email) {
            bail!("seed account has an invalid email: {:?}", account.email);
        }
        if account.password.is_empty() {
            bail!("seed account {} has an empty password", account.email);
        }
    }
    Ok(accounts)
}
