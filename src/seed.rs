//! Startup creation of the configured default accounts.

use tracing::{error, info, instrument};

use crate::{
    auth::{
        password::hash_password_blocking,
        repo::{StoreError, UserStore},
        repo_types::NewUser,
    },
    config::SeedAccount,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Creates every account whose email is not taken yet. Safe to run any number
/// of times; a failing entry is logged and the rest still run.
#[instrument(skip_all, fields(accounts = accounts.len()))]
pub async fn seed_default_accounts(store: &dyn UserStore, accounts: &[SeedAccount]) -> SeedReport {
    let mut report = SeedReport::default();

    for account in accounts {
        match seed_one(store, account).await {
            Ok(true) => {
                info!(role = %account.role, email = %account.email, "default user created");
                report.created += 1;
            }
            Ok(false) => {
                info!(role = %account.role, email = %account.email, "default user already exists");
                report.skipped += 1;
            }
            Err(e) => {
                error!(email = %account.email, error = %e, "default user creation failed");
                report.failed += 1;
            }
        }
    }

    info!(
        created = report.created,
        skipped = report.skipped,
        failed = report.failed,
        "seeding finished"
    );
    report
}

async fn seed_one(store: &dyn UserStore, account: &SeedAccount) -> Result<bool, StoreError> {
    if store.find_by_email(&account.email).await?.is_some() {
        return Ok(false);
    }

    let password_hash = hash_password_blocking(account.password.clone()).await?;
    let new_user = NewUser {
        username: account.username.clone(),
        email: account.email.clone(),
        role: account.role,
        mobile_number: account.mobile_number.clone(),
        password_hash,
    };

    match store.create(new_user).await {
        Ok(_) => Ok(true),
        // created concurrently by another instance
        Err(StoreError::DuplicateKey(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
