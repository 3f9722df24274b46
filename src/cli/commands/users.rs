use std::fmt::Write as _;
use std::path::Path;

use accounts::{AccountManager, ExtraFields, ImageUpload};
use anyhow::{Context, Result};
use model::entities::user;
use tracing::{debug, error, info, trace};

use crate::cli::NewAccount;

async fn find_account(manager: &AccountManager, email: &str) -> Result<user::Model> {
    manager
        .get_by_email(email)
        .await?
        .with_context(|| format!("No account with email {}", email))
}

/// Create a regular or administrative account.
pub async fn create_account(
    manager: &AccountManager,
    account: NewAccount,
    superuser: bool,
) -> Result<user::Model> {
    trace!("Entering create_account function");
    debug!("Creating account {} (superuser: {})", account.username, superuser);

    let extra = ExtraFields {
        first_name: account.first_name,
        last_name: account.last_name,
        about: account.about,
        is_active: account.inactive.then_some(false),
        ..Default::default()
    };

    let result = if superuser {
        manager
            .create_superuser(
                &account.username,
                &account.email,
                &account.phone_number,
                &account.password,
                extra,
            )
            .await
    } else {
        manager
            .create_user(
                &account.username,
                &account.email,
                &account.phone_number,
                &account.password,
                extra,
            )
            .await
    };

    match result {
        Ok(created) => {
            info!("Account {} created", created.username);
            Ok(created)
        }
        Err(e) => {
            error!("Failed to create account '{}': {}", account.username, e);
            Err(e.into())
        }
    }
}

/// Upload the image at `path` as the profile image. Returns its URL.
pub async fn set_image(manager: &AccountManager, email: &str, path: &Path) -> Result<String> {
    trace!("Entering set_image function");
    let account = find_account(manager, email).await?;

    debug!("Reading image from {}", path.display());
    let upload = ImageUpload::from_path(path)
        .await
        .with_context(|| format!("Failed to read image '{}'", path.display()))?;

    let account = match manager.set_image(account, upload).await {
        Ok(account) => account,
        Err(e) => {
            error!("Failed to set image of {}: {}", email, e);
            return Err(e.into());
        }
    };

    info!("Profile image of {} updated", account.username);
    Ok(manager.store().image_url(&account))
}

/// Render an account for display.
pub async fn show_user(manager: &AccountManager, email: &str) -> Result<String> {
    let account = find_account(manager, email).await?;

    let mut out = String::new();
    writeln!(out, "{}", account.name())?;
    writeln!(out, "  id:           {}", account.id)?;
    writeln!(out, "  username:     {}", account.username)?;
    writeln!(out, "  email:        {}", account.email)?;
    writeln!(out, "  phone number: {}", account.phone_number)?;
    writeln!(out, "  active:       {}", account.is_active)?;
    writeln!(out, "  staff:        {}", account.is_staff)?;
    writeln!(out, "  superuser:    {}", account.is_superuser)?;
    writeln!(out, "  image:        {}", manager.store().image_url(&account))?;
    match account.last_login {
        Some(at) => write!(out, "  last login:   {}", at.to_rfc3339())?,
        None => write!(out, "  last login:   never")?,
    }
    Ok(out)
}

/// Run the login check for `email`.
pub async fn check_password(manager: &AccountManager, email: &str, password: &str) -> Result<bool> {
    let valid = manager.authenticate(email, password).await?.is_some();
    debug!("Credentials of {} valid: {}", email, valid);
    Ok(valid)
}
