use chrono::Utc;
use model::entities::user::{self, PermissionSet};
use sea_orm::{IntoActiveModel, Set};
use tracing::{debug, info, instrument, warn};

use crate::error::{AccountError, Result};
use crate::password::PasswordService;
use crate::profile_image::ImageUpload;
use crate::store::AccountStore;
use crate::validation::{AccountFields, is_blank, normalize_email, normalize_phone_number};

/// Optional values accepted on account creation.
#[derive(Clone, Debug, Default)]
pub struct ExtraFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub about: Option<String>,
    pub is_active: Option<bool>,
    /// Ignored by [`AccountManager::create_superuser`].
    pub permissions: Option<PermissionSet>,
    pub image: Option<ImageUpload>,
}

/// Creates accounts and manages their credentials.
///
/// This is the only supported way to create an account: it validates the
/// input, normalizes the email and hashes the password before the record
/// reaches the store.
#[derive(Clone)]
pub struct AccountManager {
    store: AccountStore,
    passwords: PasswordService,
}

impl AccountManager {
    pub fn new(store: AccountStore) -> Self {
        Self {
            store,
            passwords: PasswordService::new(),
        }
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    /// Creates a regular account.
    ///
    /// The account is neither staff nor superuser unless `extra.permissions`
    /// says otherwise.
    #[instrument(skip(self, password, extra))]
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        phone_number: &str,
        password: &str,
        extra: ExtraFields,
    ) -> Result<user::Model> {
        self.create(username, email, phone_number, password, extra, None)
            .await
    }

    /// Creates an administrative account.
    ///
    /// Staff and superuser flags are always set, whatever `extra` holds.
    #[instrument(skip(self, password, extra))]
    pub async fn create_superuser(
        &self,
        username: &str,
        email: &str,
        phone_number: &str,
        password: &str,
        extra: ExtraFields,
    ) -> Result<user::Model> {
        self.create(
            username,
            email,
            phone_number,
            password,
            extra,
            Some(PermissionSet::ADMIN),
        )
        .await
    }

    async fn create(
        &self,
        username: &str,
        email: &str,
        phone_number: &str,
        password: &str,
        extra: ExtraFields,
        forced: Option<PermissionSet>,
    ) -> Result<user::Model> {
        check_required(username, email, phone_number, password)?;

        let ExtraFields {
            first_name,
            last_name,
            about,
            is_active,
            permissions,
            image,
        } = extra;

        let fields = AccountFields {
            username: username.to_string(),
            email: normalize_email(email),
            phone_number: normalize_phone_number(phone_number),
            first_name: first_name.unwrap_or_default(),
            last_name: last_name.unwrap_or_default(),
        };
        fields.check()?;
        debug!("Account fields validated for {}", fields.email);

        let permissions = forced.or(permissions).unwrap_or(PermissionSet::REGULAR);
        let password = self.passwords.hash(password)?;

        let account = user::ActiveModel {
            username: Set(fields.username),
            first_name: Set(fields.first_name),
            last_name: Set(fields.last_name),
            phone_number: Set(fields.phone_number),
            email: Set(fields.email),
            password: Set(password),
            image: Set(None),
            about: Set(about),
            is_active: Set(is_active.unwrap_or(true)),
            is_staff: Set(permissions.is_staff),
            is_superuser: Set(permissions.is_superuser),
            last_login: Set(None),
            ..Default::default()
        };

        let account = self.store.insert(account, image).await?;
        info!(
            "Created account {} ({}), staff: {}, superuser: {}",
            account.id, account.username, account.is_staff, account.is_superuser
        );
        Ok(account)
    }

    /// Finds an account by its login identifier.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        self.store.find_by_email(&normalize_email(email)).await
    }

    /// Replaces the password of `account`.
    #[instrument(skip_all, fields(account = %account.id))]
    pub async fn set_password(&self, account: user::Model, password: &str) -> Result<user::Model> {
        if password.is_empty() {
            return Err(AccountError::MissingField("password"));
        }
        let mut active = account.into_active_model();
        active.password = Set(self.passwords.hash(password)?);
        self.store.update(active, None).await
    }

    pub fn check_password(&self, account: &user::Model, password: &str) -> Result<bool> {
        self.passwords.verify(password, &account.password)
    }

    /// Attaches a new profile image to `account`.
    #[instrument(skip_all, fields(account = %account.id, image = %upload.name))]
    pub async fn set_image(&self, account: user::Model, upload: ImageUpload) -> Result<user::Model> {
        self.store.update(account.into_active_model(), Some(upload)).await
    }

    /// Checks login credentials.
    ///
    /// Returns the account for a matching email and password, or `None` if
    /// either is wrong or the account is inactive. Records the login time.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<user::Model>> {
        let Some(account) = self.get_by_email(email).await? else {
            // Hash anyway so unknown emails take as long as wrong passwords.
            self.passwords.hash(password)?;
            debug!("No account for {}", email);
            return Ok(None);
        };

        if !self.check_password(&account, password)? {
            return Ok(None);
        }
        if !account.is_active {
            warn!("Rejected login of inactive account {}", account.id);
            return Ok(None);
        }

        let mut active = account.into_active_model();
        active.last_login = Set(Some(Utc::now()));
        let account = self.store.update(active, None).await?;
        info!("Account {} authenticated", account.id);
        Ok(Some(account))
    }
}

/// Presence checks, in order, the first blank field wins.
fn check_required(username: &str, email: &str, phone_number: &str, password: &str) -> Result<()> {
    for (field, value) in [
        ("username", username),
        ("email", email),
        ("phone_number", phone_number),
    ] {
        if is_blank(value) {
            return Err(AccountError::MissingField(field));
        }
    }
    if password.is_empty() {
        return Err(AccountError::MissingField("password"));
    }
    Ok(())
}
