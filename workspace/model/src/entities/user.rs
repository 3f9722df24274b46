use sea_orm::entity::prelude::*;
use sea_orm::Set;
use std::fmt;

use crate::media::{MediaUrls, join_media_url};

/// File name served when an account has no profile image.
pub const DEFAULT_USER_IMAGE: &str = "usersimage.jpg";

/// Storage directory profile images are uploaded into.
pub const IMAGE_UPLOAD_DIR: &str = "users_images";

/// Represents an account holder of the system.
///
/// Accounts log in with their email. The password column only ever holds
/// an Argon2 PHC string produced by the password service.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique, indexed)]
    pub username: String,
    #[sea_orm(indexed)]
    pub first_name: String,
    #[sea_orm(indexed)]
    pub last_name: String,
    /// E.164 formatted, e.g. `+15551234567`.
    #[sea_orm(unique)]
    pub phone_number: String,
    #[sea_orm(unique, indexed)]
    pub email: String,
    pub password: String,
    /// Storage name of the profile image, relative to the media root.
    pub image: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub about: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub last_login: Option<DateTimeUtc>,
    pub created: DateTimeUtc,
    pub updated: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            id: Set(Uuid::new_v4()),
            first_name: Set(String::new()),
            last_name: Set(String::new()),
            is_active: Set(true),
            is_staff: Set(false),
            is_superuser: Set(false),
            ..ActiveModelTrait::default()
        }
    }

    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        // The primary key is assigned once, in `new`.
        if !insert && self.id.is_set() {
            return Err(DbErr::Custom("user id is immutable".to_string()));
        }

        let now = chrono::Utc::now();
        if insert {
            self.created = Set(now);
        }
        self.updated = Set(now);
        Ok(self)
    }
}

/// Administrative flags of an account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PermissionSet {
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl PermissionSet {
    /// Flags of a regular account.
    pub const REGULAR: Self = Self {
        is_staff: false,
        is_superuser: false,
    };

    /// Flags of an administrative account.
    pub const ADMIN: Self = Self {
        is_staff: true,
        is_superuser: true,
    };
}

impl Model {
    /// Display name of the account.
    ///
    /// This is the first name followed by the username, not first and last
    /// name. Accounts without a first name get a leading space.
    pub fn name(&self) -> String {
        format!("{} {}", self.first_name, self.username)
    }

    pub fn permissions(&self) -> PermissionSet {
        PermissionSet {
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
        }
    }

    /// URL to display as the account's profile picture.
    ///
    /// Falls back to `{media_url}usersimage.jpg` when no image is attached.
    pub fn get_user_image<M>(&self, media: &M) -> String
    where
        M: MediaUrls + ?Sized,
    {
        match self.image.as_deref() {
            Some(name) if !name.is_empty() => media.url(name),
            _ => join_media_url(media.base_url(), DEFAULT_USER_IMAGE),
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
