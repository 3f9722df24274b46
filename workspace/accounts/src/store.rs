use std::sync::Arc;

use model::entities::user;
use sea_orm::prelude::Uuid;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::Result;
use crate::profile_image::{self, ImageUpload, Normalized};
use crate::storage::FileStorage;

/// Length limit of the `image` column.
const MAX_IMAGE_NAME_LEN: usize = 100;

/// Room kept free for the suffix storage appends to taken names.
const NAME_SUFFIX_RESERVE: usize = 8;

/// Longest extension kept from an uploaded file name.
const MAX_EXTENSION_LEN: usize = 16;

/// A blob to store alongside the record.
struct PendingImage {
    name: String,
    content: Vec<u8>,
    /// Stored blob this one supersedes, removed once the record is written.
    replaces: Option<String>,
}

/// Persists accounts and their profile images.
///
/// Every write goes through the pre-save image normalization in
/// [`profile_image`]. Blobs are stored before the record is written and
/// removed again if the write fails, so a failed save leaves neither.
#[derive(Clone)]
pub struct AccountStore {
    db: DatabaseConnection,
    storage: Arc<dyn FileStorage>,
}

impl AccountStore {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn FileStorage>) -> Self {
        Self { db, storage }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn storage(&self) -> &dyn FileStorage {
        self.storage.as_ref()
    }

    /// Inserts a new account, storing `upload` as its profile image.
    #[instrument(skip_all)]
    pub async fn insert(
        &self,
        account: user::ActiveModel,
        upload: Option<ImageUpload>,
    ) -> Result<user::Model> {
        self.persist(account, upload, true).await
    }

    /// Writes changes to an existing account.
    ///
    /// Runs image normalization on the stored image even when only other
    /// fields changed.
    #[instrument(skip_all)]
    pub async fn update(
        &self,
        account: user::ActiveModel,
        upload: Option<ImageUpload>,
    ) -> Result<user::Model> {
        self.persist(account, upload, false).await
    }

    async fn persist(
        &self,
        mut account: user::ActiveModel,
        upload: Option<ImageUpload>,
        insert: bool,
    ) -> Result<user::Model> {
        let pending = self.prepare_image(&account, upload).await?;

        let mut stored = None;
        if let Some(image) = &pending {
            let name = self.storage.save(&image.name, &image.content).await?;
            debug!("Stored profile image as {}", name);
            account.image = Set(Some(name.clone()));
            stored = Some(name);
        }

        let result = if insert {
            account.insert(&self.db).await
        } else {
            account.update(&self.db).await
        };

        match result {
            Ok(model) => {
                let superseded = pending.and_then(|p| p.replaces);
                if let (Some(old), Some(new)) = (superseded, stored) {
                    if old != new {
                        self.discard(&old).await;
                    }
                }
                info!("Saved account {} ({})", model.id, model.username);
                Ok(model)
            }
            Err(db_error) => {
                if let Some(name) = stored {
                    self.discard(&name).await;
                }
                Err(db_error.into())
            }
        }
    }

    /// The blob to write for this save, if any.
    async fn prepare_image(
        &self,
        account: &user::ActiveModel,
        upload: Option<ImageUpload>,
    ) -> Result<Option<PendingImage>> {
        if let Some(upload) = upload {
            let file_name = upload.file_name().to_string();
            trace!("Normalizing uploaded image {}", file_name);
            let content = match profile_image::normalize(&file_name, &upload.content)? {
                Normalized::Replaced { content } => content,
                Normalized::Unchanged { .. } => upload.content,
            };
            return Ok(Some(PendingImage {
                name: upload_name(&file_name),
                content,
                replaces: None,
            }));
        }

        let Some(current) = current_image(account) else {
            trace!("No image attached, skipping normalization");
            return Ok(None);
        };

        trace!("Normalizing stored image {}", current);
        let content = self.storage.open(&current).await?;
        match profile_image::normalize(&current, &content)? {
            Normalized::Replaced { content } => Ok(Some(PendingImage {
                name: current.clone(),
                content,
                replaces: Some(current),
            })),
            Normalized::Unchanged { .. } => Ok(None),
        }
    }

    async fn discard(&self, name: &str) {
        if let Err(e) = self.storage.delete(name).await {
            warn!("Failed to remove stored image {}: {}", name, e);
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<user::Model>> {
        Ok(user::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Looks an account up by its stored (already normalized) email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    /// Profile image URL of `account`, see [`user::Model::get_user_image`].
    pub fn image_url(&self, account: &user::Model) -> String {
        account.get_user_image(self.storage.as_ref())
    }
}

fn current_image(account: &user::ActiveModel) -> Option<String> {
    match &account.image {
        ActiveValue::Set(image) | ActiveValue::Unchanged(image) => {
            image.clone().filter(|name| !name.is_empty())
        }
        ActiveValue::NotSet => None,
    }
}

/// Storage name for an uploaded file, shortened to fit the `image` column.
fn upload_name(file_name: &str) -> String {
    let budget = MAX_IMAGE_NAME_LEN - NAME_SUFFIX_RESERVE - user::IMAGE_UPLOAD_DIR.len() - 1;
    let file_name = if file_name.chars().count() > budget {
        let (stem, ext) = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (file_name, None),
        };
        match ext {
            Some(ext) => {
                let ext: String = ext.chars().take(MAX_EXTENSION_LEN).collect();
                let keep = budget - ext.chars().count() - 1;
                format!("{}.{}", stem.chars().take(keep).collect::<String>(), ext)
            }
            None => stem.chars().take(budget).collect(),
        }
    } else {
        file_name.to_string()
    };
    format!("{}/{}", user::IMAGE_UPLOAD_DIR, file_name)
}
