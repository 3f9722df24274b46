use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::error;

/// Columns guarded by a unique constraint, in the order violations are matched.
///
/// `phone_number` and `username` are checked before `email` so that a
/// constraint name is never attributed to a column it merely contains.
const UNIQUE_FIELDS: [&str; 3] = ["phone_number", "username", "email"];

/// Error types for account management
#[derive(Error, Debug)]
pub enum AccountError {
    /// A required creation field was empty or absent
    #[error("{0} field must be provided")]
    MissingField(&'static str),

    /// A field was present but malformed
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Another account already holds this value
    #[error("an account with this {0} already exists")]
    DuplicateField(&'static str),

    /// The attached profile image could not be decoded
    #[error("image decode error: {0}")]
    ImageDecode(#[source] image::ImageError),

    /// The normalized profile image could not be encoded
    #[error("image encode error: {0}")]
    ImageEncode(#[source] image::ImageError),

    /// Error from the password hashing primitive
    #[error("password hash error: {0}")]
    PasswordHash(String),

    /// Error from the file storage
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Error from the database operations
    #[error("database error: {0}")]
    Database(DbErr),
}

impl From<DbErr> for AccountError {
    fn from(error: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(message)) = error.sql_err() {
            if let Some(field) = unique_field(&message) {
                error!(field, "Unique constraint violated: {}", message);
                return AccountError::DuplicateField(field);
            }
        }
        error!(?error, "Database error");
        AccountError::Database(error)
    }
}

impl From<argon2::password_hash::Error> for AccountError {
    fn from(error: argon2::password_hash::Error) -> Self {
        let err = AccountError::PasswordHash(error.to_string());
        error!(?err, "Password hash error");
        err
    }
}

/// Maps a unique violation message to the column it concerns.
///
/// SQLite reports `UNIQUE constraint failed: users.email`, PostgreSQL names
/// the violated index (`uq_users_email`).
fn unique_field(message: &str) -> Option<&'static str> {
    UNIQUE_FIELDS
        .into_iter()
        .find(|field| message.contains(*field))
}

/// Type alias for Result with AccountError
pub type Result<T> = std::result::Result<T, AccountError>;
