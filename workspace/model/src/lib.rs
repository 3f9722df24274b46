pub mod entities;
pub mod media;

// Re-export tracing for use in this crate
pub use tracing;

#[cfg(test)]
mod test {
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, DbErr, EntityTrait,
        QueryFilter, Set,
    };

    use crate::entities::prelude::*;
    use crate::entities::user;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;
        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    fn new_user(username: &str, email: &str, phone: &str) -> user::ActiveModel {
        user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            phone_number: Set(phone.to_string()),
            password: Set("hashed".to_string()),
            image: Set(None),
            about: Set(None),
            last_login: Set(None),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_user_insert_populates_defaults() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let inserted = new_user("user1", "user1@example.com", "+15550000001")
            .insert(&db)
            .await?;

        assert!(inserted.is_active);
        assert!(!inserted.is_staff);
        assert!(!inserted.is_superuser);
        assert_eq!(inserted.first_name, "");
        assert_eq!(inserted.created, inserted.updated);

        let found = User::find()
            .filter(user::Column::Email.eq("user1@example.com"))
            .one(&db)
            .await?
            .expect("user should exist");
        assert_eq!(found.id, inserted.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_user_update_refreshes_updated_only() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let inserted = new_user("user1", "user1@example.com", "+15550000001")
            .insert(&db)
            .await?;

        let mut active: user::ActiveModel = inserted.clone().into();
        active.about = Set(Some("hello".to_string()));
        let updated = active.update(&db).await?;

        assert_eq!(updated.id, inserted.id);
        assert_eq!(updated.created, inserted.created);
        assert!(updated.updated >= inserted.updated);
        assert_eq!(updated.about.as_deref(), Some("hello"));

        Ok(())
    }

    #[tokio::test]
    async fn test_user_id_is_immutable() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let inserted = new_user("user1", "user1@example.com", "+15550000001")
            .insert(&db)
            .await?;

        let mut active: user::ActiveModel = inserted.into();
        active.id = Set(uuid::Uuid::new_v4());
        assert!(active.update(&db).await.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_unique_columns_are_enforced() -> Result<(), DbErr> {
        let db = setup_db().await?;

        new_user("user1", "user1@example.com", "+15550000001")
            .insert(&db)
            .await?;

        let same_username = new_user("user1", "other@example.com", "+15550000002")
            .insert(&db)
            .await;
        assert!(same_username.is_err());

        let same_email = new_user("user2", "user1@example.com", "+15550000003")
            .insert(&db)
            .await;
        assert!(same_email.is_err());

        let same_phone = new_user("user3", "user3@example.com", "+15550000001")
            .insert(&db)
            .await;
        assert!(same_phone.is_err());

        assert_eq!(User::find().all(&db).await?.len(), 1);
        Ok(())
    }
}
