use sea_orm::prelude::*;
use sea_orm::{ActiveValue, Condition, Order, QueryOrder, Set};

use crate::core::entity::user::{self, Role};
use crate::data::map_write_err;

#[derive(Clone)]
pub struct UserData {
    db: DatabaseConnection,
}

impl UserData {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<user::Model>> {
        user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query user: {}", e))
    }

    pub async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<user::Model>> {
        user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query user: {}", e))
    }

    pub async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<user::Model>> {
        user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query user: {}", e))
    }

    pub async fn find_by_username_or_email(
        &self,
        login: &str,
    ) -> anyhow::Result<Option<user::Model>> {
        user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(login))
                    .add(user::Column::Email.eq(login)),
            )
            .one(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query user: {}", e))
    }

    pub async fn create_user(
        &self,
        username: String,
        email: String,
        password_hash: String,
        role: Role,
    ) -> anyhow::Result<user::Model> {
        let user = user::ActiveModel {
            id: ActiveValue::NotSet,
            username: Set(username),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(role),
            created_at: Set(chrono::Utc::now()),
        };

        let user = user
            .insert(&self.db)
            .await
            .map_err(|e| map_write_err(e, "User"))?;

        tracing::info!("New user registered: {} (id: {})", user.username, user.id);
        Ok(user)
    }

    pub async fn list_users(&self) -> anyhow::Result<Vec<user::Model>> {
        user::Entity::find()
            .order_by(user::Column::Username, Order::Asc)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list users: {}", e))
    }

    pub async fn search_users(&self, query: &str) -> anyhow::Result<Vec<user::Model>> {
        user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.contains(query))
                    .add(user::Column::Email.contains(query))
                    .add(user::Column::Role.contains(query)),
            )
            .order_by(user::Column::Username, Order::Asc)
            .all(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to search users: {}", e))
    }

    pub async fn count_users(&self) -> anyhow::Result<u64> {
        user::Entity::find()
            .count(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to count users: {}", e))
    }

    pub async fn count_by_role(&self, role: Role) -> anyhow::Result<u64> {
        user::Entity::find()
            .filter(user::Column::Role.eq(role))
            .count(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to count users: {}", e))
    }

    /// Returns None when the user does not exist.
    pub async fn update_role(&self, id: i64, role: Role) -> anyhow::Result<Option<user::Model>> {
        let Some(user) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let mut user: user::ActiveModel = user.into();
        user.role = Set(role);
        let user = user
            .update(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to update user role: {}", e))?;
        Ok(Some(user))
    }

    pub async fn update_password(&self, user: user::Model, password_hash: String) -> anyhow::Result<()> {
        let mut user: user::ActiveModel = user.into();
        user.password_hash = Set(password_hash);
        user.update(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to update password: {}", e))?;
        Ok(())
    }
}
