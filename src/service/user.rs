use std::sync::LazyLock;

use regex::Regex;

use crate::config::AdminAccount;
use crate::core::entity::user::{self, Role};
use crate::core::password::{hash_password, verify_password};
use crate::data::UserData;
use crate::service::errors::Error;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w{3,50}$").expect("valid username regex"));
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
});

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Registration {
    pub fn validate(&self) -> Result<(), Error> {
        if !USERNAME_RE.is_match(self.username.trim()) {
            return Err(Error::BadRequest(
                "Username must be 3-50 letters, digits or underscores".to_string(),
            ));
        }
        if !EMAIL_RE.is_match(self.email.trim()) {
            return Err(Error::BadRequest("Please enter a valid email".to_string()));
        }
        validate_new_password(&self.password, &self.confirm_password)
    }
}

fn validate_new_password(password: &str, confirm: &str) -> Result<(), Error> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if password != confirm {
        return Err(Error::BadRequest("Passwords do not match".to_string()));
    }
    Ok(())
}

pub struct UserService {
    data: UserData,
    password_cost: u32,
}

impl UserService {
    pub fn new(data: UserData, password_cost: u32) -> Self {
        Self {
            data,
            password_cost,
        }
    }

    pub async fn register(&self, form: Registration) -> anyhow::Result<user::Model> {
        form.validate()?;
        let username = form.username.trim().to_string();
        let email = form.email.trim().to_string();

        if self.data.find_by_username(&username).await?.is_some() {
            return Err(Error::Conflict("Username already exists".to_string()).into());
        }
        if self.data.find_by_email(&email).await?.is_some() {
            return Err(Error::Conflict("Email already exists".to_string()).into());
        }

        let hash = hash_password(&form.password, self.password_cost).await?;
        self.data
            .create_user(username, email, hash, Role::User)
            .await
    }

    /// Resolves the account by username or email and checks the password.
    pub async fn authenticate(&self, login: &str, password: &str) -> anyhow::Result<user::Model> {
        let invalid = || Error::Unauthorized("Invalid username or password".to_string());
        let user = self
            .data
            .find_by_username_or_email(login.trim())
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash).await {
            return Err(invalid().into());
        }

        tracing::debug!("User authenticated: {} (id: {})", user.username, user.id);
        Ok(user)
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> anyhow::Result<()> {
        let user = self
            .data
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        if !verify_password(old_password, &user.password_hash).await {
            return Err(Error::BadRequest("Current password is incorrect".to_string()).into());
        }
        validate_new_password(new_password, confirm_password)?;

        let hash = hash_password(new_password, self.password_cost).await?;
        self.data.update_password(user, hash).await?;
        tracing::info!("Password changed for user id {}", user_id);
        Ok(())
    }

    /// Creates the configured admin account unless the username is taken.
    pub async fn ensure_admin(&self, account: &AdminAccount) -> anyhow::Result<()> {
        if let Some(existing) = self.data.find_by_username(&account.username).await? {
            if !existing.is_admin() {
                tracing::warn!(
                    "Bootstrap admin '{}' exists without the Admin role",
                    existing.username
                );
            }
            return Ok(());
        }

        let hash = hash_password(&account.password, self.password_cost).await?;
        let admin = self
            .data
            .create_user(
                account.username.clone(),
                account.email.clone(),
                hash,
                Role::Admin,
            )
            .await?;
        tracing::info!("Bootstrap admin created: {} (id: {})", admin.username, admin.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        }
    }

    #[test]
    fn test_registration_validation() {
        assert!(registration("ann", "ann@example.com").validate().is_ok());
        assert!(registration("an", "ann@example.com").validate().is_err());
        assert!(registration("ann smith", "ann@example.com").validate().is_err());
        assert!(registration("ann", "not-an-email").validate().is_err());

        let mut short = registration("ann", "ann@example.com");
        short.password = "abc".into();
        short.confirm_password = "abc".into();
        assert!(short.validate().is_err());

        let mut mismatch = registration("ann", "ann@example.com");
        mismatch.confirm_password = "secret2".into();
        assert!(mismatch.validate().is_err());
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let db = testing::setup_db().await;
        let service = UserService::new(UserData::new(db), 4);

        let user = service
            .register(registration("ann", "ann@example.com"))
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);

        let err = service
            .register(registration("ann", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Conflict(_))));

        let err = service
            .register(registration("bob", "ann@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_authenticate_by_username_or_email() {
        let db = testing::setup_db().await;
        let service = UserService::new(UserData::new(db), 4);
        service
            .register(registration("ann", "ann@example.com"))
            .await
            .unwrap();

        assert_eq!(service.authenticate("ann", "secret1").await.unwrap().username, "ann");
        assert_eq!(
            service
                .authenticate("ann@example.com", "secret1")
                .await
                .unwrap()
                .username,
            "ann"
        );

        let err = service.authenticate("ann", "wrong-pass").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Unauthorized(_))));
        assert!(service.authenticate("nobody", "secret1").await.is_err());
    }

    #[tokio::test]
    async fn test_change_password_requires_old_password() {
        let db = testing::setup_db().await;
        let service = UserService::new(UserData::new(db), 4);
        let user = service
            .register(registration("ann", "ann@example.com"))
            .await
            .unwrap();

        let err = service
            .change_password(user.id, "bad-old", "newpass1", "newpass1")
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::BadRequest(_))));

        service
            .change_password(user.id, "secret1", "newpass1", "newpass1")
            .await
            .unwrap();
        assert!(service.authenticate("ann", "newpass1").await.is_ok());
        assert!(service.authenticate("ann", "secret1").await.is_err());
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let db = testing::setup_db().await;
        let service = UserService::new(UserData::new(db), 4);
        let account = AdminAccount {
            username: "root".into(),
            email: "root@example.com".into(),
            password: "rootpass".into(),
        };
        service.ensure_admin(&account).await.unwrap();
        service.ensure_admin(&account).await.unwrap();

        let admin = service.authenticate("root", "rootpass").await.unwrap();
        assert!(admin.is_admin());
    }
}
