use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTimeUtc,
}

#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Role {
    #[default]
    #[sea_orm(string_value = "User")]
    User,
    #[sea_orm(string_value = "Subscriber")]
    Subscriber,
    #[sea_orm(string_value = "Musician")]
    Musician,
    #[sea_orm(string_value = "Admin")]
    Admin,
}

impl Model {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_musician(&self) -> bool {
        matches!(self.role, Role::Musician | Role::Admin)
    }

    pub fn can_upload_tracks(&self) -> bool {
        matches!(self.role, Role::Musician | Role::Admin)
    }

    /// Subscriber by role alone; an active subscription also counts, see `SubscriptionService`.
    pub fn has_subscriber_role(&self) -> bool {
        matches!(self.role, Role::Subscriber | Role::Admin)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::playlist::Entity")]
    Playlist,
    #[sea_orm(has_many = "super::subscription::Entity")]
    Subscription,
}

impl Related<super::playlist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Playlist.def()
    }
}

impl Related<super::subscription::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscription.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(role: Role) -> Model {
        Model {
            id: 1,
            username: "ann".into(),
            email: "ann@example.com".into(),
            password_hash: String::new(),
            role,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_role_predicates() {
        let admin = user_with(Role::Admin);
        assert!(admin.is_admin() && admin.is_musician() && admin.can_upload_tracks());
        assert!(admin.has_subscriber_role());

        let musician = user_with(Role::Musician);
        assert!(!musician.is_admin());
        assert!(musician.is_musician());
        assert!(musician.can_upload_tracks());

        let subscriber = user_with(Role::Subscriber);
        assert!(!subscriber.can_upload_tracks());
        assert!(subscriber.has_subscriber_role());

        let user = user_with(Role::User);
        assert!(!user.is_admin() && !user.is_musician() && !user.has_subscriber_role());
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let mut user = user_with(Role::User);
        user.password_hash = "secret-hash".into();
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"role\":\"User\""));
    }
}
