pub mod album;
pub mod artist;
pub mod genre;
pub mod moderation;
pub mod playlist;
pub mod subscription;
pub mod track;
pub mod user;

pub use album::AlbumData;
pub use artist::ArtistData;
pub use genre::GenreData;
pub use moderation::ModerationData;
pub use playlist::PlaylistData;
pub use subscription::SubscriptionData;
pub use track::{TrackData, TrackDetail};
pub use user::UserData;

use sea_orm::{DbErr, SqlErr};

use crate::service::Error;

/// Unique-index violations surface as `Error::Conflict`, anything else as a generic failure.
pub(crate) fn map_write_err(e: DbErr, what: &str) -> anyhow::Error {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            Error::Conflict(format!("{} already exists", what)).into()
        }
        _ => anyhow::anyhow!("Failed to save {}: {}", what, e),
    }
}
