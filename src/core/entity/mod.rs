pub mod album;
pub mod artist;
pub mod genre;
pub mod moderation;
pub mod playlist;
pub mod playlist_track;
pub mod subscription;
pub mod track;
pub mod user;
