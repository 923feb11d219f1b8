pub(crate) mod admin;
pub(crate) mod album;
pub(crate) mod artist;
pub(crate) mod auth;
pub(crate) mod errors;
pub(crate) mod genre;
pub(crate) mod playlist;
pub(crate) mod search;
pub(crate) mod subscription;
pub(crate) mod track;
pub(crate) mod user;

pub use admin::AdminService;
pub use album::AlbumService;
pub use artist::ArtistService;
pub use auth::{AuthService, Identity, Viewer};
pub use errors::Error;
pub use genre::GenreService;
pub use playlist::PlaylistService;
pub use search::SearchService;
pub use subscription::SubscriptionService;
pub use track::TrackService;
pub use user::UserService;
