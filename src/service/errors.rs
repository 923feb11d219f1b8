use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("InternalServerError: {0}")]
    InternalServerError(String),
}

impl Error {
    /// The message without the variant prefix, for flash banners.
    pub fn message(&self) -> &str {
        match self {
            Error::NotFound(m)
            | Error::Unauthorized(m)
            | Error::BadRequest(m)
            | Error::Forbidden(m)
            | Error::Conflict(m)
            | Error::InternalServerError(m) => m,
        }
    }
}
