use crate::core::entity::genre;
use crate::data::GenreData;
use crate::service::errors::Error;

pub struct GenreService {
    data: GenreData,
}

impl GenreService {
    pub fn new(data: GenreData) -> Self {
        Self { data }
    }

    pub async fn list_genres(&self) -> anyhow::Result<Vec<genre::Model>> {
        self.data.list_genres().await
    }

    /// Genre names are unique; a clash with another genre is a `Conflict`.
    pub async fn save_genre(&self, id: Option<i64>, name: &str) -> anyhow::Result<genre::Model> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::BadRequest("Genre name is required".to_string()).into());
        }

        if let Some(existing) = self.data.find_by_name(name).await? {
            if Some(existing.id) != id {
                return Err(Error::Conflict(format!("Genre '{}' already exists", name)).into());
            }
        }

        let genre = self.data.save_genre(id, name.to_string()).await?;
        tracing::info!("Genre saved: {} (id: {})", genre.name, genre.id);
        Ok(genre)
    }

    pub async fn delete_genre(&self, id: i64) -> anyhow::Result<()> {
        if !self.data.delete_genre(id).await? {
            return Err(Error::NotFound("Genre not found".to_string()).into());
        }
        Ok(())
    }
}
