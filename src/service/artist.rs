use crate::core::entity::artist;
use crate::data::ArtistData;
use crate::service::errors::Error;

pub struct ArtistService {
    data: ArtistData,
}

impl ArtistService {
    pub fn new(data: ArtistData) -> Self {
        Self { data }
    }

    pub async fn list_artists(&self) -> anyhow::Result<Vec<artist::Model>> {
        self.data.list_artists().await
    }

    pub async fn save_artist(
        &self,
        id: Option<i64>,
        name: &str,
        description: &str,
        photo_path: Option<String>,
    ) -> anyhow::Result<artist::Model> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::BadRequest("Artist name is required".to_string()).into());
        }
        if let Some(id) = id {
            if self.data.find_by_id(id).await?.is_none() {
                return Err(Error::NotFound("Artist not found".to_string()).into());
            }
        }
        let photo_path = photo_path.filter(|p| !p.trim().is_empty());
        self.data
            .save_artist(id, name.to_string(), description.trim().to_string(), photo_path)
            .await
    }

    /// Albums of the artist go with it; tracks keep existing without an artist.
    pub async fn delete_artist(&self, id: i64) -> anyhow::Result<()> {
        if !self.data.delete_artist(id).await? {
            return Err(Error::NotFound("Artist not found".to_string()).into());
        }
        tracing::info!("Artist {} deleted", id);
        Ok(())
    }
}
