//! Review storage keyed by (user, game id).
//!
//! Methods return `impl Future + Send` rather than using `async fn` so the
//! futures can be moved into `tokio::spawn`.

use std::future::Future;
use std::path::PathBuf;

use crate::types::GameReview;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Repository for game reviews.
pub trait ReviewRepository: Send + Sync {
    fn save_review(
        &self,
        user: &str,
        review: &GameReview,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn load_review(
        &self,
        user: &str,
        game_id: &str,
    ) -> impl Future<Output = Result<Option<GameReview>, PersistenceError>> + Send;
    fn list_reviews(
        &self,
        user: &str,
    ) -> impl Future<Output = Result<Vec<GameReview>, PersistenceError>> + Send;
    fn delete_review(
        &self,
        user: &str,
        game_id: &str,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// One JSON file per review under `<dir>/<user>/<game_id>.json`.
pub struct JsonReviewStore {
    dir: PathBuf,
}

impl JsonReviewStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            dir: data_dir.join("reviews"),
        }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn user_dir(&self, user: &str) -> Result<PathBuf, PersistenceError> {
        Ok(self.dir.join(checked_key(user)?))
    }

    fn file_path(&self, user: &str, game_id: &str) -> Result<PathBuf, PersistenceError> {
        Ok(self
            .user_dir(user)?
            .join(format!("{}.json", checked_key(game_id)?)))
    }
}

/// Keys become path components; reject anything that could escape the store.
fn checked_key(key: &str) -> Result<&str, PersistenceError> {
    let valid = !key.is_empty()
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(key)
    } else {
        Err(PersistenceError::InvalidKey(key.to_string()))
    }
}

impl ReviewRepository for JsonReviewStore {
    async fn save_review(&self, user: &str, review: &GameReview) -> Result<(), PersistenceError> {
        let path = self.file_path(user, &review.id)?;
        std::fs::create_dir_all(self.user_dir(user)?)?;
        let json = serde_json::to_string_pretty(review)?;
        std::fs::write(&path, json)?;
        tracing::debug!(user, game_id = %review.id, "Review saved");
        Ok(())
    }

    async fn load_review(
        &self,
        user: &str,
        game_id: &str,
    ) -> Result<Option<GameReview>, PersistenceError> {
        let path = self.file_path(user, game_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Newest first. Files that fail to parse are skipped.
    async fn list_reviews(&self, user: &str) -> Result<Vec<GameReview>, PersistenceError> {
        let dir = self.user_dir(user)?;
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut reviews = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(contents) => match serde_json::from_str::<GameReview>(&contents) {
                    Ok(review) => reviews.push(review),
                    Err(e) => tracing::warn!("Skipping unreadable review {:?}: {}", path, e),
                },
                Err(e) => tracing::warn!("Failed to read file {:?}: {}", path, e),
            }
        }
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(reviews)
    }

    async fn delete_review(&self, user: &str, game_id: &str) -> Result<(), PersistenceError> {
        let path = self.file_path(user, game_id)?;
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }
}
