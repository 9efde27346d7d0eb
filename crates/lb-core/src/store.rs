//! # Content Store
//!
//! Read side of the engine. Ownership is an equality match on the owner id,
//! so "missing" and "someone else's" both come back as `NotFound`.

use std::sync::Arc;

use futures_util::stream::{BoxStream, StreamExt};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Content, LifeBlock};
use crate::traits::LifeBlockRepo;

#[derive(Clone)]
pub struct ContentStore {
    repo: Arc<dyn LifeBlockRepo>,
}

impl ContentStore {
    pub fn new(repo: Arc<dyn LifeBlockRepo>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: Uuid, owner_user_id: &str) -> Result<LifeBlock> {
        self.repo
            .find_one(id, owner_user_id)
            .await
            .map_err(|e| {
                log::error!("loading life block {id} failed: {e:#}");
                AppError::StorageError("failed to load life block".to_string())
            })?
            .ok_or_else(|| AppError::life_block_not_found(id))
    }

    /// The owner's life blocks in insertion order, fetched lazily.
    pub fn list(&self, owner_user_id: &str) -> BoxStream<'static, Result<LifeBlock>> {
        self.repo
            .find_many(owner_user_id)
            .map(|item| {
                item.map_err(|e| {
                    log::error!("listing life blocks failed: {e:#}");
                    AppError::StorageError("failed to list life blocks".to_string())
                })
            })
            .boxed()
    }

    pub async fn get_content(&self, id: Uuid, owner_user_id: &str, content_id: &str) -> Result<Content> {
        let block = self.get(id, owner_user_id).await?;
        block
            .content(content_id)
            .cloned()
            .ok_or_else(|| AppError::content_not_found(content_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockLifeBlockRepo;
    use futures_util::{stream, TryStreamExt};

    #[tokio::test]
    async fn missing_block_is_not_found() {
        let mut repo = MockLifeBlockRepo::new();
        repo.expect_find_one().returning(|_, _| Ok(None));
        let store = ContentStore::new(Arc::new(repo));

        let err = store.get(Uuid::now_v7(), "alice").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn repo_failure_becomes_storage_error() {
        let mut repo = MockLifeBlockRepo::new();
        repo.expect_find_one()
            .returning(|_, _| Err(anyhow::anyhow!("database is locked")));
        let store = ContentStore::new(Arc::new(repo));

        let err = store.get(Uuid::now_v7(), "alice").await.unwrap_err();
        assert_eq!(err, AppError::StorageError("failed to load life block".to_string()));
    }

    #[tokio::test]
    async fn list_maps_stream_errors() {
        let mut repo = MockLifeBlockRepo::new();
        repo.expect_find_many()
            .returning(|_| stream::iter(vec![Err(anyhow::anyhow!("disk I/O error"))]).boxed());
        let store = ContentStore::new(Arc::new(repo));

        let result: Result<Vec<LifeBlock>> = store.list("alice").try_collect().await;
        assert!(matches!(result, Err(AppError::StorageError(_))));
    }
}
