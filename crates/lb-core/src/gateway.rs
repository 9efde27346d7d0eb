//! # Mutation Gateway
//!
//! Write path for life blocks and the content embedded in them. Every
//! operation is a single repository call guarded by id + owner, followed by
//! a re-read of the stored document. Repository failures are logged here
//! and surface as `StorageError`.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    Content, ContentData, ContentUpdate, LifeBlock, LifeBlockPatch, LifeBlockUpdate, NewContent, NewLifeBlock,
};
use crate::schema::{normalize_schema, validate_content};
use crate::traits::LifeBlockRepo;

fn storage_failure(action: &'static str) -> impl FnOnce(anyhow::Error) -> AppError {
    move |e| {
        log::error!("failed to {action}: {e:#}");
        AppError::StorageError(format!("failed to {action}"))
    }
}

/// Stored timestamps are RFC 3339 text with a four-digit year.
fn client_timestamp(field: &str, at: Option<DateTime<Utc>>) -> Result<Option<DateTime<Utc>>> {
    match at {
        Some(at) if !(0..=9999).contains(&at.year()) => Err(AppError::ValidationError(format!(
            "{field} must fall between years 0000 and 9999"
        ))),
        at => Ok(at),
    }
}

#[derive(Clone)]
pub struct MutationGateway {
    repo: Arc<dyn LifeBlockRepo>,
    strict_validation: bool,
}

impl MutationGateway {
    pub fn new(repo: Arc<dyn LifeBlockRepo>) -> Self {
        Self {
            repo,
            strict_validation: false,
        }
    }

    /// When enabled, content whose type is known to the block is checked
    /// against that type's fields before it is written.
    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict_validation = strict;
        self
    }

    pub async fn create_life_block(&self, owner_user_id: &str, payload: NewLifeBlock) -> Result<LifeBlock> {
        let now = Utc::now();
        let created_at = client_timestamp("createdAt", payload.created_at)?.unwrap_or(now);
        let updated_at = client_timestamp("updatedAt", payload.updated_at)?;

        // Client-supplied contents keep their first occurrence per id.
        let mut seen = HashSet::new();
        let contents: Vec<Content> = payload
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .collect();

        let block = LifeBlock {
            id: Uuid::now_v7(),
            owner_user_id: owner_user_id.to_string(),
            name: payload.name,
            description: payload.description,
            color: payload.color,
            icon: payload.icon,
            content_types: normalize_schema(payload.content_types),
            contents,
            created_at,
            updated_at: updated_at.unwrap_or(created_at.max(now)),
        };

        self.repo
            .insert(&block)
            .await
            .map_err(storage_failure("create life block"))?;
        log::info!("life block {} created for {}", block.id, owner_user_id);

        self.reload(block.id, owner_user_id).await
    }

    pub async fn update_life_block(&self, id: Uuid, owner_user_id: &str, patch: LifeBlockPatch) -> Result<LifeBlock> {
        let update = LifeBlockUpdate {
            name: patch.name,
            description: patch.description,
            color: patch.color,
            icon: patch.icon,
            content_types: patch.content_types.map(normalize_schema),
        };

        let matched = self
            .repo
            .update_fields(id, owner_user_id, &update, Utc::now())
            .await
            .map_err(storage_failure("update life block"))?;
        if !matched {
            return Err(AppError::life_block_not_found(id));
        }

        self.reload(id, owner_user_id).await
    }

    /// Deleting a block drops its contents with it. A second delete is `NotFound`.
    pub async fn delete_life_block(&self, id: Uuid, owner_user_id: &str) -> Result<()> {
        let deleted = self
            .repo
            .delete(id, owner_user_id)
            .await
            .map_err(storage_failure("delete life block"))?;
        if !deleted {
            return Err(AppError::life_block_not_found(id));
        }
        log::info!("life block {id} deleted by {owner_user_id}");
        Ok(())
    }

    pub async fn add_content(&self, id: Uuid, owner_user_id: &str, payload: NewContent) -> Result<LifeBlock> {
        if self.strict_validation {
            self.validate(id, owner_user_id, &payload.content_type_id, &payload.data)
                .await?;
        }

        let content = Content::new(payload.content_type_id, payload.data, Utc::now());
        let matched = self
            .repo
            .push_content(id, owner_user_id, &content)
            .await
            .map_err(storage_failure("add content"))?;
        if !matched {
            return Err(AppError::life_block_not_found(id));
        }
        log::debug!("content {} appended to life block {id}", content.id);

        self.reload(id, owner_user_id).await
    }

    pub async fn update_content(
        &self,
        id: Uuid,
        owner_user_id: &str,
        content_id: &str,
        payload: ContentUpdate,
    ) -> Result<LifeBlock> {
        if self.strict_validation {
            let block = self.reload(id, owner_user_id).await?;
            let content = block
                .content(content_id)
                .ok_or_else(|| AppError::content_not_found(content_id))?;
            self.validate_against(&block, &content.content_type_id, &payload.data)?;
        }

        let matched = self
            .repo
            .set_content_data(id, owner_user_id, content_id, &payload.data, Utc::now())
            .await
            .map_err(storage_failure("update content"))?;
        if !matched {
            // Tell a missing block apart from a missing entry in an owned block.
            self.reload(id, owner_user_id).await?;
            return Err(AppError::content_not_found(content_id));
        }
        log::debug!("content {content_id} of life block {id} updated");

        self.reload(id, owner_user_id).await
    }

    /// Removes every entry with `content_id`. Removing an id that is not
    /// there still refreshes the block and succeeds.
    pub async fn remove_content(&self, id: Uuid, owner_user_id: &str, content_id: &str) -> Result<LifeBlock> {
        let matched = self
            .repo
            .pull_content(id, owner_user_id, content_id, Utc::now())
            .await
            .map_err(storage_failure("remove content"))?;
        if !matched {
            return Err(AppError::life_block_not_found(id));
        }
        log::debug!("content {content_id} removed from life block {id}");

        self.reload(id, owner_user_id).await
    }

    async fn reload(&self, id: Uuid, owner_user_id: &str) -> Result<LifeBlock> {
        self.repo
            .find_one(id, owner_user_id)
            .await
            .map_err(storage_failure("load life block"))?
            .ok_or_else(|| AppError::life_block_not_found(id))
    }

    async fn validate(&self, id: Uuid, owner_user_id: &str, content_type_id: &str, data: &ContentData) -> Result<()> {
        let block = self.reload(id, owner_user_id).await?;
        self.validate_against(&block, content_type_id, data)
    }

    fn validate_against(&self, block: &LifeBlock, content_type_id: &str, data: &ContentData) -> Result<()> {
        match block.content_type(content_type_id) {
            Some(content_type) => validate_content(content_type, data),
            // Dangling type references are tolerated.
            None => Ok(()),
        }
    }
}
