//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Content, ContentData, LifeBlock, LifeBlockUpdate};

/// Stream of an owner's life blocks, in insertion order.
pub type LifeBlockStream = BoxStream<'static, anyhow::Result<LifeBlock>>;

/// Document persistence for life blocks.
///
/// Every filtered operation matches on id *and* owner; a mismatch on either
/// is reported as "nothing matched" (`None` / `false`), never as an error.
/// Content mutations must be atomic with respect to concurrent writers on
/// the same block.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait LifeBlockRepo: Send + Sync {
    async fn insert(&self, block: &LifeBlock) -> anyhow::Result<()>;

    async fn find_one(&self, id: Uuid, owner_user_id: &str) -> anyhow::Result<Option<LifeBlock>>;

    /// Lazily yields the owner's blocks; nothing is fetched until polled.
    fn find_many(&self, owner_user_id: &str) -> LifeBlockStream;

    /// Sets the present fields of `update` and bumps `updated_at` to at least `now`.
    async fn update_fields(
        &self,
        id: Uuid,
        owner_user_id: &str,
        update: &LifeBlockUpdate,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool>;

    async fn delete(&self, id: Uuid, owner_user_id: &str) -> anyhow::Result<bool>;

    /// Appends `content` to the end of the block's contents.
    async fn push_content(&self, id: Uuid, owner_user_id: &str, content: &Content) -> anyhow::Result<bool>;

    /// Replaces `data` and `updatedAt` of the entry with `content_id` in place.
    /// Returns `false` when the block or the entry is missing.
    async fn set_content_data(
        &self,
        id: Uuid,
        owner_user_id: &str,
        content_id: &str,
        data: &ContentData,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool>;

    /// Removes every entry whose id is `content_id`. Returns `false` only
    /// when the block itself did not match.
    async fn pull_content(
        &self,
        id: Uuid,
        owner_user_id: &str,
        content_id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool>;
}

/// Identity contract. The engine trusts whatever owner id this returns.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AuthProvider: Send + Sync {
    /// Verifies a bearer token and returns the authenticated user id.
    fn verify_token(&self, token: &str) -> Result<String>;
}
