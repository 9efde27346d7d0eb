//! # lb-db-sqlite
//!
//! SQLite implementation of `LifeBlockRepo`.
//!
//! A life block is one row; its content types and contents are JSON arrays
//! in TEXT columns. Content mutations are single `UPDATE` statements built on
//! SQLite's JSON functions, so append / set-in-place / remove-matching are
//! atomic without any locking on our side, and a failed id + owner guard
//! changes nothing.

use std::collections::VecDeque;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::stream::{self, StreamExt};
use lb_core::models::{Content, ContentData, LifeBlock, LifeBlockUpdate};
use lb_core::traits::{LifeBlockRepo, LifeBlockStream};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

/// Blocks fetched per round trip while streaming a listing.
const PAGE_SIZE: i64 = 64;

macro_rules! select_blocks {
    ($tail:literal) => {
        concat!(
            "SELECT seq, id, owner_id, name, description, color, icon, content_types, contents, created_at, updated_at ",
            "FROM life_blocks ",
            $tail
        )
    };
}

pub struct SqliteLifeBlockRepo {
    pool: SqlitePool,
}

// Helper for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> anyhow::Result<Uuid> {
    Ok(Uuid::from_slice(blob)?)
}

/// Fixed-width RFC 3339 so that `MAX()` over the text column is a time comparison.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn row_to_block(row: &SqliteRow) -> anyhow::Result<LifeBlock> {
    Ok(LifeBlock {
        id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("id")?)?,
        owner_user_id: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        color: row.try_get("color")?,
        icon: row.try_get("icon")?,
        content_types: serde_json::from_str(&row.try_get::<String, _>("content_types")?)?,
        contents: serde_json::from_str(&row.try_get::<String, _>("contents")?)?,
        created_at: parse_ts(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_ts(&row.try_get::<String, _>("updated_at")?)?,
    })
}

impl SqliteLifeBlockRepo {
    /// Opens (creating if needed) the database at `database_url` and runs migrations.
    ///
    /// `sqlite::memory:` databases live as long as their connection, so the
    /// pool is pinned to a single connection that is never recycled.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let in_memory = database_url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            pool_options = pool_options
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }

        let pool = pool_options.connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("life block store ready at {database_url}");

        Ok(Self { pool })
    }

    /// Waits for in-flight queries and closes every connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Keyset pagination state behind `find_many`.
struct Cursor {
    pool: SqlitePool,
    owner_user_id: String,
    after_seq: i64,
    buffered: VecDeque<LifeBlock>,
    exhausted: bool,
}

impl Cursor {
    async fn fill(&mut self) -> anyhow::Result<()> {
        let rows = sqlx::query(select_blocks!("WHERE owner_id = ? AND seq > ? ORDER BY seq LIMIT ?"))
            .bind(&self.owner_user_id)
            .bind(self.after_seq)
            .bind(PAGE_SIZE)
            .fetch_all(&self.pool)
            .await?;

        self.exhausted = (rows.len() as i64) < PAGE_SIZE;
        for row in &rows {
            self.after_seq = row.try_get("seq")?;
            self.buffered.push_back(row_to_block(row)?);
        }
        Ok(())
    }
}

#[async_trait]
impl LifeBlockRepo for SqliteLifeBlockRepo {
    async fn insert(&self, block: &LifeBlock) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO life_blocks (id, owner_id, name, description, color, icon, content_types, contents, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(block.id))
        .bind(&block.owner_user_id)
        .bind(&block.name)
        .bind(&block.description)
        .bind(&block.color)
        .bind(&block.icon)
        .bind(serde_json::to_string(&block.content_types)?)
        .bind(serde_json::to_string(&block.contents)?)
        .bind(ts(block.created_at))
        .bind(ts(block.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_one(&self, id: Uuid, owner_user_id: &str) -> anyhow::Result<Option<LifeBlock>> {
        let row = sqlx::query(select_blocks!("WHERE id = ? AND owner_id = ?"))
            .bind(uuid_to_blob(id))
            .bind(owner_user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_block).transpose()
    }

    fn find_many(&self, owner_user_id: &str) -> LifeBlockStream {
        let cursor = Cursor {
            pool: self.pool.clone(),
            owner_user_id: owner_user_id.to_string(),
            after_seq: 0,
            buffered: VecDeque::new(),
            exhausted: false,
        };

        stream::try_unfold(cursor, |mut cursor| async move {
            if cursor.buffered.is_empty() && !cursor.exhausted {
                cursor.fill().await?;
            }
            Ok::<_, anyhow::Error>(cursor.buffered.pop_front().map(|block| (block, cursor)))
        })
        .boxed()
    }

    async fn update_fields(
        &self,
        id: Uuid,
        owner_user_id: &str,
        update: &LifeBlockUpdate,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE life_blocks SET updated_at = MAX(updated_at, ");
        qb.push_bind(ts(now)).push(")");

        if let Some(name) = &update.name {
            qb.push(", name = ").push_bind(name.clone());
        }
        if let Some(description) = &update.description {
            qb.push(", description = ").push_bind(description.clone());
        }
        if let Some(color) = &update.color {
            qb.push(", color = ").push_bind(color.clone());
        }
        if let Some(icon) = &update.icon {
            qb.push(", icon = ").push_bind(icon.clone());
        }
        if let Some(content_types) = &update.content_types {
            qb.push(", content_types = ")
                .push_bind(serde_json::to_string(content_types)?);
        }

        qb.push(" WHERE id = ")
            .push_bind(uuid_to_blob(id))
            .push(" AND owner_id = ")
            .push_bind(owner_user_id.to_string());

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid, owner_user_id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM life_blocks WHERE id = ? AND owner_id = ?")
            .bind(uuid_to_blob(id))
            .bind(owner_user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn push_content(&self, id: Uuid, owner_user_id: &str, content: &Content) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE life_blocks \
             SET contents = json_insert(contents, '$[#]', json(?1)), \
                 updated_at = MAX(updated_at, ?2) \
             WHERE id = ?3 AND owner_id = ?4",
        )
        .bind(serde_json::to_string(content)?)
        .bind(ts(content.updated_at))
        .bind(uuid_to_blob(id))
        .bind(owner_user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_content_data(
        &self,
        id: Uuid,
        owner_user_id: &str,
        content_id: &str,
        data: &ContentData,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        // The EXISTS guard makes "entry missing" a non-match, leaving updated_at alone.
        let result = sqlx::query(
            "UPDATE life_blocks \
             SET contents = ( \
                     SELECT json_group_array(json( \
                         CASE WHEN json_extract(value, '$.id') = ?1 \
                              THEN json_set(value, '$.data', json(?2), '$.updatedAt', ?3) \
                              ELSE value END) ORDER BY key) \
                     FROM json_each(life_blocks.contents) \
                 ), \
                 updated_at = MAX(updated_at, ?3) \
             WHERE id = ?4 AND owner_id = ?5 \
               AND EXISTS (SELECT 1 FROM json_each(life_blocks.contents) WHERE json_extract(value, '$.id') = ?1)",
        )
        .bind(content_id)
        .bind(serde_json::to_string(data)?)
        .bind(ts(now))
        .bind(uuid_to_blob(id))
        .bind(owner_user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn pull_content(
        &self,
        id: Uuid,
        owner_user_id: &str,
        content_id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE life_blocks \
             SET contents = ( \
                     SELECT json_group_array(json(value) ORDER BY key) \
                     FROM json_each(life_blocks.contents) \
                     WHERE json_extract(value, '$.id') IS NOT ?1 \
                 ), \
                 updated_at = MAX(updated_at, ?2) \
             WHERE id = ?3 AND owner_id = ?4",
        )
        .bind(content_id)
        .bind(ts(now))
        .bind(uuid_to_blob(id))
        .bind(owner_user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;
    use lb_core::models::{ContentUpdate, LifeBlockPatch, NewContent, NewLifeBlock};
    use lb_core::{AppError, ContentStore, MutationGateway};
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;

    async fn engine() -> (ContentStore, MutationGateway) {
        let repo = Arc::new(SqliteLifeBlockRepo::new("sqlite::memory:").await.unwrap());
        (ContentStore::new(repo.clone()), MutationGateway::new(repo))
    }

    fn recipes() -> NewLifeBlock {
        serde_json::from_value(json!({
            "name": "Recipes",
            "contentTypes": [{"name": "Recipe", "fields": [{"name": "Title", "type": "text"}]}]
        }))
        .unwrap()
    }

    fn data(value: serde_json::Value) -> ContentData {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_recipe_lifecycle() {
        let (store, gateway) = engine().await;

        let block = gateway.create_life_block("U", recipes()).await.unwrap();
        assert_eq!(block.content_types.len(), 1);
        assert!(!block.content_types[0].id.is_empty());
        assert!(!block.content_types[0].fields[0].id.is_empty());
        assert!(block.contents.is_empty());
        let type_id = block.content_types[0].id.clone();

        let block = gateway
            .add_content(
                block.id,
                "U",
                NewContent {
                    content_type_id: type_id.clone(),
                    data: data(json!({"Title": "Pancakes"})),
                },
            )
            .await
            .unwrap();
        assert_eq!(block.contents.len(), 1);
        assert_eq!(block.contents[0].content_type_id, type_id);
        assert_eq!(block.contents[0].data["Title"], "Pancakes");
        let content_id = block.contents[0].id.clone();
        assert!(matches!(store.get(block.id, "V").await, Err(AppError::NotFound(..))));

        let entry = store.get_content(block.id, "U", &content_id).await.unwrap();
        assert_eq!(entry.id, content_id);
        assert_eq!(entry.content_type_id, type_id);
        assert_eq!(entry.data, data(json!({"Title": "Pancakes"})));
        assert!(matches!(
            store.get_content(block.id, "V", &content_id).await,
            Err(AppError::NotFound(..))
        ));

        let block = gateway
            .update_content(
                block.id,
                "U",
                &content_id,
                ContentUpdate {
                    data: data(json!({"Title": "Waffles"})),
                },
            )
            .await
            .unwrap();
        assert_eq!(block.contents[0].data["Title"], "Waffles");
        assert_eq!(block.contents[0].id, content_id);

        let block = gateway.remove_content(block.id, "U", &content_id).await.unwrap();
        assert!(block.contents.is_empty());
        assert!(matches!(
            store.get_content(block.id, "U", &content_id).await,
            Err(AppError::NotFound(..))
        ));
        assert!(matches!(store.get(block.id, "V").await, Err(AppError::NotFound(..))));
    }

    #[tokio::test]
    async fn test_out_of_range_timestamp_leaves_listing_intact() {
        let (store, gateway) = engine().await;
        gateway.create_life_block("U", recipes()).await.unwrap();

        let far_future: NewLifeBlock =
            serde_json::from_value(json!({"name": "x", "createdAt": "+10000-01-01T00:00:00Z"})).unwrap();
        let err = gateway.create_life_block("U", far_future).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let listed: Vec<LifeBlock> = store.list("U").try_collect().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Recipes");
    }

    #[tokio::test]
    async fn test_update_preserves_position_and_order() {
        let (_, gateway) = engine().await;
        let block = gateway.create_life_block("U", recipes()).await.unwrap();

        let mut ids = Vec::new();
        for title in ["a", "b", "c"] {
            let b = gateway
                .add_content(
                    block.id,
                    "U",
                    NewContent {
                        content_type_id: "dangling".into(),
                        data: data(json!({ "Title": title })),
                    },
                )
                .await
                .unwrap();
            ids.push(b.contents.last().unwrap().id.clone());
        }

        let b = gateway
            .update_content(block.id, "U", &ids[1], ContentUpdate { data: data(json!({"Title": "B"})) })
            .await
            .unwrap();
        let titles: Vec<_> = b.contents.iter().map(|c| c.data["Title"].as_str().unwrap()).collect();
        assert_eq!(titles, ["a", "B", "c"]);
        assert!(b.contents[1].updated_at >= b.contents[1].created_at);

        let b = gateway.remove_content(block.id, "U", &ids[0]).await.unwrap();
        let remaining: Vec<_> = b.contents.iter().map(|c| c.id.clone()).collect();
        assert_eq!(remaining, [ids[1].clone(), ids[2].clone()]);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let (store, gateway) = engine().await;
        let block = gateway.create_life_block("U", recipes()).await.unwrap();

        let adds = (0..10).map(|i| {
            let gateway = gateway.clone();
            async move {
                let payload = NewContent {
                    content_type_id: String::new(),
                    data: data(json!({ "n": i })),
                };
                gateway.add_content(block.id, "U", payload).await
            }
        });
        let results = futures_util::future::join_all(adds).await;
        assert!(results.iter().all(|r| r.is_ok()));

        let stored = store.get(block.id, "U").await.unwrap();
        let ids: HashSet<_> = stored.contents.iter().map(|c| c.id.clone()).collect();
        assert_eq!(stored.contents.len(), 10);
        assert_eq!(ids.len(), 10);
    }

    #[tokio::test]
    async fn test_updated_at_is_monotonic_and_untouched_by_failures() {
        let (store, gateway) = engine().await;
        let block = gateway.create_life_block("U", recipes()).await.unwrap();
        let before = block.updated_at;

        assert!(gateway
            .update_content(block.id, "U", "missing", ContentUpdate::default())
            .await
            .is_err());
        assert!(gateway.add_content(block.id, "V", NewContent::default()).await.is_err());
        assert_eq!(store.get(block.id, "U").await.unwrap().updated_at, before);

        let after = gateway
            .add_content(block.id, "U", NewContent::default())
            .await
            .unwrap()
            .updated_at;
        assert!(after >= before);

        // A clock running behind does not move updated_at backwards.
        let repo = SqliteLifeBlockRepo::new("sqlite::memory:").await.unwrap();
        let gateway = MutationGateway::new(Arc::new(repo));
        let mut future = recipes();
        future.updated_at = Some(Utc::now() + chrono::Duration::days(1));
        let block = gateway.create_life_block("U", future).await.unwrap();
        let bumped = gateway
            .update_life_block(block.id, "U", LifeBlockPatch { name: Some("Later".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(bumped.name, "Later");
        assert_eq!(bumped.updated_at, block.updated_at);
    }

    #[tokio::test]
    async fn test_ownership_isolation_and_delete() {
        let (store, gateway) = engine().await;
        let a = gateway.create_life_block("A", recipes()).await.unwrap();
        gateway.create_life_block("B", NewLifeBlock::named("Books")).await.unwrap();

        assert!(matches!(store.get(a.id, "B").await, Err(AppError::NotFound(..))));
        assert!(matches!(
            gateway.update_life_block(a.id, "B", LifeBlockPatch::default()).await,
            Err(AppError::NotFound(..))
        ));
        assert!(matches!(gateway.remove_content(a.id, "B", "x").await, Err(AppError::NotFound(..))));
        assert!(matches!(gateway.delete_life_block(a.id, "B").await, Err(AppError::NotFound(..))));

        let listed: Vec<LifeBlock> = store.list("B").try_collect().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Books");

        gateway.delete_life_block(a.id, "A").await.unwrap();
        assert!(matches!(gateway.delete_life_block(a.id, "A").await, Err(AppError::NotFound(..))));
        assert!(matches!(store.get(a.id, "A").await, Err(AppError::NotFound(..))));
    }

    #[tokio::test]
    async fn test_list_streams_in_insertion_order_across_pages() {
        let (store, gateway) = engine().await;
        let total = PAGE_SIZE as usize + 3;
        for i in 0..total {
            gateway
                .create_life_block("U", NewLifeBlock::named(format!("block {i}")))
                .await
                .unwrap();
        }

        let names: Vec<String> = store.list("U").map_ok(|b| b.name).try_collect().await.unwrap();
        assert_eq!(names.len(), total);
        assert_eq!(names[0], "block 0");
        assert_eq!(names[total - 1], format!("block {}", total - 1));
        assert!(store.list("nobody").try_collect::<Vec<_>>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_patch_replaces_schema_and_keeps_contents() {
        let (_, gateway) = engine().await;
        let block = gateway.create_life_block("U", recipes()).await.unwrap();
        let block = gateway
            .add_content(block.id, "U", NewContent { content_type_id: block.content_types[0].id.clone(), data: data(json!({"Title": "x"})) })
            .await
            .unwrap();

        let patch: LifeBlockPatch = serde_json::from_value(json!({
            "description": "Family favourites",
            "contentTypes": [{"id": "kept", "name": "Dish", "fields": [{"name": "Rating", "type": "number"}]}]
        }))
        .unwrap();
        let updated = gateway.update_life_block(block.id, "U", patch).await.unwrap();

        assert_eq!(updated.name, "Recipes");
        assert_eq!(updated.description, "Family favourites");
        assert_eq!(updated.content_types.len(), 1);
        assert_eq!(updated.content_types[0].id, "kept");
        assert!(!updated.content_types[0].fields[0].id.is_empty());
        assert_eq!(updated.contents, block.contents);
        assert_eq!(updated.created_at, block.created_at);
    }
}
