//! Item metadata persistence

use crate::models::CatalogItem;
use anyhow::Result;
use sqlx::{Row, SqlitePool};

/// Save (or refresh) the latest metadata for an item
pub async fn save_item(pool: &SqlitePool, item: &CatalogItem) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO items (item_id, title, short_text, long_text, images, tags, genres, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(item_id) DO UPDATE SET
            title = excluded.title,
            short_text = excluded.short_text,
            long_text = excluded.long_text,
            images = excluded.images,
            tags = excluded.tags,
            genres = excluded.genres,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(item.id)
    .bind(&item.title)
    .bind(&item.short_text)
    .bind(&item.long_text)
    .bind(serde_json::to_string(&item.images)?)
    .bind(serde_json::to_string(&item.tags)?)
    .bind(serde_json::to_string(&item.genres)?)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load an item's latest metadata
pub async fn load_item(pool: &SqlitePool, item_id: i64) -> Result<Option<CatalogItem>> {
    let row = sqlx::query(
        "SELECT item_id, title, short_text, long_text, images, tags, genres
         FROM items WHERE item_id = ?",
    )
    .bind(item_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let images: String = row.get("images");
            let tags: String = row.get("tags");
            let genres: String = row.get("genres");

            Ok(Some(CatalogItem {
                id: row.get("item_id"),
                title: row.get("title"),
                short_text: row.get("short_text"),
                long_text: row.get("long_text"),
                images: serde_json::from_str(&images)?,
                tags: serde_json::from_str(&tags)?,
                genres: serde_json::from_str(&genres)?,
            }))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn test_item() -> CatalogItem {
        let mut tags = BTreeMap::new();
        tags.insert("Roguelike".to_string(), 120.0);
        CatalogItem {
            id: 620,
            title: "Hollow Depths".to_string(),
            short_text: "A dark descent.".to_string(),
            long_text: "Long description.".to_string(),
            images: vec!["cover.jpg".to_string(), "s1.jpg".to_string()],
            tags,
            genres: vec!["Action".to_string()],
        }
    }

    #[tokio::test]
    async fn test_save_and_load_item() {
        let pool = crate::db::test_pool().await;
        let item = test_item();

        save_item(&pool, &item).await.expect("save failed");
        let loaded = load_item(&pool, 620).await.unwrap().expect("item missing");

        assert_eq!(loaded.title, "Hollow Depths");
        assert_eq!(loaded.images, item.images);
        assert_eq!(loaded.tags.get("Roguelike"), Some(&120.0));
    }

    #[tokio::test]
    async fn test_refresh_replaces_row() {
        let pool = crate::db::test_pool().await;
        let mut item = test_item();

        save_item(&pool, &item).await.unwrap();
        item.title = "Hollow Depths: Definitive Edition".to_string();
        item.images = vec!["new_cover.jpg".to_string()];
        save_item(&pool, &item).await.unwrap();

        let loaded = load_item(&pool, 620).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Hollow Depths: Definitive Edition");
        assert_eq!(loaded.images, vec!["new_cover.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_item_is_none() {
        let pool = crate::db::test_pool().await;
        assert!(load_item(&pool, 999).await.unwrap().is_none());
    }
}
