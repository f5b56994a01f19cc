use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument};

use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::models::Store;

fn store_name_taken(conn: &Connection, name: &str, exclude_id: Option<i64>) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT EXISTS (SELECT 1 FROM store WHERE name = ?1 AND id != COALESCE(?2, -1))",
    )?;
    Ok(stmt.query_row(params![name, exclude_id], |row| row.get(0))?)
}

/// Adds a new store. The name must be non-empty and unique
/// (case-insensitive).
#[instrument(skip(pool, description))]
pub async fn add_store(pool: &DbPool, name: &str, description: Option<&str>) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Store name cannot be empty.".to_string()));
    }

    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    if store_name_taken(&conn, name, None)? {
        return Err(Error::DuplicateName {
            entity: "Store",
            name: name.to_string(),
        });
    }

    let mut stmt = conn.prepare_cached("INSERT INTO store (name, description) VALUES (?1, ?2)")?;
    let store_id = stmt.insert(params![name, description])?;
    info!("Added new store '{}' (ID: {})", name, store_id);
    Ok(store_id)
}

/// Fetches a store by ID, failing with `Error::NotFound` if absent.
#[instrument(skip(pool))]
pub async fn get_store(pool: &DbPool, id: i64) -> Result<Store> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached("SELECT id, name, description FROM store WHERE id = ?1")?;
    stmt.query_row(params![id], |row| {
        Ok(Store {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
        })
    })
    .optional()?
    .ok_or(Error::NotFound {
        entity: "Store",
        id,
    })
}

/// Lists stores ordered by name, with optional name-prefix filter and
/// offset/limit pagination.
#[instrument(skip(pool))]
pub async fn list_stores(
    pool: &DbPool,
    name_prefix: Option<&str>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Store>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let pattern = format!("{}%", name_prefix.unwrap_or(""));
    let mut stmt = conn.prepare_cached(
        "SELECT id, name, description FROM store
         WHERE name LIKE ?1
         ORDER BY name ASC
         LIMIT ?2 OFFSET ?3",
    )?;
    let rows = stmt.query_map(params![pattern, limit, offset], |row| {
        Ok(Store {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
        })
    })?;

    let mut stores = Vec::new();
    for row in rows {
        stores.push(row.map_err(|e| Error::Database(format!("Failed to map store row: {}", e)))?);
    }
    debug!("Fetched {} stores.", stores.len());
    Ok(stores)
}

/// Updates a store; only provided fields change.
#[instrument(skip(pool, description))]
pub async fn update_store(
    pool: &DbPool,
    id: i64,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<Store> {
    {
        let conn = pool
            .lock()
            .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;

        let exists: bool = conn
            .prepare_cached("SELECT EXISTS (SELECT 1 FROM store WHERE id = ?1)")?
            .query_row(params![id], |row| row.get(0))?;
        if !exists {
            return Err(Error::NotFound {
                entity: "Store",
                id,
            });
        }

        if let Some(new_name) = name {
            let new_name = new_name.trim();
            if new_name.is_empty() {
                return Err(Error::Validation("Store name cannot be empty.".to_string()));
            }
            if store_name_taken(&conn, new_name, Some(id))? {
                return Err(Error::DuplicateName {
                    entity: "Store",
                    name: new_name.to_string(),
                });
            }
            conn.execute("UPDATE store SET name = ?1 WHERE id = ?2", params![new_name, id])?;
        }
        if let Some(desc) = description {
            conn.execute(
                "UPDATE store SET description = ?1 WHERE id = ?2",
                params![desc, id],
            )?;
        }
        info!("Updated store ID {}", id);
    }
    get_store(pool, id).await
}

/// Deletes a store unless any purchase still references it (block, not
/// cascade).
#[instrument(skip(pool))]
pub async fn delete_store(pool: &DbPool, id: i64) -> Result<()> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;

    let exists: bool = conn
        .prepare_cached("SELECT EXISTS (SELECT 1 FROM store WHERE id = ?1)")?
        .query_row(params![id], |row| row.get(0))?;
    if !exists {
        return Err(Error::NotFound {
            entity: "Store",
            id,
        });
    }

    let dependents: i64 = conn
        .prepare_cached("SELECT COUNT(*) FROM purchase WHERE store_id = ?1")?
        .query_row(params![id], |row| row.get(0))?;
    if dependents > 0 {
        return Err(Error::ReferencedEntity {
            entity: "Store",
            id,
            dependents: "purchases",
            count: dependents,
        });
    }

    conn.execute("DELETE FROM store WHERE id = ?1", params![id])?;
    info!("Deleted store ID {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{init_test_tracing, seed_reference_fixture, setup_test_db};

    #[tokio::test]
    async fn test_add_and_get_store_round_trip() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let id = add_store(&pool, "Corner Shop", Some("around the block")).await?;
        let fetched = get_store(&pool, id).await?;
        assert_eq!(fetched.name, "Corner Shop");
        assert_eq!(fetched.description.as_deref(), Some("around the block"));
        Ok(())
    }

    #[tokio::test]
    async fn test_store_names_unique_case_insensitively() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        add_store(&pool, "Corner Shop", None).await?;
        let err = add_store(&pool, "corner shop", None).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateName { entity: "Store", .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_store_blocked_while_referenced() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;
        let fixture = seed_reference_fixture(&pool)?;

        {
            let conn = pool.lock().unwrap();
            conn.execute(
                "INSERT INTO purchase (purchase_date, product_id, store_id, quantity, total_price)
                 VALUES ('2025-01-15', ?1, ?2, 1.0, 2.5)",
                params![fixture.product_id, fixture.store_id],
            )?;
        }

        let err = delete_store(&pool, fixture.store_id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ReferencedEntity { entity: "Store", dependents: "purchases", .. }
        ));

        let free_store = add_store(&pool, "Other Shop", None).await?;
        delete_store(&pool, free_store).await?;
        Ok(())
    }
}
