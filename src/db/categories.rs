use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument};

use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::models::Category;

// Case-insensitive duplicate check; the `name` column is COLLATE NOCASE so
// plain equality already ignores case. `exclude_id` skips the row being
// updated.
fn category_name_taken(conn: &Connection, name: &str, exclude_id: Option<i64>) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT EXISTS (SELECT 1 FROM category WHERE name = ?1 AND id != COALESCE(?2, -1))",
    )?;
    Ok(stmt.query_row(params![name, exclude_id], |row| row.get(0))?)
}

/// Adds a new category to the database.
///
/// The category name must be non-empty and unique (case-insensitive);
/// surrounding whitespace is trimmed before storing.
///
/// # Parameters
///
/// * `pool`: The database connection pool.
/// * `name`: The unique name of the category.
/// * `description`: An optional description.
///
/// # Returns
///
/// Returns `Ok(i64)` with the ID of the newly inserted category.
///
/// # Errors
///
/// Returns `Error::Validation` if the name is empty and
/// `Error::DuplicateName` if another category already uses the name.
#[instrument(skip(pool, description))]
pub async fn add_category(pool: &DbPool, name: &str, description: Option<&str>) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation(
            "Category name cannot be empty.".to_string(),
        ));
    }

    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    if category_name_taken(&conn, name, None)? {
        return Err(Error::DuplicateName {
            entity: "Category",
            name: name.to_string(),
        });
    }

    let mut stmt =
        conn.prepare_cached("INSERT INTO category (name, description) VALUES (?1, ?2)")?;
    let category_id = stmt.insert(params![name, description])?;
    info!("Added new category '{}' (ID: {})", name, category_id);
    Ok(category_id)
}

/// Fetches a category by ID, failing with `Error::NotFound` if absent.
#[instrument(skip(pool))]
pub async fn get_category(pool: &DbPool, id: i64) -> Result<Category> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached("SELECT id, name, description FROM category WHERE id = ?1")?;
    stmt.query_row(params![id], |row| {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
        })
    })
    .optional()?
    .ok_or(Error::NotFound {
        entity: "Category",
        id,
    })
}

/// Lists categories ordered by name, with optional case-insensitive
/// name-prefix filtering and offset/limit pagination.
///
/// Repeated calls without intervening writes return identical sequences. A
/// negative `limit` means "no limit" (SQLite semantics).
#[instrument(skip(pool))]
pub async fn list_categories(
    pool: &DbPool,
    name_prefix: Option<&str>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Category>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let pattern = format!("{}%", name_prefix.unwrap_or(""));
    let mut stmt = conn.prepare_cached(
        "SELECT id, name, description FROM category
         WHERE name LIKE ?1
         ORDER BY name ASC
         LIMIT ?2 OFFSET ?3",
    )?;
    let rows = stmt.query_map(params![pattern, limit, offset], |row| {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
        })
    })?;

    let mut categories = Vec::new();
    for row in rows {
        categories.push(row.map_err(|e| Error::Database(format!("Failed to map category row: {}", e)))?);
    }
    debug!("Fetched {} categories.", categories.len());
    Ok(categories)
}

/// Updates a category. Only provided fields change; `None` leaves the stored
/// value untouched.
///
/// # Errors
///
/// Returns `Error::NotFound` if the ID does not resolve, `Error::Validation`
/// for an empty replacement name and `Error::DuplicateName` if the new name
/// collides (case-insensitive) with another category.
#[instrument(skip(pool, description))]
pub async fn update_category(
    pool: &DbPool,
    id: i64,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<Category> {
    {
        let conn = pool
            .lock()
            .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;

        let exists: bool = conn
            .prepare_cached("SELECT EXISTS (SELECT 1 FROM category WHERE id = ?1)")?
            .query_row(params![id], |row| row.get(0))?;
        if !exists {
            return Err(Error::NotFound {
                entity: "Category",
                id,
            });
        }

        if let Some(new_name) = name {
            let new_name = new_name.trim();
            if new_name.is_empty() {
                return Err(Error::Validation(
                    "Category name cannot be empty.".to_string(),
                ));
            }
            if category_name_taken(&conn, new_name, Some(id))? {
                return Err(Error::DuplicateName {
                    entity: "Category",
                    name: new_name.to_string(),
                });
            }
            conn.execute(
                "UPDATE category SET name = ?1 WHERE id = ?2",
                params![new_name, id],
            )?;
        }
        if let Some(desc) = description {
            conn.execute(
                "UPDATE category SET description = ?1 WHERE id = ?2",
                params![desc, id],
            )?;
        }
        info!("Updated category ID {}", id);
    }
    get_category(pool, id).await
}

/// Deletes a category. Deletion is blocked, not cascaded: a category still
/// referenced by any product cannot be removed.
///
/// # Errors
///
/// Returns `Error::NotFound` if the ID does not resolve and
/// `Error::ReferencedEntity` if dependent products exist.
#[instrument(skip(pool))]
pub async fn delete_category(pool: &DbPool, id: i64) -> Result<()> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;

    let exists: bool = conn
        .prepare_cached("SELECT EXISTS (SELECT 1 FROM category WHERE id = ?1)")?
        .query_row(params![id], |row| row.get(0))?;
    if !exists {
        return Err(Error::NotFound {
            entity: "Category",
            id,
        });
    }

    let dependents: i64 = conn
        .prepare_cached("SELECT COUNT(*) FROM product WHERE category_id = ?1")?
        .query_row(params![id], |row| row.get(0))?;
    if dependents > 0 {
        return Err(Error::ReferencedEntity {
            entity: "Category",
            id,
            dependents: "products",
            count: dependents,
        });
    }

    conn.execute("DELETE FROM category WHERE id = ?1", params![id])?;
    info!("Deleted category ID {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{
        direct_insert_category, direct_insert_product, direct_insert_unit, init_test_tracing,
        setup_test_db,
    };

    #[tokio::test]
    async fn test_add_and_get_category_round_trip() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let id = add_category(&pool, "Dairy", Some("Milk, cheese, yogurt")).await?;
        assert!(id > 0);

        let fetched = get_category(&pool, id).await?;
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.name, "Dairy");
        assert_eq!(fetched.description.as_deref(), Some("Milk, cheese, yogurt"));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_category_rejects_duplicates_case_insensitively() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        add_category(&pool, "Dairy", None).await?;
        let err = add_category(&pool, "dairy", None).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateName { entity: "Category", .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_category_rejects_empty_name() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let err = add_category(&pool, "   ", None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_category_not_found() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let err = get_category(&pool, 4242).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "Category", id: 4242 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_categories_ordered_by_name_and_idempotent() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        add_category(&pool, "Snacks", None).await?;
        add_category(&pool, "Dairy", None).await?;
        add_category(&pool, "Household", None).await?;

        let first = list_categories(&pool, None, 0, 100).await?;
        let names: Vec<_> = first.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Dairy", "Household", "Snacks"]);

        // Idempotent read: same sequence without intervening writes.
        let second = list_categories(&pool, None, 0, 100).await?;
        let ids_first: Vec<_> = first.iter().map(|c| c.id).collect();
        let ids_second: Vec<_> = second.iter().map(|c| c.id).collect();
        assert_eq!(ids_first, ids_second);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_categories_prefix_filter_and_pagination() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        add_category(&pool, "Dairy", None).await?;
        add_category(&pool, "Drinks", None).await?;
        add_category(&pool, "Household", None).await?;

        let d_only = list_categories(&pool, Some("d"), 0, 100).await?;
        let names: Vec<_> = d_only.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Dairy", "Drinks"]);

        let page = list_categories(&pool, None, 1, 1).await?;
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "Drinks");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_category_partial_fields() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let id = add_category(&pool, "Daiyr", Some("typo")).await?;
        let updated = update_category(&pool, id, Some("Dairy"), None).await?;
        assert_eq!(updated.name, "Dairy");
        assert_eq!(updated.description.as_deref(), Some("typo"));

        let updated = update_category(&pool, id, None, Some("fixed")).await?;
        assert_eq!(updated.name, "Dairy");
        assert_eq!(updated.description.as_deref(), Some("fixed"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_category_duplicate_name_blocked() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        add_category(&pool, "Dairy", None).await?;
        let other = add_category(&pool, "Drinks", None).await?;

        let err = update_category(&pool, other, Some("DAIRY"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName { .. }));

        // Renaming to the same name (different case) is allowed.
        let renamed = update_category(&pool, other, Some("drinks"), None).await?;
        assert_eq!(renamed.name, "drinks");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_category_blocked_while_referenced() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let (category_id, product_id);
        {
            let conn = pool.lock().unwrap();
            category_id = direct_insert_category(&conn, "Dairy", None)?;
            let unit_id = direct_insert_unit(&conn, "l", "Volume")?;
            product_id = direct_insert_product(&conn, "Milk", category_id, unit_id)?;
        }

        let err = delete_category(&pool, category_id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ReferencedEntity { entity: "Category", count: 1, .. }
        ));

        // After the dependent product is gone the delete succeeds.
        {
            let conn = pool.lock().unwrap();
            conn.execute("DELETE FROM product WHERE id = ?1", params![product_id])?;
        }
        delete_category(&pool, category_id).await?;
        let err = get_category(&pool, category_id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_missing_category_not_found() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let err = delete_category(&pool, 7).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        Ok(())
    }
}
