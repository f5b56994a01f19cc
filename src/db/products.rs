use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument};

use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::models::Product;

const PRODUCT_SELECT: &str = "SELECT p.id, p.name, p.category_id, p.unit_id,
            c.name AS category_name, u.name AS unit_name
     FROM product p
     JOIN category c ON p.category_id = c.id
     JOIN unit u ON p.unit_id = u.id";

fn product_name_taken(conn: &Connection, name: &str, exclude_id: Option<i64>) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT EXISTS (SELECT 1 FROM product WHERE name = ?1 AND id != COALESCE(?2, -1))",
    )?;
    Ok(stmt.query_row(params![name, exclude_id], |row| row.get(0))?)
}

// Foreign-key targets are checked up front so the caller gets a typed
// `InvalidReference` instead of a raw constraint failure.
fn ensure_category_exists(conn: &Connection, id: i64) -> Result<()> {
    let exists: bool = conn
        .prepare_cached("SELECT EXISTS (SELECT 1 FROM category WHERE id = ?1)")?
        .query_row(params![id], |row| row.get(0))?;
    if exists {
        Ok(())
    } else {
        Err(Error::InvalidReference {
            entity: "Category",
            id,
        })
    }
}

fn ensure_unit_exists(conn: &Connection, id: i64) -> Result<()> {
    let exists: bool = conn
        .prepare_cached("SELECT EXISTS (SELECT 1 FROM unit WHERE id = ?1)")?
        .query_row(params![id], |row| row.get(0))?;
    if exists {
        Ok(())
    } else {
        Err(Error::InvalidReference {
            entity: "Unit",
            id,
        })
    }
}

fn map_product_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        category_id: row.get(2)?,
        unit_id: row.get(3)?,
        category_name: row.get(4)?,
        unit_name: row.get(5)?,
    })
}

/// Adds a new product.
///
/// Both `category_id` and `unit_id` must resolve to existing rows; the
/// product name must be non-empty and unique (case-insensitive).
///
/// # Parameters
///
/// * `pool`: The database connection pool.
/// * `name`: The unique name of the product.
/// * `category_id`: The category this product belongs to.
/// * `unit_id`: The unit its quantities are measured in.
///
/// # Returns
///
/// Returns `Ok(i64)` with the ID of the newly inserted product.
///
/// # Errors
///
/// Returns `Error::Validation` for an empty name, `Error::DuplicateName` on
/// a name collision and `Error::InvalidReference` if either foreign key does
/// not resolve.
#[instrument(skip(pool))]
pub async fn add_product(
    pool: &DbPool,
    name: &str,
    category_id: i64,
    unit_id: i64,
) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation(
            "Product name cannot be empty.".to_string(),
        ));
    }

    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    if product_name_taken(&conn, name, None)? {
        return Err(Error::DuplicateName {
            entity: "Product",
            name: name.to_string(),
        });
    }
    ensure_category_exists(&conn, category_id)?;
    ensure_unit_exists(&conn, unit_id)?;

    let mut stmt = conn
        .prepare_cached("INSERT INTO product (name, category_id, unit_id) VALUES (?1, ?2, ?3)")?;
    let product_id = stmt.insert(params![name, category_id, unit_id])?;
    info!(
        "Added new product '{}' (ID: {}) in category {} with unit {}",
        name, product_id, category_id, unit_id
    );
    Ok(product_id)
}

/// Fetches a product by ID with its category and unit names joined in.
#[instrument(skip(pool))]
pub async fn get_product(pool: &DbPool, id: i64) -> Result<Product> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(&format!("{} WHERE p.id = ?1", PRODUCT_SELECT))?;
    stmt.query_row(params![id], map_product_row)
        .optional()?
        .ok_or(Error::NotFound {
            entity: "Product",
            id,
        })
}

/// Lists products ordered by name, category and unit names included, with
/// optional name-prefix filter and offset/limit pagination.
#[instrument(skip(pool))]
pub async fn list_products(
    pool: &DbPool,
    name_prefix: Option<&str>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Product>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let pattern = format!("{}%", name_prefix.unwrap_or(""));
    let mut stmt = conn.prepare_cached(&format!(
        "{} WHERE p.name LIKE ?1 ORDER BY p.name ASC LIMIT ?2 OFFSET ?3",
        PRODUCT_SELECT
    ))?;
    let rows = stmt.query_map(params![pattern, limit, offset], map_product_row)?;

    let mut products = Vec::new();
    for row in rows {
        products
            .push(row.map_err(|e| Error::Database(format!("Failed to map product row: {}", e)))?);
    }
    debug!("Fetched {} products.", products.len());
    Ok(products)
}

/// Field changes for [`update_product`]; `None` leaves a field untouched.
#[derive(Debug, Default, Clone)]
pub struct ProductUpdate<'a> {
    pub name: Option<&'a str>,
    pub category_id: Option<i64>,
    pub unit_id: Option<i64>,
}

/// Updates a product, re-validating any changed foreign key.
///
/// # Errors
///
/// Same taxonomy as [`add_product`], plus `Error::NotFound` if the product
/// itself does not exist.
#[instrument(skip(pool))]
pub async fn update_product(pool: &DbPool, id: i64, changes: &ProductUpdate<'_>) -> Result<Product> {
    {
        let conn = pool
            .lock()
            .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;

        let exists: bool = conn
            .prepare_cached("SELECT EXISTS (SELECT 1 FROM product WHERE id = ?1)")?
            .query_row(params![id], |row| row.get(0))?;
        if !exists {
            return Err(Error::NotFound {
                entity: "Product",
                id,
            });
        }

        if let Some(new_name) = changes.name {
            let new_name = new_name.trim();
            if new_name.is_empty() {
                return Err(Error::Validation(
                    "Product name cannot be empty.".to_string(),
                ));
            }
            if product_name_taken(&conn, new_name, Some(id))? {
                return Err(Error::DuplicateName {
                    entity: "Product",
                    name: new_name.to_string(),
                });
            }
            conn.execute(
                "UPDATE product SET name = ?1 WHERE id = ?2",
                params![new_name, id],
            )?;
        }
        if let Some(category_id) = changes.category_id {
            ensure_category_exists(&conn, category_id)?;
            conn.execute(
                "UPDATE product SET category_id = ?1 WHERE id = ?2",
                params![category_id, id],
            )?;
        }
        if let Some(unit_id) = changes.unit_id {
            ensure_unit_exists(&conn, unit_id)?;
            conn.execute(
                "UPDATE product SET unit_id = ?1 WHERE id = ?2",
                params![unit_id, id],
            )?;
        }
        info!("Updated product ID {}", id);
    }
    get_product(pool, id).await
}

/// Deletes a product unless any purchase still references it (block, not
/// cascade).
#[instrument(skip(pool))]
pub async fn delete_product(pool: &DbPool, id: i64) -> Result<()> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;

    let exists: bool = conn
        .prepare_cached("SELECT EXISTS (SELECT 1 FROM product WHERE id = ?1)")?
        .query_row(params![id], |row| row.get(0))?;
    if !exists {
        return Err(Error::NotFound {
            entity: "Product",
            id,
        });
    }

    let dependents: i64 = conn
        .prepare_cached("SELECT COUNT(*) FROM purchase WHERE product_id = ?1")?
        .query_row(params![id], |row| row.get(0))?;
    if dependents > 0 {
        return Err(Error::ReferencedEntity {
            entity: "Product",
            id,
            dependents: "purchases",
            count: dependents,
        });
    }

    conn.execute("DELETE FROM product WHERE id = ?1", params![id])?;
    info!("Deleted product ID {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{
        direct_insert_category, direct_insert_unit, init_test_tracing, seed_reference_fixture,
        setup_test_db,
    };

    #[tokio::test]
    async fn test_add_and_get_product_with_joined_names() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let (category_id, unit_id);
        {
            let conn = pool.lock().unwrap();
            category_id = direct_insert_category(&conn, "Dairy", None)?;
            unit_id = direct_insert_unit(&conn, "l", "Volume")?;
        }

        let id = add_product(&pool, "Milk", category_id, unit_id).await?;
        let fetched = get_product(&pool, id).await?;
        assert_eq!(fetched.name, "Milk");
        assert_eq!(fetched.category_id, category_id);
        assert_eq!(fetched.unit_id, unit_id);
        assert_eq!(fetched.category_name.as_deref(), Some("Dairy"));
        assert_eq!(fetched.unit_name.as_deref(), Some("l"));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_product_rejects_missing_category() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let unit_id;
        {
            let conn = pool.lock().unwrap();
            unit_id = direct_insert_unit(&conn, "l", "Volume")?;
        }

        let err = add_product(&pool, "Milk", 999, unit_id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidReference { entity: "Category", id: 999 }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_product_rejects_missing_unit() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let category_id;
        {
            let conn = pool.lock().unwrap();
            category_id = direct_insert_category(&conn, "Dairy", None)?;
        }

        let err = add_product(&pool, "Milk", category_id, 999)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidReference { entity: "Unit", id: 999 }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_product_names_unique_case_insensitively() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;
        let fixture = seed_reference_fixture(&pool)?;

        let err = add_product(&pool, "MILK", fixture.category_id, fixture.unit_id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName { entity: "Product", .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_revalidates_references() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;
        let fixture = seed_reference_fixture(&pool)?;

        let err = update_product(
            &pool,
            fixture.product_id,
            &ProductUpdate {
                category_id: Some(999),
                ..ProductUpdate::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidReference { entity: "Category", .. }));

        let other_category;
        {
            let conn = pool.lock().unwrap();
            other_category = direct_insert_category(&conn, "Drinks", None)?;
        }
        let updated = update_product(
            &pool,
            fixture.product_id,
            &ProductUpdate {
                name: Some("Whole Milk"),
                category_id: Some(other_category),
                ..ProductUpdate::default()
            },
        )
        .await?;
        assert_eq!(updated.name, "Whole Milk");
        assert_eq!(updated.category_id, other_category);
        assert_eq!(updated.category_name.as_deref(), Some("Drinks"));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_product_blocked_while_referenced() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;
        let fixture = seed_reference_fixture(&pool)?;

        {
            let conn = pool.lock().unwrap();
            conn.execute(
                "INSERT INTO purchase (purchase_date, product_id, store_id, quantity, total_price)
                 VALUES ('2025-01-15', ?1, ?2, 2.0, 5.0)",
                params![fixture.product_id, fixture.store_id],
            )?;
        }

        let err = delete_product(&pool, fixture.product_id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ReferencedEntity { entity: "Product", dependents: "purchases", .. }
        ));

        // Removing the purchase unblocks the delete.
        {
            let conn = pool.lock().unwrap();
            conn.execute("DELETE FROM purchase", [])?;
        }
        delete_product(&pool, fixture.product_id).await?;
        Ok(())
    }
}
