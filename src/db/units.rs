use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument};

use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::models::Unit;

fn unit_name_taken(conn: &Connection, name: &str, exclude_id: Option<i64>) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT EXISTS (SELECT 1 FROM unit WHERE name = ?1 AND id != COALESCE(?2, -1))",
    )?;
    Ok(stmt.query_row(params![name, exclude_id], |row| row.get(0))?)
}

/// Adds a new measurement unit.
///
/// `name` is the unit symbol ("kg", "l", "pcs"), unique case-insensitively;
/// `measure_type` is the human label for what it measures ("Weight",
/// "Volume"). Both must be non-empty.
///
/// # Errors
///
/// Returns `Error::Validation` for empty fields and `Error::DuplicateName`
/// on a name collision.
#[instrument(skip(pool))]
pub async fn add_unit(pool: &DbPool, name: &str, measure_type: &str) -> Result<i64> {
    let name = name.trim();
    let measure_type = measure_type.trim();
    if name.is_empty() {
        return Err(Error::Validation("Unit name cannot be empty.".to_string()));
    }
    if measure_type.is_empty() {
        return Err(Error::Validation(
            "Unit measure type cannot be empty.".to_string(),
        ));
    }

    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    if unit_name_taken(&conn, name, None)? {
        return Err(Error::DuplicateName {
            entity: "Unit",
            name: name.to_string(),
        });
    }

    let mut stmt = conn.prepare_cached("INSERT INTO unit (name, measure_type) VALUES (?1, ?2)")?;
    let unit_id = stmt.insert(params![name, measure_type])?;
    info!(
        "Added new unit '{}' (ID: {}) with measure type '{}'",
        name, unit_id, measure_type
    );
    Ok(unit_id)
}

/// Fetches a unit by ID, failing with `Error::NotFound` if absent.
#[instrument(skip(pool))]
pub async fn get_unit(pool: &DbPool, id: i64) -> Result<Unit> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached("SELECT id, name, measure_type FROM unit WHERE id = ?1")?;
    stmt.query_row(params![id], |row| {
        Ok(Unit {
            id: row.get(0)?,
            name: row.get(1)?,
            measure_type: row.get(2)?,
        })
    })
    .optional()?
    .ok_or(Error::NotFound { entity: "Unit", id })
}

/// Lists units ordered by name, with optional name-prefix filter and
/// offset/limit pagination.
#[instrument(skip(pool))]
pub async fn list_units(
    pool: &DbPool,
    name_prefix: Option<&str>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Unit>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let pattern = format!("{}%", name_prefix.unwrap_or(""));
    let mut stmt = conn.prepare_cached(
        "SELECT id, name, measure_type FROM unit
         WHERE name LIKE ?1
         ORDER BY name ASC
         LIMIT ?2 OFFSET ?3",
    )?;
    let rows = stmt.query_map(params![pattern, limit, offset], |row| {
        Ok(Unit {
            id: row.get(0)?,
            name: row.get(1)?,
            measure_type: row.get(2)?,
        })
    })?;

    let mut units = Vec::new();
    for row in rows {
        units.push(row.map_err(|e| Error::Database(format!("Failed to map unit row: {}", e)))?);
    }
    debug!("Fetched {} units.", units.len());
    Ok(units)
}

/// Updates a unit; only provided fields change.
#[instrument(skip(pool))]
pub async fn update_unit(
    pool: &DbPool,
    id: i64,
    name: Option<&str>,
    measure_type: Option<&str>,
) -> Result<Unit> {
    {
        let conn = pool
            .lock()
            .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;

        let exists: bool = conn
            .prepare_cached("SELECT EXISTS (SELECT 1 FROM unit WHERE id = ?1)")?
            .query_row(params![id], |row| row.get(0))?;
        if !exists {
            return Err(Error::NotFound { entity: "Unit", id });
        }

        if let Some(new_name) = name {
            let new_name = new_name.trim();
            if new_name.is_empty() {
                return Err(Error::Validation("Unit name cannot be empty.".to_string()));
            }
            if unit_name_taken(&conn, new_name, Some(id))? {
                return Err(Error::DuplicateName {
                    entity: "Unit",
                    name: new_name.to_string(),
                });
            }
            conn.execute("UPDATE unit SET name = ?1 WHERE id = ?2", params![new_name, id])?;
        }
        if let Some(mt) = measure_type {
            let mt = mt.trim();
            if mt.is_empty() {
                return Err(Error::Validation(
                    "Unit measure type cannot be empty.".to_string(),
                ));
            }
            conn.execute(
                "UPDATE unit SET measure_type = ?1 WHERE id = ?2",
                params![mt, id],
            )?;
        }
        info!("Updated unit ID {}", id);
    }
    get_unit(pool, id).await
}

/// Deletes a unit unless any product still references it (block, not
/// cascade).
#[instrument(skip(pool))]
pub async fn delete_unit(pool: &DbPool, id: i64) -> Result<()> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;

    let exists: bool = conn
        .prepare_cached("SELECT EXISTS (SELECT 1 FROM unit WHERE id = ?1)")?
        .query_row(params![id], |row| row.get(0))?;
    if !exists {
        return Err(Error::NotFound { entity: "Unit", id });
    }

    let dependents: i64 = conn
        .prepare_cached("SELECT COUNT(*) FROM product WHERE unit_id = ?1")?
        .query_row(params![id], |row| row.get(0))?;
    if dependents > 0 {
        return Err(Error::ReferencedEntity {
            entity: "Unit",
            id,
            dependents: "products",
            count: dependents,
        });
    }

    conn.execute("DELETE FROM unit WHERE id = ?1", params![id])?;
    info!("Deleted unit ID {}", id);
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
    async fn test_add_and_get_unit_round_trip() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let id = add_unit(&pool, "kg", "Weight").await?;
        let fetched = get_unit(&pool, id).await?;
        assert_eq!(fetched.name, "kg");
        assert_eq!(fetched.measure_type, "Weight");
        Ok(())
    }

    #[tokio::test]
    async fn test_add_unit_validates_fields() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        assert!(matches!(
            add_unit(&pool, "", "Weight").await.unwrap_err(),
            Error::Validation(_)
        ));
        assert!(matches!(
            add_unit(&pool, "kg", " ").await.unwrap_err(),
            Error::Validation(_)
        ));

        add_unit(&pool, "kg", "Weight").await?;
        assert!(matches!(
            add_unit(&pool, "KG", "Weight").await.unwrap_err(),
            Error::DuplicateName { entity: "Unit", .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_units_ordered_by_name() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        add_unit(&pool, "pcs", "Count").await?;
        add_unit(&pool, "kg", "Weight").await?;
        add_unit(&pool, "l", "Volume").await?;

        let units = list_units(&pool, None, 0, 100).await?;
        let names: Vec<_> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["kg", "l", "pcs"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_unit_measure_type_only() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let id = add_unit(&pool, "kg", "Mass").await?;
        let updated = update_unit(&pool, id, None, Some("Weight")).await?;
        assert_eq!(updated.name, "kg");
        assert_eq!(updated.measure_type, "Weight");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_unit_blocked_while_referenced() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let unit_id;
        {
            let conn = pool.lock().unwrap();
            let category_id = direct_insert_category(&conn, "Dairy", None)?;
            unit_id = direct_insert_unit(&conn, "l", "Volume")?;
            direct_insert_product(&conn, "Milk", category_id, unit_id)?;
        }

        let err = delete_unit(&pool, unit_id).await.unwrap_err();
        assert!(matches!(err, Error::ReferencedEntity { entity: "Unit", .. }));

        let free_unit = add_unit(&pool, "kg", "Weight").await?;
        delete_unit(&pool, free_unit).await?;
        Ok(())
    }
}
