use chrono::{Local, NaiveDate};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, info, instrument};

use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::models::Purchase;

const PURCHASE_SELECT: &str = "SELECT p.id, p.purchase_date, p.product_id, p.store_id,
            p.quantity, p.total_price, p.is_promo, p.promo_type, p.regular_unit_price, p.comment,
            pr.name AS product_name, s.name AS store_name, u.name AS unit_name
     FROM purchase p
     JOIN product pr ON p.product_id = pr.id
     JOIN store s ON p.store_id = s.id
     JOIN unit u ON pr.unit_id = u.id";

fn map_purchase_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Purchase> {
    Ok(Purchase {
        id: row.get(0)?,
        purchase_date: row.get(1)?,
        product_id: row.get(2)?,
        store_id: row.get(3)?,
        quantity: row.get(4)?,
        total_price: row.get(5)?,
        is_promo: row.get(6)?,
        promo_type: row.get(7)?,
        regular_unit_price: row.get(8)?,
        comment: row.get(9)?,
        product_name: row.get(10)?,
        store_name: row.get(11)?,
        unit_name: row.get(12)?,
    })
}

fn validate_positive(value: f64, field: &str) -> Result<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{} must be a positive number.",
            field
        )))
    }
}

fn validate_not_in_future(date: NaiveDate) -> Result<()> {
    if date > Local::now().date_naive() {
        return Err(Error::Validation(
            "Purchase date cannot be in the future.".to_string(),
        ));
    }
    Ok(())
}

fn ensure_product_exists(conn: &Connection, id: i64) -> Result<()> {
    let exists: bool = conn
        .prepare_cached("SELECT EXISTS (SELECT 1 FROM product WHERE id = ?1)")?
        .query_row(params![id], |row| row.get(0))?;
    if exists {
        Ok(())
    } else {
        Err(Error::InvalidReference {
            entity: "Product",
            id,
        })
    }
}

fn ensure_store_exists(conn: &Connection, id: i64) -> Result<()> {
    let exists: bool = conn
        .prepare_cached("SELECT EXISTS (SELECT 1 FROM store WHERE id = ?1)")?
        .query_row(params![id], |row| row.get(0))?;
    if exists {
        Ok(())
    } else {
        Err(Error::InvalidReference {
            entity: "Store",
            id,
        })
    }
}

/// Input for [`add_purchase`].
#[derive(Debug, Clone)]
pub struct NewPurchase<'a> {
    /// Defaults to today when omitted; may not lie in the future.
    pub purchase_date: Option<NaiveDate>,
    pub product_id: i64,
    pub store_id: i64,
    pub quantity: f64,
    pub total_price: f64,
    /// The promo flag is authoritative: when unset, `promo_type` and
    /// `regular_unit_price` are ignored and stored as NULL.
    pub is_promo: bool,
    pub promo_type: Option<&'a str>,
    pub regular_unit_price: Option<f64>,
    pub comment: Option<&'a str>,
}

/// Records a new purchase.
///
/// Validation rules:
/// - `quantity` and `total_price` must be strictly positive,
/// - the referenced product and store must exist,
/// - the date may not lie in the future (today when omitted),
/// - `regular_unit_price` is required (and positive) when `is_promo` is set;
///   without the flag, both promo fields are ignored.
///
/// # Returns
///
/// Returns `Ok(i64)` with the ID of the newly inserted purchase.
///
/// # Errors
///
/// Returns `Error::Validation` for out-of-range values or inconsistent promo
/// fields, and `Error::InvalidReference` if product or store do not resolve.
#[instrument(skip(pool, args))]
pub async fn add_purchase(pool: &DbPool, args: &NewPurchase<'_>) -> Result<i64> {
    validate_positive(args.quantity, "Quantity")?;
    validate_positive(args.total_price, "Total price")?;

    let purchase_date = args
        .purchase_date
        .unwrap_or_else(|| Local::now().date_naive());
    validate_not_in_future(purchase_date)?;

    let (is_promo, promo_type, regular_unit_price) = if args.is_promo {
        let regular = args.regular_unit_price.ok_or_else(|| {
            Error::Validation(
                "Regular unit price is required for a promo purchase.".to_string(),
            )
        })?;
        validate_positive(regular, "Regular unit price")?;
        (true, args.promo_type, Some(regular))
    } else {
        (false, None, None)
    };

    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    ensure_product_exists(&conn, args.product_id)?;
    ensure_store_exists(&conn, args.store_id)?;

    let mut stmt = conn.prepare_cached(
        "INSERT INTO purchase (purchase_date, product_id, store_id, quantity, total_price,
                               is_promo, promo_type, regular_unit_price, comment)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    let purchase_id = stmt.insert(params![
        purchase_date,
        args.product_id,
        args.store_id,
        args.quantity,
        args.total_price,
        is_promo,
        promo_type,
        regular_unit_price,
        args.comment,
    ])?;
    info!(
        "Recorded purchase ID {}: product {} at store {} on {}, qty {}, total {}{}",
        purchase_id,
        args.product_id,
        args.store_id,
        purchase_date,
        args.quantity,
        args.total_price,
        if is_promo { " (promo)" } else { "" }
    );
    Ok(purchase_id)
}

/// Fetches a purchase by ID with product, store and unit names joined in.
#[instrument(skip(pool))]
pub async fn get_purchase(pool: &DbPool, id: i64) -> Result<Purchase> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(&format!("{} WHERE p.id = ?1", PURCHASE_SELECT))?;
    stmt.query_row(params![id], map_purchase_row)
        .optional()?
        .ok_or(Error::NotFound {
            entity: "Purchase",
            id,
        })
}

/// Filters for [`list_purchases`]; all optional, combined with AND
/// semantics. The date range is inclusive on both ends.
#[derive(Debug, Default, Clone)]
pub struct PurchaseFilter {
    pub product_id: Option<i64>,
    pub store_id: Option<i64>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    /// `Some(true)` restricts to promo purchases, `Some(false)` to regular
    /// ones, `None` applies no promo filter.
    pub promo: Option<bool>,
    pub offset: i64,
    /// Negative means "no limit" (SQLite semantics).
    pub limit: i64,
}

impl PurchaseFilter {
    /// Filter matching everything, unpaginated.
    pub fn unbounded() -> Self {
        PurchaseFilter {
            limit: -1,
            ..PurchaseFilter::default()
        }
    }
}

/// Lists purchases matching `filter`, ordered by date ascending with ID as
/// tie-break. The ordering is load-bearing: trend charts consume this
/// sequence as-is.
///
/// # Errors
///
/// Returns `Error::Validation` if `from_date` is after `to_date`.
#[instrument(skip(pool, filter))]
pub async fn list_purchases(pool: &DbPool, filter: &PurchaseFilter) -> Result<Vec<Purchase>> {
    if let (Some(from), Some(to)) = (filter.from_date, filter.to_date) {
        if from > to {
            return Err(Error::Validation(format!(
                "From date {} is after to date {}.",
                from, to
            )));
        }
    }

    let mut sql = format!("{} WHERE 1=1", PURCHASE_SELECT);
    let mut values: Vec<Value> = Vec::new();

    if let Some(product_id) = filter.product_id {
        sql.push_str(" AND p.product_id = ?");
        values.push(Value::Integer(product_id));
    }
    if let Some(store_id) = filter.store_id {
        sql.push_str(" AND p.store_id = ?");
        values.push(Value::Integer(store_id));
    }
    if let Some(from) = filter.from_date {
        sql.push_str(" AND p.purchase_date >= ?");
        values.push(Value::Text(from.format("%Y-%m-%d").to_string()));
    }
    if let Some(to) = filter.to_date {
        sql.push_str(" AND p.purchase_date <= ?");
        values.push(Value::Text(to.format("%Y-%m-%d").to_string()));
    }
    if let Some(promo) = filter.promo {
        sql.push_str(" AND p.is_promo = ?");
        values.push(Value::Integer(i64::from(promo)));
    }
    sql.push_str(" ORDER BY p.purchase_date ASC, p.id ASC LIMIT ? OFFSET ?");
    values.push(Value::Integer(filter.limit));
    values.push(Value::Integer(filter.offset));

    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    debug!("Purchase list query: {}", sql);
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), map_purchase_row)?;

    let mut purchases = Vec::new();
    for row in rows {
        purchases
            .push(row.map_err(|e| Error::Database(format!("Failed to map purchase row: {}", e)))?);
    }
    debug!("Fetched {} purchases.", purchases.len());
    Ok(purchases)
}

/// Field changes for [`update_purchase`]; `None` leaves a field untouched.
///
/// Promo handling is tri-state: `promo = Some(false)` clears the promo flag
/// and wipes both promo fields; supplying `promo_type` or
/// `regular_unit_price` implies the flag.
#[derive(Debug, Default, Clone)]
pub struct PurchaseUpdate<'a> {
    pub purchase_date: Option<NaiveDate>,
    pub product_id: Option<i64>,
    pub store_id: Option<i64>,
    pub quantity: Option<f64>,
    pub total_price: Option<f64>,
    pub promo: Option<bool>,
    pub promo_type: Option<&'a str>,
    pub regular_unit_price: Option<f64>,
    pub comment: Option<&'a str>,
}

/// Applies a partial update to a purchase, enforcing the same rules as
/// [`add_purchase`] on the resulting row.
///
/// # Errors
///
/// `Error::NotFound` if the purchase is absent; `Error::Validation` for
/// out-of-range values, a future date, clearing promo while also supplying
/// promo fields, or a resulting promo row without a regular unit price;
/// `Error::InvalidReference` for an unresolvable new product/store.
#[instrument(skip(pool, changes))]
pub async fn update_purchase(
    pool: &DbPool,
    id: i64,
    changes: &PurchaseUpdate<'_>,
) -> Result<Purchase> {
    if changes.promo == Some(false)
        && (changes.promo_type.is_some() || changes.regular_unit_price.is_some())
    {
        return Err(Error::Validation(
            "Cannot clear the promo flag and set promo fields in the same update.".to_string(),
        ));
    }
    if let Some(quantity) = changes.quantity {
        validate_positive(quantity, "Quantity")?;
    }
    if let Some(total_price) = changes.total_price {
        validate_positive(total_price, "Total price")?;
    }
    if let Some(regular) = changes.regular_unit_price {
        validate_positive(regular, "Regular unit price")?;
    }
    if let Some(date) = changes.purchase_date {
        validate_not_in_future(date)?;
    }

    let current = get_purchase(pool, id).await?;

    // Resolve the resulting promo state before touching the row.
    let mut is_promo = current.is_promo;
    let mut promo_type = current.promo_type.clone();
    let mut regular_unit_price = current.regular_unit_price;
    match changes.promo {
        Some(false) => {
            is_promo = false;
            promo_type = None;
            regular_unit_price = None;
        }
        Some(true) => is_promo = true,
        None => {}
    }
    if let Some(new_type) = changes.promo_type {
        promo_type = Some(new_type.to_string());
        is_promo = true;
    }
    if let Some(new_regular) = changes.regular_unit_price {
        regular_unit_price = Some(new_regular);
        is_promo = true;
    }
    if is_promo && regular_unit_price.is_none() {
        return Err(Error::Validation(
            "Regular unit price is required for a promo purchase.".to_string(),
        ));
    }

    let purchase_date = changes.purchase_date.unwrap_or(current.purchase_date);
    let product_id = changes.product_id.unwrap_or(current.product_id);
    let store_id = changes.store_id.unwrap_or(current.store_id);
    let quantity = changes.quantity.unwrap_or(current.quantity);
    let total_price = changes.total_price.unwrap_or(current.total_price);
    let comment = match changes.comment {
        Some(c) => Some(c.to_string()),
        None => current.comment.clone(),
    };

    {
        let conn = pool
            .lock()
            .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
        if changes.product_id.is_some() {
            ensure_product_exists(&conn, product_id)?;
        }
        if changes.store_id.is_some() {
            ensure_store_exists(&conn, store_id)?;
        }

        conn.execute(
            "UPDATE purchase SET purchase_date = ?1, product_id = ?2, store_id = ?3,
                 quantity = ?4, total_price = ?5, is_promo = ?6, promo_type = ?7,
                 regular_unit_price = ?8, comment = ?9
             WHERE id = ?10",
            params![
                purchase_date,
                product_id,
                store_id,
                quantity,
                total_price,
                is_promo,
                promo_type,
                regular_unit_price,
                comment,
                id,
            ],
        )?;
        info!("Updated purchase ID {}", id);
    }
    get_purchase(pool, id).await
}

/// Deletes a purchase by ID. Purchases have no dependents, so no reference
/// guard applies.
#[instrument(skip(pool))]
pub async fn delete_purchase(pool: &DbPool, id: i64) -> Result<()> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let rows_affected = conn.execute("DELETE FROM purchase WHERE id = ?1", params![id])?;
    if rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "Purchase",
            id,
        });
    }
    info!("Deleted purchase ID {}", id);
    Ok(())
}
