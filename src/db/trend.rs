//! Price-trend derivation: the time-ordered unit price of one product.
//!
//! This is a pass-through derived view over the purchase listing - no
//! smoothing, interpolation or index math. The chart layers (CLI table, SVG
//! export) consume the sequence as-is.

use chrono::NaiveDate;
use rusqlite::params;
use tracing::{debug, instrument};

use crate::db::purchases::{PurchaseFilter, list_purchases};
use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::models::{PricePoint, Purchase};

/// Which unit price a trend point carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceMode {
    /// The price actually paid: `total_price / quantity`.
    Paid,
    /// The non-discounted comparison price: `regular_unit_price` on promo
    /// rows, the paid unit price elsewhere.
    Regular,
}

/// How promo purchases participate in the trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoMode {
    Include,
    Exclude,
    Only,
}

impl PromoMode {
    fn as_filter(self) -> Option<bool> {
        match self {
            PromoMode::Include => None,
            PromoMode::Exclude => Some(false),
            PromoMode::Only => Some(true),
        }
    }
}

fn unit_price(purchase: &Purchase, mode: PriceMode) -> f64 {
    match mode {
        PriceMode::Paid => purchase.paid_unit_price(),
        // Non-promo rows have no stored regular price; their paid price IS
        // the regular price.
        PriceMode::Regular => purchase
            .regular_unit_price
            .unwrap_or_else(|| purchase.paid_unit_price()),
    }
}

/// Computes the `(date, unit_price)` sequence for `product_id`, ordered by
/// date ascending (ID tie-break), optionally narrowed to one store and/or an
/// inclusive date range.
///
/// # Errors
///
/// Returns `Error::NotFound` if the product does not exist and
/// `Error::Validation` for an inverted date range.
#[instrument(skip(pool))]
pub async fn price_trend(
    pool: &DbPool,
    product_id: i64,
    store_id: Option<i64>,
    from_date: Option<NaiveDate>,
    to_date: Option<NaiveDate>,
    price_mode: PriceMode,
    promo_mode: PromoMode,
) -> Result<Vec<PricePoint>> {
    {
        let conn = pool
            .lock()
            .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
        let exists: bool = conn
            .prepare_cached("SELECT EXISTS (SELECT 1 FROM product WHERE id = ?1)")?
            .query_row(params![product_id], |row| row.get(0))?;
        if !exists {
            return Err(Error::NotFound {
                entity: "Product",
                id: product_id,
            });
        }
    }

    let filter = PurchaseFilter {
        product_id: Some(product_id),
        store_id,
        from_date,
        to_date,
        promo: promo_mode.as_filter(),
        ..PurchaseFilter::unbounded()
    };
    let purchases = list_purchases(pool, &filter).await?;

    let points: Vec<PricePoint> = purchases
        .iter()
        .map(|p| PricePoint {
            date: p.purchase_date,
            unit_price: unit_price(p, price_mode),
        })
        .collect();
    debug!(
        "Derived {} trend points for product {}",
        points.len(),
        product_id
    );
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::purchases::{NewPurchase, add_purchase};
    use crate::db::test_utils::{init_test_tracing, seed_reference_fixture, setup_test_db};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    async fn seed_purchase(
        pool: &DbPool,
        product_id: i64,
        store_id: i64,
        day: &str,
        quantity: f64,
        total_price: f64,
        regular_unit_price: Option<f64>,
    ) -> Result<i64> {
        add_purchase(
            pool,
            &NewPurchase {
                purchase_date: Some(date(day)),
                product_id,
                store_id,
                quantity,
                total_price,
                is_promo: regular_unit_price.is_some(),
                promo_type: regular_unit_price.map(|_| "discount"),
                regular_unit_price,
                comment: None,
            },
        )
        .await
    }

    #[tokio::test]
    async fn test_trend_paid_mode_divides_total_by_quantity() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;
        let f = seed_reference_fixture(&pool)?;

        seed_purchase(&pool, f.product_id, f.store_id, "2025-01-01", 2.0, 5.0, None).await?;
        seed_purchase(&pool, f.product_id, f.store_id, "2025-02-01", 1.0, 2.8, None).await?;

        let points = price_trend(
            &pool,
            f.product_id,
            None,
            None,
            None,
            PriceMode::Paid,
            PromoMode::Include,
        )
        .await?;
        assert_eq!(
            points,
            vec![
                PricePoint { date: date("2025-01-01"), unit_price: 2.5 },
                PricePoint { date: date("2025-02-01"), unit_price: 2.8 },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_trend_regular_mode_substitutes_promo_rows_only() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;
        let f = seed_reference_fixture(&pool)?;

        seed_purchase(&pool, f.product_id, f.store_id, "2025-01-01", 1.0, 2.5, None).await?;
        // Promo: paid 2.0 per unit, regular price 3.0.
        seed_purchase(&pool, f.product_id, f.store_id, "2025-01-08", 1.0, 2.0, Some(3.0)).await?;

        let paid = price_trend(
            &pool,
            f.product_id,
            None,
            None,
            None,
            PriceMode::Paid,
            PromoMode::Include,
        )
        .await?;
        assert_eq!(paid[1].unit_price, 2.0);

        let regular = price_trend(
            &pool,
            f.product_id,
            None,
            None,
            None,
            PriceMode::Regular,
            PromoMode::Include,
        )
        .await?;
        assert_eq!(regular[0].unit_price, 2.5);
        assert_eq!(regular[1].unit_price, 3.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_trend_promo_modes_filter_rows() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;
        let f = seed_reference_fixture(&pool)?;

        seed_purchase(&pool, f.product_id, f.store_id, "2025-01-01", 1.0, 2.5, None).await?;
        seed_purchase(&pool, f.product_id, f.store_id, "2025-01-08", 1.0, 2.0, Some(3.0)).await?;

        let excluded = price_trend(
            &pool,
            f.product_id,
            None,
            None,
            None,
            PriceMode::Paid,
            PromoMode::Exclude,
        )
        .await?;
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded[0].date, date("2025-01-01"));

        let only = price_trend(
            &pool,
            f.product_id,
            None,
            None,
            None,
            PriceMode::Paid,
            PromoMode::Only,
        )
        .await?;
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].date, date("2025-01-08"));
        Ok(())
    }

    #[tokio::test]
    async fn test_trend_respects_store_and_date_filters() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;
        let f = seed_reference_fixture(&pool)?;

        let other_store;
        {
            let conn = pool.lock().unwrap();
            other_store = crate::db::test_utils::direct_insert_store(&conn, "Hypermarket", None)?;
        }

        seed_purchase(&pool, f.product_id, f.store_id, "2025-01-01", 1.0, 2.5, None).await?;
        seed_purchase(&pool, f.product_id, other_store, "2025-01-02", 1.0, 2.2, None).await?;
        seed_purchase(&pool, f.product_id, f.store_id, "2025-03-01", 1.0, 2.9, None).await?;

        let at_store = price_trend(
            &pool,
            f.product_id,
            Some(f.store_id),
            Some(date("2025-01-01")),
            Some(date("2025-01-31")),
            PriceMode::Paid,
            PromoMode::Include,
        )
        .await?;
        assert_eq!(at_store.len(), 1);
        assert_eq!(at_store[0].date, date("2025-01-01"));
        Ok(())
    }

    #[tokio::test]
    async fn test_trend_unknown_product_not_found() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let err = price_trend(
            &pool,
            42,
            None,
            None,
            None,
            PriceMode::Paid,
            PromoMode::Include,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "Product", id: 42 }));
        Ok(())
    }
}
