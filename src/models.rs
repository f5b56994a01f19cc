use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A product category ("Dairy", "Household", ...). Referenced by products.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String, // unique, case-insensitive
    pub description: Option<String>,
}

/// A measurement unit ("kg", "l", "pcs") with its measure-type label
/// ("Weight", "Volume", ...). Referenced by products.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Unit {
    pub id: i64,
    pub name: String, // unique, case-insensitive
    pub measure_type: String,
}

/// A store where purchases are made. Referenced by purchases.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Store {
    pub id: i64,
    pub name: String, // unique, case-insensitive
    pub description: Option<String>,
}

/// A product, normalized against a category and a unit.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Product {
    pub id: i64,
    pub name: String, // unique, case-insensitive
    pub category_id: i64,
    pub unit_id: i64,
    // These fields are not in the DB table but are populated by JOINs for display
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub unit_name: Option<String>,
}

/// One recorded transaction: a quantity of a product bought at a store on a
/// date for a total price, optionally flagged as a promotional purchase.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Purchase {
    pub id: i64,
    pub purchase_date: NaiveDate, // calendar date, no time component
    pub product_id: i64,
    pub store_id: i64,
    pub quantity: f64,    // > 0
    pub total_price: f64, // > 0
    pub is_promo: bool,
    /// Free-form promo label ("discount", "multi_buy", ...); NULL unless promo.
    pub promo_type: Option<String>,
    /// Non-discounted unit price for comparison; set exactly when `is_promo`.
    pub regular_unit_price: Option<f64>,
    pub comment: Option<String>,
    // Populated by JOINs for display
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub unit_name: Option<String>,
}

impl Purchase {
    /// Unit price actually paid. `quantity` is validated strictly positive at
    /// the data-access layer, so the division is well-defined.
    pub fn paid_unit_price(&self) -> f64 {
        self.total_price / self.quantity
    }
}

/// One point of a price trend: the unit price of a product on a date.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub unit_price: f64,
}
