pub mod categories;
pub mod connection;
pub mod migrations;
pub mod products;
pub mod purchases;
pub mod stores;
pub(crate) mod test_utils;
pub mod trend;
pub mod units;

pub use categories::{add_category, delete_category, get_category, list_categories, update_category};
pub use connection::{DbPool, init_db};
pub use migrations::{run_migrations, schema_version};
pub use products::{
    ProductUpdate, add_product, delete_product, get_product, list_products, update_product,
};
pub use purchases::{
    NewPurchase, PurchaseFilter, PurchaseUpdate, add_purchase, delete_purchase, get_purchase,
    list_purchases, update_purchase,
};
pub use stores::{add_store, delete_store, get_store, list_stores, update_store};
pub use trend::{PriceMode, PromoMode, price_trend};
pub use units::{add_unit, delete_unit, get_unit, list_units, update_unit};
