//! Result rendering: compact lines, key:value blocks (`--full`) and
//! box-drawn tables (`--table`).

use std::fmt;

use clap::Args;

use crate::models::{Category, PricePoint, Product, Purchase, Store, Unit};

/// Output-mode flags shared by every `list`-style command.
#[derive(Debug, Clone, Copy, Args)]
pub struct OutputFlags {
    /// Key:value output, one block per record.
    #[arg(long, conflicts_with = "table")]
    pub full: bool,

    /// Box-drawn tabular output.
    #[arg(long)]
    pub table: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Compact,
    Full,
    Table,
}

impl OutputFlags {
    pub fn mode(&self) -> OutputMode {
        if self.full {
            OutputMode::Full
        } else if self.table {
            OutputMode::Table
        } else {
            OutputMode::Compact
        }
    }
}

/// A record type that knows how to render itself as table cells.
pub trait Tabular {
    fn headers() -> &'static [&'static str];
    fn row(&self) -> Vec<String>;

    fn pairs(&self) -> Vec<(&'static str, String)> {
        Self::headers().iter().copied().zip(self.row()).collect()
    }
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

impl Tabular for Category {
    fn headers() -> &'static [&'static str] {
        &["id", "name", "description"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.clone(), opt(&self.description)]
    }
}

impl Tabular for Unit {
    fn headers() -> &'static [&'static str] {
        &["id", "name", "measure type"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.measure_type.clone(),
        ]
    }
}

impl Tabular for Store {
    fn headers() -> &'static [&'static str] {
        &["id", "name", "description"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.clone(), opt(&self.description)]
    }
}

impl Tabular for Product {
    fn headers() -> &'static [&'static str] {
        &["id", "name", "category", "unit"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.category_name
                .clone()
                .unwrap_or_else(|| self.category_id.to_string()),
            self.unit_name
                .clone()
                .unwrap_or_else(|| self.unit_id.to_string()),
        ]
    }
}

impl Tabular for Purchase {
    fn headers() -> &'static [&'static str] {
        &[
            "id",
            "date",
            "product",
            "store",
            "quantity",
            "total price",
            "unit price",
            "promo",
            "regular price",
            "comment",
        ]
    }

    fn row(&self) -> Vec<String> {
        let quantity = match &self.unit_name {
            Some(unit) => format!("{} {}", self.quantity, unit),
            None => self.quantity.to_string(),
        };
        let promo = if self.is_promo {
            self.promo_type.clone().unwrap_or_else(|| "yes".to_string())
        } else {
            "-".to_string()
        };
        vec![
            self.id.to_string(),
            self.purchase_date.to_string(),
            self.product_name
                .clone()
                .unwrap_or_else(|| self.product_id.to_string()),
            self.store_name
                .clone()
                .unwrap_or_else(|| self.store_id.to_string()),
            quantity,
            money(self.total_price),
            money(self.paid_unit_price()),
            promo,
            self.regular_unit_price.map(money).unwrap_or_else(|| "-".to_string()),
            opt(&self.comment),
        ]
    }
}

impl Tabular for PricePoint {
    fn headers() -> &'static [&'static str] {
        &["date", "unit price"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.date.to_string(), money(self.unit_price)]
    }
}

/// Prints a single record as `key: value` lines.
pub fn print_record<T: Tabular>(record: &T) {
    for (key, value) in record.pairs() {
        println!("{}: {}", key, value);
    }
}

/// Prints a sequence of records in the requested mode. An empty sequence
/// prints `(empty)` so scripted callers still see a line of output.
pub fn print_records<T: Tabular>(records: &[T], mode: OutputMode) {
    if records.is_empty() {
        println!("(empty)");
        return;
    }
    match mode {
        OutputMode::Compact => {
            for record in records {
                println!("{}", record.row().join("  "));
            }
        }
        OutputMode::Full => {
            for (idx, record) in records.iter().enumerate() {
                if idx > 0 {
                    println!("{}", "-".repeat(40));
                }
                print_record(record);
            }
        }
        OutputMode::Table => {
            let rows = records.iter().map(|record| record.row()).collect();
            println!("{}", TextTable::new(T::headers(), rows));
        }
    }
}

/// Minimal box-drawn table renderer.
pub struct TextTable {
    headers: &'static [&'static str],
    rows: Vec<Vec<String>>,
    widths: Vec<usize>,
}

impl TextTable {
    pub fn new(headers: &'static [&'static str], rows: Vec<Vec<String>>) -> Self {
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in &rows {
            for (idx, cell) in row.iter().enumerate() {
                widths[idx] = widths[idx].max(cell.chars().count());
            }
        }
        TextTable {
            headers,
            rows,
            widths,
        }
    }

    fn hline(&self, f: &mut fmt::Formatter<'_>, left: &str, mid: &str, right: &str) -> fmt::Result {
        write!(f, "{}", left)?;
        for (idx, width) in self.widths.iter().enumerate() {
            if idx > 0 {
                write!(f, "{}", mid)?;
            }
            write!(f, "{}", "─".repeat(width + 2))?;
        }
        writeln!(f, "{}", right)
    }

    fn line(&self, f: &mut fmt::Formatter<'_>, cells: &[String]) -> fmt::Result {
        write!(f, "│")?;
        for (cell, &width) in cells.iter().zip(&self.widths) {
            write!(f, " {:<1$} │", cell, width)?;
        }
        writeln!(f)
    }
}

impl fmt::Display for TextTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.hline(f, "┌", "┬", "┐")?;
        let headers: Vec<String> = self.headers.iter().map(|h| (*h).to_string()).collect();
        self.line(f, &headers)?;
        self.hline(f, "├", "┼", "┤")?;
        for row in &self.rows {
            self.line(f, row)?;
        }
        self.hline(f, "└", "┴", "┘")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_table_pads_columns() {
        let table = TextTable::new(
            &["id", "name"],
            vec![
                vec!["1".to_string(), "Dairy".to_string()],
                vec!["2".to_string(), "Household".to_string()],
            ],
        );
        let rendered = table.to_string();
        assert!(rendered.contains("│ id │ name      │"));
        assert!(rendered.contains("│ 1  │ Dairy     │"));
        assert!(rendered.contains("│ 2  │ Household │"));
        assert!(rendered.starts_with("┌"));
        assert!(rendered.trim_end().ends_with("┘"));
    }

    #[test]
    fn test_purchase_row_formats_promo_and_prices() {
        use chrono::NaiveDate;
        let purchase = Purchase {
            id: 7,
            purchase_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            product_id: 1,
            store_id: 2,
            quantity: 2.0,
            total_price: 5.0,
            is_promo: true,
            promo_type: Some("discount".to_string()),
            regular_unit_price: Some(3.0),
            comment: None,
            product_name: Some("Milk".to_string()),
            store_name: Some("Corner Shop".to_string()),
            unit_name: Some("l".to_string()),
        };
        let row = purchase.row();
        assert_eq!(row[1], "2025-01-15");
        assert_eq!(row[4], "2 l");
        assert_eq!(row[5], "5.00");
        assert_eq!(row[6], "2.50");
        assert_eq!(row[7], "discount");
        assert_eq!(row[8], "3.00");
        assert_eq!(row[9], "-");
    }
}
