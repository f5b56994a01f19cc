//! SVG export of a price trend: a single polyline over date/price axes.

use std::path::Path as FsPath;

use chrono::Datelike;
use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Line, Path};

use crate::errors::{Error, Result};
use crate::models::PricePoint;

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 700.0;
const MARGIN: f64 = 40.0;
const STROKE_WIDTH: f64 = 2.0;

/// Renders `points` as an SVG line chart at `file`.
///
/// # Errors
///
/// Returns `Error::Validation` when there is nothing to plot and
/// `Error::Io` if the file cannot be written.
pub fn render_svg(points: &[PricePoint], file: &FsPath) -> Result<()> {
    if points.is_empty() {
        return Err(Error::Validation("No data points to plot.".to_string()));
    }

    let xs: Vec<i64> = points.iter().map(|p| i64::from(p.date.num_days_from_ce())).collect();
    let xmin = *xs.iter().min().unwrap_or(&0);
    let xmax = *xs.iter().max().unwrap_or(&0);
    let ymin = points.iter().map(|p| p.unit_price).fold(f64::INFINITY, f64::min);
    let ymax = points
        .iter()
        .map(|p| p.unit_price)
        .fold(f64::NEG_INFINITY, f64::max);

    // Degenerate spans (single purchase, flat price) still need a finite
    // scale.
    let xspan = ((xmax - xmin) as f64).max(1.0);
    let yspan = (ymax - ymin).max(f64::EPSILON);

    let resize_x = |x: i64| (x - xmin) as f64 / xspan * WIDTH;
    let resize_y = |y: f64| HEIGHT - (y - ymin) / yspan * HEIGHT;

    let mut data = Data::new().move_to((resize_x(xs[0]), resize_y(points[0].unit_price)));
    for (x, point) in xs.iter().zip(points).skip(1) {
        data = data.line_to((resize_x(*x), resize_y(point.unit_price)));
    }

    let polyline = Path::new()
        .set("fill", "none")
        .set("stroke", "steelblue")
        .set("stroke-width", STROKE_WIDTH)
        .set("d", data);
    let yaxis = Line::new()
        .set("x1", 0.0)
        .set("x2", 0.0)
        .set("y1", 0.0)
        .set("y2", HEIGHT)
        .set("stroke", "black")
        .set("stroke-width", STROKE_WIDTH);
    let xaxis = Line::new()
        .set("x1", 0.0)
        .set("x2", WIDTH)
        .set("y1", HEIGHT)
        .set("y2", HEIGHT)
        .set("stroke", "black")
        .set("stroke-width", STROKE_WIDTH);

    let document = Document::new()
        .add(polyline)
        .add(yaxis)
        .add(xaxis)
        .set(
            "viewBox",
            (-MARGIN, -MARGIN, WIDTH + 2.0 * MARGIN, HEIGHT + 2.0 * MARGIN),
        );
    svg::save(file, &document)?;
    Ok(())
}
