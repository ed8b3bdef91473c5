//! Tabular projection of a window

use meto_core::{Table, TableRow, Window};

pub const SHEET_NAME: &str = "weather";

/// One row per observation, in window order, no aggregation
pub fn project(window: &Window) -> Table {
    Table {
        sheet_name: SHEET_NAME.to_string(),
        rows: window.observations.iter().map(TableRow::from).collect(),
    }
}
