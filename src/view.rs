//! Presentation adapter: turns an aggregation into a metric, a table and a chart series.

use crate::analysis::aggregate::{aggregate, declared_theme_total, total_for_selection};
use crate::dataset::Dataset;
use crate::error::Notice;
use crate::model::{Breakdown, Theme, ThemeSelection, Year};
use crate::utils::format_thousands;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::fmt::Write as _;

const BAR_WIDTH: usize = 40;

/// Chart-ready series in the same order as the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    pub fn from_breakdown(breakdown: &Breakdown) -> Self {
        let (labels, values) = breakdown
            .rows()
            .iter()
            .map(|row| (row.label.clone(), row.amount.to_f64().unwrap_or(0.0)))
            .unzip();
        Self { labels, values }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionView {
    pub title: String,
    pub year: Year,
    pub selection: String,
    pub total: Decimal,
    pub total_display: String,
    pub rows: Breakdown,
    pub chart: ChartSeries,
    pub notices: Vec<Notice>,
    pub empty_selection: bool,
}

pub fn build_view(dataset: &Dataset, year: &Year, selection: ThemeSelection) -> SelectionView {
    let result = aggregate(dataset, year, selection);
    let mut notices = dataset.notices().to_vec();

    let themes: Vec<Theme> = match selection {
        ThemeSelection::All => Theme::all().collect(),
        ThemeSelection::Theme(theme) => vec![theme],
    };
    if dataset.allocation_available() {
        for theme in themes {
            if let Some(declared) = declared_theme_total(dataset, year, theme) {
                let computed = total_for_selection(dataset, year, theme);
                if declared != computed {
                    notices.push(Notice::TotalMismatch {
                        year: year.to_string(),
                        theme,
                        declared,
                        computed,
                    });
                }
            }
        }
    }

    let empty_selection = result.matched_rows == 0;
    if empty_selection {
        notices.push(Notice::EmptySelection {
            year: year.to_string(),
            selection: selection.to_string(),
        });
    }

    let title = match selection {
        ThemeSelection::All => format!("All Themes Budget - {year}"),
        ThemeSelection::Theme(theme) => format!("{theme} Budget - {year}"),
    };

    SelectionView {
        title,
        year: year.clone(),
        selection: selection.to_string(),
        total: result.total,
        total_display: format_thousands(result.total),
        chart: ChartSeries::from_breakdown(&result.breakdown),
        rows: result.breakdown,
        notices,
        empty_selection,
    }
}

/// Plain-text rendering: metric line, notices, table, then a horizontal bar chart.
pub fn render_text(view: &SelectionView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.title);
    let _ = writeln!(out, "{}", "=".repeat(view.title.chars().count()));
    let _ = writeln!(out, "Total allocation: {}", view.total_display);

    for notice in &view.notices {
        let _ = writeln!(out, "warning: {notice}");
    }
    if view.rows.is_empty() {
        return out;
    }

    let header = match view.selection.as_str() {
        "All" => "Theme",
        _ => "Sub-theme",
    };
    let amounts: Vec<String> = view
        .rows
        .rows()
        .iter()
        .map(|row| format_thousands(row.amount))
        .collect();
    let label_width = view
        .rows
        .rows()
        .iter()
        .map(|row| row.label.chars().count())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);
    let amount_width = amounts
        .iter()
        .map(String::len)
        .chain(std::iter::once("Amount".len()))
        .max()
        .unwrap_or(0);

    let _ = writeln!(out);
    let _ = writeln!(out, "{header:<label_width$}  {:>amount_width$}", "Amount");
    for (row, amount) in view.rows.rows().iter().zip(&amounts) {
        let _ = writeln!(out, "{:<label_width$}  {amount:>amount_width$}", row.label);
    }

    let max = view.chart.values.iter().copied().fold(0.0_f64, f64::max);
    let _ = writeln!(out);
    for (label, value) in view.chart.labels.iter().zip(&view.chart.values) {
        let _ = writeln!(out, "{label:<label_width$} |{}", bar(*value, max));
    }
    out
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(len.max(1))
}

pub fn render_json(view: &SelectionView) -> serde_json::Result<String> {
    serde_json::to_string_pretty(view)
}
