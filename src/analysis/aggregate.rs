//! Totals and breakdowns over a normalized dataset.
//!
//! All sums use exact decimal arithmetic, so a breakdown always adds up to the total computed
//! for the same selection.

use crate::dataset::Dataset;
use crate::model::{Breakdown, BreakdownRow, Record, Theme, ThemeSelection, Year};
use indexmap::IndexMap;
use rust_decimal::Decimal;

/// Total plus its decomposition for one year/theme selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationResult {
    pub total: Decimal,
    pub breakdown: Breakdown,
    /// Rows that matched the selection before grouping.
    pub matched_rows: usize,
}

fn selection<'a>(
    dataset: &'a Dataset,
    year: &'a Year,
    theme: Theme,
) -> impl Iterator<Item = &'a Record> + 'a {
    dataset
        .records()
        .iter()
        .filter(move |record| record.year == *year && record.theme == theme)
}

pub fn total_for_selection(dataset: &Dataset, year: &Year, theme: Theme) -> Decimal {
    if !dataset.allocation_available() {
        return Decimal::ZERO;
    }
    selection(dataset, year, theme)
        .map(|record| record.allocation)
        .sum()
}

/// Per-sub-theme sums, largest first. Empty when the dataset has no allocation column.
pub fn breakdown_within_theme(dataset: &Dataset, year: &Year, theme: Theme) -> Breakdown {
    if !dataset.allocation_available() {
        return Breakdown::default();
    }
    let mut groups: IndexMap<&str, Decimal> = IndexMap::new();
    for record in selection(dataset, year, theme) {
        *groups.entry(record.sub_theme.as_str()).or_insert(Decimal::ZERO) += record.allocation;
    }
    Breakdown::sorted(
        groups
            .into_iter()
            .map(|(label, amount)| BreakdownRow::new(label, amount))
            .collect(),
    )
}

/// One row per canonical theme, zero amounts included, largest first.
pub fn breakdown_across_themes(dataset: &Dataset, year: &Year) -> Breakdown {
    Breakdown::sorted(
        Theme::all()
            .map(|theme| {
                BreakdownRow::new(theme.to_string(), total_for_selection(dataset, year, theme))
            })
            .collect(),
    )
}

pub fn total_for_year(dataset: &Dataset, year: &Year) -> Decimal {
    breakdown_across_themes(dataset, year).sum()
}

pub fn matching_rows(dataset: &Dataset, year: &Year, theme: ThemeSelection) -> usize {
    match theme {
        ThemeSelection::All => dataset
            .records()
            .iter()
            .filter(|record| record.year == *year)
            .count(),
        ThemeSelection::Theme(theme) => selection(dataset, year, theme).count(),
    }
}

/// First theme-level total declared on a matching row, for layouts carrying a total column.
pub fn declared_theme_total(dataset: &Dataset, year: &Year, theme: Theme) -> Option<Decimal> {
    selection(dataset, year, theme).find_map(|record| record.declared_total)
}

pub fn aggregate(dataset: &Dataset, year: &Year, theme: ThemeSelection) -> AggregationResult {
    let (total, breakdown) = match theme {
        ThemeSelection::All => {
            let breakdown = breakdown_across_themes(dataset, year);
            (breakdown.sum(), breakdown)
        }
        ThemeSelection::Theme(theme) => (
            total_for_selection(dataset, year, theme),
            breakdown_within_theme(dataset, year, theme),
        ),
    };
    AggregationResult {
        total,
        breakdown,
        matched_rows: matching_rows(dataset, year, theme),
    }
}
