//! Column canonicalization and logical-column resolution.
//!
//! Dataset versions drift in how they spell headers (`Sub-Theme`, `Sub Theme`, `sub_theme`).
//! Headers are canonicalized once, then each logical column is resolved against an ordered
//! alias list; the first alias present wins regardless of column position.

use crate::error::{Notice, SchemaError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const YEAR_ALIAS: &str = "Year";
pub const SUB_THEME_ALIASES: &[&str] = &[
    "Sub_Theme",
    "SubTheme",
    "Sub_Sector",
    "Sub_Category",
    "Sub_Head",
];
pub const ALLOCATION_ALIASES: &[&str] = &[
    "Sub_Allocation",
    "Allocation",
    "Amount",
    "Budget_Allocation",
    "Allocation_Crore",
];
pub const THEME_ALIASES: &[&str] = &["Theme", "Sector", "Category"];
pub const THEME_TOTAL_ALIASES: &[&str] = &["Total_Allocation", "Theme_Total"];

static SEPARATOR_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-_]+").expect("separator pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalColumn {
    Year,
    SubTheme,
    Allocation,
    Theme,
    ThemeTotal,
}

impl fmt::Display for LogicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalColumn::Year => "year",
            LogicalColumn::SubTheme => "sub-theme",
            LogicalColumn::Allocation => "allocation",
            LogicalColumn::Theme => "theme",
            LogicalColumn::ThemeTotal => "theme total",
        };
        f.write_str(name)
    }
}

/// Trims and collapses every run of whitespace, hyphens and underscores into one `_`.
pub fn canonical_column_name(raw: &str) -> String {
    SEPARATOR_RUN
        .replace_all(raw.trim(), "_")
        .trim_matches('_')
        .to_string()
}

/// Column positions for every logical column, fixed at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSchema {
    pub columns: Vec<String>,
    pub year: usize,
    pub sub_theme: usize,
    pub allocation: Option<usize>,
    pub theme: Option<usize>,
    pub theme_total: Option<usize>,
    pub notices: Vec<Notice>,
}

impl ResolvedSchema {
    pub fn column_name(&self, index: usize) -> &str {
        self.columns.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn has_allocation(&self) -> bool {
        self.allocation.is_some()
    }
}

pub fn resolve_schema(raw_headers: &[String]) -> Result<ResolvedSchema, SchemaError> {
    let columns: Vec<String> = raw_headers
        .iter()
        .map(|header| canonical_column_name(header))
        .collect();

    let sub_theme =
        find_alias(&columns, SUB_THEME_ALIASES).ok_or_else(|| SchemaError {
            column: LogicalColumn::SubTheme,
            tried: SUB_THEME_ALIASES.iter().map(|a| a.to_string()).collect(),
            available: columns.clone(),
        })?;

    let mut notices = Vec::new();

    let year = match find_alias(&columns, &[YEAR_ALIAS]) {
        Some(index) => index,
        None => {
            notices.push(Notice::YearColumnFallback {
                column: columns[0].clone(),
            });
            0
        }
    };

    let allocation = find_alias(&columns, ALLOCATION_ALIASES);
    if allocation.is_none() {
        notices.push(Notice::MissingOptionalColumn {
            column: LogicalColumn::Allocation,
            effect: "allocations count as 0".to_string(),
        });
    }

    let theme = find_alias(&columns, THEME_ALIASES);
    if theme.is_none() {
        notices.push(Notice::MissingOptionalColumn {
            column: LogicalColumn::Theme,
            effect: "themes are classified from sub-theme labels".to_string(),
        });
    }

    let theme_total = find_alias(&columns, THEME_TOTAL_ALIASES);

    Ok(ResolvedSchema {
        columns,
        year,
        sub_theme,
        allocation,
        theme,
        theme_total,
        notices,
    })
}

fn find_alias(columns: &[String], aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|alias| {
        let alias = alias.to_lowercase();
        columns
            .iter()
            .position(|column| column.to_lowercase() == alias)
    })
}
