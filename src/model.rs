use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct DatasetId(pub String);

impl DatasetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fiscal period identifier taken from the year column.
///
/// Plain integers (`2024`, or `2024.0` as stored by spreadsheets) become
/// [`Year::Numeric`]; anything else (`2024-25`, `FY24 RE`) is kept verbatim as a label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Year {
    Numeric(i64),
    Label(String),
}

impl Year {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Some(Year::Numeric(value));
        }
        if let Ok(value) = trimmed.parse::<f64>()
            && value.is_finite()
            && value.fract() == 0.0
            && value.abs() < i64::MAX as f64
        {
            return Some(Year::Numeric(value as i64));
        }
        Some(Year::Label(trimmed.to_string()))
    }
}

impl FromStr for Year {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Year::parse(s).ok_or_else(|| "year cannot be empty".to_string())
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Year::Numeric(value) => write!(f, "{value}"),
            Year::Label(label) => write!(f, "{label}"),
        }
    }
}

impl Ord for Year {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Year::Numeric(a), Year::Numeric(b)) => a.cmp(b),
            (Year::Numeric(_), Year::Label(_)) => Ordering::Less,
            (Year::Label(_), Year::Numeric(_)) => Ordering::Greater,
            (Year::Label(a), Year::Label(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Year {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Canonical top-level budget category.
///
/// Declaration order is the fixed classification order; `Others` is the fallback bucket
/// and must stay last.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Theme {
    Agriculture,
    Defence,
    Education,
    Health,
    Infrastructure,
    Others,
}

impl Theme {
    pub const COUNT: usize = 6;

    pub fn all() -> impl Iterator<Item = Theme> {
        Theme::iter()
    }

    pub fn is_fallback(self) -> bool {
        matches!(self, Theme::Others)
    }
}

/// Theme filter chosen by the user; `All` switches the view to the cross-theme breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeSelection {
    #[default]
    All,
    Theme(Theme),
}

impl FromStr for ThemeSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(ThemeSelection::All);
        }
        Theme::from_str(trimmed)
            .map(ThemeSelection::Theme)
            .map_err(|_| {
                let names = Theme::all().map(|t| t.to_string()).collect::<Vec<_>>();
                format!("unknown theme '{trimmed}', expected All or one of {}", names.join(", "))
            })
    }
}

impl fmt::Display for ThemeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeSelection::All => write!(f, "All"),
            ThemeSelection::Theme(theme) => write!(f, "{theme}"),
        }
    }
}

/// One normalized row of the budget dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub year: Year,
    pub sub_theme: String,
    pub allocation: Decimal,
    /// Theme the row is filed under, resolved once at load time.
    pub theme: Theme,
    /// Raw value of the theme column, if the layout has one.
    pub declared_theme: Option<String>,
    /// Theme-level total carried on the row by layouts with a total column.
    pub declared_total: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub label: String,
    pub amount: Decimal,
}

impl BreakdownRow {
    pub fn new(label: impl Into<String>, amount: Decimal) -> Self {
        Self {
            label: label.into(),
            amount,
        }
    }
}

/// Ordered decomposition of a total, largest amount first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Breakdown(pub Vec<BreakdownRow>);

impl Breakdown {
    /// Sorts descending by amount. `sort_by` is stable, so equal amounts keep insertion order.
    pub fn sorted(mut rows: Vec<BreakdownRow>) -> Self {
        rows.sort_by(|a, b| b.amount.cmp(&a.amount));
        Breakdown(rows)
    }

    pub fn rows(&self) -> &[BreakdownRow] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> Decimal {
        self.0.iter().map(|row| row.amount).sum()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.0.iter().map(|row| row.label.as_str()).collect()
    }
}
