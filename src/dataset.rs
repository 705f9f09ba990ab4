use crate::analysis::classification::{Classifier, ClassifierStrategy, Taxonomy};
use crate::analysis::schema::{ResolvedSchema, resolve_schema};
use crate::error::{BudgetResult, Notice, SchemaError};
use crate::model::{DatasetId, Record, Theme, Year};
use crate::utils::path_to_forward_slashes;
use crate::workbook::{RawTable, SourceInfo, ensure_extension, read_table};
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexSet;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

/// Largest accepted allocation, 10^18. Sums of this many rows stay far below `Decimal::MAX`.
pub const MAX_ALLOCATION: Decimal = Decimal::from_parts(0xA764_0000, 0x0DE0_B6B3, 0, false, 0);

/// How a raw table is turned into records.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    pub strategy: ClassifierStrategy,
    pub taxonomy: Taxonomy,
}

/// Everything needed to read the dataset from disk.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub path: PathBuf,
    pub sheet: Option<String>,
    pub extensions: Vec<String>,
    pub normalize: NormalizeOptions,
}

/// Normalized, immutable budget dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    source: Option<SourceInfo>,
    sheet: String,
    columns: Vec<String>,
    records: Vec<Record>,
    strategy: ClassifierStrategy,
    allocation_available: bool,
    notices: Vec<Notice>,
    loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub id: Option<DatasetId>,
    pub path: Option<String>,
    pub sheet: String,
    pub columns: Vec<String>,
    pub rows: usize,
    pub years: Vec<Year>,
    pub strategy: ClassifierStrategy,
    pub allocation_available: bool,
    pub notices: Vec<Notice>,
    pub loaded_at: String,
}

#[derive(Debug, Default)]
struct RowIssues {
    missing_year: usize,
    missing_sub_theme: usize,
    invalid_allocations: usize,
}

impl Dataset {
    /// Resolves the schema, parses every row, then classifies each row into a theme.
    ///
    /// Fails only when the sub-theme column cannot be resolved; every other problem becomes a
    /// [`Notice`].
    pub fn from_table(table: RawTable, options: &NormalizeOptions) -> Result<Self, SchemaError> {
        let schema = resolve_schema(&table.headers)?;
        let mut issues = RowIssues::default();
        let mut parsed = Vec::with_capacity(table.rows.len());

        for row in 0..table.rows.len() {
            if let Some(values) = parse_row(&table, row, &schema, &mut issues) {
                parsed.push(values);
            }
        }

        let labels: IndexSet<&str> = parsed.iter().map(|row| row.sub_theme.as_str()).collect();
        let strategy = options
            .taxonomy
            .resolve_strategy(options.strategy, labels.iter().copied());
        let classifier = Classifier::new(options.taxonomy.clone(), strategy);

        let records = parsed
            .into_iter()
            .map(|row| {
                let theme = row
                    .declared_theme
                    .as_deref()
                    .and_then(declared_theme)
                    .unwrap_or_else(|| classifier.classify(&row.sub_theme));
                Record {
                    year: row.year,
                    sub_theme: row.sub_theme,
                    allocation: row.allocation,
                    theme,
                    declared_theme: row.declared_theme,
                    declared_total: row.declared_total,
                }
            })
            .collect::<Vec<_>>();

        let mut notices = schema.notices.clone();
        if issues.missing_year > 0 {
            notices.push(Notice::SkippedRows {
                count: issues.missing_year,
                reason: "no year value".to_string(),
            });
        }
        if issues.missing_sub_theme > 0 {
            notices.push(Notice::SkippedRows {
                count: issues.missing_sub_theme,
                reason: "no sub-theme value".to_string(),
            });
        }
        if issues.invalid_allocations > 0 {
            notices.push(Notice::InvalidAllocations {
                count: issues.invalid_allocations,
            });
        }
        for notice in &notices {
            warn!(sheet = %table.sheet, "{}", notice);
        }
        debug!(
            sheet = %table.sheet,
            sub_theme_column = schema.column_name(schema.sub_theme),
            year_column = schema.column_name(schema.year),
            rows = records.len(),
            strategy = ?strategy,
            "dataset normalized"
        );

        Ok(Self {
            source: None,
            sheet: table.sheet,
            columns: schema.columns,
            records,
            strategy,
            allocation_available: schema.allocation.is_some(),
            notices,
            loaded_at: Utc::now(),
        })
    }

    /// Builds a dataset from records that are already normalized and classified.
    pub fn from_records(records: Vec<Record>, allocation_available: bool) -> Self {
        Self {
            source: None,
            sheet: String::new(),
            columns: Vec::new(),
            records,
            strategy: ClassifierStrategy::Keyword,
            allocation_available,
            notices: Vec::new(),
            loaded_at: Utc::now(),
        }
    }

    pub fn with_source(mut self, source: SourceInfo) -> Self {
        self.source = Some(source);
        self
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn allocation_available(&self) -> bool {
        self.allocation_available
    }

    pub fn strategy(&self) -> ClassifierStrategy {
        self.strategy
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn source(&self) -> Option<&SourceInfo> {
        self.source.as_ref()
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> Vec<Year> {
        let mut years: Vec<Year> = self
            .records
            .iter()
            .map(|record| record.year.clone())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        years.sort();
        years
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            id: self.source.as_ref().map(|s| s.id.clone()),
            path: self
                .source
                .as_ref()
                .map(|s| path_to_forward_slashes(&s.path)),
            sheet: self.sheet.clone(),
            columns: self.columns.clone(),
            rows: self.records.len(),
            years: self.years(),
            strategy: self.strategy,
            allocation_available: self.allocation_available,
            notices: self.notices.clone(),
            loaded_at: self.loaded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Reads and normalizes the dataset described by `options`.
pub fn load_dataset(options: &LoadOptions) -> BudgetResult<Dataset> {
    ensure_extension(&options.path, &options.extensions)?;
    let (info, table) = read_table(&options.path, options.sheet.as_deref())?;
    let dataset = Dataset::from_table(table, &options.normalize)?;
    Ok(dataset.with_source(info))
}

struct ParsedRow {
    year: Year,
    sub_theme: String,
    allocation: Decimal,
    declared_theme: Option<String>,
    declared_total: Option<Decimal>,
}

fn parse_row(
    table: &RawTable,
    row: usize,
    schema: &ResolvedSchema,
    issues: &mut RowIssues,
) -> Option<ParsedRow> {
    let Some(year) = table.cell(row, schema.year).and_then(Year::parse) else {
        issues.missing_year += 1;
        return None;
    };
    let Some(sub_theme) = table.cell(row, schema.sub_theme) else {
        issues.missing_sub_theme += 1;
        return None;
    };

    let allocation = match schema.allocation.and_then(|col| table.cell(row, col)) {
        None => Decimal::ZERO,
        Some(raw) => match parse_amount(raw) {
            Some(amount) if amount.is_zero() => Decimal::ZERO,
            Some(amount) if amount > Decimal::ZERO && amount <= MAX_ALLOCATION => amount,
            _ => {
                issues.invalid_allocations += 1;
                Decimal::ZERO
            }
        },
    };

    Some(ParsedRow {
        year,
        sub_theme: sub_theme.to_string(),
        allocation,
        declared_theme: schema
            .theme
            .and_then(|col| table.cell(row, col))
            .map(str::to_string),
        declared_total: schema
            .theme_total
            .and_then(|col| table.cell(row, col))
            .and_then(parse_amount)
            .filter(|total| total.abs() <= MAX_ALLOCATION),
    })
}

/// Parses an amount cell, tolerating grouping commas, a currency sign and scientific notation.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('₹')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// A declared theme counts only when it names a canonical, non-fallback theme.
fn declared_theme(raw: &str) -> Option<Theme> {
    Theme::from_str(raw.trim())
        .ok()
        .filter(|theme| !theme.is_fallback())
}
