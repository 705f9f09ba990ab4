use crate::analysis::classification::{ClassifierStrategy, Taxonomy};
use crate::dataset::{LoadOptions, NormalizeOptions};
use crate::model::{Theme, ThemeSelection, Year};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_EXTENSIONS: &[&str] = &["xlsx", "xlsm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub dataset: PathBuf,
    pub sheet: Option<String>,
    pub strategy: ClassifierStrategy,
    pub keyword_overrides: BTreeMap<Theme, Vec<String>>,
    pub supported_extensions: Vec<String>,
    pub format: OutputFormat,
}

/// What the user asked to see. Unset fields fall back to the first year and `All`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewRequest {
    pub year: Option<Year>,
    pub theme: ThemeSelection,
    pub list_years: bool,
}

impl ViewRequest {
    pub fn from_args(args: &CliArgs) -> Self {
        Self {
            year: args.year.clone(),
            theme: args.theme.unwrap_or_default(),
            list_years: args.list_years,
        }
    }
}

impl ViewerConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            dataset: cli_dataset,
            sheet: cli_sheet,
            strategy: cli_strategy,
            extensions: cli_extensions,
            format: cli_format,
            ..
        } = args;

        let (file_config, config_dir) = if let Some(path) = config.as_ref() {
            (
                load_config_file(path)?,
                path.parent().map(Path::to_path_buf),
            )
        } else {
            (PartialConfig::default(), None)
        };

        let PartialConfig {
            dataset: file_dataset,
            sheet: file_sheet,
            strategy: file_strategy,
            keywords: file_keywords,
            extensions: file_extensions,
            format: file_format,
        } = file_config;

        let file_dataset = file_dataset.map(|path| match config_dir.as_ref() {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path,
        });
        let dataset = cli_dataset
            .or(file_dataset)
            .context("no dataset configured; pass --dataset or set `dataset` in the config file")?;

        let mut supported_extensions = cli_extensions
            .or(file_extensions)
            .unwrap_or_else(|| {
                DEFAULT_EXTENSIONS
                    .iter()
                    .map(|ext| (*ext).to_string())
                    .collect()
            })
            .into_iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect::<Vec<_>>();

        supported_extensions.sort();
        supported_extensions.dedup();

        anyhow::ensure!(
            !supported_extensions.is_empty(),
            "at least one file extension must be provided"
        );

        Ok(Self {
            dataset,
            sheet: cli_sheet.or(file_sheet).filter(|s| !s.trim().is_empty()),
            strategy: cli_strategy.or(file_strategy).unwrap_or_default(),
            keyword_overrides: file_keywords.unwrap_or_default(),
            supported_extensions,
            format: cli_format.or(file_format).unwrap_or_default(),
        })
    }

    /// Fails fast on a missing dataset, a disallowed extension or an empty keyword override.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.dataset.exists(),
            "configured dataset {:?} does not exist",
            self.dataset
        );
        anyhow::ensure!(
            self.dataset.is_file(),
            "configured dataset {:?} is not a file",
            self.dataset
        );
        let allowed = self
            .dataset
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .map(|ext| self.supported_extensions.contains(&ext))
            .unwrap_or(false);
        anyhow::ensure!(
            allowed,
            "configured dataset {:?} does not match allowed extensions {:?}",
            self.dataset,
            self.supported_extensions
        );
        for (theme, keywords) in &self.keyword_overrides {
            anyhow::ensure!(
                keywords.iter().any(|k| !k.trim().is_empty()),
                "keyword override for {theme} is empty"
            );
        }
        Ok(())
    }

    pub fn taxonomy(&self) -> Taxonomy {
        Taxonomy::builtin().with_keyword_overrides(&self.keyword_overrides)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            path: self.dataset.clone(),
            sheet: self.sheet.clone(),
            extensions: self.supported_extensions.clone(),
            normalize: NormalizeOptions {
                strategy: self.strategy,
                taxonomy: self.taxonomy(),
            },
        }
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "budget-explorer",
    about = "Explore budget allocations by year and theme",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "BUDGET_EXPLORER_DATASET",
        value_name = "FILE",
        help = "Budget workbook to load"
    )]
    pub dataset: Option<PathBuf>,

    #[arg(
        long,
        env = "BUDGET_EXPLORER_SHEET",
        value_name = "NAME",
        help = "Sheet holding the dataset (defaults to the first sheet)"
    )]
    pub sheet: Option<String>,

    #[arg(long, value_name = "YEAR", help = "Year to show (defaults to the earliest)")]
    pub year: Option<Year>,

    #[arg(
        long,
        value_name = "THEME",
        help = "Theme to drill into, or All for the cross-theme view"
    )]
    pub theme: Option<ThemeSelection>,

    #[arg(long, help = "Print the distinct years in the dataset and exit")]
    pub list_years: bool,

    #[arg(
        long,
        env = "BUDGET_EXPLORER_STRATEGY",
        value_enum,
        value_name = "STRATEGY",
        help = "Sub-theme classification strategy"
    )]
    pub strategy: Option<ClassifierStrategy>,

    #[arg(
        long,
        env = "BUDGET_EXPLORER_EXTENSIONS",
        value_name = "EXT",
        value_delimiter = ',',
        help = "Comma-separated list of allowed workbook extensions"
    )]
    pub extensions: Option<Vec<String>>,

    #[arg(
        long,
        env = "BUDGET_EXPLORER_FORMAT",
        value_enum,
        value_name = "FORMAT",
        help = "Output format"
    )]
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    dataset: Option<PathBuf>,
    sheet: Option<String>,
    strategy: Option<ClassifierStrategy>,
    keywords: Option<BTreeMap<Theme, Vec<String>>>,
    extensions: Option<Vec<String>>,
    format: Option<OutputFormat>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
