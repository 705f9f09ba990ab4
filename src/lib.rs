pub mod analysis;
pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod model;
pub mod state;
pub mod utils;
pub mod view;
pub mod workbook;

pub use config::{CliArgs, OutputFormat, ViewRequest, ViewerConfig};
pub use dataset::{Dataset, DatasetSummary, LoadOptions, NormalizeOptions, load_dataset};
pub use error::{BudgetError, BudgetResult, ErrorCode, Notice, SchemaError};
pub use logging::{LoggingConfig, init_logging};
pub use model::{Breakdown, BreakdownRow, Record, Theme, ThemeSelection, Year};
pub use state::DatasetCache;
pub use view::{ChartSeries, SelectionView, build_view, render_json, render_text};

use anyhow::Result;
use error::ResultExt;

/// Serves one request against the cached dataset and returns the rendered output.
pub fn run_view(
    cache: &DatasetCache,
    config: &ViewerConfig,
    request: &ViewRequest,
) -> Result<String> {
    let _operation = logging::operation_span("run_view").entered();
    let dataset_name = config.dataset.display().to_string();
    let _span = logging::dataset_span(&dataset_name).entered();

    let dataset = match cache.get() {
        Ok(dataset) => dataset,
        Err(error) => {
            let code = error.code();
            tracing::error!(
                error_code = code.code(),
                error_category = code.category(),
                "dataset could not be loaded: {}",
                error
            );
            return Err(error).with_dataset(&config.dataset);
        }
    };

    if request.list_years {
        return render_years(&dataset, config.format);
    }

    let Some(year) = request
        .year
        .clone()
        .or_else(|| dataset.years().into_iter().next())
    else {
        anyhow::bail!("dataset {:?} has no rows with a year", config.dataset);
    };

    let _selection =
        logging::selection_span(&year.to_string(), &request.theme.to_string()).entered();
    let view = build_view(&dataset, &year, request.theme);
    tracing::info!(
        total = %view.total,
        rows = view.rows.len(),
        notices = view.notices.len(),
        "selection aggregated"
    );

    match config.format {
        OutputFormat::Text => Ok(render_text(&view)),
        OutputFormat::Json => render_json(&view).with_operation("render_json"),
    }
}

fn render_years(dataset: &Dataset, format: OutputFormat) -> Result<String> {
    let years = dataset.years();
    match format {
        OutputFormat::Text => Ok(years
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&years).with_operation("render_years")
        }
    }
}
