use budget_explorer::{
    CliArgs, DatasetCache, LoggingConfig, ViewRequest, ViewerConfig, init_logging, run_view,
};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env();
    let _guard = init_logging(logging_config)?;

    let cli = CliArgs::parse();
    let request = ViewRequest::from_args(&cli);
    let config = ViewerConfig::from_args(cli)?;

    // Validate configuration before touching the workbook (fail-fast)
    config.validate()?;

    let cache = DatasetCache::from_config(&config);
    let output = run_view(&cache, &config, &request)?;
    println!("{output}");
    Ok(())
}
