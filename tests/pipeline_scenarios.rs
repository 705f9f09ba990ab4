mod support;

use assert_matches::assert_matches;
use budget_explorer::analysis::schema::LogicalColumn;
use budget_explorer::analysis::{
    ClassifierStrategy, breakdown_across_themes, breakdown_within_theme, total_for_selection,
};
use budget_explorer::{
    BreakdownRow, BudgetError, DatasetCache, Notice, OutputFormat, Theme, ThemeSelection,
    ViewRequest, Year, build_view, load_dataset, run_view,
};
use rust_decimal::Decimal;
use support::{Cell, TestWorkspace, fill_sheet, scenario_rows};

#[test]
fn agriculture_drill_down_from_workbook() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_dataset(
        "budget.xlsx",
        &["Year", "Sub Theme", "Allocation"],
        &scenario_rows(),
    );
    let dataset = load_dataset(&workspace.config(&path).load_options()).unwrap();
    let year = Year::Numeric(2024);

    assert_eq!(
        total_for_selection(&dataset, &year, Theme::Agriculture),
        Decimal::from(150)
    );
    assert_eq!(
        breakdown_within_theme(&dataset, &year, Theme::Agriculture).rows(),
        &[
            BreakdownRow::new("Crop Insurance", Decimal::from(100)),
            BreakdownRow::new("Irrigation", Decimal::from(50)),
        ]
    );
    assert_eq!(
        breakdown_across_themes(&dataset, &year).sum(),
        Decimal::from(350)
    );
    assert!(dataset.source().is_some_and(|s| s.id.as_str().starts_with("ds-")));
}

#[test]
fn drifted_headers_resolve_through_aliases() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_dataset(
        "drift.xlsx",
        &["YEAR", "Sub-Sector", "Budget Allocation"],
        &[
            vec![2023.into(), "Primary Schools".into(), "1,250".into()],
            vec![2023.into(), "Hospitals".into(), 750.5.into()],
        ],
    );
    let dataset = load_dataset(&workspace.config(&path).load_options()).unwrap();
    let year = Year::Numeric(2023);
    assert!(dataset.allocation_available());
    assert_eq!(
        total_for_selection(&dataset, &year, Theme::Education),
        Decimal::from(1250)
    );
    assert_eq!(
        total_for_selection(&dataset, &year, Theme::Health),
        "750.5".parse::<Decimal>().unwrap()
    );
}

#[test]
fn missing_allocation_column_degrades_to_zero() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_dataset(
        "no-amounts.xlsx",
        &["Year", "Sub Theme"],
        &[
            vec![2024.into(), "Crop Insurance".into()],
            vec![2024.into(), "Irrigation".into()],
        ],
    );
    let dataset = load_dataset(&workspace.config(&path).load_options()).unwrap();
    let view = build_view(
        &dataset,
        &Year::Numeric(2024),
        ThemeSelection::Theme(Theme::Agriculture),
    );

    assert_eq!(view.total, Decimal::ZERO);
    assert!(view.rows.is_empty());
    assert!(!view.empty_selection);
    assert!(view.notices.iter().any(|n| matches!(
        n,
        Notice::MissingOptionalColumn {
            column: LogicalColumn::Allocation,
            ..
        }
    )));
}

#[test]
fn oversized_allocations_do_not_overflow_totals() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_dataset(
        "huge.xlsx",
        &["Year", "Sub Theme", "Allocation"],
        &[
            vec![2024.into(), "Crop Insurance".into(), "50000000000000000000000000000".into()],
            vec![2024.into(), "Irrigation".into(), "50000000000000000000000000000".into()],
            vec![2024.into(), "Irrigation".into(), 25.into()],
        ],
    );
    let dataset = load_dataset(&workspace.config(&path).load_options()).unwrap();

    for selection in [ThemeSelection::All, ThemeSelection::Theme(Theme::Agriculture)] {
        let view = build_view(&dataset, &Year::Numeric(2024), selection);
        assert_eq!(view.total, Decimal::from(25));
        assert_eq!(view.total_display, "25");
        assert!(
            view.notices
                .contains(&Notice::InvalidAllocations { count: 2 })
        );
    }
}

#[test]
fn missing_sub_theme_column_is_a_schema_error() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_dataset(
        "broken.xlsx",
        &["Year", "Description", "Allocation"],
        &[vec![2024.into(), "Crop Insurance".into(), 100.into()]],
    );
    let err = load_dataset(&workspace.config(&path).load_options()).unwrap_err();
    assert!(err.is_schema_error());
    assert_matches!(err, BudgetError::Schema(schema) => {
        assert_eq!(schema.column, LogicalColumn::SubTheme);
        assert!(schema.available.contains(&"Description".to_string()));
    });
}

#[test]
fn first_column_stands_in_for_missing_year() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_dataset(
        "period.xlsx",
        &["Fiscal Year", "Sub Theme", "Amount"],
        &[
            vec!["2024-25".into(), "Railways".into(), 10.into()],
            vec![2023.into(), "Railways".into(), 5.into()],
        ],
    );
    let dataset = load_dataset(&workspace.config(&path).load_options()).unwrap();
    assert_eq!(
        dataset.years(),
        vec![Year::Numeric(2023), Year::Label("2024-25".into())]
    );
    assert!(dataset.notices().contains(&Notice::YearColumnFallback {
        column: "Fiscal_Year".into()
    }));
}

#[test]
fn enumerated_labels_switch_to_exact_strategy() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_dataset(
        "exact.xlsx",
        &["Year", "Sub Theme", "Allocation"],
        &[
            vec![2024.into(), "Medical Education".into(), 40.into()],
            vec![2024.into(), "Railways".into(), 60.into()],
        ],
    );
    let dataset = load_dataset(&workspace.config(&path).load_options()).unwrap();
    assert_eq!(dataset.strategy(), ClassifierStrategy::Exact);
    assert_eq!(
        total_for_selection(&dataset, &Year::Numeric(2024), Theme::Health),
        Decimal::from(40)
    );
}

#[test]
fn named_sheet_is_selected() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_workbook("multi.xlsx", |book| {
        fill_sheet(
            book.get_sheet_mut(&0).unwrap(),
            &["Notes"],
            &[vec!["cover page".into()]],
        );
        let data = book.new_sheet("Data").unwrap();
        fill_sheet(data, &["Year", "Sub Theme", "Allocation"], &scenario_rows());
    });

    let mut config = workspace.config(&path);
    config.sheet = Some("Data".to_string());
    let dataset = load_dataset(&config.load_options()).unwrap();
    assert_eq!(dataset.sheet(), "Data");
    assert_eq!(dataset.len(), 3);

    config.sheet = Some("Missing".to_string());
    let err = load_dataset(&config.load_options()).unwrap_err();
    assert_matches!(err, BudgetError::SheetNotFound { available, .. } => {
        assert!(available.contains(&"Data".to_string()));
    });
}

#[test]
fn run_view_defaults_to_first_year_and_all_themes() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_dataset(
        "budget.xlsx",
        &["Year", "Sub Theme", "Allocation"],
        &[
            vec![2025.into(), "Crop Insurance".into(), 999.into()],
            vec![2024.into(), "Crop Insurance".into(), 12_000.into()],
            vec![2024.into(), "Defence Revenue".into(), 345.into()],
        ],
    );
    let config = workspace.config(&path);
    let cache = DatasetCache::from_config(&config);

    let text = run_view(&cache, &config, &ViewRequest::default()).unwrap();
    assert!(text.starts_with("All Themes Budget - 2024"));
    assert!(text.contains("Total allocation: 12,345"));

    let mut json_config = config.clone();
    json_config.format = OutputFormat::Json;
    let request = ViewRequest {
        year: Some(Year::Numeric(2025)),
        theme: ThemeSelection::Theme(Theme::Agriculture),
        list_years: false,
    };
    let json: serde_json::Value =
        serde_json::from_str(&run_view(&cache, &json_config, &request).unwrap()).unwrap();
    assert_eq!(json["title"], "Agriculture Budget - 2025");
    assert_eq!(json["total_display"], "999");
    assert_eq!(json["chart"]["labels"][0], "Crop Insurance");

    assert_eq!(cache.cache_stats().loads, 1);
}

#[test]
fn list_years_prints_ascending() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_dataset(
        "budget.xlsx",
        &["Year", "Sub Theme", "Allocation"],
        &[
            vec![2025.into(), "Housing".into(), 1.into()],
            vec![2023.into(), "Housing".into(), Cell::Blank],
            vec![2024.into(), "Housing".into(), 1.into()],
        ],
    );
    let config = workspace.config(&path);
    let cache = DatasetCache::from_config(&config);
    let request = ViewRequest {
        list_years: true,
        ..ViewRequest::default()
    };
    assert_eq!(
        run_view(&cache, &config, &request).unwrap(),
        "2023\n2024\n2025"
    );
}

#[test]
fn unreadable_dataset_surfaces_typed_error() {
    let workspace = TestWorkspace::new();
    let path = workspace.path("missing.xlsx");
    let config = workspace.config(&path);
    let err = load_dataset(&config.load_options()).unwrap_err();
    assert_matches!(err, BudgetError::DatasetNotFound { .. });

    let cache = DatasetCache::from_config(&config);
    let err = run_view(&cache, &config, &ViewRequest::default()).unwrap_err();
    assert!(err.to_string().contains("missing.xlsx"));
}
