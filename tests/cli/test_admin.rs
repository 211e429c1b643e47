//! Tests for the administration CLI commands
//!
//! Covers swap, rebuild, aliases, check and show-config.

use crate::cli::test_helpers::{create_cli_test_services, records_file, seed_target};
use crate::common::{locations, sample_records};
use metaportal::cli::commands::alias::{execute_list, execute_swap, AliasesArgs, SwapArgs};
use metaportal::cli::commands::check::{self, CheckArgs};
use metaportal::cli::commands::config::{self, ConfigArgs};
use metaportal::cli::commands::rebuild::{self, RebuildArgs};
use metaportal::cli::OutputFormat;
use metaportal::core::storage::IndexStore;
use std::io::Write;
use std::path::PathBuf;

#[tokio::test]
async fn test_rebuild_from_records_file() {
    let (services, _storage_temp) = create_cli_test_services();
    let file = records_file(&sample_records("atoll", 3));

    let args = RebuildArgs {
        target: "main".to_string(),
        records: file.path().to_path_buf(),
    };
    let result = rebuild::execute(args, &services, OutputFormat::Human).await;
    assert!(result.is_ok(), "Rebuild should succeed: {:?}", result.err());

    let entry = services.aliases.resolve("main").unwrap();
    assert_eq!(entry.locations(), locations(&["main_v1"]));
    assert_eq!(entry.handles()[0].doc_count(), 3);
}

#[tokio::test]
async fn test_rebuild_bad_records_file() {
    let (services, _storage_temp) = create_cli_test_services();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{{ not a record").unwrap();

    let args = RebuildArgs {
        target: "main".to_string(),
        records: file.path().to_path_buf(),
    };
    let result = rebuild::execute(args, &services, OutputFormat::Json).await;
    assert!(result.is_err());
    assert!(services.aliases.targets().is_empty());

    let args = RebuildArgs {
        target: "main".to_string(),
        records: PathBuf::from("/nonexistent/records.jsonl"),
    };
    assert!(rebuild::execute(args, &services, OutputFormat::Json).await.is_err());
}

#[tokio::test]
async fn test_swap_and_list() {
    let (services, _storage_temp) = create_cli_test_services();
    services
        .store
        .build("north", &sample_records("north", 2))
        .unwrap();
    services
        .store
        .build("south", &sample_records("south", 1))
        .unwrap();

    let args = SwapArgs {
        target: "coast".to_string(),
        locations: locations(&["north", "south"]),
    };
    let result = execute_swap(args, &services, OutputFormat::Human).await;
    assert!(result.is_ok(), "Swap should succeed: {:?}", result.err());
    assert_eq!(
        services.aliases.resolve("coast").unwrap().locations(),
        locations(&["north", "south"])
    );

    for format in [OutputFormat::Human, OutputFormat::Json] {
        let result = execute_list(AliasesArgs {}, &services, format).await;
        assert!(result.is_ok(), "Listing should succeed: {:?}", result.err());
    }
}

#[tokio::test]
async fn test_swap_to_missing_index_fails() {
    let (services, _storage_temp) = create_cli_test_services();
    seed_target(&services, "main", &sample_records("atoll", 1));

    let args = SwapArgs {
        target: "main".to_string(),
        locations: locations(&["missing"]),
    };
    let result = execute_swap(args, &services, OutputFormat::Human).await;
    assert!(result.is_err());
    assert_eq!(
        services.aliases.resolve("main").unwrap().locations(),
        locations(&["main_v1"])
    );
}

#[tokio::test]
async fn test_list_without_targets() {
    let (services, _storage_temp) = create_cli_test_services();
    let result = execute_list(AliasesArgs {}, &services, OutputFormat::Human).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_check_healthy_indexes() {
    let (services, _storage_temp) = create_cli_test_services();
    seed_target(&services, "main", &sample_records("atoll", 2));
    services
        .store
        .build("spare", &sample_records("spare", 2))
        .unwrap();

    let args = CheckArgs {
        locations: locations(&["*"]),
        fix: false,
    };
    let result = check::execute(args, &services, OutputFormat::Json).await;
    assert!(result.is_ok(), "Check should succeed: {:?}", result.err());
}

#[tokio::test]
async fn test_check_unknown_location_is_unhealthy() {
    let (services, _storage_temp) = create_cli_test_services();

    let args = CheckArgs {
        locations: locations(&["ghost"]),
        fix: true,
    };
    let result = check::execute(args, &services, OutputFormat::Human).await;
    let err = result.expect_err("Missing index should be reported");
    assert!(err.to_string().contains("1 index(es) unhealthy"));
}

#[tokio::test]
async fn test_check_fix_refused_for_served_index() {
    let (services, _storage_temp) = create_cli_test_services();
    seed_target(&services, "main", &sample_records("atoll", 2));

    let args = CheckArgs {
        locations: locations(&["main_v1"]),
        fix: true,
    };
    let result = check::execute(args, &services, OutputFormat::Human).await;
    assert!(result.is_err(), "Repair of a served index must be refused");
}

#[tokio::test]
async fn test_show_config() {
    let (services, _storage_temp) = create_cli_test_services();

    for all in [false, true] {
        let result = config::execute(ConfigArgs { all }, &services, OutputFormat::Human).await;
        assert!(result.is_ok());
    }
    let result = config::execute(ConfigArgs { all: true }, &services, OutputFormat::Json).await;
    assert!(result.is_ok());
}
