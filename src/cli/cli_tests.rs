//! Tests for CLI argument parsing.

use super::*;
use clap::{CommandFactory, Parser};

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_parse_two_positionals() {
    let cli = Cli::try_parse_from(["xrefcheck", "Game.json", "xref_data.json"]).unwrap();
    assert!(cli.command.is_none());
    assert_eq!(cli.reconcile.metadata.unwrap().to_str(), Some("Game.json"));
    assert_eq!(cli.reconcile.dump.unwrap().to_str(), Some("xref_data.json"));
    assert_eq!(cli.reconcile.output.to_str(), Some(xrefcheck::DEFAULT_REPORT_NAME));
    assert_eq!(cli.log_level, "warn");
}

#[test]
fn test_parse_output_and_aliases() {
    let cli = Cli::try_parse_from([
        "xrefcheck", "Game.json", "xref_data.json", "-o", "out.json", "--aliases", "aliases.json",
        "--log-level", "debug",
    ])
    .unwrap();
    assert_eq!(cli.reconcile.output.to_str(), Some("out.json"));
    assert_eq!(cli.reconcile.aliases.unwrap().to_str(), Some("aliases.json"));
    assert_eq!(cli.log_level, "debug");
}

#[test]
fn test_wrong_argument_count_rejected() {
    assert!(Cli::try_parse_from(["xrefcheck"]).is_err());
    assert!(Cli::try_parse_from(["xrefcheck", "Game.json"]).is_err());
    assert!(Cli::try_parse_from(["xrefcheck", "a.json", "b.json", "c.json"]).is_err());
}

#[test]
fn test_patches_subcommand() {
    let cli = Cli::try_parse_from(["xrefcheck", "patches", "Mod.json"]).unwrap();
    match cli.command {
        Some(Commands::Patches(args)) => assert_eq!(args.metadata.to_str(), Some("Mod.json")),
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_parse_log_level() {
    assert_eq!(parse_log_level("debug"), tracing::Level::DEBUG);
    assert_eq!(parse_log_level("error"), tracing::Level::ERROR);
    assert_eq!(parse_log_level("bogus"), tracing::Level::WARN);
}

#[test]
fn test_cmd_reconcile_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let metadata = dir.path().join("Game.json");
    let dump = dir.path().join("xref_data.json");
    let output = dir.path().join("report.json");
    std::fs::write(&metadata, r#"{ "types": [ { "fullName": "M", "methods": [ { "name": "F", "body": [] } ] } ] }"#).unwrap();
    std::fs::write(&dump, "{}").unwrap();
    let args = ReconcileArgs {
        metadata: Some(metadata),
        dump: Some(dump),
        output: output.clone(),
        aliases: None,
    };
    cmd_reconcile(args).unwrap();
    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(report["M::F(void)"]["Tags"], serde_json::json!(["stripped"]));
}

#[test]
fn test_cmd_reconcile_missing_file_no_report() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("report.json");
    let args = ReconcileArgs {
        metadata: Some(dir.path().join("nope.json")),
        dump: Some(dir.path().join("nope2.json")),
        output: output.clone(),
        aliases: None,
    };
    assert!(matches!(cmd_reconcile(args), Err(XrefError::InputNotFound(_))));
    assert!(!output.exists());
}
