use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn test_run_defaults() {
    let cli = Cli::try_parse_from(["scanwatch", "run"]).unwrap();
    assert_eq!(cli.global.config, "scanwatch.yml");
    assert!(!cli.global.verbose);
    match cli.command {
        Commands::Run(args) => {
            assert!(!args.dry_run);
            assert_eq!(args.output, RunOutput::Text);
        }
        other => panic!("expected run, got {other:?}"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "scanwatch",
        "run",
        "--dry-run",
        "--output",
        "json",
        "-v",
        "--config",
        "prod/scanwatch.yml",
    ])
    .unwrap();
    assert!(cli.global.verbose);
    assert_eq!(cli.global.config, "prod/scanwatch.yml");
    match cli.command {
        Commands::Run(args) => {
            assert!(args.dry_run);
            assert_eq!(args.output, RunOutput::Json);
        }
        other => panic!("expected run, got {other:?}"),
    }
}

#[test]
fn test_ls_status_list() {
    let cli = Cli::try_parse_from(["scanwatch", "ls", "--status", "new,recurring"]).unwrap();
    match cli.command {
        Commands::Ls(args) => {
            assert_eq!(args.status, vec![StatusFilter::New, StatusFilter::Recurring]);
            assert_eq!(args.output, LsOutput::Table);
        }
        other => panic!("expected ls, got {other:?}"),
    }
}

#[test]
fn test_resolve_requires_id() {
    assert!(Cli::try_parse_from(["scanwatch", "resolve"]).is_err());
    let cli = Cli::try_parse_from(["scanwatch", "resolve", "3f2a9c"]).unwrap();
    match cli.command {
        Commands::Resolve(args) => assert_eq!(args.query_id, "3f2a9c"),
        other => panic!("expected resolve, got {other:?}"),
    }
}

#[test]
fn test_report_flags() {
    let cli = Cli::try_parse_from(["scanwatch", "report"]).unwrap();
    match cli.command {
        Commands::Report(args) => {
            assert!(!args.all);
            assert_eq!(args.out, None);
        }
        other => panic!("expected report, got {other:?}"),
    }

    let cli = Cli::try_parse_from(["scanwatch", "report", "--all", "--out", "r.html"]).unwrap();
    match cli.command {
        Commands::Report(args) => {
            assert!(args.all);
            assert_eq!(args.out.as_deref(), Some("r.html"));
        }
        other => panic!("expected report, got {other:?}"),
    }
}
