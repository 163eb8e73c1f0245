use anyhow::Context;
use colored::Colorize;
use serde_json::json;
use statelog_server::{ServerConfig, StatelogServer};
use statelog_store::{AuditReport, HistoryAuditor, ObjectStore, SqliteObjectStore};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Create => cmd_create(&open_store(&config)?, &cli.format),
        Command::Edit(args) => cmd_edit(&open_store(&config)?, args, &cli.format),
        Command::Show(args) => cmd_show(&open_store(&config)?, args, &cli.format),
        Command::History(args) => cmd_history(&open_store(&config)?, args, &cli.format),
        Command::Verify(args) => cmd_verify(&open_store(&config)?, args, &cli.format),
    }
}

/// Config file (if any), then `--database` on top.
fn resolve_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(database) = &cli.database {
        config.store.path = database.clone();
    }
    tracing::debug!(database = %config.store.path.display(), "resolved configuration");
    Ok(config)
}

fn open_store(config: &ServerConfig) -> anyhow::Result<SqliteObjectStore> {
    SqliteObjectStore::open(&config.store)
        .with_context(|| format!("opening {}", config.store.path.display()))
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    let server = StatelogServer::open(config)?;
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_create(store: &SqliteObjectStore, format: &OutputFormat) -> anyhow::Result<()> {
    let id = store.create_object()?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "id": id })),
        OutputFormat::Text => println!(
            "{} Created object {}",
            "✓".green().bold(),
            id.to_string().bold()
        ),
    }
    Ok(())
}

fn cmd_edit(
    store: &SqliteObjectStore,
    args: EditArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let entry = store.update_object_state_text(args.id, &args.state)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&entry)?),
        OutputFormat::Text => println!(
            "{} Object {} is now {} (change {})",
            "✓".green().bold(),
            args.id.to_string().bold(),
            entry.state.as_str().yellow(),
            entry.change_id
        ),
    }
    Ok(())
}

fn cmd_show(
    store: &SqliteObjectStore,
    args: ShowArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let object = store.get_object(args.id)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&object)?),
        OutputFormat::Text => println!(
            "Object {}: {}",
            object.id.to_string().bold(),
            object.state.as_str().yellow()
        ),
    }
    Ok(())
}

fn cmd_history(
    store: &SqliteObjectStore,
    args: HistoryArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let history = store.get_object_history(args.id)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&history)?),
        OutputFormat::Text => {
            println!("History of object {}", args.id.to_string().bold());
            for entry in &history {
                println!(
                    "  {:>6}  {}  {}",
                    entry.change_id.to_string().cyan(),
                    entry.timestamp.to_string().dimmed(),
                    entry.state.as_str().yellow()
                );
            }
        }
    }
    Ok(())
}

fn cmd_verify(
    store: &SqliteObjectStore,
    args: VerifyArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let reports = match args.id {
        Some(id) => vec![HistoryAuditor::audit_object(store, id)?],
        None => HistoryAuditor::audit_all(store)?,
    };
    let summary = store.integrity_summary()?;
    let failed: Vec<&AuditReport> = reports.iter().filter(|r| !r.is_valid()).collect();

    match format {
        OutputFormat::Json => {
            let objects: Vec<_> = reports
                .iter()
                .map(|r| {
                    let violations: Vec<&str> =
                        r.violations.iter().map(|v| v.description.as_str()).collect();
                    json!({
                        "id": r.object_id,
                        "entries": r.entry_count,
                        "violations": violations,
                    })
                })
                .collect();
            println!(
                "{}",
                json!({
                    "objects": objects,
                    "orphaned_entries": summary.orphaned_entries,
                    "objects_without_history": summary.objects_without_history,
                })
            );
        }
        OutputFormat::Text => {
            for report in &failed {
                println!(
                    "{} object {}",
                    "✗".red().bold(),
                    report.object_id.to_string().bold()
                );
                for violation in &report.violations {
                    println!("    {:?}: {}", violation.kind, violation.description);
                }
            }
            if summary.orphaned_entries > 0 {
                println!(
                    "{} {} history entries reference missing objects",
                    "✗".red().bold(),
                    summary.orphaned_entries
                );
            }
            if failed.is_empty() && summary.is_consistent() {
                println!(
                    "{} {} objects, {} history entries, no issues.",
                    "✓".green().bold(),
                    reports.len(),
                    summary.history_entries
                );
            }
        }
    }

    if !failed.is_empty() || !summary.is_consistent() {
        anyhow::bail!(
            "{} inconsistent objects, {} orphaned history entries",
            failed.len(),
            summary.orphaned_entries
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::Parser;
    use statelog_types::ObjectId;

    use super::*;

    fn run(db: &Path, args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["statelog", "--database", db.to_str().unwrap()];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn local_commands_share_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("cli.db");

        run(&db, &["create"]).unwrap();
        run(&db, &["edit", "1", "shipped"]).unwrap();
        run(&db, &["show", "1"]).unwrap();
        run(&db, &["--format", "json", "history", "1"]).unwrap();
        run(&db, &["verify"]).unwrap();

        let store = SqliteObjectStore::open(&statelog_store::StoreConfig::at(&db)).unwrap();
        let history = store.get_object_history(ObjectId::new(1).unwrap()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].state.as_str(), "shipped");
    }

    #[test]
    fn unknown_object_fails() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("cli.db");

        assert!(run(&db, &["edit", "7", "x"]).is_err());
        assert!(run(&db, &["history", "7"]).is_err());
        assert!(run(&db, &["verify", "7"]).is_err());
    }

    #[test]
    fn empty_state_fails_but_blank_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("cli.db");

        run(&db, &["create"]).unwrap();
        assert!(run(&db, &["edit", "1", ""]).is_err());
        run(&db, &["edit", "1", " "]).unwrap();

        let store = SqliteObjectStore::open(&statelog_store::StoreConfig::at(&db)).unwrap();
        let history = store.get_object_history(ObjectId::new(1).unwrap()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].state.as_str(), " ");
    }

    #[test]
    fn config_file_sets_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("from-config.db");
        let config = dir.path().join("statelog.toml");
        std::fs::write(
            &config,
            format!(
                "[store]\npath = {:?}\njournal_mode = \"delete\"\n",
                db.to_str().unwrap()
            ),
        )
        .unwrap();

        let argv = ["statelog", "--config", config.to_str().unwrap(), "create"];
        run_command(Cli::try_parse_from(argv).unwrap()).unwrap();
        assert!(db.exists());
    }
}
