use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use statelog_types::ObjectId;

#[derive(Parser)]
#[command(
    name = "statelog",
    about = "statelog — track objects and the history of their states",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// SQLite database file (overrides the config file)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Create an object in the "created" state
    Create,
    /// Change an object's state
    Edit(EditArgs),
    /// Show an object's current state
    Show(ShowArgs),
    /// Show an object's state history
    History(HistoryArgs),
    /// Check that every object's history matches its state
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct EditArgs {
    pub id: ObjectId,
    pub state: String,
}

#[derive(Args)]
pub struct ShowArgs {
    pub id: ObjectId,
}

#[derive(Args)]
pub struct HistoryArgs {
    pub id: ObjectId,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Audit only this object
    pub id: Option<ObjectId>,
}
