use clap::{Parser, Subcommand, ValueEnum};

use crate::store::SnapshotKind;

#[derive(Parser)]
#[command(name = "guildsnap")]
#[command(about = "Delta-chained configuration snapshots for Discord guilds")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Capture the guild's current configuration as a new snapshot
    Create(CreateArgs),

    /// Reconstruct and display the full state of a snapshot
    Fetch(FetchArgs),

    /// List a guild's snapshots, newest first
    List(ListArgs),

    /// Pin or unpin a snapshot
    Pin(PinArgs),

    /// Delete a snapshot, merging its deltas forward if needed
    Delete(DeleteArgs),
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Manual,
    Scheduled,
}

impl From<KindArg> for SnapshotKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Manual => SnapshotKind::Manual,
            KindArg::Scheduled => SnapshotKind::Scheduled,
        }
    }
}

#[derive(Parser)]
pub struct CreateArgs {
    /// Guild id to capture
    pub guild_id: String,

    /// How this capture was triggered
    #[arg(long, value_enum, default_value_t = KindArg::Manual)]
    pub kind: KindArg,
}

#[derive(Parser)]
pub struct FetchArgs {
    /// Snapshot id to reconstruct
    pub id: i64,

    /// Output as JSON instead of a summary
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ListArgs {
    /// Guild id to list snapshots for
    pub guild_id: String,

    /// Output as JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct PinArgs {
    /// Snapshot id to pin
    pub id: i64,

    /// Remove the pin instead
    #[arg(long, default_value_t = false)]
    pub unpin: bool,
}

#[derive(Parser)]
pub struct DeleteArgs {
    /// Snapshot id to delete
    pub id: i64,
}
