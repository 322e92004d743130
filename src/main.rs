use clap::Parser;
use guildsnap::cli::{Cli, Command};
use guildsnap::config::Config;
use guildsnap::discord::http::HttpDiscordApi;
use guildsnap::engine::reconstruct::MaterializedSnapshot;
use guildsnap::engine::SnapshotEngine;
use guildsnap::error::Result;
use guildsnap::store::{SnapshotMeta, Store};
use tracing_subscriber::EnvFilter;

fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn kind_label(meta: &SnapshotMeta) -> &'static str {
    match meta.kind {
        guildsnap::store::SnapshotKind::Manual => "manual",
        guildsnap::store::SnapshotKind::Scheduled => "scheduled",
    }
}

fn print_snapshot_table(snapshots: &[SnapshotMeta]) {
    println!(
        "{:<8} {:<20} {:<10} {:<6}",
        "ID", "Date", "Kind", "Pinned"
    );
    println!("{}", "-".repeat(48));
    for snapshot in snapshots {
        println!(
            "{:<8} {:<20} {:<10} {:<6}",
            snapshot.id,
            format_timestamp(snapshot.created_at),
            kind_label(snapshot),
            if snapshot.pinned { "yes" } else { "no" },
        );
    }
}

fn print_snapshot_summary(snapshot: &MaterializedSnapshot) {
    println!(
        "snapshot: {} ({})",
        snapshot.meta.id,
        format_timestamp(snapshot.meta.created_at)
    );
    println!("guild: {}", snapshot.meta.guild_id);
    println!("kind: {}", kind_label(&snapshot.meta));
    println!("pinned: {}", if snapshot.meta.pinned { "yes" } else { "no" });
    println!();
    println!("channels:   {}", snapshot.channels.len());
    println!("roles:      {}", snapshot.roles.len());
    println!("overwrites: {}", snapshot.overwrites.len());
    println!("bans:       {}", snapshot.bans.len());
}

fn open_store(config: &Config) -> Result<Store> {
    match &config.db_path {
        Some(path) => Store::open_at(path),
        None => Store::open(),
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let store = open_store(&config)?;

    match cli.command {
        Command::Create(args) => {
            let api = HttpDiscordApi::new(config.require_token()?.to_string());
            let mut engine = SnapshotEngine::with_options(store, api, config.engine.clone());

            let id = engine.create_snapshot(&args.guild_id, args.kind.into())?;
            let counts = engine.generation_counts(id)?;

            println!("created snapshot {id}");
            println!(
                "deltas: {} ({} channels, {} roles, {} overwrites, {} bans)",
                counts.total(),
                counts.channels,
                counts.roles,
                counts.overwrites,
                counts.bans,
            );
        }
        Command::Fetch(args) => {
            let mut engine =
                SnapshotEngine::with_options(store, NoApi, config.engine.clone());
            let snapshot = engine.fetch_snapshot(args.id)?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_snapshot_summary(&snapshot);
            }
        }
        Command::List(args) => {
            let mut engine =
                SnapshotEngine::with_options(store, NoApi, config.engine.clone());
            let snapshots = engine.list_snapshots(&args.guild_id)?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&snapshots)?);
            } else if snapshots.is_empty() {
                println!(
                    "No snapshots for guild {}. Run 'guildsnap create' first.",
                    args.guild_id
                );
            } else {
                print_snapshot_table(&snapshots);
            }
        }
        Command::Pin(args) => {
            let mut engine =
                SnapshotEngine::with_options(store, NoApi, config.engine.clone());
            let meta = engine.pin_snapshot(args.id, !args.unpin)?;
            println!(
                "snapshot {} is now {}",
                meta.id,
                if meta.pinned { "pinned" } else { "unpinned" }
            );
        }
        Command::Delete(args) => {
            let mut engine =
                SnapshotEngine::with_options(store, NoApi, config.engine.clone());
            engine.delete_snapshot(args.id)?;
            println!("deleted snapshot {}", args.id);
        }
    }

    Ok(())
}

/// Local-only commands never reach Discord.
struct NoApi;

impl guildsnap::discord::DiscordApi for NoApi {
    fn fetch_guild(&self, _: &str) -> Result<guildsnap::discord::LiveGuild> {
        unreachable!("local command")
    }
    fn fetch_channels(&self, _: &str) -> Result<Vec<guildsnap::discord::LiveChannel>> {
        unreachable!("local command")
    }
    fn fetch_member(&self, _: &str, _: &str) -> Result<guildsnap::discord::LiveMember> {
        unreachable!("local command")
    }
    fn fetch_bans_page(
        &self,
        _: &str,
        _: Option<&str>,
    ) -> Result<Vec<guildsnap::discord::LiveBan>> {
        unreachable!("local command")
    }
    fn bot_user_id(&self) -> Result<String> {
        unreachable!("local command")
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
