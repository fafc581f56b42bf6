//! Command-line access to a catalog database.
//!
//! Every subcommand maps to one item operation and prints its result as
//! JSON on stdout.

use anyhow::{bail, Context, Result};
use catalog_core::{
    core_version, default_log_level, init_logging, CatalogConfig, ItemQuery, ItemStore,
    ItemUpdate, NewItem, Track,
};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(version, about = "Inspect and edit a catalog item database")]
struct CliArgs {
    /// SQLite catalog file; overrides `db_path` from the config file.
    #[clap(long)]
    db: Option<PathBuf>,

    /// TOML config file with db_path, log_level, log_dir, busy_timeout_ms.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off when unset.
    #[clap(long)]
    log_dir: Option<PathBuf>,

    #[clap(long)]
    log_level: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one item by id.
    Get { id: String },
    /// Print every item of a catalog category.
    ByCategory { category: String },
    /// Print every item of an artist.
    ByArtist { artist: String },
    /// Print items selected by an id list, optionally inverted and narrowed
    /// to a category.
    List {
        /// Comma separated item ids.
        #[clap(long, value_delimiter = ',')]
        ids: Vec<String>,
        /// Select items whose id is NOT in `--ids`.
        #[clap(long)]
        exclude: bool,
        #[clap(long)]
        category: Option<String>,
    },
    /// Add an item; its id becomes "<artist>-<name>".
    Add {
        #[clap(long)]
        name: String,
        #[clap(long)]
        artist: String,
        #[clap(long)]
        year: i32,
        #[clap(long)]
        category: String,
        /// Initial star rating, 1 to 5.
        #[clap(long)]
        rating: u8,
        #[clap(long)]
        label: Option<String>,
        #[clap(long)]
        description: Option<String>,
        /// Track titles in order; repeat the flag per track.
        #[clap(long = "track")]
        tracks: Vec<String>,
    },
    /// Apply a JSON partial update, e.g. '{"year": 1970, "description": null}'.
    Update { id: String, json: String },
    /// Delete an item and print what was removed.
    Delete { id: String },
    /// Print whether an item exists.
    Exists { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => CatalogConfig::load(path)?,
        None => CatalogConfig::default(),
    };

    if let Some(log_dir) = args.log_dir.as_ref().or(config.log_dir.as_ref()) {
        init_logging(resolve_log_level(&args, &config), log_dir)?;
    }

    let Some(db_path) = args.db.clone().or_else(|| config.db_path.clone()) else {
        bail!("no database given; pass --db or set db_path in the config file");
    };
    let conn = catalog_core::db::open_db_with_timeout(&db_path, config.busy_timeout())
        .with_context(|| format!("failed to open catalog database {}", db_path.display()))?;
    let store = ItemStore::from_connection(conn)?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        core_version()
    );

    run_command(&store, args.command).await
}

/// `--log-level` wins over the config file, which wins over the build default.
fn resolve_log_level<'a>(args: &'a CliArgs, config: &'a CatalogConfig) -> &'a str {
    args.log_level
        .as_deref()
        .or(config.log_level.as_deref())
        .unwrap_or(default_log_level())
}

async fn run_command(store: &ItemStore, command: Command) -> Result<()> {
    match command {
        Command::Get { id } => print_json(&store.get_item(&id).await?),
        Command::ByCategory { category } => {
            print_json(&store.get_items_by_category(&category).await?)
        }
        Command::ByArtist { artist } => print_json(&store.get_items_by_artist(&artist).await?),
        Command::List {
            ids,
            exclude,
            category,
        } => {
            let mut query = if exclude {
                ItemQuery::all().without_ids(ids)
            } else {
                ItemQuery::all().with_ids(ids)
            };
            if let Some(category) = category {
                query = query.in_category(category);
            }
            print_json(&store.find_items(query).await?)
        }
        Command::Add {
            name,
            artist,
            year,
            category,
            rating,
            label,
            description,
            tracks,
        } => {
            let mut new_item = NewItem::new(name, artist, year, category, rating);
            new_item.record_label = label;
            new_item.description = description;
            new_item.tracks = tracks.into_iter().map(Track::new).collect();
            print_json(&store.add_item(new_item).await?)
        }
        Command::Update { id, json } => {
            let update: ItemUpdate =
                serde_json::from_str(&json).context("invalid update document")?;
            print_json(&store.update_item(&id, update).await?)
        }
        Command::Delete { id } => print_json(&store.delete_item(&id).await?),
        Command::Exists { id } => print_json(&store.does_item_exist(&id).await?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{resolve_log_level, run_command, CliArgs, Command};
    use catalog_core::{default_log_level, CatalogConfig, ItemStore, NewItem};
    use clap::Parser;

    #[test]
    fn list_splits_comma_separated_ids() {
        let args = CliArgs::try_parse_from([
            "catalog",
            "--db",
            "/tmp/items.sqlite3",
            "list",
            "--ids",
            "A-One,B-Two",
            "--exclude",
            "--category",
            "Rock",
        ])
        .unwrap();

        match args.command {
            Command::List {
                ids,
                exclude,
                category,
            } => {
                assert_eq!(ids, vec!["A-One".to_string(), "B-Two".to_string()]);
                assert!(exclude);
                assert_eq!(category.as_deref(), Some("Rock"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn add_collects_repeated_tracks() {
        let args = CliArgs::try_parse_from([
            "catalog",
            "add",
            "--name",
            "Abbey Road",
            "--artist",
            "Beatles",
            "--year",
            "1969",
            "--category",
            "Rock",
            "--rating",
            "5",
            "--track",
            "Come Together",
            "--track",
            "Something",
        ])
        .unwrap();

        match args.command {
            Command::Add { tracks, rating, .. } => {
                assert_eq!(tracks, vec!["Come Together", "Something"]);
                assert_eq!(rating, 5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn log_level_flag_overrides_config_then_default() {
        let config = CatalogConfig::from_toml_str("log_level = \"warn\"").unwrap();

        let with_flag =
            CliArgs::try_parse_from(["catalog", "--log-level", "trace", "exists", "x"]).unwrap();
        assert_eq!(resolve_log_level(&with_flag, &config), "trace");

        let without_flag = CliArgs::try_parse_from(["catalog", "exists", "x"]).unwrap();
        assert_eq!(resolve_log_level(&without_flag, &config), "warn");
        assert_eq!(
            resolve_log_level(&without_flag, &CatalogConfig::default()),
            default_log_level()
        );
    }

    #[tokio::test]
    async fn update_command_applies_json_partial_update() {
        let store = ItemStore::open_in_memory().unwrap();
        let mut abbey_road = NewItem::new("Abbey Road", "Beatles", 1969, "Rock", 5);
        abbey_road.description = Some("Last recorded album".to_string());
        store.add_item(abbey_road).await.unwrap();

        let args = CliArgs::try_parse_from([
            "catalog",
            "update",
            "Beatles-Abbey Road",
            r#"{"year": 1970, "description": null}"#,
        ])
        .unwrap();
        run_command(&store, args.command).await.unwrap();

        let item = store.get_item("Beatles-Abbey Road").await.unwrap().unwrap();
        assert_eq!(item.year, 1970);
        assert_eq!(item.description, None);
        assert_eq!(item.item_name, "Abbey Road");
        assert_eq!(item.catalog_category, "Rock");
    }

    #[tokio::test]
    async fn update_command_rejects_unknown_fields() {
        let store = ItemStore::open_in_memory().unwrap();
        store
            .add_item(NewItem::new("Abbey Road", "Beatles", 1969, "Rock", 5))
            .await
            .unwrap();

        let args = CliArgs::try_parse_from([
            "catalog",
            "update",
            "Beatles-Abbey Road",
            r#"{"id": "Beatles-Revolver"}"#,
        ])
        .unwrap();
        let err = run_command(&store, args.command).await.unwrap_err();
        assert!(err.to_string().contains("invalid update document"));

        assert!(store.does_item_exist("Beatles-Abbey Road").await.unwrap());
        assert!(!store.does_item_exist("Beatles-Revolver").await.unwrap());
    }
}
