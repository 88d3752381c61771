use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde_json::Value;
use tracing::debug;

use packrat_store::{Collection, Id, Item, Packrat, ReplayStats, StoreConfig, StrictPackrat};

use crate::cli::*;

/// What a command produced, before formatting.
#[derive(Debug)]
pub enum Outcome {
    Item(Item),
    Dropped(Item),
    Items(Vec<Item>),
    Keys(Vec<Id>),
    Compacted { items: usize },
    Stats(Stats),
}

#[derive(Debug)]
pub struct Stats {
    pub file_existed: bool,
    pub records: usize,
    pub tombstones: usize,
    pub items: usize,
    /// `None` once every integer id has been used.
    pub next_id: Option<i64>,
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = if cli.sync {
        StoreConfig::durable()
    } else {
        StoreConfig::default()
    };
    let (db, loaded) = open(&cli.file, config).await?;

    let result = execute(&db, cli.command, cli.string_id, &loaded).await;
    db.flush().await;

    println!("{}", render(&result?, cli.format)?);
    Ok(())
}

async fn open(path: &Path, config: StoreConfig) -> anyhow::Result<(StrictPackrat, ReplayStats)> {
    let db = Packrat::with_config(config).strict();
    let loaded = db
        .load(path)
        .await
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok((db, loaded))
}

pub async fn execute(
    db: &StrictPackrat,
    command: Command,
    string_id: bool,
    loaded: &ReplayStats,
) -> anyhow::Result<Outcome> {
    let outcome = match command {
        Command::Get(args) => Outcome::Item(db.get(parse_id(&args.id, string_id))?),
        Command::Set(args) => Outcome::Item(db.set(parse_item(&args.json)?)?),
        Command::Add(args) => Outcome::Item(db.add(parse_item(&args.json)?)?),
        Command::Update(args) => Outcome::Item(db.update(parse_item(&args.json)?)?),
        Command::Drop(args) => Outcome::Dropped(db.drop(parse_id(&args.id, string_id))?),
        Command::List(args) if args.keys => Outcome::Keys(db.keys()),
        Command::List(_) => Outcome::Items(db.values()),
        Command::Compact => {
            db.save().await.context("failed to compact")?;
            Outcome::Compacted { items: db.len() }
        }
        Command::Stats => Outcome::Stats(Stats {
            file_existed: loaded.file_existed,
            records: loaded.records(),
            tombstones: loaded.tombstones,
            items: db.len(),
            next_id: db.store().next_id(),
        }),
    };
    debug!(?outcome, "command finished");
    Ok(outcome)
}

fn parse_id(raw: &str, string_id: bool) -> Id {
    if string_id {
        return Id::from(raw);
    }
    match raw.parse::<Id>() {
        Ok(id) => id,
        Err(never) => match never {},
    }
}

fn parse_item(raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).context("item argument is not valid JSON")
}

pub fn render(outcome: &Outcome, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(&to_json(outcome))?),
        OutputFormat::Text => Ok(to_text(outcome)),
    }
}

fn to_json(outcome: &Outcome) -> Value {
    match outcome {
        Outcome::Item(item) | Outcome::Dropped(item) => item.to_value(),
        Outcome::Items(items) => Value::Array(items.iter().map(Item::to_value).collect()),
        Outcome::Keys(ids) => Value::Array(ids.iter().map(Id::to_value).collect()),
        Outcome::Compacted { items } => serde_json::json!({ "items": items }),
        Outcome::Stats(s) => serde_json::json!({
            "file_existed": s.file_existed,
            "records": s.records,
            "tombstones": s.tombstones,
            "items": s.items,
            "next_id": s.next_id,
        }),
    }
}

fn to_text(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Item(item) => item_line(item),
        Outcome::Dropped(item) => format!("{} Dropped {}", "✓".green().bold(), item.id().to_string().yellow()),
        Outcome::Items(items) if items.is_empty() => "No items.".to_string(),
        Outcome::Items(items) => items.iter().map(item_line).collect::<Vec<_>>().join("\n"),
        Outcome::Keys(ids) => ids.iter().map(Id::to_string).collect::<Vec<_>>().join("\n"),
        Outcome::Compacted { items } => {
            format!("{} Compacted to {} items", "✓".green().bold(), items.to_string().bold())
        }
        Outcome::Stats(s) => {
            let file = if s.file_existed { "present".green() } else { "new".yellow() };
            [
                format!("File: {file}"),
                format!("Records replayed: {} ({} tombstones)", s.records, s.tombstones),
                format!("Live items: {}", s.items.to_string().bold()),
                match s.next_id {
                    Some(next) => format!("Next id: {}", next.to_string().cyan()),
                    None => format!("Next id: {}", "exhausted".red()),
                },
            ]
            .join("\n")
        }
    }
}

fn item_line(item: &Item) -> String {
    format!("{}  {}", item.id().to_string().yellow().bold(), item.to_value())
}
