use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "packrat",
    about = "Packrat -- embedded JSON item store",
    version,
)]
pub struct Cli {
    /// Backing file; created on first write if missing
    pub file: PathBuf,

    #[command(subcommand)]
    pub command: Command,

    /// Fsync every log append
    #[arg(long, global = true)]
    pub sync: bool,

    /// Treat id arguments as strings even when they look numeric
    #[arg(long, global = true)]
    pub string_id: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print one item
    Get(IdArgs),
    /// Insert or overwrite an item
    Set(ItemArgs),
    /// Insert an item whose id is not stored yet
    Add(ItemArgs),
    /// Overwrite an existing item
    Update(ItemArgs),
    /// Remove an item
    Drop(IdArgs),
    /// Print every item in insertion order
    List(ListArgs),
    /// Rewrite the file with only the live items
    Compact,
    /// Summarize the file and the loaded store
    Stats,
}

#[derive(Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Args)]
pub struct ItemArgs {
    /// Item as JSON: an object or an array
    pub json: String,
}

#[derive(Args)]
pub struct ListArgs {
    /// Print ids only
    #[arg(long)]
    pub keys: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_get() {
        let cli = Cli::try_parse_from(["packrat", "db.jsonl", "get", "7"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("db.jsonl"));
        if let Command::Get(args) = cli.command {
            assert_eq!(args.id, "7");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_set() {
        let cli = Cli::try_parse_from(["packrat", "db.jsonl", "set", r#"{"name":"rat"}"#]).unwrap();
        if let Command::Set(args) = cli.command {
            assert_eq!(args.json, r#"{"name":"rat"}"#);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_list_keys() {
        let cli = Cli::try_parse_from(["packrat", "db.jsonl", "list", "--keys"]).unwrap();
        if let Command::List(args) = cli.command {
            assert!(args.keys);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_compact() {
        let cli = Cli::try_parse_from(["packrat", "db.jsonl", "compact"]).unwrap();
        assert!(matches!(cli.command, Command::Compact));
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "packrat", "db.jsonl", "drop", "42", "--string-id", "--sync", "--format", "json",
        ])
        .unwrap();
        assert!(cli.string_id);
        assert!(cli.sync);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Command::Drop(_)));
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["packrat", "db.jsonl", "stats"]).unwrap();
        assert!(!cli.sync);
        assert!(!cli.string_id);
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn file_is_required() {
        assert!(Cli::try_parse_from(["packrat", "list"]).is_err());
        assert!(Cli::try_parse_from(["packrat"]).is_err());
    }
}
