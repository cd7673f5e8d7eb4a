use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};
use shelfmark_api_types::Genre;
use time::Date;
use time::macros::format_description;

/// Command-line arguments for the shelfmark binary.
#[derive(Debug, Parser)]
#[command(name = "shelfmark", version, about = "Library catalog client")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SHELFMARK_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the catalog API base URL.
    #[arg(long = "base-url", value_name = "URL", value_hint = ValueHint::Url, global = true)]
    pub base_url: Option<String>,

    /// Override the request timeout.
    #[arg(long = "timeout-seconds", value_name = "SECONDS", global = true)]
    pub timeout_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Book records (list/get/add/update/delete)
    Books(BooksArgs),
    /// Borrow copies of a book
    Borrow(BorrowArgs),
    /// Total borrowed quantity per book
    Summary(SummaryArgs),
}

#[derive(Debug, Args, Clone)]
pub struct BooksArgs {
    #[command(subcommand)]
    pub action: BooksCmd,
}

#[derive(Debug, Subcommand, Clone)]
pub enum BooksCmd {
    /// List every book in the catalog
    List {
        /// Print raw JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Show one book
    Get { id: String },
    /// Add a book
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        genre: GenreArg,
        #[arg(long)]
        isbn: String,
        #[arg(long)]
        copies: u32,
        #[arg(long)]
        description: Option<String>,
    },
    /// Change selected fields of a book
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        genre: Option<GenreArg>,
        #[arg(long)]
        isbn: Option<String>,
        #[arg(long)]
        copies: Option<u32>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Remove the description.
        #[arg(long)]
        clear_description: bool,
    },
    /// Delete a book
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Args, Clone)]
pub struct BorrowArgs {
    pub book_id: String,

    #[arg(long)]
    pub quantity: u32,

    /// Due date as YYYY-MM-DD; defaults to two weeks from today.
    #[arg(long = "due-date", value_name = "DATE", value_parser = parse_calendar_date)]
    pub due_date: Option<Date>,
}

#[derive(Debug, Args, Clone, Default)]
pub struct SummaryArgs {
    /// Print raw JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum GenreArg {
    Fiction,
    NonFiction,
    Science,
    History,
    Biography,
    Fantasy,
}

impl From<GenreArg> for Genre {
    fn from(value: GenreArg) -> Self {
        match value {
            GenreArg::Fiction => Genre::Fiction,
            GenreArg::NonFiction => Genre::NonFiction,
            GenreArg::Science => Genre::Science,
            GenreArg::History => Genre::History,
            GenreArg::Biography => Genre::Biography,
            GenreArg::Fantasy => Genre::Fantasy,
        }
    }
}

fn parse_calendar_date(value: &str) -> Result<Date, String> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}
