use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use practice_core::model::{
    Direction, FeedbackPolicy, KindSet, SessionMode, SessionSettings, WordSet, WordSetId,
};
use services::{Clock, PracticeLoopService};
use storage::http::{ApiConfig, HttpWordSetSource};
use storage::repository::{InMemoryRepository, Storage, WordSetRepository};

mod terminal;

const DEFAULT_DB_URL: &str = "sqlite://practice.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingSource,
    UnknownArg(String),
    InvalidSetId { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidKinds { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingSource => write!(f, "pass --words <file> or --set-id <id>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSetId { raw } => write!(f, "invalid --set-id value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidKinds { raw } => {
                write!(f, "invalid --kinds value: {raw} (expected mc, typing or mc,typing)")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn require_number(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<u32, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber {
            flag,
            raw: value.clone(),
        })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app flashcards <source> [--reverse] [--shuffle] [--limit N] [--review] [--no-delay]");
    eprintln!("  app quiz       <source> [--reverse] [--shuffle] [--limit N] [--time-limit S]");
    eprintln!("                          [--kinds mc,typing] [--no-shuffle-options] [--points N]");
    eprintln!("  app import     --words <file.json> [--db <sqlite_url>]");
    eprintln!("  app list       [--db <sqlite_url> | --api <base_url>]");
    eprintln!();
    eprintln!("Sources:");
    eprintln!("  --words <file.json>             practice a word set from a JSON file");
    eprintln!("  --set-id <id> [--db <url>]      practice a word set stored in SQLite");
    eprintln!("  --set-id <id> --api <base_url>  practice a word set fetched over HTTP");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PRACTICE_DB_URL, PRACTICE_API_URL, PRACTICE_API_TOKEN, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Flashcards,
    Quiz,
    Import,
    List,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "flashcards" => Some(Self::Flashcards),
            "quiz" => Some(Self::Quiz),
            "import" => Some(Self::Import),
            "list" => Some(Self::List),
            _ => None,
        }
    }
}

/// Where the word set comes from.
#[derive(Debug, Clone)]
enum Source {
    File(PathBuf),
    Database { url: String, set_id: WordSetId },
    Api { config: ApiConfig, set_id: WordSetId },
}

/// Source-selection flags shared by every command.
#[derive(Debug, Default)]
struct SourceArgs {
    words: Option<PathBuf>,
    set_id: Option<WordSetId>,
    db: Option<String>,
    api: Option<String>,
}

impl SourceArgs {
    /// Consume `arg` if it is a source flag.
    fn accept(
        &mut self,
        arg: &str,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<bool, ArgsError> {
        match arg {
            "--words" => self.words = Some(PathBuf::from(require_value(args, "--words")?)),
            "--set-id" => {
                let value = require_value(args, "--set-id")?;
                let id = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidSetId { raw: value.clone() })?;
                self.set_id = Some(id);
            }
            "--db" => {
                let value = require_value(args, "--db")?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidDbUrl { raw: value });
                }
                self.db = Some(normalize_sqlite_url(value));
            }
            "--api" => self.api = Some(require_value(args, "--api")?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn api_config(&self) -> Option<ApiConfig> {
        match &self.api {
            Some(base_url) => Some(
                ApiConfig::new(base_url.clone())
                    .with_token(std::env::var("PRACTICE_API_TOKEN").ok()),
            ),
            None if self.db.is_none() => ApiConfig::from_env(),
            None => None,
        }
    }

    fn db_url(&self) -> String {
        self.db.clone().unwrap_or_else(|| {
            std::env::var("PRACTICE_DB_URL")
                .ok()
                .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url)
        })
    }

    /// Flags win over environment; a words file wins over everything.
    fn resolve(self) -> Result<Source, ArgsError> {
        if let Some(path) = self.words {
            return Ok(Source::File(path));
        }
        let set_id = self.set_id.ok_or(ArgsError::MissingSource)?;
        if let Some(config) = self.api_config() {
            return Ok(Source::Api { config, set_id });
        }
        Ok(Source::Database {
            url: self.db_url(),
            set_id,
        })
    }
}

#[derive(Debug)]
struct PracticeArgs {
    source: Source,
    settings: SessionSettings,
    feedback: FeedbackPolicy,
}

impl PracticeArgs {
    fn parse(mode: SessionMode, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut settings = match mode {
            SessionMode::Flashcards => SessionSettings::flashcards(),
            SessionMode::Quiz => SessionSettings::quiz(),
        };
        let mut source = SourceArgs::default();
        let mut feedback = FeedbackPolicy::default();

        while let Some(arg) = args.next() {
            if source.accept(&arg, args)? {
                continue;
            }
            settings = match arg.as_str() {
                "--reverse" => settings.with_direction(Direction::Reverse),
                "--shuffle" => settings.with_shuffle(true),
                "--shuffle-options" => settings.with_shuffle_options(true),
                "--no-shuffle-options" => settings.with_shuffle_options(false),
                "--review" => settings.with_review_incorrect(true),
                "--limit" => settings.with_item_limit(Some(require_number(args, "--limit")?)),
                "--time-limit" => {
                    settings.with_time_limit_secs(Some(require_number(args, "--time-limit")?))
                }
                "--points" => settings.with_points_per_item(require_number(args, "--points")?),
                "--kinds" => {
                    let kinds = parse_kinds(&require_value(args, "--kinds")?)?;
                    settings.with_allowed_kinds(kinds)
                }
                "--no-delay" => {
                    feedback = FeedbackPolicy::immediate();
                    settings
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            };
        }

        Ok(Self {
            source: source.resolve()?,
            settings,
            feedback,
        })
    }
}

fn parse_source_only(args: &mut impl Iterator<Item = String>) -> Result<SourceArgs, ArgsError> {
    let mut source = SourceArgs::default();
    while let Some(arg) = args.next() {
        if source.accept(&arg, args)? {
            continue;
        }
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(source)
}

fn parse_kinds(raw: &str) -> Result<KindSet, ArgsError> {
    let mut kinds = KindSet {
        multiple_choice: false,
        typing: false,
    };
    for part in raw.split(',').map(str::trim) {
        match part {
            "mc" | "multiple-choice" => kinds.multiple_choice = true,
            "typing" | "typed" => kinds.typing = true,
            _ => {
                return Err(ArgsError::InvalidKinds {
                    raw: raw.to_string(),
                });
            }
        }
    }
    Ok(kinds)
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:")
    {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn load_word_set(path: &Path) -> Result<WordSet, Box<dyn std::error::Error>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let set: WordSet = serde_json::from_str(&raw)?;
    log::info!("loaded {} words from {}", set.len(), path.display());
    Ok(set)
}

async fn open_sqlite(url: &str) -> Result<Storage, Box<dyn std::error::Error>> {
    prepare_sqlite_file(url)?;
    Ok(Storage::sqlite(url).await?)
}

/// Open storage for a practice run and return the set to practice.
///
/// File and HTTP sources keep stats in memory for the run only.
async fn open_source(source: Source) -> Result<(Storage, WordSetId), Box<dyn std::error::Error>> {
    match source {
        Source::File(path) => {
            let set = load_word_set(&path).await?;
            let set_id = set.id();
            let repo = InMemoryRepository::with_sets([set]);
            let storage = Storage {
                word_sets: Arc::new(repo.clone()),
                stats: Arc::new(repo),
            };
            Ok((storage, set_id))
        }
        Source::Database { url, set_id } => Ok((open_sqlite(&url).await?, set_id)),
        Source::Api { config, set_id } => {
            let storage = Storage {
                word_sets: Arc::new(HttpWordSetSource::new(config)),
                stats: Arc::new(InMemoryRepository::new()),
            };
            Ok((storage, set_id))
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let report = |e: ArgsError| {
        eprintln!("{e}");
        print_usage();
        e
    };

    match cmd {
        Command::Flashcards | Command::Quiz => {
            let mode = if cmd == Command::Flashcards {
                SessionMode::Flashcards
            } else {
                SessionMode::Quiz
            };
            let parsed = PracticeArgs::parse(mode, &mut argv).map_err(report)?;
            parsed.settings.validate()?;

            let (storage, set_id) = open_source(parsed.source).await?;
            let loop_svc = PracticeLoopService::from_storage(Clock::system(), &storage);
            let session = loop_svc.start(set_id, parsed.settings).await?;
            let summary = terminal::run_session(&loop_svc, session, parsed.feedback).await?;
            terminal::print_summary(&summary);
            Ok(())
        }
        Command::Import => {
            let source = parse_source_only(&mut argv).map_err(report)?;
            let path = source.words.clone().ok_or_else(|| report(ArgsError::MissingValue {
                flag: "--words",
            }))?;
            let set = load_word_set(&path).await?;
            let storage = open_sqlite(&source.db_url()).await?;
            storage.word_sets.upsert_word_set(&set).await?;
            println!("imported {} words into set {} ({})", set.len(), set.id(), set.name());
            Ok(())
        }
        Command::List => {
            let source = parse_source_only(&mut argv).map_err(report)?;
            let word_sets: Arc<dyn WordSetRepository> = match source.api_config() {
                Some(config) => Arc::new(HttpWordSetSource::new(config)),
                None => open_sqlite(&source.db_url()).await?.word_sets,
            };
            for listing in word_sets.list_word_sets().await? {
                println!("{:>6}  {}  ({} words)", listing.id, listing.name, listing.word_count);
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
