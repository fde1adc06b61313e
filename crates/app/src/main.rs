use std::fmt;
use std::path::PathBuf;

use sensei_core::Belt;
use sensei_core::model::{Identity, TopicId};
use services::{AppServices, Clock, HintRequest, ServicesConfig, SyncOutcome};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidAnswer { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidAnswer { raw } => write!(f, "invalid answer in --answers: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- status [options]");
    eprintln!("  cargo run -p app -- quiz   --topic <id> --answers <i,i,-,...> [options]");
    eprintln!("  cargo run -p app -- reset  [options]");
    eprintln!("  cargo run -p app -- sync   --user <id> --db <sqlite_url> [options]");
    eprintln!("  cargo run -p app -- hint   --topic <id> [--question <n>] [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --cache <path>     local cache file (default sensei-cache.json)");
    eprintln!("  --db <sqlite_url>  remote progress database");
    eprintln!("  --user <id>        signed-in user id");
    eprintln!("  --catalog <path>   questions JSON");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SENSEI_CACHE_PATH, SENSEI_DB_URL, SENSEI_USER_ID, SENSEI_CATALOG,");
    eprintln!("  SENSEI_HINT_API_KEY, SENSEI_HINT_BASE_URL, SENSEI_HINT_MODEL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Quiz,
    Reset,
    Sync,
    Hint,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "quiz" => Some(Self::Quiz),
            "reset" => Some(Self::Reset),
            "sync" => Some(Self::Sync),
            "hint" => Some(Self::Hint),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    config_overrides: Overrides,
    topic: Option<TopicId>,
    answers: Option<Vec<Option<usize>>>,
    question: usize,
}

#[derive(Debug, Default)]
struct Overrides {
    cache_path: Option<PathBuf>,
    db_url: Option<String>,
    user: Option<String>,
    catalog_path: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, mut config: ServicesConfig) -> ServicesConfig {
        if let Some(path) = self.cache_path {
            config = config.with_cache_path(path);
        }
        if let Some(url) = self.db_url {
            config = config.with_db_url(url);
        }
        if let Some(user) = self.user {
            config = config.with_identity(Identity::from_optional(Some(&user)));
        }
        if let Some(path) = self.catalog_path {
            config = config.with_catalog_path(path);
        }
        config
    }
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--cache" => {
                    parsed.config_overrides.cache_path =
                        Some(PathBuf::from(require_value(args, "--cache")?));
                }
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.config_overrides.db_url = Some(value);
                }
                "--user" => parsed.config_overrides.user = Some(require_value(args, "--user")?),
                "--catalog" => {
                    parsed.config_overrides.catalog_path =
                        Some(PathBuf::from(require_value(args, "--catalog")?));
                }
                "--topic" => parsed.topic = Some(TopicId::new(require_value(args, "--topic")?)),
                "--answers" => {
                    parsed.answers = Some(parse_answers(&require_value(args, "--answers")?)?);
                }
                "--question" => {
                    let value = require_value(args, "--question")?;
                    parsed.question = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidAnswer { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn topic(&self) -> Result<&TopicId, ArgsError> {
        self.topic
            .as_ref()
            .ok_or(ArgsError::MissingFlag { flag: "--topic" })
    }
}

/// `0,2,-,1`: choice indices, `-` or `_` for an unanswered question.
fn parse_answers(raw: &str) -> Result<Vec<Option<usize>>, ArgsError> {
    raw.split(',')
        .map(str::trim)
        .map(|item| match item {
            "-" | "_" | "" => Ok(None),
            index => index.parse().map(Some).map_err(|_| ArgsError::InvalidAnswer {
                raw: index.to_string(),
            }),
        })
        .collect()
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
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

fn print_status(services: &AppServices) {
    let progress = services.progress();
    let points = progress.points();
    let belt = Belt::for_points(points);
    println!("Points: {points}");
    match Belt::points_to_next(points) {
        Some(missing) => println!("Belt:   {belt} ({missing} to next)"),
        None => println!("Belt:   {belt}"),
    }
    if progress.is_demo_mode() {
        println!("(demo mode)");
    }

    let topics = services.catalog().topics();
    for mastery in services.practice().mastery_overview(&topics) {
        let marker = if mastery.mastered { "mastered" } else { "" };
        println!(
            "  {:<24} {:>4.0}%  {:>2} attempts  {marker}",
            mastery.topic.display_name(),
            mastery.average * 100.0,
            mastery.attempts,
        );
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => Command::Status,
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

    let mut parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let mut config = std::mem::take(&mut parsed.config_overrides).apply(ServicesConfig::from_env()?);
    if let Some(url) = config.db_url.take() {
        let url = normalize_sqlite_url(url);
        prepare_sqlite_file(&url)?;
        config = config.with_db_url(url);
    }
    let services = AppServices::from_config(config, Clock::default_clock()).await?;

    match cmd {
        Command::Status => print_status(&services),
        Command::Quiz => {
            let topic = parsed.topic()?;
            let answers = parsed
                .answers
                .as_deref()
                .ok_or(ArgsError::MissingFlag { flag: "--answers" })?;
            let catalog = services.catalog();
            let key = catalog.answer_key(topic);
            let outcome = services.practice().submit_quiz(topic, answers, &key);

            println!(
                "Score: {}/{} ({}%)",
                outcome.correct,
                outcome.total,
                outcome.score.percent()
            );
            println!("+{} points", services::practice_service::QUIZ_COMPLETION_POINTS);
            if outcome.perfect {
                println!("+{} perfect bonus!", services::practice_service::PERFECT_BONUS_POINTS);
            }
            if outcome.belt_changed() {
                println!("Belt upgrade: {}", outcome.belt);
            }
            println!("Belt: {} ({} points)", outcome.belt, outcome.points);

            let missed = services::PracticeService::missed_questions(answers, &key);
            if !missed.is_empty() {
                let numbers: Vec<String> = missed.iter().map(|i| (i + 1).to_string()).collect();
                println!("Missed: {}", numbers.join(", "));
            }
        }
        Command::Reset => {
            services.progress().reset();
            println!("Local progress cleared.");
        }
        Command::Sync => match services.progress().sync_from_remote().await {
            SyncOutcome::Synced(points) => println!("Synced: {points} points"),
            SyncOutcome::Unavailable => println!("Remote unavailable; keeping local progress."),
        },
        Command::Hint => {
            let topic = parsed.topic()?;
            let catalog = services.catalog();
            let prompt = catalog
                .by_topic(topic)
                .get(parsed.question)
                .map(|question| question.prompt.clone())
                .unwrap_or_default();
            let request = HintRequest::new(topic.clone(), prompt);
            println!("{}", services.hints().hint(&request).await);
        }
    }

    services.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
