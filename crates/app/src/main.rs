//! `lingua`: terminal front end for the language practice backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lingua_core::error::Error;
use lingua_core::model::{Field, KnowledgeItem, KnowledgeTypeFilter, Language, PracticeType};
use lingua_core::numbers::NumberRange;
use services::{
    DataCache, DialoguePracticeService, ExerciseRecorder, LlmDialogueJudge, LlmNumberJudge,
    NumberPracticeService, PracticeLoopService,
};
use storage::{BackendConfig, HttpBackend, InMemoryRepository, Storage};

mod console;
mod practice;

use console::Console;
use practice::{Practice, Selection};

const DEFAULT_LOG_FILTER: &str = "lingua=info,services=info,storage=info";

#[derive(Parser, Debug)]
#[command(name = "lingua")]
#[command(about = "Practice vocabulary and phrases against the lingua backend")]
#[command(version)]
struct Cli {
    /// Backend base URL [env: LINGUA_BACKEND_URL, default: http://localhost:3010]
    #[arg(long, global = true)]
    backend: Option<String>,

    /// HTTP timeout in seconds [env: LINGUA_HTTP_TIMEOUT_SECS, default: 30]
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Read the knowledge base from a JSON file instead of the backend.
    /// Exercises are then kept in memory only.
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Seed for item selection, for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug, Clone)]
struct FilterArgs {
    /// alemao/german/de or ingles/english/en; defaults to the first language found
    #[arg(short, long, value_parser = parse_language)]
    language: Option<Language>,

    /// frase/phrase, palavra/word or all
    #[arg(short = 't', long = "type", default_value = "all", value_parser = parse_type)]
    knowledge_type: KnowledgeTypeFilter,
}

impl From<FilterArgs> for Selection {
    fn from(args: FilterArgs) -> Self {
        Selection {
            language: args.language,
            knowledge_type: args.knowledge_type,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show one field and fill in the others
    Translate {
        #[command(flatten)]
        filter: FilterArgs,
        /// Field shown to the learner
        #[arg(long, default_value = "translation", value_parser = parse_field)]
        provided: Field,
    },
    /// Listen to generated audio and type what you heard
    Listen {
        #[command(flatten)]
        filter: FilterArgs,
        /// Where the generated audio files are written
        #[arg(long, default_value = "lingua-audio")]
        audio_dir: PathBuf,
    },
    /// Read the source text aloud and submit a recording
    Pronounce {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Drill a single field against the source text
    Fields {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value = "translation", value_parser = parse_field)]
        field: Field,
    },
    /// Write out and pronounce random numbers
    Numbers {
        #[arg(short, long, default_value = "alemao", value_parser = parse_language)]
        language: Language,
        #[arg(long, default_value = "0")]
        min: String,
        #[arg(long, default_value = "100")]
        max: String,
    },
    /// Answer a spoken dialogue; replies are judged for coherence
    Dialogue {
        #[arg(short, long, default_value = "alemao", value_parser = parse_language)]
        language: Language,
        /// Where the generated audio files are written
        #[arg(long, default_value = "lingua-audio")]
        audio_dir: PathBuf,
    },
    /// List the prompt book, or show one prompt
    Prompts {
        /// Prompt id to show in full
        id: Option<String>,
    },
    /// List recorded exercises, newest first
    History {
        #[arg(short = 't', long = "type")]
        practice: Option<PracticeKind>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum PracticeKind {
    Translation,
    Listening,
    Pronunciation,
    Dialogue,
    Numbers,
}

impl From<PracticeKind> for PracticeType {
    fn from(kind: PracticeKind) -> Self {
        match kind {
            PracticeKind::Translation => PracticeType::Translation,
            PracticeKind::Listening => PracticeType::Listening,
            PracticeKind::Pronunciation => PracticeType::Pronunciation,
            PracticeKind::Dialogue => PracticeType::Dialogue,
            PracticeKind::Numbers => PracticeType::NumberPronunciation,
        }
    }
}

fn parse_language(raw: &str) -> Result<Language, Error> {
    Ok(raw.parse()?)
}

fn parse_type(raw: &str) -> Result<KnowledgeTypeFilter, Error> {
    Ok(raw.parse()?)
}

fn parse_field(raw: &str) -> Result<Field, Error> {
    Ok(raw.parse()?)
}

fn parse_range(min: &str, max: &str) -> Result<NumberRange, Error> {
    Ok(NumberRange::parse(min, max)?)
}

fn backend_config(cli: &Cli) -> Result<BackendConfig> {
    let mut config = BackendConfig::from_env().context("invalid backend environment")?;
    if let Some(url) = &cli.backend {
        config = BackendConfig::new(url, config.timeout)?;
    }
    if let Some(secs) = cli.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}

fn offline_storage(path: &Path) -> Result<Storage> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read corpus file {}", path.display()))?;
    let corpus: Vec<KnowledgeItem> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a knowledge base export", path.display()))?;
    info!(items = corpus.len(), path = %path.display(), "loaded offline corpus");
    Ok(Storage::in_memory(InMemoryRepository::with_corpus(corpus)))
}

async fn run(cli: Cli) -> Result<()> {
    let config = backend_config(&cli)?;
    info!(backend = %config.base_url, "using backend");
    let backend = Arc::new(HttpBackend::new(config)?);

    let storage = match &cli.corpus {
        Some(path) => offline_storage(path)?,
        None => Storage::http(backend.config().clone())?,
    };
    let recorder = ExerciseRecorder::new(storage.history.clone());
    let sessions = PracticeLoopService::new(recorder.clone(), backend.clone(), backend.clone());
    let numbers = NumberPracticeService::new(
        Arc::new(LlmNumberJudge::new(backend.clone())),
        backend.clone(),
        recorder.clone(),
    );
    let dialogue = DialoguePracticeService::new(
        Arc::new(LlmDialogueJudge::new(backend.clone())),
        backend.clone(),
        backend,
        recorder,
    );
    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut practice = Practice::new(DataCache::new(storage), sessions, numbers, dialogue, rng);
    let mut console = Console::stdio();

    match cli.command {
        Command::Translate { filter, provided } => {
            practice.translate(&mut console, filter.into(), provided).await
        }
        Command::Listen { filter, audio_dir } => {
            practice.listen(&mut console, filter.into(), &audio_dir).await
        }
        Command::Pronounce { filter } => practice.pronounce(&mut console, filter.into()).await,
        Command::Fields { filter, field } => {
            practice.fields(&mut console, filter.into(), field).await
        }
        Command::Numbers { language, min, max } => {
            let range = parse_range(&min, &max)?;
            practice.numbers(&mut console, language, range).await
        }
        Command::Dialogue {
            language,
            audio_dir,
        } => practice.dialogue(&mut console, language, &audio_dir).await,
        Command::Prompts { id } => practice.prompts(&mut console, id.as_deref()).await,
        Command::History { practice: kind, limit } => {
            practice
                .history(&mut console, kind.map(PracticeType::from), limit)
                .await
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingua_core::model::KnowledgeType;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_filter_aliases() {
        let cli =
            Cli::try_parse_from(["lingua", "translate", "-l", "de", "--type", "palavra"]).unwrap();
        match cli.command {
            Command::Translate { filter, provided } => {
                assert_eq!(filter.language, Some(Language::German));
                assert_eq!(filter.knowledge_type, KnowledgeTypeFilter::Only(KnowledgeType::Word));
                assert_eq!(provided, Field::Translation);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_language() {
        let err = Cli::try_parse_from(["lingua", "listen", "--language", "klingon"]).unwrap_err();
        assert!(err.to_string().contains("unknown language: klingon"));
    }

    #[test]
    fn global_backend_flag_after_subcommand() {
        let args = ["lingua", "history", "--backend", "http://10.0.0.2:3010", "-t", "numbers"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.backend.as_deref(), Some("http://10.0.0.2:3010"));
        assert!(matches!(
            cli.command,
            Command::History {
                practice: Some(PracticeKind::Numbers),
                limit: 20
            }
        ));
    }

    #[test]
    fn dialogue_and_prompts_commands_parse() {
        let args = ["lingua", "dialogue", "-l", "en", "--audio-dir", "/tmp/d"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Dialogue { language, audio_dir } => {
                assert_eq!(language, Language::English);
                assert_eq!(audio_dir, PathBuf::from("/tmp/d"));
            }
            other => panic!("unexpected command {other:?}"),
        }
        let cli =
            Cli::try_parse_from(["lingua", "prompts", "dialogo_avaliacao_coerencia"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Prompts { id: Some(id) } if id == "dialogo_avaliacao_coerencia"
        ));
    }

    #[test]
    fn range_errors_surface_as_core_errors() {
        assert!(matches!(parse_range("10", "1"), Err(Error::NumberRange(_))));
        assert!(parse_range("1", "10").is_ok());
    }
}
