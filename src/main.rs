//! Command line front end: translate keys, switch the stored locale, clear
//! cached machine translations and write the contribution snapshot.

use std::io::{
    self,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{
    Parser,
    Subcommand,
};
use folio_i18n::config::{
    ConfigError,
    ConfigManager,
    Settings,
    ValidationError,
};
use folio_i18n::contrib::{
    DEFAULT_SPARKLINE_BUCKETS,
    GithubContributions,
    WEEKS_PER_YEAR,
    write_snapshot,
};
use folio_i18n::dictionary::{
    DictionaryError,
    load_dictionaries,
};
use folio_i18n::locale::LocaleError;
use folio_i18n::relay::{
    DeeplRelay,
    HttpRelay,
    RelayError,
    TranslationRelay,
};
use folio_i18n::storage::{
    FileStore,
    KeyValueStore,
    MemoryStore,
};
use folio_i18n::{
    Locale,
    LocaleResolver,
    TranslationMemo,
    Translator,
};
use reqwest::{
    Client,
    Url,
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "folio-i18n", version, about = "Portfolio translation toolkit")]
struct Cli {
    /// Workspace holding `.folio-i18n.json` and the translation files.
    #[arg(long, global = true, default_value = ".")]
    workspace: PathBuf,

    /// Store file for the locale preference and cached translations.
    #[arg(long, global = true, env = "FOLIO_I18N_STORE")]
    store: Option<PathBuf>,

    /// Translate through DeepL directly instead of the relay endpoint.
    #[arg(long, global = true)]
    deepl: bool,

    /// DeepL API key. Without one the DeepL relay echoes the source text.
    #[arg(long, global = true, env = "DEEPL_API_KEY", hide_env_values = true)]
    deepl_api_key: Option<String>,

    /// Overrides `deepl.apiUrl`.
    #[arg(long, global = true, env = "DEEPL_API_URL")]
    deepl_api_url: Option<String>,

    /// What to do.
    #[command(subcommand)]
    command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Print the display string of each key.
    Translate {
        /// Switch to this locale first. The choice is remembered like `set-locale`.
        #[arg(long)]
        locale: Option<String>,

        /// Wait for machine translations instead of printing the source text.
        #[arg(long)]
        wait: bool,

        /// Dictionary keys or source texts.
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Remember a supported locale.
    SetLocale {
        /// Locale tag such as `de` or `de-DE`.
        locale: String,
    },

    /// Remove every cached machine translation.
    ClearCache,

    /// Fetch public GitHub contributions and write the snapshot file.
    Contrib {
        /// GitHub user whose public contributions are counted.
        #[arg(long, env = "GH_LOGIN")]
        login: String,

        /// Snapshot file to write.
        #[arg(long, default_value = "public/github-contrib.json")]
        out: PathBuf,

        /// GitHub token; `GITHUB_TOKEN` is used when unset.
        #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
}

/// Anything that ends a command early.
#[derive(Debug, Error)]
enum CliError {
    /// Bad or unreadable configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bad translation file pattern.
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),

    /// Relay could not be set up.
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Unparsable locale argument.
    #[error(transparent)]
    Locale(#[from] LocaleError),

    /// Locale outside the configured set.
    #[error("Locale '{0}' is not supported")]
    Unsupported(Locale),

    /// Snapshot could not be written.
    #[error(transparent)]
    Contrib(#[from] folio_i18n::contrib::ContribError),

    /// Stdout went away.
    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl CliError {
    /// 2 for a rejected locale argument, 1 otherwise.
    const fn exit_code(&self) -> u8 {
        match self {
            Self::Locale(_) | Self::Unsupported(_) => 2,
            _ => 1,
        }
    }
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        Self::Config(err.into())
    }
}

/// Parses arguments, sets up logging and maps the outcome to an exit code.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (writer, _guard) = tracing_appender::non_blocking(io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

/// Executes the selected command.
async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ConfigManager::new();
    config.load_settings(Some(cli.workspace.clone()))?;
    let settings = config.get_settings();

    match &cli.command {
        Command::Translate { locale, wait, keys } => {
            let translator = translator(&cli, settings)?;
            if let Some(tag) = locale {
                switch_locale(translator.resolver(), tag)?;
            }

            for key in keys {
                let text =
                    if *wait { translator.text_resolved(key).await } else { translator.text(key) };
                writeln!(io::stdout().lock(), "{text}")?;
            }

            // fetches started for the lines above are stored for the next run
            let pending = translator.memo().settle().await;
            if pending > 0 {
                tracing::debug!(pending, "Stored machine translations for the next run");
            }
        }
        Command::SetLocale { locale } => {
            let translator = translator(&cli, settings)?;
            let locale = switch_locale(translator.resolver(), locale)?;
            writeln!(io::stdout().lock(), "{locale}")?;
        }
        Command::ClearCache => {
            let translator = translator(&cli, settings)?;
            let stats = translator.memo().clear();
            writeln!(io::stdout().lock(), "Removed {} cached translations", stats.persisted)?;
        }
        Command::Contrib { login, out, token } => {
            let token = token.clone().or_else(|| std::env::var("GITHUB_TOKEN").ok());
            let client = GithubContributions::new(Client::new(), settings.github_endpoint()?, token);
            let contributions = client.fetch_or_zeroed(login).await;

            write_snapshot(out, &contributions)?;

            let stats = contributions.stats();
            let spark = contributions.sparkline(DEFAULT_SPARKLINE_BUCKETS);
            writeln!(
                io::stdout().lock(),
                "total={} max/wk={} avg/wk={} weeks={} spark={spark:?}",
                contributions.total,
                stats.max,
                stats.average(),
                contributions.last_weeks(WEEKS_PER_YEAR).len(),
            )?;
        }
    }

    Ok(())
}

/// Makes `tag` the active locale, rejecting tags outside the configured set.
fn switch_locale(resolver: &LocaleResolver, tag: &str) -> Result<Locale, CliError> {
    let locale = Locale::parse(tag)?;
    if resolver.set_locale(&locale) { Ok(locale) } else { Err(CliError::Unsupported(locale)) }
}

/// Wires dictionaries, storage, resolver, relay and memo from the settings.
fn translator(cli: &Cli, settings: &Settings) -> Result<Translator, CliError> {
    let supported = settings.locale_set().map_err(ConfigError::ValidationErrors)?;
    let dictionaries = load_dictionaries(
        &cli.workspace,
        &settings.translation_files.file_pattern,
        &settings.key_separator,
        &supported,
    )?;

    let store = open_store(cli.store.as_deref().or(settings.storage.path.as_deref()));
    let hint = sys_locale::get_locale();
    let resolver =
        LocaleResolver::initialize(supported, Arc::new(dictionaries), store.clone(), hint.as_deref());

    let memo = TranslationMemo::with_timeout(relay(cli, settings)?, store, settings.relay_timeout());
    Ok(Translator::new(Arc::new(resolver), memo))
}

/// Opens the file store, or falls back to a process-local one.
fn open_store(path: Option<&Path>) -> Arc<dyn KeyValueStore> {
    let Some(path) = path.map(Path::to_path_buf).or_else(FileStore::default_path) else {
        tracing::warn!("No data directory available, preferences will not be saved");
        return Arc::new(MemoryStore::new());
    };

    match FileStore::open(&path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!("Failed to open store {:?}, preferences will not be saved: {}", path, e);
            Arc::new(MemoryStore::new())
        }
    }
}

/// The relay selected by `--deepl`.
fn relay(cli: &Cli, settings: &Settings) -> Result<Arc<dyn TranslationRelay>, CliError> {
    if !cli.deepl {
        return Ok(Arc::new(HttpRelay::new(settings.relay_endpoint()?, settings.relay_timeout())?));
    }

    let api_url = match &cli.deepl_api_url {
        Some(url) => Url::parse(url).map_err(|e| {
            ValidationError::new("DEEPL_API_URL", format!("Invalid URL '{url}': {e}"))
        })?,
        None => settings.deepl_api_url()?,
    };
    let client = Client::builder()
        .timeout(settings.relay_timeout())
        .build()
        .map_err(|e| RelayError::Client(e.to_string()))?;
    let relay = DeeplRelay::new(client, api_url, cli.deepl_api_key.clone(), settings.glossary());
    if !relay.has_api_key() {
        tracing::info!("DEEPL_API_KEY not set, machine translations echo the source text");
    }

    Ok(Arc::new(relay))
}
