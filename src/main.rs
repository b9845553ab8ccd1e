use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use lark_highlight::config::{LoadMode, OutputFormat, Settings};
use lark_highlight::engine::{CodeElement, HighlightResult, LineNumbers};
use lark_highlight::error::{ConfigError, EngineError, ScriptError};
use lark_highlight::scripting::ScriptEngine;
use lark_highlight::syntax::{TreeSitterEngine, grammar_loader};
use lark_highlight::{HighlightBinding, HighlightLoader, HighlightOptions, HighlightService, logging};

const USAGE: &str =
    "usage: lark-highlight [--script FILE] [--lang NAME] [--line-numbers] [--json] <FILE>";

#[derive(Error, Debug)]
enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Highlighting library not ready after {0}ms")]
    Timeout(u64),

    #[error("Failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
struct Args {
    script: Option<PathBuf>,
    lang: Option<String>,
    line_numbers: bool,
    json: bool,
    file: PathBuf,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, CliError> {
    let mut parsed = Args::default();
    let mut file = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--script" => {
                let path = args
                    .next()
                    .ok_or_else(|| CliError::Usage("--script needs a file".to_string()))?;
                parsed.script = Some(PathBuf::from(path));
            }
            "--lang" => {
                parsed.lang = Some(
                    args.next()
                        .ok_or_else(|| CliError::Usage("--lang needs a name".to_string()))?,
                );
            }
            "--line-numbers" => parsed.line_numbers = true,
            "--json" => parsed.json = true,
            flag if flag.starts_with("--") => {
                return Err(CliError::Usage(format!("unknown option {}", flag)));
            }
            _ if file.is_none() => file = Some(PathBuf::from(&arg)),
            _ => return Err(CliError::Usage("only one file can be highlighted".to_string())),
        }
    }

    parsed.file = file.ok_or_else(|| CliError::Usage("no file given".to_string()))?;
    Ok(parsed)
}

fn load_settings(args: &Args) -> Result<Settings, CliError> {
    let mut script = ScriptEngine::new();
    match &args.script {
        Some(path) => script.load_file(path)?,
        None => script.load_default()?,
    }

    let mut settings = script.settings();
    if args.json {
        settings.format = OutputFormat::Json;
    }
    if args.line_numbers {
        settings.line_numbers = true;
    }
    if let Some(lang) = &args.lang {
        if !settings.languages.contains(lang) {
            settings.languages.push(lang.clone());
        }
    }
    Ok(settings)
}

fn build_options(settings: &Settings) -> HighlightOptions {
    let mut options = match settings.mode {
        LoadMode::Full => {
            HighlightOptions::new().full_library(TreeSitterEngine::full_loader(&settings.grammars_dir))
        }
        LoadMode::Core => settings.languages.iter().fold(
            HighlightOptions::new().core_library(TreeSitterEngine::core_loader()),
            |options, name| {
                options.language(name.clone(), grammar_loader(name.clone(), &settings.grammars_dir))
            },
        ),
    };

    if settings.line_numbers {
        let line_numbers = LineNumbers {
            single_line: settings.single_line_numbers,
            ..LineNumbers::default()
        };
        options = options.line_numbers(line_numbers.loader());
    }
    options.config(settings.engine.clone())
}

#[derive(Serialize)]
struct Output<'a> {
    #[serde(flatten)]
    result: &'a HighlightResult,
    classes: &'a [String],
    html: &'a str,
}

async fn run(args: Args) -> Result<(), CliError> {
    let settings = load_settings(&args)?;
    let code = std::fs::read_to_string(&args.file).map_err(|source| CliError::Read {
        path: args.file.display().to_string(),
        source,
    })?;

    let loader = Arc::new(HighlightLoader::new(build_options(&settings)));
    loader.start()?;
    let service = Arc::new(HighlightService::new(Arc::clone(&loader)));

    let timeout = Duration::from_millis(settings.load_timeout_ms);
    if tokio::time::timeout(timeout, loader.ready()).await.is_err() {
        tracing::debug!("Gate status at timeout: {:?}", loader.status());
        return Err(CliError::Timeout(settings.load_timeout_ms));
    }

    let (result, element) = match &args.lang {
        Some(lang) => {
            let result = service.highlight(&code, lang, true).await?;
            let mut element = CodeElement::new()
                .with_class("hljs")
                .with_class(&format!("language-{}", lang));
            element.set_inner_html(result.value.clone().unwrap_or_default());
            if settings.line_numbers {
                service.line_numbers_block(&mut element).await;
            }
            (result, element)
        }
        None => {
            let mut binding =
                HighlightBinding::new(Arc::clone(&service)).with_line_numbers(settings.line_numbers);
            let result = binding.set_code(&code, None).await.unwrap_or_default();
            (result, binding.element().clone())
        }
    };

    match settings.format {
        OutputFormat::Html => println!(
            "<pre><code class=\"{}\">{}</code></pre>",
            element.classes().join(" "),
            element.inner_html()
        ),
        OutputFormat::Json => {
            let output = Output {
                result: &result,
                classes: element.classes(),
                html: element.inner_html(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("lark-highlight: {}", e);
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("lark-highlight: {}", e);
            ExitCode::FAILURE
        }
    }
}
