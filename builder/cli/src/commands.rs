//! Subcommand implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use builder_core::{
    all_models, BuilderConfig, FileStorage, GenerationBackend, HttpBackend, RefinementKind,
    SiteBuilder, VersionStore,
};

use crate::render;
use crate::{Command, VersionsAction};

/// Event channel capacity between the builder and the renderer
const EVENT_BUFFER: usize = 256;

/// Dispatch a parsed subcommand
pub async fn run(command: Command, config: &BuilderConfig, output: Option<&Path>) -> Result<()> {
    match command {
        Command::Generate { prompt } => generate(config, &prompt.join(" "), output).await,
        Command::Refine {
            kind,
            prompt,
            from,
            version_id,
        } => {
            let store = open_store(config).await?;
            let html = match (from, version_id) {
                (Some(path), _) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, Some(id)) => match store.get_version(&id) {
                    Some(entry) => entry.html_content.clone(),
                    None => bail!("Version '{id}' not found"),
                },
                (None, None) => match store.versions().first() {
                    Some(entry) => entry.html_content.clone(),
                    None => bail!("No saved versions to refine; pass --from <file>"),
                },
            };
            refine(config, store, kind, prompt, html, output).await
        }
        Command::Chat => chat(config, output).await,
        Command::Versions { action } => versions(config, action, output).await,
        Command::Models => {
            for model in all_models() {
                println!("{}", render::model_row(model, model.key == config.default_model));
            }
            Ok(())
        }
    }
}

/// Load version history from the configured data directory
async fn open_store(config: &BuilderConfig) -> Result<VersionStore> {
    let dir = config
        .resolved_data_dir()
        .context("No data directory available; set --data-dir or SITE_BUILDER_DATA_DIR")?;
    tracing::debug!(dir = %dir.display(), "Opening version store");
    Ok(VersionStore::load(Arc::new(FileStorage::new(dir))).await)
}

/// Construct the backend and a builder wired to a stderr renderer
async fn open_builder(
    config: &BuilderConfig,
    store: VersionStore,
) -> Result<(SiteBuilder<HttpBackend>, tokio::task::JoinHandle<()>)> {
    let backend = HttpBackend::from_config(&config.api)?;
    if !backend.health_check().await {
        tracing::warn!(url = backend.base_url(), "Generation service is not reachable");
    }

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let renderer = render::spawn_renderer(rx);
    Ok((SiteBuilder::new(backend, store, config, tx), renderer))
}

/// Wait for the in-flight request; Ctrl-C cancels it
///
/// Returns false if the request was cancelled.
async fn finish<B: GenerationBackend + 'static>(builder: &mut SiteBuilder<B>) -> bool {
    let interrupted = tokio::select! {
        () = builder.await_response() => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        builder.cancel().await;
        eprintln!("Cancelled");
    }
    !interrupted
}

/// Print or save the current preview HTML
async fn emit_html(html: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(path, html)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {} to {}", render::format_size(html.len()), path.display());
        }
        None => println!("{html}"),
    }
    Ok(())
}

/// Shut down the renderer once the builder is gone
async fn close(builder: SiteBuilder<HttpBackend>, renderer: tokio::task::JoinHandle<()>) {
    drop(builder);
    if let Err(e) = renderer.await {
        tracing::debug!(error = %e, "Renderer task ended abnormally");
    }
}

/// Outcome of a one-shot request
async fn conclude(
    builder: SiteBuilder<HttpBackend>,
    renderer: tokio::task::JoinHandle<()>,
    completed: bool,
    output: Option<&Path>,
) -> Result<()> {
    let error = builder.error().map(str::to_string);
    let html = builder.html_content().map(str::to_string);
    close(builder, renderer).await;

    if !completed {
        bail!("Request cancelled");
    }
    if let Some(error) = error {
        bail!("Generation failed: {error}");
    }
    match html {
        Some(html) => emit_html(&html, output).await,
        None => bail!("The response did not contain an HTML document"),
    }
}

async fn generate(config: &BuilderConfig, prompt: &str, output: Option<&Path>) -> Result<()> {
    let store = open_store(config).await?;
    let (mut builder, renderer) = open_builder(config, store).await?;

    builder.send_message(prompt).await?;
    let completed = finish(&mut builder).await;

    conclude(builder, renderer, completed, output).await
}

async fn refine(
    config: &BuilderConfig,
    store: VersionStore,
    kind: RefinementKind,
    prompt: Option<String>,
    html: String,
    output: Option<&Path>,
) -> Result<()> {
    let (mut builder, renderer) = open_builder(config, store).await?;

    builder
        .handle_refinement_request(kind, prompt, Some(html))
        .await?;
    let completed = finish(&mut builder).await;

    conclude(builder, renderer, completed, output).await
}

async fn versions(config: &BuilderConfig, action: VersionsAction, output: Option<&Path>) -> Result<()> {
    let mut store = open_store(config).await?;
    match action {
        VersionsAction::List => {
            if store.is_empty() {
                eprintln!("No saved versions");
            }
            for entry in store.versions() {
                println!("{}", render::version_row(entry));
            }
        }
        VersionsAction::Show { id } => match store.get_version(&id) {
            Some(entry) => emit_html(&entry.html_content, output).await?,
            None => bail!("Version '{id}' not found"),
        },
        VersionsAction::Delete { id } => {
            if !store.delete_version(&id).await {
                bail!("Version '{id}' not found");
            }
            eprintln!("Deleted {id}");
        }
        VersionsAction::Clear => {
            let count = store.len();
            store.clear().await;
            eprintln!("Deleted {count} version(s)");
        }
    }
    Ok(())
}

// =============================================================================
// Interactive chat
// =============================================================================

/// A line of chat input
#[derive(Debug, PartialEq, Eq)]
enum ChatInput {
    Message(String),
    Clear,
    Refine {
        kind: RefinementKind,
        prompt: Option<String>,
    },
    Versions,
    Restore(String),
    Model(Option<String>),
    Save,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

const CHAT_HELP: &str = "\
Commands:
  /clear                     start a new chat
  /refine <kind> [prompt]    refine the current preview
  /versions                  list saved versions
  /restore <id>              show a saved version
  /model [key]               show or select the model
  /save                      write the preview to --output (or stdout)
  /help                      this help
  /quit                      exit
Anything else is sent as a prompt.";

fn parse_chat_input(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ChatInput::Message(line.to_string());
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    let rest = (!rest.is_empty()).then(|| rest.to_string());

    match name {
        "clear" | "new" => ChatInput::Clear,
        "refine" => {
            let Some(rest) = rest else {
                return ChatInput::Invalid("usage: /refine <kind> [prompt]".to_string());
            };
            let (kind, prompt) = match rest.split_once(char::is_whitespace) {
                Some((kind, prompt)) => (kind, Some(prompt.trim().to_string())),
                None => (rest.as_str(), None),
            };
            match kind.parse() {
                Ok(kind) => ChatInput::Refine { kind, prompt },
                Err(e) => ChatInput::Invalid(e),
            }
        }
        "versions" => ChatInput::Versions,
        "restore" => match rest {
            Some(id) => ChatInput::Restore(id),
            None => ChatInput::Invalid("usage: /restore <id>".to_string()),
        },
        "model" => ChatInput::Model(rest),
        "save" => ChatInput::Save,
        "help" | "?" => ChatInput::Help,
        "quit" | "exit" | "q" => ChatInput::Quit,
        other => ChatInput::Invalid(format!("unknown command '/{other}' (try /help)")),
    }
}

async fn chat(config: &BuilderConfig, output: Option<&Path>) -> Result<()> {
    let store = open_store(config).await?;
    let (mut builder, renderer) = open_builder(config, store).await?;

    eprintln!("Describe the website you want. /help for commands, /quit to exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        let started = match parse_chat_input(&line) {
            ChatInput::Empty => false,
            ChatInput::Quit => break,
            ChatInput::Help => {
                eprintln!("{CHAT_HELP}");
                false
            }
            ChatInput::Invalid(message) => {
                eprintln!("{message}");
                false
            }
            ChatInput::Clear => {
                builder.clear_chat().await;
                false
            }
            ChatInput::Versions => {
                for entry in builder.versions() {
                    eprintln!("{}", render::version_row(entry));
                }
                false
            }
            ChatInput::Restore(id) => {
                match builder.restore_version(&id).await {
                    Ok(()) => eprintln!("Restored {id}"),
                    Err(e) => eprintln!("{e}"),
                }
                false
            }
            ChatInput::Model(None) => {
                eprintln!("Current model: {}", builder.model());
                false
            }
            ChatInput::Model(Some(key)) => {
                match builder.set_model(&key) {
                    Ok(info) => eprintln!("Using {} ({})", info.name, info.id),
                    Err(e) => eprintln!("{e}"),
                }
                false
            }
            ChatInput::Save => {
                match builder.html_content() {
                    Some(html) => emit_html(html, output).await?,
                    None => eprintln!("Nothing to save yet"),
                }
                false
            }
            ChatInput::Refine { kind, prompt } => {
                report(builder.handle_refinement_request(kind, prompt, None).await)
            }
            ChatInput::Message(text) => report(builder.send_message(text).await),
        };

        if started && finish(&mut builder).await {
            if let (Some(html), Some(path)) = (builder.html_content(), output) {
                emit_html(html, Some(path)).await?;
            }
        }
    }

    close(builder, renderer).await;
    Ok(())
}

/// Print a refused action; returns whether a request started
fn report(result: Result<(), builder_core::BuilderError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            eprintln!("{e}");
            false
        }
    }
}
