mod config;
mod telemetry;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use marktex_renderer::{MathBackendKind, Renderer};
use marktex_worker::{DispatchQueue, WorkerRequest, WorkerResponse, handle_request};
use miette::{IntoDiagnostic, Result, miette};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::config::Config;

#[derive(Parser)]
#[command(version, about = "marktex - Markdown with LaTeX to HTML", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to config file (defaults to <config dir>/marktex/config.toml)
    #[arg(long, global = true, env = "MARKTEX_CONFIG")]
    config: Option<PathBuf>,

    /// Leave formulas unrendered for a later client-side math pass
    #[arg(long, global = true)]
    no_math: bool,

    /// Render on the main task instead of a worker thread
    #[arg(long, global = true)]
    no_worker: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render Markdown files to HTML
    Render {
        /// Input files; reads stdin when none are given
        inputs: Vec<PathBuf>,

        /// Write HTML here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check the LaTeX formulas in Markdown files
    Validate {
        /// Input files; reads stdin when none are given
        inputs: Vec<PathBuf>,
    },
    /// Serve the worker protocol on stdin/stdout, one JSON message per line
    Worker,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_miette();
    telemetry::init_tracing();
    telemetry::init_panic_hook();

    let cli = Cli::parse();

    let mut config = Config::resolve(cli.config.as_deref())?;
    if cli.no_math {
        config.render.math = MathBackendKind::None;
    }
    if cli.no_worker {
        config.dispatch.use_worker = false;
    }

    let renderer = Arc::new(Renderer::new(config.render.clone()));

    match cli.command {
        Commands::Render { inputs, output } => render(renderer, config, inputs, output).await,
        Commands::Validate { inputs } => validate(&renderer, inputs),
        Commands::Worker => serve_worker(&renderer).await,
    }
}

struct Source {
    name: String,
    text: String,
}

fn read_sources(inputs: &[PathBuf]) -> Result<Vec<Source>> {
    if inputs.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .into_diagnostic()?;
        return Ok(vec![Source {
            name: "<stdin>".into(),
            text,
        }]);
    }

    inputs
        .iter()
        .map(|path| -> Result<Source> {
            let text = std::fs::read_to_string(path)
                .map_err(|e| miette!("error reading {}: {}", path.display(), e))?;
            Ok(Source {
                name: path.display().to_string(),
                text,
            })
        })
        .collect()
}

async fn render(
    renderer: Arc<Renderer>,
    config: Config,
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let sources = read_sources(&inputs)?;
    let mut queue = DispatchQueue::new(renderer, config.dispatch);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    for (n, source) in sources.iter().enumerate() {
        let tx = tx.clone();
        queue.process(source.text.clone(), move |response| {
            let _ = tx.send((n, response));
        });
    }
    drop(tx);
    queue.drain().await;

    let mut documents = Vec::with_capacity(sources.len());
    let mut failed = 0;
    while let Some((n, response)) = rx.recv().await {
        let name = &sources[n].name;
        match response {
            WorkerResponse::ParseResult {
                html,
                latex_validation,
                ..
            } => {
                for issue in &latex_validation.errors {
                    tracing::warn!(
                        file = %name,
                        position = issue.position,
                        formula = %issue.formula,
                        error = %issue.error,
                        "invalid formula"
                    );
                }
                documents.push(html);
            }
            WorkerResponse::Error { error, .. } => {
                tracing::error!(file = %name, %error, "render failed");
                failed += 1;
            }
        }
    }

    let mut html = documents.join("\n");
    html.push('\n');
    match output {
        Some(path) => {
            tokio::fs::write(&path, html)
                .await
                .map_err(|e| miette!("error writing {}: {}", path.display(), e))?;
            tracing::info!(path = %path.display(), documents = sources.len(), "wrote html");
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(html.as_bytes()).await.into_diagnostic()?;
            stdout.flush().await.into_diagnostic()?;
        }
    }

    if failed > 0 {
        return Err(miette!("{failed} document(s) failed to render"));
    }
    Ok(())
}

fn validate(renderer: &Renderer, inputs: Vec<PathBuf>) -> Result<()> {
    let mut errors = 0;
    for source in read_sources(&inputs)? {
        let report = renderer.validate(&source.text);
        for issue in &report.errors {
            println!(
                "{}:{}: {} formula `{}`: {}",
                source.name,
                issue.position,
                issue.kind,
                issue.formula,
                issue.error
            );
        }
        println!(
            "{}: {} formula(s), {} error(s)",
            source.name,
            report.formulas.len(),
            report.errors.len()
        );
        errors += report.errors.len();
    }

    if errors > 0 {
        return Err(miette!("{errors} formula(s) failed validation"));
    }
    Ok(())
}

async fn serve_worker(renderer: &Renderer) -> Result<()> {
    tracing::info!("serving worker protocol on stdio");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.into_diagnostic()? {
        let Some(response) = answer_line(renderer, &line) else {
            continue;
        };
        let mut json = response.to_json()?;
        json.push('\n');
        stdout.write_all(json.as_bytes()).await.into_diagnostic()?;
        stdout.flush().await.into_diagnostic()?;
    }

    tracing::info!("stdin closed, worker exiting");
    Ok(())
}

/// Answer one line of the stdio protocol. Blank lines get no answer; a line
/// that isn't a request gets an `error` response with an empty id.
fn answer_line(renderer: &Renderer, line: &str) -> Option<WorkerResponse> {
    if line.trim().is_empty() {
        return None;
    }
    let response = match WorkerRequest::from_json(line) {
        Ok(request) => handle_request(renderer, &request),
        Err(err) => {
            tracing::warn!(error = %err, "malformed worker request");
            WorkerResponse::error("", err.to_string())
        }
    };
    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marktex_renderer::{MathError, MathOptions, MathSupport, RenderConfig};

    fn renderer() -> Renderer {
        Renderer::with_math(RenderConfig::default(), MathSupport::Unavailable)
    }

    /// Renders fine, but panics whenever asked to validate.
    fn exploding_validation(_: &str, opts: MathOptions) -> Result<String, MathError> {
        if opts.throw_on_error {
            panic!("validation blew up");
        }
        Ok("<m/>".into())
    }

    #[test]
    fn parse_line_gets_parse_result() {
        let response = answer_line(&renderer(), r##"{"id":"1","type":"parse","data":"# Hi"}"##)
            .expect("non-blank line is answered");
        assert_eq!(response.id(), "1");
        assert_eq!(response.html(), Some("<h1>Hi</h1>"));
    }

    #[test]
    fn unknown_type_gets_error() {
        let response = answer_line(&renderer(), r#"{"id":"2","type":"compile","data":""}"#);
        assert_eq!(
            response,
            Some(WorkerResponse::error("2", "Unknown command: compile"))
        );
    }

    #[test]
    fn malformed_line_gets_error_with_empty_id() {
        let response = answer_line(&renderer(), "{not json").expect("answered");
        assert!(response.is_error());
        assert_eq!(response.id(), "");
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(answer_line(&renderer(), "   "), None);
    }

    #[test]
    fn failing_parse_is_answered_and_serving_continues() {
        let math = MathSupport::available(exploding_validation);
        let renderer = Renderer::with_math(RenderConfig::default(), math);

        let failed = answer_line(&renderer, r#"{"id":"3","type":"parse","data":"$x$"}"#);
        assert_eq!(
            failed,
            Some(WorkerResponse::error("3", "render panicked: validation blew up"))
        );
        let next = answer_line(&renderer, r#"{"id":"4","type":"parse","data":"ok"}"#)
            .expect("answered");
        assert_eq!(next.html(), Some("ok"));
    }
}
