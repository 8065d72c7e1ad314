//! chat-qa: terminal front-end for streamed chat and document Q&A.
//! `chat` reads one user turn per stdin line and streams each reply to
//! stdout; `ask` answers a single question about a text document.

use chat_qa_client::config::{self, Config};
use chat_qa_client::{
    render_history, ChatRequest, Client, Document, MarkerSplitter, Renderer, StreamSession,
    TerminalRenderer, Transcript,
};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "chat-qa", version, about = "Chat with a reasoning model or question a document")]
struct Cli {
    /// Config file (default: ~/.chat-qa/config.yaml).
    #[arg(long, env = "CHAT_QA_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Show raw model output, reasoning markers included.
    #[arg(long, global = true)]
    show_thinking: bool,

    /// Print the extracted reasoning below each answer.
    #[arg(long, global = true)]
    expand_thinking: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat, one message per line (default).
    Chat,
    /// Ask one question about a text document.
    Ask {
        #[arg(long, short)]
        document: PathBuf,
        /// Read from stdin when omitted.
        question: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy)]
struct DisplayMode {
    reveal: bool,
    expand: bool,
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}: {}", context, err);
    process::exit(1);
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();
}

fn resolve_config_path(flag: Option<PathBuf>) -> PathBuf {
    // --config / CHAT_QA_CONFIG, then ~/.chat-qa/config.yaml
    flag.or_else(config::default_config_path).unwrap_or_else(|| {
        fail(
            "unable to determine config path",
            "set --config or CHAT_QA_CONFIG",
        )
    })
}

fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config);
    let cfg = config::load_or_default(&config_path).unwrap_or_else(|e| {
        fail(
            &format!("failed to load config from {}", config_path.display()),
            e,
        )
    });
    let api_key = cfg
        .api
        .resolve_api_key()
        .unwrap_or_else(|e| fail("missing credentials", e));
    let client = Client::new(cfg.api.base_url(), &api_key)
        .unwrap_or_else(|e| fail("invalid client settings", e));

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| fail("failed to create runtime", e));

    let mode = DisplayMode {
        reveal: cli.show_thinking || cfg.chat.reveal_reasoning(),
        expand: cli.expand_thinking,
    };

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => run_chat(&rt, &client, &cfg, mode),
        Command::Ask { document, question } => {
            run_ask(&rt, &client, &cfg, mode, &document, question)
        }
    }
}

fn show_prompt(interactive: bool) {
    if interactive {
        eprint!("> ");
        let _ = io::stderr().flush();
    }
}

fn run_chat(rt: &Runtime, client: &Client, cfg: &Config, mut mode: DisplayMode) {
    let splitter = MarkerSplitter::new(cfg.chat.markers());
    let mut transcript = Transcript::new(cfg.chat.system_prompt());
    let interactive = io::stdin().is_terminal();
    let mut last_failed = false;

    show_prompt(interactive);
    for line in io::stdin().lock().lines() {
        let line = line.unwrap_or_else(|e| fail("failed to read stdin", e));
        match line.trim() {
            "" => {}
            "/reveal" => {
                mode.reveal = !mode.reveal;
                eprintln!("reasoning markers {}", if mode.reveal { "shown" } else { "hidden" });
            }
            "/history" => {
                if let Err(e) = render_history(&mut io::stdout(), &transcript, &splitter, mode.reveal) {
                    tracing::warn!("failed to render history: {}", e);
                }
            }
            input => {
                last_failed = !chat_turn(rt, client, cfg, &splitter, &mut transcript, mode, input);
            }
        }
        show_prompt(interactive);
    }

    if last_failed {
        process::exit(1);
    }
}

/// One user turn. Returns false if the request failed or the reply was cut off.
fn chat_turn(
    rt: &Runtime,
    client: &Client,
    cfg: &Config,
    splitter: &MarkerSplitter,
    transcript: &mut Transcript,
    mode: DisplayMode,
    input: &str,
) -> bool {
    transcript.push_user(input);
    let fragments = {
        let request = ChatRequest::new(cfg.api.chat_model(), transcript.messages(), &cfg.sampling);
        rt.block_on(client.stream_chat(&request))
    };
    let fragments = match fragments {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: request failed: {}", e);
            return false;
        }
    };

    let mut renderer = TerminalRenderer::new(io::stdout())
        .with_cursor(io::stdout().is_terminal())
        .with_reasoning(mode.expand);
    let session = StreamSession::new(splitter.clone(), mode.reveal);
    let outcome = rt.block_on(session.drive(fragments, transcript, &mut renderer));
    match outcome.aborted {
        Some(e) => {
            eprintln!("Error: response interrupted: {}", e);
            false
        }
        None => true,
    }
}

fn run_ask(
    rt: &Runtime,
    client: &Client,
    cfg: &Config,
    mode: DisplayMode,
    path: &Path,
    question: Vec<String>,
) {
    let question = if question.is_empty() {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).unwrap_or(0);
        line
    } else {
        question.join(" ")
    };

    let document = Document::load(path).unwrap_or_else(|e| fail("failed to load document", e));
    let messages = document
        .messages(&question)
        .unwrap_or_else(|e| fail("invalid question", e));
    let request = ChatRequest::new(cfg.api.qa_model(), &messages, &cfg.sampling)
        .max_tokens(cfg.sampling.qa_max_tokens())
        .without_penalties()
        .streaming(false);
    let answer = rt
        .block_on(client.complete(&request))
        .unwrap_or_else(|e| fail(&format!("query about {} failed", document.name()), e));

    let view = MarkerSplitter::new(cfg.chat.markers()).split(&answer, mode.reveal);
    let mut renderer = TerminalRenderer::new(io::stdout()).with_reasoning(mode.expand);
    renderer.finish(&view);
}
