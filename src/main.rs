mod cli;
mod config;
mod conversation;
mod fetch;
mod gemini;
mod history;
mod research;
mod retrieval;
mod tools;

pub const USER_AGENT: &str = concat!(
    "deep-search/",
    env!("CARGO_PKG_VERSION"),
    " (research agent)"
);

use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

use cli::{ChatArgs, Cli, Commands, ResearchArgs};
use conversation::{ConversationState, ToolLoop};
use gemini::{GeminiClient, RetryPolicy};
use research::Researcher;
use retrieval::WebRetriever;
use tools::ResearchTools;

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default whole-request timeout; adapters set tighter ones per call.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);
/// Maximum redirect hops before aborting.
const MAX_REDIRECTS: usize = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("deep_search={}", cli.log_level).parse()?),
        )
        .init();

    match &cli.command {
        Commands::History => {
            let sessions = history::list_sessions(&cli.output_dir).await?;
            print!("{}", cli::render_sessions(&sessions));
        }
        Commands::Research(args) => run_research(&cli, args).await?,
        Commands::Chat(args) => run_chat(&cli, args).await?,
    }
    Ok(())
}

fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
}

fn gemini_client(
    cli: &Cli,
    http: &Client,
    model_var: &str,
) -> Result<GeminiClient, gemini::GeminiError> {
    let client = GeminiClient::from_env(http.clone(), model_var)
        .inspect_err(|e| error!("Gemini client not available: {e}"))?;
    let retry = if cli.no_retry {
        RetryPolicy::none()
    } else {
        RetryPolicy::default()
    };
    info!(model = %client.model(), "using Gemini model");
    Ok(client.with_retry(retry))
}

async fn run_research(cli: &Cli, args: &ResearchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.research_config(args);
    let http = http_client()?;
    let model = gemini_client(cli, &http, "GEMINI_MODEL")?;
    let report_model = gemini_client(cli, &http, "GEMINI_REPORT_MODEL")?;
    let retriever = WebRetriever::new(http);

    let progress = |stage: research::Stage, fraction: f32| {
        eprintln!("[{:>3.0}%] {}", fraction * 100.0, stage.name());
    };
    let researcher =
        Researcher::new(&model, &report_model, &retriever, &config).with_progress(&progress);

    let query = args.query_text();
    info!(query = %query, "starting research");
    let state = researcher.research(&query).await?;

    print!("{}", cli::render_research(&state));
    Ok(())
}

async fn run_chat(cli: &Cli, args: &ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.chat_config(args);
    let http = http_client()?;
    let model = gemini_client(cli, &http, "GEMINI_MODEL")?;
    let retriever = WebRetriever::new(http);
    let tools = ResearchTools::new(&retriever).with_max_content_length(config.max_content_length);
    let chat = ToolLoop::new(&model, &tools)
        .with_system_instruction(&config.system_instruction)
        .with_max_turns(config.chat_max_turns);

    let mut state = ConversationState::new();

    if let Some(message) = &args.message {
        let answer = chat.chat(&mut state, message).await?;
        println!("{answer}");
        return Ok(());
    }

    info!("chat session started");
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                state = ConversationState::new();
                println!("(conversation cleared)");
                continue;
            }
            _ => {}
        }

        match chat.chat(&mut state, &line).await {
            Ok(answer) => println!("\n{answer}\n"),
            Err(e) => println!("\nError: {e}\n"),
        }
    }
    info!(turns = state.len(), "chat session ended");
    Ok(())
}
