use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use ragchat_core::{parse_answer, ApiClient, ChatController, ChatState, Config, SessionApi};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "ragchat")]
#[command(about = "Chat with your data through a retrieval-augmented QA backend")]
struct Cli {
    /// Backend base URL (overrides RAGCHAT_BACKEND_URI and the config file)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Session endpoint family: "path" or "body"
    #[arg(long, global = true, value_parser = parse_session_api)]
    session_api: Option<SessionApi>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the answer
    Ask {
        /// Your question
        question: String,
        /// Continue an existing session
        #[arg(short, long, value_parser = parse_session_id)]
        session: Option<String>,
    },
    /// List stored chat sessions
    Sessions,
    /// Print the stored turns of a session
    History {
        session_id: String,
    },
    /// Print the document behind a citation
    Citation {
        name: String,
    },
}

fn parse_session_api(s: &str) -> Result<SessionApi, String> {
    SessionApi::from_str(s).ok_or_else(|| {
        let known: Vec<&str> = SessionApi::all().iter().map(|api| api.as_str()).collect();
        format!("unknown session api '{}', expected one of: {}", s, known.join(", "))
    })
}

fn parse_session_id(s: &str) -> Result<String, String> {
    let id = s.trim();
    if id.is_empty() {
        return Err("session id must not be empty".to_string());
    }
    Ok(id.to_string())
}

/// Log to a file: the terminal belongs to the UI.
fn init_logging() -> Result<WorkerGuard> {
    let log_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?
        .join("ragchat");
    std::fs::create_dir_all(&log_dir)?;

    let appender = tracing_appender::rolling::never(&log_dir, "ragchat.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging()?;

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        Config::new()
    });
    let backend = cli.backend.clone().unwrap_or_else(|| config.backend_uri());
    let session_api = cli.session_api.unwrap_or_else(|| config.session_api());
    let client = ApiClient::new(&backend, session_api);
    tracing::info!(backend = %client.base_url(), session_api = session_api.as_str(), "starting");

    match cli.command {
        None => run_tui(client, config).await,
        Some(Commands::Ask { question, session }) => {
            ask(client, config, &question, session).await
        }
        Some(Commands::Sessions) => list_sessions(&client).await,
        Some(Commands::History { session_id }) => print_history(&client, &session_id).await,
        Some(Commands::Citation { name }) => print_citation(&client, &name).await,
    }
}

async fn run_tui(client: ApiClient, config: Config) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let mut app = App::new(client, config.settings, events.sender());
    app.mount();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event)?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn ask(
    client: ApiClient,
    config: Config,
    question: &str,
    session: Option<String>,
) -> Result<()> {
    let mut state = ChatState::new(config.settings);
    if let Some(session_id) = session {
        state.set_session_id(&session_id);
    }
    let mut controller = ChatController::new(client, state);
    controller.ask(question).await;

    let state = controller.state();
    if let Some(error) = &state.error {
        return Err(anyhow!("Chat error: {}", error));
    }
    let Some((_, response)) = state.answers.last() else {
        return Err(anyhow!("The backend returned no answer"));
    };

    let parsed = parse_answer(response);
    println!("{}", parsed.plain_text());
    if !parsed.citations.is_empty() {
        println!();
        for (i, citation) in parsed.citations.iter().enumerate() {
            println!("[{}] {}", i + 1, controller.backend().citation_file_path(citation));
        }
    }
    if state.settings.suggest_followup_questions && !parsed.followup_questions.is_empty() {
        println!();
        for question in &parsed.followup_questions {
            println!("? {}", question);
        }
    }
    println!("\nsession: {}", state.session_id);
    Ok(())
}

async fn list_sessions(client: &ApiClient) -> Result<()> {
    let sessions = client.sessions().await?;
    if sessions.is_empty() {
        println!("No chat history yet.");
    }
    for session in sessions {
        println!("{}\t{}", session.session_id, session.title);
    }
    Ok(())
}

async fn print_history(client: &ApiClient, session_id: &str) -> Result<()> {
    let Some(history) = client.session_history(session_id).await? else {
        println!("No history for session {}", session_id);
        return Ok(());
    };
    for entry in history.entries.unwrap_or_default() {
        println!("{}: {}", entry.role, entry.content);
    }
    Ok(())
}

async fn print_citation(client: &ApiClient, name: &str) -> Result<()> {
    println!("{}", client.citation_content(name).await?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_tui() {
        let cli = Cli::try_parse_from(["ragchat"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.backend.is_none());
    }

    #[test]
    fn test_cli_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ragchat",
            "ask",
            "what is product FR-R92B-58?",
            "--backend",
            "http://rag:8080",
            "--session-api",
            "body",
        ])
        .unwrap();
        assert_eq!(cli.backend.as_deref(), Some("http://rag:8080"));
        assert_eq!(cli.session_api, Some(SessionApi::JsonBody));
        assert!(matches!(
            cli.command,
            Some(Commands::Ask { ref question, .. }) if question.starts_with("what")
        ));
    }

    #[test]
    fn test_cli_rejects_blank_session() {
        assert!(Cli::try_parse_from(["ragchat", "ask", "q", "--session", ""]).is_err());
        assert!(Cli::try_parse_from(["ragchat", "ask", "q", "--session", "  "]).is_err());

        let cli = Cli::try_parse_from(["ragchat", "ask", "q", "--session", " abc "]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Ask { session: Some(ref id), .. }) if id == "abc"
        ));
    }

    #[test]
    fn test_cli_rejects_unknown_session_api() {
        assert!(Cli::try_parse_from(["ragchat", "--session-api", "query", "sessions"]).is_err());
    }
}
