//! One chat turn from the terminal
//!
//! Streams the reply to stdout through a `ChatSession` backed by the local
//! SQLite history, so `--thread` can continue an earlier conversation.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Args;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use chat0_core::{
    ChatSession, ChatStore, HttpTransport, SessionDeps, SessionEvent, SqliteChatStore,
    TitleDeriver, TurnOutcome,
};
use chat0_models::auth::EnvCredentials;

use crate::config::Chat0Config;

/// Arguments for the chat command
#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Continue an existing thread
    #[arg(long)]
    pub thread: Option<String>,

    /// Model display name (overrides [client] model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Gateway base URL (overrides [client] server_url)
    #[arg(long)]
    pub server: Option<String>,

    /// Print model reasoning to stderr
    #[arg(long)]
    pub show_reasoning: bool,

    /// Message to send
    #[arg(required = true, trailing_var_arg = true)]
    pub prompt: Vec<String>,
}

/// Run the chat command
pub async fn run(args: ChatArgs, config: Chat0Config) -> Result<()> {
    let prompt = args.prompt.join(" ");
    if prompt.trim().is_empty() {
        bail!("Nothing to send");
    }

    let database = &config.client.database;
    if let Some(parent) = database.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let store: Arc<dyn ChatStore> = Arc::new(
        SqliteChatStore::open(database)
            .with_context(|| format!("Failed to open history at {}", database.display()))?,
    );

    let server_url = args.server.unwrap_or(config.client.server_url.clone());
    let transport = Arc::new(HttpTransport::new(server_url));
    let credentials = Arc::new(EnvCredentials);
    let registry = Arc::new(config.registry());

    let summary_model = registry
        .resolve(&config.summary.model)
        .with_context(|| format!("Unknown summary model {:?}", config.summary.model))?
        .clone();
    let titles = TitleDeriver::new(
        transport.clone(),
        store.clone(),
        credentials.clone(),
        summary_model,
    );

    let deps = SessionDeps {
        store,
        chat: transport,
        titles,
        credentials,
        registry,
    };

    let thread_id = args
        .thread
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let model = args.model.unwrap_or(config.client.model);
    let session = ChatSession::open(thread_id, model, deps).await?;
    debug!(thread_id = %session.thread_id(), "chat session ready");

    let stopper = session.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop().await;
        }
    });

    let mut render = Renderer {
        show_reasoning: args.show_reasoning,
        wrote_text: false,
    };
    let mut events = session.subscribe();
    let send = session.send(prompt);
    tokio::pin!(send);

    let outcome = loop {
        tokio::select! {
            outcome = &mut send => break outcome,
            event = events.recv() => match event {
                Ok(event) => render.event(&event),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "renderer lagged"),
                Err(RecvError::Closed) => {}
            },
        }
    };
    while let Ok(event) = events.try_recv() {
        render.event(&event);
    }
    interrupt.abort();

    if render.wrote_text {
        println!();
    }
    match outcome? {
        TurnOutcome::Completed(_) if !render.wrote_text => eprintln!("(empty response)"),
        TurnOutcome::Completed(_) => {}
        TurnOutcome::Stopped => eprintln!("(stopped)"),
    }
    eprintln!("thread: {}", session.thread_id());
    Ok(())
}

struct Renderer {
    show_reasoning: bool,
    wrote_text: bool,
}

impl Renderer {
    fn event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::TextDelta { delta, .. } => {
                print!("{delta}");
                let _ = std::io::stdout().flush();
                self.wrote_text = true;
            }
            SessionEvent::ReasoningDelta { delta, .. } if self.show_reasoning => {
                eprint!("{delta}");
            }
            SessionEvent::TitleUpdated(title) => eprintln!("title: {title}"),
            SessionEvent::Notice(notice) => eprintln!("note: {notice}"),
            SessionEvent::Error(error) => eprintln!("error: {error}"),
            _ => {}
        }
    }
}
