//! mcpchat - interactive console for tool-augmented chat over MCP

mod cli;
mod commands;
mod display;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use cli::Args;
use commands::{Command, HELP};
use display::{ConsoleObserver, DisplayFlags};
use mcpchat_core::chat::{ChatError, ChatTurnLoop, LoopConfig};
use mcpchat_core::config::{AppConfig, ConfigFile, ConfigLoader, McpEndpoint};
use mcpchat_core::{create_provider, log_warn, CancellationToken, ConsoleLogger, Logger, McpClient, ToolRegistry};

fn load_config(args: &Args) -> Result<AppConfig> {
    let workspace = std::env::current_dir().context("cannot determine current directory")?;
    let mut loader = ConfigLoader::standard(workspace);
    if let Some(path) = &args.config {
        loader = loader.with_file(ConfigFile::explicit(path));
    }

    let mut config = loader.load()?;
    args.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

async fn connect(config: &AppConfig, logger: Arc<dyn Logger>) -> Result<McpClient> {
    let endpoint = config
        .mcp
        .endpoint()
        .context("no MCP server configured")?;
    println!("Connecting to MCP server ({})...", endpoint);

    let client = match &endpoint {
        McpEndpoint::Stdio { command, args } => McpClient::connect_stdio(command, args, logger).await,
        McpEndpoint::Http(url) => McpClient::connect_http(url, logger).await,
        #[cfg(unix)]
        McpEndpoint::Unix(path) => McpClient::connect_unix(path, logger).await,
        #[cfg(not(unix))]
        McpEndpoint::Unix(_) => anyhow::bail!("Unix sockets are not supported on this platform"),
    }
    .with_context(|| format!("failed to connect to MCP server ({})", endpoint))?;

    Ok(match config.mcp.call_timeout() {
        Some(timeout) => client.with_call_timeout(timeout),
        None => client,
    })
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Run one query; Ctrl-C cancels it and returns to the prompt
async fn run_query(chat: &mut ChatTurnLoop, query: &str) {
    let token = CancellationToken::new();
    let fut = chat.process_query(query, &token);
    tokio::pin!(fut);

    let result = loop {
        tokio::select! {
            result = &mut fut => break result,
            _ = tokio::signal::ctrl_c(), if !token.is_cancelled() => {
                println!("\nCancelling...");
                token.cancel();
            }
        }
    };

    match result {
        Ok(outcome) => println!("\n{}\n", outcome.answer),
        Err(ChatError::Cancelled) => println!("Query cancelled.\n"),
        Err(e) => println!("Error: {}\n", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let logger: Arc<dyn Logger> = Arc::new(ConsoleLogger::new().with_min_level(args.log_level()));
    let config = load_config(&args)?;

    let mcp = Arc::new(connect(&config, logger.clone()).await?);
    if let Some(info) = mcp.server_info() {
        println!("Connected to {}", info);
    }

    let registry = Arc::new(ToolRegistry::new(logger.clone()));
    registry
        .refresh(mcp.as_ref())
        .await
        .context("failed to list tools from MCP server")?;

    let provider = create_provider(
        &config.model.provider,
        config.model.provider_model_config(),
        config.model.completion_options(),
        logger.clone(),
    );

    let flags = Arc::new(DisplayFlags::new(args.debug, args.raw));
    let observer = Arc::new(ConsoleObserver::new(flags.clone(), provider.model_id()));
    let server_info = mcp.server_info();

    let mut chat = ChatTurnLoop::new(
        provider,
        registry,
        mcp.clone(),
        config.chat.system_prompt.clone(),
        LoopConfig::from(&config.chat),
        logger.clone(),
    )
    .with_observer(observer);

    println!("{}", display::render_tools(&chat.registry().list()));
    println!("{}", display::render_model_info(chat.provider().as_ref()));
    println!("\n{}\n", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read input")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match Command::parse(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => println!("{}\n", HELP),
            Command::Clear => {
                chat.reset();
                println!("Conversation cleared.\n");
            }
            Command::History => println!("{}", display::render_history(chat.conversation())),
            Command::Tools => println!("{}", display::render_tools(&chat.registry().list())),
            Command::Refresh => match chat.refresh_tools().await {
                Ok(count) => println!("Refreshed: {} tool(s) available.\n", count),
                Err(e) => println!("Refresh failed, keeping previous tools: {}\n", e),
            },
            Command::ToggleDebug => {
                let on = flags.toggle_debug();
                println!("Debug mode {}.\n", if on { "on" } else { "off" });
            }
            Command::ToggleRaw => {
                let on = flags.toggle_raw();
                println!("Raw mode {}.\n", if on { "on" } else { "off" });
            }
            Command::Model => {
                println!("{}", display::render_model_info(chat.provider().as_ref()));
                if let Some(info) = &server_info {
                    println!("MCP:      {}", info);
                }
                println!();
            }
            Command::Interactions => {
                println!("{}\n", display::render_stats(chat.stats(), chat.conversation()));
            }
            Command::Query(query) => run_query(&mut chat, &query).await,
        }
    }

    println!("Goodbye!");
    drop(chat);
    if let Ok(client) = Arc::try_unwrap(mcp) {
        if let Err(e) = client.close().await {
            log_warn!(logger, "[main] Error closing MCP connection: {}", e);
        }
    }
    Ok(())
}
