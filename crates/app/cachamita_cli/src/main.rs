// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use std::io::Write;

use cachamita_core::reply::ReplyOutcome;
use clap::Parser;
use cli::{Cli, Commands};
use client::ChatClient;
use session::Session;
use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;

mod cli;
mod client;
mod logging;
mod session;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        eprintln!("error: {e}");
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    let _logger = logging::init()?;

    let args = Cli::parse();

    match args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Commands::Chat { url } => runtime()?.block_on(chat(&url))?,
        Commands::Ask { url, message } => runtime()?.block_on(ask(&url, &message))?,
    }

    Ok(())
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

/// Single question; a failed or cancelled reply is an error.
async fn ask(url: &str, message: &str) -> Result<()> {
    let mut session = Session::new(ChatClient::new(url)?);
    let cancel = cancel_on_ctrl_c();
    let outcome = session
        .ask(message, cancel.clone(), std::io::stdout().lock())
        .await;
    cancel.cancel();
    match outcome? {
        ReplyOutcome::Completed => Ok(()),
        ReplyOutcome::Failed(e) => Err(Error::Custom(e.to_string())),
        ReplyOutcome::Cancelled => Err(Error::Custom("reply cancelled".to_string())),
    }
}

/// Interactive loop over stdin lines until EOF, Ctrl-C at the prompt or `/salir`.
async fn chat(url: &str) -> Result<()> {
    let client = ChatClient::new(url)?;
    log::info!("chatting with {}", client.endpoint());
    let mut session = Session::new(client);
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("tú> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "/salir" {
            break;
        }

        let cancel = cancel_on_ctrl_c();
        let outcome = session
            .ask(message, cancel.clone(), std::io::stdout().lock())
            .await;
        cancel.cancel();

        match outcome {
            Ok(ReplyOutcome::Completed) => {}
            Ok(ReplyOutcome::Cancelled) => eprintln!("(respuesta detenida)"),
            Ok(ReplyOutcome::Failed(e)) => {
                log::warn!("reply interrupted: {e}");
                eprintln!("(respuesta interrumpida)");
            }
            Err(e) => {
                log::warn!("request failed: {e}");
                eprintln!("error: {e}");
            }
        }
    }

    Ok(())
}

/// Token cancelled by the next Ctrl-C; cancelling it also stops the watcher.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => watcher.cancel(),
            _ = watcher.cancelled() => {}
        }
    });
    cancel
}
