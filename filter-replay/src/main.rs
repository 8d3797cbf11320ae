// JDWP filter replay
//
// Drives the agent's event filter chain from a line-oriented JSON script
// against a simulated VM and prints one decision line per raised event

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

mod handlers;
mod protocol;
mod session;

use handlers::ScriptHandler;

#[tokio::main]
async fn main() -> Result<()> {
    // Tracing to stderr only - stdout carries the decision stream
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("filter_replay=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting filter replay, reading script from stdin...");

    let reader = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    let lines = run(reader, stdout).await?;

    info!("Script finished after {} lines", lines);
    Ok(())
}

/// Replay every script line from `reader`, writing replies to `writer`.
/// Returns the number of lines read.
async fn run<R, W>(mut reader: R, mut writer: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut handler = ScriptHandler::new();
    let mut count = 0;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            debug!("End of script");
            break;
        }
        count += 1;

        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(reply) = handler.handle_line(count, line) {
            let reply_str = serde_json::to_string(&reply)?;
            debug!("Sending: {}", reply_str);
            writer.write_all(reply_str.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }

    Ok(count)
}
