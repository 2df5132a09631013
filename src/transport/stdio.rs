//! stdio transport implementation
//!
//! Reads newline-delimited JSON from stdin and writes newline-delimited
//! JSON to stdout, flushing after each response. Messages are dispatched
//! strictly in arrival order; closed input ends the session.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio_util::sync::CancellationToken;
use crate::app::context::ServerRuntime;
use crate::auth::AuthRequest;
use crate::types::{Message, RequestId, Response};

/// Serves the runtime over the process's stdin/stdout
pub(crate) async fn serve(runtime: ServerRuntime) {
    let token = CancellationToken::new();
    spawn_shutdown_watcher(token.clone());

    let mut reader = BufReader::new(tokio::io::stdin());
    let mut writer = BufWriter::new(tokio::io::stdout());

    tracing::info!(logger = "faro", "Listening: stdio");

    let mut line = String::new();
    loop {
        line.clear();
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            read_line = reader.read_line(&mut line) => {
                match read_line {
                    Ok(0) => break, // EOF
                    Ok(_) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let resp = match Message::parse(line.as_bytes()) {
                            Ok(msg) => runtime.handle(msg, AuthRequest::new()).await,
                            Err(err) => Some(Response::error(RequestId::Null, err)),
                        };
                        if let Some(resp) = resp {
                            if let Err(err) = write_response(&mut writer, &resp).await {
                                tracing::error!(logger = "faro", "stdout write error: {err:?}");
                                break;
                            }
                        }
                    }
                    Err(err) => {
                        tracing::error!(logger = "faro", "stdin read error: {err:?}");
                        break;
                    }
                }
            }
        }
    }
}

async fn write_response(
    writer: &mut BufWriter<tokio::io::Stdout>,
    resp: &Response,
) -> std::io::Result<()> {
    match serde_json::to_vec(resp) {
        Ok(mut json_bytes) => {
            json_bytes.push(b'\n');
            writer.write_all(&json_bytes).await?;
            writer.flush().await
        }
        Err(err) => {
            tracing::error!(logger = "faro", "Serialization error: {err:?}");
            Ok(())
        }
    }
}

fn spawn_shutdown_watcher(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
}
