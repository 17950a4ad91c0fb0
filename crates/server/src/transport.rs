//! JSON-lines transport.
//!
//! Each input line is one request, handled concurrently; each reply is written as
//! one output line. Messages the worker posts to the peer page are written as
//! `{"message": ...}` lines. Logs never go to stdout.
use std::io;
use std::sync::Arc;

use serde::Serialize;
use swcache_client::intercept::ClientMessage;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use crate::handler::{WorkerHost, reject_line};

#[derive(Serialize)]
struct MessageLine<'a> {
    message: &'a ClientMessage,
}

fn forward(tx: &mpsc::UnboundedSender<String>, message: &ClientMessage) {
    match serde_json::to_string(&MessageLine { message }) {
        Ok(line) => {
            let _ = tx.send(line);
        }
        Err(e) => tracing::warn!("failed to serialize client message: {}", e),
    }
}

/// Serve requests from stdin until it closes.
pub async fn serve_stdio(host: Arc<WorkerHost>, messages: mpsc::UnboundedReceiver<ClientMessage>) -> io::Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    serve(host, input, tokio::io::stdout(), messages).await?;
    Ok(())
}

/// Serve requests from `input`, writing replies and page messages to `output`.
///
/// Lines that are not UTF-8 get an `INVALID_INPUT` reply and reading continues.
/// Returns the writer once input is exhausted and every reply is written.
pub async fn serve<R, W>(
    host: Arc<WorkerHost>, input: R, output: W, mut messages: mpsc::UnboundedReceiver<ClientMessage>,
) -> io::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        let mut output = output;
        while let Some(line) = rx.recv().await {
            output.write_all(line.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
        }
        Ok::<W, io::Error>(output)
    });

    let message_tx = tx.clone();
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let forwarder = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                message = messages.recv() => match message {
                    Some(message) => forward(&message_tx, &message),
                    None => break,
                },
                _ = &mut stop_rx => {
                    while let Ok(message) = messages.try_recv() {
                        forward(&message_tx, &message);
                    }
                    break;
                }
            }
        }
    });

    let mut requests = JoinSet::new();
    let mut input = input;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                let _ = tx.send(reject_line(format!("request is not valid UTF-8: {e}")));
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        let line = line.to_string();
        let host = Arc::clone(&host);
        let tx = tx.clone();
        requests.spawn(async move {
            let reply = host.handle_line(&line).await;
            // The writer only stops once every sender is gone.
            let _ = tx.send(reply);
        });
    }

    while let Some(joined) = requests.join_next().await {
        if let Err(e) = joined {
            tracing::warn!("request task failed: {}", e);
        }
    }

    let _ = stop_tx.send(());
    let _ = forwarder.await;
    drop(tx);

    writer.await.map_err(io::Error::other)?
}
