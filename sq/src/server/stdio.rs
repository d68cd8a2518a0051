//! Request loop for the tool server
//!
//! Tool calls run as concurrent tasks; responses are written by a single
//! writer task in completion order, matched to requests by id.

use std::sync::Arc;
use std::time::Duration;

use chunkstore::SessionStore;
use eyre::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::messages::{ServerRequest, ServerResponse};
use crate::tools::{ToolCall, ToolContext, ToolExecutor};

/// Responses queued ahead of the writer
const RESPONSE_BUFFER: usize = 64;

/// Serves tool calls for one agent connection
pub struct ToolServer {
    executor: Arc<ToolExecutor>,
    ctx: ToolContext,
}

impl ToolServer {
    pub fn new(executor: Arc<ToolExecutor>, ctx: ToolContext) -> Self {
        debug!(?ctx, "ToolServer::new: called");
        Self { executor, ctx }
    }

    /// Answer one request
    pub async fn handle(&self, request: ServerRequest) -> ServerResponse {
        debug!(?request, "ToolServer::handle: called");
        match request {
            ServerRequest::CallTool { id, name, input } => {
                call_tool(&self.executor, &self.ctx, ToolCall { id, name, input }).await
            }
            ServerRequest::ListTools { id } => ServerResponse::Tools {
                id,
                tools: self.executor.definitions(),
            },
            ServerRequest::Ping => ServerResponse::Pong {
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            ServerRequest::Shutdown => ServerResponse::Ok,
        }
    }

    /// Read requests until EOF or `Shutdown`, writing one response line each
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        debug!("ToolServer::serve: called");
        let (tx, rx) = mpsc::channel(RESPONSE_BUFFER);
        let writer_task = tokio::spawn(write_responses(writer, rx));
        let mut calls = JoinSet::new();
        let mut lines = reader.lines();
        let mut shutdown = false;

        while let Some(line) = lines.next_line().await.context("Failed to read request")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let request = match serde_json::from_str::<ServerRequest>(line) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "Unparsable request");
                    let response = ServerResponse::Error {
                        message: format!("Invalid request: {}", e),
                    };
                    if tx.send(response).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            match request {
                ServerRequest::Shutdown => {
                    info!("Shutdown requested");
                    shutdown = true;
                    break;
                }
                ServerRequest::CallTool { id, name, input } => {
                    debug!(%id, %name, "ToolServer::serve: spawning tool call");
                    let executor = self.executor.clone();
                    let ctx = self.ctx.clone();
                    let tx = tx.clone();
                    calls.spawn(async move {
                        let response = call_tool(&executor, &ctx, ToolCall { id, name, input }).await;
                        let _ = tx.send(response).await;
                    });
                }
                other => {
                    let response = self.handle(other).await;
                    if tx.send(response).await.is_err() {
                        break;
                    }
                }
            }

            while let Some(joined) = calls.try_join_next() {
                if let Err(e) = joined {
                    warn!(error = %e, "Tool call task failed");
                }
            }
        }

        while let Some(joined) = calls.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Tool call task failed");
            }
        }
        if shutdown {
            let _ = tx.send(ServerResponse::Ok).await;
        }
        drop(tx);

        writer_task.await.context("Response writer task failed")??;
        info!("Tool server stopped");
        Ok(())
    }

    /// Serve on stdin/stdout with a background expiry sweep
    pub async fn serve_stdio(&self, sweep_interval: Duration) -> Result<()> {
        info!("Tool server listening on stdio");
        let sweeper = spawn_sweeper(self.ctx.responses.sessions().clone(), sweep_interval);
        let result = self
            .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await;
        sweeper.abort();
        result
    }
}

async fn call_tool(executor: &ToolExecutor, ctx: &ToolContext, call: ToolCall) -> ServerResponse {
    let result = executor.execute(&call, ctx).await;
    ServerResponse::ToolResult {
        id: call.id,
        content: result.content,
        is_error: result.is_error,
    }
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::Receiver<ServerResponse>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let response_json = serde_json::to_string(&response).context("Failed to serialize response")?;
        writer
            .write_all(response_json.as_bytes())
            .await
            .context("Failed to write response")?;
        writer.write_all(b"\n").await.context("Failed to write newline")?;
        writer.flush().await.context("Failed to flush response")?;
    }
    Ok(())
}

/// Periodically drop expired sessions
///
/// Reads already treat expired sessions as absent; the sweep only reclaims
/// memory. The first sweep happens one interval after start.
pub fn spawn_sweeper(sessions: Arc<SessionStore>, every: Duration) -> JoinHandle<()> {
    debug!(?every, "spawn_sweeper: called");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = sessions.evict_expired();
            debug!(removed, remaining = sessions.len(), "spawn_sweeper: swept");
        }
    })
}
