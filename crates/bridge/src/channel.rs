//! Method-channel envelope and a JSON-lines transport for it.
//!
//! Each request line is answered by exactly one response line carrying the same
//! `id`. Requests run concurrently, so responses come back in completion order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use usual_permission_core::{BridgeError, PermissionState};

use crate::dispatcher::PermissionDispatcher;

pub const CHANNEL_NAME: &str = "flutter_usual_permission";

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Response writer stopped")]
    WriterStopped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodCall {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MethodResponse {
    Success {
        id: Option<u64>,
        result: String,
    },
    Error {
        id: Option<u64>,
        code: String,
        message: String,
        details: Option<Value>,
    },
    NotImplemented {
        id: Option<u64>,
    },
}

impl MethodResponse {
    pub fn from_result(id: Option<u64>, result: Result<PermissionState, BridgeError>) -> Self {
        match result {
            Ok(state) => Self::Success {
                id,
                result: state.as_wire().to_string(),
            },
            Err(BridgeError::NotImplemented(_)) => Self::NotImplemented { id },
            Err(e) => Self::Error {
                id,
                code: e.code().to_string(),
                message: e.to_string(),
                details: None,
            },
        }
    }

    pub fn id(&self) -> Option<u64> {
        match self {
            Self::Success { id, .. } | Self::Error { id, .. } | Self::NotImplemented { id } => *id,
        }
    }
}

#[derive(Clone)]
pub struct MethodChannel {
    dispatcher: Arc<PermissionDispatcher>,
}

impl MethodChannel {
    pub fn new(dispatcher: Arc<PermissionDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn name(&self) -> &'static str {
        CHANNEL_NAME
    }

    pub async fn handle(&self, call: MethodCall) -> MethodResponse {
        debug!(id = call.id, method = %call.method, "incoming call");
        let result = self.dispatcher.dispatch(&call.method, &call.arguments).await;
        MethodResponse::from_result(Some(call.id), result)
    }

    /// Serves calls from `reader` until EOF, then waits for in-flight calls to answer.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<(), ChannelError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<MethodResponse>();
        let writer_task = tokio::spawn(write_responses(writer, rx));

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = trim_line(&buf);
            if line.is_empty() {
                continue;
            }

            let call = match serde_json::from_slice::<MethodCall>(line) {
                Ok(call) => call,
                Err(e) => {
                    warn!("Malformed call: {}", e);
                    let id = serde_json::from_slice::<Value>(line)
                        .ok()
                        .and_then(|v| v.get("id").and_then(Value::as_u64));
                    let response = MethodResponse::from_result(
                        id,
                        Err(BridgeError::InvalidArgument(format!("Malformed call: {e}"))),
                    );
                    if tx.send(response).is_err() {
                        break;
                    }
                    continue;
                }
            };

            let channel = self.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let response = channel.handle(call).await;
                if tx.send(response).is_err() {
                    error!("Dropped response: writer is gone");
                }
            });
        }

        drop(tx);
        match writer_task.await {
            Ok(result) => result,
            Err(join_err) => {
                error!("Response writer failed: {}", join_err);
                Err(ChannelError::WriterStopped)
            }
        }
    }
}

fn trim_line(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

async fn write_responses<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<MethodResponse>,
) -> Result<(), ChannelError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_vec(&response)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
    }
    Ok(())
}
