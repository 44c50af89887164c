//! Line-delimited JSON-RPC over stdin/stdout
//!
//! One message per `\n`-terminated line. Lines are served strictly in order:
//! each response is written and flushed before the next line is read. A line
//! that is not UTF-8 is answered like any other undecodable message.

use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{error, info, trace, warn};

use crate::context::ServerContext;
use crate::errors::ProtocolFault;
use crate::mcp::rpc::fault_to_json_rpc;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("stdin read failed: {0}")]
    Read(#[source] std::io::Error),
    #[error("stdout write failed: {0}")]
    Write(#[source] std::io::Error),
    #[error("response serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One inbound line, with the trailing newline and surrounding whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    NotUtf8,
}

pub struct StdioTransport<R, W> {
    input: BufReader<R>,
    output: W,
    buffer: Vec<u8>,
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: BufReader::new(input),
            output,
            buffer: Vec::new(),
        }
    }

    /// `None` once the input is exhausted.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        self.buffer.clear();
        let read = self
            .input
            .read_until(b'\n', &mut self.buffer)
            .await
            .map_err(TransportError::Read)?;
        if read == 0 {
            return Ok(None);
        }

        trace!(bytes = read, "frame received");
        Ok(Some(match std::str::from_utf8(&self.buffer) {
            Ok(text) => Frame::Text(text.trim().to_string()),
            Err(_) => Frame::NotUtf8,
        }))
    }

    pub async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        let mut line = Vec::with_capacity(message.len() + 1);
        line.extend_from_slice(message.as_bytes());
        line.push(b'\n');

        self.output
            .write_all(&line)
            .await
            .map_err(TransportError::Write)?;
        self.output.flush().await.map_err(TransportError::Write)?;
        trace!(bytes = line.len(), "frame sent");
        Ok(())
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

/// Serves requests from `transport` until the input stream closes.
///
/// Only I/O failures on the streams themselves end the loop.
pub async fn serve<R, W>(
    context: Arc<ServerContext>,
    transport: &mut StdioTransport<R, W>,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("mcp server listening on stdio");

    while let Some(frame) = transport.next_frame().await? {
        let response = match frame {
            Frame::Text(line) if line.is_empty() => continue,
            Frame::Text(line) => context.dispatcher().handle_text(&line).await,
            Frame::NotUtf8 => {
                warn!("discarding request line that is not valid UTF-8");
                Some(fault_to_json_rpc(
                    None,
                    &ProtocolFault::InvalidRequest("request is not valid UTF-8"),
                ))
            }
        };
        let Some(response) = response else {
            continue;
        };

        let encoded = serde_json::to_string(&response).inspect_err(|err| {
            error!(error = %err, "failed to serialize response");
        })?;
        transport.send(&encoded).await?;
    }

    info!("stdin closed, shutting down");
    Ok(())
}

pub async fn run_stdio(context: Arc<ServerContext>) -> Result<(), TransportError> {
    let mut transport = StdioTransport::new(tokio::io::stdin(), tokio::io::stdout());
    serve(context, &mut transport).await
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use serde_json::Value;

    use super::*;
    use crate::config::Config;
    use crate::toolsets::builtin_sources;

    fn context() -> (tempfile::TempDir, Arc<ServerContext>) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config {
            resource_directory: dir.path().join("resources"),
            prompts_directory: dir.path().join("prompts"),
            ..Config::default()
        };
        let context = Arc::new(ServerContext::new(config, builtin_sources()));
        (dir, context)
    }

    fn responses(output: Vec<u8>) -> Vec<Value> {
        String::from_utf8(output)
            .expect("utf8")
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).expect("json line"))
            .collect()
    }

    #[tokio::test]
    async fn frames_are_trimmed_and_end_at_eof() {
        let mut transport =
            StdioTransport::new(Cursor::new(b"  {}\r\n\xff\nlast".to_vec()), Vec::new());

        assert_eq!(
            transport.next_frame().await.expect("read"),
            Some(Frame::Text("{}".to_string()))
        );
        assert_eq!(transport.next_frame().await.expect("read"), Some(Frame::NotUtf8));
        assert_eq!(
            transport.next_frame().await.expect("read"),
            Some(Frame::Text("last".to_string()))
        );
        assert_eq!(transport.next_frame().await.expect("read"), None);
    }

    #[tokio::test]
    async fn send_terminates_each_message_with_newline() {
        let mut transport = StdioTransport::new(Cursor::new(Vec::<u8>::new()), Vec::new());

        transport.send("{\"ok\":true}").await.expect("write");
        transport.send("{}").await.expect("write");

        let output = String::from_utf8(transport.into_output()).expect("utf8");
        assert_eq!(output, "{\"ok\":true}\n{}\n");
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_answered_and_serving_continues() {
        let (_dir, context) = context();
        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}\n");
        let mut transport = StdioTransport::new(Cursor::new(input), Vec::new());

        serve(context, &mut transport).await.expect("served");

        let responses = responses(transport.into_output());
        assert_eq!(responses.len(), 2);
        assert!(responses[0]["id"].is_null());
        assert_eq!(responses[0]["error"]["code"], -32600);
        assert_eq!(responses[1]["id"], 9);
        assert_eq!(responses[1]["result"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn serves_lines_in_order_and_skips_notifications() {
        let (_dir, context) = context();

        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n",
            "\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "not json\n",
            "{\"jsonrpc\":\"2.0\",\"id\":\"two\",\"method\":\"tools/call\",\"params\":{\"name\":\"text_reverse\",\"arguments\":{\"text\":\"abc\"}}}\n",
        );
        let mut transport = StdioTransport::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());

        serve(context, &mut transport).await.expect("served");

        let responses = responses(transport.into_output());

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"], serde_json::json!({}));
        assert!(responses[1]["id"].is_null());
        assert_eq!(responses[1]["error"]["code"], -32600);
        assert_eq!(responses[2]["id"], "two");
        assert_eq!(responses[2]["result"]["content"][0]["text"], "cba");
    }
}
