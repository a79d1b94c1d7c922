// MCP stdio transport
//
// Reads JSON-RPC messages from a reader and writes responses to a writer.
// Messages are either newline-delimited or framed with a Content-Length
// header. Once a framed message is seen, every response is framed.

use super::server::{handle_message, McpState};
use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

/// Largest accepted `Content-Length` body
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// Serve MCP over the process's stdin and stdout
pub async fn serve_stdio(state: &McpState) -> anyhow::Result<()> {
    info!("Reading JSON-RPC from stdin, writing to stdout");
    let reader = tokio::io::BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    serve(state, reader, writer).await
}

/// Serve MCP over arbitrary streams until the reader hits EOF
pub async fn serve<R, W>(state: &McpState, reader: R, writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    serve_with_limit(state, reader, writer, MAX_MESSAGE_BYTES).await
}

/// Serve MCP, discarding framed bodies longer than `max_message_bytes`
pub async fn serve_with_limit<R, W>(
    state: &McpState,
    mut reader: R,
    mut writer: W,
    max_message_bytes: usize,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut use_content_length = false;

    loop {
        let mut line = String::new();
        let bytes = reader
            .read_line(&mut line)
            .await
            .context("Failed to read input")?;
        if bytes == 0 {
            break;
        }

        let line_trim = line.trim_end();
        if line_trim.is_empty() {
            continue;
        }

        let (payload, framed) = match content_length(line_trim) {
            Some(Ok(length)) if length > max_message_bytes => {
                warn!(
                    "Content-Length {} exceeds limit of {} bytes, discarding message",
                    length, max_message_bytes
                );
                skip_headers(&mut reader).await?;
                let mut body = (&mut reader).take(length as u64);
                tokio::io::copy(&mut body, &mut tokio::io::sink())
                    .await
                    .context("Failed to discard oversized payload")?;
                continue;
            }
            Some(Ok(length)) => {
                skip_headers(&mut reader).await?;
                let mut buf = vec![0u8; length];
                reader
                    .read_exact(&mut buf)
                    .await
                    .context("Failed to read JSON payload")?;
                (String::from_utf8_lossy(&buf).into_owned(), true)
            }
            Some(Err(e)) => {
                warn!("Invalid Content-Length header: {}", e);
                continue;
            }
            None => (line_trim.to_string(), false),
        };

        use_content_length = use_content_length || framed;

        if let Some(response) = handle_message(state, &payload).await {
            let json = serde_json::to_string(&response).context("Failed to serialize response")?;
            write_message(&mut writer, &json, use_content_length).await?;
        }
    }

    Ok(())
}

/// Parse a `Content-Length: N` header line
fn content_length(line: &str) -> Option<Result<usize, std::num::ParseIntError>> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    Some(value.trim().parse())
}

/// Consume remaining header lines up to the blank separator
async fn skip_headers<R: AsyncBufRead + Unpin>(reader: &mut R) -> anyhow::Result<()> {
    loop {
        let mut header = String::new();
        let bytes = reader
            .read_line(&mut header)
            .await
            .context("Failed to read header")?;
        if bytes == 0 || header.trim().is_empty() {
            return Ok(());
        }
    }
}

async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    json: &str,
    framed: bool,
) -> anyhow::Result<()> {
    let message = if framed {
        format!("Content-Length: {}\r\n\r\n{}", json.len(), json)
    } else {
        format!("{}\n", json)
    };
    writer
        .write_all(message.as_bytes())
        .await
        .context("Failed to write response")?;
    writer.flush().await.context("Failed to flush output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MatchRecord, MemoryStore};
    use crate::suggest::LibrarySuggester;
    use serde_json::Value;
    use std::sync::Arc;

    fn state() -> McpState {
        let store = MemoryStore::new().with_library(
            "tokio",
            vec![MatchRecord::new("Spawning tasks", Some(0.8), "https://tokio.rs")],
        );
        McpState::new(LibrarySuggester::new(Arc::new(store)))
    }

    #[test]
    fn test_content_length_header() {
        assert_eq!(content_length("Content-Length: 42"), Some(Ok(42)));
        assert_eq!(content_length("content-length:7"), Some(Ok(7)));
        assert!(matches!(content_length("Content-Length: x"), Some(Err(_))));
        assert_eq!(content_length(r#"{"jsonrpc":"2.0"}"#), None);
    }

    #[tokio::test]
    async fn test_line_delimited_session() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"suggest_libraries","arguments":{"query":"spawn"}}}"#,
            "\n",
        );
        let mut output = Vec::new();

        serve(&state(), input.as_bytes(), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let responses: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"]["isError"], false);
    }

    #[tokio::test]
    async fn test_content_length_framed_session() {
        let body = r#"{"jsonrpc":"2.0","id":7,"method":"tools/list"}"#;
        let input = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        let mut output = Vec::new();

        serve(&state(), input.as_bytes(), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let (header, json) = text.split_once("\r\n\r\n").expect("framed output");
        assert_eq!(header, format!("Content-Length: {}", json.len()));
        let response: Value = serde_json::from_str(json).unwrap();
        assert_eq!(response["id"], 7);
        assert_eq!(response["result"]["tools"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_oversized_framed_message_is_discarded() {
        let oversized = format!(
            r#"{{"jsonrpc":"2.0","id":1,"method":"tools/list","params":{{"pad":"{}"}}}}"#,
            "x".repeat(100)
        );
        let body = r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#;
        let input = format!(
            "Content-Length: {}\r\n\r\n{}Content-Length: {}\r\n\r\n{}",
            oversized.len(),
            oversized,
            body.len(),
            body
        );
        let mut output = Vec::new();

        serve_with_limit(&state(), input.as_bytes(), &mut output, 64)
            .await
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("Content-Length:").count(), 1);
        let (_, json) = text.split_once("\r\n\r\n").expect("framed output");
        let response: Value = serde_json::from_str(json).unwrap();
        assert_eq!(response["id"], 2);
    }
}
