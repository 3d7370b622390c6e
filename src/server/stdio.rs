//! Newline-delimited JSON-RPC over stdin/stdout
//!
//! Messages are handled one at a time in arrival order. stdout carries
//! protocol traffic only; logs go to stderr.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use super::jsonrpc::RpcHandler;
use crate::types::Result;

/// Serve the process's stdin/stdout until stdin closes
pub async fn run(handler: &RpcHandler) -> Result<()> {
    info!("Serving tools on stdio");
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(handler, stdin, stdout).await?;
    info!("stdin closed, shutting down");
    Ok(())
}

/// Serve any line-oriented reader/writer pair
pub async fn serve<R, W>(handler: &RpcHandler, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }

        let Some(response) = handler.handle_bytes(line).await else {
            continue;
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
        debug!(bytes = out.len(), "Response written");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CredentialHasher, HasherConfig, IdentityResolver, ResolverConfig};
    use crate::server::jsonrpc::{RpcResponse, PARSE_ERROR};
    use crate::services::{Authenticator, TaskService};
    use crate::store::{MemoryTaskStore, TaskStore};
    use crate::tools::ToolRegistry;
    use std::sync::Arc;
    use std::time::Duration;

    fn handler() -> RpcHandler {
        let store: Arc<dyn TaskStore> = Arc::new(MemoryTaskStore::new());
        let hasher = CredentialHasher::new(HasherConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let auth = Authenticator::explicit(
            IdentityResolver::new(hasher, ResolverConfig::default()),
            Arc::clone(&store),
        );
        RpcHandler::new(Arc::new(ToolRegistry::new(
            Arc::new(auth),
            TaskService::new(store),
            Duration::from_secs(10),
        )))
    }

    #[tokio::test]
    async fn test_one_line_per_response() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"add_task","arguments":{"title":"stdio task","password":"abcd"}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"list_tasks","arguments":{"password":"abcd"}}}"#,
            "\n",
        );
        let mut output = Vec::new();

        serve(&handler(), input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<RpcResponse> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].id, 1);
        assert_eq!(responses[1].id, 2);
        assert_eq!(responses[2].id, 3);

        let listed = responses[2].result.as_ref().unwrap();
        assert!(listed["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("stdio task"));
    }

    #[tokio::test]
    async fn test_bad_bytes_do_not_end_the_session() {
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.extend_from_slice(b"\n\xff\xfe garbage\n");
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        input.push(b'\n');
        let mut output = Vec::new();

        serve(&handler(), input.as_slice(), &mut output).await.unwrap();

        let responses: Vec<RpcResponse> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].id, 1);
        assert_eq!(responses[1].error.as_ref().unwrap().code, PARSE_ERROR);
        assert_eq!(responses[2].id, 2);
        assert!(responses[2].error.is_none());
    }
}
