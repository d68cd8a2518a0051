//! Integration tests for SqlTools
//!
//! These tests drive the tools end to end with an in-memory executor.

use std::sync::Arc;
use std::time::Duration;

use chunkstore::{ChunkingConfig, FormatOptions, ResponseManager, SessionStore, TokenEstimator};
use serde_json::{Value, json};
use sqltools::config::Config;
use sqltools::server::{ServerResponse, ToolServer};
use sqltools::tools::{ToolCall, ToolContext, ToolExecutor};
use sqltools::warehouse::{StaticExecutor, TabularResult};
use sqltools::workspace::{Role, WorkspaceConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

fn customers(n: usize) -> TabularResult {
    TabularResult::new(
        vec!["id".to_string(), "name".to_string()],
        (0..n).map(|i| vec![json!(i), json!(format!("customer-{}", i))]).collect(),
    )
}

fn config() -> Config {
    Config {
        role: Role::Analyst,
        default_workspace: Some("prod".to_string()),
        workspaces: vec![WorkspaceConfig::new("prod", "https://prod.example.com", "wh-prod")],
        chunking: ChunkingConfig::default(),
        ..Default::default()
    }
}

fn call(id: &str, name: &str, input: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        input,
    }
}

fn parse(content: &str) -> Value {
    serde_json::from_str(content).expect("tool output is JSON")
}

// =============================================================================
// Chunked Query Tests
// =============================================================================

#[tokio::test]
async fn test_fifty_thousand_rows_reassemble() {
    let config = config();
    let ctx = ToolContext::from_config(&config, Arc::new(StaticExecutor::new(customers(50_000))))
        .expect("Failed to build context");
    let executor = ToolExecutor::standard();
    let estimator = ctx.responses.estimator().clone();

    let first = executor
        .execute(&call("1", "execute_sql", json!({"sql": "select id, name from customers"})), &ctx)
        .await;
    assert!(!first.is_error, "execute_sql failed: {}", first.content);

    let envelope = parse(&first.content);
    assert_eq!(envelope["chunked"], true);
    assert_eq!(envelope["chunk_index"], 0);
    assert_eq!(envelope["total_rows"], 50_000);
    let chunk_count = envelope["chunk_count"].as_u64().unwrap() as usize;
    assert!(chunk_count > 1);
    assert!(estimator.estimate(&envelope, false) <= config.chunking.max_tokens);

    let session_id = envelope["session_id"].as_str().unwrap().to_string();
    let mut rows: Vec<Value> = envelope["data"]["rows"].as_array().unwrap().clone();
    assert_eq!(envelope["data"]["workspace"], "prod");

    for index in 1..chunk_count {
        let result = executor
            .execute(
                &call(
                    "n",
                    "get_chunk",
                    json!({"session_id": session_id, "chunk_index": index}),
                ),
                &ctx,
            )
            .await;
        assert!(!result.is_error, "get_chunk {} failed: {}", index, result.content);

        let chunk = parse(&result.content);
        assert_eq!(chunk["chunk_index"], index);
        assert_eq!(chunk["data"]["columns"], json!(["id", "name"]));
        assert!(estimator.estimate(&chunk["data"], true) <= config.chunking.max_tokens);
        rows.extend(chunk["data"]["rows"].as_array().unwrap().iter().cloned());
    }

    assert_eq!(rows.len(), 50_000);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row["id"], i);
    }

    let info = parse(
        &executor
            .execute(
                &call("i", "get_chunking_session_info", json!({"session_id": session_id})),
                &ctx,
            )
            .await
            .content,
    );
    assert_eq!(info["chunk_count"], chunk_count);
    assert_eq!(info["total_row_count"], 50_000);
    assert_eq!(info["oversized_chunks"], json!([]));
}

#[tokio::test]
async fn test_get_chunk_nonexistent_session() {
    let ctx = ToolContext::from_config(&config(), Arc::new(StaticExecutor::new(customers(1)))).unwrap();
    let result = ToolExecutor::standard()
        .execute(
            &call("1", "get_chunk", json!({"session_id": "nonexistent-id", "chunk_index": 0})),
            &ctx,
        )
        .await;

    assert!(result.is_error);
    let envelope = parse(&result.content);
    assert_eq!(envelope["error"], "session_not_found");
    assert_eq!(envelope["session_id"], "nonexistent-id");
}

#[tokio::test]
async fn test_expired_session_not_found_after_reads() {
    let responses = ResponseManager::new(
        Arc::new(TokenEstimator::heuristic()),
        Arc::new(SessionStore::new(Duration::from_millis(200), None)),
        500,
    );
    let ctx = ToolContext::new(
        Arc::new(responses),
        Arc::new(StaticExecutor::new(customers(500))),
        Role::Analyst,
    )
    .with_workspaces(config().workspaces, None);
    let executor = ToolExecutor::standard();

    let envelope = parse(
        &executor
            .execute(&call("1", "execute_sql", json!({"sql": "select 1"})), &ctx)
            .await
            .content,
    );
    let session_id = envelope["session_id"].as_str().unwrap().to_string();

    let read = executor
        .execute(&call("2", "get_chunk", json!({"session_id": session_id, "chunk_index": 1})), &ctx)
        .await;
    assert!(!read.is_error);

    tokio::time::sleep(Duration::from_millis(300)).await;

    for index in [0, 1] {
        let result = executor
            .execute(
                &call("3", "get_chunk", json!({"session_id": session_id, "chunk_index": index})),
                &ctx,
            )
            .await;
        assert!(result.is_error);
        assert_eq!(parse(&result.content)["error"], "session_not_found");
    }
}

#[tokio::test]
async fn test_empty_payload_inline() {
    let manager = ResponseManager::from_config(&ChunkingConfig::default()).unwrap();
    let response = manager.format(&json!({}), FormatOptions::default());
    assert_eq!(response.render(), "{}");
    assert!(manager.sessions().is_empty());
}

#[tokio::test]
async fn test_unknown_model_falls_back() {
    let chunking = ChunkingConfig {
        model: "some-future-model".to_string(),
        ..Default::default()
    };
    let manager = ResponseManager::from_config(&chunking).unwrap();
    assert!(manager.estimator().estimate(&json!({"a": "hello world"}), false) > 0);
}

// =============================================================================
// Server Tests
// =============================================================================

#[tokio::test]
async fn test_server_concurrent_calls_over_pipe() {
    let ctx = ToolContext::from_config(&config(), Arc::new(StaticExecutor::new(customers(5)))).unwrap();
    let server = ToolServer::new(Arc::new(ToolExecutor::standard()), ctx);

    let (client, server_end) = tokio::io::duplex(256 * 1024);
    let (server_read, server_write) = tokio::io::split(server_end);
    let (client_read, mut client_write) = tokio::io::split(client);

    let serve = tokio::spawn(async move { server.serve(BufReader::new(server_read), server_write).await });

    let requests = [
        json!({"type": "ListTools", "id": "tools"}),
        json!({"type": "CallTool", "id": "a", "name": "execute_sql", "input": {"sql": "select 1"}}),
        json!({"type": "CallTool", "id": "b", "name": "list_workspaces", "input": {}}),
        json!({"type": "CallTool", "id": "c", "name": "get_chunk", "input": {"session_id": "nope", "chunk_index": 0}}),
        json!({"type": "CallTool", "id": "d", "name": "drop_table"}),
        json!({"type": "Shutdown"}),
    ];
    for request in &requests {
        client_write.write_all(request.to_string().as_bytes()).await.unwrap();
        client_write.write_all(b"\n").await.unwrap();
    }
    client_write.flush().await.unwrap();

    let mut responses = Vec::new();
    let mut lines = BufReader::new(client_read).lines();
    while let Some(line) = lines.next_line().await.unwrap() {
        let response: ServerResponse = serde_json::from_str(&line).unwrap();
        let done = response == ServerResponse::Ok;
        responses.push(response);
        if done {
            break;
        }
    }
    tokio::time::timeout(Duration::from_secs(5), serve)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    assert_eq!(responses.len(), 6);
    assert_eq!(responses.last(), Some(&ServerResponse::Ok));

    let result_for = |wanted: &str| {
        responses
            .iter()
            .find_map(|r| match r {
                ServerResponse::ToolResult { id, content, is_error } if id == wanted => {
                    Some((parse(content), *is_error))
                }
                _ => None,
            })
            .unwrap_or_else(|| panic!("no result for {}", wanted))
    };

    let (payload, is_error) = result_for("a");
    assert!(!is_error);
    assert_eq!(payload["row_count"], 5);

    let (payload, _) = result_for("b");
    assert_eq!(payload["active_workspace"], "prod");

    let (payload, is_error) = result_for("c");
    assert!(is_error);
    assert_eq!(payload["error"], "session_not_found");

    let (payload, is_error) = result_for("d");
    assert!(is_error);
    assert_eq!(payload["error"], "unknown_tool");

    assert!(responses
        .iter()
        .any(|r| matches!(r, ServerResponse::Tools { id, tools } if id == "tools" && tools.len() == 4)));
}
