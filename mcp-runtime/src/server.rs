//! JSON-RPC 2.0 over stdio.
//!
//! Clients may frame messages with `Content-Length` headers or send one JSON
//! document per line; each reply uses the framing of the message it answers.

use serde_json::{Map, Value, json};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::dispatch::Dispatcher;
use crate::error::ToolError;
use crate::prompts::PromptResolver;

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const MCP_SERVER_NAME: &str = "directus-mcp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    ContentLength,
    Line,
}

/// One message read from the transport. `payload` is `Err` when the input
/// could not be decoded (bad JSON, bad UTF-8, bad header, oversized body).
#[derive(Debug)]
pub struct Incoming {
    pub framing: Framing,
    pub payload: Result<Value, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(-32700, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(-32600, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, format!("Method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(-32602, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(-32603, message)
    }

    /// Prompt failures have no `isError` envelope, so they surface as
    /// protocol errors carrying the classified message and code.
    fn from_prompt_error(err: &ToolError) -> Self {
        let summary = err.classify();
        let base = match err {
            ToolError::PromptNotFound(_) | ToolError::InvalidArguments(_) => {
                Self::invalid_params(summary.error)
            }
            _ => Self::internal(summary.error),
        };
        Self {
            data: summary.code.map(|code| json!({ "code": code })),
            ..base
        }
    }
}

pub struct McpServer {
    dispatcher: Dispatcher,
    prompts: Option<PromptResolver>,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher, prompts: Option<PromptResolver>) -> Self {
        Self { dispatcher, prompts }
    }

    pub async fn serve_stdio(&self) -> io::Result<()> {
        self.serve(BufReader::new(io::stdin()), io::stdout()).await
    }

    /// Answer messages from `reader` until it is exhausted.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(
            tools = self.dispatcher.registry().len(),
            prompts = self.prompts.is_some(),
            "mcp server ready"
        );
        while let Some(incoming) = read_message(&mut reader).await? {
            let response = match incoming.payload {
                Ok(message) => self.handle_incoming_message(message).await,
                Err(e) => {
                    tracing::warn!(error = %e, "unparseable message");
                    Some(error_response(Value::Null, RpcError::parse_error(e)))
                }
            };
            if let Some(response) = response {
                write_message(&mut writer, incoming.framing, &response).await?;
            }
        }
        tracing::info!("client closed the connection");
        Ok(())
    }

    /// Answer a single message or a batch. `None` when nothing needs a reply.
    pub async fn handle_incoming_message(&self, incoming: Value) -> Option<Value> {
        let Value::Array(batch) = incoming else {
            return self.handle_single_message(incoming).await;
        };
        if batch.is_empty() {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Batch request must not be empty"),
            ));
        }
        let mut responses = Vec::new();
        for item in batch {
            if let Some(response) = self.handle_single_message(item).await {
                responses.push(response);
            }
        }
        (!responses.is_empty()).then_some(Value::Array(responses))
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        // Client responses carry no method; this server never sends requests.
        let method = obj.get("method").and_then(Value::as_str)?;

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        let Some(id) = obj.get("id").cloned() else {
            tracing::debug!(method, "notification ignored");
            return None;
        };
        Some(match self.handle_request(method, params).await {
            Ok(payload) => success_response(id, payload),
            Err(err) => error_response(id, err),
        })
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.dispatcher.registry().list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "prompts/list" => self.handle_prompts_list().await,
            "prompts/get" => self.handle_prompts_get(params).await,
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        let mut capabilities = json!({
            "tools": { "listChanged": false }
        });
        if self.prompts.is_some() {
            capabilities["prompts"] = json!({ "listChanged": false });
        }
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": capabilities,
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires a string 'name'"))?;
        let arguments = object_param(params, "arguments")?;

        let envelope = self
            .dispatcher
            .dispatch(name, Value::Object(arguments))
            .await;
        Ok(envelope.to_value())
    }

    async fn handle_prompts_list(&self) -> Result<Value, RpcError> {
        let Some(prompts) = &self.prompts else {
            return Ok(json!({ "prompts": [] }));
        };
        let listed = prompts
            .list()
            .await
            .map_err(|e| RpcError::from_prompt_error(&e))?;
        Ok(json!({ "prompts": listed }))
    }

    async fn handle_prompts_get(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("prompts/get params must be an object"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("prompts/get requires a string 'name'"))?;
        let Some(prompts) = &self.prompts else {
            return Err(RpcError::from_prompt_error(&ToolError::PromptNotFound(
                name.to_string(),
            )));
        };
        let arguments = object_param(params, "arguments")?;
        let messages = prompts
            .get(name, &arguments)
            .await
            .map_err(|e| RpcError::from_prompt_error(&e))?;
        Ok(json!({ "messages": messages }))
    }
}

/// An optional object parameter; missing or `null` reads as empty.
fn object_param(params: &Map<String, Value>, key: &str) -> Result<Map<String, Value>, RpcError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(RpcError::invalid_params(format!("'{key}' must be an object"))),
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    let mut payload = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    });
    if let Some(data) = error.data {
        payload["error"]["data"] = data;
    }
    payload
}

/// Largest `Content-Length` body accepted; larger bodies are skipped and
/// answered with a parse error.
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// Read the next message in whichever framing the client used. `Ok(None)`
/// at end of input. Malformed input becomes an `Err` payload so the session
/// can continue; only transport failures surface as `io::Error`.
pub async fn read_message<R>(reader: &mut R) -> io::Result<Option<Incoming>>
where
    R: AsyncBufRead + Unpin,
{
    let line = loop {
        match read_line(reader).await? {
            None => return Ok(None),
            Some(Ok(line)) if line.trim().is_empty() => continue,
            Some(Ok(line)) => break line,
            Some(Err(e)) => {
                return Ok(Some(Incoming {
                    framing: Framing::Line,
                    payload: Err(e),
                }));
            }
        }
    };

    if !line.to_ascii_lowercase().starts_with("content-length:") {
        return Ok(Some(Incoming {
            framing: Framing::Line,
            payload: serde_json::from_str(line.trim()).map_err(|e| format!("Parse error: {e}")),
        }));
    }

    let content_length = parse_content_length(&line);
    loop {
        match read_line(reader).await? {
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "Unexpected EOF while reading MCP headers",
                ));
            }
            Some(Ok(header)) if header.trim().is_empty() => break,
            Some(_) => {}
        }
    }

    let payload = match content_length {
        Err(e) => Err(e),
        Ok(length) if length > MAX_MESSAGE_BYTES => {
            let skipped = io::copy(&mut (&mut *reader).take(length as u64), &mut io::sink()).await?;
            if skipped < length as u64 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "Unexpected EOF while skipping an oversized MCP message",
                ));
            }
            Err(format!(
                "Parse error: message of {length} bytes exceeds the {MAX_MESSAGE_BYTES} byte limit"
            ))
        }
        Ok(length) => {
            let mut body = vec![0_u8; length];
            reader.read_exact(&mut body).await?;
            serde_json::from_slice(&body).map_err(|e| format!("Parse error: {e}"))
        }
    };
    Ok(Some(Incoming {
        framing: Framing::ContentLength,
        payload,
    }))
}

/// One raw line. The inner `Err` means it was not valid UTF-8.
async fn read_line<R>(reader: &mut R) -> io::Result<Option<Result<String, String>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut bytes = Vec::new();
    if reader.read_until(b'\n', &mut bytes).await? == 0 {
        return Ok(None);
    }
    Ok(Some(
        String::from_utf8(bytes).map_err(|e| format!("Parse error: invalid UTF-8: {e}")),
    ))
}

fn parse_content_length(header: &str) -> Result<usize, String> {
    header
        .split_once(':')
        .map(|(_, value)| value.trim())
        .and_then(|value| value.parse::<usize>().ok())
        .ok_or_else(|| format!("Parse error: invalid header {:?}", header.trim()))
}

pub async fn write_message<W>(writer: &mut W, framing: Framing, value: &Value) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    match framing {
        Framing::ContentLength => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
        Framing::Line => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
    }
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::Method;

    use super::*;
    use crate::backend::stub::StubBackend;
    use crate::tools::testing::dispatcher;

    fn server(stub: Arc<StubBackend>) -> McpServer {
        McpServer::new(dispatcher(stub, &["delete-item"]), None)
    }

    async fn exchange(server: &McpServer, input: &str) -> String {
        exchange_bytes(server, input.as_bytes()).await
    }

    async fn exchange_bytes(server: &McpServer, input: &[u8]) -> String {
        let mut output = Vec::new();
        server
            .serve(BufReader::new(input), &mut output)
            .await
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    const PING: &str = r#"{"jsonrpc":"2.0","id":9,"method":"ping"}"#;

    fn lines(output: &str) -> Vec<Value> {
        output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn line_framed_initialize_and_list() {
        let server = server(Arc::new(StubBackend::new()));
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        );
        let replies = lines(&exchange(&server, input).await);
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["result"]["protocolVersion"], json!(MCP_PROTOCOL_VERSION));
        assert!(replies[0]["result"]["capabilities"].get("prompts").is_none());

        let names: Vec<&str> = replies[1]["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect();
        assert!(names.contains(&"read-items"));
        assert!(!names.contains(&"delete-item"));
    }

    #[tokio::test]
    async fn content_length_framing_is_echoed() {
        let stub = Arc::new(StubBackend::new().with_response(
            Method::GET,
            "/items/posts",
            json!([{ "id": 1 }]),
        ));
        let server = server(stub);
        let body = r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"read-items","arguments":{"collection":"posts"}}}"#;
        let input = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        let output = exchange(&server, &input).await;

        let (header, payload) = output.split_once("\r\n\r\n").unwrap();
        assert!(header.starts_with("Content-Length: "));
        let reply: Value = serde_json::from_str(payload).unwrap();
        assert_eq!(reply["id"], json!("a"));
        assert!(reply["result"].get("isError").is_none());
        assert_eq!(reply["result"]["content"][0]["type"], json!("text"));
    }

    #[tokio::test]
    async fn tool_failures_stay_inside_the_result() {
        let server = server(Arc::new(StubBackend::new()));
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"read-items","arguments":{"collection":"ghost"}}}"#,
            "\n"
        );
        let reply = &lines(&exchange(&server, input).await)[0];
        assert!(reply.get("error").is_none());
        assert_eq!(reply["result"]["isError"], json!(true));
    }

    #[tokio::test]
    async fn protocol_errors() {
        let server = server(Arc::new(StubBackend::new()));
        let input = concat!(
            "not json\n",
            r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#,
            "\n",
            r#"{"jsonrpc":"1.0","id":2,"method":"ping"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"arguments":{}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":4,"method":"prompts/get","params":{"name":"x"}}"#,
            "\n"
        );
        let replies = lines(&exchange(&server, input).await);
        let codes: Vec<i64> = replies
            .iter()
            .map(|reply| reply["error"]["code"].as_i64().unwrap())
            .collect();
        assert_eq!(codes, vec![-32700, -32601, -32600, -32602, -32602]);
    }

    #[tokio::test]
    async fn batches_get_one_array_reply() {
        let server = server(Arc::new(StubBackend::new()));
        let input = concat!(
            r#"[{"jsonrpc":"2.0","id":1,"method":"ping"},{"jsonrpc":"2.0","method":"notifications/cancelled"},{"jsonrpc":"2.0","id":2,"method":"prompts/list"}]"#,
            "\n"
        );
        let replies = lines(&exchange(&server, input).await);
        assert_eq!(replies.len(), 1);
        let batch = replies[0].as_array().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0]["result"], json!({}));
        assert_eq!(batch[1]["result"], json!({ "prompts": [] }));
    }

    #[tokio::test]
    async fn null_arguments_read_as_empty_object() {
        let server = server(Arc::new(StubBackend::new()));
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"read-collections","arguments":null}}"#,
            "\n"
        );
        let reply = &lines(&exchange(&server, input).await)[0];
        assert!(reply["result"].get("isError").is_none());
    }

    #[tokio::test]
    async fn invalid_utf8_line_does_not_end_the_session() {
        let server = server(Arc::new(StubBackend::new()));
        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(PING.as_bytes());
        input.push(b'\n');

        let replies = lines(&exchange_bytes(&server, &input).await);
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["error"]["code"], json!(-32700));
        assert_eq!(replies[0]["id"], Value::Null);
        assert_eq!(replies[1]["id"], json!(9));
        assert_eq!(replies[1]["result"], json!({}));
    }

    /// Split one `Content-Length` framed reply off the front of `output`.
    fn take_framed(output: &str) -> (Value, &str) {
        let (header, rest) = output.split_once("\r\n\r\n").unwrap();
        let length: usize = header
            .lines()
            .find_map(|line| line.strip_prefix("Content-Length: "))
            .unwrap()
            .parse()
            .unwrap();
        (serde_json::from_str(&rest[..length]).unwrap(), &rest[length..])
    }

    #[tokio::test]
    async fn bad_content_length_header_is_a_parse_error() {
        let server = server(Arc::new(StubBackend::new()));
        let input = format!("Content-Length: lots\r\n\r\n{PING}\n");
        let output = exchange(&server, &input).await;

        let (error, rest) = take_framed(&output);
        assert_eq!(error["error"]["code"], json!(-32700));
        let replies = lines(rest);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["id"], json!(9));
    }

    #[tokio::test]
    async fn oversized_body_is_skipped_and_rejected() {
        let server = server(Arc::new(StubBackend::new()));
        let length = MAX_MESSAGE_BYTES + 1;
        let mut input = format!("Content-Length: {length}\r\n\r\n").into_bytes();
        input.resize(input.len() + length, b' ');
        input.extend_from_slice(PING.as_bytes());
        input.push(b'\n');

        let output = exchange_bytes(&server, &input).await;
        let (error, rest) = take_framed(&output);
        assert_eq!(error["error"]["code"], json!(-32700));
        assert!(error["error"]["message"].as_str().unwrap().contains("exceeds"));
        let replies = lines(rest);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["result"], json!({}));
    }
}
