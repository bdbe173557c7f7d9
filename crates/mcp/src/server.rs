// MCP server: newline-delimited JSON-RPC 2.0 over stdio

use anyhow::{Context, Result};
use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use wayfarer_core::{Catalog, Namespace, SearchId};

use crate::protocol::*;
use crate::tools::ToolRegistry;

const MARKDOWN: &str = "text/markdown";

/// Longest request line accepted from the client
pub const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// Path of the listing resource under every scheme
const LISTING_PATH: &str = "searches";

/// Whether `path` names the namespace listing. Geocoding also answers to
/// `locations`.
fn is_listing(namespace: Namespace, path: &str) -> bool {
    path == LISTING_PATH || (namespace == Namespace::Geocode && path == "locations")
}

/// A request line that could not be framed as UTF-8 text
#[derive(Debug)]
enum BadLine {
    TooLong,
    NotUtf8,
}

/// Newline framing that reports bad lines as items so the stream keeps going.
/// The inner codec drops the rest of an over-length line on its own.
struct RequestLines {
    inner: LinesCodec,
}

impl RequestLines {
    fn new(max_length: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_length),
        }
    }

    fn frame(
        result: Result<Option<String>, LinesCodecError>,
    ) -> std::io::Result<Option<Result<String, BadLine>>> {
        match result {
            Ok(line) => Ok(line.map(Ok)),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Err(BadLine::TooLong))),
            Err(LinesCodecError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                Ok(Some(Err(BadLine::NotUtf8)))
            }
            Err(LinesCodecError::Io(e)) => Err(e),
        }
    }
}

impl Decoder for RequestLines {
    type Item = Result<String, BadLine>;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> std::io::Result<Option<Self::Item>> {
        Self::frame(self.inner.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> std::io::Result<Option<Self::Item>> {
        Self::frame(self.inner.decode_eof(buf))
    }
}

fn decode<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
}

fn encode<T: Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

pub struct McpServer {
    registry: ToolRegistry,
    catalog: Catalog,
    max_line_length: usize,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, catalog: Catalog) -> Self {
        Self {
            registry,
            catalog,
            max_line_length: MAX_LINE_BYTES,
        }
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Serve stdin/stdout until stdin closes
    pub async fn start(&self) -> Result<()> {
        tracing::info!(tools = self.registry.len(), "MCP server listening on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = FramedRead::new(reader, RequestLines::new(self.max_line_length));
        let mut sink = FramedWrite::new(writer, LinesCodec::new());

        while let Some(line) = lines.next().await {
            let response = match line.context("Failed to read from stdin")? {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_line(&line).await,
                Err(bad) => {
                    tracing::warn!(reason = ?bad, "Unreadable request line");
                    Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()))
                }
            };
            if let Some(response) = response {
                let text = serde_json::to_string(&response).context("Failed to encode response")?;
                sink.send(text).await.context("Failed to write response")?;
            }
        }

        tracing::info!("Input closed, MCP server stopping");
        Ok(())
    }

    /// Handle one raw line. Returns `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Unparsable request line");
                return Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()));
            }
        };
        let id = value.get("id").cloned().unwrap_or(Value::Null);

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) if request.jsonrpc == "2.0" => self.handle_request(request).await,
            _ => Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request())),
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        tracing::debug!(method = %request.method, "Handling request");

        let outcome = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "notifications/initialized" | "notifications/cancelled" => Ok(Value::Null),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => encode(ListToolsResult {
                tools: self.registry.list_schemas(),
            }),
            "tools/call" => self.call_tool(request.params).await,
            "resources/list" => encode(ListResourcesResult {
                resources: self.resources(),
            }),
            "resources/templates/list" => encode(ListResourceTemplatesResult {
                resource_templates: self.resource_templates(),
            }),
            "resources/read" => self.read_resource(request.params).await,
            method => Err(JsonRpcError::method_not_found(method)),
        };

        let id = request.id?;
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = match params {
            Some(params) => decode(Some(params))?,
            None => InitializeParams::default(),
        };
        tracing::info!(
            client = params.client_info.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown"),
            protocol = params.protocol_version.as_deref().unwrap_or(PROTOCOL_VERSION),
            "Client initialized"
        );

        encode(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ListChanged { list_changed: false }),
                resources: Some(ListChanged { list_changed: false }),
            },
            server_info: ServerInfo {
                name: "wayfarer".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = decode(params)?;
        let tool = self
            .registry
            .get(&params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)))?;

        let result = match tool.execute(params.arguments).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(tool = %params.name, error = %e, "Tool execution failed");
                CallToolResult::error(format!("[unexpected] {}", e))
            }
        };
        encode(result)
    }

    fn resources(&self) -> Vec<ResourceDescriptor> {
        Namespace::ALL
            .into_iter()
            .map(|namespace| ResourceDescriptor {
                uri: format!("{}://{}", namespace.scheme(), LISTING_PATH),
                name: format!("{} searches", namespace.title()),
                description: format!("Every stored {} search, newest first", namespace.noun()),
                mime_type: MARKDOWN.to_string(),
            })
            .collect()
    }

    fn resource_templates(&self) -> Vec<ResourceTemplate> {
        Namespace::ALL
            .into_iter()
            .map(|namespace| ResourceTemplate {
                uri_template: format!("{}://{{search_id}}", namespace.scheme()),
                name: format!("{} search detail", namespace.title()),
                description: format!("Readable detail of one stored {} search", namespace.noun()),
                mime_type: MARKDOWN.to_string(),
            })
            .collect()
    }

    async fn read_resource(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: ReadResourceParams = decode(params)?;
        let (namespace, path) = params
            .uri
            .split_once("://")
            .and_then(|(scheme, path)| Some((Namespace::from_scheme(scheme)?, path)))
            .filter(|(_, path)| !path.is_empty())
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown resource: {}", params.uri)))?;

        let rendered = if is_listing(namespace, path) {
            self.catalog.summarize(namespace).await
        } else {
            self.catalog.detail(namespace, &SearchId::new(path)).await
        };
        let text = rendered.map_err(|e| {
            tracing::error!(uri = %params.uri, error = %e, "Resource read failed");
            JsonRpcError::internal_error(e.to_string())
        })?;

        encode(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: params.uri,
                mime_type: MARKDOWN.to_string(),
                text,
            }],
        })
    }
}
