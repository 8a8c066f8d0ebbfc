//! MCP tool server backed by one robot client.

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, JsonObject, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, ServiceExt};
use tracing::{debug, info, warn};
use wbb_core::{WebhookClient, WebhookPlatform};

use crate::tools::{self, ToolCall};

/// Exposes one robot client as a set of MCP tools.
pub struct ToolServer<P> {
    client: WebhookClient<P>,
}

impl<P: WebhookPlatform + 'static> ToolServer<P> {
    pub fn new(client: WebhookClient<P>) -> Self {
        Self { client }
    }

    pub fn tools(&self) -> Vec<Tool> {
        tools::tool_specs(self.client.platform().kind())
    }

    /// Runs one tool. Unknown tools and malformed arguments are protocol
    /// errors; robot failures come back as error results.
    pub async fn call(&self, name: &str, arguments: &JsonObject) -> Result<CallToolResult, McpError> {
        let call = tools::parse_call(self.client.platform().kind(), name, arguments)
            .map_err(|err| McpError::invalid_params(err.to_string(), None))?;
        debug!(tool = name, "tool call");

        let result = match call {
            ToolCall::Send(message) => match self.client.send(&message).await {
                Ok(()) => CallToolResult::success(vec![Content::text(capitalise(&format!(
                    "{} sent successfully",
                    tools::describe(name)
                )))]),
                Err(err) => {
                    warn!(tool = name, code = err.code(), error = %err, "tool call failed");
                    CallToolResult::error(vec![Content::text(format!(
                        "Failed to send {}: {err}",
                        tools::describe(name)
                    ))])
                }
            },
            ToolCall::Upload(path) => match self.client.upload_file(&path).await {
                Ok(media_id) => CallToolResult::success(vec![Content::text(format!(
                    "File uploaded successfully, media ID: {media_id}"
                ))]),
                Err(err) => {
                    warn!(tool = name, code = err.code(), error = %err, "tool call failed");
                    CallToolResult::error(vec![Content::text(format!(
                        "Failed to upload file: {err}"
                    ))])
                }
            },
        };
        Ok(result)
    }

    /// Serves MCP over stdin/stdout until the peer disconnects.
    pub async fn serve_stdio(self) -> anyhow::Result<()> {
        let running = self.serve(rmcp::transport::stdio()).await?;
        running.waiting().await?;
        info!("mcp session closed");
        Ok(())
    }
}

impl<P: WebhookPlatform + 'static> ServerHandler for ToolServer<P> {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info.server_info.name = env!("CARGO_PKG_NAME").to_string();
        info.server_info.version = env!("CARGO_PKG_VERSION").to_string();
        info.instructions = Some(format!(
            "Sends messages and files to a {} group robot.",
            self.client.platform().kind()
        ));
        info
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = request.arguments.unwrap_or_default();
        self.call(&request.name, &arguments).await
    }
}

fn capitalise(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
