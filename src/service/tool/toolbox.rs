//! Ticket toolbox tools, loaded from a remote MCP service.
//!
//! The toolbox is an independent process that owns the bug ticket store
//! (vector search, CRUD, filtered lookups). At startup its tool list is
//! enumerated and each tool is wrapped as a registry entry; arguments and
//! results pass through as opaque JSON.

use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use hyper::{
    HeaderMap,
    header::{HeaderName, HeaderValue},
};
use rmcp::{
    RoleClient, ServiceExt,
    model::CallToolRequestParam,
    service::RunningService,
    transport::{StreamableHttpClientTransport, streamable_http_client::StreamableHttpClientTransportConfig},
};
use serde_json::Value;
use tracing::{info, instrument};

use crate::base::types::Res;

use super::{Tool, ToolContext};

// Structs.

/// One remote toolbox tool, wrapped for the registry.
pub struct ToolboxTool {
    name: String,
    description: String,
    parameters: Value,
    client: Arc<RunningService<RoleClient, ()>>,
}

#[async_trait]
impl Tool for ToolboxTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    #[instrument(name = "ToolboxTool::call", skip_all, fields(tool = %self.name))]
    async fn call(&self, _ctx: &ToolContext, args: Value) -> Res<Value> {
        let request = CallToolRequestParam {
            name: self.name.clone().into(),
            arguments: args.as_object().cloned(),
        };

        let result = self.client.call_tool(request).await?;

        let text = result
            .content
            .iter()
            .filter_map(|content| content.as_text().map(|t| t.text.clone()))
            .collect::<Vec<_>>()
            .join("\n");

        if result.is_error.unwrap_or(false) {
            return Err(anyhow::anyhow!("Toolbox tool `{}` failed: {text}", self.name));
        }

        Ok(Value::String(text))
    }
}

// Helpers.

/// Connect to the toolbox MCP endpoint.
pub async fn get_toolbox_client(endpoint: &str, headers: &[(String, String)]) -> Res<RunningService<RoleClient, ()>> {
    // Compute headers.
    let mut header_map = HeaderMap::new();
    for (key, value) in headers {
        header_map.insert(HeaderName::from_str(key)?, HeaderValue::from_str(value)?);
    }

    // Build client.
    let client = reqwest::Client::builder().default_headers(header_map).build()?;

    // Build config.
    let config = StreamableHttpClientTransportConfig::with_uri(endpoint.to_string());

    // Build the transport.
    let transport = StreamableHttpClientTransport::with_client(client, config);

    Ok(().serve(transport).await?)
}

/// Enumerate the toolbox's tools and wrap each one for the registry.
pub async fn load_toolbox_tools(endpoint: &str, headers: &[(String, String)]) -> Res<Vec<Arc<dyn Tool>>> {
    let client = Arc::new(get_toolbox_client(endpoint, headers).await?);
    let tools = client.list_all_tools().await?;

    info!("Loaded {} tools from toolbox at `{endpoint}`.", tools.len());

    let wrapped = tools
        .into_iter()
        .map(|tool| {
            Arc::new(ToolboxTool {
                name: tool.name.to_string(),
                description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
                parameters: Value::Object((*tool.input_schema).clone()),
                client: client.clone(),
            }) as Arc<dyn Tool>
        })
        .collect();

    Ok(wrapped)
}
