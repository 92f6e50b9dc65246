//! OpenAI-backed agent runtime.
//!
//! This module drives one conversational turn through the OpenAI responses
//! API: the session transcript plus the new user message form the input, the
//! tool registry provides function definitions, and function calls are
//! dispatched through the registry with their outputs fed back to the model
//! until it produces a final text reply. Events are emitted on a channel so
//! callers consume an ordered stream with explicit final signaling.

use std::{sync::Arc, time::Duration};

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ReasoningEffort,
        responses::{
            Content as ResponseContent, CreateResponseArgs, FunctionArgs, Input, InputItem, InputMessageArgs, OutputContent, ReasoningConfigArgs, Response, Role, TextConfig,
            TextResponseFormat, ToolDefinition, WebSearchPreviewArgs,
        },
    },
};
use async_trait::async_trait;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use serde_json::Value;
use tokio::time::timeout;
use tracing::{Instrument, error, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{AgentEvent, Content, ROLE_USER, Res, Session, Void},
    },
    service::tool::{ToolContext, ToolRegistry},
};

use super::{AgentClient, EventStream, GenericAgentClient};

/// Upper bound on function-call rounds within one turn.
const MAX_TOOL_ROUNDS: u32 = 8;

// Extra methods on `AgentClient` applied by the openai implementation.

impl AgentClient {
    pub fn openai(config: &Config, registry: ToolRegistry) -> Self {
        let client = OpenAiAgentClient::new(config, registry);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI agent client implementation.
#[derive(Clone)]
pub struct OpenAiAgentClient {
    client: Client<OpenAIConfig>,
    config: Config,
    registry: Arc<ToolRegistry>,
}

/// One parsed output of a model response.
enum AgentOutput {
    Text(String),
    ToolCall { call_id: String, name: String, arguments: String },
}

impl OpenAiAgentClient {
    /// Create a new OpenAI agent client.
    #[instrument(name = "OpenAiAgentClient::new", skip_all)]
    pub fn new(config: &Config, registry: ToolRegistry) -> Self {
        let cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());

        Self {
            client: Client::with_config(cfg),
            config: config.clone(),
            registry: Arc::new(registry),
        }
    }

    /// Build the turn input from the session transcript and the new user message.
    #[instrument(name = "OpenAiAgentClient::build_turn_input", skip_all)]
    fn build_turn_input(&self, session: &Session, user_message: &str) -> Res<Input> {
        let mut items = Vec::with_capacity(session.events.len() + 1);

        for content in &session.events {
            let role = if content.role == ROLE_USER { Role::User } else { Role::Assistant };
            let text = content.parts.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("\n");

            items.push(InputItem::Message(InputMessageArgs::default().role(role).content(text).build()?));
        }

        items.push(InputItem::Message(InputMessageArgs::default().role(Role::User).content(user_message.to_string()).build()?));

        Ok(Input::Items(items))
    }

    /// Build the tool definitions: web search plus every registry tool.
    #[instrument(name = "OpenAiAgentClient::build_tool_definitions", skip_all)]
    fn build_tool_definitions(&self) -> Res<Vec<ToolDefinition>> {
        let mut tools = vec![ToolDefinition::WebSearchPreview(WebSearchPreviewArgs::default().build()?)];

        for tool in self.registry.iter() {
            tools.push(ToolDefinition::Function(
                FunctionArgs::default().name(tool.name()).description(tool.description()).parameters(tool.parameters()).build()?,
            ));
        }

        Ok(tools)
    }

    /// Helper function to make OpenAI API calls with retry logic and timeout handling.
    async fn call_openai_api(&self, request_builder: CreateResponseArgs) -> Res<Response> {
        const MAX_RETRIES: u32 = 3;
        const TIMEOUT: u64 = 120; // OpenAI can be slow, especially with reasoning models
        const RETRY_DELAY_MS: u64 = 1000;

        let mut retries = 0;

        loop {
            let request = request_builder.build()?;
            let result = timeout(Duration::from_secs(TIMEOUT), self.client.responses().create(request)).await;

            match result {
                Ok(Ok(response)) => {
                    info!("OpenAI API call succeeded after {} attempts", retries + 1);
                    return Ok(response);
                }
                Ok(Err(err)) => {
                    if retries >= MAX_RETRIES {
                        return Err(anyhow::anyhow!("OpenAI API call failed after {MAX_RETRIES} retries: {err}"));
                    }
                    retries += 1;
                    warn!("OpenAI API call failed, retrying {retries}/{MAX_RETRIES}: {err}");

                    let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(retries - 1));
                    tokio::time::sleep(delay).await;
                }
                Err(_) => {
                    if retries >= MAX_RETRIES {
                        return Err(anyhow::anyhow!("OpenAI API call timed out after {MAX_RETRIES} attempts"));
                    }
                    retries += 1;
                    warn!("OpenAI API call timed out, retrying {retries}/{MAX_RETRIES}");

                    let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(retries - 1));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Drive the function-call loop for one turn, emitting events as they occur.
    #[instrument(name = "OpenAiAgentClient::drive_turn", skip_all)]
    async fn drive_turn(&self, ctx: ToolContext, input: Input, tx: UnboundedSender<Res<AgentEvent>>) -> Void {
        let tools = self.build_tool_definitions()?;
        let text_config = TextConfig { format: TextResponseFormat::Text };

        // Prepare the _initial_ request.

        let mut request = CreateResponseArgs::default();

        request
            .max_output_tokens(self.config.openai_max_tokens)
            .model(&self.config.openai_agent_model)
            .instructions(self.config.agent_instruction.clone())
            .tools(tools)
            .text(text_config)
            .input(input);

        // Add the temperature for the non-reasoning models.
        if self.config.openai_agent_model.starts_with("gpt") {
            request.temperature(self.config.openai_agent_temperature);
        }

        // Add the reasoning effort for `o` models.
        if self.config.openai_agent_model.starts_with("o") {
            let reasoning_effort = parse_openai_reasoning_effort(&self.config.openai_agent_reasoning_effort)?;
            request.reasoning(ReasoningConfigArgs::default().effort(reasoning_effort).build()?);
        }

        // Loop over requests until the model stops calling tools and produces
        // its final text.

        let mut rounds = 0;

        loop {
            // Nobody is listening; skip the remaining API and tool calls.
            if tx.is_closed() {
                warn!("Event stream receiver dropped; abandoning turn.");
                return Ok(());
            }

            let response = self.call_openai_api(request.clone()).await?;
            let outputs = parse_agent_response(&response)?;

            info!("Received {} outputs from the model.", outputs.len());

            let mut follow_ups = Vec::new();
            let mut final_text = None;

            for output in outputs {
                match output {
                    AgentOutput::Text(text) => {
                        final_text = Some(text);
                    }
                    AgentOutput::ToolCall { call_id, name, arguments } => {
                        info!("Dispatching tool call `{name}` ...");

                        let _ = tx.unbounded_send(Ok(AgentEvent::progress(Some(Content::model(format!("Calling tool `{name}` ..."))))));

                        let args: Value = if arguments.trim().is_empty() {
                            serde_json::json!({})
                        } else {
                            serde_json::from_str(&arguments)?
                        };

                        // A failing tool call fails the whole turn; there is no
                        // retry or circuit-breaking at this layer.
                        let result = self.registry.call(&ctx, &name, args).await?;

                        let output_text = match result {
                            Value::String(s) => s,
                            other => other.to_string(),
                        };

                        follow_ups.push(InputItem::Custom(serde_json::json!({
                            "type": "function_call_output",
                            "call_id": call_id,
                            "output": output_text,
                        })));
                    }
                }
            }

            // No tool calls left: the turn is over.
            if follow_ups.is_empty() {
                if let Some(text) = final_text {
                    let _ = tx.unbounded_send(Ok(AgentEvent::final_response(text)));
                }

                return Ok(());
            }

            rounds += 1;
            if rounds >= MAX_TOOL_ROUNDS {
                return Err(anyhow::anyhow!("Agent exceeded {MAX_TOOL_ROUNDS} tool-call rounds in one turn."));
            }

            request.previous_response_id(&response.id).input(Input::Items(follow_ups));
        }
    }
}

#[async_trait]
impl GenericAgentClient for OpenAiAgentClient {
    #[instrument(name = "OpenAiAgentClient::run_turn", skip_all)]
    async fn run_turn(&self, session: &Session, user_message: &str) -> Res<EventStream> {
        let input = self.build_turn_input(session, user_message)?;
        let ctx = ToolContext::from_key(&session.key());

        let (tx, rx) = unbounded();
        let client = self.clone();
        let err_tx = tx.clone();

        tokio::spawn(
            async move {
                if let Err(err) = client.drive_turn(ctx, input, tx).await {
                    error!("Agent turn failed: {err}");
                    let _ = err_tx.unbounded_send(Err(err));
                }
            }
            .in_current_span(),
        );

        Ok(Box::pin(rx))
    }
}

/// Parse the model response into text and tool-call outputs.
#[instrument(skip_all)]
fn parse_agent_response(response: &Response) -> Res<Vec<AgentOutput>> {
    let mut result = Vec::new();

    for output in &response.output {
        match output {
            OutputContent::Message(message) => {
                for message_content in &message.content {
                    match message_content {
                        ResponseContent::OutputText(text) => {
                            result.push(AgentOutput::Text(text.text.clone()));
                        }
                        ResponseContent::Refusal(reason) => {
                            return Err(anyhow::anyhow!("Request refused: {reason:#?}"));
                        }
                    }
                }
            }
            OutputContent::FunctionCall(function_call) => {
                result.push(AgentOutput::ToolCall {
                    call_id: function_call.call_id.clone(),
                    name: function_call.name.clone(),
                    arguments: function_call.arguments.clone(),
                });
            }
            OutputContent::WebSearchCall(web_search_call) => {
                info!("Web search tool called: {web_search_call:#?}");
            }
            _ => {
                warn!("Unknown output: {output:#?}");
            }
        }
    }

    Ok(result)
}

/// Convert a string reasoning effort to ReasoningEffort enum.
fn parse_openai_reasoning_effort(effort: &str) -> Res<ReasoningEffort> {
    match effort.to_lowercase().as_str() {
        "low" => Ok(ReasoningEffort::Low),
        "medium" => Ok(ReasoningEffort::Medium),
        "high" => Ok(ReasoningEffort::High),
        _ => Err(anyhow::anyhow!("Invalid reasoning effort: {effort}. Must be one of: low, medium, high")),
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::base::{config::ConfigInner, types::SessionKey};

    fn create_test_config() -> Config {
        Config {
            inner: Arc::new(ConfigInner {
                openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| "test_key".to_string()),
                openai_agent_model: "gpt-4.1-mini".to_string(),
                openai_agent_temperature: 0.1,
                openai_agent_reasoning_effort: "medium".to_string(),
                openai_max_tokens: 200u32, // Small for tests
                agent_instruction: "You are a terse test assistant.".to_string(),
                ..Default::default()
            }),
        }
    }

    fn has_api_key() -> bool {
        std::env::var("OPENAI_API_KEY").map(|k| !k.is_empty()).unwrap_or(false)
    }

    #[test]
    fn test_parse_reasoning_effort() {
        assert!(matches!(parse_openai_reasoning_effort("low"), Ok(ReasoningEffort::Low)));
        assert!(matches!(parse_openai_reasoning_effort("HIGH"), Ok(ReasoningEffort::High)));
        assert!(parse_openai_reasoning_effort("extreme").is_err());
    }

    #[test]
    fn test_tool_definitions_include_web_search_and_registry() {
        let config = create_test_config();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(crate::service::tool::builtin::CurrentDateTool));

        let client = OpenAiAgentClient::new(&config, registry);
        let tools = client.build_tool_definitions().unwrap();

        assert_eq!(tools.len(), 2);
        assert!(matches!(tools[0], ToolDefinition::WebSearchPreview(_)));
        assert!(matches!(tools[1], ToolDefinition::Function(_)));
    }

    #[test]
    fn test_build_turn_input_includes_history() {
        let config = create_test_config();
        let client = OpenAiAgentClient::new(&config, ToolRegistry::new());

        let mut session = Session::new(&SessionKey::new("app", "u1", "s1"));
        session.push(Content::user("earlier question"));
        session.push(Content::model("earlier answer"));

        let input = client.build_turn_input(&session, "new question").unwrap();

        let Input::Items(items) = input else {
            panic!("Expected itemized input");
        };
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_drive_turn_abandons_when_receiver_dropped() {
        let config = create_test_config();
        let client = OpenAiAgentClient::new(&config, ToolRegistry::new());

        let session = Session::new(&SessionKey::new("app", "u1", "s1"));
        let input = client.build_turn_input(&session, "hello").unwrap();
        let ctx = ToolContext::from_key(&session.key());

        let (tx, rx) = unbounded();
        drop(rx);

        // With no receiver, the turn ends before any API call is attempted.
        let result = client.drive_turn(ctx, input, tx).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_live_turn_produces_final_event() {
        if !has_api_key() {
            eprintln!("Skipping test_live_turn_produces_final_event: OPENAI_API_KEY unavailable");
            return;
        }

        let config = create_test_config();
        let client = AgentClient::openai(&config, ToolRegistry::new());

        let session = Session::new(&SessionKey::new("app", "u1", "s1"));
        let mut stream = client.run_turn(&session, "Say the word: pong").await.unwrap();

        let mut final_text = None;
        while let Some(event) = stream.next().await {
            let event = event.unwrap();
            if let Some(text) = event.final_text() {
                final_text = Some(text.to_string());
                break;
            }
        }

        assert!(final_text.is_some(), "Expected a final response event");
    }
}
