//! ReAct pattern: Thought → Action → Observation over a text protocol.
//!
//! The model sees the tool list and the steps taken so far (the
//! scratchpad) and replies either with the next action or with a final
//! answer. Actions run against the tool registry; each observation is
//! appended to the scratchpad for the next call.
//!
//! # Flow
//!
//! 1. Load the session's recent exchanges as history
//! 2. Render the prompt (tools, history, question, scratchpad)
//! 3. Call the model, stopping at `\nObservation:`
//! 4. **Final answer**: save the exchange and return it
//! 5. **Action**: run the tool, record the observation, loop back to 2

use async_trait::async_trait;
use gitbuddy_core::error::{Error, OUTPUT_PARSE_PREFIX, OUTPUT_PARSE_SUFFIX, Result};
use gitbuddy_core::memory::{ConversationMemory, Exchange, SessionId, render_transcript};
use gitbuddy_core::message::Message;
use gitbuddy_core::provider::{Provider, ProviderRequest};
use gitbuddy_core::template;
use gitbuddy_core::tool::{ToolCall, ToolRegistry};
use gitbuddy_memory::WindowMemory;
use gitbuddy_tools::document_retriever::DOCUMENT_RETRIEVER;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::{TokenBudget, Tokenizer, reduce_tokens_if_needed};
use crate::patterns::parser::{AgentAction, AgentOutput, parse_output};
use crate::prompt::AGENT_TEMPLATE;
use crate::rate_limit::RateLimiter;
use crate::shell::Responder;
use crate::stream_event::{AgentStreamEvent, TurnSink};

/// The model stops generating before it invents its own observation.
pub const STOP_SEQUENCE: &str = "\nObservation:";

/// Answer returned when the iteration cap is hit.
pub const ITERATION_LIMIT_ANSWER: &str = "Agent stopped due to iteration limit or time limit.";

/// Exchanges the agent remembers per session.
pub const AGENT_WINDOW: usize = 3;

/// One executed action and what it returned.
#[derive(Debug, Clone)]
pub struct AgentStep {
    pub action: AgentAction,
    pub observation: String,
}

/// Result of one agent invocation.
#[derive(Debug, Clone)]
pub struct ReactResult {
    pub answer: String,
    pub steps: Vec<AgentStep>,
    /// Model calls made.
    pub iterations: usize,
    pub tool_calls_made: usize,
}

/// Render steps as the agent scratchpad.
pub fn render_scratchpad(steps: &[AgentStep]) -> String {
    steps
        .iter()
        .map(|s| format!("{}\nObservation: {}\nThought: ", s.action.log, s.observation))
        .collect()
}

/// Recover the raw model output from a rendered parse-error message.
///
/// Returns `None` for any other message.
pub fn salvage_parse_error(message: &str) -> Option<String> {
    message.strip_prefix(OUTPUT_PARSE_PREFIX).map(|rest| {
        rest.strip_suffix(OUTPUT_PARSE_SUFFIX)
            .unwrap_or(rest)
            .to_string()
    })
}

/// ReAct agent over the Git Buddy tools.
pub struct ReactAgent {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    tools: Arc<ToolRegistry>,
    memory: Arc<dyn ConversationMemory>,
    tokenizer: Tokenizer,
    budget: TokenBudget,
    max_iterations: usize,
    retrieval_first: bool,
    limiter: Option<RateLimiter>,
}

impl ReactAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        tokenizer: Tokenizer,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.5,
            tools,
            memory: Arc::new(WindowMemory::new(AGENT_WINDOW)),
            tokenizer,
            budget: TokenBudget::default(),
            max_iterations: 10,
            retrieval_first: true,
            limiter: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn ConversationMemory>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_budget(mut self, budget: TokenBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Whether a search requested before any retrieval first runs the
    /// `Document Retriever` on the same input.
    pub fn with_retrieval_first(mut self, enabled: bool) -> Self {
        self.retrieval_first = enabled;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Run the loop for one question.
    pub async fn run(&self, session: &SessionId, input: &str, sink: &TurnSink) -> Result<ReactResult> {
        info!(model = %self.model, session = %session, "ReAct: starting");

        let transcript = render_transcript(&self.memory.load(session).await);
        let mut steps: Vec<AgentStep> = Vec::new();
        let mut retrieved = false;
        let mut tool_calls_made = 0usize;

        for iteration in 1..=self.max_iterations {
            let prompt = self.build_prompt(input, &transcript, &steps)?;

            if let Some(limiter) = &self.limiter {
                limiter.acquire().await;
            }

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: vec![Message::user(prompt)],
                temperature: self.temperature,
                max_tokens: None,
                stream: false,
                stop: vec![STOP_SEQUENCE.to_string()],
            };
            let output = self.provider.complete(request).await?.message.content;
            debug!(iteration, chars = output.len(), "ReAct: model replied");

            let action = match parse_output(&output)? {
                AgentOutput::Finish(finish) => {
                    info!(iteration, tool_calls_made, "ReAct: final answer");
                    self.memory
                        .save(session, Exchange::new(input, finish.output.clone()))
                        .await;
                    sink.send(AgentStreamEvent::Chunk {
                        content: finish.output.clone(),
                    })
                    .await;
                    self.send_done(session, sink, iteration, tool_calls_made).await;
                    return Ok(ReactResult {
                        answer: finish.output,
                        steps,
                        iterations: iteration,
                        tool_calls_made,
                    });
                }
                AgentOutput::Action(action) => action,
            };

            sink.send(AgentStreamEvent::Thought {
                content: action.log.clone(),
            })
            .await;

            if self.needs_retrieval_first(&action, retrieved) {
                debug!(requested = %action.tool, "ReAct: running Document Retriever first");
                let forced = AgentAction {
                    tool: DOCUMENT_RETRIEVER.to_string(),
                    tool_input: action.tool_input.clone(),
                    log: format!(
                        "Thought: I should look up the documentation first.\nAction: {}\nAction Input: {}",
                        DOCUMENT_RETRIEVER, action.tool_input
                    ),
                };
                let observation = self.execute(&forced, sink, &mut tool_calls_made).await?;
                retrieved = true;
                steps.push(AgentStep {
                    action: forced,
                    observation,
                });
            }

            let observation = self.execute(&action, sink, &mut tool_calls_made).await?;
            if action.tool == DOCUMENT_RETRIEVER {
                retrieved = true;
            }
            steps.push(AgentStep {
                action,
                observation,
            });
        }

        warn!(max = self.max_iterations, "ReAct: iteration limit reached");
        self.memory
            .save(session, Exchange::new(input, ITERATION_LIMIT_ANSWER))
            .await;
        sink.send(AgentStreamEvent::Chunk {
            content: ITERATION_LIMIT_ANSWER.to_string(),
        })
        .await;
        self.send_done(session, sink, self.max_iterations, tool_calls_made)
            .await;

        Ok(ReactResult {
            answer: ITERATION_LIMIT_ANSWER.to_string(),
            steps,
            iterations: self.max_iterations,
            tool_calls_made,
        })
    }

    fn needs_retrieval_first(&self, action: &AgentAction, retrieved: bool) -> bool {
        self.retrieval_first
            && !retrieved
            && action.tool != DOCUMENT_RETRIEVER
            && self.tools.get(&action.tool).is_some()
            && self.tools.get(DOCUMENT_RETRIEVER).is_some()
    }

    /// Run one action and return its observation.
    async fn execute(
        &self,
        action: &AgentAction,
        sink: &TurnSink,
        tool_calls_made: &mut usize,
    ) -> Result<String> {
        if self.tools.get(&action.tool).is_none() {
            warn!(tool = %action.tool, "ReAct: model asked for an unknown tool");
            return Ok(format!("{} is not a valid tool, try another one.", action.tool));
        }

        let call = ToolCall::query(
            format!("call_{}", uuid::Uuid::new_v4().simple()),
            &action.tool,
            &action.tool_input,
        );
        sink.send(AgentStreamEvent::ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            input: action.tool_input.clone(),
        })
        .await;

        info!(tool = %call.name, "Executing tool");
        let result = self.tools.execute(&call).await?;
        *tool_calls_made += 1;

        sink.send(AgentStreamEvent::ToolResult {
            id: result.call_id.clone(),
            name: call.name,
            output: result.output.clone(),
        })
        .await;

        Ok(result.output)
    }

    /// Render the prompt, fitting the history into what the rest leaves.
    fn build_prompt(&self, input: &str, transcript: &str, steps: &[AgentStep]) -> Result<String> {
        let tools = self.tools.describe();
        let tool_names = self.tools.names().join(", ");
        let scratchpad = render_scratchpad(steps);
        let render = |history: &str| {
            template::render(
                AGENT_TEMPLATE,
                &[
                    ("tools", tools.as_str()),
                    ("tool_names", tool_names.as_str()),
                    ("history", history),
                    ("input", input),
                    ("agent_scratchpad", scratchpad.as_str()),
                ],
            )
        };

        if transcript.is_empty() {
            return Ok(render(""));
        }

        let rest = self.tokenizer.count(&render(""));
        let max_history = self.budget.max_tokens.saturating_sub(rest);
        let target_history = self.budget.target_tokens.saturating_sub(rest);
        if target_history == 0 {
            warn!(rest, "ReAct: no room left for history; dropping it");
            return Ok(render(""));
        }

        let history =
            reduce_tokens_if_needed(&self.tokenizer, transcript, max_history, target_history)?;
        Ok(render(&history))
    }

    async fn send_done(
        &self,
        session: &SessionId,
        sink: &TurnSink,
        iterations: usize,
        tool_calls_made: usize,
    ) {
        sink.send(AgentStreamEvent::Done {
            session_id: session.to_string(),
            usage: None,
            iterations,
            tool_calls_made,
        })
        .await;
    }
}

#[async_trait]
impl Responder for ReactAgent {
    fn name(&self) -> &str {
        "react"
    }

    /// Answer through the loop. Output the parser cannot read is returned
    /// as the answer instead of failing the turn.
    async fn respond(&self, session: &SessionId, query: &str, sink: &TurnSink) -> Result<String> {
        match self.run(session, query, sink).await {
            Ok(result) => Ok(result.answer),
            Err(Error::OutputParse { output }) => {
                warn!("ReAct: unparseable model output returned as the answer");
                sink.send(AgentStreamEvent::Chunk {
                    content: output.clone(),
                })
                .await;
                Ok(output)
            }
            Err(e) => Err(e),
        }
    }
}
