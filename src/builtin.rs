//! Built-in GenAI instrumentation tests.
//!
//! Each test pairs a hand-written producer, shaped like real agent
//! instrumentation, with a bundled scenario describing what that producer
//! must emit:
//!
//! | Test        | Root span            | Shape                                        |
//! |-------------|----------------------|----------------------------------------------|
//! | `basic`     | `chat claude-3-opus` | user and assistant message events, token metrics |
//! | `reasoning` | `chain_of_thought`   | four thinking steps, one `reasoning_step` each |
//! | `tool`      | `chat gpt-4o`        | `execute_tool get_weather` child             |
//! | `error`     | `chat gpt-4o`        | failed tool call with exception, then retry  |

use crate::domain::error::ScenarioError;
use crate::domain::value::{AttributeValue, Attributes};
use crate::domain::Result;
use crate::scenario::model::Scenario;
use crate::scenario::parse::parse;
use crate::scenario::runner::ScenarioDriver;
use crate::telemetry::producer::TelemetryContext;
use crate::telemetry::snapshot::SpanStatus;
use std::fmt;

const BASIC_SCENARIO: &str = include_str!("../scenarios/basic_agent.yaml");
const REASONING_SCENARIO: &str = include_str!("../scenarios/reasoning_flow.yaml");
const TOOL_SCENARIO: &str = include_str!("../scenarios/tool_usage.yaml");
const ERROR_SCENARIO: &str = include_str!("../scenarios/error_handling.yaml");

/// One of the bundled tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTest {
    Basic,
    Reasoning,
    Tool,
    Error,
}

impl BuiltinTest {
    pub const ALL: [Self; 4] = [Self::Basic, Self::Reasoning, Self::Tool, Self::Error];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Reasoning => "reasoning",
            Self::Tool => "tool",
            Self::Error => "error",
        }
    }

    /// The bundled scenario this test is validated against.
    ///
    /// # Errors
    ///
    /// Only if the bundled file is malformed.
    pub fn scenario(self) -> std::result::Result<Scenario, ScenarioError> {
        parse(match self {
            Self::Basic => BASIC_SCENARIO,
            Self::Reasoning => REASONING_SCENARIO,
            Self::Tool => TOOL_SCENARIO,
            Self::Error => ERROR_SCENARIO,
        })
    }
}

impl fmt::Display for BuiltinTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ScenarioDriver for BuiltinTest {
    fn drive(&self, _scenario: &Scenario, telemetry: &TelemetryContext) -> Result<()> {
        tracing::debug!(test = %self, "driving built-in test");
        match self {
            Self::Basic => basic_agent(telemetry),
            Self::Reasoning => reasoning_flow(telemetry),
            Self::Tool => tool_usage(telemetry),
            Self::Error => error_handling(telemetry),
        }
        Ok(())
    }
}

fn attrs<const N: usize>(pairs: [(&str, AttributeValue); N]) -> Attributes {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn basic_agent(telemetry: &TelemetryContext) {
    let span = telemetry.start_span(
        "chat claude-3-opus",
        &attrs([
            ("gen_ai.system", "anthropic".into()),
            ("gen_ai.operation.name", "chat".into()),
            ("gen_ai.request.model", "claude-3-opus".into()),
            ("gen_ai.usage.input_tokens", 150_i64.into()),
            ("gen_ai.usage.output_tokens", 75_i64.into()),
        ]),
    );
    span.add_event("gen_ai.user.message", &attrs([("content", "What is the capital of France?".into())]));
    span.add_event("gen_ai.assistant.message", &attrs([("content", "The capital of France is Paris.".into())]));

    for token_type in ["input", "output"] {
        telemetry.record_metric(
            "gen_ai.client.token.usage",
            &attrs([
                ("gen_ai.operation.name", "chat".into()),
                ("gen_ai.system", "anthropic".into()),
                ("gen_ai.request.model", "claude-3-opus".into()),
                ("gen_ai.token.type", token_type.into()),
            ]),
        );
    }
}

fn reasoning_flow(telemetry: &TelemetryContext) {
    let _agent = telemetry.start_span(
        "chain_of_thought",
        &attrs([
            ("gen_ai.operation.name", "agent".into()),
            ("gen_ai.system", "openai".into()),
            ("gen_ai.agent.name", "reasoning-agent".into()),
            ("gen_ai.request.model", "gpt-4o".into()),
        ]),
    );

    let steps = [
        ("step1_analyze", "Let me analyze this math problem step by step."),
        ("step2_generate_options", "I need to find the derivative of x²sin(x)"),
        ("step3_evaluate", "Using the product rule: d/dx[x²sin(x)] = 2xsin(x) + x²cos(x)"),
        ("step4_decide", "The final answer is 2xsin(x) + x²cos(x)"),
    ];
    for (name, thought) in steps {
        let _step = telemetry.start_span(name, &attrs([("gen_ai.operation.name", "thinking".into())]));
        telemetry.current_span().add_event("reasoning_step", &attrs([("thought", thought.into())]));
    }
}

fn tool_usage(telemetry: &TelemetryContext) {
    let chat = telemetry.start_span(
        "chat gpt-4o",
        &attrs([
            ("gen_ai.system", "openai".into()),
            ("gen_ai.operation.name", "chat".into()),
            ("gen_ai.request.model", "gpt-4o".into()),
        ]),
    );
    chat.add_event("gen_ai.user.message", &attrs([("content", "What's the weather in Paris?".into())]));

    let tool_calls = serde_json::json!([{
        "id": "call_abc123",
        "type": "function",
        "function": {"name": "get_weather", "arguments": "{\"location\":\"Paris\"}"}
    }]);
    chat.add_event("gen_ai.assistant.message", &attrs([("tool_calls", tool_calls.to_string().into())]));

    {
        let tool = telemetry.start_span(
            "execute_tool get_weather",
            &attrs([
                ("gen_ai.operation.name", "execute_tool".into()),
                ("gen_ai.tool.name", "get_weather".into()),
                ("gen_ai.tool.call.id", "call_abc123".into()),
                ("gen_ai.system", "openai".into()),
            ]),
        );
        tool.add_event(
            "gen_ai.tool.message",
            &attrs([
                ("content", "rainy, 57°F".into()),
                ("id", "call_abc123".into()),
                ("role", "tool".into()),
            ]),
        );
    }

    chat.add_event(
        "gen_ai.assistant.message",
        &attrs([("content", "The weather in Paris is rainy with a temperature of 57°F.".into())]),
    );
}

fn error_handling(telemetry: &TelemetryContext) {
    let chat = telemetry.start_span(
        "chat gpt-4o",
        &attrs([
            ("gen_ai.system", "openai".into()),
            ("gen_ai.operation.name", "chat".into()),
            ("gen_ai.request.model", "gpt-4o".into()),
        ]),
    );
    chat.add_event(
        "gen_ai.user.message",
        &attrs([("content", "Show me today's top headline from The New York Times".into())]),
    );

    {
        let attempt = telemetry.start_span(
            "execute_tool news_api_lookup",
            &attrs([
                ("gen_ai.operation.name", "execute_tool".into()),
                ("gen_ai.tool.name", "news_api_lookup".into()),
                ("retry.count", 0_i64.into()),
            ]),
        );
        attempt.set_status(&SpanStatus::Error("API rate limit exceeded".into()));
        attempt.record_exception(
            "Exception",
            "Rate limit exceeded: try again later",
            &attrs([("error.type", "rate_limit_exceeded".into())]),
        );
    }

    chat.add_event("error_handling", &attrs([("decision", "Retry tool call with backoff".into())]));

    {
        let retry = telemetry.start_span(
            "execute_tool news_api_lookup",
            &attrs([
                ("gen_ai.operation.name", "execute_tool".into()),
                ("gen_ai.tool.name", "news_api_lookup".into()),
                ("retry.count", 1_i64.into()),
            ]),
        );
        retry.add_event(
            "gen_ai.tool.message",
            &attrs([
                ("content", "Headline: 'Global AI Summit Addresses Ethical Concerns'".into()),
                ("role", "tool".into()),
            ]),
        );
    }

    chat.add_event(
        "gen_ai.assistant.message",
        &attrs([(
            "content",
            "Today's top headline from The New York Times is: 'Global AI Summit Addresses Ethical Concerns'".into(),
        )]),
    );
}
