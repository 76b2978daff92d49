use super::*;
use crate::message::Role;
use crate::permissions::PermissionManager;
use crate::tools::search::{SearchTool, SimulatedSearch};
use crate::tools::{ParamType, ParameterSchema, Tool, ToolCall, ToolRegistry};
use futures::stream;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted completion.
enum Reply {
    Text(String),
    Native(Vec<ToolCall>),
    Fail(String),
    Delayed(Duration, String),
    Hang,
    /// Ends without a terminal event.
    Truncated(String),
}

/// Backend that replays a fixed script and records every request.
#[derive(Default)]
struct ScriptedBackend {
    script: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    fn new(script: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn completed(text: String) -> StreamEvent {
    StreamEvent::Completed(Completion {
        text,
        tool_calls: Vec::new(),
    })
}

impl CompletionBackend for ScriptedBackend {
    fn complete(&self, request: CompletionRequest) -> crate::provider::CompletionStream {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Text(r#"{"output": "done"}"#.to_string()));
        match reply {
            Reply::Text(text) => {
                let half: String = text.chars().take(text.chars().count() / 2).collect();
                stream::iter(vec![
                    StreamEvent::Partial(half),
                    StreamEvent::Partial(text.clone()),
                    completed(text),
                ])
                .boxed()
            }
            Reply::Native(calls) => stream::iter(vec![StreamEvent::Completed(Completion {
                text: String::new(),
                tool_calls: calls,
            })])
            .boxed(),
            Reply::Fail(message) => stream::iter(vec![
                StreamEvent::Partial("{\"out".to_string()),
                StreamEvent::Failed(message),
            ])
            .boxed(),
            Reply::Delayed(delay, text) => stream::once(async move {
                tokio::time::sleep(delay).await;
                completed(text)
            })
            .boxed(),
            Reply::Hang => stream::pending().boxed(),
            Reply::Truncated(text) => stream::iter(vec![StreamEvent::Partial(text)]).boxed(),
        }
    }
}

/// Records everything the loop reports.
#[derive(Default)]
struct RecordingRenderer {
    partials: Vec<String>,
    streams_ended: usize,
    messages: Vec<Message>,
    done: usize,
    errors: Vec<String>,
}

impl Renderer for RecordingRenderer {
    fn render_partial(&mut self, cumulative: &str) {
        self.partials.push(cumulative.to_string());
    }

    fn end_stream(&mut self) {
        self.streams_ended += 1;
    }

    fn render_message(&mut self, msg: &Message) {
        self.messages.push(msg.clone());
    }

    fn render_done(&mut self) {
        self.done += 1;
    }

    fn render_error(&mut self, err: &str) {
        self.errors.push(err.to_string());
    }
}

/// Evaluates only `return a+b` snippets.
struct StubJavascript;

#[async_trait::async_trait]
impl Tool for StubJavascript {
    fn name(&self) -> &str {
        "javascript_execution"
    }

    fn description(&self) -> &str {
        "adds two numbers"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::object().required("code", ParamType::String, "code")
    }

    async fn execute(&self, input: Map<String, Value>) -> anyhow::Result<Value> {
        let code = input["code"].as_str().unwrap_or_default();
        let sum: i64 = code
            .trim_start_matches("return ")
            .split('+')
            .map(|n| n.trim().parse::<i64>())
            .sum::<Result<i64, _>>()?;
        Ok(json!({ "code": code, "result": sum, "success": true }))
    }
}

/// Echoes its label after `delay_ms`.
struct Delayed {
    name: &'static str,
}

#[async_trait::async_trait]
impl Tool for Delayed {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "sleeps"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::object().required("delay_ms", ParamType::Integer, "sleep")
    }

    async fn execute(&self, input: Map<String, Value>) -> anyhow::Result<Value> {
        let delay = input["delay_ms"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(json!({ "tool": self.name }))
    }
}

fn endpoint() -> EndpointConfig {
    EndpointConfig {
        base_url: "http://localhost:0".to_string(),
        api_key: "test".to_string(),
        model: "test-model".to_string(),
        temperature: 0.7,
    }
}

fn executor() -> ToolExecutor {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SearchTool::new(Arc::new(SimulatedSearch)))).unwrap();
    registry.register(Box::new(StubJavascript)).unwrap();
    for name in ["a", "b", "c"] {
        registry.register(Box::new(Delayed { name })).unwrap();
    }
    ToolExecutor::new(Arc::new(registry), PermissionManager::default(), Duration::from_secs(5))
}

fn agent_with(backend: Arc<ScriptedBackend>, settings: AgentSettings) -> Agent {
    Agent::new(backend, executor(), Some(endpoint()), settings)
}

fn agent(backend: Arc<ScriptedBackend>) -> Agent {
    agent_with(backend, AgentSettings::default())
}

fn directive(output: &str, calls: Value) -> Reply {
    Reply::Text(json!({ "output": output, "tool_calls": calls }).to_string())
}

fn final_answer(output: &str) -> Reply {
    Reply::Text(json!({ "output": output }).to_string())
}

/// (role, tool_name, content) triples, ignoring timestamps.
fn transcript(session: &AgentSession) -> Vec<(Role, Option<String>, String)> {
    session
        .messages()
        .into_iter()
        .map(|m| (m.role, m.tool_name, m.content))
        .collect()
}

fn payload(msg: &Message) -> Value {
    serde_json::from_str(&msg.content).unwrap()
}

#[tokio::test]
async fn end_to_end_tool_round_then_final_answer() {
    let backend = ScriptedBackend::new(vec![
        directive(
            "Let me check.",
            json!([
                {"name": "javascript_execution", "parameters": {"code": "return 2+2"}},
                {"name": "google_search", "parameters": {"query": "rust"}}
            ]),
        ),
        final_answer("2+2 is 4, and here is what I found about Rust."),
    ]);
    let agent = agent(backend.clone());
    let session = AgentSession::new();
    let mut renderer = RecordingRenderer::default();

    let outcome = agent
        .submit_user_message(&session, "What's 2+2 and search for 'rust'?", &mut renderer)
        .await
        .unwrap();

    assert_eq!(outcome.rounds, 2);
    assert_eq!(outcome.tool_calls, 2);
    let messages = session.messages();
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Let me check.");
    assert_eq!(messages[2].tool_name.as_deref(), Some("javascript_execution"));
    assert_eq!(payload(&messages[2])["result"], 4);
    assert_eq!(messages[3].tool_name.as_deref(), Some("google_search"));
    assert_eq!(payload(&messages[3])["results_count"], 5);
    assert_eq!(messages[4].role, Role::Assistant);

    // The second request replays everything appended so far.
    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    let roles: Vec<&str> = requests[1].messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, ["system", "user", "assistant", "tool", "tool"]);
    assert_eq!(renderer.done, 1);
    assert_eq!(renderer.streams_ended, 2);
    assert!(!session.is_processing());
}

#[tokio::test]
async fn requests_advertise_catalog_and_preamble() {
    let backend = ScriptedBackend::new(vec![final_answer("hi")]);
    let agent = agent(backend.clone());
    agent
        .submit_user_message(&AgentSession::new(), "hello", &mut RecordingRenderer::default())
        .await
        .unwrap();

    let request = &backend.requests()[0];
    let names: Vec<&str> = request.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["google_search", "javascript_execution", "a", "b", "c"]);
    assert_eq!(request.messages[0].role, "system");
    assert_eq!(request.messages[0].content, agent.preamble());
    assert!(agent.preamble().contains("- google_search:"));
    assert_eq!(request.endpoint.model, "test-model");
}

#[tokio::test]
async fn unknown_tool_is_reported_and_loop_continues() {
    let backend = ScriptedBackend::new(vec![
        directive("", json!([{"name": "delete_everything", "parameters": {}}])),
        final_answer("I can't do that."),
    ]);
    let agent = agent(backend.clone());
    let session = AgentSession::new();

    let outcome = agent
        .submit_user_message(&session, "wipe it", &mut RecordingRenderer::default())
        .await
        .unwrap();

    let messages = session.messages();
    assert_eq!(messages[1].role, Role::Tool);
    assert_eq!(messages[1].tool_name.as_deref(), Some("delete_everything"));
    assert!(payload(&messages[1])["error"]
        .as_str()
        .unwrap()
        .contains("Unknown tool"));
    assert_eq!(outcome.final_output.as_deref(), Some("I can't do that."));
    assert_eq!(backend.requests().len(), 2);
}

#[tokio::test]
async fn stream_failure_abandons_the_round() {
    let backend = ScriptedBackend::new(vec![Reply::Fail("connection reset".into())]);
    let agent = agent(backend);
    let session = AgentSession::new();
    let mut renderer = RecordingRenderer::default();

    let err = agent
        .submit_user_message(&session, "hello", &mut renderer)
        .await
        .unwrap_err();

    assert_eq!(err, AgentError::StreamFailure("connection reset".into()));
    assert_eq!(transcript(&session), [(Role::User, None, "hello".to_string())]);
    assert!(!session.is_processing());
    assert_eq!(renderer.errors.len(), 1);
    assert!(renderer.errors[0].contains("connection reset"));
    assert_eq!(renderer.done, 0);
}

#[tokio::test]
async fn failure_in_later_round_keeps_earlier_rounds() {
    let backend = ScriptedBackend::new(vec![
        directive("Searching.", json!([{"name": "google_search", "parameters": {"query": "q"}}])),
        Reply::Fail("boom".into()),
    ]);
    let agent = agent(backend);
    let session = AgentSession::new();

    let result = agent
        .submit_user_message(&session, "q?", &mut RecordingRenderer::default())
        .await;

    assert!(matches!(result, Err(AgentError::StreamFailure(_))));
    let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::User, Role::Assistant, Role::Tool]);
}

#[tokio::test(start_paused = true)]
async fn tool_messages_follow_call_order() {
    let backend = ScriptedBackend::new(vec![
        directive(
            "Running.",
            json!([
                {"name": "a", "parameters": {"delay_ms": 300}},
                {"name": "b", "parameters": {"delay_ms": 200}},
                {"name": "c", "parameters": {"delay_ms": 100}}
            ]),
        ),
        final_answer("ok"),
    ]);
    let agent = agent(backend);
    let session = AgentSession::new();

    agent
        .submit_user_message(&session, "go", &mut RecordingRenderer::default())
        .await
        .unwrap();

    let tools: Vec<String> = session
        .messages()
        .iter()
        .filter_map(|m| m.tool_name.clone())
        .collect();
    assert_eq!(tools, ["a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn second_submission_while_processing_is_rejected() {
    let backend = ScriptedBackend::new(vec![Reply::Delayed(
        Duration::from_secs(1),
        json!({"output": "first answer"}).to_string(),
    )]);
    let agent = agent(backend.clone());
    let session = AgentSession::new();
    let mut first_renderer = RecordingRenderer::default();
    let mut second_renderer = RecordingRenderer::default();

    let (first, second) = tokio::join!(
        agent.submit_user_message(&session, "first", &mut first_renderer),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(session.is_processing());
            agent
                .submit_user_message(&session, "second", &mut second_renderer)
                .await
        }
    );

    assert!(first.is_ok());
    assert_eq!(second, Err(AgentError::Busy));
    assert_eq!(
        transcript(&session),
        [
            (Role::User, None, "first".to_string()),
            (Role::Assistant, None, "first answer".to_string()),
        ]
    );
    assert_eq!(backend.requests().len(), 1);
    assert!(!session.is_processing());

    // Once idle, the session accepts input again.
    agent
        .submit_user_message(&session, "third", &mut RecordingRenderer::default())
        .await
        .unwrap();
    assert_eq!(session.len(), 4);
}

#[tokio::test]
async fn plain_text_reply_ends_the_turn() {
    let backend = ScriptedBackend::new(vec![Reply::Text("hello world".into())]);
    let agent = agent(backend.clone());
    let session = AgentSession::new();

    let outcome = agent
        .submit_user_message(&session, "hi", &mut RecordingRenderer::default())
        .await
        .unwrap();

    assert_eq!(outcome.rounds, 1);
    assert_eq!(outcome.final_output.as_deref(), Some("hello world"));
    assert_eq!(session.messages()[1].content, "hello world");
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn identical_scripts_produce_identical_transcripts() {
    let script = || {
        vec![
            directive(
                "Let me check.",
                json!([
                    {"name": "javascript_execution", "parameters": {"code": "return 1+2"}},
                    {"name": "nope", "parameters": {}},
                    {"name": "google_search", "parameters": {"query": "q", "num_results": 2}}
                ]),
            ),
            final_answer("3"),
        ]
    };

    let mut runs = Vec::new();
    for _ in 0..2 {
        let agent = agent(ScriptedBackend::new(script()));
        let session = AgentSession::new();
        agent
            .submit_user_message(&session, "add", &mut RecordingRenderer::default())
            .await
            .unwrap();
        // search_time is wall-clock; drop it before comparing
        let mut rows = transcript(&session);
        for row in &mut rows {
            if row.1.as_deref() == Some("google_search") {
                let mut value: Value = serde_json::from_str(&row.2).unwrap();
                value.as_object_mut().unwrap().remove("search_time");
                row.2 = value.to_string();
            }
        }
        runs.push(rows);
    }
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn endless_tool_requests_hit_the_iteration_cap() {
    let script = (0..10)
        .map(|_| directive("again", json!([{"name": "google_search", "parameters": {"query": "x"}}])))
        .collect();
    let backend = ScriptedBackend::new(script);
    let settings = AgentSettings {
        max_iterations: 3,
        ..AgentSettings::default()
    };
    let agent = agent_with(backend.clone(), settings);
    let session = AgentSession::new();

    let err = agent
        .submit_user_message(&session, "loop", &mut RecordingRenderer::default())
        .await
        .unwrap_err();

    assert_eq!(err, AgentError::MaxIterationsExceeded(3));
    assert_eq!(backend.requests().len(), 3);
    assert!(!session.is_processing());
}

#[tokio::test(start_paused = true)]
async fn stalled_stream_times_out() {
    let backend = ScriptedBackend::new(vec![Reply::Hang]);
    let settings = AgentSettings {
        stream_timeout: Duration::from_secs(5),
        ..AgentSettings::default()
    };
    let agent = agent_with(backend, settings);
    let session = AgentSession::new();

    let err = agent
        .submit_user_message(&session, "hello", &mut RecordingRenderer::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::StreamFailure(msg) if msg.contains("5s")));
    assert_eq!(session.len(), 1);
}

#[tokio::test]
async fn stream_without_terminal_event_uses_latest_text() {
    let backend = ScriptedBackend::new(vec![Reply::Truncated(r#"{"output": "partial"}"#.into())]);
    let agent = agent(backend);
    let session = AgentSession::new();

    let outcome = agent
        .submit_user_message(&session, "hi", &mut RecordingRenderer::default())
        .await
        .unwrap();
    assert_eq!(outcome.final_output.as_deref(), Some("partial"));
}

#[tokio::test]
async fn native_tool_calls_are_dispatched() {
    let backend = ScriptedBackend::new(vec![
        Reply::Native(vec![ToolCall::new("google_search", json!({"query": "rust"}))]),
        final_answer("found it"),
    ]);
    let agent = agent(backend);
    let session = AgentSession::new();

    agent
        .submit_user_message(&session, "search", &mut RecordingRenderer::default())
        .await
        .unwrap();

    let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::User, Role::Tool, Role::Assistant]);
}

#[tokio::test]
async fn missing_endpoint_is_rejected_before_requesting() {
    let backend = ScriptedBackend::new(vec![]);
    let agent = Agent::new(backend.clone(), executor(), None, AgentSettings::default());
    let session = AgentSession::new();

    let err = agent
        .submit_user_message(&session, "hello", &mut RecordingRenderer::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::ConfigurationMissing(_)));
    assert!(session.is_empty());
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let agent = agent(ScriptedBackend::new(vec![]));
    let session = AgentSession::new();
    let err = agent
        .submit_user_message(&session, "   ", &mut RecordingRenderer::default())
        .await
        .unwrap_err();
    assert_eq!(err, AgentError::EmptyMessage);
    assert!(session.is_empty());
}

#[tokio::test]
async fn renderer_sees_cumulative_partials_and_appended_messages() {
    let reply = json!({"output": "hi there"}).to_string();
    let backend = ScriptedBackend::new(vec![Reply::Text(reply.clone())]);
    let agent = agent(backend);
    let mut renderer = RecordingRenderer::default();

    agent
        .submit_user_message(&AgentSession::new(), "hi", &mut renderer)
        .await
        .unwrap();

    assert_eq!(renderer.partials.last(), Some(&reply));
    assert!(reply.starts_with(renderer.partials[0].as_str()));
    assert_eq!(renderer.messages.len(), 1);
    assert_eq!(renderer.messages[0].content, "hi there");
}
