//! Record a complete agent session
//!
//! This example walks a simulated weather-question agent through one full run
//! and records everything it does: the user input, a planning span, an LLM
//! call made through [`RecordingGateway`], a tool call observed with
//! `observe_tool`, state changes, and the final output. The finished session
//! is saved as JSON so `replay_session` (or your own tooling) can load it.
//!
//! # Running the example
//!
//! ```bash
//! cargo run --example record_session
//! ```
//!
//! No LLM backend is required; the gateway is scripted.

use agent_replay::integrations::{
    LlmGateway, LlmRequest, LlmResponse, RecordingGateway, SharedRecorder,
};
use agent_replay::session::TokenUsage;
use agent_replay::Recorder;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;

/// Stand-in for a real provider gateway. Always answers the same way.
struct CannedGateway;

#[async_trait]
impl LlmGateway for CannedGateway {
    async fn complete(&self, _request: LlmRequest) -> agent_replay::Result<LlmResponse> {
        Ok(LlmResponse {
            content: "I should look up the forecast for Toronto before answering.".to_string(),
            usage: TokenUsage::new(42, 17),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("{}", "=".repeat(80));
    println!("Recording an Agent Session");
    println!("{}", "=".repeat(80));
    println!();

    let recorder = SharedRecorder::new(
        Recorder::builder()
            .metadata_entry("agent", "weather-demo")
            .metadata_entry("version", "0.1.0")
            .build(),
    );

    // The user asks a question; seed some context for later snapshots.
    recorder.record_input("user", "What's the weather in Toronto tomorrow?", None);
    recorder.set_state("goal", "answer weather question");

    // Plan inside a span so the planning events are grouped in the timeline.
    recorder.with(|rec| {
        let mut span = rec.span("plan", Some(vec!["phase".to_string()]));
        span.record_state_change("phase", json!(null), json!("planning"));
        span.record_log("info", "deciding which tool to call", None);
    });

    // Every call through the recording gateway lands in the session.
    let gateway = RecordingGateway::new(CannedGateway, recorder.clone());
    let request = LlmRequest::new(
        "qwen3:32b",
        vec![json!({"role": "user", "content": "What's the weather in Toronto tomorrow?"})],
    );
    let thought = gateway.complete(request).await?;
    println!("Model said: {}", thought.content);

    // Run the tool through the observer so the call is recorded either way.
    let args = HashMap::from([("city".to_string(), json!("Toronto"))]);
    let forecast = recorder.observe_tool("get_forecast", args, || {
        Ok::<_, std::io::Error>(json!({"high_c": 22, "conditions": "sunny"}))
    })?;

    recorder.record_state_change("phase", json!("planning"), json!("answering"));
    recorder.record_output(
        "assistant",
        format!(
            "Tomorrow in Toronto: {}, high of {}C.",
            forecast["conditions"].as_str().unwrap_or("unknown"),
            forecast["high_c"]
        ),
        None,
    );

    let path = std::env::temp_dir().join("agent_replay_demo.json");
    recorder.save(&path)?;

    // Show what was captured.
    let session = recorder.session();
    println!();
    println!("{}", "-".repeat(80));
    println!("Recorded timeline ({} events):", session.event_count());
    println!("{}", "-".repeat(80));
    for event in session.events() {
        let nested = if event.parent_id.is_some() { "    " } else { "" };
        println!("[{:>2}] {}{}", event.id, nested, event.summary());
    }

    let tokens = session.total_tokens();
    println!();
    println!(
        "Tokens: {} in / {} out ({} total)",
        tokens.input, tokens.output, tokens.total
    );
    println!("State snapshots stored: {}", session.state_snapshots().len());
    println!();
    println!("Session written to {}", path.display());
    println!("Run `cargo run --example replay_session` to step through it.");

    Ok(())
}
