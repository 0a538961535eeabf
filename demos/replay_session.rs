//! Step through a recorded agent session
//!
//! This example loads the session written by `record_session` (or builds a
//! sample run when none exists) and tours the replay surface: the session
//! summary, cursor stepping, jumping to an event, state reconstruction,
//! breakpoints, filtered queries, span children, and a diff between two runs
//! that answered differently.
//!
//! # Running the example
//!
//! ```bash
//! cargo run --example record_session   # optional, writes the session file
//! cargo run --example replay_session
//! ```

use agent_replay::replayer::Replayer;
use agent_replay::session::{EventType, Session, TokenUsage};
use agent_replay::Recorder;
use serde_json::json;
use std::collections::HashMap;

/// Build one simulated weather-agent run.
fn sample_run(answer: &str, tokens: TokenUsage, with_error: bool) -> Session {
    let mut recorder = Recorder::builder()
        .metadata_entry("agent", "weather-demo")
        .metadata_entry("version", "0.1.0")
        .build();

    recorder.record_input("user", "What's the weather in Toronto tomorrow?", None);
    {
        let mut span = recorder.span("plan", Some(vec!["phase".to_string()]));
        span.record_state_change("phase", json!(null), json!("planning"));
        span.record_log("info", "deciding which tool to call", None);
    }
    recorder.record_llm_call(
        "qwen3:32b",
        json!([{"role": "user", "content": "What's the weather in Toronto tomorrow?"}]),
        "I should look up the forecast for Toronto before answering.",
        Some(tokens),
        Some(120.0),
        None,
    );
    recorder.record_tool_call(
        "get_forecast",
        HashMap::from([("city".to_string(), json!("Toronto"))]),
        json!({"high_c": 22, "conditions": "sunny"}),
        Some(35.0),
        true,
        None,
    );
    if with_error {
        recorder.record_error("forecast cache miss", Some("CacheError".to_string()), None, None);
    }
    recorder.record_state_change("phase", json!("planning"), json!("answering"));
    recorder.record_output("assistant", format!("Tomorrow in Toronto: {}.", answer), None);
    recorder.into_session()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("{}", "=".repeat(80));
    println!("Replaying an Agent Session");
    println!("{}", "=".repeat(80));
    println!();

    let path = std::env::temp_dir().join("agent_replay_demo.json");
    let session = if path.exists() {
        println!("Loading session from {}", path.display());
        Session::load(&path)?
    } else {
        println!("No recorded session found; building a sample run.");
        sample_run("sunny, high of 22C", TokenUsage::new(42, 17), false)
    };

    let mut replayer = Replayer::new(session);

    // Session summary
    let summary = replayer.get_summary();
    println!();
    println!("Session {}:", summary.session_id);
    println!("  events:     {}", summary.total_events);
    println!("  llm calls:  {}", summary.llm_calls);
    println!("  tool calls: {}", summary.tool_calls);
    println!("  errors:     {}", summary.errors);
    println!(
        "  tokens:     {} in / {} out ({} total)",
        summary.total_tokens.input, summary.total_tokens.output, summary.total_tokens.total
    );
    if let Some(duration_ms) = summary.duration_ms {
        println!("  duration:   {:.1} ms", duration_ms);
    }

    // Step through the first few events.
    println!();
    println!("{}", "-".repeat(80));
    println!("Stepping:");
    for _ in 0..3 {
        if let Some(event) = replayer.step() {
            println!("  [pos {}] {}", replayer.position(), event.summary());
        }
    }
    if let Some(event) = replayer.step_back() {
        println!("  stepped back to: {}", event.summary());
    }
    if let Some(event) = replayer.peek() {
        println!("  next up (peek):  {}", event.summary());
    }

    // Jump straight to a state change and reconstruct the state there.
    let change_ids: Vec<u64> = replayer
        .filter(Some(EventType::StateChange), None, None)
        .iter()
        .map(|e| e.id)
        .collect();
    if let Some(&last_change) = change_ids.last() {
        if let Some(event) = replayer.goto_event(last_change) {
            let state = replayer.get_state(None)?;
            println!();
            println!("After event {} ({}):", event.id, event.summary());
            println!("  state: {}", serde_json::to_string(&state)?);
        }
    }

    // Breakpoints on every state change.
    println!();
    println!("{}", "-".repeat(80));
    println!("Breakpoints on state changes:");
    replayer.reset();
    for id in &change_ids {
        replayer.add_breakpoint(*id);
    }
    while let Some(event) = replayer.continue_to_breakpoint() {
        let state = replayer.get_state(None)?;
        println!("  hit {}: {}", event.id, event.summary());
        println!("    state: {}", serde_json::to_string(&state)?);
    }
    println!("  timeline exhausted at position {}", replayer.position());

    // Filtered queries.
    println!();
    println!("{}", "-".repeat(80));
    println!("Queries:");
    println!("  llm calls: {}", replayer.get_llm_calls().len());
    println!(
        "  mentions of \"toronto\": {}",
        replayer.filter(None, None, Some("toronto")).len()
    );
    let span_start = replayer
        .iter_events()
        .find(|e| e.event_type() == EventType::Custom)
        .map(|e| e.id);
    if let Some(span_id) = span_start {
        let children = replayer.children_of(span_id);
        println!("  events inside span {}: {}", span_id, children.len());
        for child in &children {
            println!("    - {}", child.summary());
        }
    }

    // Compare two runs that answered differently.
    println!();
    println!("{}", "-".repeat(80));
    println!("Diffing two runs:");
    let baseline = Replayer::new(sample_run("sunny, high of 22C", TokenUsage::new(42, 17), false));
    let variant = Replayer::new(sample_run("rainy, high of 14C", TokenUsage::new(55, 21), true));
    let diff = baseline.diff(&variant);

    println!("  events:  {} vs {}", diff.self_events, diff.other_events);
    println!(
        "  tokens:  {} vs {}",
        diff.self_tokens.total, diff.other_tokens.total
    );
    println!("  outputs identical: {}", diff.same_outputs);
    for entry in &diff.output_diffs {
        println!("  output #{} differs:", entry.index);
        println!("    baseline: {}", entry.self_data["content"]);
        println!("    variant:  {}", entry.other_data["content"]);
    }

    println!();
    println!("{}", "=".repeat(80));
    println!("Replay demonstration complete!");
    println!("{}", "=".repeat(80));

    Ok(())
}
