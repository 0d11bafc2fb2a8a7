//! Test runner - executes cases against the relay and reports outcomes

use colored::Colorize;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use crate::types::{Outcome, SharedUpstreamState, TestResult};

pub type CaseFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A single test case
pub struct TestCase {
    pub name: &'static str,
    pub description: &'static str,
    /// Case shells out to the relay binary's client subcommands
    pub needs_binary: bool,
    pub run: Box<dyn Fn(TestContext) -> CaseFuture + Send + Sync>,
}

/// Context passed to each case: where the relay listens, the mock upstream
/// it talks to, and the binary for client-side cases
#[derive(Clone)]
pub struct TestContext {
    pub relay_addr: String,
    pub upstream_state: SharedUpstreamState,
    pub http_client: reqwest::Client,
    /// Relay binary; `None` when connecting to an already-running relay
    pub relay_bin: Option<String>,
}

impl TestContext {
    fn reset_upstream(&self) {
        let mut state = self.upstream_state.lock().unwrap();
        state.response_queue.clear();
        state.received_requests.clear();
    }
}

/// Run the selected cases one at a time, printing each outcome
pub async fn run_tests(cases: Vec<TestCase>, ctx: TestContext, filter: Option<&str>) -> Vec<TestResult> {
    let selected: Vec<&TestCase> = cases
        .iter()
        .filter(|c| filter.map_or(true, |f| c.name.contains(f)))
        .collect();

    print_banner(&ctx, selected.len());

    let mut results = Vec::with_capacity(selected.len());
    for case in selected {
        print!("  {} {} ... ", "▶".bright_blue(), case.name.bright_white());
        let result = run_case(case, &ctx).await;
        print_outcome(&result);
        results.push(result);
    }

    print_summary(&results);
    results
}

async fn run_case(case: &TestCase, ctx: &TestContext) -> TestResult {
    if case.needs_binary && ctx.relay_bin.is_none() {
        return TestResult {
            name: case.name.to_string(),
            outcome: Outcome::Skipped("no relay binary in this mode"),
            duration_ms: 0,
        };
    }

    ctx.reset_upstream();

    let start = Instant::now();
    let outcome = match (case.run)(ctx.clone()).await {
        Ok(()) => Outcome::Passed,
        Err(e) => Outcome::Failed(format!("{:#}", e)),
    };

    TestResult {
        name: case.name.to_string(),
        outcome,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

fn print_banner(ctx: &TestContext, count: usize) {
    let rule = "═══════════════════════════════════════════════════".bright_blue();
    println!("\n{}", rule);
    println!("{}", "  throughline End-to-End Tests".bright_white().bold());
    println!("{}", rule);
    println!("  Relay:   {}", ctx.relay_addr.bright_cyan());
    match &ctx.relay_bin {
        Some(bin) => println!("  Binary:  {}", bin.bright_cyan()),
        None => println!("  Binary:  {}", "none (client cases skipped)".yellow()),
    }
    println!("  Running: {} test(s)\n", count.to_string().bright_cyan());
}

fn print_outcome(result: &TestResult) {
    let ms = result.duration_ms;
    match &result.outcome {
        Outcome::Passed => println!("{} ({ms}ms)", "PASS".bright_green().bold()),
        Outcome::Skipped(reason) => println!("{} ({})", "SKIP".yellow().bold(), reason),
        Outcome::Failed(error) => {
            println!("{} ({ms}ms)", "FAIL".bright_red().bold());
            println!("    {} {}", "Error:".bright_red(), error);
        }
    }
}

fn print_summary(results: &[TestResult]) {
    let (mut passed, mut failed, mut skipped) = (0, 0, 0);
    for result in results {
        match result.outcome {
            Outcome::Passed => passed += 1,
            Outcome::Failed(_) => failed += 1,
            Outcome::Skipped(_) => skipped += 1,
        }
    }

    println!("\n{}", "───────────────────────────────────────────────────".bright_blue());
    let summary = format!("  Results: {} passed, {} failed, {} skipped", passed, failed, skipped);
    if failed == 0 {
        println!("{}", summary.bright_green().bold());
    } else {
        println!("{}", summary.bright_red().bold());
    }
    println!("{}\n", "═══════════════════════════════════════════════════".bright_blue());
}

/// Print every registered case
pub fn list_tests(cases: &[TestCase]) {
    println!("\n{}", "Available tests:".bright_white().bold());
    for case in cases {
        let marker = if case.needs_binary { " [binary]" } else { "" };
        println!("  {}{} - {}", case.name.bright_cyan(), marker, case.description);
    }
    println!();
}
