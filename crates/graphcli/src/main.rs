use anyhow::Result;
use clap::Parser;
use graphcore::{ExecutionEvent, PartialUpdate};
use graphnodes::{register_all, research_graph, research_schema, ResearchClients};
use graphruntime::{GraphRuntime, NodeStatus, RuntimeConfig, StepRegistry};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "research")]
#[command(about = "Multi-source research agent", long_about = None)]
struct Cli {
    /// Show node-level progress and debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Cap on simultaneously running nodes
    #[arg(long)]
    max_parallel: Option<usize>,

    /// Per-question deadline in seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Cancel sibling branches on the first node failure
    #[arg(long)]
    fail_fast: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut registry = StepRegistry::new();
    register_all(&mut registry, ResearchClients::stubs());
    let graph = research_graph(&registry)?;

    let runtime = GraphRuntime::with_registry(
        Arc::new(registry),
        RuntimeConfig {
            max_parallel: cli.max_parallel,
            deadline: cli.deadline_secs.map(Duration::from_secs),
            fail_fast: cli.fail_fast,
            ..Default::default()
        },
    );
    let plan = runtime.compile(&graph)?;

    if cli.verbose {
        let mut events = runtime.subscribe_events();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                match event {
                    ExecutionEvent::NodeStarted { node, .. } => {
                        println!("  ⚡ {}", node);
                    }
                    ExecutionEvent::NodeCompleted { node, duration_ms, .. } => {
                        println!("  ✅ {} ({}ms)", node, duration_ms);
                    }
                    ExecutionEvent::NodeFailed { node, error, .. } => {
                        println!("  ❌ {}: {}", node, error);
                    }
                    ExecutionEvent::NodeSkipped { node, .. } => {
                        println!("  ⤵️  {} skipped", node);
                    }
                    ExecutionEvent::NodeMessage { node, message, .. } => {
                        println!("     [{}] {}", node, message);
                    }
                    _ => {}
                }
            }
        });
    }

    println!("🤖 Multi-Source Research Agent");
    println!("Type 'exit' to quit\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("Ask me anything: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") {
            println!("👋 Bye");
            break;
        }

        // Fresh state per question; nothing carries over between runs.
        let initial = PartialUpdate::new()
            .set(graphnodes::USER_QUESTION, question)
            .set(graphnodes::MESSAGES, format!("user: {}", question));

        println!("\n🚀 Researching...");
        match runtime.run(&graph, &plan, research_schema(), initial).await {
            Ok(outcome) => {
                if let Some(answer) = outcome.state.get_str(graphnodes::FINAL_ANSWER) {
                    println!("\n✅ Final Answer:\n{}\n", answer);
                } else {
                    println!("\n⚠️  No final answer produced");
                }
                for failure in &outcome.failures {
                    println!("  ❌ {} failed: {}", failure.node, failure.error);
                }
                let skipped = outcome.skipped();
                if !skipped.is_empty() {
                    println!("  ⤵️  skipped: {}", skipped.join(", "));
                }
                for (node, status) in &outcome.statuses {
                    if *status == NodeStatus::Cancelled {
                        println!("  ⏱️  {} cancelled", node);
                    }
                }
            }
            Err(e) => {
                println!("\n💥 Run failed: {}", e);
            }
        }

        println!("{}", "-".repeat(80));
    }

    Ok(())
}
