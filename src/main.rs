//! Hive 命令行入口
//!
//! 用法：`hive [任务文本…]`。初始化日志、加载配置，用内置 Echo Worker 构建编排器，
//! 提交任务后逐行输出事件（JSON），最后输出结果。Ctrl+C 取消当前会话。

use anyhow::Context;
use futures_util::StreamExt;
use hive::config::load_config;
use hive::execution::{EchoWorker, WorkerRegistry};
use hive::{observability, OrchestratorBuilder, Task};

fn builtin_workers() -> WorkerRegistry {
    let mut registry = WorkerRegistry::new();
    registry.register(EchoWorker::new("general", "General-purpose worker", &[]));
    registry.register(EchoWorker::new(
        "research",
        "Finds and summarizes sources",
        &["search", "research", "find", "sources", "搜索"],
    ));
    registry.register(EchoWorker::new(
        "writer",
        "Drafts prose and documents",
        &["write", "draft", "essay", "report", "写"],
    ));
    registry.register(EchoWorker::new(
        "reviewer",
        "Reviews and critiques output",
        &["review", "check", "critique", "审查"],
    ));
    registry
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if text.trim().is_empty() {
        anyhow::bail!("usage: hive <task description>");
    }

    let config = load_config(None).context("Failed to load config")?;
    let orchestrator = OrchestratorBuilder::new(config)
        .with_registry(builtin_workers())
        .build()
        .context("Failed to build orchestrator")?;

    let mut handle = orchestrator
        .submit(Task::new(text))
        .context("Task was not admitted")?;
    let mut events = handle.stream_events().context("Event stream unavailable")?;

    let session_id = handle.session_id().to_string();
    let canceller = orchestrator.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(session_id = %session_id, "Ctrl+C received, cancelling");
            canceller.cancel(&session_id);
        }
    });

    while let Some(event) = events.next().await {
        println!("{}", serde_json::to_string(&event).context("Failed to encode event")?);
    }

    let outcome = handle.outcome().await.context("Session did not finish")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&outcome).context("Failed to encode outcome")?
    );
    tracing::debug!(metrics = %orchestrator.metrics().to_json(), "metrics");

    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
