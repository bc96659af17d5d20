//! Sitesmith 终端入口
//!
//! 初始化日志与 Agent 组件，逐行读取用户输入，对进程内累积的对话跑编排循环，
//! 打印过程事件、最终回复与预览链接。

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use sitesmith::agent::{create_agent_components, create_llm_from_config, process_messages_stream};
use sitesmith::config::{load_config, AppConfig};
use sitesmith::memory::{Message, Role};
use sitesmith::observability;
use sitesmith::react::ReactEvent;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    let llm = create_llm_from_config(&cfg);
    let components =
        Arc::new(create_agent_components(&cfg, llm).context("Failed to create agent")?);

    println!("Sitesmith ready. Describe the site you want, or type 'exit' to quit.");

    let mut history: Vec<Message> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        history.push(Message::user(input));
        let before = history.len();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let printer = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                print_event(&ev);
            }
        });

        let conversation =
            process_messages_stream(&components, std::mem::take(&mut history), tx).await;
        printer.await.ok();

        for msg in &conversation.messages()[before..] {
            if msg.role == Role::Model {
                let text = msg.text();
                if !text.is_empty() {
                    println!("{}", text);
                }
            }
        }
        if let Some(url) = conversation.preview_link_since(before) {
            println!("🔗 {}", url);
        }
        history = conversation.into_messages();
    }

    Ok(())
}

fn print_event(ev: &ReactEvent) {
    match ev {
        ReactEvent::RoundUpdate { round, max_rounds } if *round > 0 => {
            println!("  ↻ round {}/{}", round, max_rounds);
        }
        ReactEvent::ToolCall { tool, .. } => println!("  🔧 {}", tool),
        ReactEvent::Observation { preview, .. } => println!("  ← {}", preview),
        _ => {}
    }
}
