use std::io::{self, Write};

use anyhow::{Result, bail};
use clap::Args;
use shared::models::StreamEvent;
use tracing::debug;
use web::{ConversationIdStore, SubmitOutcome};

use super::Context;

const RESULT_PREVIEW_CHARS: usize = 120;

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Message to send to the agent
    #[arg(required = true)]
    pub text: Vec<String>,

    /// Forget the active conversation and start a new one
    #[arg(long)]
    pub new: bool,
}

pub async fn run(context: &Context, args: AskArgs) -> Result<()> {
    if args.new {
        context.ids.clear();
    }
    let text = args.text.join(" ");
    if text.trim().is_empty() {
        bail!("message must not be empty");
    }

    let mut session = context.session();
    session.on_event(render_event);

    match session.submit(&text).await {
        SubmitOutcome::Completed { .. } => {
            println!();
            Ok(())
        }
        SubmitOutcome::Failed { message } => {
            println!();
            bail!("request failed: {message}")
        }
        SubmitOutcome::Busy => bail!("a request is already in flight"),
    }
}

fn render_event(event: &StreamEvent) {
    match event {
        StreamEvent::ContentDelta { content } => {
            print!("{content}");
            io::stdout().flush().ok();
        }
        StreamEvent::Content { content } => {
            println!();
            print!("{content}");
            io::stdout().flush().ok();
        }
        StreamEvent::ToolCall { tool, input } => eprintln!("[{tool}] {input}"),
        StreamEvent::ToolResult { tool, result } => {
            eprintln!("[{tool}] -> {}", preview(result));
        }
        StreamEvent::ConversationId {
            conversation_id: Some(id),
        } => debug!(conversation_id = %id, "conversation confirmed"),
        _ => {}
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(RESULT_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
