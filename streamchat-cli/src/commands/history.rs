use anyhow::Result;
use web::ConversationIdStore;

use super::Context;

pub async fn run(context: &Context) -> Result<()> {
    if context.ids.get().is_none() {
        println!("No active conversation.");
        return Ok(());
    }

    let session = context.session();
    session.load_history().await;
    let state = session.store().state();

    if state.messages.is_empty() {
        println!("No messages in conversation {}.", session.get_conversation_id());
        return Ok(());
    }

    for message in &state.messages {
        println!(
            "[{}] {}: {}",
            message.timestamp.0.format("%Y-%m-%d %H:%M:%S"),
            message.role.as_str(),
            message.content
        );
        for call in state.tool_calls_for(&message.id) {
            println!(
                "    tool {} {} -> {}",
                call.tool_name,
                call.input,
                call.result.as_deref().unwrap_or("(running)")
            );
        }
    }
    Ok(())
}
