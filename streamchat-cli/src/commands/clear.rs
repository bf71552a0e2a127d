use anyhow::Result;
use web::ConversationIdStore;

use super::Context;

pub async fn run(context: &Context) -> Result<()> {
    let Some(conversation_id) = context.ids.get() else {
        println!("No active conversation.");
        return Ok(());
    };

    let mut session = context.session();
    session.clear_conversation().await;
    println!("Cleared conversation {conversation_id}.");
    Ok(())
}
