use anyhow::Result;
use web::ConversationIdStore;

use super::Context;

pub async fn run(context: &Context) -> Result<()> {
    let session = context.session();
    if context.ids.get().is_some() {
        session.get_conversation_id();
        session.refresh_suggestions().await;
    }

    for suggestion in session.suggestions() {
        println!("- {suggestion}");
    }
    Ok(())
}
