use anyhow::{Context as _, Result, bail};

use super::Context;

pub async fn run(context: &Context) -> Result<()> {
    let health = context
        .client
        .health()
        .await
        .with_context(|| format!("backend at {} is unreachable", context.client.base_url()))?;

    println!("status: {}", health.status);
    println!("agent initialized: {}", health.agent_initialized);
    if !health.agent_initialized {
        bail!("agent is not initialized");
    }
    Ok(())
}
