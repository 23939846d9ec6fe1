//! `pouch clean` command implementation.

use super::CommandContext;

/// Delete `.depCache` and `.installCache`; node_modules is left alone
pub async fn execute(ctx: &CommandContext) -> anyhow::Result<()> {
    ctx.run_cache().clear().await?;
    ctx.output.success("Run caches cleared");
    Ok(())
}
