//! List command - available terminal backends

use anyhow::Result;
use colored::Colorize;

use super::Context;

pub async fn execute(ctx: &Context) -> Result<()> {
    let registry = ctx.registry().await;

    println!("{}", "🖥  Terminal Backends".blue().bold());
    println!();

    if registry.is_empty() {
        println!("   {}", "No backends found.".yellow());
        println!(
            "   Catalog {} in {}",
            ctx.catalog_name.cyan(),
            ctx.extensions_dir.display().to_string().dimmed()
        );
        return Ok(());
    }

    for factory in registry.get_factories() {
        println!(
            "   {} {}",
            factory.name().cyan().bold(),
            factory.connection_type().to_string().dimmed()
        );
        println!("      {}", factory.command_line());
    }
    println!();
    println!("{} {} backend(s)", "✓".green(), registry.len());

    Ok(())
}
