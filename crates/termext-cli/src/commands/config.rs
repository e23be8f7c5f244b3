//! Config command - effective configuration

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::config::SettingsManager;

pub async fn show(ctx: &Context) -> Result<()> {
    println!("{}", "⚙️  Termext Configuration".blue().bold());
    println!();

    match SettingsManager::config_path()? {
        Some(path) => println!("   File:           {}", path.display()),
        None => println!("   File:           {}", "(defaults)".dimmed()),
    }
    println!("   Home:           {}", SettingsManager::termext_home()?.display());
    println!("   Catalog:        {}", ctx.catalog_name.cyan());
    println!("   Extensions dir: {}", ctx.extensions_dir.display());
    println!(
        "   Default size:   {}x{}",
        ctx.settings.default_columns, ctx.settings.default_rows
    );
    if let Some(filter) = &ctx.settings.log_filter {
        println!("   Log filter:     {}", filter);
    }

    println!();
    println!("{}", serde_json::to_string_pretty(&ctx.settings)?.dimmed());

    Ok(())
}
