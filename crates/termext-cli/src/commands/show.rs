//! Show command - details of one backend

use anyhow::Result;
use colored::Colorize;
use uuid::Uuid;

use super::Context;

pub async fn execute(ctx: &Context, id: Uuid) -> Result<()> {
    let registry = ctx.registry().await;
    let Some(factory) = registry.get_factory(id) else {
        anyhow::bail!("No backend with id {} in catalog '{}'", id, ctx.catalog_name);
    };
    let descriptor = factory.descriptor();

    println!("{}", descriptor.name().blue().bold());
    println!("   Id:       {}", descriptor.connection_type());
    println!("   Service:  {}", descriptor.service_identifier().cyan());
    println!("   Package:  {}", descriptor.package_identifier());
    println!("   Command:  {}", descriptor.command_line());
    match descriptor.icon_uri() {
        Some(icon) => println!("   Icon:     {}", icon),
        None => println!("   Icon:     {}", "(none)".dimmed()),
    }

    Ok(())
}
