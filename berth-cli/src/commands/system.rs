//! System command handlers

use anyhow::Result;
use berth_client::operations::GetVersion;
use berth_core::domain::from_reply;
use berth_core::domain::version::Version;
use colored::*;

use super::run_operation;
use crate::config::Config;

/// Get and display version information
pub async fn show_version(config: &Config) -> Result<()> {
    let document = run_operation(config, GetVersion).await?;
    let Some(document) = document else {
        anyhow::bail!("The daemon did not send version information");
    };
    let version: Version = from_reply(document)?;

    print_version(&version);

    Ok(())
}

fn print_version(version: &Version) {
    println!("{}", "Docker Version:".bold());
    if !version.platform.name.is_empty() {
        println!("  Platform:    {}", version.platform.name.bold());
    }
    println!("  Version:     {}", version.version.cyan());
    println!(
        "  API:         {} {}",
        version.api_version,
        format!("(minimum {})", version.min_api_version).dimmed()
    );
    println!("  OS/Arch:     {}/{}", version.os, version.arch);
    println!("  Go:          {}", version.go_version.dimmed());
    println!("  Git commit:  {}", version.git_commit.dimmed());
    if let Some(build_time) = version.build_time() {
        println!("  Built:       {}", build_time.format("%Y-%m-%d %H:%M:%S"));
    }

    if !version.components.is_empty() {
        println!("\n{}", "Components:".bold());
        for component in &version.components {
            println!(
                "  {} {} {}",
                "▸".cyan(),
                component.name.bold(),
                component.version.dimmed()
            );
        }
    }
}
