//! Container command handlers
//!
//! Handles listing, creating, starting, stopping and removing containers.

use anyhow::Result;
use berth_client::operations::{
    CreateContainer, ListContainers, RemoveContainer, StartContainer, StopContainer,
};
use berth_core::domain::container::ContainerSummary;
use berth_core::domain::{IdResponse, from_reply};
use clap::Args;
use colored::*;
use serde_json::Value;

use super::image::is_empty_json;
use super::{format_size, run_operation};
use crate::config::Config;

/// Arguments of the create command
#[derive(Args)]
pub struct ContainerArgs {
    /// Image to create the container from
    pub image: String,

    /// Container name
    #[arg(long, default_value = "")]
    pub name: String,

    /// Environment variable in NAME=value form, may be repeated
    #[arg(short, long = "env")]
    pub env: Vec<String>,

    /// Allocate a pseudo-TTY
    #[arg(short, long)]
    pub tty: bool,

    /// Command to run instead of the image default
    #[arg(trailing_var_arg = true)]
    pub cmd: Vec<String>,
}

impl ContainerArgs {
    fn into_operation(self) -> CreateContainer {
        let mut op = CreateContainer::new(self.image).with_name(self.name);
        if !self.env.is_empty() {
            op.config.insert("Env".to_string(), Value::from(self.env));
        }
        if !self.cmd.is_empty() {
            op.config.insert("Cmd".to_string(), Value::from(self.cmd));
        }
        if self.tty {
            op.config.insert("Tty".to_string(), Value::Bool(true));
        }
        op
    }
}

/// List containers
pub async fn list_containers(config: &Config, show_all: bool, limit: u32, show_size: bool) -> Result<()> {
    let op = ListContainers {
        show_all,
        limit,
        show_size,
    };

    let containers: Vec<ContainerSummary> = match run_operation(config, op).await {
        Ok(Some(document)) => from_reply(document)?,
        Ok(None) => Vec::new(),
        Err(e) if is_empty_json(&e) => Vec::new(),
        Err(e) => return Err(e),
    };

    if containers.is_empty() {
        println!("{}", "No containers found.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} container(s):", containers.len()).bold()
        );
        println!();
        for container in &containers {
            print_container_summary(container);
        }
    }

    Ok(())
}

/// Create a container
pub async fn create_container(config: &Config, args: ContainerArgs) -> Result<()> {
    let op = args.into_operation();
    let image = op.image().to_string();

    let Some(document) = run_operation(config, op).await? else {
        anyhow::bail!("The daemon did not return the ID of the new container");
    };
    let created: IdResponse = from_reply(document)?;

    println!("{}", "✓ Container created successfully!".green().bold());
    println!("  ID:    {}", created.id.cyan());
    println!("  Image: {}", image.bold());
    for warning in created.warnings.iter().flatten() {
        println!("  {} {}", "⚠".yellow(), warning.yellow());
    }

    Ok(())
}

/// Start a container
pub async fn start_container(config: &Config, id: String, detach_keys: String) -> Result<()> {
    let op = StartContainer {
        id: id.clone(),
        detach_keys,
    };
    run_operation(config, op).await?;

    println!("{} {}", "✓ Started container".green().bold(), id.cyan());
    Ok(())
}

/// Stop a container
pub async fn stop_container(config: &Config, id: String, timeout: u32) -> Result<()> {
    let op = StopContainer {
        id: id.clone(),
        timeout,
    };
    run_operation(config, op).await?;

    println!("{} {}", "✓ Stopped container".green().bold(), id.cyan());
    Ok(())
}

/// Remove a container
pub async fn remove_container(
    config: &Config,
    id: String,
    remove_anon_volumes: bool,
    force: bool,
    remove_links: bool,
) -> Result<()> {
    let op = RemoveContainer {
        id: id.clone(),
        remove_anon_volumes,
        force,
        remove_links,
    };
    run_operation(config, op).await?;

    println!("{} {}", "✓ Removed container".green().bold(), id.cyan());
    Ok(())
}

fn colorize_state(state: &str) -> ColoredString {
    match state {
        "running" => state.green(),
        "paused" | "restarting" => state.yellow(),
        "exited" | "dead" => state.red(),
        _ => state.normal(),
    }
}

fn print_container_summary(container: &ContainerSummary) {
    println!(
        "  {} {}",
        "▸".cyan(),
        container.name().unwrap_or("<unnamed>").bold()
    );
    println!("    ID:      {}", container.short_id().dimmed());
    println!("    Image:   {}", container.image);
    println!(
        "    State:   {} {}",
        colorize_state(&container.state),
        format!("({})", container.status).dimmed()
    );
    if !container.command.is_empty() {
        println!("    Command: {}", container.command.dimmed());
    }
    if let Some(size_rw) = container.size_rw {
        println!(
            "    Size:    {} {}",
            format_size(size_rw),
            format!("(virtual {})", format_size(container.size_root_fs.unwrap_or(0))).dimmed()
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_args_into_operation() {
        let args = ContainerArgs {
            image: "nginx:latest".to_string(),
            name: "web".to_string(),
            env: vec!["A=1".to_string()],
            tty: false,
            cmd: Vec::new(),
        };

        let op = args.into_operation();
        assert_eq!(op.name, "web");
        assert_eq!(op.image(), "nginx:latest");
        assert_eq!(op.config.get("Env"), Some(&serde_json::json!(["A=1"])));
        assert!(op.config.get("Cmd").is_none());
        assert!(op.config.get("Tty").is_none());
    }
}
