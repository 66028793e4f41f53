//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod container;
mod exec;
mod image;
mod system;

pub use container::ContainerArgs;
pub use exec::ExecArgs;

use anyhow::Result;
use berth_core::{Job, JobEvent, KillVerbosity, Notification, Operation};
use clap::Subcommand;
use colored::*;
use serde_json::Value;
use tracing::warn;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show Docker version information
    Version,
    /// List images
    Images {
        /// Show intermediate images
        #[arg(short, long)]
        all: bool,

        /// Show digests
        #[arg(long)]
        digests: bool,
    },
    /// List containers
    Containers {
        /// Show stopped containers too
        #[arg(short, long)]
        all: bool,

        /// Show only the N most recently created containers
        #[arg(short = 'n', long, default_value_t = 0)]
        limit: u32,

        /// Show container sizes
        #[arg(short, long)]
        size: bool,
    },
    /// Create a container
    Create(ContainerArgs),
    /// Start a container
    Start {
        /// Container ID or name
        id: String,

        /// Key sequence for detaching, e.g. ctrl-p,ctrl-q
        #[arg(long, default_value = "")]
        detach_keys: String,
    },
    /// Stop a container
    Stop {
        /// Container ID or name
        id: String,

        /// Seconds to wait before killing the container
        #[arg(short, long, default_value_t = 0)]
        time: u32,
    },
    /// Remove a container
    Rm {
        /// Container ID or name
        id: String,

        /// Remove anonymous volumes
        #[arg(short, long)]
        volumes: bool,

        /// Kill the container if it is running
        #[arg(short, long)]
        force: bool,

        /// Remove the link instead of the container
        #[arg(short, long)]
        link: bool,
    },
    /// Create an execution instance in a running container
    Exec(ExecArgs),
    /// Start an execution instance
    ExecStart {
        /// Execution instance ID
        id: String,

        /// Detach from the command
        #[arg(short, long)]
        detach: bool,

        /// Allocate a pseudo-TTY
        #[arg(short, long)]
        tty: bool,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
///
/// # Returns
/// Result indicating success or failure
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Version => system::show_version(config).await,
        Commands::Images { all, digests } => image::list_images(config, all, digests).await,
        Commands::Containers { all, limit, size } => {
            container::list_containers(config, all, limit, size).await
        }
        Commands::Create(args) => container::create_container(config, args).await,
        Commands::Start { id, detach_keys } => {
            container::start_container(config, id, detach_keys).await
        }
        Commands::Stop { id, time } => container::stop_container(config, id, time).await,
        Commands::Rm {
            id,
            volumes,
            force,
            link,
        } => container::remove_container(config, id, volumes, force, link).await,
        Commands::Exec(args) => exec::create_exec_instance(config, args).await,
        Commands::ExecStart { id, detach, tty } => {
            exec::start_exec_instance(config, id, detach, tty).await
        }
    }
}

/// Run an operation and return its reply document
///
/// In async mode the job is started in the background and its notifications
/// are printed as they arrive. Ctrl-C kills the job.
pub(crate) async fn run_operation<O: Operation>(config: &Config, op: O) -> Result<Option<Value>> {
    let client = config.client();
    if !config.async_mode {
        return Ok(client.run(op).await?);
    }

    let mut job = client.job(op);
    job.base_mut().set_auto_dispose(false);
    let mut notifications = job.subscribe();
    let mut handle = job.start();
    let mut interrupted = false;

    loop {
        tokio::select! {
            notification = notifications.recv() => match notification {
                Some(notification) => {
                    print_notification(&notification);
                    if notification.event == JobEvent::Finished {
                        break;
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if !handle.kill(KillVerbosity::EmitResult) {
                    warn!("Job {} can not be killed", handle.id());
                }
            }
        }
    }

    let job = handle
        .join()
        .await?
        .ok_or_else(|| anyhow::anyhow!("Job was disposed before its result was read"))?;
    Ok(job.into_outcome()?)
}

fn print_notification(notification: &Notification) {
    let time = notification.timestamp.format("%H:%M:%S%.3f").to_string();
    let line = match &notification.event {
        JobEvent::Description(description) => description.to_string().bold().to_string(),
        JobEvent::Info(message) => message.to_string(),
        JobEvent::ConfigurationChanged => "Configuration changed".dimmed().to_string(),
        JobEvent::Succeeded(_) => "Succeeded".green().to_string(),
        JobEvent::Failed { code, message } => {
            format!("Failed ({}): {}", code, message).red().to_string()
        }
        JobEvent::Finished => "Finished".cyan().to_string(),
        other => format!("{:?}", other).dimmed().to_string(),
    };
    println!("  {} {} {}", time.dimmed(), "▸".cyan(), line);
}

/// Format a byte count for humans
pub(crate) fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];

    if bytes < 0 {
        return "-".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{}{}", bytes, UNITS[0])
    } else {
        format!("{:.1}{}", value, UNITS[unit])
    }
}
