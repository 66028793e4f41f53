//! Exec command handlers

use anyhow::Result;
use berth_client::operations::{CreateExecInstance, StartExecInstance};
use berth_core::domain::{IdResponse, from_reply};
use clap::Args;
use colored::*;

use super::run_operation;
use crate::config::Config;

/// Arguments of the exec command
#[derive(Args)]
pub struct ExecArgs {
    /// Container ID or name
    pub id: String,

    /// Attach stdin
    #[arg(short, long)]
    pub interactive: bool,

    /// Allocate a pseudo-TTY
    #[arg(short, long)]
    pub tty: bool,

    /// Environment variable in NAME=value form, may be repeated
    #[arg(short, long = "env")]
    pub env: Vec<String>,

    /// Run with extended privileges
    #[arg(long)]
    pub privileged: bool,

    /// User to run the command as
    #[arg(short, long, default_value = "")]
    pub user: String,

    /// Working directory inside the container
    #[arg(short, long, default_value = "")]
    pub workdir: String,

    /// Key sequence for detaching
    #[arg(long, default_value = "")]
    pub detach_keys: String,

    /// Command and arguments
    #[arg(trailing_var_arg = true, required = true)]
    pub cmd: Vec<String>,
}

impl ExecArgs {
    fn into_operation(self) -> CreateExecInstance {
        let mut op = CreateExecInstance::new(self.id, self.cmd);
        op.attach_stdin = self.interactive;
        op.attach_stdout = true;
        op.attach_stderr = true;
        op.tty = self.tty;
        op.privileged = self.privileged;
        op.user = self.user;
        op.working_dir = self.workdir;
        op.detach_keys = self.detach_keys;
        for entry in self.env {
            match entry.split_once('=') {
                Some((name, value)) => op.add_env_pair(name, value),
                None => op.add_env(entry.as_str()),
            }
        }
        op
    }
}

/// Create an execution instance
pub async fn create_exec_instance(config: &Config, args: ExecArgs) -> Result<()> {
    let container = args.id.clone();
    let op = args.into_operation();

    let Some(document) = run_operation(config, op).await? else {
        anyhow::bail!("The daemon did not return the ID of the execution instance");
    };
    let created: IdResponse = from_reply(document)?;

    println!("{}", "✓ Execution instance created successfully!".green().bold());
    println!("  ID:        {}", created.id.cyan());
    println!("  Container: {}", container.dimmed());
    println!(
        "  {}",
        format!("Run `berth exec-start {}` to start it", created.id).dimmed()
    );

    Ok(())
}

/// Start an execution instance
pub async fn start_exec_instance(config: &Config, id: String, detach: bool, tty: bool) -> Result<()> {
    let op = StartExecInstance {
        id: id.clone(),
        detach,
        tty,
    };
    run_operation(config, op).await?;

    println!("{} {}", "✓ Started execution instance".green().bold(), id.cyan());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_args_into_operation() {
        let args = ExecArgs {
            id: "web".to_string(),
            interactive: false,
            tty: true,
            env: vec!["TERM=xterm".to_string(), "TERM=vt100".to_string(), "DEBUG".to_string()],
            privileged: false,
            user: String::new(),
            workdir: "/srv".to_string(),
            detach_keys: String::new(),
            cmd: vec!["ls".to_string()],
        };

        let op = args.into_operation();
        assert_eq!(op.id, "web");
        assert!(op.tty);
        assert!(op.attach_stdout);
        assert!(!op.attach_stdin);
        assert_eq!(op.env, vec!["TERM=vt100", "DEBUG"]);
        assert_eq!(op.working_dir, "/srv");
    }
}
