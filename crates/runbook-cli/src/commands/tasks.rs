use std::sync::Arc;

use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};

use runbook_config::RunbookConfig;
use runbook_core::{Result, RunbookError};
use runbook_runtime::AgentSession;
use runbook_store::{FileTaskStore, TaskListing, TaskStore};

fn open_store(config: &RunbookConfig) -> Arc<dyn TaskStore> {
    Arc::new(FileTaskStore::new(&config.storage.tasks_dir))
}

pub(super) async fn cmd_list(config: &RunbookConfig) -> Result<()> {
    let store = open_store(config);
    let entries = match store.list().await? {
        TaskListing::NoStore => {
            println!(
                "No tasks directory found at {}",
                config.storage.tasks_dir.display()
            );
            return Ok(());
        }
        TaskListing::Tasks(entries) => entries,
    };
    if entries.is_empty() {
        println!("No tasks found in {}", config.storage.tasks_dir.display());
        return Ok(());
    }

    println!("{} task(s):\n", entries.len());
    for entry in entries {
        match entry.parsed {
            Ok(task) => {
                println!("  {}  {}", style(&entry.name).bold(), task.goal);
                if !task.commands.is_empty() {
                    println!("      {} command(s)", task.commands.len());
                }
            }
            Err(e) => println!(
                "  {}  {}",
                style(&entry.name).bold(),
                style(format!("unreadable: {e}")).red()
            ),
        }
    }
    Ok(())
}

pub(super) async fn cmd_show(config: &RunbookConfig, name: &str) -> Result<()> {
    let session = AgentSession::meta(open_store(config));
    print!("{}", session.get_task_details(name).await);
    Ok(())
}

pub(super) async fn cmd_delete(config: &RunbookConfig, name: &str, yes: bool) -> Result<()> {
    let store = open_store(config);
    if !store.exists(name).await? {
        return Err(RunbookError::TaskNotFound(name.to_string()));
    }

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete task '{name}'?"))
            .default(false)
            .interact()
            .map_err(|e| RunbookError::Agent(e.to_string()))?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete(name).await?;
    println!("{} Task '{name}' deleted", style("✓").green());
    Ok(())
}
