//! Output formatting for CLI commands

use serde::Serialize;

use crate::domain::Task;
use crate::storage;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl From<storage::OutputFormat> for OutputFormat {
    fn from(format: storage::OutputFormat) -> Self {
        match format {
            storage::OutputFormat::Text => OutputFormat::Text,
            storage::OutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
    verbose: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "message": message
                    })
                );
            }
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Text => {
                if let Ok(json) = serde_json::to_string_pretty(data) {
                    println!("{}", json);
                }
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(data) {
                    println!("{}", json);
                }
            }
        }
    }

    /// Prints a task list as a table, or as a JSON array
    pub fn tasks(&self, tasks: &[Task], empty_message: &str) {
        if self.is_json() {
            self.data(&tasks);
            return;
        }

        if tasks.is_empty() {
            println!("{}", empty_message);
            return;
        }

        let id_width = if self.verbose { 40 } else { 7 };
        println!(
            "{:<id_width$}  {:<11}  {:<10}  {:<6}  TITLE",
            "ID", "STATE", "KIND", "PRIO"
        );
        println!("{}", "-".repeat(id_width + 50));
        for task in tasks {
            let id = if self.verbose {
                task.id.as_str()
            } else {
                task.id.short()
            };
            let marker = if task.is_blocked() { " [blocked]" } else { "" };
            println!(
                "{:<id_width$}  {:<11}  {:<10}  {:<6}  {}{}",
                id,
                task.state.as_str(),
                task.kind.as_str(),
                task.priority.as_str(),
                task.title,
                marker
            );
        }
    }

    /// Prints a single task in full
    pub fn task(&self, task: &Task) {
        if self.is_json() {
            self.data(task);
            return;
        }

        println!("Task: {}", task.id);
        println!("Title: {}", task.title);
        println!("State: {}", task.state);
        println!("Kind: {}", task.kind);
        println!("Priority: {}", task.priority);
        println!("Author: {}", task.author);
        if !task.tags.is_empty() {
            println!("Tags: {}", task.tags);
        }
        if let Some(source) = &task.source {
            println!("Source: {}", source);
        }
        if let Some(parent) = &task.parent {
            println!("Parent: {}", parent.short());
        }
        println!("Created: {}", task.created.format("%Y-%m-%d %H:%M"));
        println!("Updated: {}", task.updated.format("%Y-%m-%d %H:%M"));
        println!();
        println!("{}", task.description);
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Returns true if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}
