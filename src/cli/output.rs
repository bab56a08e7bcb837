//! Output formatting module for Nexible
//!
//! Provides colored human output and a JSON mode for scripting.

use colored::Colorize;
use nexible::modules::{Diff, ModuleOutput, ModuleStatus};
use serde::Serialize;
use std::time::Instant;

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}

/// Output formatter for different output modes
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// JSON output mode
    json_mode: bool,
    /// Verbosity level
    verbosity: u8,
    /// Start time for duration calculations
    start_time: Instant,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();

        Self {
            use_color,
            json_mode,
            verbosity,
            start_time: Instant::now(),
        }
    }

    /// Print a task-style header for one module run
    pub fn task_header(&self, module: &str, host: &str) {
        if self.json_mode {
            return;
        }

        let header = format!("TASK [{} @ {}]", module, host);
        let stars = "*".repeat(80_usize.saturating_sub(header.len()));

        if self.use_color {
            println!("\n{} {}", header.bright_white().bold(), stars.bright_black());
        } else {
            println!("\n{} {}", header, stars);
        }
    }

    fn status_string(&self, status: ModuleStatus) -> String {
        let plain = status.to_string();
        if !self.use_color {
            return plain;
        }
        match status {
            ModuleStatus::Ok => plain.green().to_string(),
            ModuleStatus::Changed => plain.yellow().to_string(),
        }
    }

    /// Print a module result
    pub fn module_result(&self, module: &str, host: &str, output: &ModuleOutput) {
        if self.json_mode {
            let result = serde_json::json!({
                "module": module,
                "host": host,
                "result": output,
                "duration_ms": self.start_time.elapsed().as_millis() as u64,
            });
            println!("{}", to_json(&result));
            return;
        }

        let host_str = if self.use_color {
            host.bright_white().bold().to_string()
        } else {
            host.to_string()
        };
        println!("{}: [{}] {}", self.status_string(output.status), host_str, output.msg);

        if let Some(commands) = output.data.get("commands").and_then(|c| c.as_array()) {
            for command in commands.iter().filter_map(|c| c.as_str()) {
                if self.use_color {
                    println!("    {}", command.cyan());
                } else {
                    println!("    {}", command);
                }
            }
        }

        if let Some(ref diff) = output.diff {
            self.diff(diff);
        }

        if self.verbosity >= 1 {
            for (key, value) in &output.data {
                if key == "commands" {
                    continue;
                }
                println!("    {} = {}", key, value);
            }
        }
    }

    /// Print a diff, coloring added and removed lines
    pub fn diff(&self, diff: &Diff) {
        if self.json_mode {
            return;
        }

        println!("--- before: {}", diff.before);
        println!("+++ after: {}", diff.after);
        let Some(ref details) = diff.details else {
            return;
        };
        for line in details.lines() {
            if !self.use_color {
                println!("{}", line);
            } else if line.starts_with('+') {
                println!("{}", line.green());
            } else if line.starts_with('-') {
                println!("{}", line.red());
            } else {
                println!("{}", line);
            }
        }
    }

    /// Print a list of name/description pairs
    pub fn listing(&self, items: &[(&str, &str)]) {
        if self.json_mode {
            let list: Vec<_> = items
                .iter()
                .map(|(name, description)| serde_json::json!({ "name": name, "description": description }))
                .collect();
            println!("{}", to_json(&list));
            return;
        }

        let width = items.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        for (name, description) in items {
            let padded = format!("{:width$}", name, width = width);
            if self.use_color {
                println!("{}  {}", padded.bold(), description);
            } else {
                println!("{}  {}", padded, description);
            }
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.json_mode {
            let err = serde_json::json!({
                "type": "error",
                "message": message
            });
            eprintln!("{}", to_json(&err));
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.json_mode {
            let warn = serde_json::json!({
                "type": "warning",
                "message": message
            });
            eprintln!("{}", to_json(&warn));
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.verbosity < 1 || self.json_mode {
            return;
        }

        if self.use_color {
            println!("{} {}", "INFO:".blue(), message);
        } else {
            println!("INFO: {}", message);
        }
    }
}
