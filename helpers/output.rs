//! Terminal output for the deployment summary
//!
//! Colored status lines and labeled values. Anything meant for the operator
//! goes through here; diagnostics go through `tracing`.

use colored::Colorize;

pub struct Display;

impl Display {
    /// Title banner with a rule underneath.
    pub fn banner(text: &str) {
        println!("{}", text.bold().cyan());
        println!("{}", "=".repeat(50).cyan());
        println!();
    }

    /// Section heading.
    pub fn section(title: &str) {
        println!("\n{}", title.bold());
    }

    pub fn step(message: &str) {
        println!("{} {}", "▸".cyan().bold(), message);
    }

    pub fn success(message: &str) {
        println!("{} {}", "✓".green().bold(), message);
    }

    /// Errors go to stderr.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    }

    pub fn kv(key: &str, value: &str) {
        println!("   {} {}", format!("{key}:").bold(), value);
    }

    pub fn line(text: &str) {
        println!("   {text}");
    }

    pub fn next_steps(steps: &[&str]) {
        Self::section("Next Steps:");
        for (i, step) in steps.iter().enumerate() {
            println!("   {}. {}", i + 1, step);
        }
    }
}
