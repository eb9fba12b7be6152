use owo_colors::OwoColorize;

use agentmd_core::{CachePolicy, ResolutionTrace};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "agentmd".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Markdown for AI agents\n".dimmed());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

pub fn cache_label(policy: CachePolicy) -> &'static str {
    match policy {
        CachePolicy::Public => "public",
        CachePolicy::Private => "private",
    }
}

/// Print the path a resolution walked, hop by hop
pub fn print_trace(trace: &ResolutionTrace) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Resolution".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
    for (hop, path) in trace.visited.iter().enumerate() {
        eprintln!("  {} {}", format!("[{hop}]").dimmed(), path.bright_white());
    }
    eprintln!("  {} {}", "Hops:".dimmed(), trace.hops.to_string().bright_white());
    if let Some(rejection) = &trace.rejection {
        eprintln!("  {} {}", "Stopped:".dimmed(), rejection.to_string().bright_yellow());
    }
    eprintln!();
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
