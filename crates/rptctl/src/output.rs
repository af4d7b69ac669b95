//! Output formatting - plain ASCII with a little color

use owo_colors::OwoColorize;
use rpt_common::gate::SubmitOutcome;
use rpt_common::ipc::StatusData;
use rpt_common::{Classification, LogRecord, PipelineOutcome, RunStatus};

/// Translation result: the text on stdout, how it was produced on stderr
pub fn print_outcome(outcome: &PipelineOutcome) {
    println!("{}", outcome.output);
    eprintln!("{}", status_tag(&outcome.status));
}

pub fn status_tag(status: &RunStatus) -> String {
    let label = format!("[{}]", status.label());
    match status {
        RunStatus::Translated => label.bright_green().to_string(),
        RunStatus::CacheHit => label.green().to_string(),
        RunStatus::PassThrough(_) => label.yellow().to_string(),
        RunStatus::EmptyInput | RunStatus::NothingToTranslate => label.dimmed().to_string(),
    }
}

pub fn print_classification(classification: &Classification) {
    let selection = classification.selection();
    println!(
        "command:  {}",
        selection.command_token.as_deref().unwrap_or("-")
    );
    println!("mode:     {}", selection.mode);
    println!("body:     {}", selection.body);
    if !classification.is_translatable() {
        println!("{}", "[nothing to translate]".dimmed());
    }
}

pub fn print_trigger(outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::Started => println!("{}", "[OK] Translation started".bright_green()),
        SubmitOutcome::Queued => println!("{}", "[QUEUED] Runs after the current translation".yellow()),
        SubmitOutcome::Dropped => println!("{}", "[BUSY] Translation already running".yellow()),
    }
}

pub fn print_status(status: &StatusData) {
    let state = if !status.enabled {
        "[DISABLED]".yellow().to_string()
    } else if status.busy {
        "[BUSY]".cyan().to_string()
    } else {
        "[OK]".bright_green().to_string()
    };

    println!("{}  rptd v{}", state, status.version);
    println!();
    println!("  Uptime:       {}", format_uptime(status.uptime_seconds));
    println!("  Style:        {}", status.style);
    println!("  Enabled:      {}", yes_no(status.enabled));
    println!("  Split lines:  {}", yes_no(status.split_lines));
    println!("  Gate policy:  {:?}", status.gate_policy);
    println!(
        "  Runs:         {} completed, {} triggers dropped",
        status.runs_completed, status.triggers_dropped
    );
    match status.cache_entries {
        Some(count) => println!("  Cache:        {} entries", count),
        None => println!("  Cache:        {}", "unavailable".dimmed()),
    }
    println!("  Model:        {}", status.model);
    if !status.api_key_configured {
        println!();
        println!(
            "{} No API key configured - selections pass through untranslated",
            "[WARNING]".yellow()
        );
    }
}

pub fn print_logs(records: &[LogRecord]) {
    if records.is_empty() {
        println!("{}", "No translations yet".dimmed());
        return;
    }
    for record in records {
        println!(
            "{} {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            format!("({})", record.style).cyan()
        );
        println!("  {}", record.original_text);
        println!("  {} {}", "->".dimmed(), record.result_text);
    }
}

pub fn display_success(message: &str) {
    println!("{} {}", "[OK]".bright_green(), message);
}

pub fn display_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red(), message);
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
