//! Terminal output utilities: notes, progress line, key/value tables.

use std::io::Write;

use platelens_core::PipelineRun;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

const BAR_WIDTH: usize = 20;
/// Visible width the progress line is padded to, so shorter labels overwrite longer ones.
const PROGRESS_LINE_WIDTH: usize = 64;

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

fn paint(color: &str, text: &str) -> String {
    if supports_color() {
        format!("{color}{text}{RESET}")
    } else {
        text.to_string()
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        eprintln!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        eprintln!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

/// `[########------------]  40% Processing image...`
pub fn render_progress(progress: u8, step: &str) -> String {
    let filled = usize::from(progress.min(100)) * BAR_WIDTH / 100;
    format!(
        "[{}{}] {:>3}% {}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        progress,
        step
    )
}

/// Rewrite the current terminal line with the run's progress.
pub fn write_progress(writer: &mut impl Write, run: &PipelineRun) -> std::io::Result<()> {
    let step = run.step.as_deref().unwrap_or("");
    let line = render_progress(run.progress, step);
    let pad = PROGRESS_LINE_WIDTH.saturating_sub(line.chars().count());
    let line = paint(CYAN, &line);
    writer.write_all(format!("\r{line}{}", " ".repeat(pad)).as_bytes())?;
    writer.flush()
}

/// Draw every snapshot until the run ends. Stops drawing on the first write error.
pub async fn follow_progress(mut rx: UnboundedReceiver<PipelineRun>, mut out: impl Write) {
    while let Some(snapshot) = rx.recv().await {
        if let Err(e) = write_progress(&mut out, &snapshot) {
            debug!(error = %e, "Progress output unavailable");
            return;
        }
    }
}

/// Render aligned `key  value` rows.
pub fn render_table(rows: &[(&str, String)]) -> String {
    let width = rows
        .iter()
        .map(|(k, _)| k.chars().count())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for (key, value) in rows {
        let pad = width - key.chars().count();
        out.push_str(&format!(
            "  {}{}  {}\n",
            paint(BOLD, key),
            " ".repeat(pad),
            value
        ));
    }
    out
}

/// Human summary of a finished run.
pub fn render_run(run: &PipelineRun) -> String {
    let mut rows: Vec<(&str, String)> = vec![("Run", run.id.to_string())];

    if let Some(detection) = &run.detection {
        let plate = &detection.plate_image;
        let size = match platelens_media::read_dimensions(plate) {
            Some(info) => format!("{}x{} {}", info.width, info.height, plate.mime_type()),
            None => format!("{} bytes {}", plate.len(), plate.mime_type()),
        };
        rows.push(("Plate image", size));
        rows.push(("Blurry", yes_no(detection.is_blurry)));
    }
    if run.enhancement.is_some() {
        let enhanced = if run.enhancement_attempted {
            "sharpened"
        } else {
            "skipped"
        };
        rows.push(("Enhancement", enhanced.to_string()));
    }
    if let Some(extraction) = &run.extraction {
        let text = if extraction.is_blank() {
            paint(DIM, "(none)")
        } else {
            paint(BOLD, &extraction.text)
        };
        rows.push(("Plate text", text));
    }
    if let Some(validation) = &run.validation {
        let verdict = if validation.is_valid {
            paint(GREEN, "valid")
        } else {
            paint(YELLOW, "invalid")
        };
        rows.push(("Format", verdict));
        rows.push(("Details", validation.message.clone()));
    }
    render_table(&rows)
}

fn yes_no(flag: bool) -> String {
    let word = if flag { "yes" } else { "no" };
    word.to_string()
}
