use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use domsnap::{ErrorOutput, SnapOutput, SnapshotError, OUTPUT_VERSION};

use crate::cli::OutputFormat;

/// Data URIs longer than this are shortened in terminal output.
const PREVIEW_LEN: usize = 96;

/// Write output in the requested format.
pub fn write_output(
    body: &SnapOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: SnapshotError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let error_payload = err.to_payload();
    let payload = SnapOutput::Error(ErrorOutput {
        version: OUTPUT_VERSION.to_string(),
        message: Some(error_payload.message.clone()),
        error: error_payload,
    });

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    ExitCode::from(2)
}

/// Write JSON output to file or stdout.
fn write_json_output(body: &SnapOutput, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Write pretty output to file or stdout.
fn write_pretty_output(body: &SnapOutput, output: Option<&Path>) -> io::Result<()> {
    let stdout_is_tty = std::io::stdout().is_terminal();
    let use_human = output.is_none() && stdout_is_tty;

    if use_human {
        let content = format_pretty(body, true);
        println!("{content}");
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &SnapOutput, colorize: bool) -> String {
    match body {
        SnapOutput::Capture(out) => {
            let mut buf = String::new();
            let header = color("[CAPTURE]", "32", colorize);
            writeln!(buf, "{} {}x{} SVG", header, out.width, out.height).ok();
            writeln!(buf, "Snapshot: {}", out.snapshot.display()).ok();
            if let Some(selector) = &out.selector {
                writeln!(buf, "Selector: {selector}").ok();
            }
            if let Some(group) = &out.group {
                writeln!(buf, "Group: {group}").ok();
            }
            writeln!(
                buf,
                "Data URI ({} bytes): {}",
                out.data_uri.len(),
                preview(&out.data_uri)
            )
            .ok();
            buf
        }
        SnapOutput::Error(out) => {
            let mut buf = String::new();
            let header = color("[ERROR]", "31", colorize);
            let message = out
                .message
                .as_deref()
                .unwrap_or_else(|| out.error.message.as_str());
            writeln!(buf, "{} {}", header, message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
            buf
        }
    }
}

fn preview(data_uri: &str) -> String {
    match data_uri.char_indices().nth(PREVIEW_LEN) {
        Some((cut, _)) => format!("{}\u{2026}", &data_uri[..cut]),
        None => data_uri.to_string(),
    }
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}
