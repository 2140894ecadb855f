use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use h2h_lib::{ErrorOutput, ErrorPayload, H2hError, H2hOutput, H2H_OUTPUT_VERSION};

use crate::cli::OutputFormat;

pub fn write_output(
    body: &H2hOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

pub fn render_error(err: H2hError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    render_payload(err.to_payload(), format, output)
}

pub fn render_payload(
    error_payload: ErrorPayload,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let payload = H2hOutput::Error(ErrorOutput {
        version: H2H_OUTPUT_VERSION.to_string(),
        message: Some(error_payload.message.clone()),
        error: error_payload,
    });

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    log::error!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                log::error!("Failed to write error output: {}", write_err);
            }
        }
    };

    // Exit code 2 is reserved for errors; an unscored comparison uses 1.
    ExitCode::from(2)
}

fn write_json_output(
    body: &H2hOutput,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

fn write_pretty_output(body: &H2hOutput, output: Option<&Path>) -> io::Result<()> {
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

pub fn format_pretty(body: &H2hOutput, colorize: bool) -> String {
    match body {
        H2hOutput::Compare(out) => {
            let mut buf = String::new();
            let header = color("[H2H]", "36", colorize);
            writeln!(buf, "{} {} comparison", header, capitalize(&out.kind.to_string())).ok();

            let name1 = out.side1.display_name();
            let name2 = out.side2.display_name();
            let width = name1.chars().count().max(name2.chars().count());
            for (side, name, score) in [
                (&out.side1, &name1, out.score.score1),
                (&out.side2, &name2, out.score.score2),
            ] {
                writeln!(
                    buf,
                    "{:width$}  ({:>9})  {}",
                    name,
                    side.scope,
                    format_score(score, colorize),
                    width = width
                )
                .ok();
            }

            if !out.breakdown.is_empty() {
                writeln!(buf, "Metrics:").ok();
                for row in &out.breakdown {
                    writeln!(
                        buf,
                        "- {:14} {:>8} vs {:<8} {:>5.1} / {:<5.1}",
                        row.key.label(),
                        format_value(row.value1),
                        format_value(row.value2),
                        row.score1,
                        row.score2
                    )
                    .ok();
                }
            }

            if let Some(summary) = &out.summary {
                if !summary.highlights.is_empty() {
                    writeln!(buf, "Highlights:").ok();
                    for line in &summary.highlights {
                        writeln!(buf, "- {line}").ok();
                    }
                }
            }
            buf
        }
        H2hOutput::Stats(out) => {
            let mut buf = String::new();
            let header = color("[STATS]", "34", colorize);
            let name = out
                .entity
                .as_ref()
                .map(|e| e.name.clone())
                .unwrap_or_else(|| format!("#{}", out.id));
            writeln!(buf, "{} {} ({}, {})", header, name, out.kind, out.scope).ok();
            if let Some(entity) = &out.entity {
                if let Some(team) = &entity.team {
                    writeln!(buf, "Team: {team}").ok();
                }
                if let Some(nationality) = &entity.nationality {
                    writeln!(buf, "Nationality: {nationality}").ok();
                }
            }
            for (key, value) in out.stats.iter() {
                writeln!(buf, "- {:14} {}", key.label(), format_value(value)).ok();
            }
            buf
        }
        H2hOutput::Metrics(out) => {
            let mut buf = String::new();
            writeln!(buf, "{} Comparable metrics", color("[METRICS]", "34", colorize)).ok();
            for metric in &out.metrics {
                let polarity = match metric.polarity {
                    h2h_lib::Polarity::HigherIsBetter => "higher is better",
                    h2h_lib::Polarity::LowerIsBetter => "lower is better",
                };
                writeln!(buf, "- {:14} {:16} {}", metric.key.as_str(), metric.label, polarity)
                    .ok();
            }
            buf
        }
        H2hOutput::Error(out) => {
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

fn format_score(score: Option<f64>, colorize: bool) -> String {
    match score {
        Some(score) => color(&format!("{score:5.1}"), score_color_code(score), colorize),
        None => color("  n/a", "90", colorize),
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

fn score_color_code(score: f64) -> &'static str {
    if score >= 75.0 {
        "32" // green
    } else if score >= 50.0 {
        "33" // yellow
    } else {
        "31" // red
    }
}
