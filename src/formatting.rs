use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use caliper_lib::types::{DeltaSeverity, HIGH_CONFIDENCE};
use caliper_lib::{CaliperError, CaliperOutput, ErrorOutput, CALIPER_OUTPUT_VERSION};

use crate::cli::OutputFormat;

/// Deltas and missed tokens listed in the human summary.
const PRETTY_LIST_LIMIT: usize = 10;

/// Write output in the requested format.
pub fn write_output(
    body: &CaliperOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the fatal exit code.
pub fn render_error(err: CaliperError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let error_payload = err.to_payload();
    let payload = CaliperOutput::Error(ErrorOutput {
        version: CALIPER_OUTPUT_VERSION.to_string(),
        message: error_payload.message.clone(),
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

fn write_json_output(
    body: &CaliperOutput,
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

fn write_pretty_output(body: &CaliperOutput, output: Option<&Path>) -> io::Result<()> {
    let use_human = output.is_none() && std::io::stdout().is_terminal();

    if use_human {
        let content = format_pretty(body, true);
        println!("{content}");
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content = serde_json::to_string_pretty(body)
        .unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &CaliperOutput, colorize: bool) -> String {
    match body {
        CaliperOutput::Reconcile(out) => {
            let mut buf = String::new();
            let summary = &out.report.summary;
            let clean = summary.deltas == 0
                && summary.missed_tokens == 0
                && summary.unmatched_expected == 0;
            let status = if clean { "CLEAN" } else { "DRIFT" };
            let status_colored = color(status, if clean { "32" } else { "33" }, colorize);
            writeln!(buf, "{} Token reconciliation", status_colored).ok();
            writeln!(
                buf,
                "Input: {} vs {}{}",
                out.input.rendered.display(),
                out.input.markup.display(),
                if out.input.binary { " (binary)" } else { "" }
            )
            .ok();
            writeln!(
                buf,
                "Pairs: {} ({} at confidence >= {})",
                summary.total_pairs, summary.high_confidence_pairs, HIGH_CONFIDENCE
            )
            .ok();
            writeln!(
                buf,
                "Unmatched: {} expected, {} rendered",
                summary.unmatched_expected, summary.unmatched_rendered
            )
            .ok();

            if !out.report.deltas.is_empty() {
                writeln!(buf, "Deltas ({}):", summary.deltas).ok();
                for delta in out.report.deltas.iter().take(PRETTY_LIST_LIMIT) {
                    let severity = format!("{:?}", delta.severity).to_ascii_lowercase();
                    let severity = color(&severity, severity_code(delta.severity), colorize);
                    let token = delta
                        .token_name
                        .as_deref()
                        .map(|t| format!(" [{t}]"))
                        .unwrap_or_default();
                    writeln!(
                        buf,
                        "- {:8} {} {}: {} -> {}{}",
                        severity,
                        delta.rendered_id,
                        delta.property,
                        delta.figma_value,
                        delta.caliper_value,
                        token
                    )
                    .ok();
                }
            }

            if !out.report.missed_tokens.is_empty() {
                writeln!(buf, "Missed tokens ({}):", summary.missed_tokens).ok();
                for missed in out.report.missed_tokens.iter().take(PRETTY_LIST_LIMIT) {
                    writeln!(
                        buf,
                        "- {} ({}) on {} {}: expected {}, got {}",
                        missed.token_name,
                        missed.category,
                        missed.selector,
                        missed.property,
                        missed.expected_value,
                        missed.actual_value
                    )
                    .ok();
                }
            }
            buf
        }
        CaliperOutput::Encode(out) => {
            let mut buf = String::new();
            let header = color("[ENCODE]", "36", colorize);
            writeln!(
                buf,
                "{} {} -> {} ({} nodes, {} bytes)",
                header,
                out.input.display(),
                out.output.display(),
                out.nodes,
                out.bytes
            )
            .ok();
            buf
        }
        CaliperOutput::Decode(out) => {
            let mut buf = String::new();
            let header = color("[DECODE]", "36", colorize);
            writeln!(buf, "{} {} ({} nodes)", header, out.input.display(), out.nodes).ok();
            if let Some(path) = &out.output {
                writeln!(buf, "Written to {}", path.display()).ok();
            }
            buf
        }
        CaliperOutput::Resolve(out) => {
            let mut buf = String::new();
            let header = color("[RESOLVE]", "34", colorize);
            writeln!(buf, "{} {} = {}px", header, out.expression, out.pixels).ok();
            if let Some(token) = &out.token_name {
                writeln!(buf, "Token: {token}").ok();
            }
            buf
        }
        CaliperOutput::Error(out) => {
            let mut buf = String::new();
            let header = color("[ERROR]", "31", colorize);
            writeln!(buf, "{} {}", header, out.message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
            buf
        }
    }
}

fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

fn severity_code(severity: DeltaSeverity) -> &'static str {
    match severity {
        DeltaSeverity::Minor => "33",
        DeltaSeverity::Moderate => "35",
        DeltaSeverity::Major => "31",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caliper_lib::error::{ErrorCategory, ErrorPayload};
    use caliper_lib::types::{
        MissedToken, NodePair, PropertyDelta, ReconciliationReport, SignalSet, TokenCategory,
    };
    use caliper_lib::{ContextMetrics, InputDescriptor, ReconcileOutput, ResolveOutput};

    #[test]
    fn render_error_always_returns_fatal_exit_code() {
        let code = render_error(
            CaliperError::Config("boom".to_string()),
            OutputFormat::Json,
            None,
        );
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn format_pretty_lists_deltas_and_missed_tokens() {
        let report = ReconciliationReport::new(
            vec![NodePair {
                rendered_id: "n1".into(),
                expected_index: 0,
                confidence: 85,
                depth: 0,
                match_signals: SignalSet::new(),
            }],
            vec![],
            vec![],
            vec![PropertyDelta {
                rendered_id: "n1".into(),
                expected_index: 0,
                property: "paddingTop".into(),
                figma_value: "16px".into(),
                caliper_value: "12px".into(),
                severity: DeltaSeverity::Minor,
                token_name: Some("space-md".into()),
            }],
            vec![MissedToken {
                token_name: "space-md".into(),
                category: TokenCategory::Spacing,
                expected_value: "16px".into(),
                actual_value: "12px".into(),
                property: "paddingTop".into(),
                selector: "div.card".into(),
            }],
        );
        let output = CaliperOutput::Reconcile(ReconcileOutput {
            version: CALIPER_OUTPUT_VERSION.to_string(),
            input: InputDescriptor {
                rendered: PathBuf::from("tree.bin"),
                markup: PathBuf::from("design.html"),
                tokens: None,
                binary: true,
            },
            metrics: ContextMetrics::default(),
            report,
        });

        let pretty = format_pretty(&output, false);
        assert!(pretty.contains("DRIFT Token reconciliation"));
        assert!(pretty.contains("tree.bin vs design.html (binary)"));
        assert!(pretty.contains("Pairs: 1 (1 at confidence >= 70)"));
        assert!(pretty.contains("paddingTop: 16px -> 12px [space-md]"));
        assert!(pretty.contains("space-md (spacing) on div.card"));
    }

    #[test]
    fn format_pretty_reports_clean_runs() {
        let output = CaliperOutput::Reconcile(ReconcileOutput {
            version: CALIPER_OUTPUT_VERSION.to_string(),
            input: InputDescriptor {
                rendered: PathBuf::from("tree.json"),
                markup: PathBuf::from("design.html"),
                tokens: None,
                binary: false,
            },
            metrics: ContextMetrics::default(),
            report: ReconciliationReport::new(vec![], vec![], vec![], vec![], vec![]),
        });

        let pretty = format_pretty(&output, false);
        assert!(pretty.contains("CLEAN"));
        assert!(!pretty.contains("Deltas"));
    }

    #[test]
    fn format_pretty_shows_resolved_pixels() {
        let output = CaliperOutput::Resolve(ResolveOutput {
            version: CALIPER_OUTPUT_VERSION.to_string(),
            expression: "2rem".into(),
            pixels: 32.0,
            token_name: None,
        });
        assert!(format_pretty(&output, false).contains("[RESOLVE] 2rem = 32px"));
    }

    #[test]
    fn format_pretty_handles_errors() {
        let output = CaliperOutput::Error(ErrorOutput {
            version: CALIPER_OUTPUT_VERSION.to_string(),
            message: "bad input".to_string(),
            error: ErrorPayload {
                category: ErrorCategory::Config,
                message: "bad input".to_string(),
                remediation: Some("check flags".to_string()),
            },
        });

        let pretty = format_pretty(&output, false);
        assert!(pretty.contains("[ERROR] bad input"));
        assert!(pretty.contains("Hint: check flags"));
    }
}
