//! Terminal rendering for run reports and tool listings.
//!
//! [`Renderer`] decouples the report from where it is written;
//! [`TermRenderer`] writes colored text to any [`Write`] sink (stdout in
//! the CLI, a buffer in tests).

use colored::Colorize;
use std::io::{self, Write};

use crate::coordinator::{RunOutcome, RunReport, RunStatus};
use crate::tools::ToolDefinition;
use crate::transcript::ToolResult;

pub trait Renderer {
    /// Called once before the run starts.
    fn render_header(&mut self, intent: &str, planner: &str);

    /// Called with the finished report.
    fn render_report(&mut self, report: &RunReport);
}

pub struct TermRenderer<W: Write> {
    out: W,
    /// Also print every transcript entry.
    verbose: bool,
}

impl TermRenderer<io::Stdout> {
    pub fn stdout(verbose: bool) -> Self {
        Self::new(io::stdout(), verbose)
    }
}

impl<W: Write> TermRenderer<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self { out, verbose }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_report(&mut self, report: &RunReport) -> io::Result<()> {
        let out = &mut self.out;
        writeln!(out)?;

        if self.verbose {
            for (n, entry) in report.transcript.entries().iter().enumerate() {
                let marker = match entry.result {
                    ToolResult::Success { .. } => "ok".green(),
                    ToolResult::Failure { .. } => "err".red(),
                    ToolResult::Skipped { .. } => "skip".yellow(),
                };
                writeln!(
                    out,
                    "{} [{}] {} {}",
                    format!("{:>2}.", n + 1).dimmed(),
                    marker,
                    entry.call.name.bold(),
                    entry.call.arguments.to_string().dimmed()
                )?;
                let rendered = entry.result.render();
                let first_line = rendered.lines().next().unwrap_or_default();
                writeln!(out, "    {}", first_line)?;
            }
            writeln!(out)?;
        }

        match report.status() {
            RunStatus::Completed => {
                writeln!(out, "{} all 4 images generated", "done".green().bold())?;
            }
            RunStatus::Partial { completed, failed } => {
                writeln!(
                    out,
                    "{} {}/4 images generated, {} failed",
                    "partial".yellow().bold(),
                    completed,
                    failed
                )?;
            }
            RunStatus::NoImages => {
                writeln!(out, "{} no images generated", "failed".red().bold())?;
            }
        }

        if let RunOutcome::Failed {
            reason, failures, ..
        } = &report.outcome
        {
            writeln!(out, "  {} {}", "reason:".bold(), reason)?;
            for (index, err) in failures {
                writeln!(out, "  {} {}", format!("image {index}:").red(), err)?;
            }
        }

        for (index, locator) in &report.saved {
            writeln!(out, "  {} {}", format!("image {index} ->").green(), locator)?;
        }
        for (index, err) in &report.storage_errors {
            writeln!(
                out,
                "  {} {}",
                format!("image {index} not saved:").red(),
                err
            )?;
        }

        writeln!(out)?;
        writeln!(
            out,
            "{}",
            format!(
                "[run {} | started {} | {} iterations | {:.1}s]",
                report.run_id,
                report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
                report.iterations_used,
                report.elapsed.as_secs_f64()
            )
            .dimmed()
        )?;
        Ok(())
    }
}

impl<W: Write> Renderer for TermRenderer<W> {
    fn render_header(&mut self, intent: &str, planner: &str) {
        writeln!(
            self.out,
            "{} [planner: {}]",
            "ugc".bold().cyan(),
            planner.yellow()
        )
        .ok();
        writeln!(self.out, "{} {}", ">".green().bold(), intent).ok();
    }

    fn render_report(&mut self, report: &RunReport) {
        if let Err(e) = self.write_report(report) {
            eprintln!("{} {}", "error:".red().bold(), e);
        }
        self.out.flush().ok();
    }
}

/// Prints tool definitions as the decision function sees them.
pub fn print_tool_definitions(definitions: &[ToolDefinition]) -> anyhow::Result<()> {
    for def in definitions {
        println!("{}", def.name.bold().cyan());
        println!("  {}", def.description);
        let schema = serde_json::to_string_pretty(&def.parameters)?;
        for line in schema.lines() {
            println!("  {}", line.dimmed());
        }
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::RunReport;
    use crate::error::FailureReason;
    use crate::image::{GeneratedImage, ImageFormat, SynthesizedImage};
    use crate::transcript::Transcript;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn image(index: u8) -> GeneratedImage {
        GeneratedImage::new(
            index,
            SynthesizedImage {
                format: ImageFormat::Png,
                bytes: vec![1, 2, 3],
            },
        )
    }

    fn report(outcome: RunOutcome) -> RunReport {
        RunReport {
            run_id: uuid::Uuid::new_v4(),
            started_at: chrono::Utc::now(),
            elapsed: Duration::from_millis(1500),
            outcome,
            saved: BTreeMap::from([(1, "out/generated_ugc_image_1.png".to_string())]),
            storage_errors: BTreeMap::new(),
            iterations_used: 5,
            transcript: Transcript::new("beach"),
        }
    }

    fn render(report: &RunReport) -> String {
        let mut renderer = TermRenderer::new(Vec::new(), false);
        renderer.render_report(report);
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn test_partial_report_lists_failures() {
        let text = render(&report(RunOutcome::Failed {
            reason: FailureReason::PartialSynthesisFailure,
            partial: vec![image(1), image(2), image(4)],
            failures: BTreeMap::from([(3, "request timed out after 240s".to_string())]),
        }));
        assert!(text.contains("3/4 images generated, 1 failed"));
        assert!(text.contains("image synthesis failed for at least one variant"));
        assert!(text.contains("request timed out after 240s"));
        assert!(text.contains("generated_ugc_image_1.png"));
        assert!(text.contains("5 iterations"));
    }

    #[test]
    fn test_completed_report() {
        let text = render(&report(RunOutcome::Completed {
            images: (1..=4).map(image).collect(),
        }));
        assert!(text.contains("all 4 images generated"));
        assert!(!text.contains("reason:"));
    }

    #[test]
    fn test_footer_shows_start_time() {
        use chrono::TimeZone;
        let mut report = report(RunOutcome::Completed {
            images: (1..=4).map(image).collect(),
        });
        report.started_at = chrono::Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        let text = render(&report);
        assert!(text.contains("started 2026-10-19 08:30:00 UTC"));
        assert!(text.contains(&report.run_id.to_string()));
    }
}
