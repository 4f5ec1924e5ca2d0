//! Markdown log reader.
//!
//! Parsing is lenient: anything it does not recognize is ignored, so a
//! truncated or hand-edited log still yields whatever fields it can.

use std::path::Path;

use super::record::{LogMetadata, LogStep};

const STEP_HEADER: &str = "## Step ";
const OUTPUT_FENCE: &str = "> ```";

/// Read and parse a log file.
pub fn read_log(path: &Path) -> std::io::Result<(LogMetadata, Vec<LogStep>)> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_log(&content))
}

/// Parse log text into its header and steps.
pub fn parse_log(content: &str) -> (LogMetadata, Vec<LogStep>) {
    let lines: Vec<&str> = content.lines().collect();
    (parse_metadata(&lines), parse_steps(&lines))
}

/// Split `> **Key:** value` into key and trimmed value.
fn meta_field(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix("> **")?;
    let (key, value) = rest.split_once(":**")?;
    Some((key, value.trim()))
}

fn set_once(field: &mut String, value: &str) {
    if field.is_empty() {
        *field = value.to_string();
    }
}

fn parse_metadata(lines: &[&str]) -> LogMetadata {
    let mut meta = LogMetadata::default();

    for line in lines.iter().take_while(|l| !l.starts_with(STEP_HEADER)) {
        if let Some(title) = line.strip_prefix("# ") {
            set_once(&mut meta.title, title.trim());
            continue;
        }

        let Some((key, value)) = meta_field(line) else {
            continue;
        };
        let field = match key {
            "SOP Run ID" => &mut meta.run_id,
            "Original SOP" => &mut meta.sop_path,
            "Executed by" => &mut meta.executed_by,
            "Started at" => &mut meta.started_at,
            "Ended at" => &mut meta.ended_at,
            "Status" => &mut meta.status,
            _ => continue,
        };
        set_once(field, value);
    }

    meta
}

/// Where the scanner is within a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Body,
    Command,
    /// Saw `**Output:**`, waiting for the opening fence
    OutputMarker,
    Output,
}

#[derive(Default)]
struct StepBuilder {
    step: LogStep,
    command: Vec<String>,
    has_command: bool,
    output: Vec<String>,
}

impl StepBuilder {
    fn new(header: &str) -> Self {
        let header = header.trim_start_matches("## ");
        let (number, title) = header.split_once(": ").unwrap_or((header, ""));
        let step_id = number.trim_start_matches("Step ").trim().parse().unwrap_or(0);

        Self {
            step: LogStep { step_id, title: title.trim_end().to_string(), ..LogStep::default() },
            ..Self::default()
        }
    }

    fn flush_output(&mut self) {
        if !self.output.is_empty() {
            self.step.output = self.output.join("\n");
            self.output.clear();
        }
    }

    fn finish(mut self) -> LogStep {
        self.flush_output();
        self.step.command = self.command.join("\n");
        self.step
    }
}

fn parse_steps(lines: &[&str]) -> Vec<LogStep> {
    let mut steps = Vec::new();
    let mut current: Option<StepBuilder> = None;
    let mut region = Region::Body;

    for line in lines {
        if line.starts_with(STEP_HEADER) {
            if let Some(done) = current.take() {
                steps.push(done.finish());
            }
            current = Some(StepBuilder::new(line));
            region = Region::Body;
            continue;
        }

        let Some(builder) = current.as_mut() else {
            continue;
        };

        match region {
            Region::Command => {
                if line.starts_with("```") {
                    builder.has_command = true;
                    region = Region::Body;
                } else {
                    builder.command.push((*line).to_string());
                }
            }
            Region::Output => {
                if line.starts_with(OUTPUT_FENCE) {
                    builder.flush_output();
                    region = Region::Body;
                } else if let Some(text) = line.strip_prefix("> ") {
                    builder.output.push(text.to_string());
                } else if *line == ">" {
                    builder.output.push(String::new());
                } else if !line.trim().is_empty() {
                    builder.output.push((*line).to_string());
                }
            }
            Region::Body | Region::OutputMarker => {
                if region == Region::OutputMarker && line.starts_with(OUTPUT_FENCE) {
                    builder.output.clear();
                    region = Region::Output;
                } else if line.starts_with("```") && !builder.has_command {
                    builder.command.clear();
                    region = Region::Command;
                } else if let Some((key, value)) = meta_field(line) {
                    match key {
                        "Executed" => set_once(&mut builder.step.executed_at, value),
                        "Result" => set_once(&mut builder.step.result_status, value),
                        "Output" => region = Region::OutputMarker,
                        _ => {}
                    }
                }
            }
        }
    }

    if let Some(done) = current {
        steps.push(done.finish());
    }

    steps
}
