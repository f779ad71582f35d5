//! Output formatting for CLI

use crate::convert::{BlockOutcome, ConversionReport, DdlBlock};
use crate::llm::estimate_tokens;

/// Format a conversion report for stderr
pub fn format_summary(report: &ConversionReport) -> String {
    let mut output = String::new();
    let failures = report.failures();

    output.push_str("\nConversion Summary\n");
    output.push_str("==================\n");
    output.push_str(&format!("Run ID:   {}\n", report.run_id));
    output.push_str(&format!(
        "Started:  {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("Model:    {}\n", report.model));
    output.push_str(&format!(
        "Blocks:   {} total, {} converted, {} failed\n",
        report.blocks.len(),
        report.succeeded(),
        failures.len()
    ));

    let reused = report.blocks.iter().filter(|b| b.reused).count();
    if reused > 0 {
        output.push_str(&format!("Reused:   {reused} identical block(s)\n"));
    }
    output.push_str(&format!("Duration: {}ms\n", report.duration_ms));

    if !failures.is_empty() {
        output.push_str("\n⚠️  Skipped Blocks:\n");
        for failure in &failures {
            output.push_str(&format!("  - {failure}\n"));
        }
    }

    if report.is_degraded() {
        output.push_str(&format!(
            "\n⚠️  Converted with {} failed block(s); review the output before use.\n",
            failures.len()
        ));
    } else {
        output.push_str("\n✅ All blocks converted!\n");
    }

    output
}

/// Per-block detail lines
pub fn format_block_details(report: &ConversionReport) -> String {
    let mut output = String::new();
    for block in &report.blocks {
        let status = match &block.outcome {
            BlockOutcome::Succeeded { .. } if block.reused => "reused".to_string(),
            BlockOutcome::Succeeded { .. } => "converted".to_string(),
            BlockOutcome::Failed { reason } => format!("failed ({reason})"),
        };
        output.push_str(&format!(
            "  Block {}: {} [{} attempt(s), {}ms, {}]\n",
            block.number(),
            status,
            block.attempts,
            block.duration_ms,
            short_hash(&block.content_hash)
        ));
    }
    output
}

/// Format a dry-run preview
pub fn format_preview(preview: &[(DdlBlock, String)], show_prompts: bool) -> String {
    let mut output = format!("\nFound {} block(s):\n", preview.len());
    for (block, prompt) in preview {
        let first_line = block.content.lines().next().unwrap_or_default();
        output.push_str(&format!(
            "\nBlock {} [{}]: {}\n",
            block.number(),
            short_hash(&block.content_hash),
            first_line
        ));
        output.push_str(&format!(
            "  Lines: {}, prompt tokens (est.): {}\n",
            block.content.lines().count(),
            estimate_tokens(prompt)
        ));
        if show_prompts {
            output.push_str("  Prompt:\n");
            for line in prompt.lines() {
                output.push_str(&format!("    {line}\n"));
            }
        }
    }
    output.push_str("\nDry run: no model calls were made.\n");
    output
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
