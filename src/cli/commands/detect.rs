//! Detect command.

use console::style;

use crate::config::Settings;
use crate::models::{Confidence, DetectionResult};
use crate::pipeline::Detector;

/// Probe each URL and print the results.
pub async fn cmd_detect(
    settings: Settings,
    urls: &[String],
    json: bool,
    concurrency: Option<usize>,
    verbose: bool,
) -> anyhow::Result<()> {
    let concurrency = concurrency.unwrap_or(settings.server.batch_concurrency);
    let chunk = settings.server.max_batch;
    let detector = Detector::new(settings)?;

    if !json {
        println!(
            "{} Probing {} page(s) for {} links{}",
            style("→").cyan(),
            urls.len(),
            style(detector.settings().signature.domain()).bold(),
            if detector.has_browser() {
                ""
            } else {
                " (HTTP only)"
            }
        );
    }

    let mut results = Vec::with_capacity(urls.len());
    for batch in urls.chunks(chunk) {
        results.extend(detector.detect_batch(batch, concurrency).await?);
    }

    if json {
        let output = if results.len() == 1 {
            serde_json::to_string_pretty(&results[0])?
        } else {
            serde_json::to_string_pretty(&results)?
        };
        println!("{}", output);
        return Ok(());
    }

    for result in &results {
        print_result(result, verbose);
    }

    let matched = results.iter().filter(|r| r.matched).count();
    println!();
    println!(
        "{} {} of {} matched",
        style("Summary:").bold(),
        style(matched).green(),
        results.len()
    );
    Ok(())
}

fn print_result(result: &DetectionResult, verbose: bool) {
    println!();
    if result.matched {
        let confidence = match result.confidence {
            Some(Confidence::Low) => style("low confidence").yellow(),
            _ => style("high confidence").green(),
        };
        println!(
            "  {} {} via {} ({})",
            style("✓").green(),
            style(&result.target).bold(),
            result.method.as_deref().unwrap_or("unknown"),
            confidence
        );
        for url in &result.evidence_urls {
            println!("      {}", style(url).cyan());
        }
    } else {
        println!(
            "  {} {} no match (reached {})",
            style("✗").red(),
            style(&result.target).bold(),
            result.phase_reached
        );
    }

    if result.age_gate_detected {
        println!("      {}", style("age gate detected").yellow());
    }
    if result.budget_exhausted {
        println!("      {}", style("time budget exhausted").yellow());
    }
    for error in &result.errors {
        println!("      {} {}", style("!").red(), style(error).dim());
    }
    if verbose {
        for note in &result.diagnostics {
            println!("      {}", style(note).dim());
        }
    }
    println!("      {} ms", style(result.elapsed_ms).dim());
}
