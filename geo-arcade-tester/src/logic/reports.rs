use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use geo_arcade_game::ScoreKey;

use super::ScenarioResult;

fn success_rate(results: &[ScenarioResult]) -> f64 {
    let passed = results.iter().filter(|r| r.passed).count();
    let (Ok(passed), Ok(total)) = (u32::try_from(passed), u32::try_from(results.len())) else {
        return 0.0;
    };
    if total == 0 {
        return 0.0;
    }
    f64::from(passed) / f64::from(total) * 100.0
}

pub fn generate_console_report<W: Write>(
    out: &mut W,
    results: &[ScenarioResult],
    high_scores: &[(ScoreKey, u32)],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Logic Test Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    // Overall stats
    writeln!(out, "Total scenarios: {total_tests}")?;
    writeln!(out, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(out, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    // Individual results
    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(out, "{} {}", status, result.scenario_name.bold())?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Best score: {}", result.best_score)?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    // High scores
    writeln!(out, "{}", "🏆 High Scores".bright_yellow().bold())?;
    writeln!(out, "{}", "==============".yellow())?;
    if high_scores.is_empty() {
        writeln!(out, "No high scores recorded.")?;
    }
    for (key, score) in high_scores {
        writeln!(out, "{:<22} {}", key.to_string(), score.to_string().green())?;
    }
    Ok(())
}

pub fn generate_json_report<W: Write>(
    out: &mut W,
    results: &[ScenarioResult],
    high_scores: &[(ScoreKey, u32)],
) -> Result<()> {
    let scores: serde_json::Map<String, serde_json::Value> = high_scores
        .iter()
        .map(|(key, score)| (key.to_string(), serde_json::Value::from(*score)))
        .collect();
    let report = serde_json::json!({
        "results": results,
        "high_scores": scores,
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}

pub fn generate_markdown_report<W: Write>(
    out: &mut W,
    results: &[ScenarioResult],
    high_scores: &[(ScoreKey, u32)],
) -> Result<()> {
    writeln!(out, "# Geo Arcade Logic Test Results\n")?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenarios**: {total_tests}")?;
    writeln!(out, "- **Passed**: {passed_tests}")?;
    writeln!(out, "- **Failed**: {failed_tests}")?;
    writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(out, "## Detailed Results\n")?;

    for result in results {
        let status = if result.passed { "✅" } else { "❌" };

        writeln!(out, "### {} {}\n", status, result.scenario_name)?;
        writeln!(
            out,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "- **Best score**: {}", result.best_score)?;
        writeln!(out, "- **Average time**: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }

    if !high_scores.is_empty() {
        writeln!(out, "## High Scores\n")?;
        writeln!(out, "| Key | Best |")?;
        writeln!(out, "| --- | ---: |")?;
        for (key, score) in high_scores {
            writeln!(out, "| {key} | {score} |")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_arcade_game::{Metric, Region};

    fn result(name: &str, passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: name.to_string(),
            passed,
            iterations_run: 2,
            successful_iterations: if passed { 2 } else { 1 },
            failures: if passed {
                Vec::new()
            } else {
                vec!["score 3 does not match streak 2".to_string()]
            },
            best_score: 3,
            average_duration: Duration::from_micros(40),
            performance_data: vec![Duration::from_micros(40)],
        }
    }

    fn scores() -> Vec<(ScoreKey, u32)> {
        vec![(ScoreKey::new(Region::Europe, Metric::Area), 12)]
    }

    #[test]
    fn success_rate_handles_empty_and_mixed() {
        assert!(success_rate(&[]).abs() < f64::EPSILON);
        let rate = success_rate(&[result("a", true), result("b", false)]);
        assert!((rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn markdown_lists_failures_and_scores() {
        let mut buf = Vec::new();
        generate_markdown_report(&mut buf, &[result("oracle", false)], &scores()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("# Geo Arcade Logic Test Results"));
        assert!(text.contains("  - score 3 does not match streak 2"));
        assert!(text.contains("| Europe:area | 12 |"));
    }

    #[test]
    fn json_report_nests_results_and_scores() {
        let mut buf = Vec::new();
        generate_json_report(&mut buf, &[result("idle", true)], &scores()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["results"][0]["scenario_name"], "idle");
        assert_eq!(value["high_scores"]["Europe:area"], 12);
    }

    #[test]
    fn console_report_mentions_each_scenario() {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        generate_console_report(
            &mut buf,
            &[result("quitter", true)],
            &[],
            Duration::from_millis(5),
        )
        .unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("✅ PASS quitter"));
        assert!(text.contains("No high scores recorded."));
    }
}
