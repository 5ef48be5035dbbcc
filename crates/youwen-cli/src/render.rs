//! Console formatting of finished runs.
use std::time::Duration;

use youwen_stream::version::VersionCache;
use youwen_stream::{PipelineRun, StageStatus, StreamError, TokenUsage};

pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// One line per stage, in pipeline order.
pub fn stage_summary(run: &PipelineRun) -> Vec<String> {
    run.stages()
        .iter()
        .map(|state| {
            let label = state.stage.label();
            match state.status {
                StageStatus::Done => match state.duration.filter(|d| !d.is_zero()) {
                    Some(d) => format!("  ✔ {label} {}", format_duration(d)),
                    None => format!("  ✔ {label}"),
                },
                StageStatus::Skipped => format!("  - {label} skipped"),
                StageStatus::Failed => format!("  ✘ {label} failed"),
                StageStatus::NeedsConfirmation => format!("  ⚠ {label} needs confirmation"),
                StageStatus::Running => format!("  · {label} did not finish"),
                StageStatus::Pending => format!("  · {label} not run"),
            }
        })
        .collect()
}

pub fn token_stats(usage: &TokenUsage) -> String {
    format!(
        "--- token usage ---\ninput: {} | output: {} | total: {}",
        usage.input_tokens, usage.output_tokens, usage.total_tokens
    )
}

pub fn enhanced_block(text: &str) -> String {
    format!("<enhanced>\n{text}\n</enhanced>")
}

/// Machine-readable report for errors that aborted the command.
pub fn error_report(err: &anyhow::Error) -> String {
    let error_type = err
        .downcast_ref::<StreamError>()
        .map(StreamError::kind)
        .unwrap_or("Error");
    let report = serde_json::json!({
        "status": "error",
        "error_type": error_type,
        "message": format!("{err:#}"),
    });
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| err.to_string())
}

pub fn update_notice(skill_name: &str, cache: &VersionCache) -> Option<String> {
    let remote = cache.update_available()?;
    let mut notice = format!(
        "\n🔔 {skill_name} has a new version: {} → {remote}",
        cache.local_version
    );
    if let Some(url) = &cache.download_url {
        notice.push_str(&format!("\n   download: {url}"));
    }
    Some(notice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use youwen_stream::version::VersionInfo;
    use youwen_stream::{DecodedEvent, EventSink, PipelineMachine};

    fn run_of(events: &[(&str, serde_json::Value)]) -> PipelineRun {
        let mut machine = PipelineMachine::new();
        for (event, data) in events {
            machine.on_event(&DecodedEvent::new(*event, data.clone()));
        }
        machine.finish()
    }

    #[test]
    fn durations_switch_to_seconds() {
        assert_eq!(format_duration(Duration::from_millis(120)), "120ms");
        assert_eq!(format_duration(Duration::from_millis(1530)), "1.5s");
    }

    #[test]
    fn summary_covers_every_status() {
        let run = run_of(&[
            ("agent1_start", json!({})),
            ("agent1_complete", json!({"duration_ms": 120})),
            ("agent2_start", json!({})),
            ("agent2_needs_confirmation", json!({"clarified_question": "?", "alternatives": []})),
            ("agent3_complete", json!({"result": {"skipped": true}})),
            ("agent4_start", json!({})),
        ]);
        assert_eq!(
            stage_summary(&run),
            vec![
                "  ✔ context summarization 120ms",
                "  ⚠ intent analysis needs confirmation",
                "  - search skipped",
                "  · synthesis did not finish",
            ]
        );
    }

    #[test]
    fn failed_and_pending_stages() {
        let run = run_of(&[("agent1_start", json!({})), ("agent1_error", json!({"error": "x"}))]);
        let lines = stage_summary(&run);
        assert_eq!(lines[0], "  ✘ context summarization failed");
        assert_eq!(lines[3], "  · synthesis not run");
    }

    #[test]
    fn error_report_names_stream_error_kind() {
        let err = anyhow::Error::new(StreamError::Status {
            status: 403,
            body: "denied".into(),
        });
        let report: serde_json::Value =
            serde_json::from_str(&error_report(&err)).expect("json");
        assert_eq!(report["status"], "error");
        assert_eq!(report["error_type"], "StatusError");
        assert_eq!(report["message"], "HTTP 403: denied");

        let report: serde_json::Value =
            serde_json::from_str(&error_report(&anyhow::anyhow!("boom"))).expect("json");
        assert_eq!(report["error_type"], "Error");
    }

    #[test]
    fn notice_only_for_newer_versions() {
        let cache = VersionCache::new(
            "0.1.0",
            VersionInfo {
                version: Some("0.2.0".into()),
                download_url: Some("https://dl".into()),
            },
        );
        let notice = update_notice("yw-enhance", &cache).expect("notice");
        assert!(notice.contains("0.1.0 → 0.2.0"));
        assert!(notice.contains("https://dl"));

        let current = VersionCache::new("0.2.0", VersionInfo::default());
        assert!(update_notice("yw-enhance", &current).is_none());
    }

    #[test]
    fn enhanced_text_is_tagged() {
        assert_eq!(enhanced_block("hi"), "<enhanced>\nhi\n</enhanced>");
        assert!(token_stats(&TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
            total_tokens: 15
        })
        .contains("input: 10 | output: 5 | total: 15"));
    }
}
