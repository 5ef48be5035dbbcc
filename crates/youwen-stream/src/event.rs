//! Typed pipeline event vocabulary.
//!
//! Every label the backend is known to emit maps to one variant. Anything else is
//! kept verbatim in [`PipelineEvent::Unknown`] so newer servers keep working.

use std::fmt;

use serde_json::Value;

use crate::payload::DecodedEvent;

/// Fallback message for `error`/`forbidden` events without a description.
pub const DEFAULT_ERROR_MESSAGE: &str = "Pipeline failed";

/// The four pipeline stages, in execution order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Agent 1: conversation context summarization.
    Summary,
    /// Agent 2: intent analysis.
    Intent,
    /// Agent 3: multi-engine search.
    Search,
    /// Agent 4: synthesis of the enhanced prompt.
    Synthesis,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Summary, Stage::Intent, Stage::Search, Stage::Synthesis];

    /// One-based agent number used in event labels.
    pub fn number(self) -> u8 {
        match self {
            Stage::Summary => 1,
            Stage::Intent => 2,
            Stage::Search => 3,
            Stage::Synthesis => 4,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Stage::Summary),
            2 => Some(Stage::Intent),
            3 => Some(Stage::Search),
            4 => Some(Stage::Synthesis),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Summary => "context summarization",
            Stage::Intent => "intent analysis",
            Stage::Search => "search",
            Stage::Synthesis => "synthesis",
        }
    }

    pub(crate) fn index(self) -> usize {
        usize::from(self.number() - 1)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent{}", self.number())
    }
}

/// Token accounting reported by `pipeline_complete`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// Interpreted pipeline event.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    /// `agentN_start`
    StageStarted { stage: Stage },
    /// `agentN_complete`
    StageCompleted {
        stage: Stage,
        skipped: bool,
        duration_ms: Option<u64>,
    },
    /// `agentN_error`
    StageFailed {
        stage: Stage,
        message: Option<String>,
    },
    /// `agent2_needs_confirmation`
    NeedsConfirmation {
        clarified_question: String,
        alternatives: Vec<String>,
    },
    /// `agent4_reset`: discard the synthesis text streamed so far.
    SynthesisReset,
    /// `agent4_chunk`
    SynthesisChunk { chunk: String },
    /// `pipeline_complete`
    PipelineComplete { token_usage: Option<TokenUsage> },
    /// Pipeline-scope `error`.
    Error { message: String },
    /// Pipeline-scope `forbidden`.
    Forbidden { message: String },
    /// Any label outside the vocabulary above.
    Unknown { event: String, data: Value },
}

impl PipelineEvent {
    /// Interprets a decoded event. Never fails; payload fields are read leniently.
    pub fn from_decoded(decoded: &DecodedEvent) -> Self {
        let data = &decoded.data;
        match decoded.event.as_str() {
            "pipeline_complete" => PipelineEvent::PipelineComplete {
                token_usage: data
                    .get("token_usage")
                    .filter(|v| v.is_object())
                    .and_then(|v| serde_json::from_value(v.clone()).ok()),
            },
            "error" => PipelineEvent::Error {
                message: error_message(data),
            },
            "forbidden" => PipelineEvent::Forbidden {
                message: error_message(data),
            },
            label => match parse_stage_label(label) {
                Some((stage, action)) => stage_event(stage, action, data)
                    .unwrap_or_else(|| unknown(decoded)),
                None => unknown(decoded),
            },
        }
    }

    /// Stage this event belongs to, if it is stage-scoped.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineEvent::StageStarted { stage }
            | PipelineEvent::StageCompleted { stage, .. }
            | PipelineEvent::StageFailed { stage, .. } => Some(*stage),
            PipelineEvent::NeedsConfirmation { .. } => Some(Stage::Intent),
            PipelineEvent::SynthesisReset | PipelineEvent::SynthesisChunk { .. } => {
                Some(Stage::Synthesis)
            }
            PipelineEvent::PipelineComplete { .. }
            | PipelineEvent::Error { .. }
            | PipelineEvent::Forbidden { .. }
            | PipelineEvent::Unknown { .. } => None,
        }
    }
}

fn unknown(decoded: &DecodedEvent) -> PipelineEvent {
    PipelineEvent::Unknown {
        event: decoded.event.clone(),
        data: decoded.data.clone(),
    }
}

/// Splits `agentN_action` into its stage and action.
fn parse_stage_label(label: &str) -> Option<(Stage, &str)> {
    let rest = label.strip_prefix("agent")?;
    let (number, action) = rest.split_once('_')?;
    let number: u8 = number.parse().ok()?;
    Some((Stage::from_number(number)?, action))
}

fn stage_event(stage: Stage, action: &str, data: &Value) -> Option<PipelineEvent> {
    let event = match (stage, action) {
        (_, "start") => PipelineEvent::StageStarted { stage },
        (_, "complete") => PipelineEvent::StageCompleted {
            stage,
            skipped: data
                .get("result")
                .and_then(|r| r.get("skipped"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
            duration_ms: data.get("duration_ms").and_then(duration_ms),
        },
        (_, "error") => PipelineEvent::StageFailed {
            stage,
            message: str_field(data, "error").or_else(|| str_field(data, "message")),
        },
        (Stage::Intent, "needs_confirmation") => PipelineEvent::NeedsConfirmation {
            clarified_question: str_field(data, "clarified_question").unwrap_or_default(),
            alternatives: data
                .get("alternatives")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .map(|item| match item {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        },
        (Stage::Synthesis, "reset") => PipelineEvent::SynthesisReset,
        (Stage::Synthesis, "chunk") => PipelineEvent::SynthesisChunk {
            chunk: str_field(data, "chunk").unwrap_or_default(),
        },
        _ => return None,
    };
    Some(event)
}

fn duration_ms(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
}

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(ToOwned::to_owned)
}

fn error_message(data: &Value) -> String {
    str_field(data, "error")
        .or_else(|| str_field(data, "message"))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(event: &str, data: Value) -> PipelineEvent {
        PipelineEvent::from_decoded(&DecodedEvent::new(event, data))
    }

    #[test]
    fn maps_stage_lifecycle_labels() {
        assert_eq!(
            parse("agent3_start", json!({})),
            PipelineEvent::StageStarted {
                stage: Stage::Search
            }
        );
        assert_eq!(
            parse(
                "agent2_complete",
                json!({"result": {"skipped": true}, "duration_ms": 80})
            ),
            PipelineEvent::StageCompleted {
                stage: Stage::Intent,
                skipped: true,
                duration_ms: Some(80),
            }
        );
        assert_eq!(
            parse("agent1_error", json!({"error": "boom"})),
            PipelineEvent::StageFailed {
                stage: Stage::Summary,
                message: Some("boom".into()),
            }
        );
    }

    #[test]
    fn complete_without_payload_fields_uses_defaults() {
        assert_eq!(
            parse("agent4_complete", json!({"raw": "x"})),
            PipelineEvent::StageCompleted {
                stage: Stage::Synthesis,
                skipped: false,
                duration_ms: None,
            }
        );
    }

    #[test]
    fn fractional_duration_is_rounded() {
        let event = parse("agent1_complete", json!({"duration_ms": 12.6}));
        assert!(matches!(
            event,
            PipelineEvent::StageCompleted {
                duration_ms: Some(13),
                ..
            }
        ));
    }

    #[test]
    fn needs_confirmation_only_exists_for_intent_stage() {
        let event = parse(
            "agent2_needs_confirmation",
            json!({"clarified_question": "Which X?", "alternatives": ["A", "B"]}),
        );
        assert_eq!(
            event,
            PipelineEvent::NeedsConfirmation {
                clarified_question: "Which X?".into(),
                alternatives: vec!["A".into(), "B".into()],
            }
        );
        assert!(matches!(
            parse("agent3_needs_confirmation", json!({})),
            PipelineEvent::Unknown { .. }
        ));
    }

    #[test]
    fn reset_and_chunk_only_exist_for_synthesis_stage() {
        assert_eq!(parse("agent4_reset", json!({})), PipelineEvent::SynthesisReset);
        assert_eq!(
            parse("agent4_chunk", json!({"chunk": "Hi"})),
            PipelineEvent::SynthesisChunk { chunk: "Hi".into() }
        );
        assert!(matches!(
            parse("agent1_chunk", json!({"chunk": "Hi"})),
            PipelineEvent::Unknown { .. }
        ));
    }

    #[test]
    fn pipeline_complete_reads_token_usage() {
        let event = parse(
            "pipeline_complete",
            json!({"token_usage": {"input_tokens": 10, "output_tokens": 5, "total_tokens": 15, "cost": 0.1}}),
        );
        assert_eq!(
            event,
            PipelineEvent::PipelineComplete {
                token_usage: Some(TokenUsage {
                    input_tokens: 10,
                    output_tokens: 5,
                    total_tokens: 15,
                })
            }
        );
        assert_eq!(
            parse("pipeline_complete", json!({})),
            PipelineEvent::PipelineComplete { token_usage: None }
        );
    }

    #[test]
    fn error_message_falls_back() {
        assert_eq!(
            parse("error", json!({"error": "quota"})),
            PipelineEvent::Error {
                message: "quota".into()
            }
        );
        assert_eq!(
            parse("forbidden", json!({"raw": "nope"})),
            PipelineEvent::Forbidden {
                message: DEFAULT_ERROR_MESSAGE.into()
            }
        );
    }

    #[test]
    fn unknown_labels_keep_label_and_payload() {
        let event = parse("agent9_start", json!({"a": 1}));
        assert_eq!(
            event,
            PipelineEvent::Unknown {
                event: "agent9_start".into(),
                data: json!({"a": 1}),
            }
        );
        assert!(matches!(
            parse("message", json!({})),
            PipelineEvent::Unknown { .. }
        ));
        assert!(matches!(
            parse("agentx_start", json!({})),
            PipelineEvent::Unknown { .. }
        ));
    }

    #[test]
    fn stage_numbers_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_number(stage.number()), Some(stage));
        }
        assert_eq!(Stage::Synthesis.to_string(), "agent4");
    }
}
