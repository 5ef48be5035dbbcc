use once_cell::sync::Lazy;
use regex::Regex;

/// Pattern groups paired with the separators their captured lists use.
struct TriggerGroup {
    patterns: Vec<Regex>,
    separators: &'static [char],
    strip_quotes: bool,
}

impl TriggerGroup {
    fn new(patterns: &[&str], separators: &'static [char], strip_quotes: bool) -> Self {
        Self {
            patterns: patterns.iter().filter_map(|p| Regex::new(p).ok()).collect(),
            separators,
            strip_quotes,
        }
    }
}

static GROUPS: Lazy<Vec<TriggerGroup>> = Lazy::new(|| {
    vec![
        TriggerGroup::new(
            &[
                r"触发词[：:]\s*([^\n【]+)",
                r"(?:smart\s*模式)?额外触发[：:]\s*([^\n【]+)",
                r"自动触发[：:]\s*([^\n【]+)",
            ],
            &['、', ',', '，', '/'],
            false,
        ),
        TriggerGroup::new(
            &[
                r"(?i)Triggers?[：:]\s*([^\n.]+)",
                r"(?i)Smart\s+triggers?[：:]\s*([^\n.]+)",
            ],
            &[',', '，'],
            true,
        ),
        TriggerGroup::new(
            &[
                r"关键词[：:]\s*([^\n【]+)",
                r"(?i)Keywords?[：:]\s*([^\n.]+)",
                r"触发关键词[：:]\s*([^\n【]+)",
                r"激活词[：:]\s*([^\n【]+)",
                r"(?i)Activation\s+(?:words?|keywords?)[：:]\s*([^\n.]+)",
            ],
            &['、', ',', '，', '/'],
            true,
        ),
    ]
});

/// Extracts trigger keywords declared in a skill description.
///
/// Labels are matched in a fixed order (Chinese, English, keyword labels);
/// duplicates keep their first position.
pub fn extract_triggers(description: &str) -> Vec<String> {
    let mut triggers: Vec<String> = Vec::new();
    if description.trim().is_empty() {
        return triggers;
    }
    for group in GROUPS.iter() {
        for pattern in &group.patterns {
            for captures in pattern.captures_iter(description) {
                let Some(list) = captures.get(1) else {
                    continue;
                };
                for item in list.as_str().split(group.separators) {
                    let mut item = item.trim();
                    if group.strip_quotes {
                        item = item.trim_matches(|c| c == '"' || c == '\'');
                    }
                    if !item.is_empty() && !triggers.iter().any(|t| t == item) {
                        triggers.push(item.to_string());
                    }
                }
            }
        }
    }
    triggers
}
