//! Request body for the enhancement endpoint.

use crate::errors::StreamError;

/// Path of the streaming enhancement endpoint.
pub const ENHANCE_ENDPOINT: &str = "/api/skill/enhance";

/// Search engines enabled by default, in priority order.
pub const DEFAULT_SEARCH_ENGINES: [&str; 5] = ["grok", "perplexity", "exa", "context7", "deepwiki"];

/// Maximum characters of a skill description sent to the server.
pub const SKILL_DESCRIPTION_LIMIT: usize = 300;

/// Per-request pipeline switches.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AgentConfig {
    pub enable_summary: bool,
    pub enable_intent_analysis: bool,
    pub enable_search: bool,
    pub search_engines: Vec<String>,
    pub auto_confirm_intent: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enable_summary: true,
            enable_intent_analysis: true,
            enable_search: true,
            search_engines: DEFAULT_SEARCH_ENGINES.iter().map(|s| s.to_string()).collect(),
            auto_confirm_intent: true,
        }
    }
}

/// Installed skill advertised to the server so it can recommend one.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SkillDescriptor {
    pub name: String,
    pub description: String,
    pub triggers: Vec<String>,
    #[serde(rename = "quickStart")]
    pub quick_start: Option<String>,
}

impl SkillDescriptor {
    /// Builds a descriptor, truncating the description to [`SKILL_DESCRIPTION_LIMIT`] chars.
    pub fn new(
        name: impl Into<String>,
        description: &str,
        triggers: Vec<String>,
        quick_start: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.chars().take(SKILL_DESCRIPTION_LIMIT).collect(),
            triggers,
            quick_start,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EnhanceRequest {
    pub prompt: String,
    pub conversation_history: String,
    pub context_files: Vec<String>,
    pub agent_config: AgentConfig,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub confirmed_intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mgrep_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub installed_skills: Option<Vec<SkillDescriptor>>,
}

impl EnhanceRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            conversation_history: String::new(),
            context_files: Vec::new(),
            agent_config: AgentConfig::default(),
            confirmed_intent: None,
            mgrep_api_key: None,
            installed_skills: None,
        }
    }

    pub fn history(mut self, history: impl Into<String>) -> Self {
        self.conversation_history = history.into();
        self
    }

    pub fn enable_search(mut self, enabled: bool) -> Self {
        self.agent_config.enable_search = enabled;
        self
    }

    pub fn auto_confirm_intent(mut self, enabled: bool) -> Self {
        self.agent_config.auto_confirm_intent = enabled;
        self
    }

    /// Intent picked by the user after a `needs_confirmation` outcome.
    pub fn confirmed_intent(mut self, intent: impl Into<String>) -> Self {
        self.confirmed_intent = Some(intent.into()).filter(|s: &String| !s.trim().is_empty());
        self
    }

    pub fn mgrep_api_key(mut self, key: impl Into<String>) -> Self {
        self.mgrep_api_key = Some(key.into()).filter(|s: &String| !s.trim().is_empty());
        self
    }

    /// Attaches installed skills. An empty list leaves the field unset.
    pub fn installed_skills(mut self, skills: Vec<SkillDescriptor>) -> Self {
        self.installed_skills = Some(skills).filter(|s| !s.is_empty());
        self
    }

    /// Rejects requests with neither a prompt nor history.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.prompt.trim().is_empty() && self.conversation_history.trim().is_empty() {
            return Err(StreamError::Validation(
                "a prompt or conversation history is required".into(),
            ));
        }
        Ok(())
    }
}
