//! Command-line definitions.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use youwen_stream::{EnhanceRequest, Settings};

#[derive(Debug, Parser)]
#[command(name = "youwen")]
#[command(about = "Multi-agent prompt enhancement (summary → intent → search → synthesis)")]
#[command(version)]
pub struct Cli {
    /// Dotenv file read after the process environment
    #[arg(long, global = true, default_value = ".env")]
    pub env_file: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Enhance a prompt through the remote pipeline
    #[command(long_about = "Enhance a prompt through the remote multi-agent pipeline.

Stage progress is reported on stderr. The enhanced prompt is written to stdout
wrapped in <enhanced> tags.

ENVIRONMENT:
    YOUWEN_API_URL          Backend address
    YOUWEN_TOKEN            Redeem code sent as a bearer token
    YOUWEN_ENHANCE_MODE     agent (default) or disabled
    YOUWEN_ENABLE_SEARCH    true (default) or false
    YOUWEN_MGREP_API_KEY    Mixedbread API key for semantic retrieval")]
    Enhance(EnhanceArgs),
}

#[derive(Debug, Args)]
pub struct EnhanceArgs {
    /// Prompt text; multiple words are joined with spaces
    pub prompt: Vec<String>,

    /// Conversation history used as context
    #[arg(long)]
    pub history: Option<String>,

    /// Confirm the analysed intent automatically (default)
    #[arg(long, conflicts_with = "ask_intent")]
    pub auto_confirm: bool,

    /// Stop and ask when the intent is ambiguous
    #[arg(long)]
    pub ask_intent: bool,

    /// Disable the search stage
    #[arg(long)]
    pub no_search: bool,

    /// Intent chosen after an ambiguity prompt
    #[arg(long)]
    pub confirmed_intent: Option<String>,

    /// Print every raw event as JSON instead of the summary
    #[arg(long)]
    pub json: bool,

    /// Redeem code, overrides YOUWEN_TOKEN
    #[arg(long)]
    pub token: Option<String>,

    /// Mixedbread API key, overrides YOUWEN_MGREP_API_KEY
    #[arg(long)]
    pub mgrep_key: Option<String>,

    /// Extra skill directory to advertise (repeatable)
    #[arg(long = "skills-dir")]
    pub skills_dirs: Vec<PathBuf>,

    /// Advertise skills found in the default directories
    #[arg(long)]
    pub auto_skills: bool,

    /// Run even when YOUWEN_ENHANCE_MODE=disabled
    #[arg(long)]
    pub force: bool,
}

impl EnhanceArgs {
    pub fn prompt_text(&self) -> String {
        self.prompt.join(" ")
    }

    pub fn has_input(&self) -> bool {
        !self.prompt_text().trim().is_empty()
            || self.history.as_deref().is_some_and(|h| !h.trim().is_empty())
    }

    pub fn wants_skills(&self) -> bool {
        self.auto_skills || !self.skills_dirs.is_empty()
    }

    /// Token from the command line, else from settings.
    pub fn token(&self, settings: &Settings) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| settings.token.clone())
    }

    /// Request body without installed skills.
    pub fn to_request(&self, settings: &Settings) -> EnhanceRequest {
        let mut request = EnhanceRequest::new(self.prompt_text())
            .enable_search(settings.enable_search && !self.no_search)
            .auto_confirm_intent(!self.ask_intent);
        if let Some(history) = &self.history {
            request = request.history(history.clone());
        }
        if let Some(intent) = &self.confirmed_intent {
            request = request.confirmed_intent(intent.clone());
        }
        if let Some(key) = self
            .mgrep_key
            .clone()
            .or_else(|| settings.mgrep_api_key.clone())
        {
            request = request.mgrep_api_key(key);
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> EnhanceArgs {
        let cli = Cli::try_parse_from(args).expect("parse");
        match cli.command {
            Commands::Enhance(args) => args,
        }
    }

    #[test]
    fn prompt_words_are_joined() {
        let args = parse(&["youwen", "enhance", "write", "a", "crawler"]);
        assert_eq!(args.prompt_text(), "write a crawler");
        assert!(args.has_input());
        assert!(!args.wants_skills());
    }

    #[test]
    fn history_alone_is_enough_input() {
        let args = parse(&["youwen", "enhance", "--history", "we talked about perf"]);
        assert!(args.has_input());
        assert!(!parse(&["youwen", "enhance"]).has_input());
    }

    #[test]
    fn auto_confirm_conflicts_with_ask_intent() {
        let result = Cli::try_parse_from(["youwen", "enhance", "x", "--auto-confirm", "--ask-intent"]);
        assert!(result.is_err());
    }

    #[test]
    fn request_reflects_flags_and_settings() {
        let settings = Settings {
            mgrep_api_key: Some("settings-key".into()),
            token: Some("settings-token".into()),
            ..Settings::default()
        };
        let args = parse(&[
            "youwen",
            "enhance",
            "hi",
            "--no-search",
            "--ask-intent",
            "--confirmed-intent",
            "use A",
            "--token",
            "cli-token",
            "--skills-dir",
            "/tmp/a",
            "--skills-dir",
            "/tmp/b",
        ]);
        let request = args.to_request(&settings);
        assert_eq!(request.prompt, "hi");
        assert!(!request.agent_config.enable_search);
        assert!(!request.agent_config.auto_confirm_intent);
        assert_eq!(request.confirmed_intent.as_deref(), Some("use A"));
        assert_eq!(request.mgrep_api_key.as_deref(), Some("settings-key"));
        assert_eq!(args.token(&settings).as_deref(), Some("cli-token"));
        assert_eq!(args.skills_dirs.len(), 2);
        assert!(args.wants_skills());
    }

    #[test]
    fn search_follows_settings_when_not_disabled() {
        let settings = Settings {
            enable_search: false,
            ..Settings::default()
        };
        let request = parse(&["youwen", "enhance", "hi"]).to_request(&settings);
        assert!(!request.agent_config.enable_search);
        assert!(request.agent_config.auto_confirm_intent);

        let request = parse(&["youwen", "enhance", "hi"]).to_request(&Settings::default());
        assert!(request.agent_config.enable_search);
    }

    #[test]
    fn env_file_is_global() {
        let cli = Cli::try_parse_from(["youwen", "enhance", "hi", "--env-file", "/tmp/x.env"])
            .expect("parse");
        assert_eq!(cli.env_file, PathBuf::from("/tmp/x.env"));
    }
}
