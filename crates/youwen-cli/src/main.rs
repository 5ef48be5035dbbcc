//! `youwen` command-line entry point.

mod cli;
mod render;

use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;
use tracing::debug;
use youwen_stream::observability::init_observability;
use youwen_stream::request::ENHANCE_ENDPOINT;
use youwen_stream::skills::{Skill, SkillCache};
use youwen_stream::version::{self, VersionCache, VersionCheck};
use youwen_stream::{
    ClientConfig, DecodedEvent, EnhanceMode, EnhanceRequest, RunOutcome, Settings, SseClient,
};

use crate::cli::{Cli, Commands, EnhanceArgs};

/// Name the backend publishes releases under.
const SKILL_NAME: &str = "yw-enhance";

#[tokio::main]
async fn main() -> ExitCode {
    init_observability();
    let cli = Cli::parse();
    let settings = Settings::load(Some(cli.env_file.as_path()));

    let result = match cli.command {
        Commands::Enhance(args) => enhance(args, &settings).await,
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", render::error_report(&err));
            ExitCode::FAILURE
        }
    }
}

async fn enhance(args: EnhanceArgs, settings: &Settings) -> anyhow::Result<ExitCode> {
    if !args.has_input() {
        eprintln!("error: provide a prompt or --history");
        eprintln!("usage: youwen enhance <PROMPT>... [OPTIONS]");
        return Ok(ExitCode::FAILURE);
    }
    if settings.enhance_mode == EnhanceMode::Disabled && !args.force {
        println!("{}", args.prompt_text());
        return Ok(ExitCode::SUCCESS);
    }

    let token = args.token(settings);
    let cache_path = version::default_cache_path();
    if let Some(path) = &cache_path {
        // Detached: the handle is dropped and the task dies with the runtime.
        let _ = version::spawn_version_check(VersionCheck {
            base_url: settings.api_url.clone(),
            skill_name: SKILL_NAME.to_string(),
            local_version: env!("CARGO_PKG_VERSION").to_string(),
            token: token.clone(),
            cache_path: path.clone(),
        });
    }

    let mut request = args.to_request(settings);
    if args.wants_skills() {
        let mut cache = SkillCache::new();
        let skills: Vec<_> = cache
            .scan_all(&args.skills_dirs)
            .iter()
            .map(Skill::descriptor)
            .collect();
        if !skills.is_empty() && !args.json {
            eprintln!(
                "🔍 {} installed skills found; the server picks a recommendation",
                skills.len()
            );
        }
        request = request.installed_skills(skills);
    }

    let mut config = ClientConfig::from_settings(settings);
    if let Some(token) = token {
        config = config.bearer_token(token);
    }
    let client = SseClient::new(config).context("failed to create client")?;

    let code = if args.json {
        let events = client.collect_events(ENHANCE_ENDPOINT, &request).await?;
        println!("{}", serde_json::to_string_pretty(&events)?);
        ExitCode::SUCCESS
    } else {
        run_pipeline(&client, &request).await?
    };

    if let Some(notice) = cache_path
        .as_deref()
        .and_then(VersionCache::load)
        .and_then(|cache| render::update_notice(SKILL_NAME, &cache))
    {
        eprintln!("{notice}");
    }
    Ok(code)
}

async fn run_pipeline(client: &SseClient, request: &EnhanceRequest) -> anyhow::Result<ExitCode> {
    eprintln!("⚡ multi-agent pipeline running…");
    let mut on_event = |event: &DecodedEvent| debug!(event = %event.event, "pipeline event");
    let run = client.enhance(request, &mut on_event).await?;

    for line in render::stage_summary(&run) {
        eprintln!("{line}");
    }
    match run.outcome() {
        RunOutcome::Completed { text } => {
            eprintln!();
            println!("{}", render::enhanced_block(&text));
            if let Some(usage) = run.usage() {
                eprintln!("\n{}", render::token_stats(usage));
            }
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Failed { message } => {
            eprintln!("\nerror: {message}");
            Ok(ExitCode::FAILURE)
        }
        RunOutcome::NeedsConfirmation(confirmation) => {
            eprintln!("\nerror: {}", confirmation.advisory());
            Ok(ExitCode::FAILURE)
        }
        RunOutcome::Empty => {
            eprintln!("\n⚠ no enhanced result received");
            Ok(ExitCode::FAILURE)
        }
    }
}
