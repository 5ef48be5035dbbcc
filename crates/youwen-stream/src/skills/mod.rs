//! Discovery of locally installed skills (`<dir>/<skill>/SKILL.md`).
//!
//! The discovered set is advertised in the enhancement request so the server can
//! recommend a matching skill.
mod cache;
mod triggers;

pub use cache::{Clock, DEFAULT_CACHE_TTL, SkillCache, SystemClock};
pub use triggers::extract_triggers;

use std::path::{Path, PathBuf};

use gray_matter::Matter;
use gray_matter::engine::YAML;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::request::SkillDescriptor;

/// File that marks a directory as a skill.
pub const SKILL_FILE: &str = "SKILL.md";

const SUMMARY_LIMIT: usize = 500;

static QUICK_START: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"```(?:bash|sh)\n((?:node|bun)\s+[^\n]+)").ok());

/// Front matter fields read from `SKILL.md`.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct SkillFrontMatter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "user-invocable")]
    pub user_invocable: Option<Value>,
}

impl SkillFrontMatter {
    /// Version as text; YAML may have typed `1.2` as a number.
    pub fn version_text(&self) -> Option<String> {
        match self.version.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn is_user_invocable(&self) -> bool {
        match &self.user_invocable {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "true",
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Skill {
    /// Directory name of the skill.
    pub id: String,
    pub name: String,
    pub version: Option<String>,
    pub description: String,
    pub triggers: Vec<String>,
    pub quick_start: Option<String>,
    /// Start of the markdown body.
    pub summary: String,
    /// Resolved skill directory.
    pub path: PathBuf,
    /// Scanned directory the skill was found in.
    pub source_dir: PathBuf,
    pub user_invocable: bool,
}

impl Skill {
    pub fn descriptor(&self) -> SkillDescriptor {
        SkillDescriptor::new(
            self.name.clone(),
            &self.description,
            self.triggers.clone(),
            self.quick_start.clone(),
        )
    }
}

/// Parses YAML front matter. Returns the fields and the markdown body.
pub fn parse_front_matter(content: &str) -> Option<(SkillFrontMatter, String)> {
    let matter = Matter::<YAML>::new();
    let parsed = matter.parse(content);
    let front: SkillFrontMatter = parsed.data?.deserialize().ok()?;
    Some((front, parsed.content))
}

/// First `node`/`bun` command inside a bash/sh fenced block.
pub fn extract_quick_start(content: &str) -> Option<String> {
    let re = QUICK_START.as_ref()?;
    re.captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end().to_string())
}

/// Scans one directory for skills. Missing directories yield an empty list.
pub fn scan_skills_dir(dir: &Path) -> Vec<Skill> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut found: Vec<(String, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let file_type = entry.file_type().ok()?;
            if !file_type.is_dir() && !file_type.is_symlink() {
                return None;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            (!name.starts_with('.')).then(|| (name, entry.path()))
        })
        .collect();
    found.sort();

    let mut skills = Vec::new();
    for (id, skill_path) in found {
        let real_path = std::fs::canonicalize(&skill_path).unwrap_or_else(|_| skill_path.clone());
        let md_path = [skill_path.join(SKILL_FILE), real_path.join(SKILL_FILE)]
            .into_iter()
            .find(|p| p.is_file());
        let Some(md_path) = md_path else {
            continue;
        };
        match load_skill(&id, &md_path, &real_path, dir) {
            Some(skill) => skills.push(skill),
            None => debug!(path = %md_path.display(), "skipping unreadable skill"),
        }
    }
    skills
}

fn load_skill(id: &str, md_path: &Path, real_path: &Path, source_dir: &Path) -> Option<Skill> {
    let content = std::fs::read_to_string(md_path).ok()?;
    let (front, body) = parse_front_matter(&content)?;
    let description = front.description.clone().unwrap_or_default();
    Some(Skill {
        id: id.to_string(),
        name: front
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| id.to_string()),
        version: front.version_text(),
        triggers: extract_triggers(&description),
        quick_start: extract_quick_start(&content),
        summary: body.trim().chars().take(SUMMARY_LIMIT).collect(),
        path: real_path.to_path_buf(),
        source_dir: source_dir.to_path_buf(),
        user_invocable: front.is_user_invocable(),
        description,
    })
}

/// Well-known skill directories under the home directory that currently exist.
pub fn default_skill_dirs() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    [
        home.join(".claude").join("skills"),
        home.join(".config").join("opencode").join("skill"),
    ]
    .into_iter()
    .filter(|dir| dir.is_dir())
    .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    pub fn write_skill(root: &Path, dir: &str, front: &str, body: &str) {
        let skill_dir = root.join(dir);
        std::fs::create_dir_all(&skill_dir).expect("mkdir");
        std::fs::write(
            skill_dir.join(super::SKILL_FILE),
            format!("---\n{front}\n---\n{body}"),
        )
        .expect("write SKILL.md");
    }
}
