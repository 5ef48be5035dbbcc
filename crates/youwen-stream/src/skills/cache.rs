use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{Skill, default_skill_dirs, scan_skills_dir};

/// How long a scan result is reused before the directories are read again.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Time source for cache expiry.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CachedScan {
    key: Vec<PathBuf>,
    scanned_at: Instant,
    skills: Vec<Skill>,
}

/// Caller-owned cache of discovered skills.
///
/// Results are keyed on the extra directories passed to [`SkillCache::scan_all`];
/// a different list forces a rescan.
pub struct SkillCache<C: Clock = SystemClock> {
    clock: C,
    ttl: Duration,
    default_dirs: Vec<PathBuf>,
    cached: Option<CachedScan>,
}

impl SkillCache<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock, default_skill_dirs())
    }
}

impl Default for SkillCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> SkillCache<C> {
    pub fn with_clock(clock: C, default_dirs: Vec<PathBuf>) -> Self {
        Self {
            clock,
            ttl: DEFAULT_CACHE_TTL,
            default_dirs,
            cached: None,
        }
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Scans the default directories followed by `extra_dirs`.
    ///
    /// Directories resolving to the same path are read once. When two skills share
    /// a name, the one found first wins, so installed defaults shadow extra copies.
    pub fn scan_all(&mut self, extra_dirs: &[PathBuf]) -> &[Skill] {
        let now = self.clock.now();
        let fresh = self.cached.as_ref().is_some_and(|cached| {
            cached.key.as_slice() == extra_dirs && now.duration_since(cached.scanned_at) < self.ttl
        });
        if !fresh {
            let skills = self.scan(extra_dirs);
            debug!(count = skills.len(), "scanned skill directories");
            self.cached = Some(CachedScan {
                key: extra_dirs.to_vec(),
                scanned_at: now,
                skills,
            });
        }
        self.cached
            .as_ref()
            .map(|cached| cached.skills.as_slice())
            .unwrap_or_default()
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    fn scan(&self, extra_dirs: &[PathBuf]) -> Vec<Skill> {
        let mut seen_dirs = HashSet::new();
        let mut seen_names = HashSet::new();
        let mut skills = Vec::new();
        for dir in self.default_dirs.iter().chain(extra_dirs) {
            let resolved = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.clone());
            if seen_dirs.contains(&resolved) {
                continue;
            }
            let skills_in_dir = scan_skills_dir(&resolved);
            seen_dirs.insert(resolved);
            for skill in skills_in_dir {
                if seen_names.insert(skill.name.clone()) {
                    skills.push(skill);
                }
            }
        }
        skills
    }
}
