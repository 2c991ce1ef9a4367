//! Configuration for costline.
//!
//! Settings come from an optional YAML file at `~/.costline/config.yaml`.
//! A missing file means defaults; a file that does not parse is an error.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CostlineError, Result};
use crate::logging::costline_home;

/// Environment variable naming the time zone, checked before the config file.
pub const TIMEZONE_ENV: &str = "COSTLINE_TZ";

/// Default number of days a context entry survives without updates.
pub const DEFAULT_CONTEXT_RETENTION_DAYS: u32 = 7;

// longest real-world DST shift is two hours
const MAX_DST_GAP_MINUTES: i64 = 180;

/// User configuration, every field optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IANA zone name used for every day/week/month/year boundary
    pub timezone: Option<String>,

    /// Directory holding the ledger, its lock file and the context state
    pub state_dir: Option<PathBuf>,

    /// Roots scanned for usage logs (`*.jsonl`)
    pub usage_dirs: Vec<PathBuf>,

    /// Days a context entry is kept without updates
    pub context_retention_days: u32,

    /// Skip log lines without a usage block before JSON parsing
    pub prefilter: bool,

    /// Archive every missing date since January 1st, not only the month/week lookback
    pub year_backfill: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: None,
            state_dir: None,
            usage_dirs: Vec::new(),
            context_retention_days: DEFAULT_CONTEXT_RETENTION_DAYS,
            prefilter: true,
            year_backfill: false,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(CostlineError::io("reading config", &path, e)),
        };

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&contents)
            .map_err(|e| CostlineError::config_invalid(&path, e.to_string()))
    }

    /// Directory for persisted state, `~/.costline/state` unless configured.
    pub fn state_dir(&self) -> Result<PathBuf> {
        match &self.state_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(costline_home()?.join("state")),
        }
    }

    /// Path of the cost ledger file.
    pub fn ledger_path(&self) -> Result<PathBuf> {
        Ok(self.state_dir()?.join("ledger.json"))
    }

    /// Path of the context tracker state file.
    pub fn context_path(&self) -> Result<PathBuf> {
        Ok(self.state_dir()?.join("context.json"))
    }

    /// Usage log roots: configured dirs, else `$CLAUDE_CONFIG_DIR` entries,
    /// else `~/.config/claude/projects` and `~/.claude/projects`.
    pub fn usage_dirs(&self) -> Vec<PathBuf> {
        if !self.usage_dirs.is_empty() {
            return self.usage_dirs.clone();
        }

        let mut roots = Vec::new();
        if let Ok(env_paths) = std::env::var("CLAUDE_CONFIG_DIR") {
            for p in env_paths.split(',') {
                let p = p.trim();
                if !p.is_empty() {
                    roots.push(PathBuf::from(p).join("projects"));
                }
            }
        }

        if roots.is_empty()
            && let Some(home) = dirs::home_dir()
        {
            roots.push(home.join(".config").join("claude").join("projects"));
            roots.push(home.join(".claude").join("projects"));
        }

        roots
    }

    /// Resolve the zone: explicit override, `COSTLINE_TZ`, config, `TZ`, local.
    pub fn zone(&self, override_name: Option<&str>) -> Result<Zone> {
        let explicit = override_name
            .map(str::to_string)
            .or_else(|| std::env::var(TIMEZONE_ENV).ok().filter(|s| !s.trim().is_empty()))
            .or_else(|| self.timezone.clone());

        if let Some(name) = explicit {
            return Zone::named(&name);
        }

        // TZ may hold a POSIX rule or a path; only IANA names are honored
        if let Ok(tz) = std::env::var("TZ")
            && let Ok(zone) = Zone::named(tz.trim_start_matches(':'))
        {
            return Ok(zone);
        }

        Ok(Zone::Local)
    }
}

/// Get the default config file path.
///
/// Returns `~/.costline/config.yaml`
pub fn default_config_path() -> Result<PathBuf> {
    Ok(costline_home()?.join("config.yaml"))
}

/// The zone all date boundaries are computed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// A named IANA zone
    Named(Tz),
    /// The system local zone
    Local,
}

impl Zone {
    /// Parse an IANA zone name.
    pub fn named(name: &str) -> Result<Self> {
        name.trim()
            .parse::<Tz>()
            .map(Zone::Named)
            .map_err(|_| CostlineError::UnknownTimezone {
                name: name.to_string(),
            })
    }

    /// Local calendar date of an instant.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            Zone::Named(tz) => instant.with_timezone(tz).date_naive(),
            Zone::Local => instant.with_timezone(&Local).date_naive(),
        }
    }

    /// Today's date in this zone.
    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }

    /// The instant the given local date begins.
    ///
    /// Ambiguous midnights resolve to the earlier instant. When a DST jump
    /// skips midnight the day begins at the first wall-clock minute that exists.
    pub fn start_of(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        let start = match self {
            Zone::Named(tz) => first_valid_instant(tz, midnight),
            Zone::Local => first_valid_instant(&Local, midnight),
        };
        start.unwrap_or_else(|| midnight.and_utc())
    }

    /// Wall-clock `HH:MM` of an instant.
    pub fn clock(&self, instant: DateTime<Utc>) -> String {
        match self {
            Zone::Named(tz) => instant.with_timezone(tz).format("%H:%M").to_string(),
            Zone::Local => instant.with_timezone(&Local).format("%H:%M").to_string(),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Named(tz) => write!(f, "{}", tz.name()),
            Zone::Local => write!(f, "local"),
        }
    }
}

/// Earliest instant at or after local `from`, searching past a DST gap.
fn first_valid_instant<Z: TimeZone>(tz: &Z, from: NaiveDateTime) -> Option<DateTime<Utc>> {
    (0..=MAX_DST_GAP_MINUTES).find_map(|minute| {
        tz.from_local_datetime(&(from + TimeDelta::minutes(minute)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    })
}
