use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::profiles::{ProfileCatalog, DEFAULT_PROFILE};
use crate::time_utils::TimezoneHandler;

/// Log written by the periodic speed-test job when no file is given.
pub const DEFAULT_INPUT_FILE: &str = "/var/log/speedtest.log";

/// Per-user state directory name under `$HOME`.
pub const STATE_DIR_NAME: &str = ".speedtest-viz";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Compare speed-test logs on a shared timeline
#[derive(Parser, Debug, Clone)]
#[command(
    name = "speedtest-viz",
    about = "Compare speed-test logs on a shared timeline",
    version
)]
pub struct Settings {
    /// JSONL log files or directories containing them
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Graph profile (download, upload, ping, jitter, packetloss, simple, all)
    #[arg(short, long, default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// Align series on their first Wednesday 01:00 record
    #[arg(short, long)]
    pub align: bool,

    /// Draw all panels in one figure
    #[arg(short = '1', long)]
    pub all_in_one: bool,

    /// Graph title (defaults to the input names joined by " vs. ")
    #[arg(short, long)]
    pub title: Option<String>,

    /// Display timezone (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Timezone for timestamps without an offset (defaults to the display timezone)
    #[arg(long)]
    pub input_timezone: Option<String>,

    /// Require every record to carry all five measurements
    #[arg(long)]
    pub strict: bool,

    /// Output mode
    #[arg(long, default_value = "tui", value_parser = ["tui", "json"])]
    pub output: String,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "auto"])]
    pub theme: String,

    /// Print per-series summaries
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.speedtest-viz/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl LastUsedParams {
    /// Default path of the persisted file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(STATE_DIR_NAME).join("last_used.json")
    }

    /// Load persisted params. Returns `Default` when the file is absent or
    /// cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Replace a profile or timezone that would fail lookup by the
    /// previously persisted value, so a typo never outlives its run.
    pub fn or_previous(mut self, previous: LastUsedParams) -> Self {
        if !self
            .profile
            .as_deref()
            .is_some_and(|name| ProfileCatalog::global().contains(name))
        {
            self.profile = previous.profile;
        }
        if !self
            .timezone
            .as_deref()
            .is_some_and(TimezoneHandler::validate_timezone)
        {
            self.timezone = previous.timezone;
        }
        self
    }

    /// Delete the file at `path` if it exists.
    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`load_with_last_used`](Self::load_with_last_used) with an
    /// explicit argument list and config path.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "profile") {
            if let Some(v) = &last.profile {
                settings.profile = v.clone();
            }
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = &last.timezone {
                settings.timezone = v.clone();
            }
        }
        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = &last.theme {
                settings.theme = v.clone();
            }
        }

        settings = Self::resolve_auto_values(settings);

        let params = LastUsedParams::from(&settings).or_previous(last);
        let _ = params.save_to(config_path);

        settings
    }

    /// Input paths, falling back to [`DEFAULT_INPUT_FILE`].
    pub fn input_paths(&self) -> Vec<PathBuf> {
        if self.files.is_empty() {
            vec![PathBuf::from(DEFAULT_INPUT_FILE)]
        } else {
            self.files.clone()
        }
    }

    pub fn wants_json(&self) -> bool {
        self.output == "json"
    }

    /// Resolve the `"auto"` timezone and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            profile: Some(s.profile.clone()),
            timezone: Some(s.timezone.clone()),
            theme: Some(s.theme.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line.
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
