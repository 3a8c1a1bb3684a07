use std::path::{Path, PathBuf};

use anyhow::bail;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::VariantNames;

use crate::sys::geometry::Rect;
use crate::sys::prompt::CloseAnswer;

fn home_dir() -> PathBuf { dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")) }

pub fn data_dir() -> PathBuf { home_dir().join(".mosaic") }
pub fn config_file() -> PathBuf { home_dir().join(".config").join("mosaic").join("config.toml") }

/// How a monitor's grid shape is chosen.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Default,
    strum_macros::VariantNames
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayoutMode {
    /// Add rows until cells stop being taller than wide
    Greedy,
    /// Round the ideal row count
    Rounded,
    /// Floor or ceil of the ideal row count, by distance of the squared counts
    NearestSquare,
    /// Floor or ceil of the ideal row count, whichever gives squarer cells
    #[default]
    Squarest,
}

/// How unpinned windows are spread over monitors.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Default,
    strum_macros::VariantNames
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DealMode {
    FirstFit,
    MaxMinArea,
    #[default]
    Balanced,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub layout_mode: LayoutMode,
    #[serde(default)]
    pub deal_mode: DealMode,
    /// Name the registry is saved under in the data directory.
    #[serde(default = "default_backup_key")]
    pub backup_key: String,
    /// Preselected answer of the close prompt.
    #[serde(default)]
    pub close_prompt_default: CloseAnswer,
    #[serde(default = "yes")]
    pub activate_on_create: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            layout_mode: LayoutMode::default(),
            deal_mode: DealMode::default(),
            backup_key: default_backup_key(),
            close_prompt_default: CloseAnswer::default(),
            activate_on_create: true,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.backup_key.trim().is_empty() {
            issues.push("backup_key must not be empty".to_string());
        } else if self.backup_key.contains(['/', '\\']) || self.backup_key.contains("..") {
            issues.push(format!(
                "backup_key must be a plain file name, got {:?}",
                self.backup_key
            ));
        }
        issues
    }
}

/// One monitor of the static display, in the normalized frame.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct MonitorSettings {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl MonitorSettings {
    pub fn rect(&self) -> Rect { Rect::new(self.x, self.y, self.width, self.height) }

    pub fn validate(&self, number: usize) -> Vec<String> {
        let mut issues = Vec::new();
        if !(self.width > 0.0) || !(self.height > 0.0) {
            issues.push(format!(
                "monitor {number} must have a positive size, got {}x{}",
                self.width, self.height
            ));
        }
        issues
    }
}

impl From<Rect> for MonitorSettings {
    fn from(r: Rect) -> Self {
        MonitorSettings {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default = "default_monitors")]
    pub monitors: Vec<MonitorSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            settings: Settings::default(),
            monitors: default_monitors(),
        }
    }
}

fn yes() -> bool { true }

fn default_backup_key() -> String { "registry".to_string() }

fn default_monitors() -> Vec<MonitorSettings> {
    vec![MonitorSettings { x: 0.0, y: 0.0, width: 1920.0, height: 1080.0 }]
}

static KNOWN_VARIANTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    LayoutMode::VARIANTS
        .iter()
        .chain(DealMode::VARIANTS)
        .chain(CloseAnswer::VARIANTS)
        .copied()
        .collect()
});

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    /// Reads `path` if it exists, otherwise falls back to the defaults.
    pub fn read_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Ok(Config::default()) }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;
        Ok(())
    }

    pub fn monitor_rects(&self) -> Vec<Rect> { self.monitors.iter().map(|m| m.rect()).collect() }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.settings.validate();

        if self.monitors.is_empty() {
            issues.push("at least one [[monitors]] entry is required".to_string());
        }
        for (i, monitor) in self.monitors.iter().enumerate() {
            issues.extend(monitor.validate(i + 1));
        }
        for (i, a) in self.monitors.iter().enumerate() {
            for (j, b) in self.monitors.iter().enumerate().skip(i + 1) {
                if !a.rect().intersection(&b.rect()).is_empty() {
                    issues.push(format!("monitors {} and {} overlap", i + 1, j + 1));
                }
            }
        }
        issues
    }

    fn levenshtein(a: &str, b: &str) -> usize {
        let b_chars: Vec<char> = b.chars().collect();
        let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
        for (i, ca) in a.chars().enumerate() {
            let mut row = vec![i + 1; b_chars.len() + 1];
            for (j, &cb) in b_chars.iter().enumerate() {
                let cost = usize::from(ca != cb);
                row[j + 1] = (prev[j + 1] + 1).min(row[j] + 1).min(prev[j] + cost);
            }
            prev = row;
        }
        prev[b_chars.len()]
    }

    /// Pulls the offending token and serde's expected list out of an
    /// "unknown variant `x`, expected one of `a`, `b`" message.
    fn extract_unknown_variant(err: &str) -> Option<(String, Vec<String>)> {
        let needle = "unknown variant `";
        let start = err.find(needle)? + needle.len();
        let end = start + err[start..].find('`')?;
        let unknown = err[start..end].to_string();

        let mut expected = Vec::new();
        let mut rest = &err[end + 1..];
        while let Some(open) = rest.find('`') {
            let Some(close) = rest[open + 1..].find('`') else { break };
            let token = &rest[open + 1..open + 1 + close];
            if token != unknown && !expected.iter().any(|e| e == token) {
                expected.push(token.to_string());
            }
            rest = &rest[open + close + 2..];
        }
        Some((unknown, expected))
    }

    /// Closest candidate to `unknown`, preferring serde's expected list and
    /// falling back to every variant name the config knows.
    fn suggest_similar(unknown: &str, expected: &[String]) -> Option<String> {
        let unknown = unknown.to_lowercase();
        let candidates: Vec<&str> = if expected.is_empty() {
            KNOWN_VARIANTS.clone()
        } else {
            expected.iter().map(String::as_str).collect()
        };
        let (best, dist) = candidates
            .into_iter()
            .map(|c| (c, Self::levenshtein(&unknown, &c.to_lowercase())))
            .min_by_key(|&(_, d)| d)?;
        let threshold = 3usize.max(best.len() / 2);
        (dist <= threshold).then(|| best.to_string())
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        match toml::from_str::<Config>(buf) {
            Ok(config) => Ok(config),
            Err(e) => {
                let msg = e.to_string();
                let suggestion = Self::extract_unknown_variant(&msg)
                    .and_then(|(unknown, expected)| Self::suggest_similar(&unknown, &expected));
                match suggestion {
                    Some(s) => bail!("{msg}\nDid you mean `{s}`?"),
                    None => bail!("{msg}"),
                }
            }
        }
    }
}
