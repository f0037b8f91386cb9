use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::{FileGroup, Group, TestType};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Errors raised while loading configuration or compiling its patterns.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid pattern {pattern:?} in group {group}: {source}")]
    InvalidPattern {
        group: String,
        pattern: String,
        source: regex::Error,
    },
}

// ── Final (merged) config types ──

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub file_groups: FileGroupPatterns,
    #[serde(default)]
    pub test_types: TestTypePatterns,
    pub versions: Versions,
    pub exclusions: Exclusions,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Branch that helm and provider tests are restricted to.
    pub primary_branch: String,
    /// Pull-request label that forces the full test matrix.
    pub full_tests_label: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            primary_branch: "main".into(),
            full_tests_label: "full tests needed".into(),
        }
    }
}

/// Pattern lists keyed by [`FileGroup::key`].
#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(transparent)]
pub struct FileGroupPatterns(HashMap<String, Vec<String>>);

impl FileGroupPatterns {
    pub fn patterns(&self, group: FileGroup) -> &[String] {
        self.0.get(group.key()).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Pattern lists keyed by [`TestType::key`]; only selectable test types are read.
#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(transparent)]
pub struct TestTypePatterns(HashMap<String, Vec<String>>);

impl TestTypePatterns {
    pub fn patterns(&self, test_type: TestType) -> &[String] {
        if !test_type.is_selectable() {
            return &[];
        }
        self.0.get(test_type.key()).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// One version dimension of the CI matrix.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VersionMatrix {
    /// Single entry used for ordinary runs.
    pub default: String,
    /// Full list used when full tests are needed.
    pub current: Vec<String>,
    /// Widest list, used when everything runs. Falls back to `current`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<String>,
}

impl VersionMatrix {
    pub fn all(&self) -> &[String] {
        if self.all.is_empty() {
            &self.current
        } else {
            &self.all
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Versions {
    pub python: VersionMatrix,
    pub postgres: VersionMatrix,
    pub mysql: VersionMatrix,
    pub mssql: VersionMatrix,
    pub kubernetes: VersionMatrix,
    pub kubernetes_mode: VersionMatrix,
    pub kind: VersionMatrix,
    pub helm: VersionMatrix,
}

/// Python version left out of each backend's matrix under full tests.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Exclusions {
    pub postgres: String,
    pub mssql: String,
    pub mysql: String,
    pub sqlite: String,
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    file_groups: PatternsOverlay,
    #[serde(default)]
    test_types: PatternsOverlay,
    #[serde(default)]
    versions: VersionsOverlay,
    #[serde(default)]
    exclusions: ExclusionsOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    primary_branch: Option<String>,
    full_tests_label: Option<String>,
}

/// `<group> = [...]` extends, `remove_<group> = [...]` subtracts.
#[derive(Debug, Deserialize, Default)]
struct PatternsOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(flatten)]
    lists: HashMap<String, Vec<String>>,
}

impl PatternsOverlay {
    /// Split `lists` into (additions, removals) for one group key.
    fn take(&mut self, key: &str) -> (Vec<String>, Vec<String>) {
        let add = self.lists.remove(key).unwrap_or_default();
        let remove = self.lists.remove(&format!("remove_{key}")).unwrap_or_default();
        (add, remove)
    }

    fn warn_unknown(&self, section: &str) {
        for key in self.lists.keys() {
            log::warn!("ignoring unknown key {key:?} in [{section}]");
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct VersionMatrixOverlay {
    default: Option<String>,
    current: Option<Vec<String>>,
    all: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct VersionsOverlay {
    python: Option<VersionMatrixOverlay>,
    postgres: Option<VersionMatrixOverlay>,
    mysql: Option<VersionMatrixOverlay>,
    mssql: Option<VersionMatrixOverlay>,
    kubernetes: Option<VersionMatrixOverlay>,
    kubernetes_mode: Option<VersionMatrixOverlay>,
    kind: Option<VersionMatrixOverlay>,
    helm: Option<VersionMatrixOverlay>,
}

#[derive(Debug, Deserialize, Default)]
struct ExclusionsOverlay {
    postgres: Option<String>,
    mssql: Option<String>,
    mysql: Option<String>,
    sqlite: Option<String>,
}

// ── Merge logic ──

/// Merge a user list into a default list.
/// In replace mode: user list replaces default entirely.
/// In merge mode: remove items first, then extend with additions (deduped).
fn merge_list(base: &mut Vec<String>, add: Vec<String>, remove: &[String], replace: bool) {
    if replace {
        *base = add;
    } else {
        base.retain(|item| !remove.contains(item));
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

/// Version lists are matrices, not sets: an overlay list replaces the default.
fn merge_matrix(base: &mut VersionMatrix, overlay: Option<VersionMatrixOverlay>) {
    let Some(o) = overlay else {
        return;
    };
    if let Some(v) = o.default {
        base.default = v;
    }
    if let Some(v) = o.current {
        base.current = v;
    }
    if let Some(v) = o.all {
        base.all = v;
    }
}

fn merge_patterns<G: Group>(
    base: &mut HashMap<String, Vec<String>>,
    mut overlay: PatternsOverlay,
    section: &str,
) {
    for &group in G::ALL {
        let (add, remove) = overlay.take(group.key());
        let list = base.entry(group.key().to_string()).or_default();
        merge_list(list, add, &remove, overlay.replace);
    }
    overlay.warn_unknown(section);
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Default location of the user overlay: `~/.config/selective-checks/config.toml`.
    pub fn default_overlay_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(Path::new(&home).join(".config/selective-checks/config.toml"))
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the overlay at `path`, or at the default location if it exists
    ///
    /// An explicit `path` must be readable; a missing default overlay is skipped.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default_config();
        let overlay_path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_overlay_path().filter(|p| p.is_file()),
        };
        if let Some(p) = overlay_path {
            log::debug!("loading config overlay from {}", p.display());
            let content = std::fs::read_to_string(&p).map_err(|source| ConfigError::Read {
                path: p.clone(),
                source,
            })?;
            let overlay: ConfigOverlay =
                toml::from_str(&content).map_err(|source| ConfigError::Parse { path: p, source })?;
            config.apply_overlay(overlay);
        }
        Ok(config)
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        // Settings: scalar overrides
        if let Some(v) = overlay.settings.primary_branch {
            self.settings.primary_branch = v;
        }
        if let Some(v) = overlay.settings.full_tests_label {
            self.settings.full_tests_label = v;
        }

        merge_patterns::<FileGroup>(&mut self.file_groups.0, overlay.file_groups, "file_groups");
        merge_patterns::<TestType>(&mut self.test_types.0, overlay.test_types, "test_types");

        let v = overlay.versions;
        merge_matrix(&mut self.versions.python, v.python);
        merge_matrix(&mut self.versions.postgres, v.postgres);
        merge_matrix(&mut self.versions.mysql, v.mysql);
        merge_matrix(&mut self.versions.mssql, v.mssql);
        merge_matrix(&mut self.versions.kubernetes, v.kubernetes);
        merge_matrix(&mut self.versions.kubernetes_mode, v.kubernetes_mode);
        merge_matrix(&mut self.versions.kind, v.kind);
        merge_matrix(&mut self.versions.helm, v.helm);

        let e = overlay.exclusions;
        if let Some(v) = e.postgres {
            self.exclusions.postgres = v;
        }
        if let Some(v) = e.mssql {
            self.exclusions.mssql = v;
        }
        if let Some(v) = e.mysql {
            self.exclusions.mysql = v;
        }
        if let Some(v) = e.sqlite {
            self.exclusions.sqlite = v;
        }
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    pub(crate) fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}
