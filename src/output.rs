//! Rendering of decisions into CI output variables.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::eval::Decision;

/// How output variables are written for the CI platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// `::set-output name=<name>::<value>` workflow commands.
    #[default]
    SetOutput,
    /// `<name>=<value>` lines, as appended to `$GITHUB_OUTPUT`.
    GithubOutput,
    /// One JSON object of native values.
    Json,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::SetOutput => "set-output",
            OutputFormat::GithubOutput => "github-output",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown output format {0:?} (expected set-output, github-output or json)")]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "set-output" => Ok(OutputFormat::SetOutput),
            "github-output" => Ok(OutputFormat::GithubOutput),
            "json" => Ok(OutputFormat::Json),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// Render every decision in `format`, logging each as `name = value`.
pub fn render(decisions: &[Decision], format: OutputFormat) -> String {
    for d in decisions {
        log::info!("{} = {}", d.output_name(), d.value);
    }
    match format {
        OutputFormat::SetOutput => decisions
            .iter()
            .map(|d| format!("::set-output name={}::{}\n", d.output_name(), d.value))
            .collect(),
        OutputFormat::GithubOutput => decisions
            .iter()
            .map(|d| format!("{}={}\n", d.output_name(), d.value))
            .collect(),
        OutputFormat::Json => {
            let map: Map<String, Value> = decisions
                .iter()
                .map(|d| (d.output_name(), d.value.to_json()))
                .collect();
            format!("{}\n", Value::Object(map))
        }
    }
}
