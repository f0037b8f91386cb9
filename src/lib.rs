//! selective-checks: decides which parts of a CI pipeline a run needs.
//!
//! Given the changed files, the triggering event, the target branch and the
//! pull-request labels of a run, this crate derives which test suites,
//! version matrices and build stages must execute, and renders those
//! decisions as CI output variables. Documentation-only changes, for
//! example, skip the image build and the test matrix entirely.
//!
//! # Architecture
//!
//! - **[`classify`]**: Named pattern groups and prefix-anchored path matching.
//! - **[`eval`]**: Decision engine: run context, memoized per-run properties.
//! - **[`output`]**: Rendering of decisions as CI output variables.
//! - **[`config`]**: Configuration loading: embedded defaults + user overlay merge.
//! - **[`logging`]**: stderr (and optional file) logging setup.

/// File groups, test types, compiled pattern tables and match caching.
pub mod classify;
/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Decision engine: selector, per-run checks, decision values.
pub mod eval;
/// Logger initialisation.
pub mod logging;
/// Output variable rendering.
pub mod output;

use config::ConfigError;
use eval::{Decision, RunContext};

/// Evaluate a run against the default configuration.
///
/// This is the main entry point for tests and simple usage.
/// For CLI usage with a user config, build the [`eval::Selector`] directly.
pub fn evaluate(ctx: RunContext) -> Result<Vec<Decision>, ConfigError> {
    let config = config::Config::default_config();
    let selector = eval::Selector::from_config(&config)?;
    Ok(selector.checks(ctx).decisions())
}
