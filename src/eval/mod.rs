pub mod context;
pub mod decision;

pub use context::{GithubEvent, RunContext, UnknownEvent};
pub use decision::{Decision, Exclusion, OutputValue};

use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::slice;

use crate::classify::{FileGroup, Group, MatchCache, PatternTable, TestType};
use crate::config::{Config, ConfigError, Exclusions, Settings, Versions};

/// Compiled rule set, built once from configuration and shared by every run.
#[derive(Debug)]
pub struct Selector {
    settings: Settings,
    versions: Versions,
    exclusions: Exclusions,
    file_patterns: PatternTable<FileGroup>,
    test_patterns: PatternTable<TestType>,
}

impl Selector {
    /// Build the selector from configuration, compiling every pattern.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let file_patterns = PatternTable::compile(|g| config.file_groups.patterns(g))?;
        let test_patterns = PatternTable::compile(|t| config.test_types.patterns(t))?;
        for &g in FileGroup::ALL {
            log::debug!("{g}: {} patterns", file_patterns.pattern_count(g));
        }
        Ok(Self {
            settings: config.settings.clone(),
            versions: config.versions.clone(),
            exclusions: config.exclusions.clone(),
            file_patterns,
            test_patterns,
        })
    }

    /// Start evaluating a run. Nothing is computed until a property is read.
    pub fn checks(&self, ctx: RunContext) -> SelectiveChecks<'_> {
        SelectiveChecks::new(self, ctx)
    }
}

/// Version matrix published per run; the discriminant indexes its cache slot.
#[derive(Debug, Clone, Copy)]
enum Matrix {
    Python,
    AllPython,
    Postgres,
    Mysql,
    Mssql,
    Kubernetes,
    KubernetesMode,
    Kind,
    Helm,
}

impl Matrix {
    const COUNT: usize = 9;
}

/// Database backend with a python-version exclusion.
#[derive(Debug, Clone, Copy)]
enum Backend {
    Postgres,
    Mysql,
    Mssql,
    Sqlite,
}

impl Backend {
    const COUNT: usize = 4;
}

/// Lazily evaluated decisions for one run.
///
/// Every property is computed on first access and cached, and each pattern
/// group is matched against the changed files at most once.
#[derive(Debug)]
pub struct SelectiveChecks<'s> {
    selector: &'s Selector,
    ctx: RunContext,
    file_matches: MatchCache<FileGroup>,
    test_type_matches: MatchCache<TestType>,
    full_tests_needed: OnceCell<bool>,
    run_everything: OnceCell<bool>,
    gates: Vec<OnceCell<bool>>,
    needs_helm_tests: OnceCell<bool>,
    image_build: OnceCell<bool>,
    basic_checks_only: OnceCell<bool>,
    test_types: OnceCell<String>,
    upgrade_to_newer_dependencies: OnceCell<bool>,
    matrices: [OnceCell<&'s [String]>; Matrix::COUNT],
    python_versions_list_as_string: OnceCell<String>,
    all_python_versions_list_as_string: OnceCell<String>,
    kubernetes_versions_list_as_string: OnceCell<String>,
    exclusions: [OnceCell<Vec<Exclusion>>; Backend::COUNT],
}

impl<'s> SelectiveChecks<'s> {
    fn new(selector: &'s Selector, ctx: RunContext) -> Self {
        Self {
            selector,
            ctx,
            file_matches: MatchCache::new(),
            test_type_matches: MatchCache::new(),
            full_tests_needed: OnceCell::new(),
            run_everything: OnceCell::new(),
            gates: FileGroup::ALL.iter().map(|_| OnceCell::new()).collect(),
            needs_helm_tests: OnceCell::new(),
            image_build: OnceCell::new(),
            basic_checks_only: OnceCell::new(),
            test_types: OnceCell::new(),
            upgrade_to_newer_dependencies: OnceCell::new(),
            matrices: std::array::from_fn(|_| OnceCell::new()),
            python_versions_list_as_string: OnceCell::new(),
            all_python_versions_list_as_string: OnceCell::new(),
            kubernetes_versions_list_as_string: OnceCell::new(),
            exclusions: std::array::from_fn(|_| OnceCell::new()),
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Changed files belonging to `group`.
    pub fn matching_files(&self, group: FileGroup) -> &[String] {
        self.file_matches
            .get_or_match(group, &self.selector.file_patterns, &self.ctx.files)
    }

    /// Changed files attributed to `test_type`. Empty for non-selectable types.
    pub fn matching_test_files(&self, test_type: TestType) -> &[String] {
        self.test_type_matches
            .get_or_match(test_type, &self.selector.test_patterns, &self.ctx.files)
    }

    /// Number of group match computations performed so far.
    pub fn match_computations(&self) -> usize {
        self.file_matches.computations() + self.test_type_matches.computations()
    }

    fn on_primary_branch(&self) -> bool {
        self.ctx.default_branch == self.selector.settings.primary_branch
    }

    pub fn full_tests_needed(&self) -> bool {
        *self.full_tests_needed.get_or_init(|| {
            let event = self.ctx.github_event;
            if event.is_push_or_schedule() {
                log::warn!("full tests needed because event is {event}");
                return true;
            }
            let label = &self.selector.settings.full_tests_label;
            if self.ctx.has_label(label) {
                log::warn!("full tests needed because of label {label:?}");
                return true;
            }
            false
        })
    }

    pub fn run_everything(&self) -> bool {
        *self.run_everything.get_or_init(|| {
            if !self.ctx.has_commit_ref() {
                log::warn!("running everything as commit is missing");
                return true;
            }
            if self.full_tests_needed() {
                log::warn!("running everything as full tests are needed");
                return true;
            }
            if !self.matching_files(FileGroup::EnvironmentFiles).is_empty() {
                log::warn!("running everything because env files changed");
                return true;
            }
            false
        })
    }

    /// Gate for one area: on when running everything or any file matches.
    pub fn should_run(&self, area: FileGroup) -> bool {
        *self.gates[area.index()].get_or_init(|| {
            if self.run_everything() {
                log::info!("{area} enabled because we are running everything");
                return true;
            }
            let count = self.matching_files(area).len();
            if count > 0 {
                log::info!("{area} enabled because it matched {count} changed files");
                true
            } else {
                log::info!("{area} disabled because it did not match any changed files");
                false
            }
        })
    }

    pub fn needs_python_scans(&self) -> bool {
        self.should_run(FileGroup::PythonProductionFiles)
    }

    pub fn needs_javascript_scans(&self) -> bool {
        self.should_run(FileGroup::JavascriptProductionFiles)
    }

    pub fn needs_api_tests(&self) -> bool {
        self.should_run(FileGroup::ApiTestFiles)
    }

    pub fn needs_api_codegen(&self) -> bool {
        self.should_run(FileGroup::ApiCodegenFiles)
    }

    pub fn run_ui_tests(&self) -> bool {
        self.should_run(FileGroup::UiFiles)
    }

    pub fn run_www_tests(&self) -> bool {
        self.should_run(FileGroup::WwwFiles)
    }

    pub fn run_kubernetes_tests(&self) -> bool {
        self.should_run(FileGroup::KubernetesFiles)
    }

    pub fn docs_build(&self) -> bool {
        self.should_run(FileGroup::DocFiles)
    }

    pub fn run_tests(&self) -> bool {
        self.should_run(FileGroup::AllSourceFiles)
    }

    /// Helm tests only run against the primary branch.
    pub fn needs_helm_tests(&self) -> bool {
        *self
            .needs_helm_tests
            .get_or_init(|| self.should_run(FileGroup::HelmFiles) && self.on_primary_branch())
    }

    /// Images are only built when a later job consumes them.
    pub fn image_build(&self) -> bool {
        *self
            .image_build
            .get_or_init(|| self.run_tests() || self.docs_build() || self.run_kubernetes_tests())
    }

    pub fn basic_checks_only(&self) -> bool {
        *self.basic_checks_only.get_or_init(|| !self.image_build())
    }

    pub fn upgrade_to_newer_dependencies(&self) -> bool {
        *self.upgrade_to_newer_dependencies.get_or_init(|| {
            !self.matching_files(FileGroup::SetupFiles).is_empty()
                || self.ctx.github_event.is_push_or_schedule()
        })
    }

    /// Test types picked from the changed files when not running everything.
    fn selected_test_types(&self) -> BTreeSet<TestType> {
        let mut candidates = BTreeSet::from([TestType::Always]);
        let mut attributed: BTreeSet<&str> = BTreeSet::new();
        for &test_type in TestType::SELECTABLE {
            let matched = self.matching_test_files(test_type);
            if !matched.is_empty() {
                log::info!("{test_type} added because it matched {} files", matched.len());
                candidates.insert(test_type);
            }
            attributed.extend(matched.iter().map(String::as_str));
        }

        let kubernetes: BTreeSet<&str> = self
            .matching_files(FileGroup::KubernetesFiles)
            .iter()
            .map(String::as_str)
            .collect();
        let remaining: BTreeSet<&str> = self
            .matching_files(FileGroup::AllSourceFiles)
            .iter()
            .map(String::as_str)
            .filter(|f| !attributed.contains(f) && !kubernetes.contains(f))
            .collect();

        if remaining.is_empty() {
            log::info!("no core/other files changed; running only the matching test types");
        } else {
            log::warn!(
                "running all test types: {} changed files fall into the Core/Other category",
                remaining.len()
            );
            log::debug!("core/other files: {remaining:?}");
            candidates.extend(TestType::ALL.iter().copied());
        }
        candidates
    }

    /// Space-separated, sorted test type names; empty when tests don't run.
    pub fn test_types(&self) -> &str {
        self.test_types.get_or_init(|| {
            if !self.run_tests() {
                return String::new();
            }
            let mut types: BTreeSet<TestType> = if self.run_everything() {
                TestType::ALL.iter().copied().collect()
            } else {
                self.selected_test_types()
            };
            if !self.on_primary_branch() && types.remove(&TestType::Providers) {
                log::warn!(
                    "removing Providers because the target branch is {} and not {}",
                    self.ctx.default_branch,
                    self.selector.settings.primary_branch
                );
            }
            let mut names: Vec<&str> = types.iter().map(|t| t.name()).collect();
            names.sort_unstable();
            log::info!("selected test types: {names:?}");
            names.join(" ")
        })
    }

    // ── Version matrices ──

    fn select_matrix(&self, matrix: Matrix) -> &'s [String] {
        let selector: &'s Selector = self.selector;
        let versions = &selector.versions;
        let config = match matrix {
            Matrix::Python => &versions.python,
            Matrix::AllPython => {
                let python = &versions.python;
                return if self.run_everything() || self.full_tests_needed() {
                    python.all()
                } else {
                    slice::from_ref(&python.default)
                };
            }
            Matrix::Postgres => &versions.postgres,
            Matrix::Mysql => &versions.mysql,
            Matrix::Mssql => &versions.mssql,
            Matrix::Kubernetes => &versions.kubernetes,
            Matrix::KubernetesMode => &versions.kubernetes_mode,
            Matrix::Kind => &versions.kind,
            Matrix::Helm => &versions.helm,
        };
        if self.full_tests_needed() {
            &config.current
        } else {
            slice::from_ref(&config.default)
        }
    }

    fn matrix(&self, matrix: Matrix) -> &'s [String] {
        *self.matrices[matrix as usize].get_or_init(|| self.select_matrix(matrix))
    }

    fn exclude(&self, backend: Backend) -> &[Exclusion] {
        self.exclusions[backend as usize].get_or_init(|| {
            if !self.full_tests_needed() {
                return Vec::new();
            }
            let config = &self.selector.exclusions;
            let python_version = match backend {
                Backend::Postgres => &config.postgres,
                Backend::Mysql => &config.mysql,
                Backend::Mssql => &config.mssql,
                Backend::Sqlite => &config.sqlite,
            };
            vec![Exclusion::python_version(python_version.as_str())]
        })
    }

    pub fn python_versions(&self) -> &'s [String] {
        self.matrix(Matrix::Python)
    }

    pub fn python_versions_list_as_string(&self) -> &str {
        self.python_versions_list_as_string
            .get_or_init(|| self.python_versions().join(" "))
    }

    /// Widest python list; also used whenever everything runs.
    pub fn all_python_versions(&self) -> &'s [String] {
        self.matrix(Matrix::AllPython)
    }

    pub fn all_python_versions_list_as_string(&self) -> &str {
        self.all_python_versions_list_as_string
            .get_or_init(|| self.all_python_versions().join(" "))
    }

    pub fn postgres_versions(&self) -> &'s [String] {
        self.matrix(Matrix::Postgres)
    }

    pub fn mysql_versions(&self) -> &'s [String] {
        self.matrix(Matrix::Mysql)
    }

    pub fn mssql_versions(&self) -> &'s [String] {
        self.matrix(Matrix::Mssql)
    }

    pub fn kubernetes_versions(&self) -> &'s [String] {
        self.matrix(Matrix::Kubernetes)
    }

    pub fn kubernetes_versions_list_as_string(&self) -> &str {
        self.kubernetes_versions_list_as_string
            .get_or_init(|| self.kubernetes_versions().join(" "))
    }

    pub fn kubernetes_modes(&self) -> &'s [String] {
        self.matrix(Matrix::KubernetesMode)
    }

    pub fn kind_versions(&self) -> &'s [String] {
        self.matrix(Matrix::Kind)
    }

    pub fn helm_versions(&self) -> &'s [String] {
        self.matrix(Matrix::Helm)
    }

    pub fn postgres_exclude(&self) -> &[Exclusion] {
        self.exclude(Backend::Postgres)
    }

    pub fn mysql_exclude(&self) -> &[Exclusion] {
        self.exclude(Backend::Mysql)
    }

    pub fn mssql_exclude(&self) -> &[Exclusion] {
        self.exclude(Backend::Mssql)
    }

    pub fn sqlite_exclude(&self) -> &[Exclusion] {
        self.exclude(Backend::Sqlite)
    }

    // ── Pass-through values ──

    pub fn default_branch(&self) -> &str {
        &self.ctx.default_branch
    }

    pub fn default_python_version(&self) -> &'s str {
        &self.selector.versions.python.default
    }

    pub fn default_postgres_version(&self) -> &'s str {
        &self.selector.versions.postgres.default
    }

    pub fn default_mysql_version(&self) -> &'s str {
        &self.selector.versions.mysql.default
    }

    pub fn default_mssql_version(&self) -> &'s str {
        &self.selector.versions.mssql.default
    }

    pub fn default_kubernetes_version(&self) -> &'s str {
        &self.selector.versions.kubernetes.default
    }

    pub fn default_kind_version(&self) -> &'s str {
        &self.selector.versions.kind.default
    }

    pub fn default_helm_version(&self) -> &'s str {
        &self.selector.versions.helm.default
    }

    /// Every published decision, sorted by name.
    pub fn decisions(&self) -> Vec<Decision> {
        let mut decisions = vec![
            Decision::new("all_python_versions", self.all_python_versions()),
            Decision::new(
                "all_python_versions_list_as_string",
                self.all_python_versions_list_as_string(),
            ),
            Decision::new("basic_checks_only", self.basic_checks_only()),
            Decision::new("default_branch", self.default_branch()),
            Decision::new("default_helm_version", self.default_helm_version()),
            Decision::new("default_kind_version", self.default_kind_version()),
            Decision::new("default_kubernetes_version", self.default_kubernetes_version()),
            Decision::new("default_mssql_version", self.default_mssql_version()),
            Decision::new("default_mysql_version", self.default_mysql_version()),
            Decision::new("default_postgres_version", self.default_postgres_version()),
            Decision::new("default_python_version", self.default_python_version()),
            Decision::new("docs_build", self.docs_build()),
            Decision::new("helm_versions", self.helm_versions()),
            Decision::new("image_build", self.image_build()),
            Decision::new("kind_versions", self.kind_versions()),
            Decision::new("kubernetes_modes", self.kubernetes_modes()),
            Decision::new("kubernetes_versions", self.kubernetes_versions()),
            Decision::new(
                "kubernetes_versions_list_as_string",
                self.kubernetes_versions_list_as_string(),
            ),
            Decision::new("mssql_exclude", self.mssql_exclude()),
            Decision::new("mssql_versions", self.mssql_versions()),
            Decision::new("mysql_exclude", self.mysql_exclude()),
            Decision::new("mysql_versions", self.mysql_versions()),
            Decision::new("needs_api_codegen", self.needs_api_codegen()),
            Decision::new("needs_api_tests", self.needs_api_tests()),
            Decision::new("needs_helm_tests", self.needs_helm_tests()),
            Decision::new("needs_javascript_scans", self.needs_javascript_scans()),
            Decision::new("needs_python_scans", self.needs_python_scans()),
            Decision::new("postgres_exclude", self.postgres_exclude()),
            Decision::new("postgres_versions", self.postgres_versions()),
            Decision::new("python_versions", self.python_versions()),
            Decision::new(
                "python_versions_list_as_string",
                self.python_versions_list_as_string(),
            ),
            Decision::new("run_kubernetes_tests", self.run_kubernetes_tests()),
            Decision::new("run_tests", self.run_tests()),
            Decision::new("run_ui_tests", self.run_ui_tests()),
            Decision::new("run_www_tests", self.run_www_tests()),
            Decision::new("sqlite_exclude", self.sqlite_exclude()),
            Decision::new("test_types", self.test_types()),
            Decision::new(
                "upgrade_to_newer_dependencies",
                self.upgrade_to_newer_dependencies(),
            ),
        ];
        decisions.sort_by_key(|d| d.name);
        decisions
    }
}
