use std::fmt;

/// A closed set of named pattern groups.
///
/// Implemented by [`FileGroup`] and [`TestType`] so both can share the
/// compiled [`PatternTable`](super::PatternTable) and the per-run match cache.
pub trait Group: Copy + fmt::Debug + 'static {
    /// Every member, in declaration order.
    const ALL: &'static [Self];

    /// Dense index into per-group storage (`0..ALL.len()`).
    fn index(self) -> usize;

    /// Key used for this group in the configuration file.
    fn key(self) -> &'static str;
}

/// Logical area of the repository a changed file can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileGroup {
    EnvironmentFiles,
    PythonProductionFiles,
    JavascriptProductionFiles,
    ApiTestFiles,
    ApiCodegenFiles,
    HelmFiles,
    SetupFiles,
    DocFiles,
    UiFiles,
    WwwFiles,
    KubernetesFiles,
    AllPythonFiles,
    AllSourceFiles,
}

impl Group for FileGroup {
    const ALL: &'static [Self] = &[
        FileGroup::EnvironmentFiles,
        FileGroup::PythonProductionFiles,
        FileGroup::JavascriptProductionFiles,
        FileGroup::ApiTestFiles,
        FileGroup::ApiCodegenFiles,
        FileGroup::HelmFiles,
        FileGroup::SetupFiles,
        FileGroup::DocFiles,
        FileGroup::UiFiles,
        FileGroup::WwwFiles,
        FileGroup::KubernetesFiles,
        FileGroup::AllPythonFiles,
        FileGroup::AllSourceFiles,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn key(self) -> &'static str {
        match self {
            FileGroup::EnvironmentFiles => "environment_files",
            FileGroup::PythonProductionFiles => "python_scans",
            FileGroup::JavascriptProductionFiles => "javascript_scans",
            FileGroup::ApiTestFiles => "api_test_files",
            FileGroup::ApiCodegenFiles => "api_codegen_files",
            FileGroup::HelmFiles => "helm_files",
            FileGroup::SetupFiles => "setup_files",
            FileGroup::DocFiles => "doc_files",
            FileGroup::UiFiles => "ui_files",
            FileGroup::WwwFiles => "www_files",
            FileGroup::KubernetesFiles => "kubernetes_files",
            FileGroup::AllPythonFiles => "all_python_files",
            FileGroup::AllSourceFiles => "all_sources_for_tests",
        }
    }
}

impl fmt::Display for FileGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Category of unit-test suite.
///
/// Only the [`TestType::SELECTABLE`] members carry file patterns; the rest
/// are reachable through the full catalogue alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TestType {
    Always,
    Api,
    Cli,
    Core,
    Integration,
    Other,
    Providers,
    Www,
}

impl TestType {
    /// Test types picked individually when their files change.
    pub const SELECTABLE: &'static [TestType] =
        &[TestType::Www, TestType::Providers, TestType::Cli, TestType::Api];

    /// Name as understood by the test runner.
    pub fn name(self) -> &'static str {
        match self {
            TestType::Always => "Always",
            TestType::Api => "API",
            TestType::Cli => "CLI",
            TestType::Core => "Core",
            TestType::Integration => "Integration",
            TestType::Other => "Other",
            TestType::Providers => "Providers",
            TestType::Www => "WWW",
        }
    }

    pub fn is_selectable(self) -> bool {
        Self::SELECTABLE.contains(&self)
    }
}

impl Group for TestType {
    const ALL: &'static [Self] = &[
        TestType::Always,
        TestType::Api,
        TestType::Cli,
        TestType::Core,
        TestType::Integration,
        TestType::Other,
        TestType::Providers,
        TestType::Www,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn key(self) -> &'static str {
        match self {
            TestType::Always => "always",
            TestType::Api => "api",
            TestType::Cli => "cli",
            TestType::Core => "core",
            TestType::Integration => "integration",
            TestType::Other => "other",
            TestType::Providers => "providers",
            TestType::Www => "www",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
