use std::collections::BTreeMap;

use selective_checks::classify::{FileGroup, Group};
use selective_checks::config::Config;
use selective_checks::eval::{GithubEvent, RunContext, Selector};
use selective_checks::output::{self, OutputFormat};

const ALL_TEST_TYPES: &str = "API Always CLI Core Integration Other Providers WWW";
const ALL_PYTHON: &str = "['3.7', '3.8', '3.9', '3.10']";

/// Output name → rendered value, as the CI platform would see it.
fn outputs_for(ctx: RunContext) -> BTreeMap<String, String> {
    selective_checks::evaluate(ctx)
        .unwrap()
        .into_iter()
        .map(|d| (d.output_name(), d.value.to_string()))
        .collect()
}

fn pr(files: &[&str]) -> RunContext {
    RunContext::new(files.iter().copied()).with_commit_ref("abc")
}

macro_rules! output_test {
    ($name:ident, $ctx:expr, { $($key:literal => $value:expr),+ $(,)? }) => {
        #[test]
        fn $name() {
            let ctx: RunContext = $ctx;
            let outputs = outputs_for(ctx.clone());
            $(
                assert_eq!(
                    outputs[$key], $value,
                    "output {} for files {:?}", $key, ctx.files,
                );
            )+
        }
    };
}

// ── Documentation-only changes ──

output_test!(docs_only, pr(&["docs/README.md"]), {
    "docs-build" => "true",
    "run-tests" => "false",
    "image-build" => "true",
    "basic-checks-only" => "false",
    "test-types" => "",
    "needs-python-scans" => "false",
    "needs-helm-tests" => "false",
    "upgrade-to-newer-dependencies" => "false",
    "python-versions" => "['3.7']",
    "python-versions-list-as-string" => "3.7",
    "all-python-versions" => "['3.7']",
});

output_test!(readme_only_runs_basic_checks, pr(&["README.md"]), {
    "docs-build" => "false",
    "run-tests" => "false",
    "run-kubernetes-tests" => "false",
    "image-build" => "false",
    "basic-checks-only" => "true",
    "test-types" => "",
});

output_test!(no_changed_files, pr(&[]), {
    "image-build" => "false",
    "basic-checks-only" => "true",
    "run-tests" => "false",
    "docs-build" => "false",
    "test-types" => "",
});

// ── Selective test types ──

output_test!(api_file_selects_api, pr(&["airflow/api/foo.py"]), {
    "test-types" => "API Always",
    "needs-api-tests" => "true",
    "needs-python-scans" => "true",
    "needs-javascript-scans" => "false",
    "needs-api-codegen" => "false",
    "docs-build" => "true",
    "run-tests" => "true",
    "run-www-tests" => "false",
    "image-build" => "true",
});

output_test!(
    api_file_off_primary_branch,
    pr(&["airflow/api/foo.py"]).with_default_branch("v2-3-test"),
    {
        "test-types" => "API Always",
        "default-branch" => "v2-3-test",
    }
);

output_test!(
    provider_file_selects_providers,
    pr(&["airflow/providers/amazon/aws/hooks/s3.py"]),
    {
        "test-types" => "Always Providers",
        "run-kubernetes-tests" => "false",
    }
);

output_test!(
    provider_file_off_primary_branch,
    pr(&["airflow/providers/amazon/aws/hooks/s3.py"]).with_default_branch("v2-3-test"),
    {
        "test-types" => "Always",
        "run-tests" => "true",
    }
);

output_test!(
    kubernetes_provider_file,
    pr(&["airflow/providers/cncf/kubernetes/operators/pod.py"]),
    {
        "test-types" => "Always Providers",
        "run-kubernetes-tests" => "true",
        "needs-helm-tests" => "false",
    }
);

output_test!(
    cli_files_select_cli,
    pr(&[
        "airflow/cli/commands/task_command.py",
        "tests/cli/commands/test_task_command.py",
    ]),
    {
        "test-types" => "Always CLI",
        "needs-api-tests" => "false",
    }
);

output_test!(www_js_file, pr(&["airflow/www/static/js/graph.js"]), {
    "test-types" => "Always WWW",
    "run-www-tests" => "true",
    "needs-javascript-scans" => "true",
    "needs-python-scans" => "false",
    "docs-build" => "false",
    "image-build" => "true",
});

output_test!(ui_tsx_file, pr(&["airflow/ui/src/App.tsx"]), {
    "test-types" => "Always WWW",
    "run-ui-tests" => "true",
    "run-www-tests" => "false",
});

output_test!(
    api_spec_needs_codegen,
    pr(&["airflow/api_connexion/openapi/v1.yaml"]),
    {
        "needs-api-codegen" => "true",
        "needs-api-tests" => "true",
        "needs-python-scans" => "false",
        "test-types" => "API Always",
    }
);

output_test!(
    core_file_selects_everything,
    pr(&["airflow/api/foo.py", "airflow/utils/helpers.py"]),
    {
        "test-types" => ALL_TEST_TYPES,
    }
);

output_test!(kubernetes_tests_only, pr(&["kubernetes_tests/test_base.py"]), {
    "test-types" => "Always",
    "run-kubernetes-tests" => "true",
    "run-tests" => "true",
});

// ── Helm ──

output_test!(chart_on_primary_branch, pr(&["chart/templates/scheduler.yaml"]), {
    "needs-helm-tests" => "true",
    "run-kubernetes-tests" => "true",
    "docs-build" => "true",
    "test-types" => "Always",
});

output_test!(
    chart_off_primary_branch,
    pr(&["chart/templates/scheduler.yaml"]).with_default_branch("v2-3-test"),
    {
        "needs-helm-tests" => "false",
        "run-kubernetes-tests" => "true",
    }
);

// ── Run everything ──

output_test!(workflow_change_runs_everything, pr(&[".github/workflows/ci.yml"]), {
    "test-types" => ALL_TEST_TYPES,
    "run-tests" => "true",
    "docs-build" => "true",
    "needs-helm-tests" => "true",
    "needs-api-codegen" => "true",
    "run-ui-tests" => "true",
    "run-www-tests" => "true",
    "upgrade-to-newer-dependencies" => "false",
    "python-versions" => "['3.7']",
    "all-python-versions" => ALL_PYTHON,
    "all-python-versions-list-as-string" => "3.7 3.8 3.9 3.10",
    "postgres-exclude" => "[]",
});

output_test!(
    workflow_change_off_primary_branch,
    pr(&[".github/workflows/ci.yml"]).with_default_branch("v2-3-test"),
    {
        "test-types" => "API Always CLI Core Integration Other WWW",
        "needs-helm-tests" => "false",
    }
);

output_test!(setup_change_upgrades_dependencies, pr(&["setup.py"]), {
    "upgrade-to-newer-dependencies" => "true",
    "test-types" => ALL_TEST_TYPES,
});

output_test!(pyproject_upgrades_without_running_everything, pr(&["pyproject.toml"]), {
    "upgrade-to-newer-dependencies" => "true",
    "run-tests" => "false",
});

output_test!(missing_commit_runs_everything, RunContext::new(["README.md"]), {
    "run-tests" => "true",
    "test-types" => ALL_TEST_TYPES,
    "all-python-versions" => ALL_PYTHON,
    "python-versions" => "['3.7']",
    "kubernetes-versions" => "['v1.24.0']",
});

// ── Full tests ──

output_test!(
    full_tests_label,
    pr(&["README.md"]).with_label("full tests needed"),
    {
        "run-tests" => "true",
        "test-types" => ALL_TEST_TYPES,
        "python-versions" => ALL_PYTHON,
        "python-versions-list-as-string" => "3.7 3.8 3.9 3.10",
        "all-python-versions" => ALL_PYTHON,
        "postgres-versions" => "['10', '11', '12', '13', '14']",
        "mysql-versions" => "['5.7', '8']",
        "mssql-versions" => "['2017-latest', '2019-latest']",
        "kubernetes-versions-list-as-string" => "v1.24.0 v1.23.6 v1.22.9 v1.21.12 v1.20.15",
        "kubernetes-modes" => "['image']",
        "kind-versions" => "['v0.14.0']",
        "helm-versions" => "['v3.6.3']",
        "postgres-exclude" => "[{'python-version': '3.7'}]",
        "mssql-exclude" => "[{'python-version': '3.8'}]",
        "mysql-exclude" => "[{'python-version': '3.10'}]",
        "sqlite-exclude" => "[{'python-version': '3.9'}]",
        "upgrade-to-newer-dependencies" => "false",
    }
);

output_test!(push_event, pr(&[]).with_event(GithubEvent::Push), {
    "python-versions" => ALL_PYTHON,
    "upgrade-to-newer-dependencies" => "true",
    "test-types" => ALL_TEST_TYPES,
    "image-build" => "true",
});

output_test!(schedule_event, pr(&[]).with_event(GithubEvent::Schedule), {
    "python-versions" => ALL_PYTHON,
    "upgrade-to-newer-dependencies" => "true",
});

output_test!(
    other_label_is_not_full,
    pr(&["README.md"]).with_label("area:docs"),
    {
        "python-versions" => "['3.7']",
        "run-tests" => "false",
    }
);

output_test!(defaults_pass_through, pr(&[]), {
    "default-branch" => "main",
    "default-python-version" => "3.7",
    "default-postgres-version" => "10",
    "default-mysql-version" => "5.7",
    "default-mssql-version" => "2017-latest",
    "default-kubernetes-version" => "v1.24.0",
    "default-kind-version" => "v0.14.0",
    "default-helm-version" => "v3.6.3",
});

// ── Properties ──

#[test]
fn every_event_without_commit_runs_everything() {
    let selector = Selector::from_config(&Config::default_config()).unwrap();
    for &event in GithubEvent::ALL {
        let checks = selector.checks(RunContext::new(["README.md"]).with_event(event));
        assert!(checks.run_everything(), "{event}");
    }
}

#[test]
fn evaluation_is_idempotent_and_memoized() {
    let selector = Selector::from_config(&Config::default_config()).unwrap();
    let checks = selector.checks(pr(&[
        "airflow/www/views.py",
        "chart/values.yaml",
        "tests/api/test_auth.py",
    ]));
    let first = checks.decisions();
    let computed = checks.match_computations();
    assert_eq!(checks.decisions(), first);
    assert_eq!(checks.test_types(), checks.test_types());
    assert_eq!(checks.match_computations(), computed);
}

#[test]
fn empty_files_disable_every_gate_for_non_full_events() {
    let selector = Selector::from_config(&Config::default_config()).unwrap();
    for event in [
        GithubEvent::PullRequest,
        GithubEvent::PullRequestTarget,
        GithubEvent::PullRequestReview,
        GithubEvent::WorkflowRun,
    ] {
        let checks = selector.checks(pr(&[]).with_event(event));
        assert!(!checks.run_everything(), "{event}");
        for &g in FileGroup::ALL {
            assert!(!checks.should_run(g), "{event} {g}");
        }
    }
}

#[test]
fn outputs_are_sorted_kebab_case() {
    let decisions = selective_checks::evaluate(pr(&["airflow/api/foo.py"])).unwrap();
    let rendered = output::render(&decisions, OutputFormat::SetOutput);
    let names: Vec<&str> = rendered
        .lines()
        .map(|l| {
            l.strip_prefix("::set-output name=")
                .and_then(|rest| rest.split("::").next())
                .unwrap()
        })
        .collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
    assert!(names.iter().all(|n| !n.contains('_')), "{names:?}");
    assert!(rendered.contains("::set-output name=test-types::API Always\n"));
}

#[test]
fn set_output_lists_use_python_literal_syntax() {
    let decisions =
        selective_checks::evaluate(pr(&["README.md"]).with_label("full tests needed")).unwrap();
    let rendered = output::render(&decisions, OutputFormat::SetOutput);
    let lines: Vec<&str> = rendered.lines().collect();
    for expected in [
        "::set-output name=python-versions::['3.7', '3.8', '3.9', '3.10']",
        "::set-output name=postgres-exclude::[{'python-version': '3.7'}]",
        "::set-output name=mysql-versions::['5.7', '8']",
        "::set-output name=image-build::true",
    ] {
        assert!(lines.contains(&expected), "missing {expected:?} in\n{rendered}");
    }
}

#[test]
fn json_output_keeps_lists_native() {
    let decisions =
        selective_checks::evaluate(pr(&["README.md"]).with_label("full tests needed")).unwrap();
    let rendered = output::render(&decisions, OutputFormat::Json);
    let v: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(
        v["python-versions"],
        serde_json::json!(["3.7", "3.8", "3.9", "3.10"])
    );
    assert_eq!(
        v["postgres-exclude"],
        serde_json::json!([{ "python-version": "3.7" }])
    );
    assert_eq!(v["image-build"], serde_json::Value::Bool(true));
    assert_eq!(v["test-types"], ALL_TEST_TYPES);
}

#[test]
fn github_output_format() {
    let decisions = selective_checks::evaluate(pr(&["docs/index.rst"])).unwrap();
    let rendered = output::render(&decisions, OutputFormat::GithubOutput);
    assert!(rendered.lines().any(|l| l == "docs-build=true"));
    assert!(rendered.lines().any(|l| l == "test-types="));
}

#[test]
fn json_output_format() {
    let decisions = selective_checks::evaluate(pr(&["docs/index.rst"])).unwrap();
    let rendered = output::render(&decisions, OutputFormat::Json);
    let v: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(v["docs-build"], serde_json::Value::Bool(true));
    assert_eq!(v["python-versions"][0], "3.7");
}

#[test]
fn run_context_from_json() {
    let ctx: RunContext = serde_json::from_str(
        r#"{
            "files": ["airflow/cli/cli_parser.py"],
            "commit_ref": "abc",
            "github_event": "pull_request"
        }"#,
    )
    .unwrap();
    let outputs = outputs_for(ctx);
    assert_eq!(outputs["test-types"], "Always CLI");
}
