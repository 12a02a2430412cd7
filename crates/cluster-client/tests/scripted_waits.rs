//! Waits and queries against a scripted cluster.
//!
//! Every test runs on virtual time: a five-minute status wait finishes
//! instantly, and elapsed time is asserted exactly.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use cluster_client::{ClusterError, ResourceQuery, StatusMatch};
use cluster_test_utils::*;
use poller::RetryPolicy;
use serde_json::json;
use std::time::Duration;

const POD_LIST: &str = "get pods -n demo";

fn pod_phase_command() -> String {
    format!("get pod {TEST_APP_POD} -n {TEST_NAMESPACE} -o jsonpath={{.status.phase}}")
}

#[test]
fn test_wait_for_pod_appears_on_third_attempt() {
    init_tracing();
    let runner = ScriptedRunner::new().on(
        POD_LIST,
        [
            ok(pod_list_without_app()),
            ok(pod_list_without_app()),
            ok(pod_list_with_app()),
        ],
    );
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    let pod = client
        .wait_for_pod(TEST_APP_POD_PATTERN, TEST_NAMESPACE)
        .expect("wait should not error");

    assert_eq!(pod.as_deref(), Some(TEST_APP_POD));
    assert_eq!(runner.count(POD_LIST), 3);
    assert_eq!(clock.elapsed(), Duration::from_secs(10));
}

#[test]
fn test_wait_for_pod_times_out_after_thirteen_attempts() {
    let runner = ScriptedRunner::new().on(POD_LIST, [ok(pod_list_without_app())]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    let pod = client
        .wait_for_pod(TEST_APP_POD_PATTERN, TEST_NAMESPACE)
        .expect("timing out is not an error");

    assert_eq!(pod, None);
    assert_eq!(runner.count(POD_LIST), 13);
    assert_eq!(clock.elapsed(), Duration::from_secs(60));
}

#[test]
fn test_wait_for_pod_treats_list_failure_as_transient() {
    let runner = ScriptedRunner::new().on(
        POD_LIST,
        [
            fail(1, "The connection to the server was refused"),
            timed_out(),
            ok(pod_list_with_app()),
        ],
    );
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    let pod = client
        .wait_for_pod(TEST_APP_POD_PATTERN, TEST_NAMESPACE)
        .expect("wait should not error");

    assert_eq!(pod.as_deref(), Some(TEST_APP_POD));
}

#[test]
fn test_wait_for_pod_rejects_invalid_pattern() {
    let runner = ScriptedRunner::new();
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    let result = client.wait_for_pod("nodejs-(", TEST_NAMESPACE);

    assert!(matches!(result, Err(ClusterError::InvalidPattern(_))));
    assert!(runner.calls().is_empty());
}

#[test]
fn test_find_pod_is_a_single_hard_checked_query() {
    let runner = ScriptedRunner::new().on(POD_LIST, [fail(1, "forbidden")]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    let result = client.find_pod(TEST_APP_POD_PATTERN, TEST_NAMESPACE);

    assert!(matches!(
        result,
        Err(ClusterError::CommandFailed { exit_code: Some(1), ref stderr, .. }) if stderr == "forbidden"
    ));
    assert_eq!(runner.count(POD_LIST), 1);
}

#[test]
fn test_find_pod_returns_none_for_empty_namespace() {
    let runner = ScriptedRunner::new().on(POD_LIST, [ok("")]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    assert_eq!(
        client
            .find_pod(TEST_APP_POD_PATTERN, TEST_NAMESPACE)
            .expect("query should succeed"),
        None
    );
    assert_eq!(
        client.pod_names(TEST_NAMESPACE).expect("query should succeed"),
        Vec::<String>::new()
    );
}

#[test]
fn test_wait_for_pod_running() {
    let runner = ScriptedRunner::new().on(
        &pod_phase_command(),
        [ok("Pending"), ok("Pending"), ok("Running")],
    );
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    let running = client
        .wait_for_pod_running(TEST_APP_POD, TEST_NAMESPACE)
        .expect("wait should not error");

    assert!(running);
    assert_eq!(clock.elapsed(), Duration::from_secs(10));
}

#[test]
fn test_wait_for_pod_status_gives_up_after_status_timeout() {
    let runner = ScriptedRunner::new().on(&pod_phase_command(), [ok("CrashLoopBackOff")]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    let running = client
        .wait_for_pod_running(TEST_APP_POD, TEST_NAMESPACE)
        .expect("timing out is not an error");

    assert!(!running);
    // 1 + 300 / 5
    assert_eq!(runner.count(&pod_phase_command()), 61);
    assert_eq!(clock.elapsed(), Duration::from_secs(300));
}

#[test]
fn test_pod_status_is_none_when_pod_missing() {
    let runner = ScriptedRunner::new().on(
        &pod_phase_command(),
        [fail(1, "Error from server (NotFound): pods not found")],
    );
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    assert_eq!(client.pod_status(TEST_APP_POD, TEST_NAMESPACE), None);
}

#[test]
fn test_wait_for_deployment_ready_needs_every_condition() {
    let command = "get deployment nodejs-app -n demo -o jsonpath={.status.conditions[*].status}";
    let runner = ScriptedRunner::new().on(command, [ok(""), ok("True False"), ok("True True")]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    let conditions = client
        .wait_for_deployment_ready("nodejs-app", TEST_NAMESPACE)
        .expect("wait should not error");

    assert_eq!(conditions.as_deref(), Some("True True"));
    assert_eq!(runner.count(command), 3);
}

#[test]
fn test_malformed_observation_aborts_wait() {
    let runner = ScriptedRunner::new().on("get deployment web", [ok("not json at all")]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);
    let query = ResourceQuery::named("deployment", "web").in_namespace(TEST_NAMESPACE);
    let policy =
        RetryPolicy::timed(Duration::from_secs(5), Duration::from_secs(60)).expect("valid policy");

    let result = client.wait_for(
        &query,
        StatusMatch::json_pointer("/status/readyReplicas", json!(1)),
        &policy,
    );

    assert!(matches!(result, Err(ClusterError::MalformedObservation(_))));
    assert_eq!(runner.count("get deployment web"), 1);
    assert_eq!(clock.sleep_count(), 0);
}

#[test]
fn test_wait_for_json_pointer_status() {
    let runner = ScriptedRunner::new().on(
        "get deployment web",
        [
            ok(r#"{"status":{"readyReplicas":0}}"#),
            ok(r#"{"status":{"readyReplicas":1}}"#),
        ],
    );
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);
    let query = ResourceQuery::named("deployment", "web").in_namespace(TEST_NAMESPACE);
    let policy =
        RetryPolicy::timed(Duration::from_secs(2), Duration::from_secs(10)).expect("valid policy");

    let found = client
        .wait_for(
            &query,
            StatusMatch::json_pointer("/status/readyReplicas", json!(1)),
            &policy,
        )
        .expect("wait should not error");

    assert!(found.is_some());
    assert_eq!(clock.elapsed(), Duration::from_secs(2));
}

#[test]
fn test_retry_until_success_on_fifth_attempt() {
    let runner = ScriptedRunner::new().on(
        "get route web",
        [
            fail(1, "NotFound"),
            fail(1, "NotFound"),
            fail(1, "NotFound"),
            fail(1, "NotFound"),
            ok("web-demo.apps.example.com"),
        ],
    );
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);
    let query = ResourceQuery::named("route", "web")
        .in_namespace(TEST_NAMESPACE)
        .jsonpath("{.status.ingress[0].host}");

    let host = client
        .retry_until_success(&query, 5, Duration::from_secs(5))
        .expect("retry should not error");

    assert_eq!(host.as_deref(), Some("web-demo.apps.example.com"));
    assert_eq!(runner.count("get route web"), 5);
}

#[test]
fn test_retry_until_success_exhausted_returns_none() {
    let runner = ScriptedRunner::new().on("get route web", [fail(1, "NotFound")]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);
    let query = ResourceQuery::named("route", "web").in_namespace(TEST_NAMESPACE);

    let host = client
        .retry_until_success(&query, 5, Duration::from_secs(5))
        .expect("exhausting retries is not an error");

    assert_eq!(host, None);
    assert_eq!(runner.count("get route web"), 5);
}

#[test]
fn test_retry_until_success_accepts_blank_output() {
    let runner = ScriptedRunner::new().on("get deployment web", [ok("\n")]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);
    let query = ResourceQuery::named("deployment", "web")
        .in_namespace(TEST_NAMESPACE)
        .jsonpath("{.spec.template.spec.containers[0].envFrom}");

    let value = client
        .retry_until_success(&query, 3, Duration::from_secs(1))
        .expect("retry should not error");

    assert_eq!(value.as_deref(), Some(""));
}

#[test]
fn test_resource_jsonpath_with_wait_retries_failures() {
    let command = "get secret db -n demo -o jsonpath={.data.password}";
    let runner = ScriptedRunner::new().on(
        command,
        [fail(1, "NotFound"), fail(1, "NotFound"), ok("c2VjcmV0")],
    );
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    let value = client
        .resource_jsonpath("secret", "db", TEST_NAMESPACE, "{.data.password}", true)
        .expect("value should arrive within the retries");

    assert_eq!(value, "c2VjcmV0");
    assert_eq!(runner.count(command), 3);
}

#[test]
fn test_resource_jsonpath_without_wait_fails_fast() {
    let runner = ScriptedRunner::new().on("get secret db", [fail(1, "NotFound")]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    let result = client.resource_jsonpath("secret", "db", TEST_NAMESPACE, "{.data}", false);

    assert!(matches!(
        result,
        Err(ClusterError::QueryFailed { ref cause, .. }) if cause.contains("NotFound")
    ));
    assert_eq!(runner.count("get secret db"), 1);
}

#[test]
fn test_resource_jsonpath_with_wait_gives_up_after_retries() {
    let runner = ScriptedRunner::new().on("get secret db", [fail(1, "NotFound"), fail(2, "gone")]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    let result = client.resource_jsonpath("secret", "db", TEST_NAMESPACE, "{.data}", true);

    // the first read, then five retries
    assert_eq!(runner.count("get secret db"), 6);
    assert!(matches!(
        result,
        Err(ClusterError::QueryFailed { ref cause, .. }) if cause.starts_with("exit status 2")
    ));
}

#[test]
fn test_resource_jq_pipes_json_through_jq() {
    let document = r#"{"spec":{"replicas":2}}"#;
    let runner = ScriptedRunner::new()
        .on("get deployment web -n demo -o json", [ok(document)])
        .on("jq -rc", [ok("2\n")]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    let replicas = client
        .resource_jq("deployment", "web", TEST_NAMESPACE, ".spec.replicas", false)
        .expect("query should succeed");

    assert_eq!(replicas, "2");
    let calls = runner.calls();
    let jq = calls.last().expect("jq should have run");
    assert_eq!(jq.program, "jq");
    assert_eq!(jq.stdin.as_deref(), Some(document));
}

#[test]
fn test_resource_jq_skips_jq_when_get_fails() {
    let runner = ScriptedRunner::new()
        .on("get deployment web", [fail(1, "NotFound")])
        .on("jq -rc", [ok("unused")]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    let result = client.resource_jq("deployment", "web", TEST_NAMESPACE, ".spec", false);

    assert!(result.is_err());
    assert_eq!(runner.count("jq -rc"), 0);
}

#[test]
fn test_deployment_env_and_route_host() {
    let runner = ScriptedRunner::new()
        .on(
            "{.spec.template.spec.containers[0].env}",
            [ok(r#"[{"name":"DB_HOST","value":"postgres"}]"#)],
        )
        .on("get route web", [ok("web-demo.apps.example.com")]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    let env = client
        .deployment_env("web", TEST_NAMESPACE)
        .expect("env should be readable");
    let host = client
        .route_host("web", TEST_NAMESPACE)
        .expect("route should be readable");

    assert!(env.contains("DB_HOST"));
    assert_eq!(host, "web-demo.apps.example.com");
}

#[test]
fn test_expose_service() {
    let runner = ScriptedRunner::new().on(
        "expose svc/web -n demo --name=web",
        [ok("route.route.openshift.io/web exposed\n")],
    );
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    assert!(client
        .expose_service("web", TEST_NAMESPACE)
        .expect("expose should run"));
    assert_eq!(client.runner().count("expose svc/web"), 1);
}

#[test]
fn test_expose_service_reports_failure_as_false() {
    let runner = ScriptedRunner::new().on(
        "expose svc/web",
        [fail(1, "Error from server (AlreadyExists)")],
    );
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    assert!(!client
        .expose_service("web", TEST_NAMESPACE)
        .expect("expose should run"));
}

#[test]
fn test_has_resource_type() {
    let runner = ScriptedRunner::new()
        .on("get routes", [ok("")])
        .on("get widgets", [fail(1, "the server doesn't have a resource type \"widgets\"")]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    assert!(client.has_resource_type("routes"));
    assert!(!client.has_resource_type("widgets"));
}

#[test]
fn test_apply_sends_manifest_on_stdin() {
    let runner = ScriptedRunner::new().on("apply -f -", [ok("configmap/settings created\n")]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);
    let manifest = json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": { "name": "settings", "namespace": TEST_NAMESPACE },
        "data": { "mode": "test" }
    });

    let output = client.apply(&manifest).expect("apply should succeed");

    assert_eq!(output, "configmap/settings created\n");
    let calls = runner.calls();
    let stdin = calls[0].stdin.as_deref().expect("manifest on stdin");
    let sent: serde_json::Value = serde_json::from_str(stdin).expect("stdin should be JSON");
    assert_eq!(sent, manifest);
}

#[test]
fn test_apply_failure_is_an_error() {
    let runner = ScriptedRunner::new().on("apply -f -", [fail(1, "error validating data")]);
    let clock = ManualClock::new();
    let client = scripted_client(&runner, &clock);

    let result = client.apply(&json!({ "kind": "Nonsense" }));

    assert!(matches!(result, Err(ClusterError::CommandFailed { .. })));
}
