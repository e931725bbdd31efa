use std::time::{Duration, Instant};

use devdrill::{ExecutionLimits, Sandbox, SandboxError};

#[tokio::test]
async fn test_runaway_loop_returns_within_budget() {
    let sandbox = Sandbox::new(
        ExecutionLimits::default()
            .with_wall_time_ms(200)
            .with_loop_iteration_limit(3_000_000),
    );

    let started = Instant::now();
    let result = sandbox.run("let n = 0;\nwhile (true) { n = (n + 7) % 13; }").await;

    assert!(matches!(result, Err(SandboxError::Timeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_deep_recursion_is_stopped() {
    let sandbox = Sandbox::new(ExecutionLimits::default().with_recursion_limit(64));
    let result = sandbox
        .invoke("function down(n) { return down(n + 1); }", "down", &[serde_json::json!(0)])
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_concurrent_runs_share_slots() {
    let sandbox = Sandbox::default().with_max_concurrent(2);

    let runs: Vec<_> = (0..6)
        .map(|i| {
            let sandbox = sandbox.clone();
            tokio::spawn(async move { sandbox.run(&format!("console.log({i} * 2);")).await })
        })
        .collect();

    for (i, handle) in runs.into_iter().enumerate() {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.logs, vec![(i * 2).to_string()]);
    }
}

#[tokio::test]
async fn test_contexts_do_not_leak_state() {
    let sandbox = Sandbox::default();
    sandbox.run("var leaked = 42;").await.unwrap();

    let outcome = sandbox.run("console.log(typeof leaked);").await.unwrap();
    assert_eq!(outcome.logs, vec!["undefined"]);
}
