use devdrill::{Config, Language, RunRequest, RunResponse, Runner};

use super::fixture_source;

#[tokio::test]
async fn test_playground_echoes_expressions() {
    let runner = Runner::with_defaults();
    let request = RunRequest::new(fixture_source("playground.js"), Language::JavaScript);

    let response = runner.run(&request).await;

    let expected = [
        "[\n  1,\n  2,\n  3\n]",
        "INFO: sorted",
        "6",
        "{\n  \"total\": 6,\n  \"numbers\": [\n    1,\n    2,\n    3\n  ]\n}",
    ]
    .join("\n");
    assert_eq!(response, RunResponse::output(expected));
}

#[tokio::test]
async fn test_return_value_is_reported() {
    let runner = Runner::with_defaults();
    let request = RunRequest::new("console.log('start');\nresult = 'done';", Language::JavaScript);

    let response = runner.run(&request).await;
    assert_eq!(response, RunResponse::output("start\nReturn value: \"done\""));
}

#[tokio::test]
async fn test_thrown_error_still_returns_output() {
    let runner = Runner::with_defaults();
    let request = RunRequest::new(
        "console.log('one');\nnull.property;\nconsole.log('unreached');",
        Language::JavaScript,
    );

    let response = runner.run(&request).await;
    assert!(!response.is_error());
    let text = response.text();
    assert!(text.starts_with("one\nERROR: "), "unexpected output: {text}");
    assert!(!text.contains("unreached"));
}

#[tokio::test]
async fn test_host_access_is_stripped() {
    let runner = Runner::with_defaults();
    let request = RunRequest::new(
        "console.log(typeof require, typeof process, typeof globalThis);",
        Language::JavaScript,
    );

    let response = runner.run(&request).await;
    assert_eq!(response, RunResponse::output("undefined undefined undefined"));
}

#[tokio::test]
async fn test_output_lines_are_capped() {
    let config = Config::parse_toml("[limits]\nmax_output_lines = 3\n").unwrap();
    let runner = Runner::new(config);
    let request = RunRequest::new(
        "for (let i = 0; i < 10; i++) console.log(i);",
        Language::JavaScript,
    );

    let response = runner.run(&request).await;
    assert_eq!(response, RunResponse::output("0\n1\n2\n[output truncated]"));
}
