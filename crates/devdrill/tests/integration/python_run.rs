use devdrill::{Language, RunRequest, RunResponse, Runner};

use super::fixture_source;

#[tokio::test]
async fn test_greeting_program() {
    let runner = Runner::with_defaults();
    let request = RunRequest::new(fixture_source("greeting.py"), Language::Python);

    let response = runner.run(&request).await;
    assert_eq!(
        response,
        RunResponse::output("Hello, Ada\nAda will be 37\n3\n2.5 1024 2")
    );
}

#[tokio::test]
async fn test_division_by_zero_stops_the_program() {
    let runner = Runner::with_defaults();
    let request = RunRequest::new(fixture_source("divide_by_zero.py"), Language::Python);

    let response = runner.run(&request).await;
    assert_eq!(
        response,
        RunResponse::error("Python execution error: ZeroDivisionError: division by zero (line 3)")
    );
}

#[tokio::test]
async fn test_empty_python_output() {
    let runner = Runner::with_defaults();
    let request = RunRequest::new("x = 1\n# nothing printed", Language::Python);

    let response = runner.run(&request).await;
    assert_eq!(
        response,
        RunResponse::output("Python code executed successfully (no output)")
    );
}
