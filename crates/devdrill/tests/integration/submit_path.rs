use devdrill::rewrite::ScreenError;
use devdrill::{Config, Language, Runner, SubmitError, SubmitRequest};

use super::{FIXTURES_PATH, fixture_source, fixture_task};

fn submission(source: &str, task: &str) -> SubmitRequest {
    SubmitRequest {
        code: fixture_source(source),
        task: fixture_task(task),
        language: None,
    }
}

#[tokio::test]
async fn test_correct_fizzbuzz_earns_full_points() {
    let runner = Runner::with_defaults();
    let response = runner
        .submit(&submission("fizzbuzz.js", "fizzbuzz.json"))
        .await
        .expect("submission accepted");

    let evaluation = response.evaluation;
    assert!(evaluation.passed);
    assert_eq!(evaluation.score, 20);
    assert_eq!(evaluation.test_results.len(), 4);
    assert_eq!(
        evaluation.feedback,
        "Excellent! You passed all 4 test cases and earned 20 points!"
    );
}

#[tokio::test]
async fn test_off_by_one_fails_every_case() {
    let runner = Runner::with_defaults();
    let response = runner
        .submit(&submission("fizzbuzz_off_by_one.js", "fizzbuzz.json"))
        .await
        .expect("submission accepted");

    let evaluation = response.evaluation;
    assert!(!evaluation.passed);
    assert_eq!(evaluation.score, 0);
    assert_eq!(
        evaluation.test_results[0].error.as_deref(),
        Some(r#"Expected ["1"], got []"#)
    );
    assert!(evaluation.feedback.starts_with("You passed 0 out of 4 test cases."));
}

#[tokio::test]
async fn test_object_results_compare_structurally() {
    let runner = Runner::with_defaults();
    let response = runner
        .submit(&submission("word_count.js", "word_count.json"))
        .await
        .expect("submission accepted");

    let evaluation = response.evaluation;
    assert!(evaluation.passed, "{:?}", evaluation.test_results);
    assert_eq!(evaluation.test_results[0].description, "repeated &lt;words&gt;");
}

#[tokio::test]
async fn test_strict_config_requires_named_entry() {
    let config = Config::from_file(format!("{FIXTURES_PATH}/configs/strict.toml")).unwrap();
    let runner = Runner::new(config);
    let mut request = submission("fizzbuzz.js", "fizzbuzz.json");
    request.code = request.code.replace("fizzBuzz", "fizz_buzz");

    let evaluation = runner.submit(&request).await.unwrap().evaluation;
    assert!(!evaluation.passed);
    assert_eq!(
        evaluation.feedback,
        "Code evaluation failed: fizzBuzz is not defined"
    );
}

#[tokio::test]
async fn test_loose_config_grades_renamed_function() {
    let runner = Runner::with_defaults();
    let mut request = submission("fizzbuzz.js", "fizzbuzz.json");
    request.code = request.code.replace("fizzBuzz", "fizz_buzz");

    let evaluation = runner.submit(&request).await.unwrap().evaluation;
    assert!(evaluation.passed);
}

#[tokio::test]
async fn test_python_submission_is_refused() {
    let runner = Runner::with_defaults();
    let mut request = submission("fizzbuzz.js", "fizzbuzz.json");
    request.language = Some(Language::Python);

    let result = runner.submit(&request).await;
    assert_eq!(result, Err(SubmitError::UnsupportedLanguage(Language::Python)));
}

#[tokio::test]
async fn test_prototype_access_is_rejected() {
    let runner = Runner::with_defaults();
    let mut request = submission("fizzbuzz.js", "fizzbuzz.json");
    request.code.push_str("\nObject.prototype.polluted = true;\n");

    let result = runner.submit(&request).await;
    assert!(matches!(
        result,
        Err(SubmitError::Rejected(ScreenError::UnsafePattern(_)))
    ));
}

#[test]
fn test_submit_request_json_shape() {
    let json = format!(
        r#"{{"code": "function fizzBuzz() {{}}", "task": {}}}"#,
        std::fs::read_to_string(format!("{FIXTURES_PATH}/tasks/fizzbuzz.json")).unwrap()
    );
    let request: SubmitRequest = serde_json::from_str(&json).unwrap();
    assert!(request.language.is_none());
    assert_eq!(request.task.function_name, "fizzBuzz");
}
