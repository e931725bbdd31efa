use devdrill::config::{Config, ConfigError};

use super::FIXTURES_PATH;

#[test]
fn test_load_strict_config() {
    let path = format!("{}/configs/strict.toml", FIXTURES_PATH);
    let config = Config::from_file(&path).expect("Failed to load config");

    assert_eq!(config.limits.wall_time_ms, Some(1000));
    assert_eq!(config.limits.max_output_lines, Some(5));
    assert!(config.evaluation.strict_entry_point);
    assert_eq!(config.evaluation.message_limit, 100);
    assert_eq!(config.sandbox.max_concurrent, 2);
}

#[test]
fn test_load_invalid_zero_limit() {
    let path = format!("{}/configs/invalid_zero_limit.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_example_config_round_trips() {
    let config = Config::parse_toml(devdrill::EXAMPLE_CONFIG).expect("example config parses");
    assert_eq!(config.limits, devdrill::ExecutionLimits::default());
}

#[test]
fn test_partial_limits_section_keeps_defaults() {
    let config = Config::parse_toml("[limits]\nwall_time_ms = 2000\n").expect("config parses");
    let defaults = devdrill::ExecutionLimits::default();

    assert_eq!(config.limits.wall_time_ms, Some(2000));
    assert_eq!(config.limits.loop_iteration_limit, Some(10_000_000));
    assert_eq!(config.limits.max_code_length, defaults.max_code_length);
    assert_eq!(config.limits.max_output_lines, defaults.max_output_lines);
}
