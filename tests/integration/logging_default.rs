//! Subscriber installation through `init_logging`.
//!
//! Only one global subscriber can be installed per process, so the successful install
//! and everything that depends on it live in a single test.

use super::test_utils::with_isolated_env;
use regionmap::error::ConfigError;
use regionmap::logging::{init_logging, LoggingConfig};
use std::fs;

#[test]
fn test_file_output_installs_once() {
    with_isolated_env(|temp| {
        // An unusable output variable is rejected before anything is installed
        std::env::set_var("REGIONMAP_LOG_OUTPUT", "both");
        match init_logging(None) {
            Err(ConfigError::Logging(msg)) => assert!(msg.contains("Invalid log output")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        std::env::remove_var("REGIONMAP_LOG_OUTPUT");

        // A bad config format is rejected too
        let bad_format = LoggingConfig {
            format: "xml".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            init_logging(Some(&bad_format)),
            Err(ConfigError::Logging(_))
        ));

        // An unusable format variable falls back to the configured format
        std::env::set_var("REGIONMAP_LOG_FORMAT", "xml");
        let log_file = temp.path().join("logs").join("regionmap.log");
        let config = LoggingConfig {
            format: "json".to_string(),
            output: "file".to_string(),
            file: log_file.clone(),
            ..LoggingConfig::default()
        };
        init_logging(Some(&config)).unwrap();
        assert!(log_file.exists());

        tracing::info!(target: "regionmap::logging_test", "subscriber ready");
        let contents = fs::read_to_string(&log_file).unwrap();
        let line = contents
            .lines()
            .find(|l| l.contains("subscriber ready"))
            .expect("event written to log file");
        let event: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(event["fields"]["message"], "subscriber ready");
        assert_eq!(event["level"], "INFO");

        // The global subscriber is already set
        assert!(matches!(init_logging(None), Err(ConfigError::Logging(_))));
    });
}
