//! Integration tests for configuration loading

use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use trafficmeter::domain::TdtWindow;
use trafficmeter::infra::Config;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[site]
id = "shopfront"

[sensors]
bus = "/dev/i2c-3"
entry_address = 0x32
exit_address = 0x33

[timing]
poll_interval_ms = 25
event_timeout_ms = 1500
reset_time_ms = 750

[calibration]
min_tdt_mm = 95
max_tdt_mm = 395
entry_baseline_mm = 805
exit_baseline_mm = 790

[logging]
logs_dir = "/var/log/trafficmeter"
file_name_format = "{date}_traffic.csv"

[metrics]
interval_secs = 30
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.site_id(), "shopfront");
    assert_eq!(config.i2c_bus(), "/dev/i2c-3");
    assert_eq!(config.entry_sensor_address(), 0x32);
    assert_eq!(config.exit_sensor_address(), 0x33);
    assert_eq!(config.poll_interval(), Duration::from_millis(25));
    assert_eq!(config.event_timeout(), Duration::from_millis(1500));
    assert_eq!(config.reset_time(), Duration::from_millis(750));
    assert_eq!(config.tdt_window(), TdtWindow::new(95, 395));
    assert_eq!(config.baseline().entry_mm, 805);
    assert_eq!(config.baseline().exit_mm, 790);
    assert_eq!(config.logs_dir(), "/var/log/trafficmeter");
    assert_eq!(config.file_name_format(), "{date}_traffic.csv");
    assert_eq!(config.metrics_interval_secs(), 30);
}

#[test]
fn test_missing_sections_fall_back_to_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(
            br#"
[site]
id = "minimal"
"#,
        )
        .unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.site_id(), "minimal");
    assert_eq!(config.entry_sensor_address(), 0x30);
    assert_eq!(config.poll_interval(), Duration::from_millis(50));
    assert_eq!(config.tdt_window(), TdtWindow::new(8190, 8190));
}

#[test]
fn test_unreadable_path_falls_back_to_defaults() {
    let config = Config::load_from_path("/nonexistent/trafficmeter.toml");
    assert_eq!(config.site_id(), "trafficmeter");
    assert_eq!(config.logs_dir(), "logs");
}
