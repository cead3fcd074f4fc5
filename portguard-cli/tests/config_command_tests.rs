//! Integration tests for `portguard config` and the map-backed commands.
//!
//! Config tests use real TOML files; port/stats tests drive the command
//! handlers against in-memory maps.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use portguard_cli::cli::PortAction;
use portguard_cli::commands::{config, port, stats};
use portguard_core::config::PortguardConfig;
use portguard_ebpf_engine::portguard_ebpf_common::{
    AtomicConfigStore, PortPolicy, Verdict, evaluate,
};
use portguard_ebpf_engine::{InMemoryMaps, PortControl};

#[tokio::test]
async fn test_config_validate_valid_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("portguard.toml");
    fs::write(
        &config_path,
        "[general]\nlog_level = \"info\"\n\n[filter]\ninterface = \"eth0\"\ntarget_port = 22\n",
    )
    .expect("should write config");

    let report = config::validation_report(&config_path, PortguardConfig::load(&config_path).await);

    assert!(report.valid, "errors: {:?}", report.errors);
}

#[tokio::test]
async fn test_config_validate_malformed_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("bad.toml");
    fs::write(&config_path, "[filter\ntarget_port = 22\n").expect("should write bad config");

    let report = config::validation_report(&config_path, PortguardConfig::load(&config_path).await);

    assert!(!report.valid);
}

#[tokio::test]
async fn test_config_validate_rejects_port_zero() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("zero.toml");
    fs::write(&config_path, "[filter]\ntarget_port = 0\n").expect("should write config");

    let report = config::validation_report(&config_path, PortguardConfig::load(&config_path).await);

    assert!(!report.valid);
    assert!(report.errors[0].contains("target_port"));
}

#[tokio::test]
async fn test_config_validate_missing_file_is_invalid() {
    let path = Path::new("/nonexistent/portguard.toml");

    let report = config::validation_report(path, PortguardConfig::load(path).await);

    assert!(!report.valid);
}

#[tokio::test]
async fn test_config_show_reflects_file_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("portguard.toml");
    fs::write(&config_path, "[filter]\npolicy = \"process\"\n").expect("should write config");

    let loaded = PortguardConfig::load(&config_path).await.expect("valid");
    let report = config::show_report(&config_path, &loaded, Some("filter".to_owned()))
        .expect("known section");

    assert!(report.config_toml.contains("policy = \"process\""));
}

#[test]
fn test_port_set_is_seen_by_next_packet() {
    let mut maps = InMemoryMaps::new();
    let frame = tcp_frame(9090);

    assert_eq!(evaluate(&frame[..], &PortPolicy, &maps, &maps), Verdict::Pass);

    port::apply(&mut maps, &PortAction::Set { port: 9090 }).expect("set");
    assert_eq!(evaluate(&frame[..], &PortPolicy, &maps, &maps), Verdict::Drop);

    port::apply(&mut maps, &PortAction::Clear).expect("clear");
    assert_eq!(evaluate(&frame[..], &PortPolicy, &maps, &maps), Verdict::Pass);

    let report = stats::build_report(&maps, Path::new("/pins"), "port").expect("stats");
    assert_eq!(report.stats.total, 3);
    assert_eq!(report.stats.dropped, 1);
    assert_eq!(report.target_port, 4040);
}

#[test]
fn test_stats_report_ignores_unrelated_config_store() {
    // the report reads the port from the maps, not from the store the packet saw
    let unrelated = AtomicConfigStore::with_port(22);
    let maps = InMemoryMaps::new();
    evaluate(&tcp_frame(22)[..], &PortPolicy, &unrelated, &maps);

    let report = stats::build_report(&maps, Path::new("/pins"), "port").expect("stats");

    assert_eq!(report.stats.dropped, 1);
    assert_eq!(report.target_port, 4040);
    assert_eq!(maps.read_target_port().expect("read"), None);
}

/// TCP SYN frame to 127.0.0.1:dest_port
fn tcp_frame(dest_port: u16) -> Vec<u8> {
    let mut buf = vec![0u8; 54];
    buf[12..14].copy_from_slice(&0x0800u16.to_be_bytes());
    buf[14] = 0x45;
    buf[23] = 6;
    buf[26..30].copy_from_slice(&[127, 0, 0, 1]);
    buf[30..34].copy_from_slice(&[127, 0, 0, 1]);
    buf[34..36].copy_from_slice(&50000u16.to_be_bytes());
    buf[36..38].copy_from_slice(&dest_port.to_be_bytes());
    buf[46] = 0x50;
    buf[47] = 0x02;
    buf
}
