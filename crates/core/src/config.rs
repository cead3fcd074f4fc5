//! 설정 관리 -- portguard.toml 파싱 및 런타임 설정
//!
//! [`PortguardConfig`]는 데몬과 CLI가 공유하는 최상위 설정 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`PORTGUARD_FILTER_INTERFACE=eth0` 형식)
//! 3. 설정 파일 (`portguard.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), portguard_core::error::PortguardError> {
//! use portguard_core::config::PortguardConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = PortguardConfig::load("portguard.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = PortguardConfig::parse("[filter]\ntarget_port = 9090")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, PortguardError};

/// 기본 설정 파일 경로
pub const DEFAULT_CONFIG_PATH: &str = "/etc/portguard/portguard.toml";

/// 허용되는 로그 레벨
pub const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
/// 허용되는 로그 형식
pub const VALID_LOG_FORMATS: [&str; 2] = ["json", "pretty"];
/// 허용되는 XDP 어태치 모드
pub const VALID_XDP_MODES: [&str; 3] = ["skb", "native", "hw"];
/// 허용되는 필터 정책
pub const VALID_POLICIES: [&str; 2] = ["port", "process"];

/// portguard 통합 설정
///
/// `portguard.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortguardConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// XDP 필터 설정
    #[serde(default)]
    pub filter: FilterConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl PortguardConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PortguardError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// [`load`](Self::load)와 같지만 파일이 없으면 기본값에서 시작합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, PortguardError> {
        let path = path.as_ref();
        let mut config = match Self::from_file(path).await {
            Ok(config) => config,
            Err(PortguardError::Config(ConfigError::FileNotFound { .. })) => {
                debug!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, PortguardError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PortguardError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                PortguardError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, PortguardError> {
        toml::from_str(toml_str).map_err(|e| {
            PortguardError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `PORTGUARD_{SECTION}_{FIELD}`
    /// 예: `PORTGUARD_FILTER_TARGET_PORT=9090`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "PORTGUARD_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "PORTGUARD_GENERAL_LOG_FORMAT");

        // Filter
        override_string(&mut self.filter.interface, "PORTGUARD_FILTER_INTERFACE");
        override_string(&mut self.filter.xdp_mode, "PORTGUARD_FILTER_XDP_MODE");
        override_string(&mut self.filter.policy, "PORTGUARD_FILTER_POLICY");
        override_u16(&mut self.filter.target_port, "PORTGUARD_FILTER_TARGET_PORT");
        override_string(&mut self.filter.object_path, "PORTGUARD_FILTER_OBJECT_PATH");
        override_string(&mut self.filter.pin_path, "PORTGUARD_FILTER_PIN_PATH");
        override_u64(
            &mut self.filter.stats_interval_secs,
            "PORTGUARD_FILTER_STATS_INTERVAL_SECS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "PORTGUARD_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "PORTGUARD_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "PORTGUARD_METRICS_PORT");
        override_string(&mut self.metrics.endpoint, "PORTGUARD_METRICS_ENDPOINT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PortguardError> {
        one_of("general.log_level", &self.general.log_level, &VALID_LOG_LEVELS)?;
        one_of("general.log_format", &self.general.log_format, &VALID_LOG_FORMATS)?;
        one_of("filter.xdp_mode", &self.filter.xdp_mode, &VALID_XDP_MODES)?;
        one_of("filter.policy", &self.filter.policy, &VALID_POLICIES)?;

        if self.filter.interface.is_empty() {
            return Err(invalid("filter.interface", "interface must not be empty"));
        }

        if self.filter.target_port == 0 {
            return Err(invalid("filter.target_port", "must be in 1..=65535"));
        }

        if self.filter.stats_interval_secs == 0 {
            return Err(invalid(
                "filter.stats_interval_secs",
                "must be greater than 0",
            ));
        }

        if self.filter.pin_path.is_empty() {
            return Err(invalid("filter.pin_path", "pin path must not be empty"));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid(
                "metrics.port",
                "must be in 1..=65535 when metrics are enabled",
            ));
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// XDP 필터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// 어태치할 네트워크 인터페이스
    pub interface: String,
    /// XDP 모드 (skb, native, hw)
    pub xdp_mode: String,
    /// 필터 정책 (port, process)
    pub policy: String,
    /// 포트 정책이 차단하는 TCP 목적지 포트
    pub target_port: u16,
    /// 컴파일된 eBPF 오브젝트 경로
    pub object_path: String,
    /// 맵을 고정(pin)할 bpffs 디렉토리
    pub pin_path: String,
    /// 통계 폴링 주기 (초)
    pub stats_interval_secs: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            interface: "lo".to_owned(),
            xdp_mode: "skb".to_owned(),
            policy: "port".to_owned(),
            target_port: 4040,
            object_path: "target/bpfel-unknown-none/release/portguard-ebpf".to_owned(),
            pin_path: "/sys/fs/bpf/portguard".to_owned(),
            stats_interval_secs: 5,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9109,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 검증 헬퍼 ---

fn invalid(field: &str, reason: &str) -> PortguardError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
    .into()
}

fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), PortguardError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(invalid(
        field,
        &format!("must be one of: {}", allowed.join(", ")),
    ))
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = PortguardConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.filter.interface, "lo");
        assert_eq!(config.filter.xdp_mode, "skb");
        assert_eq!(config.filter.policy, "port");
        assert_eq!(config.filter.target_port, 4040);
        assert_eq!(config.filter.stats_interval_secs, 5);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = PortguardConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = PortguardConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.filter.target_port, 4040);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[filter]
interface = "ens3"
target_port = 9090
"#;
        let config = PortguardConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.filter.interface, "ens3");
        assert_eq!(config.filter.target_port, 9090);
        assert_eq!(config.filter.policy, "port");
    }

    #[test]
    fn from_str_full_toml() {
        let toml = r#"
[general]
log_level = "warn"
log_format = "pretty"

[filter]
interface = "eth1"
xdp_mode = "native"
policy = "process"
target_port = 22
object_path = "/usr/lib/portguard/portguard-ebpf"
pin_path = "/sys/fs/bpf/pg-test"
stats_interval_secs = 10

[metrics]
enabled = true
listen_addr = "0.0.0.0"
port = 9200
endpoint = "/metrics"
"#;
        let config = PortguardConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_format, "pretty");
        assert_eq!(config.filter.xdp_mode, "native");
        assert_eq!(config.filter.policy, "process");
        assert_eq!(config.filter.object_path, "/usr/lib/portguard/portguard-ebpf");
        assert_eq!(config.filter.stats_interval_secs, 10);
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.port, 9200);
        config.validate().unwrap();
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let result = PortguardConfig::parse("invalid = [[[toml");
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            PortguardError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn from_str_out_of_range_port_returns_error() {
        let result = PortguardConfig::parse("[filter]\ntarget_port = 70000");
        assert!(matches!(
            result.unwrap_err(),
            PortguardError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = PortguardConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = PortguardConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_invalid_xdp_mode() {
        let mut config = PortguardConfig::default();
        config.filter.xdp_mode = "turbo".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("xdp_mode"));
    }

    #[test]
    fn validate_rejects_unknown_policy() {
        let mut config = PortguardConfig::default();
        config.filter.policy = "pid".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("filter.policy"));
    }

    #[test]
    fn validate_rejects_empty_interface() {
        let mut config = PortguardConfig::default();
        config.filter.interface = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("interface"));
    }

    #[test]
    fn validate_rejects_port_zero() {
        let mut config = PortguardConfig::default();
        config.filter.target_port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("target_port"));
    }

    #[test]
    fn validate_rejects_zero_stats_interval() {
        let mut config = PortguardConfig::default();
        config.filter.stats_interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("stats_interval_secs"));
    }

    #[test]
    fn validate_rejects_empty_pin_path() {
        let mut config = PortguardConfig::default();
        config.filter.pin_path = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pin_path"));
    }

    #[test]
    fn validate_ignores_metrics_port_when_disabled() {
        let mut config = PortguardConfig::default();
        config.metrics.port = 0;
        config.validate().unwrap();
        config.metrics.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_PORTGUARD_STR", "overridden") };
        override_string(&mut val, "TEST_PORTGUARD_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_PORTGUARD_STR") };
    }

    #[test]
    fn env_override_bool_invalid_keeps_original() {
        let mut val = false;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_PORTGUARD_BOOL_BAD", "not-a-bool") };
        override_bool(&mut val, "TEST_PORTGUARD_BOOL_BAD");
        assert!(!val); // 원래 값 유지
        unsafe { std::env::remove_var("TEST_PORTGUARD_BOOL_BAD") };
    }

    #[test]
    fn env_override_u16_valid() {
        let mut val = 4040u16;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_PORTGUARD_U16", "9090") };
        override_u16(&mut val, "TEST_PORTGUARD_U16");
        assert_eq!(val, 9090);
        unsafe { std::env::remove_var("TEST_PORTGUARD_U16") };
    }

    #[test]
    fn env_override_u16_out_of_range_keeps_original() {
        let mut val = 4040u16;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_PORTGUARD_U16_BAD", "65536") };
        override_u16(&mut val, "TEST_PORTGUARD_U16_BAD");
        assert_eq!(val, 4040);
        unsafe { std::env::remove_var("TEST_PORTGUARD_U16_BAD") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = 5u64;
        override_u64(&mut val, "TEST_PORTGUARD_NONEXISTENT_12345");
        assert_eq!(val, 5);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = PortguardConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = PortguardConfig::parse(&toml_str).unwrap();
        assert_eq!(config.filter.interface, parsed.filter.interface);
        assert_eq!(config.filter.target_port, parsed.filter.target_port);
        assert_eq!(config.metrics.port, parsed.metrics.port);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = PortguardConfig::from_file("/nonexistent/path/portguard.toml").await;
        assert!(matches!(
            result.unwrap_err(),
            PortguardError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
