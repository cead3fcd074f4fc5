//! 에러 타입 -- 도메인별 에러 정의
//!
//! 패킷 단위 경로(`portguard-ebpf-common`)는 에러를 만들지 않고 항상 Pass로 수렴합니다.
//! 여기의 에러는 설정 로딩, 프로그램 로드/어태치, 맵 접근 등 제어 평면에서만 발생합니다.

/// portguard 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum PortguardError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 라이프사이클 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// XDP 필터 에러
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 라이프사이클 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("pipeline is not running")]
    NotRunning,
}

/// XDP 필터 에러
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// eBPF 오브젝트 로드 실패
    #[error("ebpf load failed: {0}")]
    EbpfLoad(String),

    /// eBPF 맵 접근 실패
    #[error("ebpf map error: {0}")]
    EbpfMap(String),

    /// XDP 어태치/디태치 실패
    #[error("xdp attach failed on '{interface}': {reason}")]
    Attach { interface: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_into_top_level() {
        let err: PortguardError = ConfigError::InvalidValue {
            field: "filter.target_port".to_owned(),
            reason: "must be in 1..=65535".to_owned(),
        }
        .into();
        assert!(matches!(err, PortguardError::Config(_)));
        assert_eq!(
            err.to_string(),
            "config error: invalid config value for 'filter.target_port': must be in 1..=65535"
        );
    }

    #[test]
    fn filter_error_display_includes_interface() {
        let err = FilterError::Attach {
            interface: "lo".to_owned(),
            reason: "permission denied".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "xdp attach failed on 'lo': permission denied"
        );
    }

    #[test]
    fn pipeline_state_errors_display() {
        assert_eq!(
            PipelineError::AlreadyRunning.to_string(),
            "pipeline is already running"
        );
        assert_eq!(PipelineError::NotRunning.to_string(), "pipeline is not running");
    }

    #[test]
    fn io_error_converts_into_top_level() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "bpffs");
        let err = PortguardError::from(io);
        assert!(matches!(err, PortguardError::Io(_)));
    }
}
