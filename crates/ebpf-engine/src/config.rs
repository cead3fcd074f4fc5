//! 필터 엔진 설정 -- core 설정의 문자열 필드를 타입으로 해석
//!
//! [`EngineConfig`]는 core의 [`FilterConfig`]를 감싸고, 정책과 XDP 모드를
//! [`PolicyKind`] / [`XdpMode`]로 변환하는 접근자를 제공합니다.
//!
//! # 설정 예시 (TOML)
//! ```toml
//! interface = "lo"
//! xdp_mode = "native"
//! policy = "port"
//! target_port = 22
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use portguard_core::config::FilterConfig;
use portguard_core::error::{ConfigError, PortguardError};
use portguard_ebpf_common::{
    MAP_STATS, MAP_TARGET_PORT, PROG_PORT_FILTER, PROG_PROCESS_FILTER,
};

/// 필터 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// 설정 포트 직접 매칭 (`port_filter`)
    Port,
    /// 프로세스 휴리스틱 범위 필터 (`process_filter`)
    Process,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Port => "port",
            Self::Process => "process",
        }
    }

    /// 어태치할 XDP 프로그램 이름
    pub fn program_name(&self) -> &'static str {
        match self {
            Self::Port => PROG_PORT_FILTER,
            Self::Process => PROG_PROCESS_FILTER,
        }
    }

    /// `TARGET_PORT` 맵을 사용하는지 여부
    pub fn uses_target_port(&self) -> bool {
        matches!(self, Self::Port)
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = PortguardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "port" => Ok(Self::Port),
            "process" => Ok(Self::Process),
            other => Err(ConfigError::InvalidValue {
                field: "filter.policy".to_owned(),
                reason: format!("unknown policy '{other}', expected port or process"),
            }
            .into()),
        }
    }
}

/// XDP 어태치 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XdpMode {
    /// generic (SKB) 모드 -- 모든 드라이버 지원
    Skb,
    /// 드라이버 native 모드
    Native,
    /// NIC 하드웨어 오프로드
    Hw,
}

impl XdpMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skb => "skb",
            Self::Native => "native",
            Self::Hw => "hw",
        }
    }

    /// 어태치 실패 시 SKB 모드로 재시도할 수 있는지 여부
    pub fn can_fall_back(&self) -> bool {
        !matches!(self, Self::Skb)
    }

    #[cfg(target_os = "linux")]
    pub(crate) fn flags(&self) -> aya::programs::XdpFlags {
        use aya::programs::XdpFlags;
        match self {
            Self::Skb => XdpFlags::SKB_MODE,
            Self::Native => XdpFlags::DRV_MODE,
            Self::Hw => XdpFlags::HW_MODE,
        }
    }
}

impl fmt::Display for XdpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for XdpMode {
    type Err = PortguardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skb" => Ok(Self::Skb),
            "native" => Ok(Self::Native),
            "hw" => Ok(Self::Hw),
            other => Err(ConfigError::InvalidValue {
                field: "filter.xdp_mode".to_owned(),
                reason: format!("unknown xdp mode '{other}', expected skb, native or hw"),
            }
            .into()),
        }
    }
}

/// 필터 엔진 설정
///
/// core의 [`FilterConfig`]를 그대로 포함하며, 문자열 필드는 접근자에서 해석합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// core에서 가져온 기본 설정 (interface, xdp_mode, policy, target_port 등)
    #[serde(flatten)]
    pub base: FilterConfig,
}

impl EngineConfig {
    /// core FilterConfig에서 엔진 설정을 생성합니다.
    pub fn from_core(config: &FilterConfig) -> Self {
        Self {
            base: config.clone(),
        }
    }

    pub fn interface(&self) -> &str {
        &self.base.interface
    }

    pub fn policy(&self) -> Result<PolicyKind, PortguardError> {
        self.base.policy.parse()
    }

    pub fn xdp_mode(&self) -> Result<XdpMode, PortguardError> {
        self.base.xdp_mode.parse()
    }

    pub fn target_port(&self) -> u16 {
        self.base.target_port
    }

    pub fn object_path(&self) -> &Path {
        Path::new(&self.base.object_path)
    }

    pub fn pin_path(&self) -> &Path {
        Path::new(&self.base.pin_path)
    }

    /// 통계 폴링 주기
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.base.stats_interval_secs)
    }

    /// 고정된 맵 파일 경로
    pub fn map_pin(&self, map_name: &str) -> PathBuf {
        self.pin_path().join(map_name)
    }

    /// 엔진이 고정하는 모든 맵의 경로
    pub fn pinned_maps(&self) -> [PathBuf; 2] {
        [self.map_pin(MAP_TARGET_PORT), self.map_pin(MAP_STATS)]
    }
}
