//! 필터 엔진 -- XDP 프로그램 로드/어태치 및 맵 수명 관리
//!
//! [`FilterEngine`]은 XDP 필터의 전체 라이프사이클을 관리합니다.
//! 빌더 패턴([`FilterEngineBuilder`])으로 생성하며, [`Pipeline`] trait을 구현합니다.
//!
//! # 아키텍처
//! ```text
//! ┌───────────────────┐   pinned maps    ┌──────────────┐
//! │ port_filter /     │◀──TARGET_PORT────│ FilterEngine │◀── SIGHUP reload
//! │ process_filter    │───STATS─────────▶│ (userspace)  │──▶ FilterStats
//! │ (kernel, XDP)     │                  └──────────────┘
//! └───────────────────┘        ▲
//!                              └── portguard-cli (from_pins)
//! ```
//!
//! # 사용 예시
//! ```ignore
//! let mut engine = FilterEngine::builder()
//!     .config(EngineConfig::from_core(&config.filter))
//!     .build()?;
//!
//! engine.start().await?;
//! engine.set_target_port(9090)?;
//! let stats = engine.poll_stats()?;
//! ```

use tracing::info;

use portguard_core::error::{PipelineError, PortguardError};
use portguard_core::metrics as m;
use portguard_core::pipeline::{HealthStatus, Pipeline};

#[cfg(not(target_os = "linux"))]
use portguard_core::error::FilterError;

use crate::config::{EngineConfig, PolicyKind, XdpMode};
use crate::maps::PortControl;
use crate::stats::FilterStats;

/// XDP 필터 엔진
///
/// # 필드
/// - `config`: 엔진 설정
/// - `policy`, `mode`: 빌드 시 해석된 정책/요청 어태치 모드
/// - `attached_mode`: 실제로 어태치된 모드 (SKB 폴백 시 요청과 다름)
/// - `stats`: 통계 폴링 결과
///
/// # Linux 전용
/// `aya::Ebpf` 핸들은 Linux에서만 사용 가능합니다.
/// 다른 OS에서는 start() 시 에러를 반환합니다.
pub struct FilterEngine {
    config: EngineConfig,
    policy: PolicyKind,
    mode: XdpMode,
    running: bool,
    attached_mode: Option<XdpMode>,
    stats: FilterStats,
    /// 로드된 eBPF 오브젝트 핸들 (Linux 전용)
    #[cfg(target_os = "linux")]
    bpf: Option<aya::Ebpf>,
    #[cfg(target_os = "linux")]
    link: Option<aya::programs::xdp::XdpLinkId>,
    #[cfg(target_os = "linux")]
    maps: Option<crate::maps::FilterMaps>,
}

/// 필터 엔진 빌더
pub struct FilterEngineBuilder {
    config: Option<EngineConfig>,
}

impl FilterEngineBuilder {
    fn new() -> Self {
        Self { config: None }
    }

    /// 엔진 설정을 지정합니다.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 엔진을 생성합니다.
    ///
    /// # 에러
    /// - `PipelineError::InitFailed`: 설정이 누락된 경우
    /// - `ConfigError::InvalidValue`: 정책 또는 XDP 모드를 해석할 수 없는 경우
    pub fn build(self) -> Result<FilterEngine, PortguardError> {
        let config = self
            .config
            .ok_or_else(|| PipelineError::InitFailed("config is required".to_owned()))?;
        let policy = config.policy()?;
        let mode = config.xdp_mode()?;

        Ok(FilterEngine {
            config,
            policy,
            mode,
            running: false,
            attached_mode: None,
            stats: FilterStats::new(),
            #[cfg(target_os = "linux")]
            bpf: None,
            #[cfg(target_os = "linux")]
            link: None,
            #[cfg(target_os = "linux")]
            maps: None,
        })
    }
}

impl FilterEngine {
    /// 빌더를 반환합니다.
    pub fn builder() -> FilterEngineBuilder {
        FilterEngineBuilder::new()
    }

    /// 현재 설정을 반환합니다.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policy(&self) -> PolicyKind {
        self.policy
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 실제 어태치된 XDP 모드 (실행 중일 때만 `Some`)
    pub fn attached_mode(&self) -> Option<XdpMode> {
        self.attached_mode
    }

    /// 마지막으로 폴링한 통계를 반환합니다.
    pub fn stats(&self) -> &FilterStats {
        &self.stats
    }

    /// 실행 중인 필터의 맵 제어 핸들
    pub fn control(&mut self) -> Result<&mut dyn PortControl, PortguardError> {
        #[cfg(target_os = "linux")]
        {
            if let Some(maps) = self.maps.as_mut() {
                return Ok(maps as &mut dyn PortControl);
            }
        }
        Err(PipelineError::NotRunning.into())
    }

    /// 차단 포트를 변경합니다 (핫 리로드).
    ///
    /// 프로세스 정책은 `TARGET_PORT`를 읽지 않으므로 설정값만 갱신합니다.
    pub fn set_target_port(&mut self, port: u16) -> Result<(), PortguardError> {
        if self.policy.uses_target_port() {
            self.control()?.set_target_port(port)?;
            metrics::gauge!(m::TARGET_PORT).set(f64::from(port));
        }
        self.config.base.target_port = port;
        info!(port, policy = %self.policy, "target port updated");
        Ok(())
    }

    /// STATS 맵을 읽어 통계를 갱신합니다.
    pub fn poll_stats(&mut self) -> Result<&FilterStats, PortguardError> {
        let raw = self.control()?.read_stats()?;
        self.stats.update(raw);
        Ok(&self.stats)
    }

    /// XDP 프로그램을 로드하고 네트워크 인터페이스에 어태치합니다.
    ///
    /// 1. memlock 제한 해제, 핀 디렉토리 생성
    /// 2. 오브젝트 로드 (맵은 pin_path 아래 고정)
    /// 3. 정책 프로그램 로드 + 어태치 (실패 시 SKB 모드로 재시도)
    /// 4. 통계 슬롯 초기화, 차단 포트 기록
    #[cfg(target_os = "linux")]
    fn load_and_attach(&mut self) -> Result<(), PortguardError> {
        use aya::EbpfLoader;
        use aya::programs::{Xdp, XdpFlags};
        use portguard_core::error::FilterError;
        use tracing::{debug, warn};

        use crate::maps::FilterMaps;

        remove_memlock_rlimit();

        let pin_path = self.config.pin_path();
        std::fs::create_dir_all(pin_path)?;

        let object_path = self.config.object_path();
        let mut bpf = EbpfLoader::new()
            .map_pin_path(pin_path)
            .load_file(object_path)
            .map_err(|e| FilterError::EbpfLoad(format!("{}: {e}", object_path.display())))?;

        if let Err(e) = aya_log::EbpfLogger::init(&mut bpf) {
            debug!(error = %e, "eBPF logger not available");
        }

        let name = self.policy.program_name();
        let interface = self.config.interface().to_owned();
        let attach_error = |reason: String| FilterError::Attach {
            interface: interface.clone(),
            reason,
        };

        let program: &mut Xdp = bpf
            .program_mut(name)
            .ok_or_else(|| FilterError::EbpfLoad(format!("program '{name}' not found")))?
            .try_into()
            .map_err(|e: aya::programs::ProgramError| FilterError::EbpfLoad(e.to_string()))?;
        program
            .load()
            .map_err(|e| FilterError::EbpfLoad(format!("{name}: {e}")))?;

        let (link, attached) = match program.attach(&interface, self.mode.flags()) {
            Ok(link) => (link, self.mode),
            Err(e) if self.mode.can_fall_back() => {
                warn!(
                    interface = interface.as_str(),
                    requested = %self.mode,
                    error = %e,
                    "XDP attach failed, retrying in skb mode"
                );
                let link = program
                    .attach(&interface, XdpFlags::SKB_MODE)
                    .map_err(|e| attach_error(e.to_string()))?;
                (link, XdpMode::Skb)
            }
            Err(e) => return Err(attach_error(e.to_string()).into()),
        };

        info!(
            program = name,
            interface = interface.as_str(),
            xdp_mode = %attached,
            "XDP program attached"
        );

        let mut maps = FilterMaps::from_ebpf(&mut bpf)?;
        maps.reset_stats()?;
        if self.policy.uses_target_port() {
            maps.set_target_port(self.config.target_port())?;
            metrics::gauge!(m::TARGET_PORT).set(f64::from(self.config.target_port()));
        }

        self.bpf = Some(bpf);
        self.link = Some(link);
        self.maps = Some(maps);
        self.attached_mode = Some(attached);
        Ok(())
    }

    /// XDP 프로그램을 로드합니다 (비-Linux 스텁).
    #[cfg(not(target_os = "linux"))]
    fn load_and_attach(&mut self) -> Result<(), PortguardError> {
        Err(FilterError::EbpfLoad("eBPF is only supported on Linux".to_owned()).into())
    }

    /// XDP 프로그램을 디태치하고 고정된 맵을 제거합니다.
    #[cfg(target_os = "linux")]
    fn detach(&mut self) -> Result<(), PortguardError> {
        use aya::programs::Xdp;
        use portguard_core::error::FilterError;

        self.maps = None;
        self.attached_mode = None;

        if let (Some(mut bpf), Some(link)) = (self.bpf.take(), self.link.take()) {
            let name = self.policy.program_name();
            let program: &mut Xdp = bpf
                .program_mut(name)
                .ok_or_else(|| FilterError::EbpfLoad(format!("program '{name}' not found")))?
                .try_into()
                .map_err(|e: aya::programs::ProgramError| FilterError::EbpfLoad(e.to_string()))?;
            program.detach(link).map_err(|e| FilterError::Attach {
                interface: self.config.interface().to_owned(),
                reason: e.to_string(),
            })?;
        }

        self.remove_pinned_maps();
        Ok(())
    }

    /// XDP 프로그램을 디태치합니다 (비-Linux 스텁).
    #[cfg(not(target_os = "linux"))]
    fn detach(&mut self) -> Result<(), PortguardError> {
        self.attached_mode = None;
        Ok(())
    }

    /// pin_path 아래 고정된 맵 파일을 지웁니다. 없는 파일은 무시합니다.
    fn remove_pinned_maps(&self) {
        for pin in self.config.pinned_maps() {
            match std::fs::remove_file(&pin) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %pin.display(), error = %e, "failed to unpin map")
                }
            }
        }
    }
}

/// 구형 커널에서 BPF 맵 할당에 필요한 memlock 제한을 해제합니다.
#[cfg(target_os = "linux")]
fn remove_memlock_rlimit() {
    let rlim = libc::rlimit {
        rlim_cur: libc::RLIM_INFINITY,
        rlim_max: libc::RLIM_INFINITY,
    };
    // SAFETY: 유효한 rlimit 구조체 포인터를 전달하며, 실패는 반환값으로만 보고됩니다.
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        tracing::debug!(ret, "failed to remove memlock rlimit");
    }
}

impl Pipeline for FilterEngine {
    /// XDP 프로그램을 로드하고 엔진을 시작합니다.
    async fn start(&mut self) -> Result<(), PortguardError> {
        if self.running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        info!(
            interface = self.config.interface(),
            xdp_mode = %self.mode,
            policy = %self.policy,
            target_port = self.config.target_port(),
            "starting filter engine"
        );

        // 로드 후 어태치가 실패해도 맵은 이미 고정되어 있음
        if let Err(e) = self.load_and_attach() {
            self.remove_pinned_maps();
            return Err(e);
        }
        self.stats.reset();
        self.running = true;
        Ok(())
    }

    /// XDP 프로그램을 디태치하고 리소스를 정리합니다.
    async fn stop(&mut self) -> Result<(), PortguardError> {
        if !self.running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping filter engine");

        self.running = false;
        self.detach()
    }

    /// 엔진의 현재 상태를 확인합니다.
    async fn health_check(&self) -> HealthStatus {
        if !self.running {
            return HealthStatus::Unhealthy("not running".to_owned());
        }

        match self.attached_mode {
            Some(attached) if attached != self.mode => HealthStatus::Degraded(format!(
                "attached in {attached} mode, requested {}",
                self.mode
            )),
            Some(_) => HealthStatus::Healthy,
            None => HealthStatus::Unhealthy("program not attached".to_owned()),
        }
    }
}
