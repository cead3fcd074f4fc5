//! 파이프라인 trait -- 장기 실행 컴포넌트의 라이프사이클
//!
//! 데몬은 [`Pipeline`]을 통해 필터 엔진을 시작/정지하고 상태를 확인합니다.

use std::fmt;

use serde::Serialize;

use crate::error::PortguardError;

/// 컴포넌트 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    /// 정상 동작
    Healthy,
    /// 동작하지만 일부 기능 저하
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 시작/정지 가능한 처리 파이프라인
///
/// `start`는 실행 중일 때 `PipelineError::AlreadyRunning`,
/// `stop`은 정지 상태일 때 `PipelineError::NotRunning`을 반환해야 합니다.
#[allow(async_fn_in_trait)]
pub trait Pipeline {
    /// 파이프라인을 시작합니다.
    async fn start(&mut self) -> Result<(), PortguardError>;

    /// 파이프라인을 정지하고 리소스를 정리합니다.
    async fn stop(&mut self) -> Result<(), PortguardError>;

    /// 현재 상태를 반환합니다.
    async fn health_check(&self) -> HealthStatus;
}
