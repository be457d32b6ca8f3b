//! 스캔 서비스 seam
//!
//! [`ScanService`]는 평탄화 그래프를 원격(또는 로컬) 취약점 스캔 서비스에 제출하는
//! 인터페이스입니다. 러너는 이 trait에만 의존하며, 구현체는 빌더로 주입됩니다.

use std::future::Future;

use scaudit_core::types::Technology;

use crate::config::ScanGraphParams;
use crate::error::ScaError;
use crate::types::{FlatGraph, ScanResponse};

/// 평탄화 그래프 스캔 서비스
///
/// 응답 순서는 보존되며, 러너는 응답을 단위 결과 뒤에 추가만 합니다.
pub trait ScanService: Send + Sync {
    /// 평탄화 그래프를 제출하고 스캔 응답을 받습니다.
    fn scan_graph(
        &self,
        technology: Technology,
        graph: &FlatGraph,
        params: &ScanGraphParams,
    ) -> impl Future<Output = Result<Vec<ScanResponse>, ScaError>> + Send;
}
