//! 실행 결과 보고서

use serde::Serialize;

use crate::applicability::ApplicabilityHints;
use crate::error::ScaErrors;
use crate::types::ScanUnit;

/// SCA 실행 결과
///
/// 성공한 단위와 누적 에러를 함께 담습니다. 일부 단위가 실패해도
/// 나머지 단위의 결과는 그대로 보고됩니다.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaReport {
    /// 성공한 스캔 단위 (계획된 순서 유지, 실패한 단위는 `errors`에만 기록)
    pub results: Vec<ScanUnit>,
    /// 단위별 실패
    pub errors: ScaErrors,
    /// 서드파티 applicability 힌트
    pub applicability: ApplicabilityHints,
}

impl ScaReport {
    /// 모든 단위의 취약점 수
    pub fn vulnerability_count(&self) -> usize {
        self.results.iter().map(ScanUnit::vulnerability_count).sum()
    }

    /// 모든 단위의 정책 위반 수
    pub fn violation_count(&self) -> usize {
        self.results.iter().map(ScanUnit::violation_count).sum()
    }

    /// 실패한 단위가 없는지
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// 스캔할 프로젝트가 없었는지
    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.errors.is_empty()
    }
}
