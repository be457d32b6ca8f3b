//! 메트릭 상수 및 설명 등록
//!
//! SCA 스캔 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! 레코더가 설치되지 않은 경우 매크로 호출은 아무 동작도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `scaudit_sca_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(scaudit_core::metrics::SCA_UNITS_SCANNED_TOTAL,
//!     scaudit_core::metrics::LABEL_TECHNOLOGY => "npm").increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 기술 레이블 키 (npm, maven, pip, ...)
pub const LABEL_TECHNOLOGY: &str = "technology";

/// 결과 레이블 키 (success, failure, cancelled)
pub const LABEL_RESULT: &str = "result";

// ─── SCA 메트릭 ────────────────────────────────────────────────────

/// SCA: 계획된 스캔 단위 수 (counter)
pub const SCA_UNITS_PLANNED_TOTAL: &str = "scaudit_sca_units_planned_total";

/// SCA: 완료된 스캔 단위 수 (counter, label: technology, result)
pub const SCA_UNITS_SCANNED_TOTAL: &str = "scaudit_sca_units_scanned_total";

/// SCA: 평탄화 그래프의 고유 의존성 수 (counter, label: technology)
pub const SCA_DEPENDENCIES_RESOLVED_TOTAL: &str = "scaudit_sca_dependencies_resolved_total";

/// SCA: 보고된 취약점 수 (counter, label: technology)
pub const SCA_VULNERABILITIES_FOUND_TOTAL: &str = "scaudit_sca_vulnerabilities_found_total";

/// SCA: 의존성 트리 생성 소요 시간 (histogram, 초, label: technology)
pub const SCA_RESOLUTION_DURATION_SECONDS: &str = "scaudit_sca_resolution_duration_seconds";

/// SCA: 스캔 요청 소요 시간 (histogram, 초)
pub const SCA_SCAN_DURATION_SECONDS: &str = "scaudit_sca_scan_duration_seconds";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        SCA_UNITS_PLANNED_TOTAL,
        "Total number of SCA scan units planned"
    );
    describe_counter!(
        SCA_UNITS_SCANNED_TOTAL,
        "Total number of SCA scan units finished, by technology and result"
    );
    describe_counter!(
        SCA_DEPENDENCIES_RESOLVED_TOTAL,
        "Total number of unique dependencies in flattened graphs"
    );
    describe_counter!(
        SCA_VULNERABILITIES_FOUND_TOTAL,
        "Total number of vulnerabilities reported by the scan service"
    );
    describe_histogram!(
        SCA_RESOLUTION_DURATION_SECONDS,
        "Time to build a dependency tree in seconds"
    );
    describe_histogram!(
        SCA_SCAN_DURATION_SECONDS,
        "Time to run a graph scan in seconds"
    );
}
