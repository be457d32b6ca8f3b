//! 스캔 단위 계획
//!
//! 요청 디렉토리마다 탐지기를 호출하여 `(기술, 작업 디렉토리, 디스크립터)`
//! 작업 목록을 만듭니다.
//!
//! - `.NET`은 NuGet과 같은 방식으로 탐지되므로 별도 단위를 만들지 않습니다.
//! - 작업 디렉토리가 하나도 없는 기술(필터로 요청되었지만 미발견)은
//!   요청 디렉토리에서 디스크립터 없이 한 번 스캔합니다.
//! - 탐지 실패는 로그만 남기고 해당 디렉토리를 건너뜁니다.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::warn;

use scaudit_core::types::Technology;

use crate::config::AuditParams;
use crate::detection::{DetectionRequest, TechnologyDetector};
use crate::types::ScanUnit;

/// 기술별 명시적 디스크립터 (현재는 pip requirements 파일)
pub fn requested_descriptors(params: &AuditParams) -> BTreeMap<Technology, Vec<String>> {
    let mut requested = BTreeMap::new();
    if let Some(file) = &params.resolution.pip_requirements_file {
        requested.insert(Technology::Pip, vec![file.clone()]);
    }
    requested
}

/// 수행할 스캔 단위 목록을 계산합니다.
///
/// 결과가 비어있으면 지원하는 프로젝트가 없다는 뜻이며 에러가 아닙니다.
pub fn plan_scans<D>(params: &AuditParams, detector: &D) -> Vec<ScanUnit>
where
    D: TechnologyDetector + ?Sized,
{
    let requested = requested_descriptors(params);
    let mut units = Vec::new();

    for requested_dir in &params.working_dirs {
        let request = DetectionRequest {
            directory: requested_dir,
            recursive: params.recursive,
            technologies: &params.technologies,
            requested_descriptors: &requested,
            exclude_patterns: &params.exclude_patterns,
        };

        let detected = match detector.detect(&request) {
            Ok(d) => d,
            Err(e) => {
                warn!(
                    directory = %requested_dir.display(),
                    error = %e,
                    "couldn't detect technologies, skipping directory"
                );
                continue;
            }
        };

        for (tech, working_dirs) in detected {
            if tech == Technology::Dotnet {
                continue;
            }

            if working_dirs.is_empty() {
                units.push(ScanUnit::new(tech, absolute(requested_dir), Vec::new()));
                continue;
            }

            for (working_dir, descriptors) in working_dirs {
                units.push(ScanUnit::new(tech, working_dir, descriptors));
            }
        }
    }

    units
}

fn absolute(dir: &Path) -> std::path::PathBuf {
    std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf())
}
