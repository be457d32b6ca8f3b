//! SCA audit 실행 파라미터
//!
//! [`AuditParams`]는 core의 [`AuditConfig`](scaudit_core::config::AuditConfig)와
//! [`ServerConfig`](scaudit_core::config::ServerConfig)에서 파생되며,
//! 실행 중 변하지 않는 [`ScanGraphParams`]와 스캔 단위마다 복제되는
//! [`ResolutionSettings`]로 나뉩니다.
//!
//! # 사용 예시
//!
//! ```
//! use scaudit_sca::AuditParamsBuilder;
//! use scaudit_core::Technology;
//!
//! let params = AuditParamsBuilder::new()
//!     .working_dirs(vec!["frontend".into()])
//!     .technologies(vec![Technology::Npm])
//!     .fixable_only(true)
//!     .build()
//!     .unwrap();
//! assert!(params.scan.fixable_only);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use scaudit_core::config::ScauditConfig;
use scaudit_core::types::{ServerDetails, Severity, Technology};

use crate::error::ScaError;

/// 스캔 요청 타임아웃 상한 (초)
const MAX_SCAN_TIMEOUT_SECS: u64 = 3600;

/// 경로 길이 제한
const MAX_PATH_LEN: usize = 4096;

/// 스캔 요청에 함께 전달되는 불변 파라미터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanGraphParams {
    /// 스캔 서버 접속 정보
    pub server: ServerDetails,
    /// 스캔 서비스 프로토콜 버전
    pub xray_version: String,
    /// 수정 버전이 있는 이슈만 보고
    pub fixable_only: bool,
    /// 최소 심각도 필터
    pub min_severity: Option<Severity>,
    /// 라이선스 정보 포함
    pub include_licenses: bool,
    /// 취약점 정보 포함
    pub include_vulnerabilities: bool,
}

impl Default for ScanGraphParams {
    fn default() -> Self {
        Self {
            server: ServerDetails::default(),
            xray_version: "3.90.0".to_owned(),
            fixable_only: false,
            min_severity: None,
            include_licenses: false,
            include_vulnerabilities: true,
        }
    }
}

/// 의존성 해석 설정
///
/// 리졸버 설정 파일이 서버 정보와 저장소를 덮어쓸 수 있으므로
/// 러너는 스캔 단위마다 복제본을 사용합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionSettings {
    /// 의존성 해석용 서버 접속 정보
    pub server: ServerDetails,
    /// 의존성 해석 저장소 (비어있으면 기본 레지스트리)
    pub deps_repo: String,
    /// 기술별 리졸버 설정 파일 무시
    pub ignore_config_file: bool,
    /// Gradle/Maven wrapper 사용
    pub use_wrapper: bool,
    /// maven dep-tree 플러그인 설치 여부
    pub maven_dep_tree_installed: bool,
    /// pip requirements 파일
    pub pip_requirements_file: Option<String>,
    /// curation 모드
    pub curation: bool,
    /// curation 캐시 루트 (None이면 홈 디렉토리 기본값)
    pub curation_cache_dir: Option<PathBuf>,
}

impl ResolutionSettings {
    pub fn set_server_details(&mut self, server: ServerDetails) {
        self.server = server;
    }

    pub fn set_deps_repo(&mut self, repo: impl Into<String>) {
        self.deps_repo = repo.into();
    }
}

/// SCA audit 실행 파라미터
#[derive(Debug, Clone)]
pub struct AuditParams {
    /// 스캔 요청 디렉토리
    pub working_dirs: Vec<PathBuf>,
    /// 재귀 탐지 여부
    pub recursive: bool,
    /// 기술 필터 (비어있으면 자동 탐지)
    pub technologies: Vec<Technology>,
    /// 탐지 제외 디렉토리 이름
    pub exclude_patterns: Vec<String>,
    /// npm 전체 의존성을 applicability 힌트에 포함
    pub third_party_applicability: bool,
    /// 의존성 해석 설정
    pub resolution: ResolutionSettings,
    /// 스캔 요청 파라미터
    pub scan: ScanGraphParams,
    /// 스캔 요청 타임아웃
    pub scan_timeout: Duration,
}

impl Default for AuditParams {
    fn default() -> Self {
        Self {
            working_dirs: vec![PathBuf::from(".")],
            recursive: false,
            technologies: Vec::new(),
            exclude_patterns: vec![
                "node_modules".to_owned(),
                ".git".to_owned(),
                "target".to_owned(),
                "venv".to_owned(),
                ".venv".to_owned(),
            ],
            third_party_applicability: false,
            resolution: ResolutionSettings {
                use_wrapper: true,
                ..ResolutionSettings::default()
            },
            scan: ScanGraphParams::default(),
            scan_timeout: Duration::from_secs(300),
        }
    }
}

impl AuditParams {
    /// core 설정에서 실행 파라미터를 생성합니다.
    ///
    /// core 설정은 이미 검증된 상태여야 하지만, 기술/심각도 문자열은
    /// 여기서 다시 해석되므로 잘못된 값은 `Config` 에러가 됩니다.
    pub fn from_core(core: &ScauditConfig) -> Result<Self, ScaError> {
        let audit = &core.audit;

        let technologies = audit
            .technologies
            .iter()
            .map(|t| {
                Technology::from_str_loose(t).ok_or_else(|| ScaError::Config {
                    field: "technologies".to_owned(),
                    reason: format!("unsupported technology '{t}'"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let min_severity = if audit.min_severity.is_empty() {
            None
        } else {
            Some(
                Severity::from_str_loose(&audit.min_severity).ok_or_else(|| ScaError::Config {
                    field: "min_severity".to_owned(),
                    reason: format!("unknown severity '{}'", audit.min_severity),
                })?,
            )
        };

        let server = core.server.details();

        let params = Self {
            working_dirs: audit.working_dirs.iter().map(PathBuf::from).collect(),
            recursive: audit.recursive,
            technologies,
            exclude_patterns: audit.exclude_patterns.clone(),
            third_party_applicability: audit.third_party_applicability,
            resolution: ResolutionSettings {
                server: server.clone(),
                deps_repo: audit.deps_repo.clone(),
                ignore_config_file: audit.ignore_config_file,
                use_wrapper: audit.use_wrapper,
                maven_dep_tree_installed: audit.maven_dep_tree_installed,
                pip_requirements_file: non_empty(&audit.pip_requirements_file),
                curation: audit.curation,
                curation_cache_dir: non_empty(&audit.curation_cache_dir).map(PathBuf::from),
            },
            scan: ScanGraphParams {
                server,
                xray_version: core.server.xray_version.clone(),
                fixable_only: audit.fixable_only,
                min_severity,
                include_licenses: audit.include_licenses,
                include_vulnerabilities: audit.include_vulnerabilities,
            },
            scan_timeout: Duration::from_secs(audit.scan_timeout_secs),
        };
        params.validate()?;
        Ok(params)
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `working_dirs`: 하나 이상, 빈 경로 금지, 4096자 이하 (`..` 상대 경로 허용)
    /// - `scan_timeout`: 1-3600초
    pub fn validate(&self) -> Result<(), ScaError> {
        if self.working_dirs.is_empty() {
            return Err(ScaError::Config {
                field: "working_dirs".to_owned(),
                reason: "at least one working directory required".to_owned(),
            });
        }

        for dir in &self.working_dirs {
            validate_path("working_dirs", dir)?;
        }

        let secs = self.scan_timeout.as_secs();
        if secs == 0 || secs > MAX_SCAN_TIMEOUT_SECS {
            return Err(ScaError::Config {
                field: "scan_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_SCAN_TIMEOUT_SECS}"),
            });
        }

        Ok(())
    }
}

fn validate_path(field: &str, path: &Path) -> Result<(), ScaError> {
    if path.as_os_str().is_empty() {
        return Err(ScaError::Config {
            field: field.to_owned(),
            reason: "path must not be empty".to_owned(),
        });
    }

    if path.as_os_str().len() > MAX_PATH_LEN {
        return Err(ScaError::Config {
            field: field.to_owned(),
            reason: format!("path exceeds maximum length {MAX_PATH_LEN}"),
        });
    }

    Ok(())
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_owned())
    }
}

/// [`AuditParams`] 빌더
#[derive(Default)]
pub struct AuditParamsBuilder {
    params: AuditParams,
}

impl AuditParamsBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn working_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.params.working_dirs = dirs;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.params.recursive = recursive;
        self
    }

    pub fn technologies(mut self, technologies: Vec<Technology>) -> Self {
        self.params.technologies = technologies;
        self
    }

    pub fn exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.params.exclude_patterns = patterns;
        self
    }

    pub fn third_party_applicability(mut self, enabled: bool) -> Self {
        self.params.third_party_applicability = enabled;
        self
    }

    /// 해석과 스캔에 같은 서버를 사용합니다.
    pub fn server(mut self, server: ServerDetails) -> Self {
        self.params.resolution.server = server.clone();
        self.params.scan.server = server;
        self
    }

    pub fn deps_repo(mut self, repo: impl Into<String>) -> Self {
        self.params.resolution.deps_repo = repo.into();
        self
    }

    pub fn ignore_config_file(mut self, ignore: bool) -> Self {
        self.params.resolution.ignore_config_file = ignore;
        self
    }

    pub fn use_wrapper(mut self, use_wrapper: bool) -> Self {
        self.params.resolution.use_wrapper = use_wrapper;
        self
    }

    pub fn pip_requirements_file(mut self, file: impl Into<String>) -> Self {
        self.params.resolution.pip_requirements_file = Some(file.into());
        self
    }

    pub fn curation(mut self, curation: bool) -> Self {
        self.params.resolution.curation = curation;
        self
    }

    pub fn curation_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.params.resolution.curation_cache_dir = Some(dir.into());
        self
    }

    pub fn xray_version(mut self, version: impl Into<String>) -> Self {
        self.params.scan.xray_version = version.into();
        self
    }

    pub fn fixable_only(mut self, fixable_only: bool) -> Self {
        self.params.scan.fixable_only = fixable_only;
        self
    }

    pub fn min_severity(mut self, severity: Option<Severity>) -> Self {
        self.params.scan.min_severity = severity;
        self
    }

    pub fn include_licenses(mut self, include: bool) -> Self {
        self.params.scan.include_licenses = include;
        self
    }

    pub fn include_vulnerabilities(mut self, include: bool) -> Self {
        self.params.scan.include_vulnerabilities = include;
        self
    }

    pub fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.params.scan_timeout = timeout;
        self
    }

    /// 설정을 검증하고 파라미터를 반환합니다.
    pub fn build(self) -> Result<AuditParams, ScaError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        AuditParams::default().validate().unwrap();
    }

    #[test]
    fn builder_sets_fields() {
        let params = AuditParamsBuilder::new()
            .working_dirs(vec![PathBuf::from("app")])
            .recursive(true)
            .technologies(vec![Technology::Pip])
            .pip_requirements_file("requirements-dev.txt")
            .min_severity(Some(Severity::High))
            .scan_timeout(Duration::from_secs(30))
            .build()
            .unwrap();

        assert!(params.recursive);
        assert_eq!(params.technologies, vec![Technology::Pip]);
        assert_eq!(
            params.resolution.pip_requirements_file.as_deref(),
            Some("requirements-dev.txt")
        );
        assert_eq!(params.scan.min_severity, Some(Severity::High));
        assert_eq!(params.scan_timeout, Duration::from_secs(30));
    }

    #[test]
    fn builder_server_applies_to_both_bundles() {
        let server = ServerDetails {
            server_id: "corp".to_owned(),
            url: "https://corp.example.com/".to_owned(),
            access_token: String::new(),
        };
        let params = AuditParamsBuilder::new().server(server.clone()).build().unwrap();
        assert_eq!(params.resolution.server, server);
        assert_eq!(params.scan.server, server);
    }

    #[test]
    fn validate_rejects_empty_working_dirs() {
        let result = AuditParamsBuilder::new().working_dirs(Vec::new()).build();
        assert!(result.is_err());
    }

    #[test]
    fn validate_accepts_parent_relative_dirs() {
        let params = AuditParamsBuilder::new()
            .working_dirs(vec![
                PathBuf::from("../sibling-project"),
                PathBuf::from("app/../../etc"),
            ])
            .build()
            .unwrap();
        assert_eq!(params.working_dirs[0], PathBuf::from("../sibling-project"));
    }

    #[test]
    fn validate_rejects_empty_path() {
        let err = AuditParamsBuilder::new()
            .working_dirs(vec![PathBuf::new()])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn validate_rejects_timeout_out_of_range() {
        assert!(
            AuditParamsBuilder::new()
                .scan_timeout(Duration::from_secs(0))
                .build()
                .is_err()
        );
        assert!(
            AuditParamsBuilder::new()
                .scan_timeout(Duration::from_secs(7200))
                .build()
                .is_err()
        );
    }

    #[test]
    fn from_core_maps_sections() {
        let mut core = ScauditConfig::default();
        core.audit.technologies = vec!["npm".to_owned(), "Maven".to_owned()];
        core.audit.min_severity = "medium".to_owned();
        core.audit.curation = true;
        core.audit.curation_cache_dir = "/tmp/curation".to_owned();
        core.server.server_id = "corp".to_owned();

        let params = AuditParams::from_core(&core).unwrap();
        assert_eq!(
            params.technologies,
            vec![Technology::Npm, Technology::Maven]
        );
        assert_eq!(params.scan.min_severity, Some(Severity::Medium));
        assert!(params.resolution.curation);
        assert_eq!(
            params.resolution.curation_cache_dir,
            Some(PathBuf::from("/tmp/curation"))
        );
        assert_eq!(params.resolution.server.server_id, "corp");
        assert_eq!(params.scan.server.server_id, "corp");
        assert!(params.resolution.pip_requirements_file.is_none());
    }

    #[test]
    fn from_core_rejects_unknown_technology() {
        let mut core = ScauditConfig::default();
        core.audit.technologies = vec!["cobol".to_owned()];
        assert!(AuditParams::from_core(&core).is_err());
    }

    #[test]
    fn resolution_setters_overwrite() {
        let mut settings = ResolutionSettings::default();
        settings.set_deps_repo("npm-remote");
        settings.set_server_details(ServerDetails {
            server_id: "other".to_owned(),
            ..Default::default()
        });
        assert_eq!(settings.deps_repo, "npm-remote");
        assert_eq!(settings.server.server_id, "other");
    }
}
