//! 설정 관리: scaudit.toml 파싱 및 런타임 설정
//!
//! [`ScauditConfig`]는 CLI와 SCA 스캔 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SCAUDIT_AUDIT_RECURSIVE=true` 형식)
//! 3. 설정 파일 (`scaudit.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), scaudit_core::error::ScauditError> {
//! use scaudit_core::config::ScauditConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ScauditConfig::load("scaudit.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ScauditConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ScauditError};
use crate::types::{ServerDetails, Severity, Technology};

/// scaudit 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScauditConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 스캔 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// SCA audit 설정
    #[serde(default)]
    pub audit: AuditConfig,
}

impl ScauditConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScauditError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일이 없으면 기본값을 사용합니다.
    ///
    /// CLI는 `scaudit.toml` 없이도 실행할 수 있어야 합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ScauditError> {
        match Self::load(path.as_ref()).await {
            Err(ScauditError::Config(ConfigError::FileNotFound { path })) => {
                tracing::debug!(path = %path, "config file not found, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ScauditError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScauditError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ScauditError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ScauditError> {
        toml::from_str(toml_str).map_err(|e| {
            ScauditError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SCAUDIT_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SCAUDIT_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SCAUDIT_GENERAL_LOG_FORMAT");

        // Server
        override_string(&mut self.server.server_id, "SCAUDIT_SERVER_SERVER_ID");
        override_string(&mut self.server.url, "SCAUDIT_SERVER_URL");
        override_string(&mut self.server.access_token, "SCAUDIT_SERVER_ACCESS_TOKEN");
        override_string(&mut self.server.xray_version, "SCAUDIT_SERVER_XRAY_VERSION");

        // Audit
        override_csv(&mut self.audit.working_dirs, "SCAUDIT_AUDIT_WORKING_DIRS");
        override_bool(&mut self.audit.recursive, "SCAUDIT_AUDIT_RECURSIVE");
        override_csv(&mut self.audit.technologies, "SCAUDIT_AUDIT_TECHNOLOGIES");
        override_csv(
            &mut self.audit.exclude_patterns,
            "SCAUDIT_AUDIT_EXCLUDE_PATTERNS",
        );
        override_string(
            &mut self.audit.pip_requirements_file,
            "SCAUDIT_AUDIT_PIP_REQUIREMENTS_FILE",
        );
        override_string(&mut self.audit.deps_repo, "SCAUDIT_AUDIT_DEPS_REPO");
        override_bool(
            &mut self.audit.ignore_config_file,
            "SCAUDIT_AUDIT_IGNORE_CONFIG_FILE",
        );
        override_bool(&mut self.audit.use_wrapper, "SCAUDIT_AUDIT_USE_WRAPPER");
        override_bool(
            &mut self.audit.maven_dep_tree_installed,
            "SCAUDIT_AUDIT_MAVEN_DEP_TREE_INSTALLED",
        );
        override_bool(
            &mut self.audit.third_party_applicability,
            "SCAUDIT_AUDIT_THIRD_PARTY_APPLICABILITY",
        );
        override_bool(&mut self.audit.fixable_only, "SCAUDIT_AUDIT_FIXABLE_ONLY");
        override_string(&mut self.audit.min_severity, "SCAUDIT_AUDIT_MIN_SEVERITY");
        override_bool(
            &mut self.audit.include_licenses,
            "SCAUDIT_AUDIT_INCLUDE_LICENSES",
        );
        override_bool(
            &mut self.audit.include_vulnerabilities,
            "SCAUDIT_AUDIT_INCLUDE_VULNERABILITIES",
        );
        override_bool(&mut self.audit.curation, "SCAUDIT_AUDIT_CURATION");
        override_string(
            &mut self.audit.curation_cache_dir,
            "SCAUDIT_AUDIT_CURATION_CACHE_DIR",
        );
        override_u64(
            &mut self.audit.scan_timeout_secs,
            "SCAUDIT_AUDIT_SCAN_TIMEOUT_SECS",
        );
        override_string(&mut self.audit.vuln_db_path, "SCAUDIT_AUDIT_VULN_DB_PATH");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ScauditError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        for tech in &self.audit.technologies {
            if Technology::from_str_loose(tech).is_none() {
                return Err(ConfigError::InvalidValue {
                    field: "audit.technologies".to_owned(),
                    reason: format!("unsupported technology '{tech}'"),
                }
                .into());
            }
        }

        if !self.audit.min_severity.is_empty()
            && Severity::from_str_loose(&self.audit.min_severity).is_none()
        {
            return Err(ConfigError::InvalidValue {
                field: "audit.min_severity".to_owned(),
                reason: "must be one of: low, medium, high, critical".to_owned(),
            }
            .into());
        }

        if self.audit.scan_timeout_secs == 0 || self.audit.scan_timeout_secs > 3600 {
            return Err(ConfigError::InvalidValue {
                field: "audit.scan_timeout_secs".to_owned(),
                reason: "must be 1-3600".to_owned(),
            }
            .into());
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
            log_format: "pretty".to_owned(),
        }
    }
}

/// 스캔 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 서버 식별자
    pub server_id: String,
    /// 서버 URL
    pub url: String,
    /// 액세스 토큰
    pub access_token: String,
    /// 스캔 서비스 프로토콜 버전
    pub xray_version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_id: "default".to_owned(),
            url: String::new(),
            access_token: String::new(),
            xray_version: "3.90.0".to_owned(),
        }
    }
}

impl ServerConfig {
    /// 접속 정보만 분리합니다.
    pub fn details(&self) -> ServerDetails {
        ServerDetails {
            server_id: self.server_id.clone(),
            url: self.url.clone(),
            access_token: self.access_token.clone(),
        }
    }
}

/// SCA audit 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// 스캔 요청 디렉토리
    pub working_dirs: Vec<String>,
    /// 하위 디렉토리 재귀 탐지 여부
    pub recursive: bool,
    /// 스캔할 기술 목록 (비어있으면 자동 탐지)
    pub technologies: Vec<String>,
    /// 탐지 제외 디렉토리 이름
    pub exclude_patterns: Vec<String>,
    /// pip requirements 파일 경로
    pub pip_requirements_file: String,
    /// 의존성 해석에 사용할 저장소
    pub deps_repo: String,
    /// 기술별 리졸버 설정 파일 무시 여부
    pub ignore_config_file: bool,
    /// Gradle/Maven wrapper 사용 여부
    pub use_wrapper: bool,
    /// maven dep-tree 플러그인 설치 여부
    pub maven_dep_tree_installed: bool,
    /// npm 전체 의존성을 applicability 스캔에 포함할지 여부
    pub third_party_applicability: bool,
    /// 수정 버전이 있는 취약점만 보고
    pub fixable_only: bool,
    /// 최소 심각도 (비어있으면 필터 없음)
    pub min_severity: String,
    /// 라이선스 정보 포함 여부
    pub include_licenses: bool,
    /// 취약점 정보 포함 여부
    pub include_vulnerabilities: bool,
    /// curation 모드
    pub curation: bool,
    /// curation 캐시 루트 (비어있으면 홈 디렉토리 기본값)
    pub curation_cache_dir: String,
    /// 스캔 요청 타임아웃 (초)
    pub scan_timeout_secs: u64,
    /// 로컬 취약점 DB 경로
    pub vuln_db_path: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            working_dirs: vec![".".to_owned()],
            recursive: false,
            technologies: Vec::new(),
            exclude_patterns: vec![
                "node_modules".to_owned(),
                ".git".to_owned(),
                "target".to_owned(),
                "venv".to_owned(),
                ".venv".to_owned(),
            ],
            pip_requirements_file: String::new(),
            deps_repo: String::new(),
            ignore_config_file: false,
            use_wrapper: true,
            maven_dep_tree_installed: false,
            third_party_applicability: false,
            fixable_only: false,
            min_severity: String::new(),
            include_licenses: false,
            include_vulnerabilities: true,
            curation: false,
            curation_cache_dir: String::new(),
            scan_timeout_secs: 300,
            vuln_db_path: "/var/lib/scaudit/vuln-db".to_owned(),
        }
    }
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

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
