//! SCA 에러 타입
//!
//! [`ScaError`]는 SCA 스캔 중 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<ScaError> for ScauditError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 전파됩니다.
//!
//! 스캔 단위 하나의 실패는 [`UnitError`]로 기술/디렉토리 정보와 함께 감싸지고,
//! 실행 전체의 실패들은 [`ScaErrors`]에 순서대로 누적됩니다.
//!
//! # 에러 카테고리
//!
//! - **탐지**: `Detection`
//! - **리졸버 설정 파일**: `ConfigFile`, `MissingResolver`
//! - **의존성 해석**: `Resolver`, `EmptyDependencyTree`, `Unsupported`, `LockfileParse`, `CurationCache`
//! - **스캔 요청**: `ScanSubmission`, `Service`, `Cancelled`, `Timeout`
//! - **작업 디렉토리**: `WorkingDirectory`
//! - **취약점 DB**: `VulnDbLoad`, `VulnDbParse`
//! - **설정 / I/O**: `Config`, `Io`

use std::fmt;
use std::path::{Path, PathBuf};

use serde::ser::{SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};

use scaudit_core::error::{ConfigError, ScaFailure, ScauditError};
use scaudit_core::types::Technology;

/// SCA 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ScaError {
    /// 디렉토리의 기술 스택 탐지 실패
    #[error("couldn't detect technologies in '{path}': {reason}")]
    Detection {
        /// 탐지 대상 디렉토리
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 기술별 리졸버 설정 파일 읽기 실패
    #[error("failed while reading {technology}.yaml config file '{path}': {reason}")]
    ConfigFile {
        /// 설정 파일의 기술
        technology: Technology,
        /// 설정 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 파일에 리졸버가 선언되지 않음 (호출자가 무시하는 에러)
    #[error("no resolver repository declared in '{path}'")]
    MissingResolver {
        /// 설정 파일 경로
        path: String,
    },

    /// 의존성이 하나도 발견되지 않음
    #[error("no dependencies were found. Please try to build your project and re-run the audit command")]
    EmptyDependencyTree,

    /// 의존성 트리 생성 실패
    #[error("failed while building '{technology}' dependency tree:\n{source}")]
    Resolver {
        /// 대상 기술
        technology: Technology,
        /// 원본 에러
        #[source]
        source: Box<ScaError>,
    },

    /// 등록된 리졸버가 없는 기술
    #[error("{technology} is currently not supported")]
    Unsupported {
        /// 대상 기술
        technology: Technology,
    },

    /// lockfile 파싱 실패
    #[error("lockfile parse error: {path}: {reason}")]
    LockfileParse {
        /// lockfile 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// curation 캐시 디렉토리 확인 실패
    #[error("curation cache error: {path}: {reason}")]
    CurationCache {
        /// 캐시 디렉토리 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 스캔 요청 실패
    #[error("'{technology}' dependency tree scan request failed:\n{source}")]
    ScanSubmission {
        /// 대상 기술
        technology: Technology,
        /// 원본 에러
        #[source]
        source: Box<ScaError>,
    },

    /// 스캔 서비스 내부 에러
    #[error("scan service error: {0}")]
    Service(String),

    /// 실행 취소로 스캔이 중단됨
    #[error("scan cancelled")]
    Cancelled,

    /// 스캔 요청 타임아웃
    #[error("scan request timed out after {secs}s")]
    Timeout {
        /// 타임아웃 (초)
        secs: u64,
    },

    /// 작업 디렉토리 전환/복원 실패
    #[error("failed to change working directory to '{path}': {source}")]
    WorkingDirectory {
        /// 대상 디렉토리
        path: String,
        /// 원본 I/O 에러
        #[source]
        source: std::io::Error,
    },

    /// 취약점 DB 로딩 실패
    #[error("vulnerability db load error: {path}: {reason}")]
    VulnDbLoad {
        /// DB 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 취약점 DB 파싱 실패
    #[error("vulnerability db parse error: {0}")]
    VulnDbParse(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        #[source]
        source: std::io::Error,
    },
}

impl ScaError {
    /// 실행 취소 또는 타임아웃으로 인한 에러인지 확인합니다.
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Cancelled | Self::Timeout { .. } => true,
            Self::Resolver { source, .. } | Self::ScanSubmission { source, .. } => {
                source.is_cancellation()
            }
            _ => false,
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl From<ScaError> for ScauditError {
    fn from(err: ScaError) -> Self {
        match err {
            ScaError::Detection { .. } => ScauditError::Sca(ScaFailure::Detection(err.to_string())),
            ScaError::WorkingDirectory { .. } => {
                ScauditError::Sca(ScaFailure::WorkingDirectory(err.to_string()))
            }
            ScaError::ScanSubmission { .. }
            | ScaError::Service(_)
            | ScaError::Cancelled
            | ScaError::Timeout { .. }
            | ScaError::VulnDbLoad { .. }
            | ScaError::VulnDbParse(_) => ScauditError::Sca(ScaFailure::Scan(err.to_string())),
            ScaError::Config { field, reason } => {
                ScauditError::Config(ConfigError::InvalidValue { field, reason })
            }
            ScaError::Io { source, .. } => ScauditError::Io(source),
            ScaError::ConfigFile { .. }
            | ScaError::MissingResolver { .. }
            | ScaError::EmptyDependencyTree
            | ScaError::Resolver { .. }
            | ScaError::Unsupported { .. }
            | ScaError::LockfileParse { .. }
            | ScaError::CurationCache { .. } => {
                ScauditError::Sca(ScaFailure::Resolution(err.to_string()))
            }
        }
    }
}

/// 스캔 단위 하나의 실패 (기술 + 작업 디렉토리 태그)
#[derive(Debug)]
pub struct UnitError {
    /// 실패한 단위의 기술
    pub technology: Technology,
    /// 실패한 단위의 작업 디렉토리
    pub working_directory: PathBuf,
    /// 원본 에러
    pub error: ScaError,
}

impl UnitError {
    pub fn new(technology: Technology, working_directory: impl Into<PathBuf>, error: ScaError) -> Self {
        Self {
            technology,
            working_directory: working_directory.into(),
            error,
        }
    }
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] audit command in '{}' failed:\n{}",
            self.technology,
            self.working_directory.display(),
            self.error
        )
    }
}

impl std::error::Error for UnitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl Serialize for UnitError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("UnitError", 3)?;
        state.serialize_field("technology", &self.technology)?;
        state.serialize_field("workingDirectory", &self.working_directory)?;
        state.serialize_field("message", &self.error.to_string())?;
        state.end()
    }
}

/// 실행 전체의 누적 에러
///
/// 실패한 단위 순서대로 보관하며, 표시할 때 줄바꿈으로 연결합니다.
#[derive(Debug, Default)]
pub struct ScaErrors {
    errors: Vec<UnitError>,
}

impl ScaErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// 실패를 추가합니다.
    pub fn push(&mut self, error: UnitError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnitError> {
        self.errors.iter()
    }

    /// 에러가 없으면 `Ok(())`, 있으면 자신을 `Err`로 반환합니다.
    pub fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ScaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ScaErrors {}

impl Serialize for ScaErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.errors.len()))?;
        for err in &self.errors {
            seq.serialize_element(err)?;
        }
        seq.end()
    }
}

impl From<ScaErrors> for ScauditError {
    fn from(errs: ScaErrors) -> Self {
        ScauditError::Sca(ScaFailure::Partial {
            count: errs.len(),
            summary: errs.to_string(),
        })
    }
}
