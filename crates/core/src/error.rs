//! 에러 타입: 도메인별 에러 정의

/// scaudit 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ScauditError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// SCA 스캔 에러
    #[error("sca error: {0}")]
    Sca(#[from] ScaFailure),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// SCA 스캔 에러 (상위 전파용 요약 형태)
#[derive(Debug, thiserror::Error)]
pub enum ScaFailure {
    /// 기술 스택 탐지 실패
    #[error("detection failed: {0}")]
    Detection(String),

    /// 의존성 트리 생성 실패
    #[error("dependency resolution failed: {0}")]
    Resolution(String),

    /// 스캔 서비스 요청 실패
    #[error("scan request failed: {0}")]
    Scan(String),

    /// 작업 디렉토리 전환 실패
    #[error("working directory error: {0}")]
    WorkingDirectory(String),

    /// 여러 스캔 단위의 실패 묶음
    #[error("{count} sca scan(s) failed:\n{summary}")]
    Partial { count: usize, summary: String },
}
