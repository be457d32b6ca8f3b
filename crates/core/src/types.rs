//! 도메인 타입: 시스템 전역에서 사용되는 공통 타입
//!
//! 설정 로딩과 SCA 스캔이 함께 사용하는 데이터 구조를 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 지원하는 패키지 관리자 / 빌드 도구
///
/// 닫힌 집합입니다. 새 기술을 추가하려면 variant 하나와
/// 리졸버 테이블 엔트리 하나를 추가합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Technology {
    Maven,
    Gradle,
    Npm,
    Pnpm,
    Yarn,
    Go,
    Pip,
    Pipenv,
    Poetry,
    Nuget,
    Dotnet,
}

impl Technology {
    /// 모든 기술 목록 (탐지 순서)
    pub const ALL: [Technology; 11] = [
        Self::Maven,
        Self::Gradle,
        Self::Npm,
        Self::Pnpm,
        Self::Yarn,
        Self::Go,
        Self::Pip,
        Self::Pipenv,
        Self::Poetry,
        Self::Nuget,
        Self::Dotnet,
    ];

    /// 식별자 문자열 (설정 파일명, 메트릭 레이블에 사용)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maven => "maven",
            Self::Gradle => "gradle",
            Self::Npm => "npm",
            Self::Pnpm => "pnpm",
            Self::Yarn => "yarn",
            Self::Go => "go",
            Self::Pip => "pip",
            Self::Pipenv => "pipenv",
            Self::Poetry => "poetry",
            Self::Nuget => "nuget",
            Self::Dotnet => "dotnet",
        }
    }

    /// 로그 메시지용 정식 명칭
    pub fn formal_name(&self) -> &'static str {
        match self {
            Self::Maven => "Maven",
            Self::Gradle => "Gradle",
            Self::Npm => "npm",
            Self::Pnpm => "pnpm",
            Self::Yarn => "Yarn",
            Self::Go => "Go",
            Self::Pip => "Pip",
            Self::Pipenv => "Pipenv",
            Self::Poetry => "Poetry",
            Self::Nuget => "NuGet",
            Self::Dotnet => ".NET",
        }
    }

    /// 컴포넌트 ID 접두사 (예: `npm://lodash:4.17.21`)
    pub fn package_type(&self) -> &'static str {
        match self {
            Self::Maven | Self::Gradle => "gav",
            Self::Npm | Self::Pnpm | Self::Yarn => "npm",
            Self::Go => "go",
            Self::Pip | Self::Pipenv | Self::Poetry => "pypi",
            Self::Nuget | Self::Dotnet => "nuget",
        }
    }

    /// 문자열에서 기술을 파싱합니다 (대소문자 구분 없음).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "maven" | "mvn" => Some(Self::Maven),
            "gradle" => Some(Self::Gradle),
            "npm" => Some(Self::Npm),
            "pnpm" => Some(Self::Pnpm),
            "yarn" => Some(Self::Yarn),
            "go" | "golang" => Some(Self::Go),
            "pip" => Some(Self::Pip),
            "pipenv" => Some(Self::Pipenv),
            "poetry" => Some(Self::Poetry),
            "nuget" => Some(Self::Nuget),
            "dotnet" | ".net" => Some(Self::Dotnet),
            _ => None,
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// 정보성 / 미분류
    #[default]
    Info,
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "informational" | "unknown" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// 스캔 서버 / 아티팩트 저장소 접속 정보
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerDetails {
    /// 서버 식별자
    pub server_id: String,
    /// 서버 URL
    pub url: String,
    /// 액세스 토큰
    pub access_token: String,
}

impl ServerDetails {
    /// 토큰을 가린 표시용 문자열
    pub fn redacted(&self) -> String {
        let token = if self.access_token.is_empty() {
            "<none>"
        } else {
            "***"
        };
        format!("{} ({}) token={token}", self.server_id, self.url)
    }
}
