//! 로컬 취약점 데이터베이스 -- JSON DB 로딩 및 조회
//!
//! [`VulnDb`]는 로컬 파일시스템의 JSON 파일에서 취약점 데이터를 로드합니다.
//! 파일 이름은 컴포넌트 ID의 패키지 유형(`npm://...`의 `npm`)과 같습니다.
//!
//! # DB 디렉토리 구조
//!
//! ```text
//! /var/lib/scaudit/vuln-db/
//!   gav.json       # Maven / Gradle
//!   npm.json       # npm / pnpm / yarn
//!   go.json
//!   pypi.json      # pip / pipenv / poetry
//!   nuget.json
//! ```
//!
//! # JSON 형식
//!
//! ```json
//! [
//!   {
//!     "cve_id": "CVE-2021-23337",
//!     "package": "lodash",
//!     "package_type": "npm",
//!     "affected_ranges": [{ "introduced": "0.0.0", "fixed": "4.17.21" }],
//!     "fixed_version": "4.17.21",
//!     "severity": "High",
//!     "description": "Command injection via template"
//!   }
//! ]
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use scaudit_core::types::Severity;

use crate::error::ScaError;

/// DB 파일을 찾는 패키지 유형
pub const PACKAGE_TYPES: [&str; 5] = ["gav", "npm", "go", "pypi", "nuget"];

/// 취약점 DB 파일 최대 크기 (50 MB)
const MAX_VULN_DB_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// 전체 취약점 DB 엔트리 최대 개수
const MAX_VULN_DB_ENTRIES: usize = 1_000_000;

/// 취약점 DB 엔트리
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnDbEntry {
    /// CVE ID (예: CVE-2024-1234)
    pub cve_id: String,
    /// 영향받는 패키지명 (Maven은 `group:artifact`)
    pub package: String,
    /// 패키지 유형 (`gav`, `npm`, `go`, `pypi`, `nuget`), 생략하면 파일 이름을 따름
    #[serde(default)]
    pub package_type: String,
    /// 영향받는 버전 범위
    pub affected_ranges: Vec<VersionRange>,
    /// 수정된 버전 (있을 경우)
    #[serde(default)]
    pub fixed_version: Option<String>,
    /// 심각도
    pub severity: Severity,
    /// 취약점 설명
    pub description: String,
}

/// 영향받는 버전 범위
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRange {
    /// 도입 버전 (이 버전부터 영향)
    pub introduced: Option<String>,
    /// 수정 버전 (이 버전에서 수정됨, None이면 미수정)
    pub fixed: Option<String>,
}

/// 취약점 데이터베이스
///
/// `(package, package_type)` 쌍으로 인덱싱됩니다.
#[derive(Debug, Default)]
pub struct VulnDb {
    entries: Vec<VulnDbEntry>,
    index: HashMap<(String, String), Vec<usize>>,
}

impl VulnDb {
    /// 빈 데이터베이스를 생성합니다.
    pub fn empty() -> Self {
        Self::default()
    }

    fn build_index(entries: &[VulnDbEntry]) -> HashMap<(String, String), Vec<usize>> {
        let mut index: HashMap<(String, String), Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            index
                .entry((entry.package.clone(), entry.package_type.clone()))
                .or_default()
                .push(idx);
        }
        index
    }

    /// 엔트리 목록으로 데이터베이스를 생성합니다.
    pub fn from_entries(entries: Vec<VulnDbEntry>) -> Self {
        let index = Self::build_index(&entries);
        Self { entries, index }
    }

    /// JSON 문자열에서 데이터베이스를 파싱합니다.
    pub fn from_json(json: &str) -> Result<Self, ScaError> {
        let entries: Vec<VulnDbEntry> = serde_json::from_str(json)
            .map_err(|e| ScaError::VulnDbParse(format!("failed to parse vuln db JSON: {e}")))?;
        Ok(Self::from_entries(entries))
    }

    /// 디렉토리에서 모든 패키지 유형의 DB 파일을 로드합니다.
    ///
    /// 없는 파일은 건너뜁니다. 디렉토리 자체가 없으면 빈 DB가 됩니다.
    ///
    /// # Note
    ///
    /// 동기 I/O를 수행합니다. async 컨텍스트에서는 `tokio::task::spawn_blocking`으로 감싸세요.
    pub fn load_from_dir(dir_path: &Path) -> Result<Self, ScaError> {
        let mut all_entries = Vec::new();

        for package_type in PACKAGE_TYPES {
            let file_path = dir_path.join(format!("{package_type}.json"));

            let metadata = match std::fs::metadata(&file_path) {
                Ok(m) => m,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %file_path.display(), "vuln db file not found, skipping");
                    continue;
                }
                Err(e) => {
                    return Err(ScaError::VulnDbLoad {
                        path: file_path.display().to_string(),
                        reason: e.to_string(),
                    });
                }
            };

            if metadata.len() > MAX_VULN_DB_FILE_SIZE {
                return Err(ScaError::VulnDbLoad {
                    path: file_path.display().to_string(),
                    reason: format!(
                        "file size {} bytes exceeds maximum {MAX_VULN_DB_FILE_SIZE} bytes",
                        metadata.len()
                    ),
                });
            }

            let content =
                std::fs::read_to_string(&file_path).map_err(|e| ScaError::VulnDbLoad {
                    path: file_path.display().to_string(),
                    reason: e.to_string(),
                })?;

            let mut entries: Vec<VulnDbEntry> = serde_json::from_str(&content).map_err(|e| {
                ScaError::VulnDbParse(format!("failed to parse {}: {e}", file_path.display()))
            })?;

            // 파일 이름이 패키지 유형을 결정함
            for entry in &mut entries {
                if entry.package_type.is_empty() {
                    entry.package_type = package_type.to_owned();
                }
            }

            if all_entries.len() + entries.len() > MAX_VULN_DB_ENTRIES {
                warn!(
                    current = all_entries.len(),
                    new = entries.len(),
                    max = MAX_VULN_DB_ENTRIES,
                    "vulnerability database entry limit reached, truncating"
                );
                let remaining = MAX_VULN_DB_ENTRIES.saturating_sub(all_entries.len());
                all_entries.extend(entries.into_iter().take(remaining));
                break;
            }

            info!(path = %file_path.display(), entries = entries.len(), "loaded vuln db file");
            all_entries.extend(entries);
        }

        Ok(Self::from_entries(all_entries))
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// 패키지 이름과 유형으로 취약점을 조회합니다.
    pub fn lookup(&self, package: &str, package_type: &str) -> Vec<&VulnDbEntry> {
        self.index
            .get(&(package.to_owned(), package_type.to_owned()))
            .map(|indices| indices.iter().filter_map(|&i| self.entries.get(i)).collect())
            .unwrap_or_default()
    }
}
