//! curation 캐시 확인
//!
//! curation 실행에서 캐시를 사용하는 기술(현재 Maven)은 첫 실행일 때
//! 시간이 더 걸린다는 안내를 해석 로그에 덧붙입니다.

use std::path::{Path, PathBuf};

use scaudit_core::types::Technology;

use crate::error::ScaError;

/// 첫 실행 안내 문구 (해석 로그 메시지 뒤에 붙음)
pub const FIRST_RUN_NOTICE: &str = ". Quick note: we're running our first scan on the project with curation-audit. Expect this one to take a bit longer. Subsequent scans will be faster. Thanks for your patience";

/// 캐시 루트 아래 기본 경로 (`$HOME/.scaudit/curation`)
const DEFAULT_CACHE_SUBDIR: &str = ".scaudit/curation";

/// curation 확인 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurationCache {
    /// 해석 로그에 덧붙일 안내 (없으면 빈 문자열)
    pub log_message: String,
    /// 리졸버에 전달할 캐시 디렉토리
    pub folder: Option<PathBuf>,
}

/// 기술별 curation 캐시 디렉토리
///
/// 캐시를 사용하지 않는 기술은 `None`입니다.
pub fn cache_dir_for(technology: Technology, base: Option<&Path>) -> Result<Option<PathBuf>, ScaError> {
    if technology != Technology::Maven {
        return Ok(None);
    }

    let base = match base {
        Some(b) => b.to_path_buf(),
        None => default_cache_root()?,
    };
    Ok(Some(base.join(technology.as_str())))
}

/// curation 캐시 상태를 확인하고 안내 문구를 결정합니다.
///
/// curation 실행이 아니거나 캐시를 쓰지 않는 기술이면 아무것도 하지 않습니다.
/// 캐시 디렉토리가 없거나 비어있으면 [`FIRST_RUN_NOTICE`]를 반환합니다.
pub fn check_curation_cache(
    curation: bool,
    technology: Technology,
    base: Option<&Path>,
) -> Result<CurationCache, ScaError> {
    if !curation {
        return Ok(CurationCache::default());
    }

    let Some(folder) = cache_dir_for(technology, base)? else {
        return Ok(CurationCache::default());
    };

    let first_run = match std::fs::read_dir(&folder) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            return Err(ScaError::CurationCache {
                path: folder.display().to_string(),
                reason: e.to_string(),
            });
        }
    };

    Ok(CurationCache {
        log_message: if first_run {
            FIRST_RUN_NOTICE.to_owned()
        } else {
            String::new()
        },
        folder: Some(folder),
    })
}

fn default_cache_root() -> Result<PathBuf, ScaError> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(|home| PathBuf::from(home).join(DEFAULT_CACHE_SUBDIR))
        .ok_or_else(|| ScaError::CurationCache {
            path: DEFAULT_CACHE_SUBDIR.to_owned(),
            reason: "HOME is not set".to_owned(),
        })
}
