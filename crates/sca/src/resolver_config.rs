//! 기술별 리졸버 설정 파일
//!
//! 작업 디렉토리와 그 상위 디렉토리에서 `.scaudit/projects/<technology>.yaml`
//! 파일을 찾아 의존성 해석 저장소와 서버 정보를 적용합니다.
//!
//! # 파일 형식
//!
//! ```yaml
//! version: 1
//! resolver:
//!   repo: npm-remote
//!   serverId: corp
//!   url: https://corp.example.com/   # serverId가 현재 서버와 다를 때 필요
//! ```
//!
//! `resolver`가 없는 파일은 에러가 아니며 기본 레지스트리를 사용합니다.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use scaudit_core::types::{ServerDetails, Technology};

use crate::config::ResolutionSettings;
use crate::error::ScaError;

/// 설정 파일 디렉토리 (작업 디렉토리 기준 상대 경로)
pub const PROJECT_CONFIG_DIR: &str = ".scaudit/projects";

/// 리졸버 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// 해석 저장소
    pub repo: String,
    /// 서버 식별자
    pub server_id: String,
    /// 서버 URL (없으면 현재 서버 설정에서 찾음)
    pub url: Option<String>,
}

impl ResolverConfig {
    /// 해석에 사용할 서버 정보를 계산합니다.
    ///
    /// 현재 서버와 같은 ID이면 URL과 토큰을 이어받습니다.
    pub fn server_details(&self, current: &ServerDetails) -> Result<ServerDetails, ScaError> {
        let same_server = self.server_id.is_empty() || self.server_id == current.server_id;
        let url = match (&self.url, same_server) {
            (Some(url), _) => url.clone(),
            (None, true) => current.url.clone(),
            (None, false) => {
                return Err(ScaError::Config {
                    field: "resolver.serverId".to_owned(),
                    reason: format!(
                        "failed getting server details: unknown server '{}' and no url given",
                        self.server_id
                    ),
                });
            }
        };

        Ok(ServerDetails {
            server_id: if self.server_id.is_empty() {
                current.server_id.clone()
            } else {
                self.server_id.clone()
            },
            url,
            access_token: if same_server {
                current.access_token.clone()
            } else {
                String::new()
            },
        })
    }
}

#[derive(Deserialize)]
struct ProjectConfigFile {
    #[serde(default)]
    resolver: Option<ResolverSection>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolverSection {
    #[serde(default)]
    repo: String,
    #[serde(default)]
    server_id: String,
    #[serde(default)]
    url: Option<String>,
}

/// 작업 디렉토리부터 상위로 올라가며 기술의 설정 파일을 찾습니다.
pub fn find_config_file(technology: Technology, start_dir: &Path) -> Result<Option<PathBuf>, ScaError> {
    let file_name = format!("{}.yaml", technology.as_str());

    for dir in start_dir.ancestors() {
        let candidate = dir.join(PROJECT_CONFIG_DIR).join(&file_name);
        match std::fs::metadata(&candidate) {
            Ok(meta) if meta.is_file() => return Ok(Some(candidate)),
            Ok(_) => continue,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(ScaError::ConfigFile {
                    technology,
                    path: candidate.display().to_string(),
                    reason: format!("failed while searching for {file_name} config file: {e}"),
                });
            }
        }
    }

    Ok(None)
}

/// 설정 파일에서 리졸버 설정만 읽습니다.
///
/// 리졸버가 선언되지 않았으면 [`ScaError::MissingResolver`]를 반환합니다.
pub fn read_resolution_config(technology: Technology, path: &Path) -> Result<ResolverConfig, ScaError> {
    let content = std::fs::read_to_string(path).map_err(|e| ScaError::ConfigFile {
        technology,
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let parsed: ProjectConfigFile =
        serde_yaml::from_str(&content).map_err(|e| ScaError::ConfigFile {
            technology,
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    match parsed.resolver {
        Some(section) if !section.repo.is_empty() => Ok(ResolverConfig {
            repo: section.repo,
            server_id: section.server_id,
            url: section.url,
        }),
        _ => Err(ScaError::MissingResolver {
            path: path.display().to_string(),
        }),
    }
}

/// 설정 파일이 있으면 해석 저장소와 서버 정보를 적용합니다.
///
/// - `deps_repo`가 이미 있거나 `ignore_config_file`이면 아무것도 하지 않습니다.
/// - NuGet 파일이 없으면 .NET 파일을 찾습니다.
/// - 리졸버가 선언되지 않은 파일은 무시합니다.
pub fn set_resolution_repo_if_exists(
    settings: &mut ResolutionSettings,
    technology: Technology,
    working_dir: &Path,
) -> Result<(), ScaError> {
    if !settings.deps_repo.is_empty() || settings.ignore_config_file {
        return Ok(());
    }

    let mut config_path = find_config_file(technology, working_dir)?;
    if config_path.is_none() && technology == Technology::Nuget {
        config_path = find_config_file(Technology::Dotnet, working_dir)?;
    }

    let Some(config_path) = config_path else {
        debug!(
            technology = %technology,
            "no {technology}.yaml configuration file was found, resolving dependencies from default registry"
        );
        return Ok(());
    };

    debug!(path = %config_path.display(), "using resolver config");
    let config = match read_resolution_config(technology, &config_path) {
        Ok(c) => c,
        Err(ScaError::MissingResolver { .. }) => {
            debug!(path = %config_path.display(), "no resolver declared, using defaults");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let details = config.server_details(&settings.server)?;
    settings.set_server_details(details);
    settings.set_deps_repo(config.repo);
    Ok(())
}
