//! 기술 스택 탐지 -- 디렉토리에서 패키지 관리자 디스크립터 파일 찾기
//!
//! [`TechnologyDetector`] trait은 요청 디렉토리를
//! `기술 → (작업 디렉토리 → 디스크립터 목록)` 맵으로 변환하는 인터페이스입니다.
//! [`DescriptorDetector`]는 알려진 디스크립터 파일명으로 판별하는 기본 구현입니다.
//!
//! # 인식하는 디스크립터
//!
//! | 기술 | 파일 |
//! |---|---|
//! | Maven | `pom.xml` |
//! | Gradle | `build.gradle`, `build.gradle.kts` |
//! | npm / Yarn / pnpm | `package.json` (형제 lockfile로 구분) |
//! | Go | `go.mod` |
//! | Pip | `requirements.txt`, `setup.py`, 요청된 requirements 파일 |
//! | Pipenv | `Pipfile` |
//! | Poetry | `[tool.poetry]`가 있는 `pyproject.toml` |
//! | NuGet + .NET | `*.sln`, `*.csproj` |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use scaudit_core::types::Technology;

use crate::error::ScaError;

/// 작업 디렉토리 → 디스크립터 목록
pub type WorkingDirDescriptors = BTreeMap<PathBuf, Vec<PathBuf>>;

/// 기술 → 작업 디렉토리 맵
pub type DetectedTechnologies = BTreeMap<Technology, WorkingDirDescriptors>;

/// 재귀 탐지 기본 최대 깊이
const DEFAULT_MAX_DEPTH: usize = 16;

/// 탐지 요청
#[derive(Debug, Clone, Copy)]
pub struct DetectionRequest<'a> {
    /// 탐지 대상 디렉토리
    pub directory: &'a Path,
    /// 하위 디렉토리까지 탐지
    pub recursive: bool,
    /// 기술 필터 (비어있으면 전체)
    pub technologies: &'a [Technology],
    /// 기술별 추가 디스크립터 파일명
    pub requested_descriptors: &'a BTreeMap<Technology, Vec<String>>,
    /// 제외할 디렉토리 이름
    pub exclude_patterns: &'a [String],
}

/// 기술 스택 탐지기 trait
pub trait TechnologyDetector: Send + Sync {
    /// 디렉토리에서 기술과 작업 디렉토리를 탐지합니다.
    ///
    /// 기술 필터로 요청되었지만 발견되지 않은 기술은 빈 맵으로 포함됩니다.
    fn detect(&self, request: &DetectionRequest<'_>) -> Result<DetectedTechnologies, ScaError>;
}

/// 디스크립터 파일명 기반 탐지기
pub struct DescriptorDetector {
    max_depth: usize,
}

impl DescriptorDetector {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }
}

impl Default for DescriptorDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TechnologyDetector for DescriptorDetector {
    fn detect(&self, request: &DetectionRequest<'_>) -> Result<DetectedTechnologies, ScaError> {
        let root = request
            .directory
            .canonicalize()
            .map_err(|e| ScaError::Detection {
                path: request.directory.display().to_string(),
                reason: e.to_string(),
            })?;

        if !root.is_dir() {
            return Err(ScaError::Detection {
                path: root.display().to_string(),
                reason: "not a directory".to_owned(),
            });
        }

        let requested = resolve_requested(&root, request.requested_descriptors);
        let depth = if request.recursive { self.max_depth } else { 1 };
        let walker = WalkDir::new(&root)
            .max_depth(depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_excluded(e, request.exclude_patterns));

        let mut detected = DetectedTechnologies::new();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(dir) = path.parent() else {
                continue;
            };

            for tech in classify(path, &requested) {
                detected
                    .entry(tech)
                    .or_default()
                    .entry(dir.to_path_buf())
                    .or_default()
                    .push(path.to_path_buf());
            }
        }

        for tech in [Technology::Maven, Technology::Gradle] {
            if let Some(dirs) = detected.get_mut(&tech) {
                collapse_nested_modules(dirs);
            }
        }

        if !request.technologies.is_empty() {
            detected.retain(|tech, _| request.technologies.contains(tech));
            for tech in request.technologies {
                detected.entry(*tech).or_default();
            }
        }

        tracing::debug!(
            directory = %root.display(),
            technologies = detected.len(),
            "technology detection finished"
        );

        Ok(detected)
    }
}

/// 파일 하나가 가리키는 기술 목록
fn classify(path: &Path, requested: &[(Technology, PathBuf)]) -> Vec<Technology> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };

    let mut techs = match name {
        "pom.xml" => vec![Technology::Maven],
        "build.gradle" | "build.gradle.kts" => vec![Technology::Gradle],
        "package.json" => vec![javascript_technology(path)],
        "go.mod" => vec![Technology::Go],
        "requirements.txt" | "setup.py" => vec![Technology::Pip],
        "Pipfile" => vec![Technology::Pipenv],
        "pyproject.toml" if is_poetry_project(path) => vec![Technology::Poetry],
        _ => match path.extension().and_then(|e| e.to_str()) {
            // NuGet과 .NET은 같은 방식으로 탐지됨
            Some("sln") | Some("csproj") => vec![Technology::Nuget, Technology::Dotnet],
            _ => Vec::new(),
        },
    };

    for (tech, wanted) in requested {
        if wanted == path && !techs.contains(tech) {
            techs.push(*tech);
        }
    }

    techs
}

/// 형제 lockfile로 npm / Yarn / pnpm 을 구분합니다.
fn javascript_technology(package_json: &Path) -> Technology {
    let dir = package_json.parent().unwrap_or(Path::new("."));
    if dir.join("yarn.lock").is_file() {
        Technology::Yarn
    } else if dir.join("pnpm-lock.yaml").is_file() {
        Technology::Pnpm
    } else {
        Technology::Npm
    }
}

fn is_poetry_project(pyproject: &Path) -> bool {
    match std::fs::read_to_string(pyproject) {
        Ok(content) => content.contains("[tool.poetry]"),
        Err(e) => {
            tracing::debug!(path = %pyproject.display(), error = %e, "failed to read pyproject.toml");
            false
        }
    }
}

/// 요청된 디스크립터 경로를 탐지 루트 기준의 절대 경로로 변환합니다.
fn resolve_requested(
    root: &Path,
    requested: &BTreeMap<Technology, Vec<String>>,
) -> Vec<(Technology, PathBuf)> {
    requested
        .iter()
        .flat_map(|(tech, files)| {
            files.iter().map(move |file| {
                let full = root.join(file);
                let full = full.canonicalize().unwrap_or(full);
                (*tech, full)
            })
        })
        .collect()
}

fn is_excluded(entry: &DirEntry, patterns: &[String]) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| patterns.iter().any(|p| p == name))
}

/// 상위 디렉토리가 이미 작업 디렉토리이면 하위 모듈을 그쪽으로 합칩니다.
fn collapse_nested_modules(dirs: &mut WorkingDirDescriptors) {
    let roots: Vec<PathBuf> = dirs.keys().cloned().collect();
    let nested: Vec<(PathBuf, PathBuf)> = roots
        .iter()
        .filter_map(|dir| {
            roots
                .iter()
                .filter(|other| *other != dir && dir.starts_with(other))
                .min_by_key(|other| other.components().count())
                .map(|top| (dir.clone(), top.clone()))
        })
        .collect();

    for (dir, top) in nested {
        if let Some(mut descriptors) = dirs.remove(&dir)
            && let Some(target) = dirs.get_mut(&top)
        {
            target.append(&mut descriptors);
        }
    }
}
