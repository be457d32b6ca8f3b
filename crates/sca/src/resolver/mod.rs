//! 의존성 트리 해석 -- 기술별 리졸버 디스패치
//!
//! [`DependencyResolver`] trait은 기술별 의존성 트리 빌더가 구현하는 인터페이스입니다.
//! [`ResolverTable`]은 기술 → 리졸버 디스패치 테이블이며, 등록되지 않은 기술은
//! "`<tech>` is currently not supported" 에러가 됩니다.
//!
//! [`get_tech_dependency_tree`]는 해석 전 단계(curation 캐시 확인, 리졸버 설정 파일 적용)와
//! 해석 후 평탄화 그래프 생성을 묶습니다.
//!
//! # 확장
//!
//! 새 기술을 지원하려면 `DependencyResolver`를 구현하고 `ResolverTable::register`로 등록합니다.

pub mod npm;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tracing::{debug, info};

use scaudit_core::metrics as m;
use scaudit_core::types::Technology;

use crate::config::ResolutionSettings;
use crate::curation::check_curation_cache;
use crate::error::ScaError;
use crate::graph::{build_flat_graph, build_typed_flat_graph};
use crate::resolver_config::set_resolution_repo_if_exists;
use crate::types::{DependencyNode, DependencyTreeResult, ScanUnit};

pub use npm::NpmLockResolver;

/// 리졸버에 전달되는 해석 컨텍스트
///
/// 작업 디렉토리를 프로세스 전역 상태 대신 명시적으로 전달합니다.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    /// 대상 기술
    pub technology: Technology,
    /// 작업 디렉토리 (절대 경로)
    pub working_directory: &'a Path,
    /// 탐지된 디스크립터
    pub descriptors: &'a [PathBuf],
    /// 해석 설정 (리졸버 설정 파일 적용 후)
    pub settings: &'a ResolutionSettings,
    /// curation 캐시 디렉토리
    pub curation_cache_folder: Option<&'a Path>,
}

/// 고유 컴포넌트 목록
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueDependencies {
    /// 레이블 없는 ID 목록
    Ids(Vec<String>),
    /// ID → 관계 레이블
    Typed(BTreeMap<String, BTreeSet<String>>),
}

impl UniqueDependencies {
    pub fn len(&self) -> usize {
        match self {
            Self::Ids(ids) => ids.len(),
            Self::Typed(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 리졸버 출력
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependencies {
    /// 프로젝트 루트별 전체 트리
    pub full_trees: Vec<DependencyNode>,
    /// 고유 컴포넌트
    pub unique: UniqueDependencies,
    /// 컴포넌트 ID → 다운로드 URL
    pub download_urls: BTreeMap<String, String>,
}

/// 기술별 의존성 트리 빌더 trait
pub trait DependencyResolver: Send + Sync {
    /// 작업 디렉토리의 의존성 트리를 해석합니다.
    fn resolve(&self, ctx: &ResolutionContext<'_>) -> Result<ResolvedDependencies, ScaError>;
}

/// 기술 → 리졸버 디스패치 테이블
#[derive(Clone, Default)]
pub struct ResolverTable {
    resolvers: HashMap<Technology, Arc<dyn DependencyResolver>>,
}

impl ResolverTable {
    /// 빈 테이블을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 내장 리졸버가 등록된 테이블을 생성합니다.
    pub fn with_defaults() -> Self {
        Self::new().register(Technology::Npm, NpmLockResolver::new())
    }

    /// 리졸버를 등록합니다. 같은 기술의 기존 리졸버는 대체됩니다.
    pub fn register(mut self, technology: Technology, resolver: impl DependencyResolver + 'static) -> Self {
        self.resolvers.insert(technology, Arc::new(resolver));
        self
    }

    pub fn supports(&self, technology: Technology) -> bool {
        self.resolvers.contains_key(&technology)
    }

    /// 컨텍스트의 기술에 맞는 리졸버를 호출합니다.
    pub fn resolve(&self, ctx: &ResolutionContext<'_>) -> Result<ResolvedDependencies, ScaError> {
        match self.resolvers.get(&ctx.technology) {
            Some(resolver) => resolver.resolve(ctx),
            None => Err(ScaError::Unsupported {
                technology: ctx.technology,
            }),
        }
    }
}

/// 스캔 단위의 의존성 트리와 평탄화 그래프를 생성합니다.
///
/// 고유 컴포넌트가 하나도 없으면 `flat_graph`가 `None`인 결과를 반환하며,
/// 이를 실패로 처리하는 것은 호출자의 몫입니다.
pub fn get_tech_dependency_tree(
    settings: &mut ResolutionSettings,
    resolvers: &ResolverTable,
    unit: &ScanUnit,
) -> Result<DependencyTreeResult, ScaError> {
    let technology = unit.technology;

    let curation = check_curation_cache(
        settings.curation,
        technology,
        settings.curation_cache_dir.as_deref(),
    )?;
    info!(
        "Calculating {} dependencies{}...",
        technology.formal_name(),
        curation.log_message
    );

    set_resolution_repo_if_exists(settings, technology, unit.working_directory())?;

    let start = Instant::now();
    let ctx = ResolutionContext {
        technology,
        working_directory: unit.working_directory(),
        descriptors: &unit.descriptors,
        settings,
        curation_cache_folder: curation.folder.as_deref(),
    };
    let ResolvedDependencies {
        full_trees,
        unique,
        download_urls,
    } = resolvers.resolve(&ctx)?;

    let elapsed = start.elapsed();
    histogram!(m::SCA_RESOLUTION_DURATION_SECONDS, m::LABEL_TECHNOLOGY => technology.as_str())
        .record(elapsed.as_secs_f64());

    let mut result = DependencyTreeResult {
        full_trees,
        flat_graph: None,
        download_urls,
    };
    if unique.is_empty() {
        return Ok(result);
    }

    debug!(
        "Created '{}' dependency tree with {} nodes. Elapsed time: {:.1} seconds.",
        technology.formal_name(),
        unique.len(),
        elapsed.as_secs_f64()
    );

    result.flat_graph = Some(match unique {
        UniqueDependencies::Ids(ids) => build_flat_graph(ids),
        UniqueDependencies::Typed(map) => build_typed_flat_graph(&map),
    });
    Ok(result)
}
