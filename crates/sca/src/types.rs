//! SCA 도메인 타입
//!
//! 의존성 트리, 평탄화 그래프, 스캔 단위, 스캔 응답을 정의합니다.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use scaudit_core::types::{Severity, Technology};

/// 의존성 트리 노드
///
/// 자식을 소유하는 트리 구조이므로 순환이 없습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    /// 컴포넌트 ID (예: `npm://lodash:4.17.21`)
    pub id: String,
    /// 자식 노드
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<DependencyNode>,
}

impl DependencyNode {
    /// 자식이 없는 노드를 생성합니다.
    pub fn leaf(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nodes: Vec::new(),
        }
    }

    /// 자식을 가진 노드를 생성합니다.
    pub fn with_children(id: impl Into<String>, nodes: Vec<DependencyNode>) -> Self {
        Self {
            id: id.into(),
            nodes,
        }
    }

    /// 루트를 포함한 전체 노드 수
    pub fn node_count(&self) -> usize {
        1 + self.nodes.iter().map(DependencyNode::node_count).sum::<usize>()
    }
}

/// 평탄화 그래프의 자식 노드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatNode {
    /// 컴포넌트 ID
    pub id: String,
    /// 관계 레이블 (레이블 없는 그래프에서는 None)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<BTreeSet<String>>,
}

/// 하나의 기술에 대한 고유 컴포넌트 목록
///
/// 합성 루트의 직계 자식으로 고유한 컴포넌트 ID가 한 번씩만 나타납니다.
/// 생성은 [`graph`](crate::graph) 모듈의 빌더를 통해서만 이루어집니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlatGraph {
    pub(crate) nodes: Vec<FlatNode>,
}

impl FlatGraph {
    pub fn nodes(&self) -> &[FlatNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 자식 ID를 순서대로 반환합니다.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }
}

/// 의존성 해석 결과
#[derive(Debug, Clone, Default)]
pub struct DependencyTreeResult {
    /// 프로젝트 루트별 전체 의존성 트리
    pub full_trees: Vec<DependencyNode>,
    /// 고유 컴포넌트 그래프 (의존성이 없으면 None)
    pub flat_graph: Option<FlatGraph>,
    /// 컴포넌트 ID → 아티팩트 다운로드 URL
    pub download_urls: BTreeMap<String, String>,
}

/// 스캔 작업 단위
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanUnit {
    /// 기술
    pub technology: Technology,
    /// 작업 디렉토리 (절대 경로)
    pub working_directory: PathBuf,
    /// 탐지된 디스크립터 파일
    #[serde(default)]
    pub descriptors: Vec<PathBuf>,
    /// 루트가 여러 개인 프로젝트인지 (해석 이후 설정)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_multiple_root_project: Option<bool>,
    /// 스캔 응답 (추가만 가능)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    results: Vec<ScanResponse>,
}

impl ScanUnit {
    pub fn new(
        technology: Technology,
        working_directory: impl Into<PathBuf>,
        descriptors: Vec<PathBuf>,
    ) -> Self {
        Self {
            technology,
            working_directory: working_directory.into(),
            descriptors,
            is_multiple_root_project: None,
            results: Vec::new(),
        }
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn results(&self) -> &[ScanResponse] {
        &self.results
    }

    /// 스캔 응답을 뒤에 추가합니다.
    pub fn append_results(&mut self, responses: impl IntoIterator<Item = ScanResponse>) {
        self.results.extend(responses);
    }

    /// 모든 응답의 취약점 수
    pub fn vulnerability_count(&self) -> usize {
        self.results.iter().map(|r| r.vulnerabilities.len()).sum()
    }

    /// 모든 응답의 정책 위반 수
    pub fn violation_count(&self) -> usize {
        self.results.iter().map(|r| r.violations.len()).sum()
    }
}

/// 스캔 서비스 응답
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResponse {
    /// 스캔 ID
    pub scan_id: String,
    /// 보고된 취약점
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
    /// 보고된 정책 위반
    #[serde(default)]
    pub violations: Vec<Violation>,
}

/// 보고된 취약점
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// 이슈 ID
    pub issue_id: String,
    /// 관련 CVE 목록
    #[serde(default)]
    pub cves: Vec<String>,
    /// 요약
    pub summary: String,
    /// 심각도
    pub severity: Severity,
    /// 영향받는 컴포넌트 ID → 영향 정보
    pub components: BTreeMap<String, ComponentImpact>,
}

/// 보고된 정책 위반
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// 이슈 ID
    pub issue_id: String,
    /// 위반한 watch 이름
    pub watch_name: String,
    /// 위반 종류 (security, license, ...)
    pub violation_type: String,
    /// 요약
    pub summary: String,
    /// 심각도
    pub severity: Severity,
    /// 영향받는 컴포넌트 ID → 영향 정보
    pub components: BTreeMap<String, ComponentImpact>,
}

/// 컴포넌트별 영향 정보
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentImpact {
    /// 수정 버전 목록
    #[serde(default)]
    pub fixed_versions: Vec<String>,
    /// 루트에서 컴포넌트까지의 경로들
    #[serde(default)]
    pub impact_paths: Vec<Vec<ImpactPathNode>>,
}

/// 영향 경로의 한 노드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactPathNode {
    pub component_id: String,
}
