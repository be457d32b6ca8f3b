//! 서드파티 applicability 힌트 선택
//!
//! 스캔이 끝난 단위마다 applicability(도달 가능성) 스캔에 넘길
//! 의존성 ID를 고르고, 실행 전체에서 공유하는 [`ApplicabilityHints`]에 누적합니다.

use std::collections::BTreeSet;

use serde::Serialize;

use scaudit_core::types::Technology;

use crate::types::{DependencyNode, FlatGraph};

/// 평탄화된 전체 의존성을 사용할지 결정합니다.
///
/// pip 트리는 일부 직접 의존성을 전이 의존성으로 잘못 분류하므로 항상 전체를 사용합니다.
/// npm은 `third_party` 플래그가 켜진 경우에만 전체를 사용합니다.
pub fn should_use_all_dependencies(third_party: bool, technology: Technology) -> bool {
    technology == Technology::Pip || (third_party && technology == Technology::Npm)
}

/// 각 트리 루트의 직접 자식 ID 집합
pub fn direct_dependencies(trees: &[DependencyNode]) -> BTreeSet<String> {
    trees
        .iter()
        .flat_map(|tree| tree.nodes.iter().map(|n| n.id.clone()))
        .collect()
}

/// 한 단위의 applicability 힌트를 계산합니다.
pub fn select_applicability_dependencies(
    technology: Technology,
    third_party: bool,
    full_trees: &[DependencyNode],
    flat_graph: &FlatGraph,
) -> BTreeSet<String> {
    if should_use_all_dependencies(third_party, technology) {
        flat_graph.ids().map(str::to_owned).collect()
    } else {
        direct_dependencies(full_trees)
    }
}

/// 실행 전체의 applicability 힌트 누적기 (추가 전용, 중복 제거)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ApplicabilityHints {
    dependencies: BTreeSet<String>,
}

impl ApplicabilityHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, dependencies: impl IntoIterator<Item = String>) {
        self.dependencies.extend(dependencies);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.dependencies.contains(id)
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(String::as_str)
    }
}
