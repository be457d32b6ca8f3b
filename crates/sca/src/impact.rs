//! 영향 경로 계산
//!
//! 스캔 응답에 보고된 각 컴포넌트에 대해, 전체 의존성 트리의 루트에서
//! 그 컴포넌트까지 이르는 모든 경로를 붙입니다. 평탄화 그래프는 사용하지 않습니다.
//!
//! 트리에 없는 컴포넌트는 빈 경로 목록을 받습니다.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{ComponentImpact, DependencyNode, ImpactPathNode, ScanResponse};

/// 모든 응답의 취약점/위반 컴포넌트에 영향 경로를 채웁니다.
pub fn enrich_responses(responses: &mut [ScanResponse], full_trees: &[DependencyNode]) {
    let targets: BTreeSet<String> = responses
        .iter()
        .flat_map(|r| {
            r.vulnerabilities
                .iter()
                .flat_map(|v| v.components.keys())
                .chain(r.violations.iter().flat_map(|v| v.components.keys()))
        })
        .cloned()
        .collect();

    if targets.is_empty() {
        return;
    }

    let paths = collect_impact_paths(full_trees, &targets);

    for response in responses.iter_mut() {
        for vuln in &mut response.vulnerabilities {
            attach(&mut vuln.components, &paths);
        }
        for violation in &mut response.violations {
            attach(&mut violation.components, &paths);
        }
    }
}

/// 단일 컴포넌트의 영향 경로를 계산합니다.
pub fn impact_paths_for(
    component_id: &str,
    full_trees: &[DependencyNode],
) -> Vec<Vec<ImpactPathNode>> {
    let targets = BTreeSet::from([component_id.to_owned()]);
    collect_impact_paths(full_trees, &targets)
        .remove(component_id)
        .unwrap_or_default()
}

fn attach(
    components: &mut BTreeMap<String, ComponentImpact>,
    paths: &BTreeMap<String, Vec<Vec<ImpactPathNode>>>,
) {
    for (id, impact) in components.iter_mut() {
        impact.impact_paths = paths.get(id).cloned().unwrap_or_default();
    }
}

/// 트리를 한 번씩 순회하며 대상 컴포넌트들의 경로를 모읍니다.
fn collect_impact_paths(
    full_trees: &[DependencyNode],
    targets: &BTreeSet<String>,
) -> BTreeMap<String, Vec<Vec<ImpactPathNode>>> {
    let mut found = BTreeMap::new();
    let mut stack = Vec::new();
    for tree in full_trees {
        walk(tree, targets, &mut stack, &mut found);
    }
    found
}

fn walk<'a>(
    node: &'a DependencyNode,
    targets: &BTreeSet<String>,
    stack: &mut Vec<&'a str>,
    found: &mut BTreeMap<String, Vec<Vec<ImpactPathNode>>>,
) {
    stack.push(&node.id);

    if targets.contains(&node.id) {
        let path = stack
            .iter()
            .map(|id| ImpactPathNode {
                component_id: (*id).to_owned(),
            })
            .collect();
        found.entry(node.id.clone()).or_default().push(path);
    }

    for child in &node.nodes {
        walk(child, targets, stack, found);
    }

    stack.pop();
}
