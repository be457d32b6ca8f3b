//! 평탄화 그래프 빌더
//!
//! 리졸버가 반환한 고유 컴포넌트 목록을 합성 루트 하나 아래의
//! [`FlatGraph`]로 변환합니다. 입력에 중복이 있어도 자식 ID는 한 번씩만 나타납니다.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::Level;

use crate::types::{FlatGraph, FlatNode};

/// 레이블 없는 고유 ID 목록으로 그래프를 만듭니다.
///
/// 처음 나타난 순서를 유지합니다.
pub fn build_flat_graph<I, S>(unique_ids: I) -> FlatGraph
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let nodes: Vec<FlatNode> = unique_ids
        .into_iter()
        .map(Into::<String>::into)
        .filter(|id| seen.insert(id.clone()))
        .map(|id| FlatNode { id, types: None })
        .collect();

    log_unique_dependencies(|| {
        serde_json::to_string_pretty(&nodes.iter().map(|n| &n.id).collect::<Vec<_>>())
    });

    FlatGraph { nodes }
}

/// ID → 관계 레이블 맵으로 그래프를 만듭니다.
pub fn build_typed_flat_graph(unique_ids: &BTreeMap<String, BTreeSet<String>>) -> FlatGraph {
    log_unique_dependencies(|| serde_json::to_string_pretty(unique_ids));

    let nodes = unique_ids
        .iter()
        .map(|(id, types)| FlatNode {
            id: id.clone(),
            types: Some(types.clone()),
        })
        .collect();

    FlatGraph { nodes }
}

/// DEBUG가 활성화된 경우에만 목록을 직렬화합니다.
fn log_unique_dependencies<F>(render: F)
where
    F: FnOnce() -> serde_json::Result<String>,
{
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }
    match render() {
        Ok(listing) => tracing::debug!("Unique dependencies list:\n{listing}"),
        Err(e) => tracing::warn!(error = %e, "failed to serialize unique dependencies"),
    }
}
