//! 로컬 취약점 DB 스캔 서비스
//!
//! [`VulnDbScanService`]는 [`ScanService`]의 로컬 구현입니다. 평탄화 그래프의
//! 컴포넌트 ID(`<type>://<name>:<version>`)를 [`VulnDb`]와 대조하여
//! 원격 스캔 서비스와 같은 형태의 [`ScanResponse`]를 만듭니다.
//!
//! # 사용 흐름
//!
//! 1. `VulnDb::load_from_dir()` -- 로컬 JSON DB 로드
//! 2. `VulnDbScanService::new(Arc<VulnDb>)` -- 서비스 생성
//! 3. 러너 빌더에 `.service(...)`로 주입

pub mod db;
pub mod version;

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use scaudit_core::types::Technology;

use crate::config::ScanGraphParams;
use crate::error::ScaError;
use crate::service::ScanService;
use crate::types::{ComponentImpact, FlatGraph, ScanResponse, Vulnerability};

pub use db::{VersionRange, VulnDb, VulnDbEntry};

/// 컴포넌트 ID를 `(package_type, name, version)`으로 분해합니다.
///
/// Maven 좌표(`gav://group:artifact:version`)는 마지막 `:` 기준으로 나누므로
/// 이름이 `group:artifact`가 됩니다.
pub fn parse_component_id(id: &str) -> Option<(&str, &str, &str)> {
    let (package_type, rest) = id.split_once("://")?;
    let (name, version) = rest.rsplit_once(':')?;
    if package_type.is_empty() || name.is_empty() || version.is_empty() {
        return None;
    }
    Some((package_type, name, version))
}

/// 로컬 취약점 DB 기반 스캔 서비스
#[derive(Clone)]
pub struct VulnDbScanService {
    db: Arc<VulnDb>,
}

impl VulnDbScanService {
    pub fn new(db: Arc<VulnDb>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &VulnDb {
        &self.db
    }

    /// 그래프의 모든 컴포넌트를 DB와 대조합니다.
    ///
    /// 같은 CVE가 여러 컴포넌트에 영향을 주면 하나의 취약점 레코드로 합칩니다.
    pub fn match_graph(&self, graph: &FlatGraph, params: &ScanGraphParams) -> ScanResponse {
        let mut response = ScanResponse {
            scan_id: uuid::Uuid::new_v4().to_string(),
            ..Default::default()
        };
        if !params.include_vulnerabilities {
            return response;
        }

        let mut by_cve: HashMap<String, usize> = HashMap::new();

        for id in graph.ids() {
            let Some((package_type, name, version)) = parse_component_id(id) else {
                debug!(component = id, "skipping component with unrecognized id");
                continue;
            };

            for entry in self.db.lookup(name, package_type) {
                if !version::is_affected(version, &entry.affected_ranges) {
                    continue;
                }
                if params.min_severity.is_some_and(|min| entry.severity < min) {
                    continue;
                }
                if params.fixable_only && entry.fixed_version.is_none() {
                    continue;
                }

                let impact = ComponentImpact {
                    fixed_versions: entry.fixed_version.iter().cloned().collect(),
                    impact_paths: Vec::new(),
                };

                match by_cve.get(&entry.cve_id) {
                    Some(&idx) => {
                        response.vulnerabilities[idx]
                            .components
                            .insert(id.to_owned(), impact);
                    }
                    None => {
                        by_cve.insert(entry.cve_id.clone(), response.vulnerabilities.len());
                        response.vulnerabilities.push(Vulnerability {
                            issue_id: entry.cve_id.clone(),
                            cves: vec![entry.cve_id.clone()],
                            summary: entry.description.clone(),
                            severity: entry.severity,
                            components: BTreeMap::from([(id.to_owned(), impact)]),
                        });
                    }
                }
            }
        }

        response
    }
}

impl ScanService for VulnDbScanService {
    fn scan_graph(
        &self,
        technology: Technology,
        graph: &FlatGraph,
        params: &ScanGraphParams,
    ) -> impl Future<Output = Result<Vec<ScanResponse>, ScaError>> + Send {
        let response = self.match_graph(graph, params);
        debug!(
            technology = %technology,
            components = graph.len(),
            vulnerabilities = response.vulnerabilities.len(),
            "matched flat graph against local vulnerability database"
        );
        std::future::ready(Ok(vec![response]))
    }
}
