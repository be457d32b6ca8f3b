//! SCA 실행 오케스트레이터 -- 계획, 해석, 스캔, 영향 경로
//!
//! [`ScaRunner`]는 계획된 스캔 단위를 순서대로 실행합니다.
//!
//! # 내부 아키텍처
//!
//! ```text
//! working_dirs --> TechnologyDetector --> plan_scans --> Vec<ScanUnit>
//!                                                            |
//!                          (단위마다: chdir --> 해석 --> 스캔 --> 영향 경로)
//!                                                            |
//!        ResolverTable --> DependencyTreeResult --> ScanService --> Vec<ScanResponse>
//!                                                            |
//!                                       ScaReport { results, errors, applicability }
//! ```
//!
//! # 작업 디렉토리
//!
//! 단위마다 프로세스 작업 디렉토리를 바꾸므로 실행은 항상 순차적입니다.
//! 원래 디렉토리는 성공, 실패, 취소 모두에서 복원됩니다.
//!
//! # 실패 처리
//!
//! 단위 실패(해석, 빈 의존성, 스캔 요청, 취소)는 [`ScaErrors`]에 모이고 다음 단위로 넘어갑니다.
//! 실패한 단위는 결과 목록에 들어가지 않습니다.
//! 작업 디렉토리 전환 실패는 실행 전체를 중단합니다.

use std::path::PathBuf;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use scaudit_core::metrics as m;
use scaudit_core::types::Technology;

use crate::applicability::{ApplicabilityHints, select_applicability_dependencies};
use crate::config::AuditParams;
use crate::detection::TechnologyDetector;
use crate::error::{ScaError, UnitError};
use crate::impact::enrich_responses;
use crate::planner::plan_scans;
use crate::report::ScaReport;
use crate::resolver::{ResolverTable, get_tech_dependency_tree};
use crate::service::ScanService;
use crate::types::{FlatGraph, ScanResponse, ScanUnit};

/// 지원하는 프로젝트가 없을 때의 안내
pub const NOTHING_TO_SCAN: &str = "Couldn't determine a package manager or build tool used by this project. Skipping the SCA scan...";

/// SCA 실행 오케스트레이터
///
/// 탐지기와 스캔 서비스는 제네릭으로 주입되며, 리졸버는 [`ResolverTable`]로 주입됩니다.
pub struct ScaRunner<D, S> {
    params: AuditParams,
    detector: D,
    service: S,
    resolvers: ResolverTable,
    cancel: CancellationToken,
}

impl<D, S> ScaRunner<D, S>
where
    D: TechnologyDetector,
    S: ScanService,
{
    /// 실행 파라미터
    pub fn params(&self) -> &AuditParams {
        &self.params
    }

    /// 실행 취소 토큰 (복제본)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 계획된 모든 스캔 단위를 실행합니다.
    ///
    /// 단위 실패는 보고서의 `errors`에 담기며 `Err`는 실행 전체가 중단된 경우에만 반환됩니다.
    pub async fn run(&self) -> Result<ScaReport, ScaError> {
        let original_dir = std::env::current_dir().map_err(|e| ScaError::WorkingDirectory {
            path: ".".to_owned(),
            source: e,
        })?;

        let units = plan_scans(&self.params, &self.detector);
        if units.is_empty() {
            info!("{NOTHING_TO_SCAN}");
            return Ok(ScaReport::default());
        }

        log_planned_units(&units);
        counter!(m::SCA_UNITS_PLANNED_TOTAL).increment(units.len() as u64);

        let mut guard = WorkingDirGuard::new(original_dir);
        let mut report = ScaReport::default();
        let outcome = self.execute_all(units, &mut report).await;
        let restored = guard.restore();

        outcome?;
        restored?;

        info!(
            units = report.results.len(),
            failed = report.errors.len(),
            vulnerabilities = report.vulnerability_count(),
            "SCA scan completed"
        );
        Ok(report)
    }

    async fn execute_all(&self, units: Vec<ScanUnit>, report: &mut ScaReport) -> Result<(), ScaError> {
        for mut unit in units {
            let technology = unit.technology;

            if self.cancel.is_cancelled() {
                record_unit(technology, "cancelled");
                report
                    .errors
                    .push(UnitError::new(technology, unit.working_directory, ScaError::Cancelled));
                continue;
            }

            info!(
                "Running SCA scan for {} vulnerable dependencies in {} directory...",
                technology,
                unit.working_directory.display()
            );
            std::env::set_current_dir(&unit.working_directory).map_err(|e| {
                ScaError::WorkingDirectory {
                    path: unit.working_directory.display().to_string(),
                    source: e,
                }
            })?;

            match self.execute_unit(&mut unit, &mut report.applicability).await {
                Ok(()) => {
                    record_unit(technology, "success");
                    report.results.push(unit);
                }
                Err(e) => {
                    record_unit(
                        technology,
                        if e.is_cancellation() { "cancelled" } else { "failure" },
                    );
                    let err = UnitError::new(technology, unit.working_directory.clone(), e);
                    warn!(
                        technology = %technology,
                        working_dir = %unit.working_directory.display(),
                        error = %err.error,
                        "SCA scan unit failed"
                    );
                    report.errors.push(err);
                }
            }
        }
        Ok(())
    }

    async fn execute_unit(
        &self,
        unit: &mut ScanUnit,
        hints: &mut ApplicabilityHints,
    ) -> Result<(), ScaError> {
        let technology = unit.technology;

        // 리졸버 설정 파일이 덮어쓴 서버/저장소가 다른 단위로 번지지 않도록 복제
        let mut settings = self.params.resolution.clone();
        let tree = get_tech_dependency_tree(&mut settings, &self.resolvers, unit).map_err(|e| {
            if e.is_cancellation() {
                e
            } else {
                ScaError::Resolver {
                    technology,
                    source: Box::new(e),
                }
            }
        })?;

        let flat_graph = match tree.flat_graph.as_ref() {
            Some(graph) if !graph.is_empty() => graph,
            _ => return Err(ScaError::EmptyDependencyTree),
        };
        counter!(m::SCA_DEPENDENCIES_RESOLVED_TOTAL, m::LABEL_TECHNOLOGY => technology.as_str())
            .increment(flat_graph.len() as u64);

        let mut responses = self.submit(technology, flat_graph).await?;

        enrich_responses(&mut responses, &tree.full_trees);
        unit.is_multiple_root_project = Some(tree.full_trees.len() > 1);

        hints.append(select_applicability_dependencies(
            technology,
            self.params.third_party_applicability,
            &tree.full_trees,
            flat_graph,
        ));

        let vulnerabilities: usize = responses.iter().map(|r| r.vulnerabilities.len()).sum();
        counter!(m::SCA_VULNERABILITIES_FOUND_TOTAL, m::LABEL_TECHNOLOGY => technology.as_str())
            .increment(vulnerabilities as u64);
        debug!(
            technology = %technology,
            responses = responses.len(),
            vulnerabilities,
            "scan responses received"
        );

        unit.append_results(responses);
        Ok(())
    }

    async fn submit(
        &self,
        technology: Technology,
        graph: &FlatGraph,
    ) -> Result<Vec<ScanResponse>, ScaError> {
        let timeout = self.params.scan_timeout;
        let start = Instant::now();

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ScaError::Cancelled),
            res = tokio::time::timeout(
                timeout,
                self.service.scan_graph(technology, graph, &self.params.scan),
            ) => match res {
                Ok(Ok(responses)) => Ok(responses),
                Ok(Err(e)) if e.is_cancellation() => Err(e),
                Ok(Err(e)) => Err(ScaError::ScanSubmission {
                    technology,
                    source: Box::new(e),
                }),
                Err(_) => Err(ScaError::Timeout {
                    secs: timeout.as_secs(),
                }),
            },
        };

        histogram!(m::SCA_SCAN_DURATION_SECONDS, m::LABEL_TECHNOLOGY => technology.as_str())
            .record(start.elapsed().as_secs_f64());
        outcome
    }
}

fn record_unit(technology: Technology, result: &'static str) {
    counter!(
        m::SCA_UNITS_SCANNED_TOTAL,
        m::LABEL_TECHNOLOGY => technology.as_str(),
        m::LABEL_RESULT => result
    )
    .increment(1);
}

fn log_planned_units(units: &[ScanUnit]) {
    match serde_json::to_string_pretty(units) {
        Ok(json) => info!("Performing {} SCA scans:\n{}", units.len(), json),
        Err(e) => {
            info!("Performing {} SCA scans", units.len());
            debug!(error = %e, "failed to render planned scans");
        }
    }
}

/// 원래 작업 디렉토리 복원 가드
///
/// `restore()`를 호출하지 못한 경우(패닉, future drop)에도 drop 시점에 복원합니다.
struct WorkingDirGuard {
    original: PathBuf,
    restored: bool,
}

impl WorkingDirGuard {
    fn new(original: PathBuf) -> Self {
        Self {
            original,
            restored: false,
        }
    }

    fn restore(&mut self) -> Result<(), ScaError> {
        self.restored = true;
        std::env::set_current_dir(&self.original).map_err(|e| ScaError::WorkingDirectory {
            path: self.original.display().to_string(),
            source: e,
        })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = std::env::set_current_dir(&self.original) {
            error!(
                path = %self.original.display(),
                error = %e,
                "failed to restore working directory"
            );
        }
    }
}

/// SCA 러너 빌더
pub struct ScaRunnerBuilder<D, S> {
    params: AuditParams,
    detector: D,
    service: S,
    resolvers: ResolverTable,
    cancel: Option<CancellationToken>,
}

impl<D, S> ScaRunnerBuilder<D, S>
where
    D: TechnologyDetector,
    S: ScanService,
{
    /// 탐지기와 스캔 서비스로 빌더를 생성합니다.
    ///
    /// 리졸버 테이블의 기본값은 [`ResolverTable::with_defaults`]입니다.
    pub fn new(detector: D, service: S) -> Self {
        Self {
            params: AuditParams::default(),
            detector,
            service,
            resolvers: ResolverTable::with_defaults(),
            cancel: None,
        }
    }

    /// 실행 파라미터를 지정합니다.
    pub fn params(mut self, params: AuditParams) -> Self {
        self.params = params;
        self
    }

    /// 리졸버 테이블을 지정합니다.
    pub fn resolvers(mut self, resolvers: ResolverTable) -> Self {
        self.resolvers = resolvers;
        self
    }

    /// 외부 취소 토큰을 지정합니다.
    ///
    /// 지정하지 않으면 빌더가 새 토큰을 생성합니다.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// 러너를 빌드합니다.
    pub fn build(self) -> Result<ScaRunner<D, S>, ScaError> {
        self.params.validate()?;
        Ok(ScaRunner {
            params: self.params,
            detector: self.detector,
            service: self.service,
            resolvers: self.resolvers,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuditParamsBuilder, ScanGraphParams};
    use crate::detection::DetectedTechnologies;
    use crate::planner::tests::StaticDetector;
    use crate::resolver::tests::StaticResolver;
    use crate::types::{ComponentImpact, DependencyNode, Vulnerability};
    use scaudit_core::types::Severity;
    use serial_test::serial;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    /// 컴포넌트마다 취약점 하나를 보고하는 스캔 서비스
    struct MockScanService {
        vulnerable: Vec<String>,
        delay: Option<Duration>,
        seen: Mutex<Vec<(Technology, Vec<String>)>>,
    }

    impl MockScanService {
        fn new(vulnerable: &[&str]) -> Self {
            Self {
                vulnerable: vulnerable.iter().map(|s| (*s).to_owned()).collect(),
                delay: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    impl ScanService for MockScanService {
        async fn scan_graph(
            &self,
            technology: Technology,
            graph: &FlatGraph,
            _params: &ScanGraphParams,
        ) -> Result<Vec<ScanResponse>, ScaError> {
            self.seen
                .lock()
                .unwrap()
                .push((technology, graph.ids().map(str::to_owned).collect()));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let vulnerabilities = graph
                .ids()
                .filter(|id| self.vulnerable.iter().any(|v| v == id))
                .map(|id| Vulnerability {
                    issue_id: format!("XRAY-{id}"),
                    cves: Vec::new(),
                    summary: String::new(),
                    severity: Severity::High,
                    components: BTreeMap::from([(id.to_owned(), ComponentImpact::default())]),
                })
                .collect();
            Ok(vec![ScanResponse {
                scan_id: "scan-1".to_owned(),
                vulnerabilities,
                violations: Vec::new(),
            }])
        }
    }

    fn detected(tech: Technology, dirs: &[&Path]) -> DetectedTechnologies {
        let mut map = BTreeMap::new();
        for dir in dirs {
            map.insert(dir.to_path_buf(), Vec::new());
        }
        DetectedTechnologies::from([(tech, map)])
    }

    fn npm_tree() -> DependencyNode {
        DependencyNode::with_children(
            "npm://app:1.0.0",
            vec![
                DependencyNode::with_children("npm://a:1.0.0", vec![DependencyNode::leaf("npm://c:1.0.0")]),
                DependencyNode::leaf("npm://b:1.0.0"),
            ],
        )
    }

    fn runner<S: ScanService>(
        root: &Path,
        detector: StaticDetector,
        service: S,
        resolvers: ResolverTable,
    ) -> ScaRunner<StaticDetector, S> {
        let params = AuditParamsBuilder::new()
            .working_dirs(vec![root.to_path_buf()])
            .build()
            .unwrap();
        ScaRunnerBuilder::new(detector, service)
            .params(params)
            .resolvers(resolvers)
            .build()
            .unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn nothing_detected_is_empty_report() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = runner(
            tmp.path(),
            StaticDetector::new(),
            MockScanService::new(&[]),
            ResolverTable::new(),
        );
        let report = runner.run().await.unwrap();
        assert!(report.is_empty());
        assert!(report.is_success());
    }

    #[tokio::test]
    #[serial]
    async fn unit_gets_impact_paths_and_restores_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_str().unwrap().to_owned();
        let before = std::env::current_dir().unwrap();

        let detector = StaticDetector::new().with(&root, detected(Technology::Npm, &[tmp.path()]));
        let resolvers = ResolverTable::new().register(
            Technology::Npm,
            StaticResolver::ok(vec![npm_tree()], &["npm://a:1.0.0", "npm://c:1.0.0", "npm://b:1.0.0"]),
        );
        let runner = runner(tmp.path(), detector, MockScanService::new(&["npm://c:1.0.0"]), resolvers);

        let report = runner.run().await.unwrap();
        assert_eq!(std::env::current_dir().unwrap(), before);
        assert!(report.is_success());

        let unit = &report.results[0];
        assert_eq!(unit.is_multiple_root_project, Some(false));
        let vuln = &unit.results()[0].vulnerabilities[0];
        let paths = &vuln.components["npm://c:1.0.0"].impact_paths;
        let ids: Vec<_> = paths[0].iter().map(|n| n.component_id.as_str()).collect();
        assert_eq!(ids, vec!["npm://app:1.0.0", "npm://a:1.0.0", "npm://c:1.0.0"]);

        assert!(report.applicability.contains("npm://a:1.0.0"));
        assert!(!report.applicability.contains("npm://c:1.0.0"));
    }

    #[tokio::test]
    #[serial]
    async fn resolver_failure_is_wrapped_and_run_continues() {
        let tmp = tempfile::tempdir().unwrap();
        let go_dir = tmp.path().join("svc");
        std::fs::create_dir_all(&go_dir).unwrap();
        let root = tmp.path().to_str().unwrap().to_owned();

        let mut found = detected(Technology::Npm, &[tmp.path()]);
        found.extend(detected(Technology::Go, &[go_dir.as_path()]));
        let detector = StaticDetector::new().with(&root, found);
        let resolvers = ResolverTable::new()
            .register(Technology::Npm, StaticResolver::failing("broken lockfile"))
            .register(Technology::Go, StaticResolver::ok(vec![DependencyNode::leaf("go://svc")], &["go://x:v1.0.0"]));

        let service = MockScanService::new(&[]);
        let runner = runner(tmp.path(), detector, service, resolvers);
        let report = runner.run().await.unwrap();

        assert_eq!(report.results.len(), 1, "failed units are not reported as results");
        assert_eq!(report.errors.len(), 1);
        let message = report.errors.to_string();
        assert!(message.starts_with("[npm] audit command in '"));
        assert!(message.contains("failed while building 'npm' dependency tree:\n"));
        assert!(message.contains("broken lockfile"));
        assert_eq!(report.results[0].technology, Technology::Go);
        assert_eq!(report.results[0].results().len(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn empty_dependencies_fail_without_submission() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_str().unwrap().to_owned();
        let detector = StaticDetector::new().with(&root, detected(Technology::Npm, &[tmp.path()]));
        let resolvers = ResolverTable::new()
            .register(Technology::Npm, StaticResolver::ok(vec![DependencyNode::leaf("npm://app:1.0.0")], &[]));

        let runner = runner(tmp.path(), detector, MockScanService::new(&[]), resolvers);
        let report = runner.run().await.unwrap();

        assert!(runner.service.seen.lock().unwrap().is_empty());
        assert!(matches!(
            report.errors.iter().next().unwrap().error,
            ScaError::EmptyDependencyTree
        ));
        assert!(report.results.is_empty());
        assert_eq!(report.errors.len(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn unsupported_technology_fails_unit() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_str().unwrap().to_owned();
        let detector = StaticDetector::new().with(&root, detected(Technology::Gradle, &[tmp.path()]));

        let runner = runner(tmp.path(), detector, MockScanService::new(&[]), ResolverTable::new());
        let report = runner.run().await.unwrap();
        assert!(report.errors.to_string().contains("gradle is currently not supported"));
    }

    #[tokio::test]
    #[serial]
    async fn missing_working_directory_aborts_run_and_restores() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_str().unwrap().to_owned();
        let gone = tmp.path().join("gone");
        let before = std::env::current_dir().unwrap();

        let detector = StaticDetector::new().with(&root, detected(Technology::Npm, &[gone.as_path()]));
        let resolvers = ResolverTable::new()
            .register(Technology::Npm, StaticResolver::ok(Vec::new(), &["npm://a:1.0.0"]));
        let runner = runner(tmp.path(), detector, MockScanService::new(&[]), resolvers);

        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, ScaError::WorkingDirectory { .. }));
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[tokio::test(start_paused = true)]
    #[serial]
    async fn slow_service_times_out() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_str().unwrap().to_owned();
        let detector = StaticDetector::new().with(&root, detected(Technology::Npm, &[tmp.path()]));
        let resolvers = ResolverTable::new()
            .register(Technology::Npm, StaticResolver::ok(Vec::new(), &["npm://a:1.0.0"]));

        let params = AuditParamsBuilder::new()
            .working_dirs(vec![tmp.path().to_path_buf()])
            .scan_timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let runner = ScaRunnerBuilder::new(detector, MockScanService::new(&[]).slow(Duration::from_secs(60)))
            .params(params)
            .resolvers(resolvers)
            .build()
            .unwrap();

        let report = runner.run().await.unwrap();
        let err = &report.errors.iter().next().unwrap().error;
        assert!(matches!(err, ScaError::Timeout { secs: 5 }));
        assert!(err.is_cancellation());
    }

    #[tokio::test]
    #[serial]
    async fn cancelled_run_fails_every_unit() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_str().unwrap().to_owned();
        let detector = StaticDetector::new().with(&root, detected(Technology::Npm, &[tmp.path()]));
        let token = CancellationToken::new();
        token.cancel();

        let params = AuditParamsBuilder::new()
            .working_dirs(vec![tmp.path().to_path_buf()])
            .build()
            .unwrap();
        let runner = ScaRunnerBuilder::new(detector, MockScanService::new(&[]))
            .params(params)
            .resolvers(ResolverTable::new())
            .cancellation_token(token)
            .build()
            .unwrap();

        let report = runner.run().await.unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            report.errors.iter().next().unwrap().error,
            ScaError::Cancelled
        ));
    }

    #[test]
    fn build_rejects_invalid_params() {
        let params = AuditParams {
            working_dirs: Vec::new(),
            ..AuditParams::default()
        };
        let result = ScaRunnerBuilder::new(StaticDetector::new(), MockScanService::new(&[]))
            .params(params)
            .build();
        assert!(result.is_err());
    }
}
