//! Shared test doubles for scaudit-sca integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use scaudit_core::types::{Severity, Technology};
use scaudit_sca::{
    ComponentImpact, DependencyNode, DependencyResolver, FlatGraph, ResolutionContext,
    ResolutionSettings, ResolvedDependencies, ScaError, ScanGraphParams, ScanResponse,
    ScanService, UniqueDependencies, Vulnerability,
};

/// Writes `content` to `root/rel`, creating parent directories.
pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

#[derive(Clone)]
enum Behavior {
    Respond,
    Fail(String),
    CancelAndHang(CancellationToken),
}

/// Scan service that reports one vulnerability per listed component id.
#[derive(Clone)]
pub struct MockScanService {
    vulnerable: Vec<String>,
    behavior: Behavior,
    pub graphs: Arc<Mutex<Vec<(Technology, Vec<String>)>>>,
}

impl MockScanService {
    pub fn new(vulnerable: &[&str]) -> Self {
        Self {
            vulnerable: vulnerable.iter().map(|s| (*s).to_owned()).collect(),
            behavior: Behavior::Respond,
            graphs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            behavior: Behavior::Fail(reason.to_owned()),
            ..Self::new(&[])
        }
    }

    /// Cancels `token` on the first request and never answers.
    pub fn cancelling(token: CancellationToken) -> Self {
        Self {
            behavior: Behavior::CancelAndHang(token),
            ..Self::new(&[])
        }
    }

    pub fn submitted(&self) -> Vec<(Technology, Vec<String>)> {
        self.graphs.lock().unwrap().clone()
    }
}

impl ScanService for MockScanService {
    async fn scan_graph(
        &self,
        technology: Technology,
        graph: &FlatGraph,
        _params: &ScanGraphParams,
    ) -> Result<Vec<ScanResponse>, ScaError> {
        self.graphs
            .lock()
            .unwrap()
            .push((technology, graph.ids().map(str::to_owned).collect()));

        match &self.behavior {
            Behavior::Respond => {}
            Behavior::Fail(reason) => return Err(ScaError::Service(reason.clone())),
            Behavior::CancelAndHang(token) => {
                token.cancel();
                std::future::pending::<()>().await;
            }
        }

        let vulnerabilities = graph
            .ids()
            .filter(|id| self.vulnerable.iter().any(|v| v == id))
            .map(|id| Vulnerability {
                issue_id: format!("XRAY-{id}"),
                cves: vec!["CVE-2024-0001".to_owned()],
                summary: "test issue".to_owned(),
                severity: Severity::High,
                components: BTreeMap::from([(id.to_owned(), ComponentImpact::default())]),
            })
            .collect();

        Ok(vec![ScanResponse {
            scan_id: "mock-scan".to_owned(),
            vulnerabilities,
            violations: Vec::new(),
        }])
    }
}

/// Resolver returning fixed trees, recording the settings it was called with.
pub struct StaticResolver {
    trees: Vec<DependencyNode>,
    ids: Vec<String>,
    pub seen: Arc<Mutex<Vec<ResolutionSettings>>>,
}

impl StaticResolver {
    pub fn new(trees: Vec<DependencyNode>, ids: &[&str]) -> Self {
        Self {
            trees,
            ids: ids.iter().map(|s| (*s).to_owned()).collect(),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl DependencyResolver for StaticResolver {
    fn resolve(&self, ctx: &ResolutionContext<'_>) -> Result<ResolvedDependencies, ScaError> {
        self.seen.lock().unwrap().push(ctx.settings.clone());
        Ok(ResolvedDependencies {
            full_trees: self.trees.clone(),
            unique: UniqueDependencies::Ids(self.ids.clone()),
            download_urls: BTreeMap::new(),
        })
    }
}

/// Collects formatted log output on the current thread.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl Write for CaptureWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Installs a thread-local DEBUG subscriber writing into this capture.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let buf = Arc::clone(&self.buf);
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || CaptureWriter(Arc::clone(&buf)))
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }
}
