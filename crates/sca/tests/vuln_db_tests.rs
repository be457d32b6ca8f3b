//! Vulnerability matching tests for the local DB scan service

use std::path::Path;
use std::sync::Arc;

use scaudit_core::types::{Severity, Technology};
use scaudit_sca::graph::build_flat_graph;
use scaudit_sca::{ScaError, ScanGraphParams, ScanService, VulnDb, VulnDbScanService};

fn write_db(dir: &Path, package_type: &str, json: &str) {
    std::fs::write(dir.join(format!("{package_type}.json")), json).unwrap();
}

fn service_from(dir: &Path) -> VulnDbScanService {
    VulnDbScanService::new(Arc::new(VulnDb::load_from_dir(dir).unwrap()))
}

async fn scan(service: &VulnDbScanService, tech: Technology, ids: &[&str]) -> Vec<String> {
    scan_with(service, tech, ids, &ScanGraphParams::default()).await
}

async fn scan_with(
    service: &VulnDbScanService,
    tech: Technology,
    ids: &[&str],
    params: &ScanGraphParams,
) -> Vec<String> {
    let graph = build_flat_graph(ids.iter().copied());
    let responses = service.scan_graph(tech, &graph, params).await.unwrap();
    assert_eq!(responses.len(), 1);
    responses[0]
        .vulnerabilities
        .iter()
        .map(|v| v.issue_id.clone())
        .collect()
}

const NPM_DB: &str = r#"[
    {
        "cve_id": "CVE-2021-23337",
        "package": "lodash",
        "affected_ranges": [{ "introduced": "0.0.0", "fixed": "4.17.21" }],
        "fixed_version": "4.17.21",
        "severity": "High",
        "description": "Command injection via template"
    },
    {
        "cve_id": "CVE-2024-LOW",
        "package": "left-pad",
        "affected_ranges": [{ "introduced": "1.0.0" }],
        "severity": "Low",
        "description": "Unfixed low severity issue"
    }
]"#;

#[tokio::test]
async fn test_fixed_version_is_exclusive_boundary() {
    let tmp = tempfile::tempdir().unwrap();
    write_db(tmp.path(), "npm", NPM_DB);
    let service = service_from(tmp.path());

    assert_eq!(
        scan(&service, Technology::Npm, &["npm://lodash:4.17.20"]).await,
        vec!["CVE-2021-23337"]
    );
    assert!(
        scan(&service, Technology::Npm, &["npm://lodash:4.17.21"])
            .await
            .is_empty()
    );
}

#[tokio::test]
async fn test_introduced_version_is_inclusive_boundary() {
    let tmp = tempfile::tempdir().unwrap();
    write_db(tmp.path(), "npm", NPM_DB);
    let service = service_from(tmp.path());

    assert_eq!(
        scan(&service, Technology::Npm, &["npm://left-pad:1.0.0"]).await,
        vec!["CVE-2024-LOW"]
    );
    assert!(
        scan(&service, Technology::Npm, &["npm://left-pad:0.9.9"])
            .await
            .is_empty()
    );
}

#[tokio::test]
async fn test_min_severity_and_fixable_only_filters() {
    let tmp = tempfile::tempdir().unwrap();
    write_db(tmp.path(), "npm", NPM_DB);
    let service = service_from(tmp.path());
    let ids = ["npm://lodash:4.17.20", "npm://left-pad:1.3.0"];

    assert_eq!(scan(&service, Technology::Npm, &ids).await.len(), 2);

    let high_only = ScanGraphParams {
        min_severity: Some(Severity::High),
        ..ScanGraphParams::default()
    };
    assert_eq!(
        scan_with(&service, Technology::Npm, &ids, &high_only).await,
        vec!["CVE-2021-23337"]
    );

    let fixable = ScanGraphParams {
        fixable_only: true,
        ..ScanGraphParams::default()
    };
    assert_eq!(
        scan_with(&service, Technology::Npm, &ids, &fixable).await,
        vec!["CVE-2021-23337"]
    );
}

#[tokio::test]
async fn test_package_type_separates_ecosystems() {
    let tmp = tempfile::tempdir().unwrap();
    write_db(tmp.path(), "npm", NPM_DB);
    let service = service_from(tmp.path());

    // same name, different ecosystem
    assert!(
        scan(&service, Technology::Pip, &["pypi://lodash:1.0.0"])
            .await
            .is_empty()
    );
}

#[tokio::test]
async fn test_go_and_maven_version_notations() {
    let tmp = tempfile::tempdir().unwrap();
    write_db(
        tmp.path(),
        "go",
        r#"[{
            "cve_id": "CVE-2022-32149",
            "package": "golang.org/x/text",
            "affected_ranges": [{ "fixed": "v0.3.8" }],
            "fixed_version": "v0.3.8",
            "severity": "High",
            "description": "Denial of service in language tag parsing"
        }]"#,
    );
    write_db(
        tmp.path(),
        "gav",
        r#"[{
            "cve_id": "CVE-2021-44228",
            "package": "org.apache.logging.log4j:log4j-core",
            "affected_ranges": [{ "introduced": "2.0", "fixed": "2.15.0" }],
            "fixed_version": "2.15.0",
            "severity": "Critical",
            "description": "Log4Shell"
        }]"#,
    );
    let service = service_from(tmp.path());
    assert_eq!(service.db().entry_count(), 2);

    assert_eq!(
        scan(&service, Technology::Go, &["go://golang.org/x/text:v0.3.7"]).await,
        vec!["CVE-2022-32149"]
    );
    assert_eq!(
        scan(
            &service,
            Technology::Maven,
            &["gav://org.apache.logging.log4j:log4j-core:2.14.1"]
        )
        .await,
        vec!["CVE-2021-44228"]
    );
    assert!(
        scan(
            &service,
            Technology::Maven,
            &["gav://org.apache.logging.log4j:log4j-core:2.17.1"]
        )
        .await
        .is_empty()
    );
}

#[tokio::test]
async fn test_shared_cve_merges_components() {
    let tmp = tempfile::tempdir().unwrap();
    write_db(
        tmp.path(),
        "nuget",
        r#"[
            {
                "cve_id": "CVE-2024-0100",
                "package": "Contoso.Core",
                "affected_ranges": [{ "fixed": "2.0.0" }],
                "fixed_version": "2.0.0",
                "severity": "Medium",
                "description": "Shared issue"
            },
            {
                "cve_id": "CVE-2024-0100",
                "package": "Contoso.Extensions",
                "affected_ranges": [{ "fixed": "2.0.0" }],
                "fixed_version": "2.0.0",
                "severity": "Medium",
                "description": "Shared issue"
            }
        ]"#,
    );
    let service = service_from(tmp.path());

    let graph = build_flat_graph([
        "nuget://Contoso.Core:1.2.0.1",
        "nuget://Contoso.Extensions:1.0.0",
    ]);
    let responses = service
        .scan_graph(Technology::Nuget, &graph, &ScanGraphParams::default())
        .await
        .unwrap();

    let vulns = &responses[0].vulnerabilities;
    assert_eq!(vulns.len(), 1);
    assert_eq!(vulns[0].components.len(), 2);
    assert_eq!(
        vulns[0].components["nuget://Contoso.Core:1.2.0.1"].fixed_versions,
        vec!["2.0.0".to_owned()]
    );
}

#[test]
fn test_missing_db_files_load_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let db = VulnDb::load_from_dir(tmp.path()).unwrap();
    assert_eq!(db.entry_count(), 0);
}

#[test]
fn test_malformed_db_file_is_parse_error() {
    let tmp = tempfile::tempdir().unwrap();
    write_db(tmp.path(), "pypi", "{ not json");

    let err = VulnDb::load_from_dir(tmp.path()).unwrap_err();
    assert!(matches!(err, ScaError::VulnDbParse(_)));
    assert!(err.to_string().contains("pypi.json"));
}
