//! `scaudit audit` command handler

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use scaudit_core::config::{AuditConfig, ScauditConfig};
use scaudit_core::types::Severity;
use scaudit_sca::{
    AuditParams, DescriptorDetector, ResolverTable, ScaReport, ScaRunnerBuilder, VulnDb,
    VulnDbScanService,
};

use crate::cli::AuditArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `audit` command.
///
/// Returns `CliError::Audit` when vulnerabilities were found or any scan unit failed,
/// after the report has been rendered.
pub async fn execute(
    args: AuditArgs,
    mut config: ScauditConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    apply_overrides(&mut config.audit, &args);
    config.validate()?;
    let params = AuditParams::from_core(&config)?;

    let db = load_vuln_db(PathBuf::from(&config.audit.vuln_db_path)).await?;
    info!(
        entries = db.entry_count(),
        working_dirs = params.working_dirs.len(),
        "starting SCA audit"
    );

    let cancel = CancellationToken::new();
    let ctrl_c = spawn_interrupt_handler(cancel.clone());

    let runner = ScaRunnerBuilder::new(DescriptorDetector::new(), VulnDbScanService::new(db))
        .params(params)
        .resolvers(ResolverTable::with_defaults())
        .cancellation_token(cancel)
        .build()?;
    let outcome = runner.run().await;
    ctrl_c.abort();

    let report = AuditReport::from_sca(&outcome?);
    writer.render(&report)?;

    if !report.errors.is_empty() {
        return Err(CliError::Audit(format!(
            "{} scan unit(s) failed",
            report.errors.len()
        )));
    }
    if report.summary.total > 0 {
        return Err(CliError::Audit(format!(
            "found {} vulnerabilities",
            report.summary.total
        )));
    }

    Ok(())
}

/// Apply command-line flags on top of the `[audit]` configuration section.
fn apply_overrides(audit: &mut AuditConfig, args: &AuditArgs) {
    if !args.paths.is_empty() {
        audit.working_dirs = args.paths.iter().map(|p| p.display().to_string()).collect();
    }
    if !args.technologies.is_empty() {
        audit.technologies = args.technologies.clone();
    }
    // exclude flags add to the configured patterns
    for pattern in &args.exclude {
        if !audit.exclude_patterns.contains(pattern) {
            audit.exclude_patterns.push(pattern.clone());
        }
    }

    audit.recursive |= args.recursive;
    audit.ignore_config_file |= args.ignore_config_file;
    audit.third_party_applicability |= args.third_party_applicability;
    audit.fixable_only |= args.fixable_only;
    audit.curation |= args.curation;

    if let Some(repo) = &args.deps_repo {
        audit.deps_repo = repo.clone();
    }
    if let Some(file) = &args.requirements_file {
        audit.pip_requirements_file = file.clone();
    }
    if let Some(severity) = &args.min_severity {
        audit.min_severity = severity.clone();
    }
    if let Some(dir) = &args.curation_cache_dir {
        audit.curation_cache_dir = dir.display().to_string();
    }
    if let Some(secs) = args.timeout {
        audit.scan_timeout_secs = secs;
    }
    if let Some(path) = &args.vuln_db {
        audit.vuln_db_path = path.display().to_string();
    }
}

async fn load_vuln_db(path: PathBuf) -> Result<Arc<VulnDb>, CliError> {
    let db = tokio::task::spawn_blocking(move || VulnDb::load_from_dir(&path))
        .await
        .map_err(|e| CliError::Command(format!("vulnerability db loader task failed: {e}")))??;
    Ok(Arc::new(db))
}

fn spawn_interrupt_handler(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling remaining scans");
            cancel.cancel();
        }
    })
}

/// Rendered result of one audit run.
#[derive(Serialize)]
pub struct AuditReport {
    pub units: Vec<UnitEntry>,
    pub summary: VulnSummary,
    pub findings: Vec<FindingEntry>,
    pub errors: Vec<String>,
    pub applicability: Vec<String>,
}

#[derive(Serialize)]
pub struct UnitEntry {
    pub technology: String,
    pub working_directory: String,
    pub descriptors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_roots: Option<bool>,
    pub vulnerabilities: usize,
    pub violations: usize,
}

#[derive(Serialize, Default)]
pub struct VulnSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
}

impl VulnSummary {
    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Info => self.info += 1,
        }
        self.total += 1;
    }
}

#[derive(Serialize)]
pub struct FindingEntry {
    pub issue_id: String,
    pub severity: Severity,
    pub component: String,
    pub fixed_versions: Vec<String>,
    /// Shortest dependency path from the project root to the component.
    pub impact_path: Vec<String>,
}

impl AuditReport {
    pub fn from_sca(report: &ScaReport) -> Self {
        let mut summary = VulnSummary::default();
        let mut findings = Vec::new();

        let units = report
            .results
            .iter()
            .map(|unit| UnitEntry {
                technology: unit.technology.to_string(),
                working_directory: unit.working_directory.display().to_string(),
                descriptors: unit.descriptors.len(),
                multiple_roots: unit.is_multiple_root_project,
                vulnerabilities: unit.vulnerability_count(),
                violations: unit.violation_count(),
            })
            .collect();

        for response in report.results.iter().flat_map(|u| u.results()) {
            for vuln in &response.vulnerabilities {
                summary.add(vuln.severity);
                findings.extend(finding_entries(&vuln.issue_id, vuln.severity, &vuln.components));
            }
        }
        findings.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.issue_id.cmp(&b.issue_id)));

        Self {
            units,
            summary,
            findings,
            errors: report.errors.iter().map(ToString::to_string).collect(),
            applicability: report.applicability.iter().map(str::to_owned).collect(),
        }
    }
}

fn finding_entries(
    issue_id: &str,
    severity: Severity,
    components: &BTreeMap<String, scaudit_sca::ComponentImpact>,
) -> Vec<FindingEntry> {
    components
        .iter()
        .map(|(id, impact)| FindingEntry {
            issue_id: issue_id.to_owned(),
            severity,
            component: id.clone(),
            fixed_versions: impact.fixed_versions.clone(),
            impact_path: impact
                .impact_paths
                .iter()
                .min_by_key(|path| path.len())
                .map(|path| path.iter().map(|n| n.component_id.clone()).collect())
                .unwrap_or_default(),
        })
        .collect()
}

impl Render for AuditReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.units.is_empty() && self.errors.is_empty() {
            writeln!(w, "{}", "Nothing to scan.".yellow())?;
            return Ok(());
        }

        if !self.units.is_empty() {
            self.render_units(w)?;
        }

        if !self.errors.is_empty() {
            writeln!(w)?;
            writeln!(w, "{}", "Errors:".red().bold())?;
            for err in &self.errors {
                writeln!(w, "{}", err)?;
            }
        }

        Ok(())
    }
}

impl AuditReport {
    fn render_units(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "{:<8} {:<6} {:<6} {:<6} Directory",
            "Tech", "Files", "Multi", "Vulns"
        )?;
        writeln!(w, "{}", "-".repeat(80))?;
        for unit in &self.units {
            let multi = match unit.multiple_roots {
                Some(true) => "yes",
                Some(false) => "no",
                None => "-",
            };
            writeln!(
                w,
                "{:<8} {:<6} {:<6} {:<6} {}",
                unit.technology, unit.descriptors, multi, unit.vulnerabilities, unit.working_directory
            )?;
        }
        writeln!(w)?;

        let vuln_str = format!(
            "{} total (C:{} H:{} M:{} L:{} I:{})",
            self.summary.total,
            self.summary.critical,
            self.summary.high,
            self.summary.medium,
            self.summary.low,
            self.summary.info
        );
        if self.summary.total > 0 {
            writeln!(w, "Vulnerabilities: {}", vuln_str.red().bold())?;
        } else {
            writeln!(w, "Vulnerabilities: {}", vuln_str.green().bold())?;
        }

        if !self.findings.is_empty() {
            writeln!(w)?;
            writeln!(
                w,
                "{:<20} {:<10} {:<40} Fixed",
                "Issue", "Severity", "Component"
            )?;
            writeln!(w, "{}", "-".repeat(80))?;

            for f in &self.findings {
                let severity = f.severity.to_string();
                let severity_colored = match f.severity {
                    Severity::Critical => severity.red().bold(),
                    Severity::High => severity.red(),
                    Severity::Medium => severity.yellow(),
                    Severity::Low => severity.normal(),
                    Severity::Info => severity.dimmed(),
                };
                let fixed = if f.fixed_versions.is_empty() {
                    "N/A".to_owned()
                } else {
                    f.fixed_versions.join(", ")
                };

                writeln!(
                    w,
                    "{:<20} {:<10} {:<40} {}",
                    f.issue_id, severity_colored, f.component, fixed
                )?;
                if f.impact_path.len() > 1 {
                    writeln!(w, "    via {}", f.impact_path.join(" > ").dimmed())?;
                }
            }
        }

        Ok(())
    }
}
