#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ScaError`, `UnitError`, `ScaErrors`)
//! - [`config`]: Run parameters (`AuditParams`, `ResolutionSettings`, `ScanGraphParams`, builder)
//! - [`types`]: Domain types (`DependencyNode`, `FlatGraph`, `ScanUnit`, `ScanResponse`)
//! - [`detection`]: Technology detection (`TechnologyDetector` trait, `DescriptorDetector`)
//! - [`planner`]: Scan unit planning (`plan_scans`)
//! - [`resolver_config`]: Per-technology resolver config files (`.scaudit/projects/<tech>.yaml`)
//! - [`curation`]: Curation cache first-run check
//! - [`resolver`]: Resolver dispatch (`DependencyResolver` trait, `ResolverTable`, `NpmLockResolver`)
//! - [`graph`]: Flat graph builders
//! - [`impact`]: Impact path enrichment
//! - [`applicability`]: Third-party applicability hints
//! - [`service`]: Scan service seam (`ScanService` trait)
//! - [`vuln`]: Local vulnerability DB scan service (`VulnDb`, `VulnDbScanService`)
//! - [`runner`]: Main orchestrator (`ScaRunner`, `ScaRunnerBuilder`)
//! - [`report`]: Run report (`ScaReport`)
//!
//! # Architecture
//!
//! ```text
//! working_dirs --> TechnologyDetector --> plan_scans --> Vec<ScanUnit>
//!                                                            |
//!                                                        ScaRunner
//!                                                            |
//!              +------------------------+--------------------+-------------------+
//!              |                        |                                        |
//!      resolver_config /         ResolverTable                              ScanService
//!      curation gate                    |                                        |
//!                              DependencyTreeResult --> FlatGraph --> Vec<ScanResponse>
//!                                       |                                        |
//!                                   full trees ------------> impact paths <------+
//!                                                                |
//!                                          ScaReport { results, errors, applicability }
//! ```

pub mod applicability;
pub mod config;
pub mod curation;
pub mod detection;
pub mod error;
pub mod graph;
pub mod impact;
pub mod planner;
pub mod report;
pub mod resolver;
pub mod resolver_config;
pub mod runner;
pub mod service;
pub mod types;
pub mod vuln;

// --- Public API Re-exports ---

// Runner (main orchestrator)
pub use runner::{ScaRunner, ScaRunnerBuilder};

// Configuration
pub use config::{AuditParams, AuditParamsBuilder, ResolutionSettings, ScanGraphParams};

// Error
pub use error::{ScaError, ScaErrors, UnitError};

// Report
pub use report::ScaReport;

// Types
pub use types::{
    ComponentImpact, DependencyNode, DependencyTreeResult, FlatGraph, FlatNode, ImpactPathNode,
    ScanResponse, ScanUnit, Violation, Vulnerability,
};

// Detection / planning
pub use detection::{DescriptorDetector, DetectedTechnologies, DetectionRequest, TechnologyDetector};
pub use planner::plan_scans;

// Resolution
pub use resolver::{
    DependencyResolver, NpmLockResolver, ResolutionContext, ResolvedDependencies, ResolverTable,
    UniqueDependencies, get_tech_dependency_tree,
};

// Scanning
pub use applicability::ApplicabilityHints;
pub use service::ScanService;
pub use vuln::{VersionRange, VulnDb, VulnDbEntry, VulnDbScanService};
