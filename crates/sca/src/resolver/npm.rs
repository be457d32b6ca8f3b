//! package-lock.json 기반 npm 리졸버
//!
//! [`NpmLockResolver`]는 작업 디렉토리의 package-lock.json (v2/v3)을 읽어
//! 루트 프로젝트의 전체 의존성 트리를 만듭니다.
//!
//! # package-lock.json v3 형식 예시
//!
//! ```json
//! {
//!   "name": "my-app",
//!   "lockfileVersion": 3,
//!   "packages": {
//!     "": { "name": "my-app", "version": "1.0.0", "dependencies": { "a": "^1.0.0" } },
//!     "node_modules/a": { "version": "1.0.0", "dependencies": { "c": "^2.0.0" } },
//!     "node_modules/c": { "version": "2.0.0", "resolved": "https://registry.npmjs.org/c/-/c-2.0.0.tgz" }
//!   }
//! }
//! ```
//!
//! 의존성 이름은 Node.js 모듈 해석 규칙대로 가장 가까운 `node_modules`부터
//! 바깥쪽으로 찾습니다.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::ScaError;
use crate::resolver::{DependencyResolver, ResolutionContext, ResolvedDependencies, UniqueDependencies};
use crate::types::DependencyNode;

/// lockfile 이름
pub const LOCKFILE_NAME: &str = "package-lock.json";

/// 기본 최대 lockfile 크기 (50MB)
const DEFAULT_MAX_LOCKFILE_SIZE: u64 = 50 * 1024 * 1024;

const NODE_MODULES: &str = "node_modules/";

/// package-lock.json 리졸버
#[derive(Debug, Clone)]
pub struct NpmLockResolver {
    max_file_size: u64,
    include_dev: bool,
}

impl Default for NpmLockResolver {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_LOCKFILE_SIZE,
            include_dev: true,
        }
    }
}

impl NpmLockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 최대 lockfile 크기를 설정합니다.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// devDependencies 포함 여부를 설정합니다.
    pub fn include_dev(mut self, include: bool) -> Self {
        self.include_dev = include;
        self
    }

    /// lockfile 내용을 해석합니다.
    pub fn parse(&self, content: &str, source_path: &str) -> Result<ResolvedDependencies, ScaError> {
        let lock: NpmLockFile =
            serde_json::from_str(content).map_err(|e| ScaError::LockfileParse {
                path: source_path.to_owned(),
                reason: e.to_string(),
            })?;

        if lock.packages.is_empty() && lock.lockfile_version.is_some_and(|v| v < 2) {
            return Err(ScaError::LockfileParse {
                path: source_path.to_owned(),
                reason: "lockfileVersion 1 is not supported, regenerate the lockfile with npm 7 or later"
                    .to_owned(),
            });
        }

        let walker = TreeWalker {
            packages: &lock.packages,
            include_dev: self.include_dev,
        };

        let root_entry = lock.packages.get("");
        let root_name = root_entry
            .and_then(|e| e.name.clone())
            .or_else(|| lock.name.clone())
            .unwrap_or_else(|| "root".to_owned());
        let root_version = root_entry
            .and_then(|e| e.version.clone())
            .or_else(|| lock.version.clone())
            .unwrap_or_else(|| "0.0.0".to_owned());

        let mut ancestors = HashSet::new();
        let children = match root_entry {
            Some(entry) => walker.children("", entry, true, &mut ancestors),
            None => Vec::new(),
        };
        let tree = DependencyNode::with_children(npm_id(&root_name, &root_version), children);

        let mut unique = Vec::new();
        let mut seen = HashSet::new();
        collect_unique(&tree.nodes, &mut seen, &mut unique);

        let download_urls = lock
            .packages
            .iter()
            .filter(|(key, _)| !key.is_empty())
            .filter_map(|(key, entry)| {
                let resolved = entry.resolved.as_deref()?;
                if !resolved.starts_with("http") {
                    return None;
                }
                let version = entry.version.as_deref()?;
                Some((npm_id(&package_name(key, entry), version), resolved.to_owned()))
            })
            .filter(|(id, _)| seen.contains(id))
            .collect();

        Ok(ResolvedDependencies {
            full_trees: vec![tree],
            unique: UniqueDependencies::Ids(unique),
            download_urls,
        })
    }
}

impl DependencyResolver for NpmLockResolver {
    fn resolve(&self, ctx: &ResolutionContext<'_>) -> Result<ResolvedDependencies, ScaError> {
        let path = ctx.working_directory.join(LOCKFILE_NAME);
        let source = path.display().to_string();

        let metadata = std::fs::metadata(&path).map_err(|e| ScaError::LockfileParse {
            path: source.clone(),
            reason: if e.kind() == std::io::ErrorKind::NotFound {
                "lockfile not found, run 'npm install' to generate it".to_owned()
            } else {
                e.to_string()
            },
        })?;
        if metadata.len() > self.max_file_size {
            return Err(ScaError::LockfileParse {
                path: source,
                reason: format!(
                    "file too large ({} bytes, max {} bytes)",
                    metadata.len(),
                    self.max_file_size
                ),
            });
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ScaError::io(&path, e))?;
        let resolved = self.parse(&content, &source)?;
        debug!(
            path = %source,
            components = resolved.unique.len(),
            "parsed npm lockfile"
        );
        Ok(resolved)
    }
}

/// package-lock.json 구조 (파싱용)
#[derive(Deserialize)]
struct NpmLockFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default, rename = "lockfileVersion")]
    lockfile_version: Option<u32>,
    #[serde(default)]
    packages: HashMap<String, NpmPackageEntry>,
}

/// package-lock.json 내 개별 패키지 (파싱용)
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NpmPackageEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    resolved: Option<String>,
    #[serde(default)]
    link: bool,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, String>,
}

struct TreeWalker<'a> {
    packages: &'a HashMap<String, NpmPackageEntry>,
    include_dev: bool,
}

impl<'a> TreeWalker<'a> {
    fn children(
        &self,
        key: &str,
        entry: &'a NpmPackageEntry,
        is_root: bool,
        ancestors: &mut HashSet<String>,
    ) -> Vec<DependencyNode> {
        let dev = if is_root && self.include_dev {
            Some(&entry.dev_dependencies)
        } else {
            None
        };

        let names: Vec<&String> = entry
            .dependencies
            .keys()
            .chain(entry.optional_dependencies.keys())
            .chain(dev.into_iter().flat_map(BTreeMap::keys))
            .collect();

        let mut nodes = Vec::with_capacity(names.len());
        for name in names {
            // 설치되지 않은 optional 의존성은 lockfile에 없음
            let Some(child_key) = self.locate(key, name) else {
                continue;
            };
            if let Some(node) = self.node(&child_key, ancestors) {
                nodes.push(node);
            }
        }
        nodes
    }

    fn node(&self, key: &str, ancestors: &mut HashSet<String>) -> Option<DependencyNode> {
        let (key, entry) = self.follow_link(key)?;
        let version = entry.version.as_deref()?;
        let id = npm_id(&package_name(key, entry), version);

        if !ancestors.insert(key.to_owned()) {
            return Some(DependencyNode::leaf(id));
        }
        let children = self.children(key, entry, false, ancestors);
        ancestors.remove(key);

        Some(DependencyNode::with_children(id, children))
    }

    /// `from`에서 보이는 `name` 패키지의 lockfile 키
    fn locate(&self, from: &str, name: &str) -> Option<String> {
        let mut current = from;
        loop {
            let candidate = if current.is_empty() {
                format!("{NODE_MODULES}{name}")
            } else {
                format!("{current}/{NODE_MODULES}{name}")
            };
            if self.packages.contains_key(&candidate) {
                return Some(candidate);
            }
            if current.is_empty() {
                return None;
            }
            current = match current.rfind(&format!("/{NODE_MODULES}")) {
                Some(pos) => &current[..pos],
                None => "",
            };
        }
    }

    fn follow_link<'k>(&self, key: &'k str) -> Option<(&'k str, &'a NpmPackageEntry)>
    where
        'a: 'k,
    {
        let entry = self.packages.get(key)?;
        if !entry.link {
            return Some((key, entry));
        }
        let target = entry.resolved.as_deref()?;
        let (target_key, target_entry) = self.packages.get_key_value(target)?;
        Some((target_key.as_str(), target_entry))
    }
}

fn collect_unique(nodes: &[DependencyNode], seen: &mut HashSet<String>, out: &mut Vec<String>) {
    for node in nodes {
        if seen.insert(node.id.clone()) {
            out.push(node.id.clone());
        }
        collect_unique(&node.nodes, seen, out);
    }
}

/// "node_modules/@scope/name" 또는 "node_modules/a/node_modules/b" 에서 패키지명 추출
fn package_name(key: &str, entry: &NpmPackageEntry) -> String {
    if let Some(name) = &entry.name {
        return name.clone();
    }
    match key.rfind(NODE_MODULES) {
        Some(pos) => key[pos + NODE_MODULES.len()..].to_owned(),
        None => Path::new(key)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(key)
            .to_owned(),
    }
}

fn npm_id(name: &str, version: &str) -> String {
    format!("npm://{name}:{version}")
}
