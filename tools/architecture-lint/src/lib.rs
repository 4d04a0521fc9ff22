//! Repo-local lint guarding the storefront's hexagonal boundaries.
//!
//! The `fluxcart` crate keeps its shop model and services in `domain`, HTTP
//! handlers in `inbound` and infrastructure adapters in `outbound`. This lint
//! parses every source file under those trees and reports imports that
//! cross a boundary:
//!
//! - `domain` may not reach adapters or web, SQL and HTTP-client crates
//! - `inbound` may not reach `outbound` or persistence and client crates
//! - `outbound` may not reach `inbound` or the web framework
//!
//! Run it with `cargo run -p architecture-lint` from the workspace root.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use syn::visit::Visit;

/// Name the backend crate is imported under by its binaries and tests.
const CRATE_NAME: &str = "fluxcart";

/// Crates that carry persistence concerns.
const PERSISTENCE_CRATES: &[&str] = &["diesel", "diesel_async", "diesel_migrations"];

/// Crates that carry the web framework.
const WEB_CRATES: &[&str] = &["actix", "actix_http", "actix_session", "actix_web"];

/// Crates used to talk to third-party services.
const CLIENT_CRATES: &[&str] = &["hmac", "reqwest", "sha2"];

/// A single boundary violation discovered by the linter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File path relative to `backend/src`.
    pub file: PathBuf,
    /// Human-readable description of the violated rule.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.message)
    }
}

/// Failure modes returned by the architecture lint.
#[derive(Debug, thiserror::Error)]
pub enum ArchitectureLintError {
    /// Filesystem traversal or reading failed.
    #[error("I/O error while linting architecture: {0}")]
    Io(#[from] io::Error),
    /// Rust source parsing failed.
    #[error("failed to parse {} while linting architecture: {message}", file.display())]
    Parse { file: PathBuf, message: String },
    /// One or more boundary violations were found.
    #[error("architecture boundary violations:\n{}", render(.0))]
    Violations(Vec<Violation>),
}

fn render(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("- {violation}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A Rust source file to be linted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    /// Path relative to `backend/src`.
    pub file: PathBuf,
    /// File contents.
    pub contents: String,
}

/// Lint the backend crate sources on disk.
///
/// `backend_dir` must be the `backend/` directory at the repository root.
///
/// # Errors
/// Returns [`ArchitectureLintError`] when a file cannot be read or parsed, or
/// when any boundary is crossed.
pub fn lint_backend_sources(backend_dir: &Path) -> Result<(), ArchitectureLintError> {
    let src_dir = backend_dir.join("src");
    let mut sources = Vec::new();
    for layer in Layer::ALL {
        let dir = src_dir.join(layer.dir());
        if dir.is_dir() {
            collect_sources(&src_dir, &dir, &mut sources)?;
        }
    }
    lint_sources(&sources)
}

/// Lint in-memory sources; paths must start with a layer directory.
///
/// # Errors
/// Returns [`ArchitectureLintError::Parse`] for unparsable sources or paths
/// outside a layer, and [`ArchitectureLintError::Violations`] otherwise when
/// any boundary is crossed.
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut violations = Vec::new();
    for source in sources {
        let parse_error = |message: String| ArchitectureLintError::Parse {
            file: source.file.clone(),
            message,
        };
        let layer = Layer::of(&source.file)
            .ok_or_else(|| parse_error("file is not under domain, inbound or outbound".into()))?;
        let parsed = syn::parse_file(&source.contents).map_err(|err| parse_error(err.to_string()))?;
        violations.extend(check_file(&source.file, layer, &parsed));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ArchitectureLintError::Violations(violations))
    }
}

/// Top-level module trees of the backend crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Domain,
    Inbound,
    Outbound,
}

impl Layer {
    const ALL: [Self; 3] = [Self::Domain, Self::Inbound, Self::Outbound];

    const fn dir(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    fn of(relative_path: &Path) -> Option<Self> {
        let first = relative_path.components().next()?.as_os_str().to_str()?;
        Self::ALL.into_iter().find(|layer| layer.dir() == first)
    }

    fn forbidden_layers(self) -> &'static [Self] {
        match self {
            Self::Domain => &[Self::Inbound, Self::Outbound],
            Self::Inbound => &[Self::Outbound],
            Self::Outbound => &[Self::Inbound],
        }
    }

    fn forbidden_crates(self) -> BTreeSet<&'static str> {
        let groups: &[&[&str]] = match self {
            Self::Domain => &[WEB_CRATES, PERSISTENCE_CRATES, CLIENT_CRATES],
            Self::Inbound => &[PERSISTENCE_CRATES, CLIENT_CRATES],
            Self::Outbound => &[WEB_CRATES],
        };
        groups.iter().flat_map(|group| group.iter().copied()).collect()
    }
}

fn check_file(file: &Path, layer: Layer, parsed: &syn::File) -> Vec<Violation> {
    let forbidden_crates = layer.forbidden_crates();
    let mut collector = PathCollector::default();
    collector.visit_file(parsed);

    let mut messages = BTreeSet::new();
    for segments in &collector.paths {
        if let Some(target) = internal_layer(segments).filter(|target| {
            layer.forbidden_layers().contains(target)
        }) {
            messages.insert(format!(
                "{} module must not depend on crate::{}",
                layer.dir(),
                target.dir()
            ));
        }
        if let Some(root) = external_root(segments).filter(|root| forbidden_crates.contains(root)) {
            messages.insert(format!(
                "{} module must not depend on external crate `{root}`",
                layer.dir()
            ));
        }
    }

    messages
        .into_iter()
        .map(|message| Violation {
            file: file.to_path_buf(),
            message,
        })
        .collect()
}

fn is_relative(segment: &str) -> bool {
    matches!(segment, "crate" | "self" | "super")
}

/// Layer a path points into, whether written relative or through the crate name.
fn internal_layer(segments: &[String]) -> Option<Layer> {
    let first = segments.first()?.as_str();
    let target = if is_relative(first) {
        segments.iter().find(|segment| !is_relative(segment))?
    } else if first == CRATE_NAME {
        segments.get(1)?
    } else {
        segments.first()?
    };
    Layer::ALL
        .into_iter()
        .find(|layer| layer.dir() == target.as_str())
}

fn external_root(segments: &[String]) -> Option<&str> {
    let root = segments.first()?.as_str();
    (!is_relative(root) && root != CRATE_NAME).then_some(root)
}

/// Gathers every path written in a file: `use` trees and inline paths.
#[derive(Default)]
struct PathCollector {
    paths: BTreeSet<Vec<String>>,
}

impl PathCollector {
    fn record_use_tree(&mut self, tree: &syn::UseTree, mut prefix: Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.record_use_tree(&path.tree, prefix);
            }
            syn::UseTree::Name(name) => {
                prefix.push(name.ident.to_string());
                self.paths.insert(prefix);
            }
            syn::UseTree::Rename(rename) => {
                prefix.push(rename.ident.to_string());
                self.paths.insert(prefix);
            }
            syn::UseTree::Glob(_) => {
                prefix.push("*".to_owned());
                self.paths.insert(prefix);
            }
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.record_use_tree(item, prefix.clone());
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for PathCollector {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        let segments: Vec<String> = node
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect();
        if !segments.is_empty() {
            self.paths.insert(segments);
        }
        syn::visit::visit_path(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.record_use_tree(&node.tree, Vec::new());
    }
}

fn collect_sources(
    src_root: &Path,
    current: &Path,
    sources: &mut Vec<LintSource>,
) -> Result<(), ArchitectureLintError> {
    let mut entries = fs::read_dir(current)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            collect_sources(src_root, &path, sources)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            let file = path
                .strip_prefix(src_root)
                .map_err(|err| ArchitectureLintError::Parse {
                    file: path.clone(),
                    message: err.to_string(),
                })?
                .to_path_buf();
            let contents = fs::read_to_string(&path)?;
            sources.push(LintSource { file, contents });
        }
    }
    Ok(())
}
