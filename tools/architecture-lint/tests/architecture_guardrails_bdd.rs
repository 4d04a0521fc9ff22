//! Behaviour tests for the architecture guardrails over a scratch tree.

use std::fs;
use std::path::PathBuf;

use architecture_lint::{ArchitectureLintError, LintSource, Violation};
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::{ScenarioState, given, scenario, then, when};
use tempfile::TempDir;

#[derive(Default, ScenarioState)]
struct LintWorld {
    sources: Slot<Vec<LintSource>>,
    violations: Slot<Vec<Violation>>,
}

impl LintWorld {
    fn add(&self, file: &str, contents: &str) {
        let mut sources = self.sources.get().unwrap_or_default();
        sources.push(LintSource {
            file: PathBuf::from(file),
            contents: contents.to_owned(),
        });
        self.sources.set(sources);
    }

    fn violations(&self) -> Vec<Violation> {
        self.violations.get().expect("lint must have run")
    }
}

#[fixture]
fn world() -> LintWorld {
    LintWorld::default()
}

#[given("a domain service, an HTTP handler and a memory adapter")]
fn a_clean_hexagon(world: &LintWorld) {
    world.add(
        "domain/pricing.rs",
        "pub fn discount_for(subtotal: i64) -> i64 { if subtotal >= 100_000 { subtotal / 10 } else { 0 } }",
    );
    world.add(
        "inbound/http/cart.rs",
        "use actix_web::web; use crate::domain::pricing::discount_for; \
         async fn totals(path: web::Path<i64>) -> String { discount_for(*path).to_string() }",
    );
    world.add(
        "outbound/memory/cart.rs",
        "use std::sync::Mutex; use crate::domain::pricing::discount_for; \
         pub struct Store(Mutex<Vec<i64>>); \
         impl Store { pub fn discount(&self) -> i64 { discount_for(0) } }",
    );
}

#[given("an HTTP handler that constructs the memory store")]
fn handler_constructs_memory_store(world: &LintWorld) {
    world.add(
        "inbound/http/bad_wiring.rs",
        "use crate::outbound::memory::MemoryStore; fn wire() { let _ = MemoryStore::default(); }",
    );
}

#[given("a domain service that builds a reqwest client")]
fn domain_builds_reqwest_client(world: &LintWorld) {
    world.add(
        "domain/pricing.rs",
        "pub fn client() -> reqwest::Client { reqwest::Client::new() }",
    );
}

#[given("a persistence adapter that reads the session")]
fn persistence_reads_session(world: &LintWorld) {
    world.add(
        "outbound/persistence/users.rs",
        "use actix_session::Session; pub fn user(session: &Session) { let _ = session; }",
    );
}

#[when("the architecture lint runs over the tree")]
fn the_lint_runs(world: &LintWorld) {
    let temp_dir = TempDir::new().expect("tempdir");
    let backend_dir = temp_dir.path().join("backend");
    for source in world.sources.get().unwrap_or_default() {
        let path = backend_dir.join("src").join(&source.file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directories");
        }
        fs::write(&path, &source.contents).expect("write source file");
    }

    let violations = match architecture_lint::lint_backend_sources(&backend_dir) {
        Ok(()) => Vec::new(),
        Err(ArchitectureLintError::Violations(violations)) => violations,
        Err(other) => panic!("lint could not run: {other}"),
    };
    world.violations.set(violations);
}

#[then("the lint succeeds")]
fn the_lint_succeeds(world: &LintWorld) {
    let violations = world.violations();
    assert!(violations.is_empty(), "unexpected violations: {violations:?}");
}

#[then("the lint reports {file} depending on {target}")]
fn the_lint_reports(world: &LintWorld, file: String, target: String) {
    let violations = world.violations();
    assert!(
        violations.iter().any(|violation| {
            violation.file == PathBuf::from(&file)
                && violation.message.ends_with(&format!("must not depend on {target}"))
        }),
        "expected {file} to depend on {target}, got: {violations:?}"
    );
}

#[then("the lint reports {count} violations")]
fn the_lint_reports_count(world: &LintWorld, count: usize) {
    assert_eq!(world.violations().len(), count);
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "A clean hexagon passes"
)]
fn clean_hexagon_passes(world: LintWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "An HTTP handler reaching for the memory store fails"
)]
fn handler_reaching_for_memory_fails(world: LintWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "A domain service talking HTTP fails"
)]
fn domain_talking_http_fails(world: LintWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Every violation in the tree is reported"
)]
fn every_violation_is_reported(world: LintWorld) {
    let _ = world;
}
