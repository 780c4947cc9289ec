//! Solver scenario tests.
//!
//! These tests validate the SAT-based dependency resolver behaves correctly
//! for various package resolution scenarios.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::*;
use crate::error::SolverError;
use crate::package::{LinkType, Package};

/// Helper to create a package with a given name and version
fn pkg(name: &str, version: &str) -> Package {
    Package::new(name, version)
}

/// Helper to create a package with requirements
fn pkg_with_requires(name: &str, version: &str, requires: Vec<(&str, &str)>) -> Package {
    let mut p = Package::new(name, version);
    for (dep_name, constraint) in requires {
        p.require.insert(dep_name.to_string(), constraint.to_string());
    }
    p
}

/// Helper to create a package with replaces
fn pkg_with_replaces(name: &str, version: &str, replaces: Vec<(&str, &str)>) -> Package {
    let mut p = Package::new(name, version);
    for (replace_name, constraint) in replaces {
        p.replace.insert(replace_name.to_string(), constraint.to_string());
    }
    p
}

/// Helper to create a package with conflicts
fn pkg_with_conflicts(name: &str, version: &str, conflicts: Vec<(&str, &str)>) -> Package {
    let mut p = Package::new(name, version);
    for (conflict_name, constraint) in conflicts {
        p.conflict.insert(conflict_name.to_string(), constraint.to_string());
    }
    p
}

/// Operations as (job, package_name, version), in transaction order
fn operations(transaction: &Transaction) -> Vec<(String, String, String)> {
    transaction
        .operations
        .iter()
        .map(|op| match op {
            Operation::Install(pkg) => ("install".to_string(), pkg.name.clone(), pkg.version.clone()),
            Operation::Update { from, to } => (
                "update".to_string(),
                to.name.clone(),
                format!("{} -> {}", from.version, to.version),
            ),
            Operation::Uninstall(pkg) => ("remove".to_string(), pkg.name.clone(), pkg.version.clone()),
        })
        .collect()
}

/// Check that the solver result matches expected operations, in order
fn check_solver_result(
    transaction: &Transaction,
    expected: Vec<(&str, &str, &str)>, // (job, package_name, version)
) {
    let actual = operations(transaction);
    let expected: Vec<(String, String, String)> = expected
        .into_iter()
        .map(|(j, n, v)| (j.to_string(), n.to_string(), v.to_string()))
        .collect();

    assert_eq!(
        actual, expected,
        "\nExpected operations: {:?}\nActual operations: {:?}",
        expected, actual
    );
}

fn pool_id(pool: &Pool, package: &Arc<Package>) -> PackageId {
    pool.all_package_ids()
        .find(|&id| pool.package(id).is_some_and(|p| Arc::ptr_eq(p, package)))
        .expect("package from the pool")
}

/// Apply the operations to the installed state and check the result is
/// consistent: requirements met, no conflicts, one package per name.
fn assert_valid_state(pool: &Pool, transaction: &Transaction) -> BTreeSet<PackageId> {
    let mut state: BTreeSet<PackageId> = pool.installed_map().clone();
    for op in &transaction.operations {
        match op {
            Operation::Install(package) => {
                assert!(state.insert(pool_id(pool, package)), "{} installed twice", package);
            }
            Operation::Update { from, to } => {
                assert!(state.remove(&pool_id(pool, from)), "{} was not installed", from);
                assert!(state.insert(pool_id(pool, to)));
            }
            Operation::Uninstall(package) => {
                assert!(state.remove(&pool_id(pool, package)), "{} was not installed", package);
            }
        }
    }

    let mut names = BTreeSet::new();
    for &id in &state {
        let name = pool.package_name(id).unwrap();
        assert!(names.insert(name.to_string()), "two versions of {}", name);

        for link in pool.links(id, LinkType::Require) {
            let providers = pool.what_provides_matching(&link.target, Some(link.constraint.as_ref()));
            assert!(
                providers.iter().any(|p| state.contains(p)),
                "{} requires {} {}",
                pool.package(id).unwrap(),
                link.target,
                link.pretty_constraint()
            );
        }
        for link in pool.links(id, LinkType::Conflict) {
            let conflicting = pool.what_provides_matching(&link.target, Some(link.constraint.as_ref()));
            assert!(
                !conflicting.iter().any(|p| *p != id && state.contains(p)),
                "{} conflicts with {}",
                pool.package(id).unwrap(),
                link.target
            );
        }
    }
    state
}

// ============================================================================
// Basic Installation Tests
// ============================================================================

#[test]
fn test_solver_install_single() {
    let mut pool = Pool::new();
    pool.add_package(pkg("a", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*");

    let transaction = solver.solve(&request).expect("Solver should find a solution");
    check_solver_result(&transaction, vec![("install", "a", "1.0.0")]);
    assert_valid_state(&pool, &transaction);
}

#[test]
fn test_solver_remove_installed() {
    let mut pool = Pool::new();
    pool.add_installed_package(pkg("a", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.remove("a");

    let transaction = solver.solve(&request).expect("Solver should find a solution");
    check_solver_result(&transaction, vec![("remove", "a", "1.0.0")]);
}

#[test]
fn test_solver_keeps_unrelated_installed_packages() {
    let mut pool = Pool::new();
    pool.add_installed_package(pkg("a", "1.0.0"));
    pool.add_package(pkg("a", "1.1.0"));
    pool.add_package(pkg("b", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("b", "*");

    let transaction = solver.solve(&request).expect("Solver should find a solution");
    check_solver_result(&transaction, vec![("install", "b", "1.0.0")]);
}

#[test]
fn test_solver_install_with_deps() {
    let mut pool = Pool::new();

    // A requires B < 1.1
    pool.add_package(pkg_with_requires("a", "1.0.0", vec![("b", "<1.1")]));
    pool.add_package(pkg("b", "1.0.0"));
    pool.add_package(pkg("b", "1.1.0")); // This version should NOT be selected

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*");

    let transaction = solver.solve(&request).expect("Solver should find a solution");

    // Should install B 1.0.0 (not 1.1.0) and A 1.0.0
    check_solver_result(&transaction, vec![("install", "b", "1.0.0"), ("install", "a", "1.0.0")]);
    assert_valid_state(&pool, &transaction);
}

#[test]
fn test_solver_install_with_deps_in_order() {
    let mut pool = Pool::new();

    // B requires A and C, C requires A
    pool.add_package(pkg("a", "1.0.0"));
    pool.add_package(pkg_with_requires("b", "1.0.0", vec![("a", ">=1.0"), ("c", ">=1.0")]));
    pool.add_package(pkg_with_requires("c", "1.0.0", vec![("a", ">=1.0")]));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*").install("b", "*").install("c", "*");

    let transaction = solver.solve(&request).expect("Solver should find a solution");

    // A before C, C before B
    let install_names: Vec<String> = transaction.installs().map(|p| p.name.clone()).collect();
    assert_eq!(install_names, vec!["a", "c", "b"]);
}

// ============================================================================
// Update Tests
// ============================================================================

#[test]
fn test_solver_update_single() {
    let mut pool = Pool::new();
    pool.add_package(pkg("a", "1.0.0"));
    pool.add_package(pkg("a", "1.1.0"));
    pool.add_installed_package(pkg("a", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.update("a", false);

    let transaction = solver.solve(&request).expect("Solver should find a solution");

    // Should update A from 1.0.0 to 1.1.0
    let updates: Vec<_> = transaction.updates().collect();
    assert_eq!(updates.len(), 1, "Should have one update operation");
    assert_eq!(updates[0].0.version, "1.0.0");
    assert_eq!(updates[0].1.version, "1.1.0");
}

#[test]
fn test_solver_install_of_installed_package_upgrades() {
    let mut pool = Pool::new();
    pool.add_package(pkg("a", "1.0.0"));
    pool.add_package(pkg("a", "1.1.0"));
    pool.add_installed_package(pkg("a", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*");

    let transaction = solver.solve(&request).expect("Solver should find a solution");
    check_solver_result(&transaction, vec![("update", "a", "1.0.0 -> 1.1.0")]);
}

#[test]
fn test_solver_update_current_no_change() {
    let mut pool = Pool::new();
    pool.add_package(pkg("a", "1.0.0"));
    pool.add_installed_package(pkg("a", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*");

    let transaction = solver.solve(&request).expect("Solver should find a solution");

    // No changes needed - same version
    assert!(transaction.is_empty(), "Transaction should be empty when already at correct version");
}

#[test]
fn test_solver_update_constrained() {
    let mut pool = Pool::new();
    pool.add_package(pkg("a", "1.0.0"));
    pool.add_package(pkg("a", "1.2.0"));
    pool.add_package(pkg("a", "2.0.0")); // Should not be selected
    pool.add_installed_package(pkg("a", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.add_job(Job::new(JobCommand::Update, "a").with_constraint("<2.0"));

    let transaction = solver.solve(&request).expect("Solver should find a solution");

    // Should update to 1.2.0, not 2.0.0
    let updates: Vec<_> = transaction.updates().collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1.version, "1.2.0");
}

#[test]
fn test_solver_update_without_installed_installs() {
    let mut pool = Pool::new();
    pool.add_package(pkg("a", "1.0.0"));
    pool.add_package(pkg("a", "2.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.update("a", false);

    let transaction = solver.solve(&request).expect("Solver should find a solution");
    check_solver_result(&transaction, vec![("install", "a", "2.0.0")]);
}

// ============================================================================
// Relaxation Tests
// ============================================================================

#[test]
fn test_solver_downgrade_when_allowed() {
    let mut pool = Pool::new();
    pool.add_package(pkg("a", "1.0.0"));
    pool.add_installed_package(pkg("a", "2.0.0"));

    let mut request = Request::new();
    request.install("a", "<2.0");

    let policy = DefaultPolicy::new();
    let transaction = Solver::new(&pool, &policy).solve(&request).expect("downgrade is allowed");
    check_solver_result(&transaction, vec![("update", "a", "2.0.0 -> 1.0.0")]);

    let policy = DefaultPolicy::new().allowing_downgrade(false);
    let err = Solver::new(&pool, &policy).solve(&request).unwrap_err();
    let SolverError::Unresolvable(err) = err else {
        panic!("expected an unresolvable error, got {:?}", err);
    };
    assert!(err.problem.rules.iter().any(|rule| rule.weak));
    assert!(err.to_string().contains("would downgrade installed a 2.0.0"));
}

#[test]
fn test_solver_uninstall_when_allowed() {
    let mut pool = Pool::new();
    pool.add_installed_package(pkg("a", "1.0.0"));
    pool.add_package(pkg_with_conflicts("b", "1.0.0", vec![("a", "*")]));

    let mut request = Request::new();
    request.install("b", "*");

    let policy = DefaultPolicy::new();
    let transaction = Solver::new(&pool, &policy).solve(&request).expect("uninstall is allowed");
    check_solver_result(&transaction, vec![("remove", "a", "1.0.0"), ("install", "b", "1.0.0")]);
    assert_valid_state(&pool, &transaction);

    let policy = DefaultPolicy::new().allowing_uninstall(false);
    let err = Solver::new(&pool, &policy).solve(&request).unwrap_err();
    assert!(matches!(err, SolverError::Unresolvable(_)));
}

#[test]
fn test_solver_reports_relaxed_rules() {
    // Installing b removes a, which the kept package x still requires
    let mut pool = Pool::new();
    pool.add_installed_package(pkg("a", "1.0.0"));
    pool.add_installed_package(pkg_with_requires("x", "1.0.0", vec![("a", "*")]));
    pool.add_package(pkg_with_conflicts("b", "1.0.0", vec![("a", "*")]));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("b", "*").keep("x");

    let SolverError::Unresolvable(err) = solver.solve(&request).unwrap_err() else {
        panic!("expected an unresolvable error");
    };

    // the keep rule of a was given up before the search failed for good
    let relaxed = &err.problem.rules[0];
    assert!(relaxed.weak);
    assert!(relaxed.disabled);
    assert_eq!(relaxed.rendered, "disabled(a-1.0.0)");
    assert_eq!(relaxed.reason, "a 1.0.0 is installed and must stay installed or be updated");

    let message = err.to_string();
    assert!(message.contains("b 1.0.0 conflicts with a *"), "{}", message);
    assert!(message.contains("x 1.0.0 requires a *"), "{}", message);
    assert_eq!(message.matches("disabled(").count(), 1);
}

#[test]
fn test_solver_installed_package_updated_when_needed() {
    let mut pool = Pool::new();
    pool.add_installed_package(pkg("lib", "1.0.0"));
    pool.add_package(pkg("lib", "1.0.0"));
    pool.add_package(pkg("lib", "2.0.0"));
    pool.add_package(pkg_with_requires("app", "1.0.0", vec![("lib", "^2.0")]));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("app", "*");

    let transaction = solver.solve(&request).expect("Solver should find a solution");
    check_solver_result(
        &transaction,
        vec![("update", "lib", "1.0.0 -> 2.0.0"), ("install", "app", "1.0.0")],
    );
}

// ============================================================================
// Conflict Tests
// ============================================================================

#[test]
fn test_solver_three_alternative_require_and_conflict() {
    let mut pool = Pool::new();

    // A requires B < 1.1 and conflicts with B < 1.0
    let mut pkg_a = pkg_with_requires("a", "2.0.0", vec![("b", "<1.1")]);
    pkg_a.conflict.insert("b".to_string(), "<1.0".to_string());
    pool.add_package(pkg_a);

    pool.add_package(pkg("b", "0.9.0")); // Too old, conflicts
    pool.add_package(pkg("b", "1.0.0")); // Just right
    pool.add_package(pkg("b", "1.1.0")); // Too new, doesn't match require

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*");

    let transaction = solver.solve(&request).expect("Solver should find a solution");

    // Should install B 1.0.0 (the middle version)
    let b_pkg = transaction.installs().find(|p| p.name == "b").expect("B should be installed");
    assert_eq!(b_pkg.version, "1.0.0");
    assert_valid_state(&pool, &transaction);
}

#[test]
fn test_solver_conflict_between_requirements() {
    let mut pool = Pool::new();

    // A requires B ^1.0
    pool.add_package(pkg_with_requires("a", "1.0.0", vec![("b", "^1.0")]));
    // C requires B ^2.0
    pool.add_package(pkg_with_requires("c", "1.0.0", vec![("b", "^2.0")]));
    // Only B 1.0 exists
    pool.add_package(pkg("b", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*").install("c", "*");

    // This should fail because C needs B ^2.0 but only B 1.0 exists
    let err = solver.solve(&request).unwrap_err();
    let SolverError::Unresolvable(err) = err else {
        panic!("expected an unresolvable error, got {:?}", err);
    };
    let message = err.to_string();
    assert!(message.contains("c 1.0.0 requires b ^2.0"), "{}", message);
}

#[test]
fn test_solver_unsatisfiable_constraint_reports_job() {
    let mut pool = Pool::new();
    pool.add_package(pkg("a", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", ">=2.0");

    let SolverError::Unresolvable(err) = solver.solve(&request).unwrap_err() else {
        panic!("expected an unresolvable error");
    };
    assert_eq!(err.problem.rules.len(), 1);
    assert_eq!(err.problem.rules[0].rule_type, RuleType::Job);
    assert_eq!(err.problem.rules[0].rendered, "()");
    assert!(err.problem.rules[0].reason.contains("a >=2.0"));
}

#[test]
fn test_solver_learns_from_conflicts() {
    let mut pool = Pool::new();

    // The newest A pulls in C, which conflicts with X
    pool.add_package(pkg_with_requires("x", "1.0.0", vec![("a", "*")]));
    pool.add_package(pkg_with_requires("a", "1.0.0", vec![("b", "^1.0")]));
    pool.add_package(pkg_with_requires("a", "2.0.0", vec![("b", "^2.0")]));
    pool.add_package(pkg("b", "1.0.0"));
    pool.add_package(pkg_with_requires("b", "2.0.0", vec![("c", "^1.0")]));
    pool.add_package(pkg_with_conflicts("c", "1.0.0", vec![("x", "*")]));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("x", "*");

    let transaction = solver.solve(&request).expect("Solver should find a solution");
    check_solver_result(
        &transaction,
        vec![
            ("install", "b", "1.0.0"),
            ("install", "a", "1.0.0"),
            ("install", "x", "1.0.0"),
        ],
    );
    assert_valid_state(&pool, &transaction);
}

// ============================================================================
// Replace Tests
// ============================================================================

#[test]
fn test_solver_obsolete_replaced() {
    let mut pool = Pool::new();

    // B replaces A
    pool.add_package(pkg_with_replaces("b", "1.0.0", vec![("a", "*")]));
    pool.add_installed_package(pkg("a", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("b", "*");

    let transaction = solver.solve(&request).expect("Solver should find a solution");

    // The uninstall of the replaced package comes first
    check_solver_result(&transaction, vec![("remove", "a", "1.0.0"), ("install", "b", "1.0.0")]);
}

#[test]
fn test_skip_replacer_of_existing_package() {
    let mut pool = Pool::new();

    // A requires B
    pool.add_package(pkg_with_requires("a", "1.0.0", vec![("b", ">=1.0")]));
    // B exists
    pool.add_package(pkg("b", "1.0.0"));
    // Q replaces B but we don't need it since B exists
    pool.add_package(pkg_with_replaces("q", "1.0.0", vec![("b", ">=1.0")]));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*");

    let transaction = solver.solve(&request).expect("Solver should find a solution");

    // Should install B, not Q
    let installs: Vec<_> = transaction.installs().collect();
    assert!(installs.iter().any(|p| p.name == "b"), "B should be installed");
    assert!(!installs.iter().any(|p| p.name == "q"), "Q should not be installed when B exists");
}

/// When Q replaces B and both A requires B and we require Q,
/// the solver should recognize Q satisfies B's requirement.
#[test]
fn test_skip_replaced_package_if_replacer_is_selected() {
    let mut pool = Pool::new();

    // A requires B
    pool.add_package(pkg_with_requires("a", "1.0.0", vec![("b", ">=1.0")]));
    // B exists
    pool.add_package(pkg("b", "1.0.0"));
    // Q replaces B >=1.0
    pool.add_package(pkg_with_replaces("q", "1.0.0", vec![("b", ">=1.0")]));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*").install("q", "*");

    let transaction = solver.solve(&request).expect("Solver should find a solution");

    // Should install Q, not B (since Q is explicitly required and replaces B)
    let installs: Vec<_> = transaction.installs().collect();
    assert!(installs.iter().any(|p| p.name == "q"), "Q should be installed");
    assert!(!installs.iter().any(|p| p.name == "b"), "B is replaced by Q");
}

/// D satisfies the requirements on both B and C via its replaces.
#[test]
fn test_use_replacer_if_necessary() {
    let mut pool = Pool::new();

    // A requires B and C
    pool.add_package(pkg_with_requires("a", "1.0.0", vec![("b", ">=1.0"), ("c", ">=1.0")]));
    // B exists
    pool.add_package(pkg("b", "1.0.0"));
    // D replaces both B and C (C doesn't exist separately, so D is needed)
    pool.add_package(pkg_with_replaces("d", "1.0.0", vec![("b", ">=1.0"), ("c", ">=1.0")]));
    pool.add_package(pkg_with_replaces("d", "1.1.0", vec![("b", ">=1.0"), ("c", ">=1.0")]));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*").install("d", "*");

    let transaction = solver.solve(&request).expect("Solver should find a solution");
    let installs: Vec<_> = transaction.installs().collect();

    // D 1.1 should be installed (highest version)
    let d_pkg = installs.iter().find(|p| p.name == "d").expect("D should be installed");
    assert_eq!(d_pkg.version, "1.1.0");
    assert!(!installs.iter().any(|p| p.name == "b"));
}

// ============================================================================
// Circular Dependency Tests
// ============================================================================

#[test]
fn test_install_circular_require() {
    let mut pool = Pool::new();

    // A requires B >= 1.0
    pool.add_package(pkg_with_requires("a", "1.0.0", vec![("b", ">=1.0")]));
    // B 0.9 doesn't require A
    pool.add_package(pkg("b", "0.9.0"));
    // B 1.1 requires A >= 1.0 (circular)
    pool.add_package(pkg_with_requires("b", "1.1.0", vec![("a", ">=1.0")]));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*");

    let transaction = solver.solve(&request).expect("Solver should handle circular dependencies");
    let installs: Vec<_> = transaction.installs().collect();
    assert_eq!(installs.len(), 2);

    // Should install B 1.1 (the one with circular dep) and A
    let b_pkg = installs.iter().find(|p| p.name == "b").unwrap();
    assert_eq!(b_pkg.version, "1.1.0");
}

// ============================================================================
// Version Selection Tests
// ============================================================================

#[test]
fn test_solver_prefer_highest() {
    let mut pool = Pool::new();
    pool.add_package(pkg("a", "1.0.0"));
    pool.add_package(pkg("a", "2.0.0"));
    pool.add_package(pkg("a", "3.0.0"));

    let policy = DefaultPolicy::new(); // Default prefers highest
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*");

    let transaction = solver.solve(&request).unwrap();
    let installed: Vec<_> = transaction.installs().collect();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].version, "3.0.0", "Should prefer highest version");
}

#[test]
fn test_solver_prefer_lowest() {
    let mut pool = Pool::new();
    pool.add_package(pkg("a", "1.0.0"));
    pool.add_package(pkg("a", "2.0.0"));
    pool.add_package(pkg("a", "3.0.0"));

    let policy = DefaultPolicy::new().prefer_lowest(true);
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*");

    let transaction = solver.solve(&request).unwrap();
    let installed: Vec<_> = transaction.installs().collect();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].version, "1.0.0", "Should prefer lowest version");
}

#[test]
fn test_solver_repository_priorities() {
    // Equal versions in repositories with priorities 10, 10 and 5: the
    // first registered package of the two top repositories wins
    let mut pool = Pool::new();
    pool.set_priority("first", 10);
    pool.set_priority("second", 10);
    pool.set_priority("third", 5);
    pool.add_package_from_repo(pkg("a", "1.0.0"), "third");
    let expected = pool.add_package_from_repo(pkg("a", "1.0.0"), "first");
    pool.add_package_from_repo(pkg("a", "1.0.0"), "second");

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*");

    let transaction = solver.solve(&request).unwrap();
    let installed: Vec<_> = transaction.installs().collect();
    assert_eq!(installed.len(), 1);
    assert!(Arc::ptr_eq(installed[0], pool.package(expected).unwrap()));
}

#[test]
fn test_solver_pick_older_if_newer_conflicts() {
    let mut pool = Pool::new();

    // X requires A >= 2.0 and B >= 2.0
    pool.add_package(pkg_with_requires("x", "1.0.0", vec![("a", ">=2.0"), ("b", ">=2.0")]));

    // A 2.0 requires B >= 2.0
    pool.add_package(pkg_with_requires("a", "2.0.0", vec![("b", ">=2.0")]));
    // A 2.1 requires B >= 2.2 (which doesn't exist)
    pool.add_package(pkg_with_requires("a", "2.1.0", vec![("b", ">=2.2")]));

    // Only B 2.1 exists
    pool.add_package(pkg("b", "2.1.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("x", "*");

    let transaction = solver.solve(&request).expect("Solver should find a solution");

    // Should install A 2.0.0 (not 2.1.0 which needs B 2.2)
    let a_pkg = transaction.installs().find(|p| p.name == "a").expect("A should be installed");
    assert_eq!(a_pkg.version, "2.0.0", "Should pick older A version that works");
    assert_valid_state(&pool, &transaction);
}

// ============================================================================
// Keep Tests
// ============================================================================

#[test]
fn test_solver_keep_installed() {
    let mut pool = Pool::new();
    pool.add_package(pkg("a", "1.0.0"));
    pool.add_package(pkg("a", "1.1.0"));
    pool.add_installed_package(pkg("a", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.keep("a");

    let transaction = solver.solve(&request).unwrap();
    // Kept package shouldn't be changed or removed
    assert!(transaction.is_empty());
}

#[test]
fn test_solver_keep_blocks_required_update() {
    let mut pool = Pool::new();
    pool.add_installed_package(pkg("lib", "1.0.0"));
    pool.add_package(pkg("lib", "2.0.0"));
    pool.add_package(pkg_with_requires("app", "1.0.0", vec![("lib", "^2.0")]));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.keep("lib").install("app", "*");

    let err = solver.solve(&request).unwrap_err();
    assert!(matches!(err, SolverError::Unresolvable(_)));
}

// ============================================================================
// Configuration Error Tests
// ============================================================================

#[test]
fn test_install_non_existing_package_fails() {
    let mut pool = Pool::new();
    pool.add_package(pkg("a", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("nonexistent", "1.0.0");

    let err = solver.solve(&request).unwrap_err();
    assert!(matches!(
        err,
        SolverError::Configuration(crate::error::ConfigurationError::UnknownPackage { .. })
    ));
}

#[test]
fn test_invalid_pool_metadata_fails_before_solving() {
    let mut pool = Pool::new();
    pool.add_package(pkg_with_requires("a", "1.0.0", vec![("b", ">=foo")]));
    pool.add_package(pkg("b", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("b", "*");

    let err = solver.solve(&request).unwrap_err();
    assert!(matches!(err, SolverError::Configuration(_)));
}

// ============================================================================
// Budget Tests
// ============================================================================

#[test]
fn test_solver_step_budget() {
    let mut pool = Pool::new();
    pool.add_package(pkg("a", "1.0.0"));
    pool.add_package(pkg("a", "2.0.0"));

    let policy = DefaultPolicy::new();
    let mut request = Request::new();
    request.install("a", "*");

    let solver = Solver::new(&pool, &policy).with_config(SolverConfig::new().with_max_steps(0));
    let err = solver.solve(&request).unwrap_err();
    assert!(matches!(err, SolverError::Timeout { steps: 1, .. }));

    let solver = Solver::new(&pool, &policy).with_config(SolverConfig::new().with_max_steps(1));
    assert!(solver.solve(&request).is_ok());
}

// ============================================================================
// Complex Dependency Chain Tests
// ============================================================================

#[test]
fn test_solver_deep_dependency_chain() {
    let mut pool = Pool::new();

    // A -> B -> C -> D -> E
    pool.add_package(pkg_with_requires("a", "1.0.0", vec![("b", "^1.0")]));
    pool.add_package(pkg_with_requires("b", "1.0.0", vec![("c", "^1.0")]));
    pool.add_package(pkg_with_requires("c", "1.0.0", vec![("d", "^1.0")]));
    pool.add_package(pkg_with_requires("d", "1.0.0", vec![("e", "^1.0")]));
    pool.add_package(pkg("e", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*");

    let transaction = solver.solve(&request).expect("Solver should resolve deep dependency chain");
    let names: Vec<_> = transaction.installs().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["e", "d", "c", "b", "a"]);
}

#[test]
fn test_solver_diamond_dependency() {
    let mut pool = Pool::new();

    // Diamond: A -> B, A -> C, B -> D, C -> D
    pool.add_package(pkg_with_requires("a", "1.0.0", vec![("b", "^1.0"), ("c", "^1.0")]));
    pool.add_package(pkg_with_requires("b", "1.0.0", vec![("d", "^1.0")]));
    pool.add_package(pkg_with_requires("c", "1.0.0", vec![("d", "^1.0")]));
    pool.add_package(pkg("d", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*");

    let transaction = solver.solve(&request).expect("Solver should resolve diamond dependency");
    let installs: Vec<_> = transaction.installs().collect();
    assert_eq!(installs.len(), 4, "Should install A, B, C, D");

    // D should only be installed once
    let d_count = installs.iter().filter(|p| p.name == "d").count();
    assert_eq!(d_count, 1, "D should only be installed once");
    assert_valid_state(&pool, &transaction);
}

// ============================================================================
// All Jobs Test (Install, Update, Remove in same transaction)
// ============================================================================

#[test]
fn test_solver_all_jobs() {
    let mut pool = Pool::new();

    // A requires B < 1.1
    pool.add_package(pkg_with_requires("a", "2.0.0", vec![("b", "<1.1")]));
    pool.add_package(pkg("b", "1.0.0"));
    pool.add_package(pkg("b", "1.1.0"));
    pool.add_package(pkg("c", "1.1.0"));
    pool.add_package(pkg("d", "1.0.0"));
    pool.add_installed_package(pkg("d", "1.0.0"));
    pool.add_installed_package(pkg("c", "1.0.0"));

    let policy = DefaultPolicy::new();
    let solver = Solver::new(&pool, &policy);

    let mut request = Request::new();
    request.install("a", "*").update("c", false).remove("d");

    let transaction = solver.solve(&request).expect("Solver should find a solution");

    check_solver_result(
        &transaction,
        vec![
            ("remove", "d", "1.0.0"),
            ("install", "b", "1.0.0"),
            ("install", "a", "2.0.0"),
            ("update", "c", "1.0.0 -> 1.1.0"),
        ],
    );
    assert_valid_state(&pool, &transaction);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_solver_is_deterministic() {
    let mut pool = Pool::new();
    pool.add_package(pkg_with_requires("app", "1.0.0", vec![("log", "*"), ("http", "^1.0")]));
    for version in ["1.0.0", "1.1.0", "2.0.0"] {
        let mut log = pkg("monolog", version);
        log.provide.insert("log".to_string(), "1.0".to_string());
        pool.add_package(log);
    }
    pool.add_package(pkg_with_replaces("fork/log", "1.0.0", vec![("monolog", "*")]));
    pool.add_package(pkg_with_requires("http", "1.0.0", vec![("psr", "^1.0")]));
    pool.add_package(pkg_with_requires("http", "1.5.0", vec![("psr", "^2.0")]));
    pool.add_package(pkg("psr", "1.0.0"));
    pool.add_package(pkg("psr", "2.0.0"));
    pool.add_installed_package(pkg("psr", "1.0.0"));

    let policy = DefaultPolicy::new();
    let mut request = Request::new();
    request.install("app", "*");

    let first = operations(&Solver::new(&pool, &policy).solve(&request).unwrap());
    for _ in 0..5 {
        let again = operations(&Solver::new(&pool, &policy).solve(&request).unwrap());
        assert_eq!(first, again);
    }
}
