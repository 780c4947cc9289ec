use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::pool::{PackageId, Pool};
use crate::package::{LinkType, Package};

/// The kind of an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Install,
    Update,
    Uninstall,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Install => "install",
            OperationKind::Update => "update",
            OperationKind::Uninstall => "uninstall",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single step that moves the installed state to the solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Install(Arc<Package>),
    Update { from: Arc<Package>, to: Arc<Package> },
    Uninstall(Arc<Package>),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Install(_) => OperationKind::Install,
            Operation::Update { .. } => OperationKind::Update,
            Operation::Uninstall(_) => OperationKind::Uninstall,
        }
    }

    /// The package installed or removed; the target of an update
    pub fn package(&self) -> &Arc<Package> {
        match self {
            Operation::Install(package) | Operation::Uninstall(package) => package,
            Operation::Update { to, .. } => to,
        }
    }

    /// The package an update replaces
    pub fn previous_package(&self) -> Option<&Arc<Package>> {
        match self {
            Operation::Update { from, .. } => Some(from),
            _ => None,
        }
    }

    /// Whether an update changes the installed artifact. Always true for
    /// installs and uninstalls.
    pub fn source_changed(&self) -> bool {
        match self {
            Operation::Update { from, to } => !from.same_artifact(to),
            _ => true,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Install(package) => write!(f, "Installing {}", package.pretty_string()),
            Operation::Update { from, to } => write!(
                f,
                "Updating {} ({} => {})",
                to.name,
                from.pretty_version(),
                to.pretty_version()
            ),
            Operation::Uninstall(package) => write!(f, "Removing {}", package.pretty_string()),
        }
    }
}

/// Ordered operations produced by a successful solve.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    pub operations: Vec<Operation>,
}

impl Transaction {
    /// Diff the selected packages against the installed state of the pool.
    ///
    /// Uninstalls come first, dependents before their dependencies. Installs
    /// and updates follow with dependencies first.
    pub fn from_selection(pool: &Pool, selected: &BTreeSet<PackageId>) -> Self {
        let installed = pool.installed_map();

        let mut to_install: Vec<PackageId> = selected.difference(installed).copied().collect();
        let to_remove: Vec<PackageId> = installed.difference(selected).copied().collect();

        // An installed package leaving the selection is updated when a new
        // package of the same name enters it
        let mut updates: HashMap<PackageId, PackageId> = HashMap::new();
        let mut uninstalls = Vec::new();
        for &from in &to_remove {
            let name = pool.package_name(from);
            let paired = to_install.iter().position(|&candidate| {
                !updates.contains_key(&candidate) && pool.package_name(candidate) == name
            });
            match paired {
                Some(index) => {
                    updates.insert(to_install[index], from);
                }
                None => uninstalls.push(from),
            }
        }

        let mut operations = Vec::with_capacity(to_install.len() + uninstalls.len());

        let uninstall_set: BTreeSet<PackageId> = uninstalls.iter().copied().collect();
        let mut removal_order = dependency_order(pool, &uninstall_set, &uninstalls);
        removal_order.reverse();
        operations.extend(
            removal_order
                .into_iter()
                .filter_map(|id| pool.package(id).cloned())
                .map(Operation::Uninstall),
        );

        to_install.sort_unstable();
        let changed: HashSet<PackageId> = to_install.iter().copied().collect();
        for id in dependency_order(pool, selected, &to_install) {
            if !changed.contains(&id) {
                continue;
            }
            let Some(to) = pool.package(id).cloned() else {
                continue;
            };
            let operation = match updates.get(&id).and_then(|&from| pool.package(from)) {
                Some(from) => Operation::Update { from: from.clone(), to },
                None => Operation::Install(to),
            };
            operations.push(operation);
        }

        Self { operations }
    }

    /// Packages that end up installed by this transaction
    pub fn installs(&self) -> impl Iterator<Item = &Arc<Package>> {
        self.operations.iter().filter_map(|op| match op {
            Operation::Install(package) | Operation::Update { to: package, .. } => Some(package),
            Operation::Uninstall(_) => None,
        })
    }

    /// Packages installed that had no installed version before
    pub fn new_installs(&self) -> impl Iterator<Item = &Arc<Package>> {
        self.operations.iter().filter_map(|op| match op {
            Operation::Install(package) => Some(package),
            _ => None,
        })
    }

    /// `(from, to)` pairs
    pub fn updates(&self) -> impl Iterator<Item = (&Arc<Package>, &Arc<Package>)> {
        self.operations.iter().filter_map(|op| match op {
            Operation::Update { from, to } => Some((from, to)),
            _ => None,
        })
    }

    pub fn removals(&self) -> impl Iterator<Item = &Arc<Package>> {
        self.operations.iter().filter_map(|op| match op {
            Operation::Uninstall(package) => Some(package),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }
}

/// Post-order walk of the requires graph restricted to `universe`, starting
/// from `roots` in order. Dependencies come before their dependents; cycles
/// are broken by visit order.
fn dependency_order(pool: &Pool, universe: &BTreeSet<PackageId>, roots: &[PackageId]) -> Vec<PackageId> {
    let mut order = Vec::with_capacity(roots.len());
    let mut visited = HashSet::new();

    for &root in roots {
        if !visited.insert(root) {
            continue;
        }
        // Iterative DFS: (package, its dependencies, next index)
        let mut stack = vec![(root, dependencies(pool, universe, root), 0usize)];
        while let Some((package, deps, index)) = stack.last_mut() {
            if let Some(&dep) = deps.get(*index) {
                *index += 1;
                if visited.insert(dep) {
                    let dep_deps = dependencies(pool, universe, dep);
                    stack.push((dep, dep_deps, 0));
                }
            } else {
                order.push(*package);
                stack.pop();
            }
        }
    }

    order
}

fn dependencies(pool: &Pool, universe: &BTreeSet<PackageId>, package: PackageId) -> Vec<PackageId> {
    let mut deps = Vec::new();
    for link in pool.links(package, LinkType::Require) {
        for provider in pool.what_provides_matching(&link.target, Some(link.constraint.as_ref())) {
            if provider != package && universe.contains(&provider) && !deps.contains(&provider) {
                deps.push(provider);
            }
        }
    }
    deps
}
