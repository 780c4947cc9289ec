use std::fmt;
use std::ops::Neg;

use md5::{Digest, Md5};

use super::pool::{PackageId, Pool};

/// A package decision in the SAT solver.
///
/// Positive literals mean "install package", negative means "don't install".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal(i32);

impl Literal {
    pub fn new(package_id: PackageId, install: bool) -> Self {
        if install {
            Literal(package_id)
        } else {
            Literal(-package_id)
        }
    }

    pub fn install(package_id: PackageId) -> Self {
        Literal::new(package_id, true)
    }

    pub fn forbid(package_id: PackageId) -> Self {
        Literal::new(package_id, false)
    }

    pub fn package_id(self) -> PackageId {
        self.0.abs()
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn negate(self) -> Self {
        Literal(-self.0)
    }

    pub fn value(self) -> i32 {
        self.0
    }

    /// `name-version` of the package, prefixed with `-` when negated.
    pub fn display(self, pool: &Pool) -> String {
        let prefix = if self.is_positive() { "" } else { "-" };
        match pool.package(self.package_id()) {
            Some(package) => format!("{}{}", prefix, package),
            None => format!("{}#{}", prefix, self.package_id()),
        }
    }
}

impl Neg for Literal {
    type Output = Literal;

    fn neg(self) -> Literal {
        self.negate()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rule categories, in the order the rule set iterates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleType {
    /// Derived from the request or the installed state
    Job,
    /// If A is installed, one of its requirement's providers must be
    PackageRequires,
    /// A and B cannot both be installed
    PackageConflict,
    /// Same-name packages and replaced packages cannot coexist
    PackageObsoletes,
    /// Synthesized during conflict analysis
    Learned,
}

impl RuleType {
    pub const ALL: [RuleType; 5] = [
        RuleType::Job,
        RuleType::PackageRequires,
        RuleType::PackageConflict,
        RuleType::PackageObsoletes,
        RuleType::Learned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Job => "job",
            RuleType::PackageRequires => "requires",
            RuleType::PackageConflict => "conflict",
            RuleType::PackageObsoletes => "obsoletes",
            RuleType::Learned => "learned",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a rule was generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleReason {
    JobInstall { name: String, constraint: Option<String> },
    JobUpdate { name: String },
    JobRemove { name: String },
    JobKeep { name: String },
    /// An installed package stays installed or is replaced by one of its updates
    InstalledKeep { package: PackageId },
    /// A candidate older than the installed version stays out
    NoDowngrade { installed: PackageId, candidate: PackageId },
    PackageRequires { source: PackageId, target: String, constraint: String },
    PackageConflict { source: PackageId, target: String, constraint: String },
    PackageReplaces { source: PackageId, target: String },
    SameName { name: String },
    Learned,
}

/// Permission a weak rule needs before it may be disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relaxation {
    Uninstall,
    Downgrade,
}

/// A SAT clause: at least one of its literals must hold.
#[derive(Debug, Clone)]
pub struct Rule {
    id: u32,
    literals: Vec<Literal>,
    hash: String,
    rule_type: RuleType,
    reason: RuleReason,
    disabled: bool,
    weak: Option<Relaxation>,
    watch1: Option<Literal>,
    watch2: Option<Literal>,
}

impl Rule {
    /// Create a rule. Literals are sorted by package id and deduplicated.
    pub fn new(mut literals: Vec<Literal>, rule_type: RuleType, reason: RuleReason) -> Self {
        literals.sort_by_key(|literal| (literal.package_id(), literal.value()));
        literals.dedup();

        let joined = literals
            .iter()
            .map(|literal| literal.value().to_string())
            .collect::<Vec<_>>()
            .join(",");
        let digest = Md5::digest(joined.as_bytes());
        let hash = hex::encode(digest)[..5].to_string();

        let watch1 = literals.first().copied();
        let watch2 = literals.get(1).copied();

        Self {
            id: 0,
            literals,
            hash,
            rule_type,
            reason,
            disabled: false,
            weak: None,
            watch1,
            watch2,
        }
    }

    /// `(-package | providers...)`
    pub fn requires(package: PackageId, providers: &[PackageId], reason: RuleReason) -> Self {
        let mut literals = vec![Literal::forbid(package)];
        literals.extend(providers.iter().map(|&id| Literal::install(id)));
        Rule::new(literals, RuleType::PackageRequires, reason)
    }

    /// `(-a | -b)`
    pub fn conflict(a: PackageId, b: PackageId, rule_type: RuleType, reason: RuleReason) -> Self {
        Rule::new(vec![Literal::forbid(a), Literal::forbid(b)], rule_type, reason)
    }

    /// At least one of `packages` must be installed.
    pub fn alternatives(packages: &[PackageId], reason: RuleReason) -> Self {
        Rule::new(packages.iter().map(|&id| Literal::install(id)).collect(), RuleType::Job, reason)
    }

    pub fn weak(mut self, relaxation: Relaxation) -> Self {
        self.weak = Some(relaxation);
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn reason(&self) -> &RuleReason {
        &self.reason
    }

    pub fn is_assertion(&self) -> bool {
        self.literals.len() == 1
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    pub fn disable(&mut self) {
        self.disabled = true;
    }

    pub fn is_weak(&self) -> bool {
        self.weak.is_some()
    }

    pub fn relaxation(&self) -> Option<Relaxation> {
        self.weak
    }

    pub fn watches(&self) -> (Option<Literal>, Option<Literal>) {
        (self.watch1, self.watch2)
    }

    /// The watched literal that is not `literal`.
    pub fn other_watch(&self, literal: Literal) -> Option<Literal> {
        if self.watch1 == Some(literal) {
            self.watch2
        } else {
            self.watch1
        }
    }

    /// Point both watches at members of this rule.
    pub(crate) fn set_watches(&mut self, first: Literal, second: Literal) {
        debug_assert!(self.literals.contains(&first) && self.literals.contains(&second));
        self.watch1 = Some(first);
        self.watch2 = Some(second);
    }

    pub(crate) fn move_watch(&mut self, from: Literal, to: Literal) {
        if self.watch1 == Some(from) {
            self.watch1 = Some(to);
        } else if self.watch2 == Some(from) {
            self.watch2 = Some(to);
        }
    }

    /// `(lit|lit|...)` with literals shown as `name-version`; disabled rules
    /// render as `disabled(...)`.
    pub fn display(&self, pool: &Pool) -> String {
        let literals = self
            .literals
            .iter()
            .map(|literal| literal.display(pool))
            .collect::<Vec<_>>()
            .join("|");
        if self.disabled {
            format!("disabled({})", literals)
        } else {
            format!("({})", literals)
        }
    }
}

/// Rules are equal when their literal sequences are; disabled and weak flags
/// are ignored.
impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.literals == other.literals
    }
}

impl Eq for Rule {}
