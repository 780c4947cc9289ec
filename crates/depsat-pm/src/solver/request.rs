use serde::{Deserialize, Serialize};

/// What a job asks the solver to do with a package name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobCommand {
    Install,
    Update,
    Remove,
    Keep,
}

impl JobCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobCommand::Install => "install",
            JobCommand::Update => "update",
            JobCommand::Remove => "remove",
            JobCommand::Keep => "keep",
        }
    }
}

/// A single request entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub command: JobCommand,
    pub package_name: String,
    /// Constraint string, `None` matches every version
    pub constraint: Option<String>,
    /// Update: allow every same-name version, not only newer ones
    pub allow_all: bool,
}

impl Job {
    pub fn new(command: JobCommand, package_name: impl Into<String>) -> Self {
        Self {
            command,
            package_name: package_name.into(),
            constraint: None,
            allow_all: false,
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    pub fn allowing_all(mut self, allow_all: bool) -> Self {
        self.allow_all = allow_all;
        self
    }
}

/// An ordered list of jobs to resolve.
///
/// The installed state itself lives in the [`Pool`](super::Pool); the request
/// only names the packages the caller wants changed or pinned.
#[derive(Debug, Clone, Default)]
pub struct Request {
    jobs: Vec<Job>,
}

impl Request {
    /// Create a new empty request
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a package matching `constraint`
    pub fn install(&mut self, name: &str, constraint: &str) -> &mut Self {
        self.add_job(Job::new(JobCommand::Install, name).with_constraint(constraint))
    }

    /// Update an installed package. With `allow_all` older versions are
    /// candidates as well.
    pub fn update(&mut self, name: &str, allow_all: bool) -> &mut Self {
        self.add_job(Job::new(JobCommand::Update, name).allowing_all(allow_all))
    }

    /// Remove every package of that name
    pub fn remove(&mut self, name: &str) -> &mut Self {
        self.add_job(Job::new(JobCommand::Remove, name))
    }

    /// Pin the installed package of that name
    pub fn keep(&mut self, name: &str) -> &mut Self {
        self.add_job(Job::new(JobCommand::Keep, name))
    }

    pub fn add_job(&mut self, job: Job) -> &mut Self {
        self.jobs.push(job);
        self
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Whether an update job with `allow_all` names this package
    pub fn allows_all_versions_of(&self, name: &str) -> bool {
        self.jobs.iter().any(|job| {
            job.command == JobCommand::Update && job.allow_all && job.package_name.eq_ignore_ascii_case(name)
        })
    }
}
