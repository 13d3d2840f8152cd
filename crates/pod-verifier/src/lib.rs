#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`VerifierError`, `PreconditionFailure`, `ErrorKind`)
//! - [`config`]: Verifier configuration (`VerifierConfig`, builder)
//! - [`target`]: Execution target abstraction (`ExecTarget` trait)
//! - [`kubernetes`]: Kubernetes Pod backend (`KubePodTarget`)
//! - [`docker`]: Local Docker container backend (`DockerContainerTarget`)
//! - [`poller`]: Bounded polling (`BoundedPoller`, `Tick`)
//! - [`command`]: Remote command construction and package name validation
//! - [`verifier`]: Package import verification (`PackageVerifier`, `VerificationReport`)
//! - [`readiness`]: Existence / Ready / exec connection waits (`ReadinessFailure`)
//! - [`diagnostics`]: Container status and log rendering for readiness failures
//! - [`snippet`]: Functional snippet checks (`SnippetRunner`, `SnippetSuite`)
//! - [`resources`]: Auth sidecar resource check
//! - [`deadline`]: Advisory overall deadline (`AdvisoryDeadline`)
//! - [`report`]: Human readable failure report
//!
//! # Architecture
//!
//! ```text
//! wait_until_ready ──► wait_for_exec_connection ──► PackageVerifier / SnippetRunner
//!        │                       │                          │
//!        └──── BoundedPoller ────┘                          │
//!                    │                                      │
//!                    ▼                                      ▼
//!               ExecTarget (Kube / Docker) ◄────────────────┘
//! ```

pub mod command;
pub mod config;
pub mod deadline;
pub mod diagnostics;
pub mod docker;
pub mod error;
pub mod kubernetes;
pub mod poller;
pub mod readiness;
pub mod report;
pub mod resources;
pub mod snippet;
pub mod target;
pub mod verifier;

// --- Public API Re-exports ---

// Verification
pub use verifier::{
    LOG_PLACEHOLDER, PackageVerificationResult, PackageVerifier, VerificationReport,
    validate_request,
};

// Configuration
pub use config::{VerifierConfig, VerifierConfigBuilder};

// Error
pub use error::{ErrorKind, PreconditionFailure, VerifierError};

// Targets
pub use docker::DockerContainerTarget;
pub use kubernetes::KubePodTarget;
pub use target::ExecTarget;

// Polling and waits
pub use deadline::AdvisoryDeadline;
pub use poller::{BoundedPoller, Tick};
pub use readiness::{
    ReadinessFailure, wait_for_condition, wait_for_exec_connection, wait_for_existence,
    wait_until_ready,
};

// Commands
pub use command::{RemoteCommand, validate_package_name};

// Snippets
pub use snippet::{SnippetCheck, SnippetOutcome, SnippetReport, SnippetRunner, SnippetSuite};

// Resources
pub use resources::{ExpectedSidecarResources, ResourceMismatch, check_auth_sidecar_resources};

// Reporting
pub use report::{format_package_failure_report, summary_line};
