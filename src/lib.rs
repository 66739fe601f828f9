//! # Branchsweep
//!
//! Finds stale branches on a GitHub repository and deletes them.
//!
//! Branches are discovered either by scanning every unprotected branch or by
//! scanning closed pull requests, then passed through a shared filter
//! pipeline (default branch, protection, prefixes, open pull requests, base
//! branches and commit age). The survivors are deleted unless the run is a
//! dry run.
//!
//! ## Example
//!
//! ```rust,ignore
//! use branchsweep::{BranchSweeper, GithubClient, SweepConfig};
//!
//! let config: SweepConfig = cli.into_config()?;
//! let client = GithubClient::from_config(&config);
//! let result = BranchSweeper::new(&client, &config).run()?;
//! println!("{}", result.summary());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod forge;
pub mod observability;
pub mod output;
pub mod sweep;

pub use config::{Strategy, SweepConfig};
pub use forge::{BranchCandidate, ForgeApi, GithubClient, PullRequestPage, PullRequestRecord};
pub use sweep::{BranchSweeper, DeletionReport, SweepResult};

/// Error type for branchsweep operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed repository slug, empty token, unparseable URL |
/// | `OperationFailed` | Network failures, undecodable payloads, output file I/O |
/// | `Transport` | The forge answered a call with no fallback with a non-success status |
/// | `GraphQlExhausted` | Every GraphQL attempt failed before anything was selected |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The forge returned a non-success status.
    ///
    /// Raised for branch listing, default branch lookup, pull request and
    /// commit lookups, and branch lookups other than 404.
    #[error("request to {url} failed with status {status}: {body}")]
    Transport {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The response body, kept for diagnostics.
        body: String,
    },

    /// Every attempt to fetch closed pull requests failed.
    #[error("could not get any pull request info from GraphQL after {attempts} attempts")]
    GraphQlExhausted {
        /// Number of attempts made.
        attempts: u32,
    },
}

/// Result type alias for branchsweep operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::OperationFailed {
            operation: "test".to_string(),
            cause: "failed".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'test' failed: failed");

        let err = Error::Transport {
            url: "https://api.github.com/repos/o/r".to_string(),
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "request to https://api.github.com/repos/o/r failed with status 502: bad gateway"
        );

        let err = Error::GraphQlExhausted { attempts: 4 };
        assert!(err.to_string().contains("4 attempts"));
    }
}
