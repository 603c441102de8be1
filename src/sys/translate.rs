// src/sys/translate.rs

use regex::RegexSet;
use std::sync::LazyLock;

use crate::error::CloneError;
use crate::sys::traits::{ExitOutcome, InvocationOutcome};

/// Failure classes recognisable from git's stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signature {
    DestinationConflict,
    Authentication,
    NotFound,
    Network,
}

/// Ordered signature table; the first matching row wins. Authentication comes
/// before network because git prefixes HTTP 401/403 with "unable to access".
/// Extend by adding rows, not branches.
const SIGNATURES: &[(Signature, &str)] = &[
    (Signature::DestinationConflict, r"already exists and is not an empty directory"),
    (Signature::Authentication, r"authentication failed"),
    (Signature::Authentication, r"could not read (username|password)"),
    (Signature::Authentication, r"terminal prompts disabled"),
    (Signature::Authentication, r"invalid username or (password|token)"),
    (Signature::Authentication, r"http basic: access denied"),
    (Signature::Authentication, r"returned error: 40[13]"),
    (Signature::Authentication, r"bad credentials"),
    (Signature::NotFound, r"repository ('[^']*' )?not found"),
    (Signature::NotFound, r"does not appear to be a git repository"),
    (Signature::NotFound, r"returned error: 404"),
    (Signature::Network, r"could not resolve (host|proxy)"),
    (Signature::Network, r"failed to connect to"),
    (Signature::Network, r"connection (refused|reset|timed out)"),
    (Signature::Network, r"network is unreachable"),
    (Signature::Network, r"no route to host"),
    (Signature::Network, r"operation timed out"),
    (Signature::Network, r"(ssl|tls|gnutls).*(error|failed|handshake)"),
    (Signature::Network, r"the remote end hung up unexpectedly"),
    (Signature::Network, r"early eof"),
    (Signature::Network, r"returned error: 50[0234]"),
    (Signature::Network, r"unable to access"),
];

static SIGNATURE_SET: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new(SIGNATURES.iter().map(|(_, pattern)| format!("(?i){pattern}")))
        .expect("static signature table")
});

fn classify(stderr: &str) -> Option<Signature> {
    SIGNATURE_SET
        .matches(stderr)
        .iter()
        .next()
        .map(|index| SIGNATURES[index].0)
}

/// Maps a finished invocation onto the error taxonomy. `Ok(())` only for a clean exit.
///
/// `outcome.stderr` must already be scrubbed; it is carried verbatim into the error.
pub fn translate(outcome: InvocationOutcome) -> Result<(), CloneError> {
    let InvocationOutcome { exit, stderr } = outcome;
    match exit {
        ExitOutcome::Success => Ok(()),
        ExitOutcome::ToolMissing => Err(CloneError::ToolNotFound(
            "git executable not found; install git or set REPO_CLONER_GIT_BIN".into(),
        )),
        ExitOutcome::SpawnFailed(kind) => {
            Err(CloneError::CloneFailed(format!("could not run git: {kind}")))
        }
        // Rounded up: a 300ms deadline must not read as "0s".
        ExitOutcome::TimedOut { after } => Err(CloneError::Timeout {
            seconds: after.as_secs() + u64::from(after.subsec_nanos() > 0),
        }),
        ExitOutcome::Failed { code } => {
            let diagnostic = if stderr.is_empty() {
                match code {
                    Some(code) => format!("git exited with status {code}"),
                    None => "git was terminated by a signal".to_string(),
                }
            } else {
                stderr
            };
            Err(match classify(&diagnostic) {
                Some(Signature::DestinationConflict) => CloneError::DestinationConflict(diagnostic),
                Some(Signature::Authentication) => CloneError::AuthenticationFailed(diagnostic),
                Some(Signature::NotFound) => CloneError::RepositoryNotFound(diagnostic),
                Some(Signature::Network) => CloneError::NetworkError(diagnostic),
                None => CloneError::CloneFailed(diagnostic),
            })
        }
    }
}
