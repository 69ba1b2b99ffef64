//! Per-run environment identity
//!
//! Every scenario run gets a project name of the form
//! `<prefix>_<scenario>_<token>` so that concurrent or repeated runs never
//! share containers, networks or volumes.

use std::fmt;
use uuid::Uuid;

/// Number of hex characters taken from a fresh v4 UUID
const TOKEN_LEN: usize = 6;

/// Opaque identity scoping one bring-up/tear-down pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    project: String,
}

impl Identity {
    /// Generate a fresh identity for one run of `scenario`
    pub fn generate(prefix: &str, scenario: &str) -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self {
            project: format!(
                "{}_{}_{}",
                sanitize(prefix),
                sanitize(scenario),
                &token[..TOKEN_LEN]
            ),
        }
    }

    /// Compose project name
    pub fn project(&self) -> &str {
        &self.project
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.project)
    }
}

/// Compose project names allow only lowercase alphanumerics, `_` and `-`
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' | '-' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect()
}
