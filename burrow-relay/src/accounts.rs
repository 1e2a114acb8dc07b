//! Account directory for burrow-relay.
//!
//! Accounts are loaded once at startup from a plain text file:
//!
//! ```text
//! # comment
//! alice:correct horse battery staple
//! bob:hunter2
//! ```
//!
//! Everything after the first `:` is the secret, so secrets may contain colons.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use burrow_types::{verify_proof, Challenge};

/// A named identity and the secret its proofs are checked against.
#[derive(Clone)]
pub struct Account {
    name: String,
    secret: Vec<u8>,
}

impl Account {
    /// Create an account.
    pub fn new(name: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
        }
    }

    /// The account name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `proof` was derived from `challenge` with this account's secret.
    pub fn verify(&self, challenge: &Challenge, proof: &[u8]) -> bool {
        verify_proof(&self.secret, challenge, proof)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Lookup of accounts by name.
pub trait AccountDirectory: Send + Sync {
    /// Find an account by name.
    fn lookup(&self, name: &str) -> Option<Account>;

    /// Number of known accounts.
    fn len(&self) -> usize;

    /// Whether the directory is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory account directory, usually loaded from an account file.
#[derive(Debug, Clone, Default)]
pub struct Accounts {
    by_name: HashMap<String, Account>,
}

impl Accounts {
    /// Build a directory from a list of accounts.
    ///
    /// # Errors
    ///
    /// Returns [`AccountsError::Duplicate`] if a name appears twice.
    pub fn from_accounts(
        accounts: impl IntoIterator<Item = Account>,
    ) -> Result<Self, AccountsError> {
        let mut by_name = HashMap::new();
        for (idx, account) in accounts.into_iter().enumerate() {
            if by_name.contains_key(&account.name) {
                return Err(AccountsError::Duplicate {
                    name: account.name,
                    entry: idx + 1,
                });
            }
            by_name.insert(account.name.clone(), account);
        }
        Ok(Self { by_name })
    }

    /// Parse account file content.
    pub fn parse(content: &str) -> Result<Self, AccountsError> {
        let mut by_name = HashMap::new();

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (name, secret) = line
                .split_once(':')
                .ok_or(AccountsError::Malformed { line: line_no })?;
            let name = name.trim();
            if name.is_empty() || secret.is_empty() {
                return Err(AccountsError::Malformed { line: line_no });
            }

            if by_name.contains_key(name) {
                return Err(AccountsError::Duplicate {
                    name: name.to_string(),
                    entry: line_no,
                });
            }
            by_name.insert(name.to_string(), Account::new(name, secret.as_bytes()));
        }

        Ok(Self { by_name })
    }

    /// Load an account file from disk.
    pub fn load(path: &Path) -> Result<Self, AccountsError> {
        let content = std::fs::read_to_string(path).map_err(|e| AccountsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }
}

impl AccountDirectory for Accounts {
    fn lookup(&self, name: &str) -> Option<Account> {
        self.by_name.get(name).cloned()
    }

    fn len(&self) -> usize {
        self.by_name.len()
    }
}

/// Account file errors.
#[derive(Debug, thiserror::Error)]
pub enum AccountsError {
    /// Failed to read the account file.
    #[error("failed to read account file {}: {source}", path.display())]
    Read {
        /// Path to the account file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// A line is not `name:secret`.
    #[error("line {line}: expected name:secret")]
    Malformed {
        /// 1-based line number.
        line: usize,
    },
    /// An account name appears more than once.
    #[error("duplicate account {name:?} at entry {entry}")]
    Duplicate {
        /// The repeated name.
        name: String,
        /// 1-based line (or list position) of the repeat.
        entry: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_types::compute_proof;
    use std::io::Write;

    #[test]
    fn parses_names_and_secrets() {
        let accounts = Accounts::parse(
            "# relay users\n\nalice:s\nbob: has:colons \n",
        )
        .unwrap();

        assert_eq!(accounts.len(), 2);
        assert!(accounts.lookup("alice").is_some());
        assert!(accounts.lookup("carol").is_none());

        let challenge = Challenge::from_bytes(&[5u8; 16]).unwrap();
        let bob = accounts.lookup("bob").unwrap();
        // Secret is taken verbatim after the first colon, line trimmed.
        assert!(bob.verify(&challenge, &compute_proof(b" has:colons", &challenge)));
    }

    #[test]
    fn rejects_lines_without_separator() {
        let err = Accounts::parse("alice:s\nbob\n").unwrap_err();
        assert!(matches!(err, AccountsError::Malformed { line: 2 }));
    }

    #[test]
    fn rejects_empty_name_or_secret() {
        assert!(Accounts::parse(":secret").is_err());
        assert!(Accounts::parse("alice:").is_err());
    }

    #[test]
    fn rejects_duplicates() {
        let err = Accounts::parse("alice:a\nalice:b\n").unwrap_err();
        assert!(matches!(
            err,
            AccountsError::Duplicate { entry: 2, .. }
        ));

        let err = Accounts::from_accounts([Account::new("a", "x"), Account::new("a", "y")])
            .unwrap_err();
        assert!(matches!(err, AccountsError::Duplicate { entry: 2, .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alice:s").unwrap();

        let accounts = Accounts::load(file.path()).unwrap();
        assert_eq!(accounts.lookup("alice").unwrap().name(), "alice");
    }

    #[test]
    fn debug_redacts_secret() {
        let account = Account::new("alice", "topsecret");
        let rendered = format!("{:?}", account);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("topsecret"));
    }
}
