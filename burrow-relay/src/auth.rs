//! Challenge issuance and proof verification.
//!
//! Every `auth` request replaces the account's current challenge. A challenge
//! stays valid until replaced (or until it ages out, when a TTL is configured);
//! verification does not consume it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use burrow_types::Challenge;
use dashmap::DashMap;

use crate::accounts::{Account, AccountDirectory};
use crate::error::{TunnelError, TunnelResult};

#[derive(Debug, Clone, Copy)]
struct IssuedChallenge {
    challenge: Challenge,
    issued_at: Instant,
}

/// Issues challenges and checks proofs against them.
pub struct AuthService {
    accounts: Arc<dyn AccountDirectory>,
    challenges: DashMap<String, IssuedChallenge>,
    ttl: Option<Duration>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("accounts", &self.accounts.len())
            .field("challenges", &self.challenges.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl AuthService {
    /// Create a service over an account directory.
    pub fn new(accounts: Arc<dyn AccountDirectory>, ttl: Option<Duration>) -> Self {
        Self {
            accounts,
            challenges: DashMap::new(),
            ttl,
        }
    }

    /// Look up an account by name.
    pub fn account(&self, name: &str) -> TunnelResult<Account> {
        self.accounts
            .lookup(name)
            .ok_or_else(|| TunnelError::UnknownAccount(name.to_string()))
    }

    /// Issue a fresh challenge for `name`, replacing any previous one.
    pub fn issue_challenge(&self, name: &str) -> TunnelResult<Challenge> {
        let account = self.account(name)?;
        let challenge = Challenge::generate().map_err(|e| {
            tracing::error!("Challenge generation failed: {}", e);
            TunnelError::Internal(e.to_string())
        })?;

        self.challenges.insert(
            account.name().to_string(),
            IssuedChallenge {
                challenge,
                issued_at: Instant::now(),
            },
        );

        tracing::debug!("Issued challenge for account {:?}", name);
        Ok(challenge)
    }

    /// Check `proof` against the current challenge for `name`.
    ///
    /// Fails with `UnknownAccount` or `NoChallengeIssued`; otherwise returns
    /// whether the proof matches.
    pub fn verify_proof(&self, name: &str, proof: &[u8]) -> TunnelResult<bool> {
        let account = self.account(name)?;
        let issued = self
            .challenges
            .get(name)
            .map(|entry| *entry.value())
            .filter(|issued| !self.is_expired(issued, Instant::now()))
            .ok_or_else(|| TunnelError::NoChallengeIssued(name.to_string()))?;

        Ok(account.verify(&issued.challenge, proof))
    }

    /// Drop challenges older than the configured TTL.
    ///
    /// Returns the number removed. Without a TTL nothing is ever removed.
    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.challenges.len();
        self.challenges
            .retain(|_, issued| !self.is_expired(issued, now));
        before.saturating_sub(self.challenges.len())
    }

    /// Number of challenges on record.
    pub fn outstanding_challenges(&self) -> usize {
        self.challenges.len()
    }

    fn is_expired(&self, issued: &IssuedChallenge, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.saturating_duration_since(issued.issued_at) > ttl)
    }
}
