//! Main TunnelRelay coordination.
//!
//! TunnelRelay owns the challenge table, the session table, and the rate
//! limiters, and implements the three tunnel operations: issuing challenges,
//! opening sessions, and pushing to / pulling from a session.

use crate::accounts::{AccountDirectory, Accounts};
use crate::auth::AuthService;
use crate::config::Config;
use crate::error::{Result, TargetError, TunnelError, TunnelResult};
use crate::limits::RateLimits;
use crate::session::{Response, Session};
use burrow_types::{Challenge, SessionId};
use dashmap::DashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total challenges issued.
    pub challenges_issued: AtomicU64,
    /// Total sessions opened.
    pub sessions_opened: AtomicU64,
    /// Total handshakes rejected for a bad or missing proof.
    pub auth_failures: AtomicU64,
    /// Total dials that failed.
    pub dial_failures: AtomicU64,
    /// Total push requests handled successfully.
    pub pushes_total: AtomicU64,
    /// Total pull requests that returned a response.
    pub pulls_total: AtomicU64,
    /// Total bytes queued for remote sockets.
    pub bytes_to_remote: AtomicU64,
    /// Total bytes handed to pull callers.
    pub bytes_from_remote: AtomicU64,
    /// Total rate limit rejections (account + global).
    pub rate_limit_hits: AtomicU64,
}

/// Main relay server.
pub struct TunnelRelay {
    config: Config,
    auth: AuthService,
    /// Rate limiters for handshakes and tunnel traffic.
    rate_limits: RateLimits,
    /// Operational metrics (counters).
    metrics: RelayMetrics,
    /// Live sessions by id.
    sessions: DashMap<SessionId, Arc<Session>>,
}

impl std::fmt::Debug for TunnelRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelRelay")
            .field("config", &self.config)
            .field("auth", &self.auth)
            .field("rate_limits", &self.rate_limits)
            .field("metrics", &self.metrics)
            .field("sessions_count", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl TunnelRelay {
    /// Create a new TunnelRelay with the given config and account directory.
    pub fn new(config: Config, accounts: Arc<dyn AccountDirectory>) -> Self {
        let rate_limits = RateLimits::new(&config.limits);
        let auth = AuthService::new(accounts, config.auth.challenge_ttl());
        Self {
            config,
            auth,
            rate_limits,
            metrics: RelayMetrics::default(),
            sessions: DashMap::new(),
        }
    }

    /// Create a TunnelRelay whose accounts come from `config.server.accounts_file`.
    pub fn from_config(config: Config) -> Result<Self> {
        let accounts = Accounts::load(&config.server.accounts_file)?;
        if accounts.is_empty() {
            tracing::warn!("Account file is empty; every handshake will be refused");
        }
        tracing::info!("Loaded {} accounts", accounts.len());
        Ok(Self::new(config, Arc::new(accounts)))
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get access to the authentication service.
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// Get access to the rate limiters.
    pub fn rate_limits(&self) -> &RateLimits {
        &self.rate_limits
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Issue a new challenge for `account`.
    pub fn issue_challenge(&self, account: &str) -> TunnelResult<Challenge> {
        self.check_global()?;
        // Unknown names are rejected before they can occupy a limiter slot.
        self.auth.account(account)?;
        self.check_account(account)?;

        let challenge = self.auth.issue_challenge(account)?;
        self.metrics.challenges_issued.fetch_add(1, Ordering::Relaxed);
        Ok(challenge)
    }

    /// Verify `proof`, dial `host:port`, and register a new session.
    ///
    /// Returns as soon as the session is registered; relaying starts in the
    /// background.
    pub async fn open_session(
        &self,
        account: &str,
        host: &str,
        port: i64,
        proof: &[u8],
    ) -> TunnelResult<SessionId> {
        self.check_global()?;

        if host.is_empty() {
            return Err(TargetError::EmptyHost.into());
        }
        let port = u16::try_from(port).map_err(|_| TargetError::BadPort)?;

        if account.is_empty() {
            return Err(TunnelError::UnknownAccount(String::new()));
        }
        self.auth.account(account)?;
        self.check_account(account)?;

        match self.auth.verify_proof(account, proof) {
            Ok(true) => {}
            Ok(false) | Err(TunnelError::NoChallengeIssued(_)) => {
                tracing::warn!("Rejected proof for account {:?}", account);
                self.metrics.auth_failures.fetch_add(1, Ordering::Relaxed);
                return Err(TunnelError::AuthenticationFailed(account.to_string()));
            }
            Err(e) => return Err(e),
        }

        tracing::info!("Connecting to {}:{} for {:?}", host, port, account);
        let stream = match self.dial(host, port).await {
            Ok(stream) => stream,
            Err(source) => {
                tracing::warn!("Could not connect to {}:{}: {}", host, port, source);
                self.metrics.dial_failures.fetch_add(1, Ordering::Relaxed);
                return Err(TunnelError::DialFailed {
                    host: host.to_string(),
                    port,
                    source,
                });
            }
        };

        let id = SessionId::new();
        let session = Session::start(
            id,
            account,
            format!("{host}:{port}"),
            stream,
            self.config.session.queue_capacity,
            self.config.session.read_buffer_size,
        );
        self.sessions.insert(id, session);
        self.metrics.sessions_opened.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            "Registered session {} (total: {})",
            id,
            self.sessions.len()
        );
        Ok(id)
    }

    /// Queue `payload` for the session's remote socket.
    pub async fn push(&self, id: &str, payload: Vec<u8>) -> TunnelResult<()> {
        self.check_global()?;
        let session = self.session(id)?;
        let len = payload.len() as u64;

        session.push(payload).await?;

        self.metrics.pushes_total.fetch_add(1, Ordering::Relaxed);
        self.metrics.bytes_to_remote.fetch_add(len, Ordering::Relaxed);
        Ok(())
    }

    /// Wait for the session's next response.
    ///
    /// `Ok(None)` only when a pull timeout is configured and expired.
    pub async fn pull(&self, id: &str) -> TunnelResult<Option<Response>> {
        self.check_global()?;
        let session = self.session(id)?;

        let response = session.pull(self.config.session.pull_timeout()).await?;

        if let Some(response) = &response {
            self.metrics.pulls_total.fetch_add(1, Ordering::Relaxed);
            if let Response::Data(bytes) = response {
                self.metrics
                    .bytes_from_remote
                    .fetch_add(bytes.len() as u64, Ordering::Relaxed);
            }
        }
        Ok(response)
    }

    /// Look up a session by its wire id.
    pub fn session(&self, id: &str) -> TunnelResult<Arc<Session>> {
        id.parse::<SessionId>()
            .ok()
            .and_then(|id| self.sessions.get(&id).map(|entry| entry.value().clone()))
            .ok_or_else(|| TunnelError::NoSuchSession(id.to_string()))
    }

    /// Forget sessions that closed more than `ttl` ago.
    ///
    /// Returns the number of sessions removed.
    pub fn reap_closed_sessions(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|id, session| match session.closed_at() {
            Some(closed_at) if now.saturating_duration_since(closed_at) >= ttl => {
                tracing::debug!("Reaping session {} ({})", id, session.remote());
                false
            }
            _ => true,
        });
        before.saturating_sub(self.sessions.len())
    }

    /// Get total registered sessions, open or closed.
    pub fn total_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Get sessions whose remote socket is still open.
    pub fn open_sessions(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| !entry.value().is_closed())
            .count()
    }

    async fn dial(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        match self.config.session.dial_timeout() {
            Some(limit) => tokio::time::timeout(limit, TcpStream::connect((host, port)))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))?,
            None => TcpStream::connect((host, port)).await,
        }
    }

    fn check_global(&self) -> TunnelResult<()> {
        self.rate_limits.check_global().map_err(|e| {
            tracing::warn!("Global rate limit exceeded: {}", e);
            self.rate_limited(e)
        })
    }

    fn check_account(&self, account: &str) -> TunnelResult<()> {
        self.rate_limits.check_account(account).map_err(|e| {
            tracing::warn!("Handshake rate limited for {:?}: {}", account, e);
            self.rate_limited(e)
        })
    }

    fn rate_limited(&self, e: crate::limits::RateLimitError) -> TunnelError {
        self.metrics.rate_limit_hits.fetch_add(1, Ordering::Relaxed);
        TunnelError::RateLimited {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{Account, Accounts};
    use burrow_types::compute_proof;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_relay() -> TunnelRelay {
        let accounts = Accounts::from_accounts([Account::new("alice", "s")]).unwrap();
        TunnelRelay::new(Config::default(), Arc::new(accounts))
    }

    /// Echo server on loopback; returns its port.
    async fn echo_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    loop {
                        match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => {
                                if stream.write_all(&buf[..n]).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                });
            }
        });
        port
    }

    fn proof_for(relay: &TunnelRelay, account: &str, secret: &[u8]) -> Vec<u8> {
        let challenge = relay.issue_challenge(account).unwrap();
        compute_proof(secret, &challenge).to_vec()
    }

    #[tokio::test]
    async fn open_session_with_valid_proof() {
        let relay = test_relay();
        let port = echo_server().await;
        let proof = proof_for(&relay, "alice", b"s");

        let id = relay
            .open_session("alice", "127.0.0.1", port.into(), &proof)
            .await
            .unwrap();

        let session = relay.session(&id.to_string()).unwrap();
        assert_eq!(session.account(), "alice");
        assert_eq!(session.remote(), format!("127.0.0.1:{port}"));
        assert_eq!(relay.total_sessions(), 1);
        assert_eq!(relay.metrics().sessions_opened.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn wrong_proof_is_rejected() {
        let relay = test_relay();
        let port = echo_server().await;
        let proof = proof_for(&relay, "alice", b"wrong");

        let err = relay
            .open_session("alice", "127.0.0.1", port.into(), &proof)
            .await
            .unwrap_err();
        assert!(matches!(err, TunnelError::AuthenticationFailed(_)));
        assert_eq!(relay.total_sessions(), 0);
        assert_eq!(relay.metrics().auth_failures.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn missing_challenge_is_authentication_failure() {
        let relay = test_relay();
        let err = relay
            .open_session("alice", "127.0.0.1", 1, &[0u8; 32])
            .await
            .unwrap_err();
        assert!(matches!(err, TunnelError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn stale_challenge_proof_is_rejected() {
        let relay = test_relay();
        let port = echo_server().await;
        let old_proof = proof_for(&relay, "alice", b"s");
        relay.issue_challenge("alice").unwrap();

        let err = relay
            .open_session("alice", "127.0.0.1", port.into(), &old_proof)
            .await
            .unwrap_err();
        assert!(matches!(err, TunnelError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn invalid_targets_rejected_before_auth() {
        let relay = test_relay();

        for port in [-1i64, 65536, i64::MAX] {
            let err = relay
                .open_session("alice", "127.0.0.1", port, &[])
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                TunnelError::InvalidTarget(TargetError::BadPort)
            ));
        }

        let err = relay.open_session("alice", "", 80, &[]).await.unwrap_err();
        assert!(matches!(
            err,
            TunnelError::InvalidTarget(TargetError::EmptyHost)
        ));
        assert_eq!(relay.metrics().dial_failures.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn unknown_or_empty_account_rejected() {
        let relay = test_relay();
        for name in ["", "mallory"] {
            let err = relay
                .open_session(name, "127.0.0.1", 80, &[])
                .await
                .unwrap_err();
            assert!(matches!(err, TunnelError::UnknownAccount(_)));
        }
    }

    #[tokio::test]
    async fn dial_failure_is_reported() {
        let relay = test_relay();
        // Bind then drop to get a port with nothing listening.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let proof = proof_for(&relay, "alice", b"s");

        let err = relay
            .open_session("alice", "127.0.0.1", port.into(), &proof)
            .await
            .unwrap_err();
        assert!(matches!(err, TunnelError::DialFailed { port: p, .. } if p == port));
        assert_eq!(relay.total_sessions(), 0);
    }

    #[tokio::test]
    async fn push_then_pull_is_fifo() {
        let relay = test_relay();
        let port = echo_server().await;
        let proof = proof_for(&relay, "alice", b"s");
        let id = relay
            .open_session("alice", "127.0.0.1", port.into(), &proof)
            .await
            .unwrap()
            .to_string();

        let payloads: Vec<Vec<u8>> = (0..5).map(|i| format!("msg-{i};").into_bytes()).collect();
        for payload in &payloads {
            relay.push(&id, payload.clone()).await.unwrap();
        }

        let expected: Vec<u8> = payloads.concat();
        let mut received = Vec::new();
        while received.len() < expected.len() {
            match relay.pull(&id).await.unwrap() {
                Some(Response::Data(bytes)) => received.extend(bytes),
                other => panic!("unexpected: {:?}", other),
            }
        }
        assert_eq!(received, expected);
        assert_eq!(
            relay.metrics().bytes_to_remote.load(Ordering::Relaxed),
            expected.len() as u64
        );
    }

    #[tokio::test]
    async fn unknown_session_fails_fast() {
        let relay = test_relay();
        let missing = SessionId::new().to_string();

        assert!(matches!(
            relay.push(&missing, b"x".to_vec()).await,
            Err(TunnelError::NoSuchSession(_))
        ));
        assert!(matches!(
            relay.pull(&missing).await,
            Err(TunnelError::NoSuchSession(_))
        ));
        assert!(matches!(
            relay.pull("not-a-uuid").await,
            Err(TunnelError::NoSuchSession(_))
        ));
    }

    #[tokio::test]
    async fn closed_sessions_are_reaped() {
        let relay = test_relay();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let proof = proof_for(&relay, "alice", b"s");

        let id = relay
            .open_session("alice", "127.0.0.1", port.into(), &proof)
            .await
            .unwrap()
            .to_string();
        let (remote, _) = listener.accept().await.unwrap();
        drop(remote);

        loop {
            if let Some(Response::Quit(_)) = relay.pull(&id).await.unwrap() {
                break;
            }
        }
        assert_eq!(relay.open_sessions(), 0);
        assert_eq!(relay.reap_closed_sessions(Duration::from_secs(3600)), 0);
        assert_eq!(relay.reap_closed_sessions(Duration::ZERO), 1);
        assert!(matches!(
            relay.pull(&id).await,
            Err(TunnelError::NoSuchSession(_))
        ));
    }

    #[test]
    fn from_config_loads_account_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"alice:s\nbob:t\n").unwrap();
        let mut config = Config::default();
        config.server.accounts_file = file.path().to_path_buf();

        let relay = TunnelRelay::from_config(config).unwrap();
        assert!(relay.auth().account("bob").is_ok());
    }

    #[test]
    fn from_config_missing_account_file() {
        let mut config = Config::default();
        config.server.accounts_file = "/nonexistent/burrow/accounts".into();

        let err = TunnelRelay::from_config(config).unwrap_err();
        assert!(matches!(err, crate::error::RelayError::Accounts(_)));
    }

    #[tokio::test]
    async fn handshake_rate_limited_per_account() {
        let mut config = Config::default();
        config.limits.auth_per_minute = 2;
        let accounts = Accounts::from_accounts([Account::new("alice", "s")]).unwrap();
        let relay = TunnelRelay::new(config, Arc::new(accounts));

        relay.issue_challenge("alice").unwrap();
        relay.issue_challenge("alice").unwrap();
        assert!(matches!(
            relay.issue_challenge("alice"),
            Err(TunnelError::RateLimited { .. })
        ));
        assert_eq!(relay.metrics().rate_limit_hits.load(Ordering::Relaxed), 1);
    }
}
