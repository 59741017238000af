//! B-Route join sequence.
//!
//! Joining the meter's PAN is a fixed sequence of modem commands:
//!
//! 1. Register the credentials (`SKSETPWD`, `SKSETRBID`)
//! 2. Scan for the meter's PAN (`SKSCAN`), retrying with longer durations
//! 3. Register the channel and PAN ID (`SKSREG S2`, `SKSREG S3`)
//! 4. Resolve the meter's link-local address (`SKLL64`)
//! 5. Run PANA authentication (`SKJOIN`) and wait for its outcome event
//!
//! [`Joiner`] threads a single [`JoinState`] value through these steps. Only
//! the final state carries a [`Session`], so nothing can be sent to the
//! meter before PANA has succeeded.

use std::time::Duration;

use crate::commands::CommandHandler;
use crate::error::{Error, Result};
use crate::event::{EventCode, Notification};
use crate::protocol::{Command, Register};
use crate::transport::Transport;
use crate::types::{Credentials, Peer, ScanResult, Session};

/// Default timeout for synchronous commands.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for each line read during a scan.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for each line read while waiting for the PANA outcome.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout once the session is up.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Default number of scan attempts.
pub const DEFAULT_SCAN_ATTEMPTS: u8 = 5;

/// Scan duration exponent of the first attempt.
pub const INITIAL_SCAN_DURATION: u8 = 4;

/// Largest scan duration exponent.
pub const MAX_SCAN_DURATION: u8 = 7;

/// Join timing and retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinConfig {
    /// Timeout for command echo and status reads.
    pub command_timeout: Duration,
    /// Timeout for each read during a scan.
    pub scan_timeout: Duration,
    /// Timeout for each read while waiting for the PANA outcome.
    pub join_timeout: Duration,
    /// Timeout once connected, including the post-join read.
    pub request_timeout: Duration,
    /// Maximum number of scan attempts.
    pub scan_attempts: u8,
    /// Duration exponent of the first scan.
    pub initial_scan_duration: u8,
    /// Duration exponent cap.
    pub max_scan_duration: u8,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            scan_attempts: DEFAULT_SCAN_ATTEMPTS,
            initial_scan_duration: INITIAL_SCAN_DURATION,
            max_scan_duration: MAX_SCAN_DURATION,
        }
    }
}

impl JoinConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the command timeout.
    #[must_use]
    pub const fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the scan read timeout.
    #[must_use]
    pub const fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Sets the PANA event timeout.
    #[must_use]
    pub const fn join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the maximum number of scan attempts.
    #[must_use]
    pub const fn scan_attempts(mut self, attempts: u8) -> Self {
        self.scan_attempts = attempts;
        self
    }

    /// Sets the first and largest scan duration exponents.
    #[must_use]
    pub const fn scan_durations(mut self, initial: u8, max: u8) -> Self {
        self.initial_scan_duration = initial;
        self.max_scan_duration = max;
        self
    }

    /// Returns the scan durations to try, in order.
    #[must_use]
    pub fn schedule(&self) -> ScanSchedule {
        ScanSchedule::new(
            self.initial_scan_duration,
            self.max_scan_duration,
            self.scan_attempts,
        )
    }
}

/// Scan duration exponents for successive attempts.
///
/// Starts at the initial duration and grows by one per attempt up to the cap.
/// With the defaults this yields `4, 5, 6, 7, 7`.
#[derive(Debug, Clone)]
pub struct ScanSchedule {
    next: u8,
    max: u8,
    remaining: u8,
}

impl ScanSchedule {
    /// Creates a schedule of `attempts` durations.
    #[must_use]
    pub fn new(initial: u8, max: u8, attempts: u8) -> Self {
        Self {
            next: initial.min(max),
            max,
            remaining: attempts,
        }
    }
}

impl Iterator for ScanSchedule {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let duration = self.next;
        self.next = self.next.saturating_add(1).min(self.max);
        Some(duration)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::from(self.remaining);
        (remaining, Some(remaining))
    }
}

/// Steps of the join, as recorded in [`Joiner::history`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinPhase {
    /// Nothing sent yet.
    Idle,
    /// Password and authentication ID accepted.
    CredentialsSet,
    /// Active scan in progress.
    Scanning,
    /// A PAN was found.
    Scanned,
    /// Channel and PAN ID written to the modem.
    Registered,
    /// Meter's link-local address known.
    AddressResolved,
    /// PANA authentication in progress.
    Joining,
    /// PANA succeeded; requests may be sent.
    Connected,
    /// The join stopped on an error.
    Failed,
}

/// Data carried between join steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinState {
    /// Nothing sent yet.
    Idle,
    /// Credentials accepted by the modem.
    CredentialsSet,
    /// Scan found a PAN.
    Scanned(ScanResult),
    /// Channel and PAN ID registered.
    Registered(Peer),
    /// Link-local address resolved.
    AddressResolved { peer: Peer, ipv6: String },
    /// Joined.
    Connected(Session),
}

impl JoinState {
    /// Returns the phase this state corresponds to.
    #[must_use]
    pub const fn phase(&self) -> JoinPhase {
        match self {
            Self::Idle => JoinPhase::Idle,
            Self::CredentialsSet => JoinPhase::CredentialsSet,
            Self::Scanned(_) => JoinPhase::Scanned,
            Self::Registered(_) => JoinPhase::Registered,
            Self::AddressResolved { .. } => JoinPhase::AddressResolved,
            Self::Connected(_) => JoinPhase::Connected,
        }
    }
}

/// Drives the join sequence over a [`CommandHandler`].
///
/// Any rejected command or read timeout is fatal. Only the scan is retried.
#[derive(Debug, Clone)]
pub struct Joiner {
    config: JoinConfig,
    history: Vec<JoinPhase>,
}

impl Default for Joiner {
    fn default() -> Self {
        Self::new(JoinConfig::default())
    }
}

impl Joiner {
    /// Creates a joiner with the given configuration.
    #[must_use]
    pub fn new(config: JoinConfig) -> Self {
        Self {
            config,
            history: Vec::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &JoinConfig {
        &self.config
    }

    /// Sets the timeout used once connected, keeping the join history.
    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.config.request_timeout = timeout;
    }

    /// Returns every phase entered by the last run, in order.
    #[must_use]
    pub fn history(&self) -> &[JoinPhase] {
        &self.history
    }

    /// Returns the phase the last run ended in.
    #[must_use]
    pub fn phase(&self) -> JoinPhase {
        self.history.last().copied().unwrap_or(JoinPhase::Idle)
    }

    /// Runs the whole join and returns the joined session.
    ///
    /// The handler's timeout is set to the request timeout on success.
    pub async fn run<T: Transport>(
        &mut self,
        handler: &mut CommandHandler<T>,
        credentials: &Credentials,
    ) -> Result<Session> {
        self.history.clear();
        self.enter(JoinPhase::Idle);

        match self.drive(handler, credentials).await {
            Ok(session) => {
                handler.set_timeout(self.config.request_timeout);
                Ok(session)
            }
            Err(e) => {
                tracing::warn!("join failed in {:?}: {e}", self.phase());
                self.enter(JoinPhase::Failed);
                Err(e)
            }
        }
    }

    async fn drive<T: Transport>(
        &mut self,
        handler: &mut CommandHandler<T>,
        credentials: &Credentials,
    ) -> Result<Session> {
        credentials.validate()?;
        handler.set_timeout(self.config.command_timeout);

        let mut state = JoinState::Idle;
        loop {
            state = match state {
                JoinState::Connected(session) => return Ok(session),
                JoinState::Idle => Self::set_credentials(handler, credentials).await?,
                JoinState::CredentialsSet => {
                    self.enter(JoinPhase::Scanning);
                    JoinState::Scanned(self.scan(handler).await?)
                }
                JoinState::Scanned(scan) => Self::register(handler, &scan).await?,
                JoinState::Registered(peer) => Self::resolve(handler, peer).await?,
                JoinState::AddressResolved { peer, ipv6 } => {
                    self.enter(JoinPhase::Joining);
                    self.authenticate(handler, &ipv6).await?;
                    JoinState::Connected(Session::new(credentials.clone(), peer, ipv6))
                }
            };
            self.enter(state.phase());
        }
    }

    /// Registers the password and authentication ID.
    async fn set_credentials<T: Transport>(
        handler: &mut CommandHandler<T>,
        credentials: &Credentials,
    ) -> Result<JoinState> {
        handler
            .send_command(&Command::SetPassword(&credentials.password))
            .await?;
        handler
            .send_command(&Command::SetRouteBId(&credentials.id))
            .await?;
        Ok(JoinState::CredentialsSet)
    }

    /// Writes the scanned channel and PAN ID into the modem.
    async fn register<T: Transport>(
        handler: &mut CommandHandler<T>,
        scan: &ScanResult,
    ) -> Result<JoinState> {
        let peer = peer_from_scan(scan)?;
        handler
            .send_command(&Command::SetRegister {
                register: Register::Channel,
                value: &peer.channel,
            })
            .await?;
        handler
            .send_command(&Command::SetRegister {
                register: Register::PanId,
                value: &peer.pan_id,
            })
            .await?;
        Ok(JoinState::Registered(peer))
    }

    /// Resolves the meter's link-local address.
    async fn resolve<T: Transport>(
        handler: &mut CommandHandler<T>,
        peer: Peer,
    ) -> Result<JoinState> {
        let ipv6 = handler
            .query(&Command::LinkLocalAddress(&peer.mac))
            .await?;
        tracing::debug!("meter {} is at {ipv6}", peer.mac);
        Ok(JoinState::AddressResolved { peer, ipv6 })
    }

    /// Scans until a PAN with a channel is found.
    async fn scan<T: Transport>(&self, handler: &mut CommandHandler<T>) -> Result<ScanResult> {
        for (attempt, duration) in self.config.schedule().enumerate() {
            tracing::debug!("scan attempt {} with duration {duration}", attempt + 1);

            let command = Command::ActiveScan { duration };
            handler.write_command(&command).await?;

            let mut scan = ScanResult::new();
            loop {
                let line = handler.read_line_with(self.config.scan_timeout).await?;
                match Notification::parse(&line) {
                    Notification::ScanField { key, value } => scan.insert(key, value),
                    Notification::Event(event) if event.is(EventCode::ActiveScanDone) => break,
                    Notification::Fail(code) => {
                        return Err(Error::CommandRejected {
                            command: command.name(),
                            status: code,
                        });
                    }
                    _ => {}
                }
            }

            if scan.has_channel() {
                tracing::info!(
                    "found PAN {} on channel {}",
                    scan.pan_id().unwrap_or("?"),
                    scan.channel().unwrap_or("?")
                );
                return Ok(scan);
            }
            tracing::warn!("scan attempt {} found no meter", attempt + 1);
        }

        Err(Error::ScanExhausted {
            attempts: self.config.scan_attempts,
        })
    }

    /// Runs PANA authentication and waits for its outcome.
    async fn authenticate<T: Transport>(
        &self,
        handler: &mut CommandHandler<T>,
        ipv6: &str,
    ) -> Result<()> {
        handler.send_command(&Command::Join(ipv6)).await?;

        loop {
            let line = match handler.read_line_with(self.config.join_timeout).await {
                Ok(line) => line,
                Err(Error::Timeout { .. }) => return Err(Error::JoinTimeout),
                Err(e) => return Err(e),
            };

            let notification = Notification::parse(&line);
            if notification.event(EventCode::PanaFailed).is_some() {
                return Err(Error::JoinRejected);
            }
            if notification.event(EventCode::PanaConnected).is_some() {
                break;
            }
        }

        // The meter follows up with one more notification before it is ready
        let trailing = handler
            .read_line_with(self.config.request_timeout)
            .await?;
        tracing::debug!("discarding {trailing}");
        tracing::info!("PANA connected to {ipv6}");
        Ok(())
    }

    fn enter(&mut self, phase: JoinPhase) {
        tracing::debug!("join phase {phase:?}");
        self.history.push(phase);
    }
}

/// Extracts the values needed to register the PAN.
fn peer_from_scan(scan: &ScanResult) -> Result<Peer> {
    let channel = scan
        .channel()
        .ok_or(Error::ScanIncomplete { field: "Channel" })?;
    let pan_id = scan
        .pan_id()
        .ok_or(Error::ScanIncomplete { field: "Pan ID" })?;
    let mac = scan.addr().ok_or(Error::ScanIncomplete { field: "Addr" })?;

    Ok(Peer {
        channel: channel.to_owned(),
        pan_id: pan_id.to_owned(),
        mac: mac.to_owned(),
    })
}
