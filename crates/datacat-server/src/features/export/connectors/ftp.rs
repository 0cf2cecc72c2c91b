//! FTP file-drop connector
//!
//! Connects in passive mode, lists the directory for diagnostics, downloads
//! one file into memory and decodes it by suffix. suppaftp's client is
//! blocking, so the whole session runs on the blocking pool.
//!
//! The session is owned by a [`SessionGuard`] from login onwards: it is
//! quit exactly once, whether the transfer succeeds or fails. When the
//! export deadline passes, the session's sockets are shut down through its
//! [`SessionAbort`] handle and `fetch` waits for the guard to release the
//! session before returning.

use crate::features::export::params::AccessParams;
use crate::features::export::resolver::ConfigurationError;
use datacat_common::rows::RowSet;
use datacat_common::{source, CommonError};
use std::fmt;
use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use suppaftp::types::FileType;
use suppaftp::{FtpStream, Mode};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How long an aborted session may take to release after the deadline
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

const CHUNK_SIZE: usize = 64 * 1024;

pub const REQUIRED_FIELDS: &[&str] = &[
    "ftp_protocol",
    "ftp_host",
    "ftp_filename",
    "ftp_username",
    "ftp_password",
    "ftp_path",
];

/// Stored protocol value, which only picks the default port
///
/// Sessions are always plain FTP. Any secure variant maps to port 22.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpProtocol {
    Ftp,
    Sftp,
    Ftps,
}

impl FtpProtocol {
    pub fn default_port(self) -> u16 {
        match self {
            FtpProtocol::Ftp => 21,
            FtpProtocol::Sftp | FtpProtocol::Ftps => 22,
        }
    }
}

impl std::str::FromStr for FtpProtocol {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ftp" => Ok(FtpProtocol::Ftp),
            "sftp" => Ok(FtpProtocol::Sftp),
            "ftps" => Ok(FtpProtocol::Ftps),
            other => Err(ConfigurationError::new(format!("Unsupported ftp_protocol: {}", other))),
        }
    }
}

/// FTP source of one dataset
#[derive(Clone, PartialEq, Eq)]
pub struct FtpConfig {
    pub protocol: FtpProtocol,
    pub host: String,
    pub port: u16,
    pub filename: String,
    pub username: String,
    pub password: String,
    pub path: String,
}

impl FtpConfig {
    pub fn from_params(params: &AccessParams) -> Result<Self, ConfigurationError> {
        let missing = params.missing(REQUIRED_FIELDS);
        if !missing.is_empty() {
            return Err(ConfigurationError::missing("FTP", &missing));
        }

        let field = |name: &str| params.get_non_empty(name).unwrap_or_default().trim().to_string();

        let protocol: FtpProtocol = field("ftp_protocol").parse()?;
        let (host, port) = split_host_port(&field("ftp_host"), protocol.default_port())?;

        Ok(Self {
            protocol,
            host,
            port,
            filename: field("ftp_filename"),
            username: field("ftp_username"),
            // Passwords may legitimately start or end with spaces
            password: params.get("ftp_password").unwrap_or_default().to_string(),
            path: field("ftp_path"),
        })
    }

    /// Full path of the file to download
    pub fn remote_path(&self) -> String {
        format!("{}/{}", self.path.trim_end_matches('/'), self.filename)
    }
}

impl fmt::Debug for FtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpConfig")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("filename", &self.filename)
            .field("username", &self.username)
            .field("password", &"********")
            .field("path", &self.path)
            .finish()
    }
}

/// Split `host:port`, falling back to the protocol's port
fn split_host_port(raw: &str, default_port: u16) -> Result<(String, u16), ConfigurationError> {
    match raw.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && !host.contains(':') => {
            let port = port
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| ConfigurationError::new(format!("Invalid port in ftp_host: {}", raw)))?;
            Ok((host.to_string(), port))
        },
        _ => Ok((raw.to_string(), default_port)),
    }
}

/// FTP fetch errors
#[derive(Error, Debug)]
pub enum FtpError {
    #[error("FTP connection failed: {0}")]
    Connection(String),

    #[error("FTP transfer failed: {0}")]
    Transfer(String),

    #[error("{0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse downloaded file: {0}")]
    Parse(CommonError),

    #[error("FTP export deadline exceeded")]
    DeadlineExceeded,

    #[error("FTP task failed: {0}")]
    Task(String),
}

impl From<CommonError> for FtpError {
    fn from(err: CommonError) -> Self {
        if err.is_unsupported_format() {
            FtpError::UnsupportedFormat(err.to_string())
        } else {
            FtpError::Parse(err)
        }
    }
}

/// A logged-in FTP session
pub trait FtpSession: Send {
    /// Raw `LIST` lines of a directory
    fn list(&mut self, path: &str) -> Result<Vec<String>, FtpError>;

    /// Download a file into memory
    fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, FtpError>;

    /// End the session
    fn quit(self: Box<Self>) -> Result<(), FtpError>;

    /// Handle that cuts the session short from another thread
    fn abort_handle(&self) -> Option<Arc<dyn SessionAbort>> {
        None
    }
}

/// Ends a session from outside the thread driving it
pub trait SessionAbort: Send + Sync {
    /// Unblock pending I/O; later operations on the session fail
    fn abort(&self);
}

/// Opens logged-in sessions
pub trait FtpDialer: Send + Sync {
    fn open(&self, config: &FtpConfig, timeout: Duration) -> Result<Box<dyn FtpSession>, FtpError>;
}

/// Quits the wrapped session exactly once, on `close` or on drop
pub struct SessionGuard {
    session: Option<Box<dyn FtpSession>>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn FtpSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn with_session<T>(
        &mut self,
        f: impl FnOnce(&mut dyn FtpSession) -> Result<T, FtpError>,
    ) -> Result<T, FtpError> {
        match self.session.as_deref_mut() {
            Some(session) => f(session),
            None => Err(FtpError::Connection("session already closed".to_string())),
        }
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(session) = self.session.take() {
            match session.quit() {
                Ok(()) => debug!("FTP session closed"),
                Err(e) => warn!("Failed to quit FTP session gracefully: {}", e),
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Hand-off between the blocking session and the deadline watcher
#[derive(Default)]
struct AbortSlot {
    state: Mutex<SlotState>,
}

#[derive(Default)]
struct SlotState {
    handle: Option<Arc<dyn SessionAbort>>,
    fired: bool,
}

impl AbortSlot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the open session; `false` once the deadline has passed
    fn register(&self, handle: Option<Arc<dyn SessionAbort>>) -> bool {
        let mut state = self.lock();
        if state.fired {
            return false;
        }
        state.handle = handle;
        true
    }

    fn fired(&self) -> bool {
        self.lock().fired
    }

    fn fire(&self) {
        let handle = {
            let mut state = self.lock();
            state.fired = true;
            state.handle.take()
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

/// Shuts down every socket of a suppaftp session
#[derive(Default)]
struct SocketAbort {
    aborted: AtomicBool,
    sockets: Mutex<Vec<TcpStream>>,
}

impl SocketAbort {
    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    fn track(&self, socket: &TcpStream) {
        let clone = match socket.try_clone() {
            Ok(clone) => clone,
            Err(e) => {
                warn!("Cannot track FTP socket for deadline abort: {}", e);
                return;
            },
        };

        let mut sockets = self.sockets.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_aborted() {
            shutdown_socket(&clone);
        }
        sockets.push(clone);
    }
}

impl SessionAbort for SocketAbort {
    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        let sockets = self.sockets.lock().unwrap_or_else(PoisonError::into_inner);
        for socket in sockets.iter() {
            shutdown_socket(socket);
        }
    }
}

fn shutdown_socket(socket: &TcpStream) {
    if let Err(e) = socket.shutdown(Shutdown::Both) {
        debug!("FTP socket shutdown: {}", e);
    }
}

/// Dialer backed by suppaftp's blocking client
#[derive(Debug, Clone, Copy, Default)]
pub struct SuppaFtpDialer;

impl FtpDialer for SuppaFtpDialer {
    fn open(&self, config: &FtpConfig, timeout: Duration) -> Result<Box<dyn FtpSession>, FtpError> {
        let deadline = std::time::Instant::now() + timeout;
        let addr = resolve_addr(&config.host, config.port)?;
        debug!("Connecting to FTP server: {}:{}", config.host, config.port);

        let mut stream = FtpStream::connect_timeout(addr, timeout).map_err(|e| {
            FtpError::Connection(format!("{}:{}: {}", config.host, config.port, e))
        })?;

        let abort = Arc::new(SocketAbort::default());
        let socket = stream.get_ref();
        abort.track(socket);
        if let Err(e) = socket
            .set_read_timeout(Some(timeout))
            .and_then(|_| socket.set_write_timeout(Some(timeout)))
        {
            warn!("Failed to set FTP socket timeouts: {}", e);
        }

        stream.set_mode(Mode::Passive);

        debug!("Logging in as: {}", config.username);
        if let Err(e) = stream.login(config.username.as_str(), config.password.as_str()) {
            if let Err(quit_err) = stream.quit() {
                warn!("Failed to quit FTP session after login failure: {}", quit_err);
            }
            return Err(FtpError::Connection(format!("login failed: {}", e)));
        }

        let mut session = SuppaSession {
            stream,
            abort,
            deadline,
        };
        if let Err(e) = session.stream.transfer_type(FileType::Binary) {
            if let Err(quit_err) = Box::new(session).quit() {
                warn!("Failed to quit FTP session after setup failure: {}", quit_err);
            }
            return Err(FtpError::Connection(format!("failed to set binary mode: {}", e)));
        }

        Ok(Box::new(session))
    }
}

fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr, FtpError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| FtpError::Connection(format!("cannot resolve {}: {}", host, e)))?
        .next()
        .ok_or_else(|| FtpError::Connection(format!("no address for {}", host)))
}

struct SuppaSession {
    stream: FtpStream,
    abort: Arc<SocketAbort>,
    deadline: std::time::Instant,
}

impl SuppaSession {
    fn ensure_live(&self, path: &str) -> Result<(), FtpError> {
        if self.abort.is_aborted() || std::time::Instant::now() >= self.deadline {
            warn!(path = %path, "FTP transfer stopped at export deadline");
            return Err(FtpError::DeadlineExceeded);
        }
        Ok(())
    }
}

impl FtpSession for SuppaSession {
    fn list(&mut self, path: &str) -> Result<Vec<String>, FtpError> {
        self.ensure_live(path)?;
        self.stream
            .list(Some(path))
            .map_err(|e| FtpError::Transfer(format!("failed to list {}: {}", path, e)))
    }

    fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, FtpError> {
        self.ensure_live(path)?;
        let mut reader = self
            .stream
            .retr_as_stream(path)
            .map_err(|e| FtpError::Transfer(format!("failed to download {}: {}", path, e)))?;
        self.abort.track(reader.get_ref());

        let mut data = Vec::new();
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            self.ensure_live(path)?;
            let remaining = self
                .deadline
                .saturating_duration_since(std::time::Instant::now())
                .max(Duration::from_millis(1));
            if let Err(e) = reader.get_ref().set_read_timeout(Some(remaining)) {
                warn!("Failed to set FTP data timeout: {}", e);
            }

            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => data.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(FtpError::Transfer(format!("failed to read {}: {}", path, e)));
                },
            }
        }

        self.stream
            .finalize_retr_stream(reader)
            .map_err(|e| FtpError::Transfer(format!("failed to finish {}: {}", path, e)))?;
        Ok(data)
    }

    fn quit(mut self: Box<Self>) -> Result<(), FtpError> {
        // Shut down sockets cannot carry QUIT; dropping the stream closes them
        if self.abort.is_aborted() {
            return Ok(());
        }
        self.stream
            .quit()
            .map_err(|e| FtpError::Connection(format!("quit failed: {}", e)))
    }

    fn abort_handle(&self) -> Option<Arc<dyn SessionAbort>> {
        let handle: Arc<dyn SessionAbort> = self.abort.clone();
        Some(handle)
    }
}

/// Downloads and decodes a dataset's file
#[derive(Clone)]
pub struct FtpConnector {
    dialer: Arc<dyn FtpDialer>,
}

impl FtpConnector {
    pub fn new(dialer: Arc<dyn FtpDialer>) -> Self {
        Self { dialer }
    }

    pub async fn fetch(&self, config: &FtpConfig, deadline: Instant) -> Result<RowSet, FtpError> {
        let timeout = deadline.saturating_duration_since(Instant::now());
        if timeout.is_zero() {
            return Err(FtpError::DeadlineExceeded);
        }

        let slot = Arc::new(AbortSlot::default());
        let task_slot = slot.clone();
        let dialer = self.dialer.clone();
        let owned = config.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            fetch_blocking(dialer.as_ref(), &owned, timeout, &task_slot)
        });

        match tokio::time::timeout_at(deadline, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(FtpError::Task(e.to_string())),
            Err(_) => {
                warn!(host = %config.host, "FTP export deadline exceeded, aborting session");
                slot.fire();
                match tokio::time::timeout(CLOSE_TIMEOUT, task).await {
                    Ok(_) => debug!("FTP session released after deadline"),
                    Err(_) => warn!("FTP session still busy {:?} after deadline abort", CLOSE_TIMEOUT),
                }
                Err(FtpError::DeadlineExceeded)
            },
        }
    }
}

impl Default for FtpConnector {
    fn default() -> Self {
        Self::new(Arc::new(SuppaFtpDialer))
    }
}

fn fetch_blocking(
    dialer: &dyn FtpDialer,
    config: &FtpConfig,
    timeout: Duration,
    slot: &AbortSlot,
) -> Result<RowSet, FtpError> {
    let remote_path = config.remote_path();
    let session = dialer.open(config, timeout)?;
    let registered = slot.register(session.abort_handle());
    let mut guard = SessionGuard::new(session);
    if !registered {
        guard.close();
        return Err(FtpError::DeadlineExceeded);
    }

    let downloaded = guard.with_session(|session| {
        let entries = session.list(&config.path)?;
        debug!(path = %config.path, entries = entries.len(), "FTP directory listing");
        for entry in &entries {
            debug!("  {}", entry);
        }
        if slot.fired() {
            return Err(FtpError::DeadlineExceeded);
        }
        session.retrieve(&remote_path)
    });
    guard.close();

    let data = downloaded?;
    info!(host = %config.host, path = %remote_path, bytes = data.len(), "FTP download complete");

    Ok(source::decode(&config.filename, &data)?)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    /// In-memory FTP server keyed by full path
    #[derive(Clone, Default)]
    pub struct FakeFtp {
        pub files: HashMap<String, Vec<u8>>,
        pub fail_login: bool,
        pub fail_list: bool,
        /// Downloads take this long before any data arrives
        pub stall: Option<Duration>,
        /// Stalled downloads keep going after an abort
        pub ignore_abort: bool,
        pub closes: Arc<AtomicUsize>,
        pub aborts: Arc<AtomicUsize>,
    }

    impl FakeFtp {
        pub fn with_file(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
            self.files.insert(path.to_string(), data.into());
            self
        }

        pub fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }

        pub fn abort_count(&self) -> usize {
            self.aborts.load(Ordering::SeqCst)
        }
    }

    struct FakeSession {
        server: FakeFtp,
        aborted: Arc<AtomicBool>,
    }

    struct FakeAbort {
        aborted: Arc<AtomicBool>,
        aborts: Arc<AtomicUsize>,
    }

    impl SessionAbort for FakeAbort {
        fn abort(&self) {
            self.aborted.store(true, Ordering::SeqCst);
            self.aborts.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl FtpDialer for FakeFtp {
        fn open(
            &self,
            _config: &FtpConfig,
            _timeout: Duration,
        ) -> Result<Box<dyn FtpSession>, FtpError> {
            if self.fail_login {
                return Err(FtpError::Connection("login failed: 530".to_string()));
            }
            Ok(Box::new(FakeSession {
                server: self.clone(),
                aborted: Arc::default(),
            }))
        }
    }

    impl FtpSession for FakeSession {
        fn list(&mut self, path: &str) -> Result<Vec<String>, FtpError> {
            if self.server.fail_list {
                return Err(FtpError::Transfer(format!("failed to list {}", path)));
            }
            Ok(self.server.files.keys().cloned().collect())
        }

        fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, FtpError> {
            if let Some(stall) = self.server.stall {
                let started = std::time::Instant::now();
                while started.elapsed() < stall {
                    if !self.server.ignore_abort && self.aborted.load(Ordering::SeqCst) {
                        return Err(FtpError::Transfer("connection reset by peer".to_string()));
                    }
                    std::thread::sleep(Duration::from_millis(5));
                }
            }
            self.server
                .files
                .get(path)
                .cloned()
                .ok_or_else(|| FtpError::Transfer(format!("550 {}: not found", path)))
        }

        fn quit(self: Box<Self>) -> Result<(), FtpError> {
            self.server.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn abort_handle(&self) -> Option<Arc<dyn SessionAbort>> {
            Some(Arc::new(FakeAbort {
                aborted: self.aborted.clone(),
                aborts: self.server.aborts.clone(),
            }))
        }
    }
}
