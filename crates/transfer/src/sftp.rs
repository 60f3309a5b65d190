//! SftpUploader - one authenticated SFTP session per upload attempt
//!
//! libssh2 is blocking, so each attempt runs on the blocking pool. The
//! session is owned by a guard that disconnects on every exit path.

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use contracts::{DestinationProfile, Identity, UploadError, Uploader};
use ssh2::{RenameFlags, Session, Sftp};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::{Result, TransferError, FX_NO_SUCH_FILE};

const DIR_MODE: i32 = 0o755;
const FILE_MODE: i32 = 0o644;

/// Uploader over SSH File Transfer Protocol
#[derive(Debug, Clone)]
pub struct SftpUploader {
    timeout: Duration,
}

impl SftpUploader {
    /// `timeout` bounds connect, handshake and every blocking call
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Uploader for SftpUploader {
    fn name(&self) -> &str {
        "sftp"
    }

    #[instrument(
        name = "sftp_upload",
        skip(self, destination, content),
        fields(destination = %destination.id, address = %destination.address(), bytes = content.len())
    )]
    async fn upload(
        &self,
        destination: &DestinationProfile,
        remote_path: &str,
        content: Bytes,
    ) -> std::result::Result<(), UploadError> {
        let profile = destination.clone();
        let path = remote_path.to_string();
        let timeout = self.timeout;

        tokio::task::spawn_blocking(move || {
            let session = SftpSession::open(&profile, timeout)?;
            session.replace_file(&path, &content)
        })
        .await
        .map_err(|e| TransferError::Worker(e.to_string()))?
        .map_err(UploadError::from)
    }
}

/// Authenticated session with an open SFTP channel
struct SftpSession {
    session: Session,
    sftp: Option<Sftp>,
    address: String,
}

impl SftpSession {
    fn open(profile: &DestinationProfile, timeout: Duration) -> Result<Self> {
        let address = profile.address();
        let tcp = connect_tcp(&profile.host, profile.port, &address, timeout)?;

        let session_err = |source| TransferError::Session {
            address: address.clone(),
            source,
        };
        let mut session = Session::new().map_err(session_err)?;
        session.set_tcp_stream(tcp);
        session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        session.handshake().map_err(session_err)?;

        if let Some((hash, _)) = session.host_key() {
            debug!(address = %address, host_key_len = hash.len(), "handshake complete");
        }

        authenticate(&session, profile)?;
        let sftp = session.sftp().map_err(session_err)?;
        debug!(address = %address, "sftp channel open");

        Ok(Self {
            session,
            sftp: Some(sftp),
            address,
        })
    }

    fn sftp(&self) -> Result<&Sftp> {
        self.sftp
            .as_ref()
            .ok_or_else(|| TransferError::Worker("sftp channel closed".to_string()))
    }

    /// Replace `remote_path` with `content`
    ///
    /// Writes a unique temporary file beside the target, then renames it
    /// over the target. A torn upload leaves at most a stray `.part` file.
    /// On servers without overwriting rename the target is briefly absent
    /// between unlink and rename.
    fn replace_file(&self, remote_path: &str, content: &[u8]) -> Result<()> {
        let sftp = self.sftp()?;
        let target = Path::new(remote_path);
        if let Some(parent) = target.parent() {
            self.ensure_dir(parent)?;
        }

        let temp_name = format!("{remote_path}.part-{}", Uuid::new_v4().simple());
        let temp = Path::new(&temp_name);

        let written = sftp
            .open_mode(
                temp,
                ssh2::OpenFlags::WRITE | ssh2::OpenFlags::CREATE | ssh2::OpenFlags::TRUNCATE,
                FILE_MODE,
                ssh2::OpenType::File,
            )
            .map_err(|e| TransferError::sftp("create", temp_name.as_str(), e))
            .and_then(|mut file| {
                file.write_all(content)
                    .and_then(|()| file.flush())
                    .map_err(|source| TransferError::Write {
                        path: temp_name.clone(),
                        source,
                    })
            });
        if let Err(e) = written {
            self.discard(temp);
            return Err(e);
        }

        match install(sftp, temp, target, remote_path) {
            Ok(Installed::Renamed) => {}
            Ok(Installed::Superseded) => {
                debug!(remote_path, "concurrent delivery replaced the target first");
                self.discard(temp);
            }
            Err(e) => {
                self.discard(temp);
                return Err(e);
            }
        }

        debug!(remote_path, bytes = content.len(), "remote file replaced");
        Ok(())
    }

    /// Create `dir` and every missing parent
    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        let sftp = self.sftp()?;
        let display = dir.to_string_lossy().to_string();
        if display.is_empty() || display == "/" {
            return Ok(());
        }

        match sftp.stat(dir) {
            Ok(stat) if stat.is_dir() => return Ok(()),
            Ok(_) => return Err(TransferError::NotADirectory { path: display }),
            Err(e) => {
                let err = TransferError::sftp("stat", display.as_str(), e);
                if !err.is_not_found() {
                    return Err(err);
                }
            }
        }

        if let Some(parent) = dir.parent() {
            self.ensure_dir(parent)?;
        }

        if let Err(e) = sftp.mkdir(dir, DIR_MODE) {
            // Another invocation may have created it concurrently
            match sftp.stat(dir) {
                Ok(stat) if stat.is_dir() => {}
                _ => return Err(TransferError::sftp("mkdir", display, e)),
            }
        }
        Ok(())
    }

    fn discard(&self, temp: &Path) {
        if let Some(sftp) = &self.sftp {
            if let Err(e) = sftp.unlink(temp) {
                warn!(path = %temp.display(), error = %e, "failed to remove temporary file");
            }
        }
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        // Close the channel before the session
        drop(self.sftp.take());
        if let Err(e) = self.session.disconnect(None, "upload finished", None) {
            debug!(address = %self.address, error = %e, "disconnect failed");
        }
    }
}

/// Remote operations used to move a finished upload into place
trait RemoteFs {
    /// Rename asking for overwrite; SFTP v3 servers may ignore the flags
    fn rename_over(&self, from: &Path, to: &Path) -> std::result::Result<(), ssh2::Error>;
    fn unlink(&self, path: &Path) -> std::result::Result<(), ssh2::Error>;
    fn exists(&self, path: &Path) -> std::result::Result<bool, ssh2::Error>;
}

impl RemoteFs for Sftp {
    fn rename_over(&self, from: &Path, to: &Path) -> std::result::Result<(), ssh2::Error> {
        self.rename(
            from,
            to,
            Some(RenameFlags::OVERWRITE | RenameFlags::ATOMIC | RenameFlags::NATIVE),
        )
    }

    fn unlink(&self, path: &Path) -> std::result::Result<(), ssh2::Error> {
        Sftp::unlink(self, path)
    }

    fn exists(&self, path: &Path) -> std::result::Result<bool, ssh2::Error> {
        match self.stat(path) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ssh2::ErrorCode::SFTP(FX_NO_SUCH_FILE) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Installed {
    /// `temp` now sits at the target
    Renamed,
    /// Another delivery of the same file won the rename; `temp` is left over
    Superseded,
}

/// Move `temp` over `target`
///
/// Tries an overwriting rename first. When the server refuses because the
/// target exists, unlinks it and renames again. If a concurrent delivery
/// put the target back in between, its copy is kept.
fn install<F: RemoteFs + ?Sized>(
    fs: &F,
    temp: &Path,
    target: &Path,
    remote_path: &str,
) -> Result<Installed> {
    let first = match fs.rename_over(temp, target) {
        Ok(()) => return Ok(Installed::Renamed),
        Err(e) => e,
    };
    let target_exists = fs
        .exists(target)
        .map_err(|e| TransferError::sftp("stat", remote_path, e))?;
    if !target_exists {
        return Err(TransferError::sftp("rename", remote_path, first));
    }

    if let Err(e) = fs.unlink(target) {
        let err = TransferError::sftp("unlink", remote_path, e);
        if !err.is_not_found() {
            return Err(err);
        }
    }

    match fs.rename_over(temp, target) {
        Ok(()) => Ok(Installed::Renamed),
        Err(e) => {
            let superseded = fs
                .exists(target)
                .map_err(|e| TransferError::sftp("stat", remote_path, e))?;
            if superseded {
                Ok(Installed::Superseded)
            } else {
                Err(TransferError::sftp("rename", remote_path, e))
            }
        }
    }
}

fn connect_tcp(host: &str, port: u16, address: &str, timeout: Duration) -> Result<TcpStream> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransferError::Resolve {
            address: address.to_string(),
            source,
        })?;

    let mut last_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses");
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                let io_err = |source| TransferError::Connect {
                    address: address.to_string(),
                    source,
                };
                stream.set_read_timeout(Some(timeout)).map_err(io_err)?;
                stream.set_write_timeout(Some(timeout)).map_err(io_err)?;
                return Ok(stream);
            }
            Err(e) => last_err = e,
        }
    }

    Err(TransferError::Connect {
        address: address.to_string(),
        source: last_err,
    })
}

fn authenticate(session: &Session, profile: &DestinationProfile) -> Result<()> {
    let method = profile.identity.method();
    let result = match &profile.identity {
        Identity::PrivateKey {
            key_pem,
            passphrase,
        } => session.userauth_pubkey_memory(
            &profile.username,
            None,
            key_pem.expose(),
            passphrase.as_ref().map(|p| p.expose()),
        ),
        Identity::Password(password) => {
            session.userauth_password(&profile.username, password.expose())
        }
        // Servers that trust the network accept the "none" method
        Identity::None => session.auth_methods(&profile.username).map(|_| ()),
    };

    let rejected = |reason: String| TransferError::Auth {
        username: profile.username.clone(),
        method,
        reason,
    };
    result.map_err(|e| rejected(e.message().to_string()))?;
    if !session.authenticated() {
        return Err(rejected("session not authenticated".to_string()));
    }
    Ok(())
}
