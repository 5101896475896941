//! Polling file tailer.
//!
//! Turns a watched file into a sequence of line events, surviving rotation
//! and truncation. Fatal startup conditions (missing file, unreadable file)
//! are reported at construction; runtime failures surface through the death
//! signal, after which no further line events are produced.
//!
//! State machine: `Created -> Watching -> {Watching | Dying(cause) -> Stopped}`.
//! A tailer is restartable only by constructing a new one.

use chrono::{DateTime, Utc};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Capacity of the line-event channel. Bounded so a stalled consumer
/// backpressures the file reader instead of buffering unboundedly.
const LINE_CHANNEL_CAPACITY: usize = 1024;

/// Consecutive polls the watched path may be missing before the tailer dies.
/// Rotation schemes that remove-then-recreate get this window to settle.
const MAX_MISSING_POLLS: u32 = 25;

#[derive(Error, Debug)]
pub enum TailerError {
    #[error("file does not exist: {0}")]
    FileDoesNotExist(PathBuf),
    #[error("file is not readable due to invalid permissions: {0}")]
    InvalidPermission(PathBuf),
    #[error("file cannot be read: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct TailConfig {
    pub path: PathBuf,
    /// Byte position from which reading resumes.
    pub start_offset: u64,
    /// Fixed poll interval; a latency bound, not instantaneous notification.
    pub poll_interval: Duration,
}

/// One newline-delimited line read from the watched file, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct LineEvent {
    /// Line text with the trailing newline (and any carriage return) stripped.
    pub text: String,
    /// Read time, used as the entry timestamp on the wire.
    pub timestamp: DateTime<Utc>,
}

/// Cause of a permanent tailer stop. Fires at most once.
#[derive(Debug, Clone)]
pub struct TailerDeath {
    pub cause: String,
}

/// Handle to a running watch session.
pub struct Tailer {
    lines: mpsc::Receiver<LineEvent>,
    death: watch::Receiver<Option<TailerDeath>>,
}

impl Tailer {
    /// Opens the file, seeks to `start_offset` and starts the polling task.
    ///
    /// Construction fails synchronously, before any background activity
    /// starts, when the path is missing or unreadable.
    pub fn spawn(config: TailConfig, shutdown: CancellationToken) -> Result<Self, TailerError> {
        let mut file = open_checked(&config.path)?;
        file.seek(SeekFrom::Start(config.start_offset))
            .map_err(|source| TailerError::Io {
                path: config.path.clone(),
                source,
            })?;

        let (line_tx, line_rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let (death_tx, death_rx) = watch::channel(None);

        tokio::spawn(watch_loop(
            config, file, line_tx, death_tx, shutdown,
        ));

        Ok(Self {
            lines: line_rx,
            death: death_rx,
        })
    }

    /// Splits the handle into the line-event receiver and the death signal,
    /// so the drain and shutdown-watch activities can observe them
    /// independently.
    pub fn into_parts(
        self,
    ) -> (
        mpsc::Receiver<LineEvent>,
        watch::Receiver<Option<TailerDeath>>,
    ) {
        (self.lines, self.death)
    }

    pub async fn next_line(&mut self) -> Option<LineEvent> {
        self.lines.recv().await
    }
}

/// Stats and opens the path, mapping the failure modes the caller must
/// distinguish: missing file, unreadable file, anything else.
fn open_checked(path: &Path) -> Result<std::fs::File, TailerError> {
    if let Err(source) = std::fs::metadata(path) {
        return Err(match source.kind() {
            std::io::ErrorKind::NotFound => TailerError::FileDoesNotExist(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => {
                TailerError::InvalidPermission(path.to_path_buf())
            }
            _ => TailerError::Io {
                path: path.to_path_buf(),
                source,
            },
        });
    }

    std::fs::File::open(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::PermissionDenied => TailerError::InvalidPermission(path.to_path_buf()),
        _ => TailerError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

#[cfg(unix)]
fn inode_of(metadata: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

async fn watch_loop(
    config: TailConfig,
    file: std::fs::File,
    line_tx: mpsc::Sender<LineEvent>,
    death_tx: watch::Sender<Option<TailerDeath>>,
    shutdown: CancellationToken,
) {
    let die = |cause: String| {
        info!(path = %config.path.display(), %cause, "tailer dying");
        let _ = death_tx.send(Some(TailerDeath { cause }));
    };

    #[cfg(unix)]
    let mut current_inode = match file.metadata() {
        Ok(metadata) => inode_of(&metadata),
        Err(err) => {
            die(format!("stat failed: {err}"));
            return;
        }
    };

    let mut reader = BufReader::new(tokio::fs::File::from_std(file));
    let mut offset = config.start_offset;
    // Trailing fragment without a newline, carried until the line completes.
    let mut carry: Vec<u8> = Vec::new();
    let mut missing_polls = 0u32;

    loop {
        // Drain every complete line currently available.
        loop {
            let mut chunk = Vec::new();
            let read = tokio::select! {
                () = shutdown.cancelled() => {
                    debug!(path = %config.path.display(), "tailer stopped");
                    return;
                }
                read = reader.read_until(b'\n', &mut chunk) => read,
            };
            match read {
                Ok(0) => break, // at end of file for now
                Ok(n) => {
                    offset += n as u64;
                    if chunk.last() == Some(&b'\n') {
                        carry.extend_from_slice(&chunk);
                        let event = LineEvent {
                            text: strip_line_ending(&carry),
                            timestamp: Utc::now(),
                        };
                        carry.clear();
                        if line_tx.send(event).await.is_err() {
                            // Receiver gone: the pipeline is shutting down.
                            return;
                        }
                    } else {
                        carry.extend_from_slice(&chunk);
                    }
                }
                Err(err) => {
                    die(format!("read failed: {err}"));
                    return;
                }
            }
        }

        tokio::select! {
            () = shutdown.cancelled() => {
                debug!(path = %config.path.display(), "tailer stopped");
                return;
            }
            () = tokio::time::sleep(config.poll_interval) => {}
        }

        // Check file identity and size before the next read cycle.
        match tokio::fs::metadata(&config.path).await {
            Ok(metadata) => {
                missing_polls = 0;
                #[cfg(unix)]
                let replaced = inode_of(&metadata) != current_inode;
                #[cfg(not(unix))]
                let replaced = false;

                if replaced || metadata.len() < offset {
                    debug!(
                        path = %config.path.display(),
                        "file rotated or truncated, re-anchoring at offset 0"
                    );
                    match std::fs::File::open(&config.path) {
                        Ok(reopened) => {
                            #[cfg(unix)]
                            {
                                current_inode = match reopened.metadata() {
                                    Ok(metadata) => inode_of(&metadata),
                                    Err(err) => {
                                        die(format!("stat after reopen failed: {err}"));
                                        return;
                                    }
                                };
                            }
                            reader = BufReader::new(tokio::fs::File::from_std(reopened));
                            offset = 0;
                            carry.clear();
                        }
                        Err(err) => {
                            die(format!("reopen failed: {err}"));
                            return;
                        }
                    }
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                missing_polls += 1;
                if missing_polls >= MAX_MISSING_POLLS {
                    die(format!(
                        "file removed without replacement: {}",
                        config.path.display()
                    ));
                    return;
                }
            }
            Err(err) => {
                die(format!("stat failed: {err}"));
                return;
            }
        }
    }
}

/// Decodes a complete line, dropping the trailing `\n` (and `\r` for CRLF
/// input). Invalid UTF-8 is replaced rather than treated as fatal.
fn strip_line_ending(raw: &[u8]) -> String {
    let mut end = raw.len();
    if end > 0 && raw[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && raw[end - 1] == b'\r' {
        end -= 1;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
