//! Durable storage of the sequence number ledger.

use core::fmt;
use core::time::Duration;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::ledger::LedgerSnapshot;

pub const LEDGER_FILE: &str = "sequence_numbers.bin";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("malformed ledger file: {0}")]
    Malformed(io::Error),
}

pub trait Persister: fmt::Debug + Send + Sync + 'static {
    /// Schedules `snapshot` to be written after `delay`. Saves queued while a
    /// write is pending are coalesced and only the latest one is written.
    fn queue_save(&self, snapshot: LedgerSnapshot, delay: Duration);

    fn load_persisted(&self) -> Option<LedgerSnapshot>;
}

/// Writes the ledger as a single borsh file, replacing it atomically.
#[derive(Debug)]
pub struct FilePersister {
    path: Utf8PathBuf,
    sender: mpsc::UnboundedSender<(LedgerSnapshot, Duration)>,
}

impl FilePersister {
    /// Starts the background writer. Must be called from within a tokio
    /// runtime; the writer stops once the persister is dropped and the last
    /// pending save is written.
    #[must_use]
    pub fn spawn(path: Utf8PathBuf) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        drop(tokio::spawn(write_loop(path.clone(), receiver)));

        Self { path, sender }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Persister for FilePersister {
    fn queue_save(&self, snapshot: LedgerSnapshot, delay: Duration) {
        if self.sender.send((snapshot, delay)).is_err() {
            warn!(path = %self.path, "ledger writer has stopped, dropping save");
        }
    }

    fn load_persisted(&self) -> Option<LedgerSnapshot> {
        match read_snapshot(&self.path) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(path = %self.path, %err, "failed to load sequence number ledger");
                None
            }
        }
    }
}

async fn write_loop(
    path: Utf8PathBuf,
    mut receiver: mpsc::UnboundedReceiver<(LedgerSnapshot, Duration)>,
) {
    while let Some((mut snapshot, delay)) = receiver.recv().await {
        sleep(delay).await;

        while let Ok((latest, _)) = receiver.try_recv() {
            snapshot = latest;
        }

        match write_snapshot(&path, &snapshot).await {
            Ok(()) => debug!(%path, records = snapshot.len(), "persisted sequence number ledger"),
            Err(err) => warn!(%path, %err, "failed to persist sequence number ledger"),
        }
    }
}

async fn write_snapshot(path: &Utf8Path, snapshot: &LedgerSnapshot) -> Result<(), PersistError> {
    let bytes = borsh::to_vec(snapshot)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = Utf8PathBuf::from(format!("{path}.tmp"));

    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;

    Ok(())
}

fn read_snapshot(path: &Utf8Path) -> Result<Option<LedgerSnapshot>, PersistError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    borsh::from_slice(&bytes)
        .map(Some)
        .map_err(PersistError::Malformed)
}

#[derive(Debug, Default)]
struct MemoryState {
    saved: Option<LedgerSnapshot>,
    saves: usize,
}

/// In-memory persister that saves immediately, ignoring the delay.
#[derive(Clone, Debug, Default)]
pub struct MemoryPersister {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryPersister {
    #[must_use]
    pub fn with_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                saved: Some(snapshot),
                saves: 0,
            })),
        }
    }

    #[must_use]
    pub fn saved(&self) -> Option<LedgerSnapshot> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .saved
            .clone()
    }

    #[must_use]
    pub fn save_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .saves
    }
}

impl Persister for MemoryPersister {
    fn queue_save(&self, snapshot: LedgerSnapshot, _delay: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        state.saved = Some(snapshot);
        state.saves = state.saves.saturating_add(1);
    }

    fn load_persisted(&self) -> Option<LedgerSnapshot> {
        self.saved()
    }
}
