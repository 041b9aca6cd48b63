//! Append-only JSON Lines queue log.
//!
//! Every change (enqueue, completion, escalation) appends the task's full
//! snapshot as one line. On open the log is replayed and the last line per
//! task number wins, so a crash never loses or duplicates a task number. A
//! torn final line from an interrupted write is skipped; a write that fails
//! in-process is cut back off the file before the error is returned.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::ledger::{Enqueue, QueueLedger};
use crate::domain::{DeliveryRecord, ManualTask, TaskDraft, TaskNumber, TaskStatus, TransactionId};
use crate::error::QueueError;
use crate::port::outbound::queue::ManualQueueStore;

struct Inner {
    ledger: QueueLedger,
    file: File,
    /// Length of the log up to the last fully written record.
    len: u64,
    /// A partial record could not be cut off; start the next one on a new line.
    torn: bool,
}

/// File-backed [`ManualQueueStore`].
pub struct JsonlQueueStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl JsonlQueueStore {
    /// Open (or create) the log at `path` and replay it.
    ///
    /// # Errors
    ///
    /// [`QueueError::Unavailable`] when the file cannot be read or opened.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, QueueError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let ledger = QueueLedger::replay(parse_log(&contents, &path));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        if !contents.is_empty() && !contents.ends_with('\n') {
            // Terminate a torn record so the next append starts on its own line.
            file.write_all(b"\n").await?;
            file.flush().await?;
        }
        let len = file.metadata().await?.len();

        debug!(path = %path.display(), next = %ledger.next_number(), "Queue log replayed");
        Ok(Self {
            path,
            inner: Mutex::new(Inner {
                ledger,
                file,
                len,
                torn: false,
            }),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(inner: &mut Inner, task: ManualTask) -> Result<ManualTask, QueueError> {
        let mut line =
            serde_json::to_string(&task).map_err(|e| QueueError::Unavailable(e.to_string()))?;
        line.push('\n');
        if inner.torn {
            line.insert(0, '\n');
        }

        if let Err(e) = append(&mut inner.file, line.as_bytes()).await {
            Self::discard_partial(inner).await;
            return Err(e.into());
        }

        if inner.torn {
            // The garbage before this record has unknown length.
            if let Ok(meta) = inner.file.metadata().await {
                inner.len = meta.len();
                inner.torn = false;
            }
        } else {
            inner.len += line.len() as u64;
        }
        inner.ledger.commit(task.clone());
        Ok(task)
    }

    /// Cut whatever a failed append left behind back to the last good record,
    /// so a retry never lands on the end of a fragment.
    async fn discard_partial(inner: &mut Inner) {
        match inner.file.set_len(inner.len).await {
            Ok(()) => inner.torn = false,
            Err(e) => {
                warn!(error = %e, "Could not truncate partial queue record");
                inner.torn = true;
            }
        }
    }
}

async fn append(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_data().await
}

fn parse_log(contents: &str, path: &Path) -> Vec<ManualTask> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match serde_json::from_str::<ManualTask>(line) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(path = %path.display(), line = idx + 1, error = %e, "Skipping unreadable queue record");
                None
            }
        })
        .collect()
}

#[async_trait]
impl ManualQueueStore for JsonlQueueStore {
    async fn enqueue(&self, draft: TaskDraft) -> Result<ManualTask, QueueError> {
        let mut inner = self.inner.lock().await;
        match inner.ledger.prepare_enqueue(draft, Utc::now()) {
            Enqueue::Existing(task) => Ok(task),
            Enqueue::New(task) => Self::persist(&mut inner, task).await,
        }
    }

    async fn list(&self, status: Option<TaskStatus>) -> Result<Vec<ManualTask>, QueueError> {
        Ok(self.inner.lock().await.ledger.list(status))
    }

    async fn get(&self, number: TaskNumber) -> Result<ManualTask, QueueError> {
        self.inner.lock().await.ledger.get(number)
    }

    async fn find_by_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<ManualTask>, QueueError> {
        Ok(self.inner.lock().await.ledger.find_by_transaction(id))
    }

    async fn complete(
        &self,
        number: TaskNumber,
        delivery: DeliveryRecord,
    ) -> Result<ManualTask, QueueError> {
        let mut inner = self.inner.lock().await;
        let task = inner.ledger.prepare_complete(number, delivery)?;
        Self::persist(&mut inner, task).await
    }

    async fn cancel(&self, number: TaskNumber, at: DateTime<Utc>) -> Result<ManualTask, QueueError> {
        let mut inner = self.inner.lock().await;
        match inner.ledger.prepare_cancel(number, at)? {
            Some(task) => Self::persist(&mut inner, task).await,
            None => inner.ledger.get(number),
        }
    }

    async fn escalate(
        &self,
        number: TaskNumber,
        at: DateTime<Utc>,
    ) -> Result<ManualTask, QueueError> {
        let mut inner = self.inner.lock().await;
        match inner.ledger.prepare_escalate(number, at)? {
            Some(task) => Self::persist(&mut inner, task).await,
            None => inner.ledger.get(number),
        }
    }
}
