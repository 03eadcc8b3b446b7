//! Append-only writers for the two durable logs.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::config::PluginConfig;
use crate::record::{csv_header, MessageRecord};

/// Writer for the CSV message log and the plaintext event log.
///
/// Every append takes the per-file mutex, creates the log directory if
/// missing, opens the file in append mode, writes one whole line and closes
/// the file again. No handle is held between calls, so a crash can at worst
/// lose the line being written. The mutex keeps concurrent hook callbacks
/// from interleaving partial lines and makes the lazy CSV header write
/// happen exactly once.
pub struct RecordStore {
    dir: PathBuf,
    messages_path: PathBuf,
    events_path: PathBuf,
    messages_lock: Mutex<()>,
    events_lock: Mutex<()>,
}

impl RecordStore {
    pub fn new(cfg: &PluginConfig) -> Self {
        let dir = PathBuf::from(&cfg.dir);
        Self {
            messages_path: dir.join(&cfg.messages_file),
            events_path: dir.join(&cfg.events_file),
            dir,
            messages_lock: Mutex::new(()),
            events_lock: Mutex::new(()),
        }
    }

    #[inline]
    pub fn messages_path(&self) -> &Path {
        &self.messages_path
    }

    #[inline]
    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    /// Appends one record to the CSV message log, writing the header row
    /// first when the file does not exist yet.
    pub async fn append_record(&self, record: &MessageRecord) -> Result<()> {
        let _guard = self.messages_lock.lock().await;
        fs::create_dir_all(&self.dir).await?;
        let exists = fs::try_exists(&self.messages_path).await?;
        let mut file =
            OpenOptions::new().create(true).append(true).open(&self.messages_path).await?;
        if !exists {
            file.write_all(csv_header().as_bytes()).await?;
            file.write_all(b"\n").await?;
        }
        file.write_all(record.to_csv_row().as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }

    /// Appends one line to the event log, creating it on first use.
    pub async fn append_event(&self, line: &str) -> Result<()> {
        let _guard = self.events_lock.lock().await;
        fs::create_dir_all(&self.dir).await?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.events_path).await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn store_in(dir: &Path) -> RecordStore {
        let cfg = PluginConfig {
            dir: dir.join("Logs").to_string_lossy().into_owned(),
            ..PluginConfig::default()
        };
        RecordStore::new(&cfg)
    }

    #[tokio::test]
    async fn test_header_written_once() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        store.append_record(&MessageRecord::new("t/1", "1,2")).await.unwrap();
        store.append_record(&MessageRecord::new("t/2", "3,4")).await.unwrap();

        let content = std::fs::read_to_string(store.messages_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], csv_header());
        assert!(lines[1].starts_with("1,2,"));
        assert!(lines[2].starts_with("3,4,"));
        assert_eq!(content.matches("BMCODE").count(), 1);
    }

    #[tokio::test]
    async fn test_event_lines_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        store.append_event("Client connected: dev-1").await.unwrap();
        store.append_event("Client disconnected: dev-1").await.unwrap();
        store
            .append_event("-------------------------------------------------------")
            .await
            .unwrap();

        let content = std::fs::read_to_string(store.events_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Client connected: dev-1",
                "Client disconnected: dev-1",
                "-------------------------------------------------------",
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_keep_lines_whole() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(tmp.path()));

        let mut tasks = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let line = format!("Client dev-{i} published message: Topic: t/{i} Payload: {i}");
                store.append_event(&line).await.unwrap();
                store.append_record(&MessageRecord::new(&format!("t/{i}"), &i.to_string())).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let events = std::fs::read_to_string(store.events_path()).unwrap();
        let mut got: Vec<&str> = events.lines().collect();
        got.sort_unstable();
        let mut expected: Vec<String> = (0..32)
            .map(|i| format!("Client dev-{i} published message: Topic: t/{i} Payload: {i}"))
            .collect();
        expected.sort_unstable();
        assert_eq!(got, expected);

        let messages = std::fs::read_to_string(store.messages_path()).unwrap();
        let lines: Vec<&str> = messages.lines().collect();
        assert_eq!(lines.len(), 33);
        assert_eq!(lines[0], csv_header());
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), 23);
        }
    }
}
