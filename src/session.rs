//! Transcript persistence for tether.
//!
//! Each conversation is stored as a JSONL file under
//! `~/.local/share/tether/sessions/`, one [`Message`] per line. A
//! `sessions/index.json` file maintains metadata for all transcripts.
//! JSONL is crash-safe (append-only) and human-readable.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::message::{Message, Role};

/// Metadata for a single transcript, stored in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    pub id: String,
    pub title: Option<String>,
    pub model: String,
    pub created_at: String,
    pub updated_at: String,
    pub message_count: usize,
}

/// Index of all transcripts, persisted as `index.json`.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct SessionIndex {
    pub sessions: Vec<SessionMeta>,
}

/// Write side of one conversation's on-disk record.
///
/// The conversation itself lives in memory; this only mirrors appends.
pub struct Transcript {
    pub id: String,
    pub model: String,
    dir: PathBuf,
    title: Option<String>,
    message_count: usize,
}

impl Transcript {
    /// Starts a new transcript with a UUID v4 identifier.
    pub fn create(model: &str) -> Result<Self> {
        Self::create_in(&sessions_dir()?, model)
    }

    pub fn create_in(dir: &Path, model: &str) -> Result<Self> {
        fs::create_dir_all(dir).context("Failed to create sessions directory")?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            model: model.to_string(),
            dir: dir.to_path_buf(),
            title: None,
            message_count: 0,
        })
    }

    /// Reopens a transcript and returns it with its recorded messages.
    pub fn open(id: &str) -> Result<(Self, Vec<Message>)> {
        Self::open_in(&sessions_dir()?, id)
    }

    pub fn open_in(dir: &Path, id: &str) -> Result<(Self, Vec<Message>)> {
        let file_path = session_path(dir, id);
        let short = &id[..8.min(id.len())];
        anyhow::ensure!(file_path.exists(), "Session {} not found", short);

        // Read model from index
        let index = load_index(dir)?;
        let model = index
            .sessions
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.model.clone())
            .unwrap_or_default();

        let messages = read_messages(&file_path)?;
        let transcript = Self {
            id: id.to_string(),
            model,
            dir: dir.to_path_buf(),
            title: title_of(&messages),
            message_count: messages.len(),
        };
        Ok((transcript, messages))
    }

    /// Appends messages as JSON lines, flushes immediately for crash safety,
    /// and updates the index.
    pub fn record(&mut self, messages: &[Message]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        let file_path = session_path(&self.dir, &self.id);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .with_context(|| format!("Failed to open session file {:?}", file_path))?;

        for msg in messages {
            let json = serde_json::to_string(msg)?;
            writeln!(file, "{}", json)?;
        }
        file.flush()?;

        self.message_count += messages.len();
        if self.title.is_none() {
            self.title = title_of(messages);
        }
        self.update_index()
    }

    /// Updates (or creates) this transcript's entry in the index file.
    fn update_index(&self) -> Result<()> {
        let mut index = load_index(&self.dir)?;
        let now = Utc::now().to_rfc3339();

        if let Some(entry) = index.sessions.iter_mut().find(|s| s.id == self.id) {
            entry.title = self.title.clone();
            entry.updated_at = now;
            entry.message_count = self.message_count;
        } else {
            index.sessions.push(SessionMeta {
                id: self.id.clone(),
                title: self.title.clone(),
                model: self.model.clone(),
                created_at: now.clone(),
                updated_at: now,
                message_count: self.message_count,
            });
        }
        write_index(&self.dir, &index)
    }
}

/// Title derived from the first user message, truncated to 50 characters.
fn title_of(messages: &[Message]) -> Option<String> {
    messages.iter().find(|m| m.role == Role::User).map(|m| {
        let text = m.text();
        if text.chars().count() > 50 {
            let truncated: String = text.chars().take(50).collect();
            format!("{}...", truncated)
        } else {
            text.to_string()
        }
    })
}

fn read_messages(file_path: &Path) -> Result<Vec<Message>> {
    let file = fs::File::open(file_path)
        .with_context(|| format!("Failed to open session file {:?}", file_path))?;
    let reader = BufReader::new(file);
    let mut messages = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let msg: Message = serde_json::from_str(&line)
            .with_context(|| "Failed to parse message from session file")?;
        messages.push(msg);
    }
    Ok(messages)
}

/// Loads the index, returning a default empty index if the file doesn't exist.
fn load_index(dir: &Path) -> Result<SessionIndex> {
    let path = dir.join("index.json");
    if !path.exists() {
        return Ok(SessionIndex::default());
    }
    let contents = fs::read_to_string(&path).with_context(|| "Failed to read session index")?;
    let index: SessionIndex =
        serde_json::from_str(&contents).with_context(|| "Failed to parse session index")?;
    Ok(index)
}

fn write_index(dir: &Path, index: &SessionIndex) -> Result<()> {
    let json = serde_json::to_string_pretty(index)?;
    fs::write(dir.join("index.json"), json).with_context(|| "Failed to write session index")
}

/// Returns the sessions directory path (`~/.local/share/tether/sessions/`).
fn sessions_dir() -> Result<PathBuf> {
    Ok(Config::data_dir()?.join("sessions"))
}

fn session_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{}.jsonl", id))
}

/// Returns metadata for all transcripts.
pub fn list_all() -> Result<Vec<SessionMeta>> {
    list_in(&sessions_dir()?)
}

pub fn list_in(dir: &Path) -> Result<Vec<SessionMeta>> {
    Ok(load_index(dir)?.sessions)
}

/// Reads a transcript's messages without reopening it for writing.
pub fn load_messages(id: &str) -> Result<Vec<Message>> {
    Transcript::open(id).map(|(_, messages)| messages)
}

/// Deletes a transcript's JSONL file and removes it from the index.
pub fn delete(id: &str) -> Result<()> {
    delete_in(&sessions_dir()?, id)
}

pub fn delete_in(dir: &Path, id: &str) -> Result<()> {
    let path = session_path(dir, id);
    if path.exists() {
        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete session file {:?}", path))?;
    }

    let mut index = load_index(dir)?;
    index.sessions.retain(|s| s.id != id);
    if dir.exists() {
        write_index(dir, &index)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("tether-sessions-test-{}", Uuid::new_v4()))
    }

    #[test]
    fn record_and_reopen_round_trips_messages() {
        let dir = scratch_dir();
        let mut transcript = Transcript::create_in(&dir, "openai/gpt-4o-mini").unwrap();
        transcript
            .record(&[Message::user("What's 2+2?"), Message::assistant("4")])
            .unwrap();
        transcript
            .record(&[Message::tool("javascript_execution", "{\"result\": 4}")])
            .unwrap();

        let (reopened, messages) = Transcript::open_in(&dir, &transcript.id).unwrap();
        assert_eq!(reopened.model, "openai/gpt-4o-mini");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].tool_name.as_deref(), Some("javascript_execution"));

        let listed = list_in(&dir).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].message_count, 3);
        assert_eq!(listed[0].title.as_deref(), Some("What's 2+2?"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn delete_removes_file_and_index_entry() {
        let dir = scratch_dir();
        let mut transcript = Transcript::create_in(&dir, "m").unwrap();
        transcript.record(&[Message::user("hi")]).unwrap();

        delete_in(&dir, &transcript.id).unwrap();
        assert!(list_in(&dir).unwrap().is_empty());
        assert!(Transcript::open_in(&dir, &transcript.id).is_err());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn long_titles_are_truncated() {
        let title = title_of(&[Message::user("x".repeat(80))]).unwrap();
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));
    }
}
