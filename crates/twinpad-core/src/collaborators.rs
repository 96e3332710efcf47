//! Narrow contracts for the collaborators the coordinator calls out to.

use crate::buffer::BufferId;
use crate::surface::SurfaceId;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Answer to a yes/no prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Proceed.
    Yes,
    /// Decline.
    No,
}

/// Synchronous user prompts.
pub trait Prompter: Send {
    /// The file of `buffer` changed on disk. `dirty` tells whether local edits would be lost.
    fn confirm_reload(&mut self, buffer: BufferId, title: &str, dirty: bool) -> Choice;

    /// The file of `buffer` was deleted. `Yes` keeps the buffer open.
    fn confirm_keep_missing(&mut self, buffer: BufferId, title: &str) -> Choice;

    /// Delete the file of `buffer` from disk?
    fn confirm_delete(&mut self, buffer: BufferId, title: &str) -> Choice;
}

/// A prompter that always answers the same, handy for headless runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompter(pub Choice);

impl Prompter for FixedPrompter {
    fn confirm_reload(&mut self, _: BufferId, _: &str, _: bool) -> Choice {
        self.0
    }

    fn confirm_keep_missing(&mut self, _: BufferId, _: &str) -> Choice {
        self.0
    }

    fn confirm_delete(&mut self, _: BufferId, _: &str) -> Choice {
        self.0
    }
}

/// A prompter replaying queued answers, falling back to `No` when exhausted.
///
/// Clones share the queue, so a test can keep one handle and box the other.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
    script: Arc<Mutex<Script>>,
}

#[derive(Debug, Default)]
struct Script {
    answers: VecDeque<Choice>,
    asked: usize,
}

impl ScriptedPrompter {
    /// Queue `answers` in order.
    pub fn new(answers: impl IntoIterator<Item = Choice>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                answers: answers.into_iter().collect(),
                asked: 0,
            })),
        }
    }

    /// How many prompts were shown.
    pub fn asked(&self) -> usize {
        self.script.lock().map(|s| s.asked).unwrap_or_default()
    }

    fn next(&mut self) -> Choice {
        let Ok(mut script) = self.script.lock() else {
            return Choice::No;
        };
        script.asked += 1;
        script.answers.pop_front().unwrap_or(Choice::No)
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm_reload(&mut self, _: BufferId, _: &str, _: bool) -> Choice {
        self.next()
    }

    fn confirm_keep_missing(&mut self, _: BufferId, _: &str) -> Choice {
        self.next()
    }

    fn confirm_delete(&mut self, _: BufferId, _: &str) -> Choice {
        self.next()
    }
}

/// System clipboard.
pub trait Clipboard: Send {
    /// Replace the clipboard content.
    fn set_text(&mut self, text: String);

    /// Current clipboard content.
    fn text(&self) -> Option<String>;
}

/// In-process clipboard.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    content: Option<String>,
}

impl Clipboard for MemoryClipboard {
    fn set_text(&mut self, text: String) {
        self.content = Some(text);
    }

    fn text(&self) -> Option<String> {
        self.content.clone()
    }
}

/// A document-map style preview of the active buffer.
pub trait DocumentMap: Send {
    /// Re-derive the wrapped preview of `buffer` shown in `view`.
    fn rewrap(&mut self, buffer: BufferId, view: SurfaceId);
}
