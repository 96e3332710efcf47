#![warn(missing_docs)]
//! Twinpad Core - Headless Dual-View Document Coordinator
//!
//! # Overview
//!
//! `twinpad-core` is the kernel of a tabbed desktop text editor with two side-by-side views.
//! It tracks which open document ("buffer") is shown in which view, mediates opening,
//! closing, moving and cloning documents between the views, and implements the text
//! transforms the editor commands run against the active view: comment toggling, tab/space
//! conversion, line clean-up, bookmark line operations, brace matching, indentation
//! maintenance and find/replace across documents and directories.
//!
//! Nothing here draws. Views are modelled by the [`TextSurface`] capability; shells subscribe
//! to [`CoordinatorEvent`]s and ask the user through a [`Prompter`].
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Command entry points (dispatch)            │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  DocumentCoordinator + ViewSlots + Events   │  ← Buffer/view lifecycle
//! ├─────────────────────────────────────────────┤
//! │  Transforms (comment, whitespace, ...)      │  ← Algorithms over TextSurface
//! ├─────────────────────────────────────────────┤
//! │  BufferStore / Buffer                       │  ← Identity, metadata, disk
//! ├─────────────────────────────────────────────┤
//! │  Document (rope, marks, undo, view states)  │  ← Text storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use twinpad_core::{
//!     Choice, CommentMode, CoordinatorConfig, DocumentCoordinator, FixedPrompter, LangType,
//!     MemoryClipboard, TextSurface, TransferMode,
//! };
//!
//! let mut coordinator = DocumentCoordinator::new(
//!     CoordinatorConfig::default(),
//!     Box::new(FixedPrompter(Choice::No)),
//!     Box::new(MemoryClipboard::default()),
//! );
//! let id = coordinator.current_buffer().unwrap();
//! coordinator.set_language(id, LangType::Cpp);
//!
//! let mut surface = coordinator.active_surface().unwrap();
//! surface.insert(0, "int a;\nint b;\n");
//! surface.set_selection(0, 13);
//!
//! assert!(coordinator.comment_lines(CommentMode::Toggle));
//! assert_eq!(coordinator.buffer(id).unwrap().document().text(), "// int a;\n// int b;\n");
//!
//! // Show the same buffer in the secondary view as well.
//! assert!(coordinator.move_or_clone_to_other_view(TransferMode::Clone));
//! assert_eq!(coordinator.buffer(id).unwrap().reference_count(), 2);
//! ```
//!
//! # Module Description
//!
//! - [`document`] - rope text, line marks, undo history and per-view state
//! - [`surface`] - the [`TextSurface`] capability and its document-backed handle
//! - [`store`] / [`buffer`] - buffer identity, metadata, loading and saving
//! - [`coordinator`] - buffer/view lifecycle, file monitoring, snapshots
//! - [`comment`], [`whitespace`], [`bookmarks`], [`braces`] - text transforms
//! - [`search`], [`find_in_files`] - find/replace in one or many documents
//! - [`session`] - session capture and restore

pub mod backup;
pub mod bookmarks;
pub mod braces;
pub mod buffer;
pub mod collaborators;
pub mod comment;
pub mod config;
pub mod coordinator;
mod dispatch;
pub mod document;
pub mod encoding;
pub mod error;
pub mod events;
pub mod find_in_files;
pub mod guard;
pub mod line_ending;
pub mod search;
pub mod session;
pub mod stats;
pub mod store;
pub mod surface;
pub mod view_slot;
pub mod whitespace;

pub use backup::SnapshotTimer;
pub use buffer::{Buffer, BufferId, DiskStatus, SavedPosition};
pub use collaborators::{
    Choice, Clipboard, DocumentMap, FixedPrompter, MemoryClipboard, Prompter, ScriptedPrompter,
};
pub use comment::CommentMode;
pub use config::{CoordinatorConfig, FileDetection, SnapshotConfig};
pub use coordinator::{DocumentCoordinator, SyncScroll, TransferMode, WindowStatus};
pub use document::{Document, LineMarks};
pub use encoding::{CodePage, Encoding};
pub use error::{ConfigError, FindError, StoreError};
pub use events::{CoordinatorEvent, EventBus, EventCallback, Notification, RefreshScope};
pub use find_in_files::{
    DirectoryScope, FileFilter, FileOperation, FileRunReport, FindProgress, NoProgress,
};
pub use guard::{GuardToken, OperationGuard};
pub use line_ending::LineEnding;
pub use search::{CompiledSearch, FindOptions, MatchRecord, SearchMode};
pub use session::{RestoreReport, Session, SessionFile, ViewSession};
pub use stats::DocumentSummary;
pub use store::{BufferStore, FileCheck, StoreOptions};
pub use surface::{
    SearchFlags, SearchOutcome, Selection, SurfaceHandle, SurfaceId, TextSurface, ViewState,
};
pub use twinpad_lang::{CommentConfig, IndentStyle, LangType};
pub use view_slot::ViewSlot;
pub use whitespace::Trim;
