//! The document coordinator.
//!
//! [`DocumentCoordinator`] owns the [`BufferStore`] and the two [`ViewSlot`]s and mediates every
//! buffer-to-view transition: binding, unbinding, activation, switching the active view,
//! moving and cloning between views, and showing or hiding views. It also reacts to external
//! file changes and drives snapshot backups.
//!
//! Invariants kept here:
//!
//! - a buffer's reference count equals the number of view slots whose tab strip holds it
//! - a buffer is destroyed exactly when its reference count drops to zero
//! - at least one view is visible, and a visible view never has an empty tab strip
//! - synchronized scrolling is only on while both views are visible

use crate::backup::{SnapshotTimer, write_backup};
use crate::buffer::{Buffer, BufferId};
use crate::collaborators::{Choice, Clipboard, DocumentMap, Prompter};
use crate::config::CoordinatorConfig;
use crate::encoding::Encoding;
use crate::error::StoreError;
use crate::events::{CoordinatorEvent, EventBus, Notification, RefreshScope};
use crate::guard::OperationGuard;
use crate::store::{BufferStore, StoreOptions};
use crate::surface::{Selection, SurfaceHandle, SurfaceId, ViewState};
use crate::view_slot::ViewSlot;
use bitflags::bitflags;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use twinpad_lang::LangType;

bitflags! {
    /// Visibility and modal state of the main window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WindowStatus: u8 {
        /// The main view is visible.
        const MAIN_VISIBLE = 1;
        /// The secondary view is visible.
        const SECONDARY_VISIBLE = 1 << 1;
        /// A prompt is waiting for the user.
        const DIALOG_ACTIVE = 1 << 2;
    }
}

impl WindowStatus {
    fn for_view(view: SurfaceId) -> Self {
        match view {
            SurfaceId::Main => Self::MAIN_VISIBLE,
            SurfaceId::Secondary => Self::SECONDARY_VISIBLE,
            SurfaceId::Hidden => Self::empty(),
        }
    }
}

/// What [`DocumentCoordinator::move_or_clone_to_other_view`] does with the source tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Close the buffer in the source view afterwards.
    Move,
    /// Keep it open in both views.
    Clone,
}

/// Synchronized scrolling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncScroll {
    /// Vertical scrolling is mirrored.
    pub vertical: bool,
    /// Horizontal scrolling is mirrored.
    pub horizontal: bool,
    /// Secondary first visible line minus main first visible line, captured when enabled.
    pub line_delta: isize,
    /// Secondary horizontal offset minus main horizontal offset, captured when enabled.
    pub x_delta: isize,
}

/// Coordinates buffers, the two editing views and the hidden surface.
pub struct DocumentCoordinator {
    pub(crate) config: CoordinatorConfig,
    pub(crate) store: BufferStore,
    main: ViewSlot,
    secondary: ViewSlot,
    active: SurfaceId,
    status: WindowStatus,
    sync: SyncScroll,
    pub(crate) hidden: Option<BufferId>,
    events: EventBus,
    prompter: Box<dyn Prompter>,
    pub(crate) clipboard: Box<dyn Clipboard>,
    document_map: Option<Box<dyn DocumentMap>>,
    pub(crate) replace_in_files_guard: OperationGuard,
    pub(crate) bookmark_guard: OperationGuard,
    snapshot: Option<SnapshotTimer>,
    pending_checks: VecDeque<BufferId>,
}

impl std::fmt::Debug for DocumentCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCoordinator")
            .field("store", &self.store)
            .field("main", &self.main)
            .field("secondary", &self.secondary)
            .field("active", &self.active)
            .field("status", &self.status)
            .field("sync", &self.sync)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl DocumentCoordinator {
    /// Create a coordinator with one untitled buffer in the main view. The secondary view
    /// starts hidden.
    pub fn new(
        config: CoordinatorConfig,
        prompter: Box<dyn Prompter>,
        clipboard: Box<dyn Clipboard>,
    ) -> Self {
        let store = BufferStore::new(StoreOptions {
            tab_width: config.tab_width,
            use_tabs: config.use_tabs,
            detection_cap: config.encoding_detection_cap,
            fallback: config.fallback_encoding(),
        });
        let snapshot = config
            .snapshot
            .enabled
            .then(|| SnapshotTimer::new(config.snapshot.interval()));
        let mut coordinator = Self {
            config,
            store,
            main: ViewSlot::new(SurfaceId::Main, true),
            secondary: ViewSlot::new(SurfaceId::Secondary, false),
            active: SurfaceId::Main,
            status: WindowStatus::MAIN_VISIBLE,
            sync: SyncScroll::default(),
            hidden: None,
            events: EventBus::default(),
            prompter,
            clipboard,
            document_map: None,
            replace_in_files_guard: OperationGuard::default(),
            bookmark_guard: OperationGuard::default(),
            snapshot,
            pending_checks: VecDeque::new(),
        };
        let first = coordinator.store.new_empty();
        coordinator.bind_buffer_to_view(first, SurfaceId::Main, false);
        coordinator.activate_buffer(first, SurfaceId::Main);
        coordinator
    }

    /// Attach a document-map preview.
    pub fn set_document_map(&mut self, map: Box<dyn DocumentMap>) {
        self.document_map = Some(map);
    }

    /// Register an event subscriber.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&CoordinatorEvent) + Send + 'static,
    {
        self.events.subscribe(callback);
    }

    /// Configuration in use.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// The buffer store.
    pub fn store(&self) -> &BufferStore {
        &self.store
    }

    /// Buffer by id.
    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.store.get(id)
    }

    /// The view slot behind `view`; `None` for the hidden surface.
    pub fn view_slot(&self, view: SurfaceId) -> Option<&ViewSlot> {
        match view {
            SurfaceId::Main => Some(&self.main),
            SurfaceId::Secondary => Some(&self.secondary),
            SurfaceId::Hidden => None,
        }
    }

    fn view_slot_mut(&mut self, view: SurfaceId) -> Option<&mut ViewSlot> {
        match view {
            SurfaceId::Main => Some(&mut self.main),
            SurfaceId::Secondary => Some(&mut self.secondary),
            SurfaceId::Hidden => None,
        }
    }

    /// The view receiving commands.
    pub fn active_view(&self) -> SurfaceId {
        self.active
    }

    /// Window visibility flags.
    pub fn window_status(&self) -> WindowStatus {
        self.status
    }

    /// Returns `true` if `view` is shown.
    pub fn is_visible(&self, view: SurfaceId) -> bool {
        self.view_slot(view).is_some_and(ViewSlot::is_visible)
    }

    fn both_visible(&self) -> bool {
        self.main.is_visible() && self.secondary.is_visible()
    }

    /// Current buffer of the active view.
    pub fn current_buffer(&self) -> Option<BufferId> {
        self.current_buffer_in(self.active)
    }

    /// Current buffer of `view`.
    pub fn current_buffer_in(&self, view: SurfaceId) -> Option<BufferId> {
        match view {
            SurfaceId::Hidden => self.hidden,
            _ => self.view_slot(view).and_then(ViewSlot::current),
        }
    }

    /// Live state of `view` for its current buffer.
    pub fn view_state(&self, view: SurfaceId) -> Option<&ViewState> {
        let id = self.current_buffer_in(view)?;
        self.store.get(id)?.document().view(view)
    }

    /// Editing surface of the current buffer of `view`, as the host widget sees it.
    ///
    /// Edits made through it bypass the read-only check of the command entry points.
    pub fn surface(&mut self, view: SurfaceId) -> Option<SurfaceHandle<'_>> {
        let id = self.current_buffer_in(view)?;
        let buffer = self.store.get_mut(id)?;
        Some(SurfaceHandle::new(&mut buffer.doc, view))
    }

    /// Editing surface of the active view.
    pub fn active_surface(&mut self) -> Option<SurfaceHandle<'_>> {
        self.surface(self.active)
    }

    fn view_state_mut(&mut self, view: SurfaceId) -> Option<&mut ViewState> {
        let id = self.current_buffer_in(view)?;
        self.store.get_mut(id)?.doc.view_mut(view)
    }

    /// Returns `true` if `id` is the current buffer of a visible view.
    fn is_shown(&self, id: BufferId) -> bool {
        [SurfaceId::Main, SurfaceId::Secondary]
            .into_iter()
            .any(|v| self.is_visible(v) && self.current_buffer_in(v) == Some(id))
    }

    fn tab_strips_of(&self, id: BufferId) -> Vec<RefreshScope> {
        self.store
            .get(id)
            .map(|b| {
                b.references()
                    .iter()
                    .map(|v| RefreshScope::TabStrip(*v))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn prompt<R>(&mut self, ask: impl FnOnce(&mut dyn Prompter) -> R) -> R {
        self.status.insert(WindowStatus::DIALOG_ACTIVE);
        let answer = ask(self.prompter.as_mut());
        self.status.remove(WindowStatus::DIALOG_ACTIVE);
        answer
    }

    /// Add `id` to the tab strip of `view`.
    ///
    /// Returns `false` if it is already there. When the strip holds only a clean untitled
    /// placeholder and `allow_replace_placeholder` is set, the new buffer takes over that tab,
    /// becomes current and the placeholder is closed.
    pub fn bind_buffer_to_view(
        &mut self,
        id: BufferId,
        view: SurfaceId,
        allow_replace_placeholder: bool,
    ) -> bool {
        if self.store.get(id).is_none() {
            return false;
        }
        let Some(slot) = self.view_slot(view) else {
            return false;
        };
        if slot.contains(id) {
            return false;
        }
        let placeholder = if allow_replace_placeholder && slot.len() == 1 {
            slot.at(0)
                .filter(|p| self.store.get(*p).is_some_and(Buffer::is_clean_untitled))
        } else {
            None
        };

        self.store.add_reference(id, view);
        match placeholder {
            Some(placeholder) => {
                if let Some(slot) = self.view_slot_mut(view) {
                    slot.replace(placeholder, id);
                }
                self.activate_buffer(id, view);
                self.release(placeholder, view);
            }
            None => {
                if let Some(slot) = self.view_slot_mut(view) {
                    slot.push(id);
                }
            }
        }
        log::debug!("bound {:?} to {:?}", id, view);
        self.events.refresh(RefreshScope::TabStrip(view));
        true
    }

    /// Drop one reference of `view` to `id`, destroying the buffer on the last one.
    fn release(&mut self, id: BufferId, view: SurfaceId) {
        if let Some(buffer) = self.store.get_mut(id) {
            buffer.doc.detach_view(view);
        }
        if self.store.remove_reference(id, view) == 0 {
            self.events.notify(Notification::BeforeClose(id), &[]);
            if self.hidden == Some(id) {
                self.hidden = None;
            }
            self.pending_checks.retain(|b| *b != id);
            self.store.close(id);
        }
    }

    /// Remove `id` from the tab strip of `view`.
    ///
    /// Refused when `id` is not in that strip, or when it is the only tab and a clean untitled
    /// buffer. Removing the current tab activates the next tab (the previous one for the last
    /// tab); removing the only tab puts a fresh untitled buffer in its place first.
    pub fn unbind_buffer_from_view(&mut self, id: BufferId, view: SurfaceId) -> bool {
        let Some(slot) = self.view_slot(view) else {
            return false;
        };
        let Some(index) = slot.index_of(id) else {
            return false;
        };
        let Some(buffer) = self.store.get(id) else {
            return false;
        };
        let tabs = slot.len();
        if tabs == 1 && buffer.is_clean_untitled() {
            log::debug!("refusing to unbind the placeholder {:?} from {:?}", id, view);
            return false;
        }

        if slot.current() == Some(id) {
            if tabs == 1 {
                let fresh = self.store.new_empty();
                self.store.add_reference(fresh, view);
                if let Some(slot) = self.view_slot_mut(view) {
                    slot.replace(id, fresh);
                }
                self.activate_buffer(fresh, view);
            } else {
                let next = if index == tabs - 1 { index - 1 } else { index };
                let next_id = self.view_slot_mut(view).and_then(|slot| {
                    slot.remove(id);
                    slot.at(next)
                });
                if let Some(next_id) = next_id {
                    self.activate_buffer(next_id, view);
                }
            }
        } else if let Some(slot) = self.view_slot_mut(view) {
            slot.remove(id);
        }

        self.release(id, view);
        self.events.refresh(RefreshScope::TabStrip(view));
        true
    }

    /// Make `target` the active view. Returns the previously active view.
    ///
    /// Nothing happens when `target` is already active or not visible.
    pub fn switch_active_view(&mut self, target: SurfaceId) -> SurfaceId {
        if target == self.active || !self.is_visible(target) {
            return self.active;
        }
        self.snapshot_active();
        let previous = std::mem::replace(&mut self.active, target);
        log::debug!("active view {:?} -> {:?}", previous, target);

        if let Some(id) = self.current_buffer() {
            if let Some(map) = self.document_map.as_mut() {
                map.rewrap(id, target);
            }
            self.events.notify(
                Notification::BufferActivated {
                    buffer: id,
                    view: target,
                },
                &[RefreshScope::StatusBar, RefreshScope::MenuState],
            );
        }
        previous
    }

    /// Make `id` the current buffer of `view`.
    ///
    /// Returns `false` if `id` is not in that view's tab strip. A pending reload happens
    /// first. Unless this activation reloaded, a file-state check is queued for the next
    /// [`idle`](Self::idle) call.
    pub fn activate_buffer(&mut self, id: BufferId, view: SurfaceId) -> bool {
        let Some(slot) = self.view_slot(view) else {
            return false;
        };
        if !slot.contains(id) {
            return false;
        }
        let previous = slot.current();
        self.snapshot_active();

        let reload = self.store.get(id).is_some_and(Buffer::needs_reload);
        if reload && let Err(err) = self.store.reload(id) {
            log::warn!("deferred reload of {:?} failed: {err}", id);
        }

        if previous != Some(id) {
            if let Some(prev) = previous
                && let Some(buffer) = self.store.get_mut(prev)
            {
                buffer.save_position(view);
                buffer.doc.detach_view(view);
            }
            if let Some(buffer) = self.store.get_mut(id) {
                buffer.restore_position(view);
            }
            if let Some(slot) = self.view_slot_mut(view) {
                slot.set_current(Some(id));
            }
        }
        if reload {
            self.after_reload(id, view, false);
        }

        self.events.notify(
            Notification::BufferActivated { buffer: id, view },
            &[
                RefreshScope::TabStrip(view),
                RefreshScope::StatusBar,
                RefreshScope::MenuState,
            ],
        );
        if !reload && self.config.file_detection.enabled && !self.pending_checks.contains(&id) {
            self.pending_checks.push_back(id);
        }
        true
    }

    /// Cursor policy after a reload: jump to the end of the document when configured (or
    /// `tail` is set).
    fn after_reload(&mut self, id: BufferId, view: SurfaceId, tail: bool) {
        if !tail && !self.config.file_detection.go_to_end {
            return;
        }
        if let Some(buffer) = self.store.get_mut(id) {
            let end = buffer.doc.len();
            let last = buffer.doc.line_count().saturating_sub(1);
            if let Some(state) = buffer.doc.view_mut(view) {
                state.selection = Selection::caret(end);
                state.first_visible_line = last;
            }
        }
    }

    /// Send the current buffer of the active view to the other view.
    ///
    /// A clone of a buffer already shown there only activates it. Otherwise the buffer is
    /// bound with the source position copied over. The other view is shown if hidden and
    /// becomes active. [`TransferMode::Move`] then closes the source tab, keeping monitoring
    /// on. Moving the only tab into a hidden view does nothing.
    pub fn move_or_clone_to_other_view(&mut self, mode: TransferMode) -> bool {
        let source = self.active;
        let target = source.other();
        let Some(id) = self.current_buffer() else {
            return false;
        };
        if mode == TransferMode::Move
            && self.main_or_secondary(source).len() == 1
            && !self.is_visible(target)
        {
            return false;
        }

        if self.main_or_secondary(target).contains(id) {
            self.activate_buffer(id, target);
        } else {
            if let Some(buffer) = self.store.get_mut(id) {
                buffer.save_position(source);
                if let Some(position) = buffer.positions.get(&source).cloned() {
                    buffer.positions.insert(target, position);
                }
            }
            self.bind_buffer_to_view(id, target, true);
            if self.current_buffer_in(target) != Some(id) {
                self.activate_buffer(id, target);
            }
        }

        if !self.is_visible(target) {
            self.show_view(target);
        }

        let monitoring = self.store.get(id).is_some_and(Buffer::is_monitoring);
        if mode == TransferMode::Move {
            self.close_buffer(id, source);
        }
        self.switch_active_view(target);
        if mode == TransferMode::Move && monitoring {
            self.set_monitoring(id, true);
        }
        true
    }

    fn main_or_secondary(&self, view: SurfaceId) -> &ViewSlot {
        match view {
            SurfaceId::Secondary => &self.secondary,
            _ => &self.main,
        }
    }

    /// Show `view`. An empty view receives an untitled buffer.
    pub fn show_view(&mut self, view: SurfaceId) -> bool {
        if view == SurfaceId::Hidden || self.is_visible(view) {
            return false;
        }
        if self.main_or_secondary(view).is_empty() {
            let fresh = self.store.new_empty();
            self.bind_buffer_to_view(fresh, view, false);
            self.activate_buffer(fresh, view);
        }
        if let Some(slot) = self.view_slot_mut(view) {
            slot.set_visible(true);
        }
        self.status.insert(WindowStatus::for_view(view));
        self.events.refresh(RefreshScope::Layout);
        true
    }

    /// Hide `view`. Refused unless both views are visible; an active view hands focus over
    /// to the other one first. Synchronized scrolling is turned off.
    pub fn hide_view(&mut self, view: SurfaceId) -> bool {
        if view == SurfaceId::Hidden || !self.both_visible() {
            return false;
        }
        if self.active == view {
            self.switch_active_view(view.other());
        }
        if let Some(slot) = self.view_slot_mut(view) {
            slot.set_visible(false);
        }
        self.status.remove(WindowStatus::for_view(view));
        self.sync = SyncScroll::default();
        self.events.refresh(RefreshScope::Layout);
        true
    }

    /// Returns `true` if `view` may be hidden: both views are visible and `view` holds only
    /// a clean untitled placeholder.
    pub fn can_hide_view(&self, view: SurfaceId) -> bool {
        if !self.is_visible(view) || !self.both_visible() {
            return false;
        }
        let slot = self.main_or_secondary(view);
        slot.len() == 1
            && slot
                .at(0)
                .and_then(|id| self.store.get(id))
                .is_some_and(Buffer::is_clean_untitled)
    }

    /// Create an untitled buffer in the active view and make it current.
    pub fn new_document(&mut self) -> BufferId {
        let id = self.store.new_empty();
        let view = self.active;
        self.bind_buffer_to_view(id, view, false);
        self.activate_buffer(id, view);
        id
    }

    /// Open `path` in the active view, or re-activate it where it is already shown.
    pub fn open_file(&mut self, path: &Path) -> Result<BufferId, StoreError> {
        if let Some(id) = self.store.find_by_path(path) {
            let view = [self.active, self.active.other()]
                .into_iter()
                .find(|v| self.main_or_secondary(*v).contains(id))
                .unwrap_or(self.active);
            if !self.main_or_secondary(view).contains(id) {
                self.bind_buffer_to_view(id, view, true);
            }
            self.switch_active_view(view);
            if self.current_buffer_in(view) != Some(id) {
                self.activate_buffer(id, view);
            }
            return Ok(id);
        }

        let id = self.store.load(path)?;
        let view = self.active;
        self.bind_buffer_to_view(id, view, true);
        if self.current_buffer_in(view) != Some(id) {
            self.activate_buffer(id, view);
        }
        Ok(id)
    }

    /// Close `id` in `view`. Monitoring stops. A view left with only a placeholder is hidden
    /// when the other view is visible.
    pub fn close_buffer(&mut self, id: BufferId, view: SurfaceId) -> bool {
        let Some(slot) = self.view_slot(view) else {
            return false;
        };
        if !slot.contains(id) {
            return false;
        }
        let tabs = slot.len();
        if let Some(buffer) = self.store.get_mut(id) {
            buffer.monitoring = false;
        }
        let removed = self.unbind_buffer_from_view(id, view);
        if tabs == 1 && self.can_hide_view(view) {
            self.hide_view(view);
        }
        removed
    }

    /// Close the current buffer of the active view.
    pub fn close_current(&mut self) -> bool {
        match self.current_buffer() {
            Some(id) => self.close_buffer(id, self.active),
            None => false,
        }
    }

    /// Save `id`, to `path` when given ("save as").
    pub fn save_buffer(&mut self, id: BufferId, path: Option<&Path>) -> Result<(), StoreError> {
        let lang = self.store.get(id).map(Buffer::lang);
        self.store.save(id, path)?;
        let strips = self.tab_strips_of(id);
        for scope in &strips {
            self.events.refresh(*scope);
        }
        if self.store.get(id).map(Buffer::lang) != lang {
            self.events
                .notify(Notification::LanguageChanged(id), &[RefreshScope::StatusBar]);
        }
        Ok(())
    }

    /// Delete the file of `id` after confirmation and close the buffer in every view.
    ///
    /// Returns `Ok(false)` when the user declines or the buffer has no file.
    pub fn delete_file(&mut self, id: BufferId) -> Result<bool, StoreError> {
        let buffer = self.store.get(id).ok_or(StoreError::BufferNotFound(id))?;
        let Some(path) = buffer.path().map(Path::to_path_buf) else {
            return Ok(false);
        };
        let title = buffer.title().to_string();
        if self.prompt(|p| p.confirm_delete(id, &title)) != Choice::Yes {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
        log::info!("deleted '{}'", path.display());
        for view in [SurfaceId::Main, SurfaceId::Secondary] {
            self.close_buffer(id, view);
        }
        Ok(true)
    }

    /// Change the language of `id`.
    pub fn set_language(&mut self, id: BufferId, lang: LangType) -> bool {
        let Some(buffer) = self.store.get_mut(id) else {
            return false;
        };
        if buffer.lang == lang {
            return false;
        }
        buffer.lang = lang;
        self.events.notify(
            Notification::LanguageChanged(id),
            &[RefreshScope::StatusBar, RefreshScope::MenuState],
        );
        true
    }

    /// Set or clear the user read-only flag of `id`.
    pub fn set_read_only(&mut self, id: BufferId, read_only: bool) -> bool {
        let Some(buffer) = self.store.get_mut(id) else {
            return false;
        };
        if buffer.user_read_only == read_only {
            return false;
        }
        buffer.user_read_only = read_only;
        self.notify_read_only(id);
        true
    }

    fn notify_read_only(&mut self, id: BufferId) {
        let mut refresh = self.tab_strips_of(id);
        refresh.push(RefreshScope::MenuState);
        self.events.notify(Notification::ReadOnlyChanged(id), &refresh);
    }

    /// Change the encoding of `id`.
    ///
    /// A clean buffer backed by a file is re-read in the new encoding. Otherwise only the
    /// encoding used by the next save changes.
    pub fn set_encoding(&mut self, id: BufferId, encoding: Encoding) -> Result<bool, StoreError> {
        let buffer = self.store.get(id).ok_or(StoreError::BufferNotFound(id))?;
        if buffer.encoding() == encoding {
            return Ok(false);
        }
        if !buffer.is_untitled() && !buffer.is_dirty() {
            self.store.reload_with_encoding(id, encoding)?;
        }
        let buffer = self.store.get_mut(id).ok_or(StoreError::BufferNotFound(id))?;
        buffer.encoding = encoding;
        for view in [SurfaceId::Main, SurfaceId::Secondary, SurfaceId::Hidden] {
            if let Some(state) = buffer.doc.view_mut(view) {
                state.code_page = encoding.code_page();
            }
        }
        self.events.refresh(RefreshScope::StatusBar);
        Ok(true)
    }

    /// Turn external-change monitoring of `id` on or off.
    ///
    /// A monitored buffer is read-only and reloads silently when its file changes.
    pub fn set_monitoring(&mut self, id: BufferId, on: bool) -> bool {
        let Some(buffer) = self.store.get_mut(id) else {
            return false;
        };
        if buffer.is_untitled() || buffer.monitoring == on {
            return false;
        }
        buffer.monitoring = on;
        buffer.user_read_only = on;
        log::debug!("monitoring of {:?} {}", id, if on { "on" } else { "off" });
        self.notify_read_only(id);
        true
    }

    /// Compare every file-backed buffer with its file.
    pub fn check_file_states(&mut self) {
        if !self.config.file_detection.enabled {
            return;
        }
        let ids: Vec<BufferId> = self
            .store
            .iter()
            .filter(|b| !b.is_untitled())
            .map(Buffer::id)
            .collect();
        for id in ids {
            self.check_buffer_state(id);
        }
    }

    fn check_buffer_state(&mut self, id: BufferId) {
        let check = self.store.check_file(id);
        if check.is_unchanged() {
            return;
        }
        if check.read_only_changed.is_some() {
            self.notify_read_only(id);
        }
        let Some(buffer) = self.store.get(id) else {
            return;
        };
        let title = buffer.title().to_string();
        let dirty = buffer.is_dirty();

        if check.deleted {
            let refresh = self.tab_strips_of(id);
            self.events.notify(Notification::FileDeleted(id), &refresh);
            if self.prompt(|p| p.confirm_keep_missing(id, &title)) == Choice::Yes {
                if let Some(buffer) = self.store.get_mut(id) {
                    buffer.forced_dirty = true;
                }
            } else {
                for view in [SurfaceId::Main, SurfaceId::Secondary] {
                    self.close_buffer(id, view);
                }
            }
            return;
        }
        if check.restored {
            for scope in self.tab_strips_of(id) {
                self.events.refresh(scope);
            }
        }
        if !check.modified {
            return;
        }

        let monitoring = self.store.get(id).is_some_and(Buffer::is_monitoring);
        let silent = (self.config.file_detection.auto_update && !dirty) || monitoring;
        let reload = silent || self.prompt(|p| p.confirm_reload(id, &title, dirty)) == Choice::Yes;
        if !reload {
            if let Some(buffer) = self.store.get_mut(id) {
                buffer.forced_dirty = true;
            }
            for scope in self.tab_strips_of(id) {
                self.events.refresh(scope);
            }
            return;
        }
        if !self.is_shown(id) {
            if let Some(buffer) = self.store.get_mut(id) {
                buffer.needs_reload = true;
            }
            return;
        }
        if let Err(err) = self.store.reload(id) {
            log::warn!("reload of {:?} failed: {err}", id);
            return;
        }
        for view in [SurfaceId::Main, SurfaceId::Secondary] {
            if self.current_buffer_in(view) == Some(id) {
                self.after_reload(id, view, monitoring);
            }
        }
        for scope in self.tab_strips_of(id) {
            self.events.refresh(scope);
        }
    }

    /// Run deferred work: file-state checks queued by activations and a due snapshot backup.
    pub fn idle(&mut self) {
        if self.snapshot.as_ref().is_some_and(SnapshotTimer::due) {
            self.backup_active();
        }
        while let Some(id) = self.pending_checks.pop_front() {
            if self.store.get(id).is_some() {
                self.check_buffer_state(id);
            }
        }
    }

    /// Turn snapshot mode on or off.
    pub fn set_snapshot_enabled(&mut self, enabled: bool) {
        self.config.snapshot.enabled = enabled;
        self.snapshot = enabled.then(|| SnapshotTimer::new(self.config.snapshot.interval()));
    }

    fn snapshot_active(&mut self) {
        if self.config.snapshot.enabled {
            self.backup_active();
        }
    }

    /// Back up the current buffer of the active view. Returns `true` if a file was written.
    pub fn backup_active(&mut self) -> bool {
        let Some(dir) = self.config.snapshot.backup_dir.clone() else {
            return false;
        };
        let Some(buffer) = self.current_buffer().and_then(|id| self.store.get_mut(id)) else {
            return false;
        };
        match write_backup(buffer, &dir) {
            Ok(written) => written.is_some(),
            Err(err) => {
                log::warn!("snapshot backup failed: {err}");
                false
            }
        }
    }

    /// Synchronized scrolling state.
    pub fn sync_scroll(&self) -> SyncScroll {
        self.sync
    }

    /// Enable or disable synchronized scrolling, capturing the current offsets between the
    /// views. Enabling requires both views to be visible.
    pub fn set_sync_scroll(&mut self, vertical: bool, horizontal: bool) -> bool {
        if (vertical || horizontal) && !self.both_visible() {
            return false;
        }
        let offsets = |view: SurfaceId| {
            self.view_state(view)
                .map(|s| (s.first_visible_line as isize, s.x_offset as isize))
                .unwrap_or_default()
        };
        let (main_line, main_x) = offsets(SurfaceId::Main);
        let (second_line, second_x) = offsets(SurfaceId::Secondary);
        self.sync = SyncScroll {
            vertical,
            horizontal,
            line_delta: second_line - main_line,
            x_delta: second_x - main_x,
        };
        true
    }

    /// Scroll `view` and, with synchronized scrolling, the other view by the same amount.
    pub fn scroll_view(&mut self, view: SurfaceId, first_visible_line: usize, x_offset: usize) -> bool {
        let Some(state) = self.view_state_mut(view) else {
            return false;
        };
        state.first_visible_line = first_visible_line;
        state.x_offset = x_offset;
        if !self.both_visible() {
            return true;
        }

        let sync = self.sync;
        let sign = if view == SurfaceId::Main { 1 } else { -1 };
        let other = view.other();
        let max_line = self
            .current_buffer_in(other)
            .and_then(|id| self.store.get(id))
            .map(|b| b.document().line_count().saturating_sub(1))
            .unwrap_or_default();
        if let Some(state) = self.view_state_mut(other) {
            if sync.vertical {
                let line = first_visible_line as isize + sign * sync.line_delta;
                state.first_visible_line = line.clamp(0, max_line as isize) as usize;
            }
            if sync.horizontal {
                let x = x_offset as isize + sign * sync.x_delta;
                state.x_offset = x.max(0) as usize;
            }
        }
        true
    }

    /// Bind `id` to the hidden surface, returning the buffer bound before.
    pub(crate) fn bind_hidden(&mut self, id: Option<BufferId>) -> Option<BufferId> {
        let previous = std::mem::replace(&mut self.hidden, id);
        if let Some(prev) = previous
            && Some(prev) != id
            && let Some(buffer) = self.store.get_mut(prev)
        {
            buffer.doc.detach_view(SurfaceId::Hidden);
        }
        if let Some(buffer) = id.and_then(|id| self.store.get_mut(id)) {
            let code_page = buffer.encoding().code_page();
            buffer.doc.attach_view(SurfaceId::Hidden);
            if let Some(state) = buffer.doc.view_mut(SurfaceId::Hidden) {
                state.code_page = code_page;
            }
        }
        previous
    }

    /// Buffers of the main tab strip followed by those of the secondary one, each once.
    pub fn opened_buffers(&self) -> Vec<BufferId> {
        let mut ids: Vec<BufferId> = self.main.tabs().to_vec();
        for id in self.secondary.tabs() {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }

    pub(crate) fn refresh(&mut self, scope: RefreshScope) {
        self.events.refresh(scope);
    }

    /// Stop delivering notifications and backups. The coordinator stays usable for queries.
    pub fn shutdown(&mut self) {
        self.snapshot = None;
        self.events.close();
        log::debug!("coordinator shut down");
    }
}
