//! View slots: a tab strip plus the buffer currently shown on the surface.

use crate::buffer::BufferId;
use crate::surface::SurfaceId;

/// One of the two visible editing views.
#[derive(Debug, Clone)]
pub struct ViewSlot {
    id: SurfaceId,
    tabs: Vec<BufferId>,
    current: Option<BufferId>,
    visible: bool,
}

impl ViewSlot {
    pub(crate) fn new(id: SurfaceId, visible: bool) -> Self {
        Self {
            id,
            tabs: Vec::new(),
            current: None,
            visible,
        }
    }

    /// Which surface this slot drives.
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Buffers in tab order.
    pub fn tabs(&self) -> &[BufferId] {
        &self.tabs
    }

    /// Number of tabs.
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Returns `true` when the strip has no tabs.
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Buffer shown on the surface.
    pub fn current(&self) -> Option<BufferId> {
        self.current
    }

    /// Index of the current tab.
    pub fn current_index(&self) -> Option<usize> {
        self.current.and_then(|id| self.index_of(id))
    }

    /// Returns `true` if the view is shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns `true` if `id` has a tab here.
    pub fn contains(&self, id: BufferId) -> bool {
        self.tabs.contains(&id)
    }

    /// Tab index of `id`.
    pub fn index_of(&self, id: BufferId) -> Option<usize> {
        self.tabs.iter().position(|b| *b == id)
    }

    /// Buffer at tab `index`.
    pub fn at(&self, index: usize) -> Option<BufferId> {
        self.tabs.get(index).copied()
    }

    pub(crate) fn push(&mut self, id: BufferId) {
        if !self.contains(id) {
            self.tabs.push(id);
        }
    }

    pub(crate) fn remove(&mut self, id: BufferId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.tabs.remove(index);
        if self.current == Some(id) {
            self.current = None;
        }
        true
    }

    /// Put `new` in the tab of `old`, keeping its position in the strip.
    pub(crate) fn replace(&mut self, old: BufferId, new: BufferId) -> bool {
        let Some(index) = self.index_of(old) else {
            return false;
        };
        self.tabs[index] = new;
        true
    }

    pub(crate) fn set_current(&mut self, id: Option<BufferId>) {
        self.current = id;
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}
