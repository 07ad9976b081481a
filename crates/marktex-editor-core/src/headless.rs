//! In-memory surface and manually driven frame scheduler.
//!
//! Useful for tests and for hosts that lay out text themselves: the surface
//! keeps the mounted items with their layout and can print itself as the HTML a
//! browser host would have built.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::surface::{
    FrameHandle, FrameScheduler, ItemContent, ItemLayout, ScrollBehavior, ScrollSurface,
};

#[derive(Debug, Clone, PartialEq)]
pub struct MountedItem {
    pub layout: ItemLayout,
    pub content: ItemContent<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub content_height: f64,
    pub listening: bool,
    items: BTreeMap<usize, MountedItem>,
    mounts: usize,
    unmounts: usize,
}

impl MemorySurface {
    pub fn new(viewport_height: f64) -> Self {
        Self {
            viewport_height,
            ..Self::default()
        }
    }

    pub fn item(&self, index: usize) -> Option<&MountedItem> {
        self.items.get(&index)
    }

    pub fn indices(&self) -> Vec<usize> {
        self.items.keys().copied().collect()
    }

    /// Total `mount_item` calls so far.
    pub fn mounts(&self) -> usize {
        self.mounts
    }

    pub fn unmounts(&self) -> usize {
        self.unmounts
    }

    /// The content surface as markup, items in index order.
    pub fn to_html(&self) -> String {
        let mut html = format!(
            "<div style=\"position: relative; height: {}px; width: 100%;\">",
            self.content_height
        );
        for (index, item) in &self.items {
            let body = match &item.content {
                ItemContent::Element(element) | ItemContent::Html(element) => element,
            };
            let _ = write!(
                html,
                "<div data-index=\"{index}\" style=\"position: absolute; top: {}px; left: 0; width: 100%; height: {}px;\">{body}</div>",
                item.layout.top, item.layout.height
            );
        }
        html.push_str("</div>");
        html
    }
}

impl ScrollSurface for MemorySurface {
    type Element = String;

    fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn reset(&mut self, content_height: f64) {
        self.items.clear();
        self.content_height = content_height;
    }

    fn set_content_height(&mut self, content_height: f64) {
        self.content_height = content_height;
    }

    fn mount_item(&mut self, layout: ItemLayout, content: ItemContent<String>) {
        self.mounts += 1;
        self.items.insert(layout.index, MountedItem { layout, content });
    }

    fn unmount_item(&mut self, index: usize) {
        if self.items.remove(&index).is_some() {
            self.unmounts += 1;
        }
    }

    fn scroll_to(&mut self, top: f64, _behavior: ScrollBehavior) {
        let max = (self.content_height - self.viewport_height).max(0.0);
        self.scroll_top = top.clamp(0.0, max);
    }

    fn attach_listeners(&mut self) {
        self.listening = true;
    }

    fn detach_listeners(&mut self) {
        self.listening = false;
    }
}

/// Frames fire only when the host calls [`take_pending`](Self::take_pending).
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    next: u64,
    pending: Vec<FrameHandle>,
    cancelled: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames requested and not yet cancelled or taken.
    pub fn pending(&self) -> &[FrameHandle] {
        &self.pending
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled
    }

    pub fn take_pending(&mut self) -> Vec<FrameHandle> {
        std::mem::take(&mut self.pending)
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        let handle = FrameHandle(self.next);
        self.pending.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let before = self.pending.len();
        self.pending.retain(|h| *h != handle);
        if self.pending.len() < before {
            self.cancelled += 1;
        }
    }
}
