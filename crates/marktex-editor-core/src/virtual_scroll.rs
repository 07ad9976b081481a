//! Virtual scrolling over a fixed-height item list.
//!
//! Only the items in the visible range (plus overscan on either side) are
//! mounted. Scroll events are coalesced to one recomputation per frame: each
//! scroll cancels the frame it scheduled last time and requests a new one, so
//! only the latest position is ever rendered.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use crate::error::VirtualScrollError;
use crate::surface::{
    FrameHandle, FrameScheduler, ItemContent, ItemLayout, ScrollBehavior, ScrollSurface,
};

/// Overscan used when none is given.
pub const DEFAULT_OVERSCAN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualScrollOptions {
    /// Height of every item in pixels.
    pub item_height: f64,
    /// Items rendered beyond each edge of the viewport. `None` means
    /// [`DEFAULT_OVERSCAN`]; `Some(0)` disables overscan.
    pub overscan: Option<usize>,
    pub total_items: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VirtualScrollState {
    pub start_index: usize,
    pub end_index: usize,
    pub visible_count: usize,
    pub scroll_top: f64,
    pub total_height: f64,
}

impl VirtualScrollState {
    /// Indices that should be mounted, or `None` if nothing should be.
    pub fn range(&self) -> Option<RangeInclusive<usize>> {
        (self.visible_count > 0).then(|| self.start_index..=self.end_index)
    }
}

/// Range covered by one viewport position: `(start_index, end_index, visible_count)`.
///
/// ```
/// use marktex_editor_core::visible_range;
///
/// assert_eq!(visible_range(500.0, 200.0, 20.0, 2, 1000), (23, 36, 14));
/// ```
pub fn visible_range(
    scroll_top: f64,
    viewport_height: f64,
    item_height: f64,
    overscan: usize,
    total_items: usize,
) -> (usize, usize, usize) {
    // f64 -> usize casts saturate, and negatives land on 0.
    let first = (scroll_top / item_height).floor() as usize;
    let start = first.saturating_sub(overscan);

    let in_viewport = (viewport_height / item_height).ceil() as usize;
    let count = total_items
        .saturating_sub(start)
        .min(in_viewport.saturating_add(overscan.saturating_mul(2)));

    let end = total_items
        .saturating_sub(1)
        .min((start + count).saturating_sub(1));
    (start, end, count)
}

pub type RenderItem<E> = Box<dyn FnMut(usize) -> ItemContent<E>>;

pub struct VirtualScroll<S: ScrollSurface, F: FrameScheduler> {
    surface: S,
    scheduler: F,
    item_height: f64,
    overscan: usize,
    total_items: usize,
    render_item: RenderItem<S::Element>,
    state: VirtualScrollState,
    mounted: BTreeSet<usize>,
    pending_frame: Option<FrameHandle>,
    destroyed: bool,
}

impl<S: ScrollSurface, F: FrameScheduler> VirtualScroll<S, F> {
    /// Take over `surface`: clear it, size the content, mount the first range
    /// and start listening.
    pub fn new(
        surface: S,
        scheduler: F,
        options: VirtualScrollOptions,
        render_item: impl FnMut(usize) -> ItemContent<S::Element> + 'static,
    ) -> Result<Self, VirtualScrollError> {
        if !options.item_height.is_finite() || options.item_height <= 0.0 {
            return Err(VirtualScrollError::InvalidItemHeight {
                height: options.item_height,
            });
        }

        let total_height = options.total_items as f64 * options.item_height;
        let mut scroll = Self {
            surface,
            scheduler,
            item_height: options.item_height,
            overscan: options.overscan.unwrap_or(DEFAULT_OVERSCAN),
            total_items: options.total_items,
            render_item: Box::new(render_item),
            state: VirtualScrollState {
                total_height,
                ..VirtualScrollState::default()
            },
            mounted: BTreeSet::new(),
            pending_frame: None,
            destroyed: false,
        };

        scroll.surface.reset(total_height);
        scroll.refresh();
        scroll.surface.attach_listeners();
        tracing::debug!(
            total_items = scroll.total_items,
            item_height = scroll.item_height,
            overscan = scroll.overscan,
            "virtual scroll attached"
        );
        Ok(scroll)
    }

    pub fn state(&self) -> &VirtualScrollState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn scheduler(&self) -> &F {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut F {
        &mut self.scheduler
    }

    /// Indices currently mounted on the surface, ascending.
    pub fn mounted(&self) -> impl Iterator<Item = usize> + '_ {
        self.mounted.iter().copied()
    }

    /// Scroll notification. Records the offset and reschedules the render.
    pub fn handle_scroll(&mut self) {
        if self.destroyed {
            return;
        }
        self.state.scroll_top = self.surface.scroll_top();
        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
        self.pending_frame = Some(self.scheduler.request_frame());
    }

    /// A scheduled frame fired. Frames other than the latest one are ignored.
    pub fn handle_frame(&mut self, handle: FrameHandle) {
        if self.destroyed || self.pending_frame != Some(handle) {
            tracing::trace!(?handle, "ignoring stale frame");
            return;
        }
        self.pending_frame = None;
        self.refresh();
    }

    /// The container changed size.
    pub fn handle_resize(&mut self) {
        if self.destroyed {
            return;
        }
        self.refresh();
    }

    pub fn scroll_to_index(&mut self, index: usize, behavior: ScrollBehavior) {
        self.surface
            .scroll_to(index as f64 * self.item_height, behavior);
    }

    pub fn update_total_items(&mut self, total_items: usize) {
        self.total_items = total_items;
        self.state.total_height = total_items as f64 * self.item_height;
        self.surface.set_content_height(self.state.total_height);
        self.refresh();
    }

    /// Stop listening and cancel any pending frame. Mounted items stay where
    /// they are.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.surface.detach_listeners();
        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
        tracing::debug!(mounted = self.mounted.len(), "virtual scroll destroyed");
    }

    fn refresh(&mut self) {
        self.compute();
        self.reconcile();
    }

    fn compute(&mut self) {
        let (start, end, count) = visible_range(
            self.state.scroll_top,
            self.surface.viewport_height(),
            self.item_height,
            self.overscan,
            self.total_items,
        );
        self.state.start_index = start;
        self.state.end_index = end;
        self.state.visible_count = count;
    }

    /// Unmount what left the range, mount what entered it, leave the rest.
    fn reconcile(&mut self) {
        let range = self.state.range();
        let in_range = |index: &usize| range.as_ref().is_some_and(|r| r.contains(index));

        let stale: Vec<usize> = self.mounted.iter().copied().filter(|i| !in_range(i)).collect();
        for index in &stale {
            self.surface.unmount_item(*index);
            self.mounted.remove(index);
        }

        let mut added = 0;
        if let Some(range) = range {
            for index in range {
                if self.mounted.insert(index) {
                    let content = (self.render_item)(index);
                    let layout = ItemLayout {
                        index,
                        top: index as f64 * self.item_height,
                        height: self.item_height,
                    };
                    self.surface.mount_item(layout, content);
                    added += 1;
                }
            }
        }

        tracing::trace!(
            start = self.state.start_index,
            end = self.state.end_index,
            added,
            removed = stale.len(),
            "virtual scroll reconciled"
        );
    }
}
