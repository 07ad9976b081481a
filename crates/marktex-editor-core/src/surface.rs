//! Host abstraction traits for the virtual scroll engine.
//!
//! The engine never touches a real UI. A browser host backs [`ScrollSurface`]
//! with the DOM and [`FrameScheduler`] with `requestAnimationFrame`; a terminal
//! or test host can use [`crate::headless`].

/// How a programmatic scroll should move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBehavior {
    #[default]
    Auto,
    Smooth,
    Instant,
}

/// Where a mounted item sits inside the scrollable content. Items are always
/// full width, starting at the left edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemLayout {
    pub index: usize,
    pub top: f64,
    pub height: f64,
}

/// What `render_item` hands back for one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemContent<E> {
    /// A ready-made host element, positioned as is.
    Element(E),
    /// Markup for the host to wrap in a container node.
    Html(String),
}

impl<E> From<String> for ItemContent<E> {
    fn from(html: String) -> Self {
        Self::Html(html)
    }
}

/// The scroll container and the positioned content surface inside it.
pub trait ScrollSurface {
    type Element;

    /// Current vertical scroll offset in pixels.
    fn scroll_top(&self) -> f64;

    /// Height of the visible viewport in pixels.
    fn viewport_height(&self) -> f64;

    /// Clear the container and install an empty, relatively positioned content
    /// surface `content_height` pixels tall.
    fn reset(&mut self, content_height: f64);

    fn set_content_height(&mut self, content_height: f64);

    /// Add an item, absolutely positioned per `layout` and tagged with its index.
    fn mount_item(&mut self, layout: ItemLayout, content: ItemContent<Self::Element>);

    /// Remove the item tagged with `index`, if present.
    fn unmount_item(&mut self, index: usize);

    fn scroll_to(&mut self, top: f64, behavior: ScrollBehavior);

    /// Start delivering scroll and resize notifications to the engine.
    fn attach_listeners(&mut self);

    fn detach_listeners(&mut self);
}

/// Opaque id of a scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Deferred "run once before the next frame" callbacks.
///
/// When a requested frame fires, the host calls
/// [`VirtualScroll::handle_frame`](crate::VirtualScroll::handle_frame) with its
/// handle.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}
