//! marktex-editor-core: editor-side logic without a UI framework.
//!
//! Currently this is the virtual scroll engine used by the preview pane. The
//! host supplies a [`ScrollSurface`] and a [`FrameScheduler`]; [`headless`] has
//! in-memory versions of both.

pub mod error;
pub mod headless;
pub mod surface;
pub mod virtual_scroll;

pub use error::VirtualScrollError;
pub use headless::{ManualScheduler, MemorySurface, MountedItem};
pub use surface::{
    FrameHandle, FrameScheduler, ItemContent, ItemLayout, ScrollBehavior, ScrollSurface,
};
pub use virtual_scroll::{
    DEFAULT_OVERSCAN, RenderItem, VirtualScroll, VirtualScrollOptions, VirtualScrollState,
    visible_range,
};
