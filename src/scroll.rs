/// Default distance from the bottom, in pixels, at which more content is wanted.
pub const DEFAULT_THRESHOLD: u32 = 500;

/// Viewport measurements supplied by the host on each scroll or resize event.
///
/// Units are whatever the host measures in (pixels in a browser, rows in a
/// terminal); the threshold must use the same unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub viewport_height: u32,
    pub scroll_offset: u32,
    pub content_height: u32,
}

/// Turns geometry into an advisory "near bottom" signal. It may fire on every
/// event while near the bottom; the coordinator decides whether to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollTrigger {
    threshold: u32,
}

impl Default for ScrollTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl ScrollTrigger {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn near_bottom(&self, geometry: Geometry) -> bool {
        let seen = u64::from(geometry.scroll_offset) + u64::from(geometry.viewport_height);
        let target = u64::from(geometry.content_height).saturating_sub(u64::from(self.threshold));
        seen >= target
    }
}
