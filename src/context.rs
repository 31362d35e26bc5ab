// Live arbitration state for one game session: geometry, enable flags, the
// active control, the virtual mouse range, and regions covered by controls.

use crate::types::*;

/// Mutable state the rules read when deciding.
///
/// Owned by the dispatcher and mutated only through it. Rules get a shared
/// reference, so evaluation cannot change it; `snapshot()` gives a deep copy
/// for anything that must outlive the current call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArbitrationContext {
    screen_width: u32,
    screen_height: u32,
    virtual_mouse_enabled: bool,
    virtual_controls_enabled: bool,
    active_control_id: Option<String>,
    mouse_range: MouseRange,
    occupied_regions: Vec<Rect>,
    user_disabled_virtual_mouse: bool,
    last_event: Option<PointerEvent>,
}

impl ArbitrationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep copy. Nothing is shared with `self` afterwards.
    pub fn snapshot(&self) -> ArbitrationContext {
        self.clone()
    }

    /// Negative dimensions are stored as zero.
    pub fn set_screen_size(&mut self, width: i32, height: i32) {
        self.screen_width = width.max(0) as u32;
        self.screen_height = height.max(0) as u32;
    }

    pub fn screen_width(&self) -> u32 {
        self.screen_width
    }

    pub fn screen_height(&self) -> u32 {
        self.screen_height
    }

    pub fn is_initialized(&self) -> bool {
        self.screen_width > 0 && self.screen_height > 0
    }

    pub fn virtual_mouse_enabled(&self) -> bool {
        self.virtual_mouse_enabled
    }

    pub fn set_virtual_mouse_enabled(&mut self, enabled: bool) {
        self.virtual_mouse_enabled = enabled;
    }

    pub fn virtual_controls_enabled(&self) -> bool {
        self.virtual_controls_enabled
    }

    pub fn set_virtual_controls_enabled(&mut self, enabled: bool) {
        self.virtual_controls_enabled = enabled;
    }

    pub fn active_control_id(&self) -> Option<&str> {
        self.active_control_id.as_deref()
    }

    pub fn set_active_control_id(&mut self, id: Option<String>) {
        self.active_control_id = id;
    }

    pub fn mouse_range(&self) -> MouseRange {
        self.mouse_range
    }

    /// Fractions are clamped to 0-1 whatever path built `range`.
    pub fn set_mouse_range(&mut self, range: MouseRange) {
        self.mouse_range = MouseRange::new(range.left, range.top, range.right, range.bottom);
    }

    pub fn occupied_regions(&self) -> &[Rect] {
        &self.occupied_regions
    }

    /// Stored with edges ordered and clamped to be non-negative.
    pub fn add_occupied_region(&mut self, rect: Rect) {
        self.occupied_regions
            .push(Rect::new(rect.left, rect.top, rect.right, rect.bottom));
    }

    pub fn clear_occupied_regions(&mut self) {
        self.occupied_regions.clear();
    }

    pub fn user_disabled_virtual_mouse(&self) -> bool {
        self.user_disabled_virtual_mouse
    }

    pub fn set_user_disabled_virtual_mouse(&mut self, disabled: bool) {
        self.user_disabled_virtual_mouse = disabled;
    }

    pub fn last_event(&self) -> Option<&PointerEvent> {
        self.last_event.as_ref()
    }

    pub fn set_last_event(&mut self, event: PointerEvent) {
        self.last_event = Some(event);
    }

    /// Whether any occupied region contains the point.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.occupied_regions.iter().any(|r| r.contains(x, y))
    }

    /// Pixel rectangle the virtual mouse may move in.
    ///
    /// Each fraction extends from the screen center toward its edge, so with
    /// zero screen dimensions the result is an empty rectangle at the origin.
    pub fn mouse_range_bounds(&self) -> Rect {
        let center_x = self.screen_width as f32 * 0.5;
        let center_y = self.screen_height as f32 * 0.5;
        let range = self.mouse_range;

        Rect::new(
            center_x - range.left * center_x,
            center_y - range.top * center_y,
            center_x + range.right * center_x,
            center_y + range.bottom * center_y,
        )
    }

    /// Total area of occupied regions overlapping the mouse range.
    /// Overlapping regions are counted once each, not merged.
    pub fn mouse_range_overlap(&self) -> f32 {
        let bounds = self.mouse_range_bounds();
        self.occupied_regions
            .iter()
            .map(|r| bounds.overlap_area(r))
            .sum()
    }
}
