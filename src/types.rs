// Strong typing over raw ints and strings. Newtypes for pointer ids and timestamps,
// enums for channels, pointer actions, and verdicts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ArbiterError;

/// Timestamp in microseconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_micros(us: u64) -> Self {
        Timestamp(us)
    }
}

/// Touch pointer identifier, unique while the pointer is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct PointerId(u32);

impl PointerId {
    pub fn new(id: u32) -> Self {
        PointerId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for PointerId {
    fn from(id: u32) -> Self {
        PointerId(id)
    }
}

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Input channel competing for ownership of a touch pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// On-screen button.
    VirtualButton,
    /// On-screen joystick.
    VirtualJoystick,
    /// Touchpad-style virtual mouse.
    VirtualMouse,
    /// Touches delivered straight to the game.
    NativePassthrough,
    Unknown,
}

impl Channel {
    /// Every channel, highest priority first.
    pub const ALL: [Channel; 5] = [
        Channel::VirtualButton,
        Channel::VirtualJoystick,
        Channel::VirtualMouse,
        Channel::NativePassthrough,
        Channel::Unknown,
    ];

    /// Base priority. Only used as a tie-break between owners.
    pub fn priority(self) -> u8 {
        match self {
            Channel::VirtualButton => 100,
            Channel::VirtualJoystick => 90,
            Channel::VirtualMouse => 50,
            Channel::NativePassthrough => 10,
            Channel::Unknown => 0,
        }
    }

    /// Buttons and joysticks, as opposed to the mouse or pass-through.
    pub fn is_virtual_control(self) -> bool {
        matches!(self, Channel::VirtualButton | Channel::VirtualJoystick)
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::VirtualButton => "VirtualButton",
            Channel::VirtualJoystick => "VirtualJoystick",
            Channel::VirtualMouse => "VirtualMouse",
            Channel::NativePassthrough => "NativePassthrough",
            Channel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = ArbiterError;

    /// Accepts the variant name or its snake_case form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VirtualButton" | "virtual_button" => Ok(Channel::VirtualButton),
            "VirtualJoystick" | "virtual_joystick" => Ok(Channel::VirtualJoystick),
            "VirtualMouse" | "virtual_mouse" => Ok(Channel::VirtualMouse),
            "NativePassthrough" | "native_passthrough" => Ok(Channel::NativePassthrough),
            "Unknown" | "unknown" => Ok(Channel::Unknown),
            other => Err(ArbiterError::UnknownChannel(other.to_string())),
        }
    }
}

/// Outcome of a single rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Allow,
    Deny,
    /// No opinion, the next rule decides.
    Skip,
}

/// Axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    /// Edges are reordered if swapped and clamped to be non-negative.
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Rect {
            left: left.min(right).max(0.0),
            top: top.min(bottom).max(0.0),
            right: right.max(left).max(0.0),
            bottom: bottom.max(top).max(0.0),
        }
    }

    pub fn width(&self) -> f32 {
        (self.right - self.left).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.bottom - self.top).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Inclusive on the left/top edge, exclusive on the right/bottom edge.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }

    /// Overlapping part of two rectangles, `None` if they only touch or are disjoint.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right.min(other.right);
        let bottom = self.bottom.min(other.bottom);

        if left < right && top < bottom {
            Some(Rect {
                left,
                top,
                right,
                bottom,
            })
        } else {
            None
        }
    }

    pub fn overlap_area(&self, other: &Rect) -> f32 {
        self.intersection(other).map(|r| r.area()).unwrap_or(0.0)
    }
}

/// Virtual mouse movement extents, as fractions of the half-screen measured outward
/// from the screen center. `1.0` on every side is the full screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MouseRange {
    #[serde(default = "default_range_fraction")]
    pub left: f32,
    #[serde(default = "default_range_fraction")]
    pub top: f32,
    #[serde(default = "default_range_fraction")]
    pub right: f32,
    #[serde(default = "default_range_fraction")]
    pub bottom: f32,
}

impl MouseRange {
    /// Fractions are clamped to 0-1.
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        MouseRange {
            left: clamp_fraction(left),
            top: clamp_fraction(top),
            right: clamp_fraction(right),
            bottom: clamp_fraction(bottom),
        }
    }

    pub fn full() -> Self {
        MouseRange::new(1.0, 1.0, 1.0, 1.0)
    }
}

impl Default for MouseRange {
    fn default() -> Self {
        MouseRange::full()
    }
}

fn clamp_fraction(value: f32) -> f32 {
    // NaN would otherwise survive clamp.
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn default_range_fraction() -> f32 {
    1.0
}

/// Lifecycle phase of a raw pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerAction {
    Down,
    Move,
    Up,
    Cancel,
}

impl PointerAction {
    /// Up and Cancel end the touch.
    pub fn ends_touch(self) -> bool {
        matches!(self, PointerAction::Up | PointerAction::Cancel)
    }
}

/// Already-decoded raw pointer event from the input capture layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    #[serde(default)]
    pub timestamp: Timestamp,
    pub action: PointerAction,
    /// Pointer the action applies to.
    pub pointer: PointerId,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

impl PointerEvent {
    pub fn new(action: PointerAction, pointer: PointerId, x: f32, y: f32) -> Self {
        PointerEvent {
            timestamp: Timestamp::default(),
            action,
            pointer,
            x,
            y,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ArbiterError> {
        serde_json::from_str(json).map_err(|e| ArbiterError::InvalidEvent(e.to_string()))
    }
}

/// Dispatcher configuration, usually handed over by the settings layer as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbiterConfig {
    /// Share of the mouse range that occupied regions may cover before the mouse is denied.
    #[serde(default = "default_overlap_threshold")]
    pub mouse_overlap_threshold: f32,
    #[serde(default)]
    pub mouse_range: MouseRange,
    #[serde(default)]
    pub user_disabled_virtual_mouse: bool,
    /// Emit a debug log line for every facade call.
    #[serde(default)]
    pub debug_logging: bool,
}

fn default_overlap_threshold() -> f32 {
    0.10
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        ArbiterConfig {
            mouse_overlap_threshold: default_overlap_threshold(),
            mouse_range: MouseRange::default(),
            user_disabled_virtual_mouse: false,
            debug_logging: false,
        }
    }
}

impl ArbiterConfig {
    pub fn from_json(json: &str) -> Result<Self, ArbiterError> {
        let config: ArbiterConfig =
            serde_json::from_str(json).map_err(|e| ArbiterError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ArbiterError> {
        let t = self.mouse_overlap_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(ArbiterError::InvalidConfig(format!(
                "mouse_overlap_threshold must be within 0-1, got {}",
                t
            )));
        }
        Ok(())
    }
}

/// One row of the ownership table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerEntry {
    pub pointer: PointerId,
    pub channel: Channel,
}

/// Serializable view of a dispatcher, for host-side debugging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherSnapshot {
    pub screen_width: u32,
    pub screen_height: u32,
    pub virtual_controls_enabled: bool,
    pub virtual_mouse_enabled: bool,
    pub user_disabled_virtual_mouse: bool,
    pub active_control_id: Option<String>,
    pub mouse_range: MouseRange,
    pub occupied_regions: Vec<Rect>,
    /// Sorted by pointer id.
    pub owners: Vec<OwnerEntry>,
    /// Rule names in evaluation order.
    pub rules: Vec<String>,
}
