// Default arbitration policies, highest priority first:
// user preference, control exclusivity, mouse mutex, mouse range conflict, touch priority.

use crate::context::ArbitrationContext;
use crate::rule::{shared, Rule, SharedRule};
use crate::types::*;

pub const USER_PREFERENCE_RULE_PRIORITY: i32 = 200;
pub const VIRTUAL_CONTROL_EXCLUSIVE_RULE_PRIORITY: i32 = 100;
pub const VIRTUAL_MOUSE_MUTEX_RULE_PRIORITY: i32 = 90;
pub const MOUSE_RANGE_CONFLICT_RULE_PRIORITY: i32 = 85;
pub const TOUCH_PRIORITY_RULE_PRIORITY: i32 = 80;

/// Overlap share above which the virtual mouse is denied.
pub const DEFAULT_OVERLAP_THRESHOLD: f32 = 0.10;

/// The default rule set, in registration order.
pub fn default_rules(overlap_threshold: f32) -> Vec<SharedRule> {
    vec![
        shared(UserPreferenceRule),
        shared(VirtualControlExclusiveRule),
        shared(VirtualMouseMutexRule),
        shared(MouseRangeConflictRule::with_threshold(overlap_threshold)),
        shared(TouchPriorityRule),
    ]
}

/// The user turning the virtual mouse off in settings beats everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserPreferenceRule;

impl Rule for UserPreferenceRule {
    fn name(&self) -> &str {
        "UserPreference"
    }

    fn priority(&self) -> i32 {
        USER_PREFERENCE_RULE_PRIORITY
    }

    fn evaluate(&self, _: Option<PointerId>, channel: Channel, ctx: &ArbitrationContext) -> Verdict {
        if channel == Channel::VirtualMouse && ctx.user_disabled_virtual_mouse() {
            Verdict::Deny
        } else {
            Verdict::Skip
        }
    }
}

/// Virtual controls own their touches exclusively.
///
/// Enforced by the owner priority check in the engine before the chain runs;
/// this rule always skips and exists so the policy can be overridden.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualControlExclusiveRule;

impl Rule for VirtualControlExclusiveRule {
    fn name(&self) -> &str {
        "VirtualControlExclusive"
    }

    fn priority(&self) -> i32 {
        VIRTUAL_CONTROL_EXCLUSIVE_RULE_PRIORITY
    }

    fn evaluate(&self, _: Option<PointerId>, _: Channel, _: &ArbitrationContext) -> Verdict {
        Verdict::Skip
    }
}

/// Virtual controls and the virtual mouse do not run at the same time.
/// Controls win in both directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualMouseMutexRule;

impl Rule for VirtualMouseMutexRule {
    fn name(&self) -> &str {
        "VirtualMouseMutex"
    }

    fn priority(&self) -> i32 {
        VIRTUAL_MOUSE_MUTEX_RULE_PRIORITY
    }

    fn evaluate(&self, _: Option<PointerId>, channel: Channel, ctx: &ArbitrationContext) -> Verdict {
        match channel {
            Channel::VirtualMouse
                if ctx.virtual_controls_enabled() && !ctx.virtual_mouse_enabled() =>
            {
                Verdict::Deny
            }
            c if c.is_virtual_control() && ctx.virtual_mouse_enabled() => Verdict::Allow,
            _ => Verdict::Skip,
        }
    }
}

/// Deny the virtual mouse when visible controls cover too much of its range.
#[derive(Debug, Clone, Copy)]
pub struct MouseRangeConflictRule {
    threshold: f32,
}

impl MouseRangeConflictRule {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_OVERLAP_THRESHOLD)
    }

    /// `threshold` is the overlap share of the mouse range, clamped to 0-1.
    pub fn with_threshold(threshold: f32) -> Self {
        let threshold = if threshold.is_nan() {
            DEFAULT_OVERLAP_THRESHOLD
        } else {
            threshold.clamp(0.0, 1.0)
        };
        MouseRangeConflictRule { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Overlap divided by mouse range area, 0 when the range is empty.
    pub fn overlap_ratio(ctx: &ArbitrationContext) -> f32 {
        let area = ctx.mouse_range_bounds().area();
        if area <= 0.0 {
            return 0.0;
        }
        ctx.mouse_range_overlap() / area
    }
}

impl Default for MouseRangeConflictRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for MouseRangeConflictRule {
    fn name(&self) -> &str {
        "MouseRangeConflict"
    }

    fn priority(&self) -> i32 {
        MOUSE_RANGE_CONFLICT_RULE_PRIORITY
    }

    fn evaluate(&self, _: Option<PointerId>, channel: Channel, ctx: &ArbitrationContext) -> Verdict {
        if channel != Channel::VirtualMouse {
            return Verdict::Skip;
        }
        if ctx.occupied_regions().is_empty() {
            return Verdict::Allow;
        }

        if Self::overlap_ratio(ctx) > self.threshold {
            Verdict::Deny
        } else {
            Verdict::Allow
        }
    }
}

/// Higher-priority channels preempt lower ones.
///
/// Like [`VirtualControlExclusiveRule`], the engine's owner check enforces this
/// and the rule always skips.
#[derive(Debug, Clone, Copy, Default)]
pub struct TouchPriorityRule;

impl Rule for TouchPriorityRule {
    fn name(&self) -> &str {
        "TouchPriority"
    }

    fn priority(&self) -> i32 {
        TOUCH_PRIORITY_RULE_PRIORITY
    }

    fn evaluate(&self, _: Option<PointerId>, _: Channel, _: &ArbitrationContext) -> Verdict {
        Verdict::Skip
    }
}
