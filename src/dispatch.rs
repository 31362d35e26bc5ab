// Dispatch facade: the single entry point for the input capture layer, the
// control renderer, and the settings layer. One instance per game session.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use wasm_bindgen::prelude::*;

use crate::context::ArbitrationContext;
use crate::engine::RuleEngine;
use crate::error::ArbiterError;
use crate::rule::{Rule, SharedRule};
use crate::types::*;

/// Session-level arbitration facade.
///
/// Owns the context and the rule engine; nothing else mutates them.
#[derive(Debug)]
pub struct TouchDispatcher {
    context: ArbitrationContext,
    engine: RuleEngine,
    debug_enabled: bool,
}

impl TouchDispatcher {
    pub fn new() -> Self {
        Self::with_config(ArbiterConfig::default())
    }

    pub fn with_config(config: ArbiterConfig) -> Self {
        let mut context = ArbitrationContext::new();
        context.set_mouse_range(config.mouse_range);
        context.set_user_disabled_virtual_mouse(config.user_disabled_virtual_mouse);

        TouchDispatcher {
            context,
            engine: RuleEngine::new(config.mouse_overlap_threshold),
            debug_enabled: config.debug_logging,
        }
    }

    pub fn from_json(config_json: &str) -> Result<Self, ArbiterError> {
        Ok(Self::with_config(ArbiterConfig::from_json(config_json)?))
    }

    /// Set screen geometry. Non-positive sizes leave the mouse range empty.
    pub fn initialize(&mut self, width: i32, height: i32) {
        self.context.set_screen_size(width, height);
        self.log_debug(format_args!("initialized with screen size {}x{}", width, height));
    }

    /// Check and, if allowed, record ownership of `pointer` by `channel`.
    pub fn request_ownership(&mut self, pointer: PointerId, channel: Channel) -> bool {
        let granted = self.engine.can_claim(pointer, channel, &self.context);
        if granted {
            self.engine.grant(pointer, channel);
            self.log_debug(format_args!("touch {} granted to {}", pointer, channel));
        } else {
            self.log_debug(format_args!("touch {} denied for {}", pointer, channel));
        }
        granted
    }

    /// Whether `channel` may claim `pointer`, without recording anything.
    pub fn can_claim(&mut self, pointer: PointerId, channel: Channel) -> bool {
        self.engine.can_claim(pointer, channel, &self.context)
    }

    /// Inverse of [`can_claim`](Self::can_claim).
    pub fn is_touch_occupied(&mut self, pointer: PointerId, channel: Channel) -> bool {
        !self.can_claim(pointer, channel)
    }

    pub fn release_ownership(&mut self, pointer: PointerId) {
        self.engine.release(pointer);
        self.log_debug(format_args!("touch {} released", pointer));
    }

    /// Observe a raw pointer event. Up and Cancel release that pointer.
    ///
    /// Returns whether the event was consumed, which is never: the engine
    /// only arbitrates, delivery is up to the caller.
    pub fn on_raw_pointer_event(&mut self, event: PointerEvent) -> bool {
        self.context.set_last_event(event);
        if event.action.ends_touch() {
            if let Some(owner) = self.engine.release(event.pointer) {
                self.log_debug(format_args!(
                    "touch {} {:?}, released from {}",
                    event.pointer, event.action, owner
                ));
            }
        }
        false
    }

    /// Make `control_id` the active control if the rules allow it.
    pub fn request_activate_control(&mut self, control_id: &str) -> bool {
        self.context.set_active_control_id(Some(control_id.to_string()));
        let allowed = self.engine.can_activate_control(control_id, &self.context);
        if allowed {
            self.context.set_virtual_controls_enabled(true);
            self.log_debug(format_args!("virtual control enabled: {}", control_id));
        } else {
            self.log_debug(format_args!("virtual control denied: {}", control_id));
        }
        allowed
    }

    pub fn deactivate_control(&mut self) {
        self.context.set_active_control_id(None);
        self.context.set_virtual_controls_enabled(false);
        self.log_debug(format_args!("virtual control disabled"));
    }

    /// Fractions of the half-screen from the center, each clamped to 0-1.
    pub fn set_mouse_range(&mut self, left: f32, top: f32, right: f32, bottom: f32) {
        self.context
            .set_mouse_range(MouseRange::new(left, top, right, bottom));
        self.log_debug(format_args!(
            "mouse range set: L={} T={} R={} B={}",
            left, top, right, bottom
        ));
    }

    pub fn add_occupied_region(&mut self, rect: Rect) {
        self.context.add_occupied_region(rect);
        if let Some(stored) = self.context.occupied_regions().last() {
            self.log_debug(format_args!(
                "added occupied region ({},{})-({},{})",
                stored.left, stored.top, stored.right, stored.bottom
            ));
        }
    }

    pub fn clear_occupied_regions(&mut self) {
        self.context.clear_occupied_regions();
        self.log_debug(format_args!("cleared occupied regions"));
    }

    pub fn is_point_in_occupied_region(&self, x: f32, y: f32) -> bool {
        self.context.contains_point(x, y)
    }

    pub fn set_user_disabled_virtual_mouse(&mut self, disabled: bool) {
        self.context.set_user_disabled_virtual_mouse(disabled);
        self.log_debug(format_args!("user disabled virtual mouse: {}", disabled));
    }

    pub fn set_virtual_mouse_enabled(&mut self, enabled: bool) {
        self.context.set_virtual_mouse_enabled(enabled);
        self.log_debug(format_args!("virtual mouse enabled: {}", enabled));
    }

    /// `None` is ignored.
    pub fn add_rule(&mut self, rule: impl Into<Option<SharedRule>>) {
        if let Some(rule) = rule.into() {
            self.log_debug(format_args!("added rule {}", rule.name()));
            self.engine.add_rule(rule);
        }
    }

    pub fn remove_rule(&mut self, rule: &SharedRule) -> bool {
        let removed = self.engine.remove_rule(rule);
        if removed {
            self.log_debug(format_args!("removed rule {}", rule.name()));
        }
        removed
    }

    /// Removes every rule, the defaults included.
    pub fn clear_rules(&mut self) {
        self.engine.clear_rules();
        self.log_debug(format_args!("cleared all rules"));
    }

    /// Clear ownership and deactivate controls. Rules and geometry stay.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.context.set_virtual_controls_enabled(false);
        self.context.set_active_control_id(None);
        self.log_debug(format_args!("dispatcher reset"));
    }

    pub fn set_debug_enabled(&mut self, enabled: bool) {
        self.debug_enabled = enabled;
    }

    pub fn owner_of(&self, pointer: PointerId) -> Option<Channel> {
        self.engine.owner_of(pointer)
    }

    pub fn occupied_pointer_count(&self) -> usize {
        self.engine.occupied_count()
    }

    pub fn virtual_controls_enabled(&self) -> bool {
        self.context.virtual_controls_enabled()
    }

    pub fn active_control_id(&self) -> Option<&str> {
        self.context.active_control_id()
    }

    /// Read-only view of the live context.
    pub fn context(&self) -> &ArbitrationContext {
        &self.context
    }

    /// Rule names in evaluation order.
    pub fn rule_names(&self) -> Vec<String> {
        self.engine.rule_names()
    }

    pub fn snapshot(&self) -> DispatcherSnapshot {
        DispatcherSnapshot {
            screen_width: self.context.screen_width(),
            screen_height: self.context.screen_height(),
            virtual_controls_enabled: self.context.virtual_controls_enabled(),
            virtual_mouse_enabled: self.context.virtual_mouse_enabled(),
            user_disabled_virtual_mouse: self.context.user_disabled_virtual_mouse(),
            active_control_id: self.context.active_control_id().map(str::to_string),
            mouse_range: self.context.mouse_range(),
            occupied_regions: self.context.occupied_regions().to_vec(),
            owners: self.engine.owners(),
            rules: self.engine.rule_names(),
        }
    }

    fn log_debug(&self, args: std::fmt::Arguments<'_>) {
        if self.debug_enabled {
            log::debug!("{}", args);
        }
    }
}

impl Default for TouchDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle for embeddings that touch the dispatcher from more than
/// one thread. Every call holds the lock for its own duration only.
#[derive(Debug, Clone, Default)]
pub struct SharedDispatcher {
    inner: Arc<Mutex<TouchDispatcher>>,
}

impl SharedDispatcher {
    pub fn new(dispatcher: TouchDispatcher) -> Self {
        SharedDispatcher {
            inner: Arc::new(Mutex::new(dispatcher)),
        }
    }

    /// Hold the lock across several operations. Keep the guard short-lived.
    pub fn lock(&self) -> MutexGuard<'_, TouchDispatcher> {
        self.inner.lock()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut TouchDispatcher) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut *guard)
    }

    pub fn initialize(&self, width: i32, height: i32) {
        self.with(|d| d.initialize(width, height))
    }

    pub fn request_ownership(&self, pointer: PointerId, channel: Channel) -> bool {
        self.with(|d| d.request_ownership(pointer, channel))
    }

    pub fn release_ownership(&self, pointer: PointerId) {
        self.with(|d| d.release_ownership(pointer))
    }

    pub fn on_raw_pointer_event(&self, event: PointerEvent) -> bool {
        self.with(|d| d.on_raw_pointer_event(event))
    }

    pub fn request_activate_control(&self, control_id: &str) -> bool {
        self.with(|d| d.request_activate_control(control_id))
    }

    pub fn deactivate_control(&self) {
        self.with(|d| d.deactivate_control())
    }

    pub fn add_occupied_region(&self, rect: Rect) {
        self.with(|d| d.add_occupied_region(rect))
    }

    pub fn clear_occupied_regions(&self) {
        self.with(|d| d.clear_occupied_regions())
    }

    pub fn reset(&self) {
        self.with(|d| d.reset())
    }
}

// =============================================================================
// WASM Bindings
// =============================================================================

/// WASM-exposed dispatcher for a JavaScript host.
///
/// # Example JSON Config
/// ```json
/// {
///   "mouse_overlap_threshold": 0.1,
///   "mouse_range": { "left": 1.0, "top": 1.0, "right": 1.0, "bottom": 1.0 },
///   "user_disabled_virtual_mouse": false,
///   "debug_logging": false
/// }
/// ```
#[wasm_bindgen]
pub struct WasmTouchDispatcher {
    inner: TouchDispatcher,
}

#[wasm_bindgen]
impl WasmTouchDispatcher {
    /// Create a dispatcher from JSON configuration. Missing fields take defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmTouchDispatcher, JsValue> {
        let inner = TouchDispatcher::from_json(config_json).map_err(to_js_error)?;
        Ok(WasmTouchDispatcher { inner })
    }

    #[wasm_bindgen]
    pub fn initialize(&mut self, width: i32, height: i32) {
        self.inner.initialize(width, height);
    }

    /// # Arguments
    /// * `pointer` - Touch pointer id
    /// * `channel` - Channel name, e.g. `"VirtualMouse"` or `"virtual_mouse"`
    #[wasm_bindgen]
    pub fn request_ownership(&mut self, pointer: u32, channel: &str) -> Result<bool, JsValue> {
        let channel: Channel = channel.parse().map_err(to_js_error)?;
        Ok(self.inner.request_ownership(PointerId::new(pointer), channel))
    }

    #[wasm_bindgen]
    pub fn release_ownership(&mut self, pointer: u32) {
        self.inner.release_ownership(PointerId::new(pointer));
    }

    /// Name of the channel owning `pointer`, if any.
    #[wasm_bindgen]
    pub fn owner_of(&self, pointer: u32) -> Option<String> {
        self.inner
            .owner_of(PointerId::new(pointer))
            .map(|c| c.name().to_string())
    }

    /// # Arguments
    /// * `event_json` - `{ "action": "Up", "pointer": 3, "x": 10.0, "y": 20.0 }`
    #[wasm_bindgen]
    pub fn on_raw_pointer_event(&mut self, event_json: &str) -> Result<bool, JsValue> {
        let event = PointerEvent::from_json(event_json).map_err(to_js_error)?;
        Ok(self.inner.on_raw_pointer_event(event))
    }

    #[wasm_bindgen]
    pub fn request_activate_control(&mut self, control_id: &str) -> bool {
        self.inner.request_activate_control(control_id)
    }

    #[wasm_bindgen]
    pub fn deactivate_control(&mut self) {
        self.inner.deactivate_control();
    }

    #[wasm_bindgen]
    pub fn set_mouse_range(&mut self, left: f32, top: f32, right: f32, bottom: f32) {
        self.inner.set_mouse_range(left, top, right, bottom);
    }

    /// Region edges in pixels.
    #[wasm_bindgen]
    pub fn add_occupied_region(&mut self, left: f32, top: f32, right: f32, bottom: f32) {
        self.inner
            .add_occupied_region(Rect::new(left, top, right, bottom));
    }

    #[wasm_bindgen]
    pub fn clear_occupied_regions(&mut self) {
        self.inner.clear_occupied_regions();
    }

    #[wasm_bindgen]
    pub fn is_point_in_occupied_region(&self, x: f32, y: f32) -> bool {
        self.inner.is_point_in_occupied_region(x, y)
    }

    #[wasm_bindgen]
    pub fn set_user_disabled_virtual_mouse(&mut self, disabled: bool) {
        self.inner.set_user_disabled_virtual_mouse(disabled);
    }

    #[wasm_bindgen]
    pub fn set_virtual_mouse_enabled(&mut self, enabled: bool) {
        self.inner.set_virtual_mouse_enabled(enabled);
    }

    #[wasm_bindgen]
    pub fn set_debug_enabled(&mut self, enabled: bool) {
        self.inner.set_debug_enabled(enabled);
    }

    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Current state as JSON (see `DispatcherSnapshot`).
    #[wasm_bindgen]
    pub fn to_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.snapshot())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

fn to_js_error(err: ArbiterError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::shared;
    use proptest::prelude::*;

    fn p(id: u32) -> PointerId {
        PointerId::new(id)
    }

    /// Rule that denies everything for one channel.
    #[derive(Debug)]
    struct Veto(Channel);

    impl Rule for Veto {
        fn name(&self) -> &str {
            "Veto"
        }

        fn priority(&self) -> i32 {
            500
        }

        fn evaluate(&self, _: Option<PointerId>, channel: Channel, _: &ArbitrationContext) -> Verdict {
            if channel == self.0 {
                Verdict::Deny
            } else {
                Verdict::Skip
            }
        }
    }

    fn full_screen_dispatcher() -> TouchDispatcher {
        let mut dispatcher = TouchDispatcher::new();
        dispatcher.initialize(1000, 2000);
        dispatcher.set_mouse_range(1.0, 1.0, 1.0, 1.0);
        dispatcher
    }

    #[test]
    fn small_occupied_region_allows_mouse() {
        let mut dispatcher = full_screen_dispatcher();
        dispatcher.add_occupied_region(Rect::new(0.0, 0.0, 200.0, 200.0));

        assert_eq!(
            dispatcher.context().mouse_range_bounds(),
            Rect::new(0.0, 0.0, 1000.0, 2000.0)
        );
        assert!(dispatcher.can_claim(p(5), Channel::VirtualMouse));
    }

    #[test]
    fn large_occupied_region_denies_mouse() {
        let mut dispatcher = full_screen_dispatcher();
        dispatcher.add_occupied_region(Rect::new(0.0, 0.0, 400.0, 2000.0));

        assert!(!dispatcher.can_claim(p(5), Channel::VirtualMouse));
        assert!(!dispatcher.request_ownership(p(5), Channel::VirtualMouse));
        assert_eq!(dispatcher.owner_of(p(5)), None);

        // Buttons are unaffected by the mouse range.
        assert!(dispatcher.request_ownership(p(5), Channel::VirtualButton));

        dispatcher.clear_occupied_regions();
        assert!(dispatcher.can_claim(p(6), Channel::VirtualMouse));
    }

    #[test]
    fn config_mouse_range_is_clamped() {
        let mut dispatcher = TouchDispatcher::from_json(
            r#"{"mouse_range":{"left":-1.0,"top":1.0,"right":1.0,"bottom":1.0}}"#,
        )
        .unwrap();
        dispatcher.initialize(1000, 2000);
        dispatcher.add_occupied_region(Rect::new(0.0, 0.0, 1000.0, 2000.0));

        assert_eq!(dispatcher.context().mouse_range().left, 0.0);
        assert_eq!(
            dispatcher.context().mouse_range_bounds(),
            Rect::new(500.0, 0.0, 1000.0, 2000.0)
        );
        assert!(!dispatcher.can_claim(p(0), Channel::VirtualMouse));
    }

    #[test]
    fn struct_literal_region_is_normalized() {
        let mut dispatcher = full_screen_dispatcher();
        dispatcher.add_occupied_region(Rect {
            left: 200.0,
            top: 300.0,
            right: 0.0,
            bottom: 100.0,
        });

        assert_eq!(
            dispatcher.context().occupied_regions(),
            &[Rect::new(0.0, 100.0, 200.0, 300.0)]
        );
        assert!(dispatcher.is_point_in_occupied_region(50.0, 150.0));
    }

    #[test]
    fn button_owned_pointer_released_then_mouse() {
        let mut dispatcher = full_screen_dispatcher();
        assert!(dispatcher.request_ownership(p(3), Channel::VirtualButton));
        assert!(!dispatcher.can_claim(p(3), Channel::VirtualMouse));
        assert!(dispatcher.is_touch_occupied(p(3), Channel::VirtualMouse));

        dispatcher.release_ownership(p(3));
        assert!(dispatcher.can_claim(p(3), Channel::VirtualMouse));
    }

    #[test]
    fn higher_priority_preempts_owner() {
        let mut dispatcher = full_screen_dispatcher();
        assert!(dispatcher.request_ownership(p(1), Channel::NativePassthrough));
        assert!(dispatcher.request_ownership(p(1), Channel::VirtualJoystick));
        assert_eq!(dispatcher.owner_of(p(1)), Some(Channel::VirtualJoystick));

        assert!(!dispatcher.request_ownership(p(1), Channel::NativePassthrough));
        assert_eq!(dispatcher.owner_of(p(1)), Some(Channel::VirtualJoystick));
    }

    #[test]
    fn preempt_can_be_vetoed_by_rule() {
        let mut dispatcher = full_screen_dispatcher();
        dispatcher.add_rule(shared(Veto(Channel::VirtualButton)));

        assert!(dispatcher.request_ownership(p(1), Channel::VirtualMouse));
        assert!(!dispatcher.request_ownership(p(1), Channel::VirtualButton));
        assert_eq!(dispatcher.owner_of(p(1)), Some(Channel::VirtualMouse));
    }

    #[test]
    fn pointer_up_and_cancel_release() {
        let mut dispatcher = full_screen_dispatcher();
        dispatcher.request_ownership(p(1), Channel::VirtualButton);
        dispatcher.request_ownership(p(2), Channel::VirtualJoystick);

        let down = PointerEvent::new(PointerAction::Down, p(1), 10.0, 10.0);
        let moved = PointerEvent::new(PointerAction::Move, p(1), 12.0, 10.0);
        assert!(!dispatcher.on_raw_pointer_event(down));
        assert!(!dispatcher.on_raw_pointer_event(moved));
        assert_eq!(dispatcher.owner_of(p(1)), Some(Channel::VirtualButton));

        let up = PointerEvent::new(PointerAction::Up, p(1), 12.0, 10.0);
        assert!(!dispatcher.on_raw_pointer_event(up));
        assert_eq!(dispatcher.owner_of(p(1)), None);
        assert_eq!(dispatcher.owner_of(p(2)), Some(Channel::VirtualJoystick));

        let cancel = PointerEvent::new(PointerAction::Cancel, p(2), 0.0, 0.0);
        dispatcher.on_raw_pointer_event(cancel);
        assert_eq!(dispatcher.occupied_pointer_count(), 0);
        assert_eq!(dispatcher.context().last_event(), Some(&cancel));
    }

    #[test]
    fn releasing_unknown_pointer_is_silent() {
        let mut dispatcher = TouchDispatcher::new();
        dispatcher.release_ownership(p(42));
        dispatcher.on_raw_pointer_event(PointerEvent::new(PointerAction::Up, p(42), 0.0, 0.0));
        assert_eq!(dispatcher.occupied_pointer_count(), 0);
    }

    #[test]
    fn active_control_blocks_mouse() {
        let mut dispatcher = full_screen_dispatcher();
        assert!(dispatcher.request_activate_control("dpad"));
        assert!(dispatcher.virtual_controls_enabled());
        assert_eq!(dispatcher.active_control_id(), Some("dpad"));

        assert!(!dispatcher.request_ownership(p(0), Channel::VirtualMouse));

        dispatcher.deactivate_control();
        assert!(!dispatcher.virtual_controls_enabled());
        assert_eq!(dispatcher.active_control_id(), None);
        assert!(dispatcher.request_ownership(p(0), Channel::VirtualMouse));
    }

    #[test]
    fn running_mouse_keeps_working_with_controls() {
        let mut dispatcher = full_screen_dispatcher();
        dispatcher.set_virtual_mouse_enabled(true);
        assert!(dispatcher.request_activate_control("stick"));
        assert!(dispatcher.request_ownership(p(0), Channel::VirtualMouse));
        assert!(dispatcher.request_ownership(p(1), Channel::VirtualJoystick));
    }

    #[test]
    fn control_activation_can_be_denied() {
        let mut dispatcher = TouchDispatcher::new();
        dispatcher.add_rule(shared(Veto(Channel::VirtualJoystick)));

        assert!(!dispatcher.request_activate_control("stick"));
        assert!(!dispatcher.virtual_controls_enabled());
        // The id is recorded before the rules run.
        assert_eq!(dispatcher.active_control_id(), Some("stick"));
    }

    #[test]
    fn user_preference_wins_over_everything() {
        let mut dispatcher = full_screen_dispatcher();
        dispatcher.set_user_disabled_virtual_mouse(true);
        dispatcher.set_virtual_mouse_enabled(true);
        assert!(!dispatcher.request_ownership(p(0), Channel::VirtualMouse));

        // Same when the preference comes in through the settings config.
        let config = ArbiterConfig {
            user_disabled_virtual_mouse: true,
            ..Default::default()
        };
        let mut dispatcher = TouchDispatcher::with_config(config);
        assert!(!dispatcher.request_ownership(p(0), Channel::VirtualMouse));
    }

    #[test]
    fn uninitialized_geometry_allows_mouse() {
        let mut dispatcher = TouchDispatcher::new();
        dispatcher.initialize(0, -20);
        dispatcher.add_occupied_region(Rect::new(0.0, 0.0, 500.0, 500.0));
        assert!(dispatcher.request_ownership(p(0), Channel::VirtualMouse));
    }

    #[test]
    fn config_threshold_reaches_rule() {
        let mut dispatcher =
            TouchDispatcher::from_json(r#"{"mouse_overlap_threshold": 0.5}"#).unwrap();
        dispatcher.initialize(1000, 2000);
        dispatcher.add_occupied_region(Rect::new(0.0, 0.0, 400.0, 2000.0));
        assert!(dispatcher.can_claim(p(0), Channel::VirtualMouse));
    }

    #[test]
    fn config_mouse_range_applies() {
        let dispatcher = TouchDispatcher::from_json(
            r#"{"mouse_range": {"left": 0.5, "top": 0.5, "right": 0.5, "bottom": 0.5}}"#,
        )
        .unwrap();
        assert_eq!(dispatcher.context().mouse_range(), MouseRange::new(0.5, 0.5, 0.5, 0.5));
    }

    #[test]
    fn rule_management_passthrough() {
        let mut dispatcher = TouchDispatcher::new();
        let veto = shared(Veto(Channel::NativePassthrough));
        dispatcher.add_rule(veto.clone());
        dispatcher.add_rule(None::<SharedRule>);
        assert_eq!(dispatcher.rule_names().len(), 6);
        assert_eq!(dispatcher.rule_names()[0], "Veto");
        assert!(!dispatcher.can_claim(p(0), Channel::NativePassthrough));

        assert!(dispatcher.remove_rule(&veto));
        assert!(dispatcher.can_claim(p(0), Channel::NativePassthrough));

        dispatcher.set_user_disabled_virtual_mouse(true);
        dispatcher.clear_rules();
        assert!(dispatcher.rule_names().is_empty());
        assert!(dispatcher.can_claim(p(0), Channel::VirtualMouse));
    }

    #[test]
    fn reset_keeps_rules_and_geometry() {
        let mut dispatcher = full_screen_dispatcher();
        dispatcher.add_occupied_region(Rect::new(0.0, 0.0, 10.0, 10.0));
        dispatcher.request_activate_control("jump");
        dispatcher.request_ownership(p(1), Channel::VirtualButton);

        dispatcher.reset();

        assert_eq!(dispatcher.occupied_pointer_count(), 0);
        assert!(!dispatcher.virtual_controls_enabled());
        assert_eq!(dispatcher.active_control_id(), None);
        assert_eq!(dispatcher.context().screen_width(), 1000);
        assert_eq!(dispatcher.context().occupied_regions().len(), 1);
        assert_eq!(dispatcher.rule_names().len(), 5);
    }

    #[test]
    fn point_lookup_in_regions() {
        let mut dispatcher = full_screen_dispatcher();
        dispatcher.add_occupied_region(Rect::new(100.0, 100.0, 200.0, 200.0));
        assert!(dispatcher.is_point_in_occupied_region(150.0, 150.0));
        assert!(!dispatcher.is_point_in_occupied_region(250.0, 150.0));
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut dispatcher = full_screen_dispatcher();
        dispatcher.request_ownership(p(4), Channel::VirtualMouse);
        dispatcher.request_ownership(p(1), Channel::VirtualButton);

        let snapshot = dispatcher.snapshot();
        assert_eq!(snapshot.screen_width, 1000);
        assert_eq!(snapshot.screen_height, 2000);
        assert_eq!(
            snapshot.owners,
            vec![
                OwnerEntry { pointer: p(1), channel: Channel::VirtualButton },
                OwnerEntry { pointer: p(4), channel: Channel::VirtualMouse },
            ]
        );
        assert_eq!(snapshot.rules[0], "UserPreference");
    }

    #[test]
    fn shared_dispatcher_serializes_across_threads() {
        let shared_dispatcher = SharedDispatcher::new(TouchDispatcher::new());
        shared_dispatcher.initialize(800, 600);

        let handles: Vec<_> = (0..4u32)
            .map(|t| {
                let d = shared_dispatcher.clone();
                std::thread::spawn(move || {
                    for i in 0..25u32 {
                        let pointer = PointerId::new(t * 100 + i);
                        assert!(d.request_ownership(pointer, Channel::NativePassthrough));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared_dispatcher.lock().occupied_pointer_count(), 100);
        shared_dispatcher.reset();
        assert_eq!(shared_dispatcher.with(|d| d.occupied_pointer_count()), 0);
    }

    // =========================================================================
    // Property-Based Tests
    // =========================================================================

    mod property_tests {
        use super::*;

        proptest! {
            /// Overlap share above the threshold denies the mouse, otherwise it is allowed.
            #[test]
            fn mouse_range_denies_iff_ratio_exceeds_threshold(
                width in 1i32..3000,
                height in 1i32..3000,
                regions in prop::collection::vec((0f32..3000.0, 0f32..3000.0, 0f32..3000.0, 0f32..3000.0), 1..5),
                threshold in 0f32..=1.0,
            ) {
                let mut dispatcher = TouchDispatcher::with_config(ArbiterConfig {
                    mouse_overlap_threshold: threshold,
                    ..Default::default()
                });
                dispatcher.initialize(width, height);
                for (l, t, r, b) in regions {
                    dispatcher.add_occupied_region(Rect::new(l, t, r, b));
                }

                let ctx = dispatcher.context();
                let ratio = ctx.mouse_range_overlap() / ctx.mouse_range_bounds().area();
                let expected = ratio <= threshold;
                prop_assert_eq!(dispatcher.can_claim(PointerId::new(0), Channel::VirtualMouse), expected);
            }

            /// Up or Cancel always leaves the pointer unowned.
            #[test]
            fn touch_end_always_releases(
                pointer in 0u32..10,
                cancel in any::<bool>(),
            ) {
                let mut dispatcher = TouchDispatcher::new();
                dispatcher.request_ownership(PointerId::new(pointer), Channel::VirtualButton);
                let action = if cancel { PointerAction::Cancel } else { PointerAction::Up };
                dispatcher.on_raw_pointer_event(PointerEvent::new(action, PointerId::new(pointer), 0.0, 0.0));
                prop_assert_eq!(dispatcher.owner_of(PointerId::new(pointer)), None);
            }
        }
    }

    // =========================================================================
    // WASM Wrapper Tests
    // =========================================================================

    #[test]
    fn test_wasm_dispatcher_from_json() {
        let mut dispatcher = WasmTouchDispatcher::new(r#"{"debug_logging": true}"#)
            .expect("Should parse valid config");
        dispatcher.initialize(1000, 2000);
        dispatcher.add_occupied_region(0.0, 0.0, 400.0, 2000.0);

        assert!(!dispatcher
            .request_ownership(5, "VirtualMouse")
            .expect("Known channel"));
        assert!(dispatcher
            .request_ownership(5, "virtual_button")
            .expect("Known channel"));
        assert_eq!(dispatcher.owner_of(5), Some("VirtualButton".to_string()));
    }

    #[test]
    fn test_wasm_dispatcher_pointer_event() {
        let mut dispatcher = WasmTouchDispatcher::new("{}").expect("Should parse valid config");
        dispatcher
            .request_ownership(3, "VirtualJoystick")
            .expect("Known channel");

        let consumed = dispatcher
            .on_raw_pointer_event(r#"{"action":"Cancel","pointer":3}"#)
            .expect("Should parse valid event");
        assert!(!consumed);
        assert_eq!(dispatcher.owner_of(3), None);
    }

    #[test]
    fn test_wasm_dispatcher_to_json() {
        let mut dispatcher = WasmTouchDispatcher::new("{}").expect("Should parse valid config");
        dispatcher.initialize(640, 480);
        dispatcher.request_activate_control("fire");

        let output_json = dispatcher.to_json().expect("Should serialize to JSON");
        let output: DispatcherSnapshot =
            serde_json::from_str(&output_json).expect("Should parse output JSON");

        assert_eq!(output.screen_width, 640);
        assert!(output.virtual_controls_enabled);
        assert_eq!(output.active_control_id.as_deref(), Some("fire"));
        assert_eq!(output.rules.len(), 5);
    }

    // Note: error paths of the wrapper build a JsValue and only run on wasm32;
    // see tests/wasm_dispatcher.rs.
}
