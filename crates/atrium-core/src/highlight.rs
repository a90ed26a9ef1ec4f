//! Hover highlighting and click-to-navigate
//!
//! The engine supplies ray casting and overlay entities through the
//! [`Raycaster`] and [`OverlayHost`] traits. [`HitTestHighlighter`] decides
//! which unit is highlighted, when the highlight may change, and whether a
//! pointer-up counts as a click.

use glam::Vec2;
use serde::Serialize;
use tracing::debug;

use crate::asset_path::Variant;
use crate::config::HighlightConfig;
use crate::ray::Ray;
use crate::timing::Debouncer;
use crate::units::{UnitId, UnitRegistry};

/// What a ray is tested against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayScope {
    /// Only registered unit primitives
    Units,
    /// Every mesh except highlight overlays
    Scene,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RayHit<P> {
    pub primitive: P,
    pub distance: f32,
}

/// Nearest-hit ray casting against the live scene
pub trait Raycaster<P> {
    fn cast(&mut self, ray: &Ray, scope: RayScope) -> Option<RayHit<P>>;
}

/// Creates and removes the transient overlay drawn over a primitive
pub trait OverlayHost<P> {
    type Overlay;

    fn spawn_overlay(&mut self, primitive: &P) -> Option<Self::Overlay>;
    fn despawn_overlay(&mut self, overlay: Self::Overlay);
}

/// Request to open a unit's own page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigateIntent {
    pub variant: Variant,
    pub unit: UnitId,
}

impl NavigateIntent {
    pub fn route(&self) -> String {
        format!("/individual/{}/{}", self.variant.slug(), self.unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverChange {
    Unchanged,
    /// A change was wanted but the debounce interval has not elapsed
    Debounced,
    Highlighted(UnitId),
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Too long, moved too far, or no matching pointer-down
    Ignored,
    /// Resolves after the click debounce unless a second click arrives
    Pending,
    DoubleClick,
}

struct Highlight<O> {
    unit: UnitId,
    overlays: Vec<O>,
}

pub struct HitTestHighlighter<P, O> {
    registry: UnitRegistry<P>,
    config: HighlightConfig,
    current: Option<Highlight<O>>,
    last_change_ms: Option<f64>,
    pointer_down: Option<(f64, Vec2)>,
    pending_click: Debouncer<()>,
    active: bool,
}

impl<P, O> HitTestHighlighter<P, O>
where
    P: Clone + Eq + std::hash::Hash,
{
    pub fn new(config: &HighlightConfig) -> Self {
        Self {
            registry: UnitRegistry::new(),
            config: config.clone(),
            current: None,
            last_change_ms: None,
            pointer_down: None,
            pending_click: Debouncer::new(config.click_debounce_ms),
            active: true,
        }
    }

    pub fn registry(&self) -> &UnitRegistry<P> {
        &self.registry
    }

    pub fn highlighted(&self) -> Option<UnitId> {
        self.current.as_ref().map(|h| h.unit)
    }

    pub fn overlay_count(&self) -> usize {
        self.current.as_ref().map_or(0, |h| h.overlays.len())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Swap in the units of a newly loaded model
    pub fn set_registry<H>(&mut self, registry: UnitRegistry<P>, host: &mut H)
    where
        H: OverlayHost<P, Overlay = O>,
    {
        self.clear(host);
        self.pending_click.cancel();
        self.pointer_down = None;
        self.last_change_ms = None;
        self.registry = registry;
    }

    fn resolve<R: Raycaster<P>>(&self, ray: Option<&Ray>, raycaster: &mut R) -> Option<UnitId> {
        let hit = raycaster.cast(ray?, RayScope::Units)?;
        self.registry.unit_of(&hit.primitive)
    }

    /// Hit test the pointer ray and move the highlight, subject to debounce
    pub fn hover<R, H>(
        &mut self,
        now_ms: f64,
        ray: Option<&Ray>,
        idle_auto_rotating: bool,
        raycaster: &mut R,
        host: &mut H,
    ) -> HoverChange
    where
        R: Raycaster<P>,
        H: OverlayHost<P, Overlay = O>,
    {
        if !self.active || self.registry.is_empty() {
            return HoverChange::Unchanged;
        }
        let unit = self.resolve(ray, raycaster);
        if unit == self.highlighted() {
            return HoverChange::Unchanged;
        }

        let interval = if idle_auto_rotating {
            self.config.auto_rotate_debounce_ms
        } else {
            self.config.hover_debounce_ms
        };
        if let Some(last) = self.last_change_ms {
            if now_ms - last < interval {
                return HoverChange::Debounced;
            }
        }
        self.last_change_ms = Some(now_ms);

        match unit {
            Some(unit) => {
                self.highlight_unit(unit, host);
                HoverChange::Highlighted(unit)
            }
            None => {
                self.clear(host);
                HoverChange::Cleared
            }
        }
    }

    /// Overlay every primitive of `unit`, removing any previous highlight first
    pub fn highlight_unit<H>(&mut self, unit: UnitId, host: &mut H)
    where
        H: OverlayHost<P, Overlay = O>,
    {
        if !self.active {
            return;
        }
        self.clear(host);
        let overlays: Vec<O> = self
            .registry
            .primitives(unit)
            .iter()
            .filter_map(|p| host.spawn_overlay(p))
            .collect();
        debug!(unit, overlays = overlays.len(), "Unit highlighted");
        self.current = Some(Highlight { unit, overlays });
    }

    pub fn clear<H>(&mut self, host: &mut H)
    where
        H: OverlayHost<P, Overlay = O>,
    {
        if let Some(previous) = self.current.take() {
            debug!(unit = previous.unit, "Unit highlight cleared");
            for overlay in previous.overlays {
                host.despawn_overlay(overlay);
            }
        }
    }

    pub fn pointer_down(&mut self, now_ms: f64, ndc: Vec2) {
        if self.active {
            self.pointer_down = Some((now_ms, ndc));
        }
    }

    /// Classify a pointer-up against the matching pointer-down
    pub fn pointer_up(&mut self, now_ms: f64, ndc: Vec2) -> ClickOutcome {
        let Some((down_ms, down_ndc)) = self.pointer_down.take() else {
            return ClickOutcome::Ignored;
        };
        if !self.active
            || now_ms - down_ms > self.config.click_max_duration_ms
            || down_ndc.distance(ndc) > self.config.click_max_ndc_distance
        {
            return ClickOutcome::Ignored;
        }
        if self.pending_click.is_pending() {
            self.pending_click.cancel();
            debug!("Double click");
            return ClickOutcome::DoubleClick;
        }
        self.pending_click.push((), now_ms);
        ClickOutcome::Pending
    }

    /// Resolve a pending click once its debounce has elapsed
    ///
    /// The ray is cast from the pointer's position at resolution time.
    pub fn poll_click<R: Raycaster<P>>(
        &mut self,
        now_ms: f64,
        ray: Option<&Ray>,
        raycaster: &mut R,
        variant: Variant,
    ) -> Option<NavigateIntent> {
        if !self.active {
            return None;
        }
        self.pending_click.poll(now_ms)?;
        let unit = self.resolve(ray, raycaster)?;
        let intent = NavigateIntent { variant, unit };
        debug!(route = %intent.route(), "Click resolved to unit");
        Some(intent)
    }

    /// Remove overlays and make every later call a no-op
    pub fn teardown<H>(&mut self, host: &mut H)
    where
        H: OverlayHost<P, Overlay = O>,
    {
        self.clear(host);
        self.pending_click.cancel();
        self.pointer_down = None;
        self.registry.clear();
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::collections::HashMap;

    /// Hits whatever primitive is registered for the ray's x coordinate
    #[derive(Default)]
    struct LaneRaycaster {
        lanes: HashMap<i32, u32>,
        casts: usize,
    }

    impl Raycaster<u32> for LaneRaycaster {
        fn cast(&mut self, ray: &Ray, scope: RayScope) -> Option<RayHit<u32>> {
            assert_eq!(scope, RayScope::Units);
            self.casts += 1;
            let primitive = *self.lanes.get(&(ray.origin.x as i32))?;
            Some(RayHit { primitive, distance: 1.0 })
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        next: u32,
        live: HashMap<u32, u32>,
        /// (primitive unit prefix, live count after the event)
        log: Vec<(u32, usize)>,
    }

    impl OverlayHost<u32> for RecordingHost {
        type Overlay = u32;

        fn spawn_overlay(&mut self, primitive: &u32) -> Option<u32> {
            self.next += 1;
            self.live.insert(self.next, *primitive);
            self.log.push((*primitive / 100, self.live.len()));
            Some(self.next)
        }

        fn despawn_overlay(&mut self, overlay: u32) {
            if let Some(primitive) = self.live.remove(&overlay) {
                self.log.push((primitive / 100, self.live.len()));
            }
        }
    }

    impl RecordingHost {
        fn live_for(&self, unit: u32) -> usize {
            self.live.values().filter(|p| **p / 100 == unit).count()
        }
    }

    /// Primitive ids are unit * 100 + fragment
    fn setup() -> (HitTestHighlighter<u32, u32>, LaneRaycaster, RecordingHost) {
        let mut registry = UnitRegistry::new();
        let mut raycaster = LaneRaycaster::default();
        for (lane, unit, fragments) in [(1, 23u32, 4u32), (2, 24, 2)] {
            for f in 0..fragments {
                registry.register(unit, unit * 100 + f);
            }
            raycaster.lanes.insert(lane, unit * 100);
        }
        raycaster.lanes.insert(9, 9999);
        let mut host = RecordingHost::default();
        let mut h = HitTestHighlighter::new(&HighlightConfig::default());
        h.set_registry(registry, &mut host);
        (h, raycaster, host)
    }

    fn lane(x: f32) -> Ray {
        Ray::new(Vec3::new(x, 0.0, 10.0), Vec3::NEG_Z)
    }

    #[test]
    fn test_hover_highlights_all_fragments_of_unit() {
        let (mut h, mut rc, mut host) = setup();
        let change = h.hover(0.0, Some(&lane(1.0)), false, &mut rc, &mut host);
        assert_eq!(change, HoverChange::Highlighted(23));
        assert_eq!(h.overlay_count(), 4);
        assert_eq!(host.live_for(23), 4);
    }

    #[test]
    fn test_switching_units_clears_previous_first() {
        let (mut h, mut rc, mut host) = setup();
        h.hover(0.0, Some(&lane(1.0)), false, &mut rc, &mut host);
        host.log.clear();
        let change = h.hover(150.0, Some(&lane(2.0)), false, &mut rc, &mut host);
        assert_eq!(change, HoverChange::Highlighted(24));

        let first_b = host.log.iter().position(|(unit, _)| *unit == 24).unwrap();
        let last_a = host.log.iter().rposition(|(unit, _)| *unit == 23).unwrap();
        assert!(last_a < first_b);
        // Every A overlay was gone before the first B overlay appeared
        assert_eq!(host.log[last_a].1, 0);
        assert_eq!(host.live_for(23), 0);
        assert_eq!(host.live_for(24), 2);
    }

    #[test]
    fn test_hover_debounce_intervals() {
        let (mut h, mut rc, mut host) = setup();
        h.hover(0.0, Some(&lane(1.0)), false, &mut rc, &mut host);
        assert_eq!(
            h.hover(50.0, Some(&lane(2.0)), false, &mut rc, &mut host),
            HoverChange::Debounced
        );
        assert_eq!(h.highlighted(), Some(23));
        // Longer interval while idly auto-rotating
        assert_eq!(
            h.hover(150.0, Some(&lane(2.0)), true, &mut rc, &mut host),
            HoverChange::Debounced
        );
        assert_eq!(
            h.hover(200.0, Some(&lane(2.0)), true, &mut rc, &mut host),
            HoverChange::Highlighted(24)
        );
    }

    #[test]
    fn test_miss_and_unregistered_hits_clear() {
        let (mut h, mut rc, mut host) = setup();
        h.hover(0.0, Some(&lane(1.0)), false, &mut rc, &mut host);
        assert_eq!(
            h.hover(50.0, Some(&lane(5.0)), false, &mut rc, &mut host),
            HoverChange::Debounced
        );
        assert_eq!(
            h.hover(120.0, Some(&lane(9.0)), false, &mut rc, &mut host),
            HoverChange::Cleared
        );
        assert_eq!(h.highlighted(), None);
        assert!(host.live.is_empty());
        assert_eq!(
            h.hover(500.0, None, false, &mut rc, &mut host),
            HoverChange::Unchanged
        );
    }

    #[test]
    fn test_click_navigates_with_active_variant() {
        let (mut h, mut rc, _) = setup();
        h.pointer_down(0.0, Vec2::ZERO);
        assert_eq!(h.pointer_up(120.0, Vec2::new(0.01, 0.0)), ClickOutcome::Pending);
        assert_eq!(h.poll_click(300.0, Some(&lane(1.0)), &mut rc, Variant::Without), None);
        let intent = h.poll_click(420.0, Some(&lane(1.0)), &mut rc, Variant::Without).unwrap();
        assert_eq!(intent, NavigateIntent { variant: Variant::Without, unit: 23 });
        assert_eq!(intent.route(), "/individual/without/23");
        assert_eq!(h.poll_click(900.0, Some(&lane(1.0)), &mut rc, Variant::Without), None);
    }

    #[test]
    fn test_drag_never_navigates() {
        let (mut h, mut rc, _) = setup();
        for duration in [10.0, 100.0, 199.0, 1000.0] {
            h.pointer_down(0.0, Vec2::ZERO);
            assert_eq!(h.pointer_up(duration, Vec2::new(0.3, -0.2)), ClickOutcome::Ignored);
            assert_eq!(h.poll_click(duration + 1000.0, Some(&lane(1.0)), &mut rc, Variant::With), None);
        }
        // Long press without movement is not a click either
        h.pointer_down(0.0, Vec2::ZERO);
        assert_eq!(h.pointer_up(250.0, Vec2::ZERO), ClickOutcome::Ignored);
        assert_eq!(h.pointer_up(260.0, Vec2::ZERO), ClickOutcome::Ignored);
        assert_eq!(rc.casts, 0);
    }

    #[test]
    fn test_double_click_cancels_navigation() {
        let (mut h, mut rc, _) = setup();
        h.pointer_down(0.0, Vec2::ZERO);
        assert_eq!(h.pointer_up(80.0, Vec2::ZERO), ClickOutcome::Pending);
        h.pointer_down(150.0, Vec2::ZERO);
        assert_eq!(h.pointer_up(220.0, Vec2::ZERO), ClickOutcome::DoubleClick);
        assert_eq!(h.poll_click(2000.0, Some(&lane(1.0)), &mut rc, Variant::With), None);
    }

    #[test]
    fn test_teardown_removes_overlays_and_disables() {
        let (mut h, mut rc, mut host) = setup();
        h.hover(0.0, Some(&lane(1.0)), false, &mut rc, &mut host);
        h.pointer_down(10.0, Vec2::ZERO);
        h.pointer_up(20.0, Vec2::ZERO);
        h.teardown(&mut host);
        assert!(host.live.is_empty());
        assert_eq!(h.poll_click(1000.0, Some(&lane(1.0)), &mut rc, Variant::With), None);
        h.highlight_unit(23, &mut host);
        assert!(host.live.is_empty());
        assert_eq!(
            h.hover(2000.0, Some(&lane(2.0)), false, &mut rc, &mut host),
            HoverChange::Unchanged
        );
    }

    #[test]
    fn test_navigate_intent_json() {
        let intent = NavigateIntent { variant: Variant::Furniture, unit: 7 };
        assert_eq!(
            serde_json::to_string(&intent).unwrap(),
            r#"{"variant":"furniture","unit":7}"#
        );
    }
}
