use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Appearance, NoteSpec};

/// Opaque identifier of an entity owned by the render adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderHandle(pub u64);

/// Per-tick placement pushed to the adapter for a visible note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub travel_offset: f64,
    pub fade: f64,
    pub position: [f64; 3],
    pub scale: [f64; 3],
}

/// Rendering and picking backend, implemented outside the core.
pub trait RenderAdapter {
    fn spawn(&mut self, spec: &NoteSpec, appearance: &Appearance) -> RenderHandle;
    fn set_position(&mut self, handle: RenderHandle, pose: &Pose);
    fn set_visible(&mut self, handle: RenderHandle, visible: bool);
    fn destroy(&mut self, handle: RenderHandle);

    /// Called when a recycled slot was redrawn with new attributes.
    fn set_appearance(&mut self, _handle: RenderHandle, _appearance: &Appearance) {}

    /// Resolves a pointer/ray position to the nearest colliding entity.
    fn pick(&self, _point: [f64; 3]) -> Option<RenderHandle> {
        None
    }
}

/// Adapter that only hands out handles.
#[derive(Debug, Default)]
pub struct NullRenderer {
    next: u64,
}

impl RenderAdapter for NullRenderer {
    fn spawn(&mut self, _spec: &NoteSpec, _appearance: &Appearance) -> RenderHandle {
        self.next += 1;
        RenderHandle(self.next)
    }

    fn set_position(&mut self, _handle: RenderHandle, _pose: &Pose) {}
    fn set_visible(&mut self, _handle: RenderHandle, _visible: bool) {}
    fn destroy(&mut self, _handle: RenderHandle) {}
}

/// State the headless renderer keeps per entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub spec: NoteSpec,
    pub appearance: Appearance,
    pub visible: bool,
    pub pose: Option<Pose>,
}

/// In-memory render graph. It tracks every spawned entity so hosts without
/// a GPU (tests, the command line) can observe what would be drawn.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    entities: HashMap<RenderHandle, Entity>,
    next: u64,
    spawned_total: u64,
    destroyed_total: u64,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(&self, handle: RenderHandle) -> Option<&Entity> {
        self.entities.get(&handle)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn visible_count(&self) -> usize {
        self.entities.values().filter(|e| e.visible).count()
    }

    pub fn spawned_total(&self) -> u64 {
        self.spawned_total
    }

    pub fn destroyed_total(&self) -> u64 {
        self.destroyed_total
    }
}

impl RenderAdapter for HeadlessRenderer {
    fn spawn(&mut self, spec: &NoteSpec, appearance: &Appearance) -> RenderHandle {
        self.next += 1;
        self.spawned_total += 1;
        let handle = RenderHandle(self.next);
        self.entities.insert(
            handle,
            Entity {
                spec: *spec,
                appearance: *appearance,
                visible: false,
                pose: None,
            },
        );
        handle
    }

    fn set_position(&mut self, handle: RenderHandle, pose: &Pose) {
        if let Some(entity) = self.entities.get_mut(&handle) {
            entity.pose = Some(*pose);
        }
    }

    fn set_visible(&mut self, handle: RenderHandle, visible: bool) {
        if let Some(entity) = self.entities.get_mut(&handle) {
            entity.visible = visible;
        }
    }

    fn destroy(&mut self, handle: RenderHandle) {
        if self.entities.remove(&handle).is_some() {
            self.destroyed_total += 1;
        }
    }

    fn set_appearance(&mut self, handle: RenderHandle, appearance: &Appearance) {
        if let Some(entity) = self.entities.get_mut(&handle) {
            entity.appearance = *appearance;
        }
    }

    /// Box containment test against each visible entity's pose; the entity
    /// whose centre is nearest to `point` wins.
    fn pick(&self, point: [f64; 3]) -> Option<RenderHandle> {
        self.entities
            .iter()
            .filter(|(_, e)| e.visible)
            .filter_map(|(handle, e)| {
                let pose = e.pose?;
                let mut distance = 0.0;
                for axis in 0..3 {
                    let delta = (point[axis] - pose.position[axis]).abs();
                    if delta > pose.scale[axis] * 0.5 {
                        return None;
                    }
                    distance += delta * delta;
                }
                Some((*handle, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0 .0.cmp(&b.0 .0)))
            .map(|(handle, _)| handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(x: f64) -> Pose {
        Pose {
            travel_offset: x,
            fade: 1.0,
            position: [x, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        }
    }

    fn spawn_at(renderer: &mut HeadlessRenderer, x: f64) -> RenderHandle {
        let spec = NoteSpec::new(x, 0, 1.0, 60);
        let handle = renderer.spawn(&spec, &Appearance::default());
        renderer.set_position(handle, &pose(x));
        renderer.set_visible(handle, true);
        handle
    }

    #[test]
    fn tracks_entity_lifecycle() {
        let mut renderer = HeadlessRenderer::new();
        let handle = spawn_at(&mut renderer, 0.0);
        assert_eq!(renderer.visible_count(), 1);

        renderer.destroy(handle);
        renderer.destroy(handle);
        assert!(renderer.is_empty());
        assert_eq!(renderer.destroyed_total(), 1);
    }

    #[test]
    fn pick_returns_nearest_colliding_entity() {
        let mut renderer = HeadlessRenderer::new();
        let _left = spawn_at(&mut renderer, 0.0);
        let right = spawn_at(&mut renderer, 0.8);

        assert_eq!(renderer.pick([0.7, 0.1, 0.0]), Some(right));
        assert_eq!(renderer.pick([5.0, 0.0, 0.0]), None);
    }

    #[test]
    fn hidden_entities_are_not_pickable() {
        let mut renderer = HeadlessRenderer::new();
        let handle = spawn_at(&mut renderer, 0.0);
        renderer.set_visible(handle, false);
        assert_eq!(renderer.pick([0.0, 0.0, 0.0]), None);
    }
}
