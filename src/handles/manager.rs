use std::collections::BTreeMap;

use bevy::prelude::*;
use chisel_geometry::{EPSILON, PickCamera};

use super::{Hit, HandleKind, PickResult};
use crate::document::EditedBrush;

#[derive(Clone, Debug, Default)]
struct HandleInfo {
    /// Owning brushes, in document order.
    brushes: Vec<Entity>,
    selected: bool,
}

#[derive(Clone, Debug)]
struct DraggedHandle<H> {
    handle: H,
    position: Vec3,
}

/// The handles of one kind across the edited brushes, with their selection,
/// highlight and drag state.
///
/// Brushes are referenced by entity only. The universe must be rebuilt after
/// every document change; [`HandleManager::revision`] records which document
/// revision it was built from.
#[derive(Clone, Debug)]
pub struct HandleManager<H: HandleKind> {
    handles: BTreeMap<H, HandleInfo>,
    /// Selected handles in the order they were selected.
    selection: Vec<H>,
    highlighted: Option<H>,
    dragged: Option<DraggedHandle<H>>,
    revision: Option<u64>,
}

impl<H: HandleKind> Default for HandleManager<H> {
    fn default() -> Self {
        Self {
            handles: BTreeMap::new(),
            selection: Vec::new(),
            highlighted: None,
            dragged: None,
            revision: None,
        }
    }
}

impl<H: HandleKind> HandleManager<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document revision the universe was built from, `None` before the first
    /// rebuild.
    pub fn revision(&self) -> Option<u64> {
        self.revision
    }

    // -----------------------------------------------------------------------
    // Universe
    // -----------------------------------------------------------------------

    /// Recompute the handle universe from `brushes`.
    ///
    /// Selected handles that still exist (exactly, or within the point
    /// tolerance after a rebuild shifted their coordinates) stay selected, in
    /// their old order.
    /// The rest are dropped silently. Brushes with malformed geometry
    /// contribute no handles.
    pub fn rebuild(&mut self, brushes: &[EditedBrush], revision: u64) {
        let mut handles: BTreeMap<H, HandleInfo> = BTreeMap::new();
        for brush in brushes {
            if let Err(err) = brush.geometry.validate() {
                warn!("Skipping handles of brush {:?}: {err}", brush.entity);
                continue;
            }
            for handle in H::collect(&brush.geometry) {
                let info = handles.entry(handle).or_default();
                if !info.brushes.contains(&brush.entity) {
                    info.brushes.push(brush.entity);
                }
            }
        }

        let previous = std::mem::take(&mut self.selection);
        self.handles = handles;
        self.revision = Some(revision);

        for handle in previous {
            let Some(resolved) = self.resolve(&handle) else {
                continue;
            };
            if let Some(info) = self.handles.get_mut(&resolved) {
                if !info.selected {
                    info.selected = true;
                    self.selection.push(resolved);
                }
            }
        }

        self.highlighted = self.highlighted.take().and_then(|h| self.resolve(&h));
        self.dragged = self.dragged.take().and_then(|dragged| {
            let handle = self.resolve(&dragged.handle)?;
            self.is_selected(&handle).then_some(DraggedHandle {
                handle,
                position: dragged.position,
            })
        });
    }

    /// Forget every handle and all selection state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// The universe's copy of `handle`, matched exactly or within `EPSILON`
    /// scaled to its distance from the origin.
    pub fn resolve(&self, handle: &H) -> Option<H> {
        if self.handles.contains_key(handle) {
            return Some(handle.clone());
        }
        self.handles
            .keys()
            .find(|candidate| candidate.approx_eq(handle, EPSILON))
            .cloned()
    }

    pub fn contains(&self, handle: &H) -> bool {
        self.handles.contains_key(handle)
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    pub fn all_handles(&self) -> impl Iterator<Item = &H> {
        self.handles.keys()
    }

    pub fn unselected_handles(&self) -> impl Iterator<Item = &H> {
        self.handles
            .iter()
            .filter(|(_, info)| !info.selected)
            .map(|(handle, _)| handle)
    }

    /// Every brush owning `handle`; empty for unknown handles.
    pub fn incident_brushes(&self, handle: &H) -> Vec<Entity> {
        self.handles
            .get(handle)
            .map(|info| info.brushes.clone())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Picking
    // -----------------------------------------------------------------------

    /// Add a hit to `pick_result` for every handle whose centre lies within
    /// `handle_radius` pixels of `ray`, at the distance where the ray enters
    /// the handle's sphere.
    pub fn pick_center_handle(
        &self,
        ray: Ray3d,
        camera: &PickCamera,
        handle_radius: f32,
        pick_result: &mut PickResult,
    ) {
        for handle in self.handles.keys() {
            let center = handle.center();
            if let Some(distance) = camera.pick_point_handle(ray, center, handle_radius) {
                pick_result.add_hit(Hit::new(
                    H::HIT_TYPE,
                    distance,
                    ray.get_point(distance),
                    handle.clone(),
                ));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    pub fn selected_handles(&self) -> Vec<H> {
        self.selection.clone()
    }

    pub fn selected_handle_count(&self) -> usize {
        self.selection.len()
    }

    pub fn any_selected(&self) -> bool {
        !self.selection.is_empty()
    }

    pub fn is_selected(&self, handle: &H) -> bool {
        self.handles.get(handle).is_some_and(|info| info.selected)
    }

    /// Select handles that exist in the universe. Unknown handles are ignored.
    pub fn select<'a>(&mut self, handles: impl IntoIterator<Item = &'a H>) {
        for handle in handles {
            if let Some(info) = self.handles.get_mut(handle) {
                if !info.selected {
                    info.selected = true;
                    self.selection.push(handle.clone());
                }
            }
        }
    }

    pub fn deselect<'a>(&mut self, handles: impl IntoIterator<Item = &'a H>) {
        for handle in handles {
            if let Some(info) = self.handles.get_mut(handle) {
                if info.selected {
                    info.selected = false;
                    self.selection.retain(|h| h != handle);
                }
            }
        }
        self.drop_unselected_drag();
    }

    pub fn toggle(&mut self, handle: &H) {
        if self.is_selected(handle) {
            self.deselect([handle]);
        } else {
            self.select([handle]);
        }
    }

    pub fn select_only(&mut self, handle: &H) {
        self.deselect_all();
        self.select([handle]);
    }

    pub fn deselect_all(&mut self) {
        for info in self.handles.values_mut() {
            info.selected = false;
        }
        self.selection.clear();
        self.dragged = None;
    }

    /// Move the selection (and the dragged handle) by `delta` so it names the
    /// geometry after an accepted move. Call [`HandleManager::rebuild`]
    /// afterwards to re-attach it to the new universe.
    pub fn translate_selection(&mut self, delta: Vec3) {
        for handle in &mut self.selection {
            *handle = handle.translate(delta);
        }
        if let Some(dragged) = &mut self.dragged {
            dragged.handle = dragged.handle.translate(delta);
            dragged.position += delta;
        }
    }

    // -----------------------------------------------------------------------
    // Highlight and drag
    // -----------------------------------------------------------------------

    pub fn set_highlight(&mut self, handle: Option<&H>) {
        self.highlighted = handle.filter(|h| self.contains(h)).cloned();
    }

    pub fn highlighted(&self) -> Option<&H> {
        self.highlighted.as_ref()
    }

    /// Mark `handle` as dragged. It must be selected; returns false otherwise.
    pub fn begin_drag(&mut self, handle: &H, position: Vec3) -> bool {
        if !self.is_selected(handle) {
            return false;
        }
        self.dragged = Some(DraggedHandle {
            handle: handle.clone(),
            position,
        });
        true
    }

    pub fn drag_handle(&self) -> Option<(&H, Vec3)> {
        self.dragged.as_ref().map(|d| (&d.handle, d.position))
    }

    pub fn set_drag_position(&mut self, position: Vec3) {
        if let Some(dragged) = &mut self.dragged {
            dragged.position = position;
        }
    }

    pub fn end_drag(&mut self) {
        self.dragged = None;
    }

    fn drop_unselected_drag(&mut self) {
        if let Some(dragged) = &self.dragged {
            if !self.is_selected(&dragged.handle) {
                self.dragged = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::{HitType, VertexHandle};
    use chisel_geometry::{BrushGeometry, Polygon3, Segment3, cuboid_faces};

    fn entities<const N: usize>() -> [Entity; N] {
        let mut world = World::new();
        std::array::from_fn(|_| world.spawn_empty().id())
    }

    fn cube(entity: Entity, center: Vec3) -> EditedBrush {
        EditedBrush {
            entity,
            geometry: BrushGeometry::from_faces(&cuboid_faces(center, Vec3::ONE)),
        }
    }

    fn two_cubes() -> Vec<EditedBrush> {
        let [a, b] = entities();
        vec![cube(a, Vec3::ZERO), cube(b, Vec3::new(2.0, 0.0, 0.0))]
    }

    #[test]
    fn adjacent_cubes_share_vertices() {
        let mut manager = HandleManager::<VertexHandle>::new();
        manager.rebuild(&two_cubes(), 0);
        // 8 + 8 corners, 4 shared on the touching face.
        assert_eq!(manager.handle_count(), 12);
        let shared = VertexHandle(Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(manager.incident_brushes(&shared).len(), 2);
        let lone = VertexHandle(Vec3::new(-1.0, 1.0, 1.0));
        assert_eq!(manager.incident_brushes(&lone).len(), 1);
    }

    #[test]
    fn edges_and_faces_are_collected_once() {
        let [entity] = entities();
        let brushes = vec![cube(entity, Vec3::ZERO)];
        let mut edges = HandleManager::<Segment3>::new();
        edges.rebuild(&brushes, 0);
        assert_eq!(edges.handle_count(), 12);

        let mut faces = HandleManager::<Polygon3>::new();
        faces.rebuild(&brushes, 0);
        assert_eq!(faces.handle_count(), 6);
    }

    #[test]
    fn selection_keeps_insertion_order() {
        let mut manager = HandleManager::<VertexHandle>::new();
        manager.rebuild(&two_cubes(), 0);
        let a = VertexHandle(Vec3::new(3.0, 1.0, 1.0));
        let b = VertexHandle(Vec3::new(-1.0, -1.0, -1.0));
        let c = VertexHandle(Vec3::new(1.0, -1.0, 1.0));
        manager.select([&a, &b, &c]);
        assert_eq!(manager.selected_handles(), vec![a, b, c]);
        assert_eq!(manager.selected_handle_count(), manager.selected_handles().len());
    }

    #[test]
    fn unknown_handles_are_not_selected() {
        let mut manager = HandleManager::<VertexHandle>::new();
        manager.rebuild(&two_cubes(), 0);
        manager.select([&VertexHandle(Vec3::splat(7.0))]);
        assert_eq!(manager.selected_handle_count(), 0);
    }

    #[test]
    fn noop_rebuild_preserves_selection_exactly() {
        let brushes = two_cubes();
        let mut manager = HandleManager::<Polygon3>::new();
        manager.rebuild(&brushes, 0);
        let picked: Vec<Polygon3> = manager.all_handles().step_by(3).cloned().collect();
        manager.select(picked.iter());
        let before = manager.selected_handles();

        manager.rebuild(&brushes, 1);
        assert_eq!(manager.selected_handles(), before);
        assert_eq!(manager.revision(), Some(1));
    }

    #[test]
    fn vanished_handles_leave_the_selection_silently() {
        let mut manager = HandleManager::<VertexHandle>::new();
        manager.rebuild(&two_cubes(), 0);
        let far = VertexHandle(Vec3::new(3.0, 1.0, 1.0));
        let near = VertexHandle(Vec3::new(-1.0, 1.0, 1.0));
        manager.select([&far, &near]);
        assert!(manager.begin_drag(&far, far.0));

        manager.rebuild(&two_cubes()[..1], 1);
        assert_eq!(manager.selected_handles(), vec![near]);
        assert!(manager.drag_handle().is_none());
    }

    #[test]
    fn malformed_brush_is_skipped() {
        let [entity] = entities();
        let broken = EditedBrush {
            entity,
            geometry: BrushGeometry {
                vertices: vec![Vec3::ZERO, Vec3::X],
                face_polygons: vec![vec![0, 1]],
            },
        };
        let mut brushes = two_cubes();
        brushes.push(broken);
        let mut manager = HandleManager::<VertexHandle>::new();
        manager.rebuild(&brushes, 0);
        assert_eq!(manager.handle_count(), 12);
    }

    #[test]
    fn dragged_handle_must_be_selected() {
        let mut manager = HandleManager::<VertexHandle>::new();
        manager.rebuild(&two_cubes(), 0);
        let handle = VertexHandle(Vec3::new(1.0, 1.0, 1.0));
        assert!(!manager.begin_drag(&handle, handle.0));
        manager.select([&handle]);
        assert!(manager.begin_drag(&handle, handle.0));
        manager.deselect([&handle]);
        assert!(manager.drag_handle().is_none());
    }

    #[test]
    fn translated_selection_reattaches_after_rebuild() {
        let [entity] = entities();
        let mut manager = HandleManager::<VertexHandle>::new();
        manager.rebuild(&[cube(entity, Vec3::ZERO)], 0);
        let corner = VertexHandle(Vec3::new(1.0, 1.0, 1.0));
        manager.select([&corner]);

        manager.translate_selection(Vec3::new(1.0, 0.0, 0.0));
        manager.rebuild(&[cube(entity, Vec3::new(1.0, 0.0, 0.0))], 1);
        assert_eq!(
            manager.selected_handles(),
            vec![VertexHandle(Vec3::new(2.0, 1.0, 1.0))]
        );
    }

    #[test]
    fn pick_tags_hits_with_the_manager_type() {
        let mut manager = HandleManager::<Polygon3>::new();
        let [entity] = entities();
        manager.rebuild(&[cube(entity, Vec3::ZERO)], 0);
        let camera = PickCamera::perspective(
            Vec3::new(0.0, 0.0, 10.0),
            Dir3::NEG_Z,
            std::f32::consts::FRAC_PI_2,
            600.0,
        );
        let ray = Ray3d::new(Vec3::new(0.0, 0.0, 10.0), Dir3::NEG_Z);
        let mut result = PickResult::default();
        manager.pick_center_handle(ray, &camera, 4.0, &mut result);

        // Front (+Z) and back (-Z) face centres lie on the ray.
        assert_eq!(result.len(), 2);
        let nearest = result.first_of_type(HitType::FACE_HANDLE).expect("face hit");
        // 4 px at depth 9 is a 0.12-unit sphere around the face centre.
        assert!((nearest.distance - 8.88).abs() < 1e-4);
        assert_eq!(
            nearest.target::<Polygon3>().map(|p| p.center()),
            Some(Vec3::new(0.0, 0.0, 1.0))
        );
    }
}
