//! Tools editing brushes stored in a Bevy world, with undo.

use bevy::prelude::*;
use chisel::brush::{Brush, DocumentRevision};
use chisel::document::{MapDocument, WorldDocument};
use chisel::handles::{HandleKind, Hit, HitType, PickResult, VertexHandle};
use chisel::selection::Selection;
use chisel::tools::{DragState, FaceTool, HandleTool, MoveResult, VertexTool};
use chisel_commands::CommandHistory;
use chisel_geometry::PickCamera;

fn world_with_selected_cube() -> (World, Entity) {
    let mut world = World::new();
    let entity = world.spawn(Brush::cuboid(1.0, 1.0, 1.0)).id();
    world.insert_resource(Selection {
        entities: vec![entity],
    });
    (world, entity)
}

fn pick_from(tool: &impl HandleTool, target: Vec3, offset: Vec3, hit_type: HitType) -> Vec<Hit> {
    let origin = target + offset;
    let forward = Dir3::new(-offset).expect("camera offset");
    let ray = Ray3d::new(origin, forward);
    let camera = PickCamera::perspective(origin, forward, std::f32::consts::FRAC_PI_2, 600.0);
    let mut result = PickResult::default();
    tool.pick(ray, &camera, &mut result);
    result.hits_of_type(hit_type).cloned().collect()
}

fn undo(world: &mut World) -> bool {
    world.resource_scope(|world, mut history: Mut<CommandHistory>| history.undo(world))
}

#[test]
fn pick_drag_and_undo_a_face() {
    let (mut world, entity) = world_with_selected_cube();
    let mut tool = FaceTool::new();

    let mut document = WorldDocument::new(&mut world);
    tool.refresh(&document);
    assert_eq!(tool.manager().handle_count(), 6);

    let origin = Vec3::new(0.0, 10.0, 0.0);
    let ray = Ray3d::new(origin, Dir3::NEG_Y);
    let camera = PickCamera::perspective(origin, Dir3::NEG_Y, std::f32::consts::FRAC_PI_2, 600.0);
    let mut result = PickResult::default();
    tool.pick(ray, &camera, &mut result);
    let hits: Vec<_> = result.hits_of_type(HitType::FACE_HANDLE).cloned().collect();
    assert!(tool.start_drag(&hits));

    assert_eq!(tool.drag(&mut document, Vec3::new(0.0, 0.5, 0.0)), MoveResult::Continue);
    assert_eq!(tool.drag(&mut document, Vec3::new(0.0, 0.5, 0.0)), MoveResult::Continue);
    assert_eq!(tool.drag_handle_position(), Some(Vec3::new(0.0, 2.0, 0.0)));
    assert_eq!(tool.end_drag().as_deref(), Some("Move Face"));

    let top = tool.manager().selected_handles();
    assert_eq!(top.len(), 1);
    assert!(top[0].center().distance(Vec3::new(0.0, 2.0, 0.0)) < 1e-4);
    let revision = document.revision();

    // Each accepted step is its own undoable edit.
    assert_eq!(world.resource::<CommandHistory>().undo_stack.len(), 2);
    assert!(undo(&mut world));
    assert!(undo(&mut world));
    assert_eq!(world.get::<Brush>(entity), Some(&Brush::cuboid(1.0, 1.0, 1.0)));
    assert!(world.resource::<DocumentRevision>().0 > revision);

    let document = WorldDocument::new(&mut world);
    tool.refresh(&document);
    assert_eq!(tool.drag_state(), DragState::Idle);
    assert!(!tool.manager().any_selected());
    assert_eq!(tool.manager().handle_count(), 6);
}

#[test]
fn collapsing_drag_is_denied_and_leaves_the_brush() {
    let (mut world, entity) = world_with_selected_cube();
    let mut tool = VertexTool::new();
    let mut document = WorldDocument::new(&mut world);
    tool.refresh(&document);

    let corner = VertexHandle(Vec3::ONE);
    tool.manager_mut().select([&corner]);
    let before = tool.manager().selected_handles();

    // Pushing a corner through the cube swallows it into the hull.
    assert_eq!(tool.move_handles(&mut document, Vec3::splat(-1.5)), MoveResult::Deny);
    assert_eq!(tool.manager().selected_handles(), before);
    assert_eq!(world.get::<Brush>(entity), Some(&Brush::cuboid(1.0, 1.0, 1.0)));
    assert!(world.resource::<CommandHistory>().undo_stack.is_empty());
}

#[test]
fn removing_a_corner_cuts_it_off() {
    let (mut world, _) = world_with_selected_cube();
    let mut tool = VertexTool::new();
    let mut document = WorldDocument::new(&mut world);
    tool.refresh(&document);
    tool.manager_mut().select([&VertexHandle(Vec3::ONE)]);

    tool.remove_selection(&mut document);
    assert_eq!(tool.manager().handle_count(), 7);
    assert!(!tool.manager().contains(&VertexHandle(Vec3::ONE)));
    assert!(!tool.manager().any_selected());
    assert_eq!(
        world.resource::<CommandHistory>().undo_description(),
        Some("Remove Brush Vertex")
    );
}

#[test]
fn unselected_brushes_are_not_edited() {
    let (mut world, _) = world_with_selected_cube();
    let other = world
        .spawn(Brush::from_corners(Vec3::new(1.0, -1.0, -1.0), Vec3::new(3.0, 1.0, 1.0)))
        .id();
    let mut tool = FaceTool::new();
    let mut document = WorldDocument::new(&mut world);
    tool.refresh(&document);
    assert_eq!(tool.manager().handle_count(), 6);

    let right = tool
        .manager()
        .all_handles()
        .find(|face| face.normal().dot(Vec3::X) > 0.99)
        .cloned()
        .expect("right face");
    tool.manager_mut().select([&right]);
    assert_eq!(tool.move_handles(&mut document, Vec3::new(0.5, 0.0, 0.0)), MoveResult::Continue);
    assert_eq!(
        world.get::<Brush>(other),
        Some(&Brush::from_corners(Vec3::new(1.0, -1.0, -1.0), Vec3::new(3.0, 1.0, 1.0)))
    );
}

#[test]
fn far_vertex_drag_composes_and_keeps_its_selection() {
    let mut world = World::new();
    let entity = world
        .spawn(Brush::from_corners(Vec3::splat(968.0), Vec3::splat(1032.0)))
        .id();
    world.insert_resource(Selection {
        entities: vec![entity],
    });
    let mut tool = VertexTool::new();
    let mut document = WorldDocument::new(&mut world);
    tool.refresh(&document);

    let mut corner = Vec3::splat(1032.0);
    let hits = pick_from(&tool, corner, Vec3::new(0.0, 0.0, 10.0), HitType::VERTEX_HANDLE);
    assert!(tool.start_drag(&hits));

    for delta in [
        Vec3::new(3.3, 1.7, 0.9),
        Vec3::new(-1.25, 2.5, 0.75),
        Vec3::new(0.6, -0.4, 1.1),
    ] {
        assert_eq!(tool.drag(&mut document, delta), MoveResult::Continue);
        corner += delta;
        assert_eq!(tool.drag_state(), DragState::Dragging);
        assert_eq!(tool.selected_handle_count(), 1);
        let selected = tool.manager().selected_handles();
        assert!(selected[0].center().distance(corner) < 1e-2);
        assert_eq!(tool.manager().handle_count(), 8);
    }
    let session = *tool.drag_session().expect("session");
    assert_eq!(session.start_position, Vec3::splat(1032.0));
    assert!((session.start_position + session.translation).distance(corner) < 1e-3);
    assert_eq!(session.accepted_moves, 3);
    assert_eq!(tool.end_drag().as_deref(), Some("Move Vertex"));
    assert_eq!(world.resource::<CommandHistory>().undo_stack.len(), 3);
}

#[test]
fn far_face_drag_composes_through_a_transform() {
    let mut world = World::new();
    let translation = Vec3::new(3000.0, -1500.0, 2000.0);
    let entity = world
        .spawn((
            Brush::cuboid(32.0, 16.0, 32.0),
            GlobalTransform::from_translation(translation),
        ))
        .id();
    world.insert_resource(Selection {
        entities: vec![entity],
    });
    let mut tool = FaceTool::new();
    let mut document = WorldDocument::new(&mut world);
    tool.refresh(&document);

    let mut top = translation + Vec3::new(0.0, 16.0, 0.0);
    let hits = pick_from(&tool, top, Vec3::new(0.0, 20.0, 0.0), HitType::FACE_HANDLE);
    assert!(tool.start_drag(&hits));

    for delta in [
        Vec3::new(0.25, 0.5, -0.125),
        Vec3::new(-0.5, 0.75, 0.375),
        Vec3::new(0.125, 0.25, 0.5),
    ] {
        assert_eq!(tool.drag(&mut document, delta), MoveResult::Continue);
        top += delta;
        assert_eq!(tool.selected_handle_count(), 1);
        let selected = tool.manager().selected_handles();
        assert!(selected[0].center().distance(top) < 1e-2);
        assert!(selected[0].normal().dot(Vec3::Y) > 0.99);
        assert_eq!(tool.manager().handle_count(), 6);
    }
    assert_eq!(tool.end_drag().as_deref(), Some("Move Face"));
}
