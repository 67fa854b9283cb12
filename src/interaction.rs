use bevy::prelude::*;
use chisel_geometry::{PickCamera, ray_plane_intersection};

use crate::brush::Brush;
use crate::document::{MapDocument, WorldDocument};
use crate::handles::{BrushFaceHit, HandleKind, Hit, HitType, PickResult, pick_brush_faces};
use crate::preferences::Preferences;
use crate::selection::Selection;
use crate::textures::TextureNameStrategy;
use crate::tools::{DragState, EdgeTool, FaceTool, HandleTool, MoveResult, VertexTool};

pub struct HandleInteractionPlugin;

impl Plugin for HandleInteractionPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<EditMode>()
            .register_type::<BrushEditMode>()
            .init_resource::<EditMode>()
            .init_resource::<HandleTools>()
            .init_resource::<PointerRay>()
            .init_resource::<TextureNameStrategy>()
            .add_systems(
                Update,
                (
                    handle_edit_mode_keys,
                    update_pointer_ray,
                    drive_handle_tools,
                    (draw_brush_wireframes, draw_handle_gizmos),
                )
                    .chain(),
            );
    }
}

// ---------------------------------------------------------------------------
// Modes and tools
// ---------------------------------------------------------------------------

#[derive(Resource, Reflect, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[reflect(Resource)]
pub enum EditMode {
    #[default]
    Object,
    BrushEdit(BrushEditMode),
}

#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BrushEditMode {
    Vertex,
    Edge,
    #[default]
    Face,
}

/// One tool per handle kind. Only the tool for the current
/// [`BrushEditMode`] holds handles; the others are deactivated.
#[derive(Resource, Default)]
pub struct HandleTools {
    pub vertex: VertexTool,
    pub edge: EdgeTool,
    pub face: FaceTool,
    active: Option<BrushEditMode>,
    drag_plane: Option<DragPlane>,
}

/// Plane the pointer is projected onto while dragging.
#[derive(Clone, Copy, Debug)]
struct DragPlane {
    point: Vec3,
    normal: Vec3,
}

impl HandleTools {
    pub fn active(&self) -> Option<BrushEditMode> {
        self.active
    }

    pub fn set_active(&mut self, mode: Option<BrushEditMode>) {
        if self.active == mode {
            return;
        }
        self.vertex.deactivate();
        self.edge.deactivate();
        self.face.deactivate();
        self.drag_plane = None;
        self.active = mode;
    }
}

/// Cursor ray through the 3D camera, refreshed every frame.
#[derive(Resource, Default, Clone, Copy, Debug)]
pub struct PointerRay(pub Option<(Ray3d, PickCamera)>);

fn handle_edit_mode_keys(
    keyboard: Res<ButtonInput<KeyCode>>,
    selection: Res<Selection>,
    brushes: Query<(), With<Brush>>,
    mut edit_mode: ResMut<EditMode>,
) {
    // Backtick toggles brush editing, provided a brush is selected.
    if keyboard.just_pressed(KeyCode::Backquote) {
        *edit_mode = match *edit_mode {
            EditMode::Object if selection.entities.iter().any(|&e| brushes.contains(e)) => {
                EditMode::BrushEdit(BrushEditMode::default())
            }
            EditMode::Object => return,
            EditMode::BrushEdit(_) => EditMode::Object,
        };
        return;
    }

    if let EditMode::BrushEdit(current) = *edit_mode {
        let next = if keyboard.just_pressed(KeyCode::Digit1) {
            BrushEditMode::Vertex
        } else if keyboard.just_pressed(KeyCode::Digit2) {
            BrushEditMode::Edge
        } else if keyboard.just_pressed(KeyCode::Digit3) {
            BrushEditMode::Face
        } else {
            current
        };
        if next != current {
            *edit_mode = EditMode::BrushEdit(next);
        }
    }
}

fn update_pointer_ray(
    windows: Query<&Window>,
    cameras: Query<(&Camera, &GlobalTransform, &Projection), With<Camera3d>>,
    mut pointer: ResMut<PointerRay>,
) {
    pointer.0 = None;
    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let Ok((camera, cam_tf, projection)) = cameras.single() else {
        return;
    };
    let Ok(ray) = camera.viewport_to_world(cam_tf, cursor) else {
        return;
    };

    let viewport_height = camera
        .logical_viewport_size()
        .map_or(window.height(), |size| size.y);
    let position = cam_tf.translation();
    let forward = cam_tf.forward();
    let pick_camera = match projection {
        Projection::Orthographic(ortho) => {
            PickCamera::orthographic(position, forward, ortho.area.height(), viewport_height)
        }
        Projection::Perspective(perspective) => {
            PickCamera::perspective(position, forward, perspective.fov, viewport_height)
        }
        _ => PickCamera::perspective(
            position,
            forward,
            PerspectiveProjection::default().fov,
            viewport_height,
        ),
    };
    pointer.0 = Some((ray, pick_camera));
}

// ---------------------------------------------------------------------------
// Tool driving
// ---------------------------------------------------------------------------

/// Input relevant to the handle tools this frame.
#[derive(Clone, Copy, Debug, Default)]
struct FrameInput {
    pointer: Option<(Ray3d, PickCamera)>,
    press: bool,
    release: bool,
    /// Ctrl held: clicks toggle handle selection instead of dragging.
    toggle: bool,
    cancel: bool,
    delete: bool,
    handle_radius: f32,
    max_pick_distance: f32,
}

impl FrameInput {
    fn read(world: &World) -> Self {
        let preferences = world.get_resource::<Preferences>().cloned().unwrap_or_default();
        let mut input = Self {
            pointer: world.get_resource::<PointerRay>().and_then(|p| p.0),
            handle_radius: preferences.handle_radius,
            max_pick_distance: preferences.max_pick_distance,
            ..default()
        };
        if let Some(mouse) = world.get_resource::<ButtonInput<MouseButton>>() {
            input.press = mouse.just_pressed(MouseButton::Left);
            input.release = mouse.just_released(MouseButton::Left);
            input.cancel = mouse.just_pressed(MouseButton::Right);
        }
        if let Some(keyboard) = world.get_resource::<ButtonInput<KeyCode>>() {
            input.toggle = keyboard.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]);
            input.cancel |= keyboard.just_pressed(KeyCode::Escape);
            input.delete = keyboard.any_just_pressed([KeyCode::Delete, KeyCode::Backspace]);
        }
        input
    }
}

fn drive_handle_tools(world: &mut World) {
    let mode = match world.get_resource::<EditMode>() {
        Some(EditMode::BrushEdit(mode)) => Some(*mode),
        _ => None,
    };
    let input = FrameInput::read(world);
    let naming = world
        .get_resource::<TextureNameStrategy>()
        .cloned()
        .unwrap_or_default();

    world.resource_scope(|world, mut tools: Mut<HandleTools>| {
        tools.set_active(mode);
        let Some(mode) = mode else {
            return;
        };
        let tools = &mut *tools;
        let mut document = WorldDocument::new(world);
        let drag_plane = &mut tools.drag_plane;
        match mode {
            BrushEditMode::Vertex => {
                drive_tool(&mut tools.vertex, &mut document, &input, drag_plane, &naming);
            }
            BrushEditMode::Edge => {
                drive_tool(&mut tools.edge, &mut document, &input, drag_plane, &naming);
            }
            BrushEditMode::Face => {
                drive_tool(&mut tools.face, &mut document, &input, drag_plane, &naming);
            }
        }
    });
}

fn drive_tool<T: HandleTool>(
    tool: &mut T,
    document: &mut WorldDocument,
    input: &FrameInput,
    drag_plane: &mut Option<DragPlane>,
    naming: &TextureNameStrategy,
) {
    tool.set_handle_radius(input.handle_radius);
    tool.refresh(document);
    if tool.drag_state() == DragState::Idle {
        *drag_plane = None;
    }

    if input.cancel {
        tool.cancel_drag();
        *drag_plane = None;
        return;
    }
    if input.delete && tool.drag_state() == DragState::Idle {
        tool.remove_selection(document);
        return;
    }
    let Some((ray, camera)) = input.pointer else {
        return;
    };

    if tool.drag_state() != DragState::Idle {
        if input.release {
            tool.end_drag();
            *drag_plane = None;
            return;
        }
        let (Some(plane), Some(session), Some(current)) = (
            *drag_plane,
            tool.drag_session().copied(),
            tool.drag_handle_position(),
        ) else {
            return;
        };
        let Some(point) = ray_plane_intersection(ray, plane.point, plane.normal) else {
            return;
        };
        let delta = point - session.offset - current;
        if tool.drag(document, delta) == MoveResult::Deny {
            *drag_plane = None;
        }
        return;
    }

    let mut pick_result = PickResult::default();
    tool.pick(ray, &camera, &mut pick_result);
    let hits: Vec<Hit> = pick_result
        .hits()
        .iter()
        .filter(|hit| hit.distance <= input.max_pick_distance)
        .cloned()
        .collect();
    let front = hits
        .first()
        .and_then(|hit| hit.target::<T::Handle>())
        .cloned();
    tool.manager_mut().set_highlight(front.as_ref());

    if !input.press {
        return;
    }
    match front {
        Some(handle) if input.toggle => tool.manager_mut().toggle(&handle),
        Some(_) => {
            if tool.start_drag(&hits) {
                *drag_plane = Some(DragPlane {
                    point: hits[0].point,
                    normal: *camera.forward,
                });
            }
        }
        None => {
            if !input.toggle {
                tool.manager_mut().deselect_all();
            }
            log_clicked_face(ray, document, naming);
        }
    }
}

fn log_clicked_face(ray: Ray3d, document: &WorldDocument, naming: &TextureNameStrategy) {
    let brushes = document.edited_brushes();
    let mut pick_result = PickResult::default();
    pick_brush_faces(ray, &brushes, &mut pick_result);
    let Some(hit) = pick_result
        .first_of_type(HitType::BRUSH_FACE)
        .and_then(|hit| hit.target::<BrushFaceHit>())
    else {
        return;
    };
    let texture = document
        .brush(hit.brush)
        .and_then(|brush| brush.faces.get(hit.face))
        .and_then(|face| {
            let size = face
                .texture_path
                .as_deref()
                .and_then(|path| document.texture_size(path));
            naming.face_texture_label(face, size)
        });
    debug!(
        "Clicked face {} of {:?} ({})",
        hit.face,
        hit.brush,
        texture.as_deref().unwrap_or("untextured")
    );
}

// ---------------------------------------------------------------------------
// Gizmos
// ---------------------------------------------------------------------------

const HANDLE_SPHERE_RADIUS: f32 = 0.04;
const BRUSH_WIRE_COLOR: Color = Color::srgba(0.6, 0.6, 0.6, 1.0);

fn draw_brush_wireframes(
    edit_mode: Res<EditMode>,
    brushes: Query<(&Brush, Option<&GlobalTransform>)>,
    mut gizmos: Gizmos,
) {
    // Brush edit mode draws its own edges.
    if *edit_mode != EditMode::Object {
        return;
    }
    for (brush, transform) in &brushes {
        let transform = transform.copied().unwrap_or_default();
        for edge in brush.geometry().edges() {
            gizmos.line(
                transform.transform_point(edge.start()),
                transform.transform_point(edge.end()),
                BRUSH_WIRE_COLOR,
            );
        }
    }
}

fn handle_color<H: HandleKind>(
    tool: &impl HandleTool<Handle = H>,
    handle: &H,
    base: Color,
    preferences: &Preferences,
) -> Color {
    if tool.manager().highlighted() == Some(handle) {
        preferences.highlighted_color()
    } else if tool.manager().is_selected(handle) {
        preferences.selected_color()
    } else {
        base
    }
}

fn draw_handle_gizmos(tools: Res<HandleTools>, preferences: Res<Preferences>, mut gizmos: Gizmos) {
    match tools.active() {
        None => {}
        Some(BrushEditMode::Vertex) => {
            let tool = &tools.vertex;
            for handle in tool.manager().all_handles() {
                let color = handle_color(tool, handle, preferences.vertex_color(), &preferences);
                gizmos.sphere(
                    Isometry3d::from_translation(handle.position()),
                    HANDLE_SPHERE_RADIUS,
                    color,
                );
            }
        }
        Some(BrushEditMode::Edge) => {
            let tool = &tools.edge;
            for handle in tool.manager().all_handles() {
                let color = handle_color(tool, handle, preferences.edge_color(), &preferences);
                gizmos.line(handle.start(), handle.end(), color);
                gizmos.sphere(
                    Isometry3d::from_translation(handle.center()),
                    HANDLE_SPHERE_RADIUS,
                    color,
                );
            }
        }
        Some(BrushEditMode::Face) => {
            let tool = &tools.face;
            for handle in tool.manager().all_handles() {
                let color = handle_color(tool, handle, preferences.face_color(), &preferences);
                let vertices = handle.vertices();
                for (i, start) in vertices.iter().enumerate() {
                    gizmos.line(*start, vertices[(i + 1) % vertices.len()], color);
                }
                gizmos.sphere(
                    Isometry3d::from_translation(handle.center()),
                    HANDLE_SPHERE_RADIUS,
                    color,
                );
            }
        }
    }
}
