//! Vertex, edge and face tools: pick, select and drag handles, and turn
//! drags into document edits.

mod edge;
mod face;
mod vertex;

use bevy::prelude::*;
use chisel_geometry::PickCamera;

use crate::document::MapDocument;
use crate::handles::{HandleKind, HandleManager, Hit, PickResult};

pub use edge::EdgeTool;
pub use face::FaceTool;
pub use vertex::VertexTool;

/// Outcome of a proposed handle move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveResult {
    /// The document applied the move; keep dragging.
    Continue,
    /// The document refused the move. Nothing changed and the drag ends.
    Deny,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    /// A handle was grabbed but has not moved yet.
    Armed,
    Dragging,
}

/// State of one in-progress drag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragSession {
    /// Handle position when the drag started.
    pub start_position: Vec3,
    /// Hit point minus handle position at the start of the drag.
    pub offset: Vec3,
    /// Sum of every accepted delta.
    pub translation: Vec3,
    pub accepted_moves: usize,
}

/// Manager and drag bookkeeping shared by every tool.
#[derive(Debug)]
pub struct ToolCore<H: HandleKind> {
    manager: HandleManager<H>,
    handle_radius: f32,
    drag_handle_position: Option<Vec3>,
    session: Option<DragSession>,
    state: DragState,
}

impl<H: HandleKind> Default for ToolCore<H> {
    fn default() -> Self {
        Self {
            manager: HandleManager::new(),
            handle_radius: 4.0,
            drag_handle_position: None,
            session: None,
            state: DragState::Idle,
        }
    }
}

impl<H: HandleKind> ToolCore<H> {
    fn finish_drag(&mut self) {
        self.session = None;
        self.state = DragState::Idle;
        self.manager.end_drag();
    }
}

/// `singular` when `count` is exactly one, `plural` otherwise.
pub fn plural<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 { singular } else { plural }
}

/// A tool editing one kind of handle.
///
/// Implementors supply the handle kind, its display nouns and the document
/// request that moves a batch of handles. Everything else is shared.
pub trait HandleTool {
    type Handle: HandleKind;

    /// Display noun for one handle.
    const SINGULAR: &'static str;
    /// Display noun for any other number of handles.
    const PLURAL: &'static str;

    fn core(&self) -> &ToolCore<Self::Handle>;

    fn core_mut(&mut self) -> &mut ToolCore<Self::Handle>;

    /// Ask `document` to translate `handles` by `delta`.
    fn request_move(
        document: &mut dyn MapDocument,
        name: &str,
        handles: Vec<Self::Handle>,
        delta: Vec3,
    ) -> bool;

    fn manager(&self) -> &HandleManager<Self::Handle> {
        &self.core().manager
    }

    fn manager_mut(&mut self) -> &mut HandleManager<Self::Handle> {
        &mut self.core_mut().manager
    }

    /// Pick tolerance in screen pixels.
    fn handle_radius(&self) -> f32 {
        self.core().handle_radius
    }

    fn set_handle_radius(&mut self, radius: f32) {
        self.core_mut().handle_radius = radius;
    }

    fn drag_state(&self) -> DragState {
        self.core().state
    }

    fn drag_session(&self) -> Option<&DragSession> {
        self.core().session.as_ref()
    }

    /// Where the grabbed handle currently sits, following accepted moves.
    fn drag_handle_position(&self) -> Option<Vec3> {
        self.core().drag_handle_position
    }

    fn selected_handle_count(&self) -> usize {
        self.manager().selected_handle_count()
    }

    fn find_incident_brushes(&self, handle: &Self::Handle) -> Vec<Entity> {
        self.manager().incident_brushes(handle)
    }

    fn pick(&self, ray: Ray3d, camera: &PickCamera, pick_result: &mut PickResult) {
        self.manager()
            .pick_center_handle(ray, camera, self.handle_radius(), pick_result);
    }

    /// Canonical position of the front hit's handle, and the hit point's
    /// offset from it.
    ///
    /// # Panics
    ///
    /// If `hits` is empty or its front hit is not one of this tool's handles.
    fn handle_position_and_offset(&self, hits: &[Hit]) -> (Vec3, Vec3) {
        assert!(!hits.is_empty(), "no hits to take a handle position from");
        let hit = &hits[0];
        assert!(
            hit.has_type(<Self::Handle as HandleKind>::HIT_TYPE),
            "front hit is {:?}, expected {:?}",
            hit.hit_type,
            <Self::Handle as HandleKind>::HIT_TYPE
        );
        let Some(handle) = hit.target::<Self::Handle>() else {
            panic!("front hit carries no {} handle", Self::SINGULAR);
        };
        let position = handle.center();
        (position, hit.point - position)
    }

    fn action_name(&self) -> String {
        format!(
            "Move {}",
            plural(self.selected_handle_count(), Self::SINGULAR, Self::PLURAL)
        )
    }

    /// Propose moving every selected handle by `delta`.
    ///
    /// On acceptance the cached drag position and the selection follow the
    /// geometry and the handles are rebuilt from the document. On denial
    /// nothing changes.
    fn move_handles(&mut self, document: &mut dyn MapDocument, delta: Vec3) -> MoveResult {
        let name = self.action_name();
        let handles = self.manager().selected_handles();
        if !Self::request_move(document, &name, handles, delta) {
            return MoveResult::Deny;
        }

        let core = self.core_mut();
        if let Some(position) = &mut core.drag_handle_position {
            *position += delta;
        }
        core.manager.translate_selection(delta);
        core.manager
            .rebuild(&document.edited_brushes(), document.revision());
        MoveResult::Continue
    }

    /// Remove every vertex of every selected handle in one document request.
    fn remove_selection(&mut self, document: &mut dyn MapDocument) {
        let selected = self.manager().selected_handles();
        if selected.is_empty() {
            return;
        }
        let positions: Vec<Vec3> = selected
            .iter()
            .flat_map(HandleKind::vertex_positions)
            .collect();
        let name = format!(
            "Remove Brush {}",
            plural(selected.len(), Self::SINGULAR, Self::PLURAL)
        );
        if document.remove_vertices(&name, positions) {
            info!("{name}");
        }
        self.refresh(document);
    }

    /// Grab the front hit's handle. Returns false, leaving the tool idle, when
    /// the front hit is not one of this tool's handles.
    fn start_drag(&mut self, hits: &[Hit]) -> bool {
        let Some(handle) = hits
            .first()
            .filter(|hit| hit.has_type(<Self::Handle as HandleKind>::HIT_TYPE))
            .and_then(|hit| hit.target::<Self::Handle>())
            .cloned()
        else {
            return false;
        };
        if !self.manager().contains(&handle) {
            return false;
        }

        let (position, offset) = self.handle_position_and_offset(hits);
        let core = self.core_mut();
        if !core.manager.is_selected(&handle) {
            core.manager.select_only(&handle);
        }
        core.manager.begin_drag(&handle, position);
        core.drag_handle_position = Some(position);
        core.session = Some(DragSession {
            start_position: position,
            offset,
            translation: Vec3::ZERO,
            accepted_moves: 0,
        });
        core.state = DragState::Armed;
        true
    }

    /// Move the grabbed handles by `delta`. A denied move ends the drag.
    fn drag(&mut self, document: &mut dyn MapDocument, delta: Vec3) -> MoveResult {
        if self.drag_state() == DragState::Idle {
            return MoveResult::Deny;
        }
        if delta == Vec3::ZERO {
            return MoveResult::Continue;
        }

        let result = self.move_handles(document, delta);
        let core = self.core_mut();
        match result {
            MoveResult::Continue => {
                if let Some(session) = &mut core.session {
                    session.translation += delta;
                    session.accepted_moves += 1;
                }
                if let Some(position) = core.drag_handle_position {
                    core.manager.set_drag_position(position);
                }
                core.state = DragState::Dragging;
            }
            MoveResult::Deny => {
                debug!("{} drag denied", Self::SINGULAR);
                core.finish_drag();
            }
        }
        result
    }

    /// Commit the drag. Returns the action name when anything moved.
    fn end_drag(&mut self) -> Option<String> {
        if self.drag_state() == DragState::Idle {
            return None;
        }
        let moved = self
            .drag_session()
            .copied()
            .filter(|session| session.accepted_moves > 0);
        let name = self.action_name();
        let core = self.core_mut();
        core.finish_drag();
        core.drag_handle_position = None;
        moved.map(|session| {
            info!(
                "{name} from {} to {}",
                session.start_position,
                session.start_position + session.translation
            );
            name
        })
    }

    /// Drop the drag without touching the document.
    fn cancel_drag(&mut self) {
        let core = self.core_mut();
        core.finish_drag();
        core.drag_handle_position = None;
    }

    /// Rebuild the handles if the document changed since the last rebuild.
    fn refresh(&mut self, document: &dyn MapDocument) {
        let revision = document.revision();
        if self.manager().revision() == Some(revision) {
            return;
        }
        if self.drag_state() != DragState::Idle {
            self.cancel_drag();
        }
        self.manager_mut()
            .rebuild(&document.edited_brushes(), revision);
    }

    /// Leave the tool: cancel any drag and forget every handle.
    fn deactivate(&mut self) {
        self.cancel_drag();
        self.manager_mut().clear();
    }
}
