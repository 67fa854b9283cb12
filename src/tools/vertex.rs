use bevy::prelude::*;

use super::{HandleTool, ToolCore};
use crate::document::MapDocument;
use crate::handles::VertexHandle;

/// Drags brush corners. Moving a shared corner moves it in every brush.
#[derive(Debug, Default)]
pub struct VertexTool {
    core: ToolCore<VertexHandle>,
}

impl VertexTool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HandleTool for VertexTool {
    type Handle = VertexHandle;

    const SINGULAR: &'static str = "Vertex";
    const PLURAL: &'static str = "Vertices";

    fn core(&self) -> &ToolCore<VertexHandle> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ToolCore<VertexHandle> {
        &mut self.core
    }

    fn request_move(
        document: &mut dyn MapDocument,
        name: &str,
        handles: Vec<VertexHandle>,
        delta: Vec3,
    ) -> bool {
        let positions = handles.iter().map(VertexHandle::position).collect();
        document.move_vertices(name, positions, delta)
    }
}
