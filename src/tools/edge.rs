use bevy::prelude::*;
use chisel_geometry::Segment3;

use super::{HandleTool, ToolCore};
use crate::document::MapDocument;

/// Drags brush edges by their midpoints.
#[derive(Debug, Default)]
pub struct EdgeTool {
    core: ToolCore<Segment3>,
}

impl EdgeTool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HandleTool for EdgeTool {
    type Handle = Segment3;

    const SINGULAR: &'static str = "Edge";
    const PLURAL: &'static str = "Edges";

    fn core(&self) -> &ToolCore<Segment3> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ToolCore<Segment3> {
        &mut self.core
    }

    fn request_move(
        document: &mut dyn MapDocument,
        name: &str,
        handles: Vec<Segment3>,
        delta: Vec3,
    ) -> bool {
        document.move_edges(name, handles, delta)
    }
}
