use bevy::prelude::*;
use chisel_geometry::Polygon3;

use super::{HandleTool, ToolCore};
use crate::document::MapDocument;

/// Drags whole brush faces by their centroids.
#[derive(Debug, Default)]
pub struct FaceTool {
    core: ToolCore<Polygon3>,
}

impl FaceTool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HandleTool for FaceTool {
    type Handle = Polygon3;

    const SINGULAR: &'static str = "Face";
    const PLURAL: &'static str = "Faces";

    fn core(&self) -> &ToolCore<Polygon3> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ToolCore<Polygon3> {
        &mut self.core
    }

    fn request_move(
        document: &mut dyn MapDocument,
        name: &str,
        handles: Vec<Polygon3>,
        delta: Vec3,
    ) -> bool {
        document.move_faces(name, handles, delta)
    }
}
