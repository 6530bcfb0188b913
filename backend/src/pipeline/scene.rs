use common::model::template::{Frame, Node};
use image::GrayImage;
use std::collections::HashMap;

/// A row-specific scene: the template's canvas with every node resolved.
///
/// Code-mark bitmaps are kept beside the nodes, keyed by node index, because
/// they exist only for the lifetime of one row.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    pub width: f32,
    pub height: f32,
    pub background_color: String,
    pub nodes: Vec<Node>,
    code_marks: HashMap<usize, GrayImage>,
}

impl SceneGraph {
    pub fn new(width: f32, height: f32, background_color: String, nodes: Vec<Node>) -> Self {
        Self {
            width,
            height,
            background_color,
            nodes,
            code_marks: HashMap::new(),
        }
    }

    pub fn bind_code_mark(&mut self, node_index: usize, bitmap: GrayImage) {
        self.code_marks.insert(node_index, bitmap);
    }

    pub fn code_mark(&self, node_index: usize) -> Option<&GrayImage> {
        self.code_marks.get(&node_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// The verification link node.
    Verification,
    /// Static text the author marked as a link.
    AuthorLink,
}

/// A rectangle of the canvas that becomes a link in the composed document.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickRegion {
    pub rect: Frame,
    pub target: String,
    pub kind: RegionKind,
}
