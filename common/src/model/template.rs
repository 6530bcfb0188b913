use serde::{Deserialize, Serialize};

/// A document design: a fixed-size canvas and the positioned nodes drawn on it.
///
/// Templates are authored elsewhere and handed to a batch job as read-only input.
/// The job re-reads the same template for every data row and never mutates it;
/// per-row changes always produce new node values.
///
/// Coordinates and sizes are canvas pixels, origin at the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub width: f32,
    pub height: f32,
    #[serde(default = "default_background")]
    pub background_color: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// Largest accepted canvas width or height, in canvas pixels.
pub const MAX_CANVAS_SIDE: f32 = 5000.0;

fn default_background() -> String {
    "#ffffff".to_string()
}

impl Template {
    /// Checks the structural rules a job relies on before it starts.
    ///
    /// - The canvas must have a positive size of at most [`MAX_CANVAS_SIDE`]
    ///   on each side.
    /// - Every node frame must have a positive size.
    /// - At most one `VerificationLink` node may exist.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(format!(
                "template canvas must have a positive size, got {}x{}",
                self.width, self.height
            ));
        }
        if self.width > MAX_CANVAS_SIDE || self.height > MAX_CANVAS_SIDE {
            return Err(format!(
                "template canvas {}x{} exceeds the maximum side of {}",
                self.width, self.height, MAX_CANVAS_SIDE
            ));
        }

        for (index, node) in self.nodes.iter().enumerate() {
            let frame = node.frame();
            if !(frame.width > 0.0 && frame.height > 0.0) {
                return Err(format!(
                    "node {} ({}) has an empty frame {}x{}",
                    index,
                    node.kind(),
                    frame.width,
                    frame.height
                ));
            }
        }

        let links = self
            .nodes
            .iter()
            .filter(|n| matches!(n, Node::VerificationLink(_)))
            .count();
        if links > 1 {
            return Err(format!(
                "template has {} verification link nodes, at most one is allowed",
                links
            ));
        }

        Ok(())
    }

    pub fn has_verification_link(&self) -> bool {
        self.nodes
            .iter()
            .any(|n| matches!(n, Node::VerificationLink(_)))
    }
}

/// Position and size of a node on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Frame {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextStyle {
    pub font_size: f32,
    pub color: String,
    pub align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            color: "#000000".to_string(),
            align: TextAlign::Left,
        }
    }
}

/// A node of the template scene graph.
///
/// The `type` field of the JSON object selects the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    /// Fixed content that is identical in every generated document.
    Static(StaticNode),
    /// Text bound to a data column and resolved per row.
    Variable(VariableNode),
    /// The scannable code that encodes the row's verification URL.
    CodeMark(CodeMarkNode),
    /// The text node that carries the verification URL and becomes clickable.
    VerificationLink(VerificationLinkNode),
    /// Selection boundary drawn by the editor. Never exported.
    Guide(GuideNode),
}

impl Node {
    pub fn frame(&self) -> &Frame {
        match self {
            Node::Static(n) => &n.frame,
            Node::Variable(n) => &n.frame,
            Node::CodeMark(n) => &n.frame,
            Node::VerificationLink(n) => &n.frame,
            Node::Guide(n) => &n.frame,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Node::Static(_) => "static",
            Node::Variable(_) => "variable",
            Node::CodeMark(_) => "codeMark",
            Node::VerificationLink(_) => "verificationLink",
            Node::Guide(_) => "guide",
        }
    }

    /// Nodes that exist only to help template authors and must not be rendered
    /// into an exported artifact.
    pub fn is_editor_only(&self) -> bool {
        matches!(self, Node::Guide(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticNode {
    pub frame: Frame,
    pub content: StaticContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StaticContent {
    Text {
        text: String,
        #[serde(default)]
        style: TextStyle,
        /// Author-marked link text: the literal text is used as a link target.
        #[serde(default)]
        clickable: bool,
    },
    Shape {
        #[serde(default)]
        shape: ShapeKind,
        #[serde(default)]
        fill: Option<String>,
        #[serde(default)]
        stroke: Option<String>,
        #[serde(default = "default_stroke_width", rename = "strokeWidth")]
        stroke_width: f32,
    },
    /// Base64-encoded PNG or JPEG stretched to the frame.
    Image { data: String },
}

fn default_stroke_width() -> f32 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Rect,
    Ellipse,
}

/// Dashed border and column badge shown around unresolved placeholders in the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderStyle {
    pub border_color: String,
    #[serde(default)]
    pub badge: Option<String>,
}

impl Default for PlaceholderStyle {
    fn default() -> Self {
        Self {
            border_color: "#1e88e5".to_string(),
            badge: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableNode {
    pub frame: Frame,
    pub bound_column: String,
    /// Text shown for the node. Authored as `{{column}}` and replaced per row.
    pub display_text: String,
    #[serde(default)]
    pub style: TextStyle,
    #[serde(default)]
    pub placeholder_style: Option<PlaceholderStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeMarkNode {
    pub frame: Frame,
    /// The generation ID the code currently encodes. Empty in an authored template.
    #[serde(default)]
    pub current_id: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
}

/// Background and border the editor paints behind the link so authors can find it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkAuthoringStyle {
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub border: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationLinkNode {
    pub frame: Frame,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub style: TextStyle,
    #[serde(default = "locked")]
    pub is_locked: bool,
    #[serde(default)]
    pub authoring_style: Option<LinkAuthoringStyle>,
}

fn locked() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideNode {
    pub frame: Frame,
    #[serde(default)]
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(x: f32) -> Node {
        Node::VerificationLink(VerificationLinkNode {
            frame: Frame::new(x, 10.0, 100.0, 20.0),
            text: String::new(),
            style: TextStyle::default(),
            is_locked: true,
            authoring_style: None,
        })
    }

    #[test]
    fn deserializes_tagged_nodes() {
        let json = r##"{
            "width": 800, "height": 600,
            "nodes": [
                {"type": "static", "frame": {"x": 0, "y": 0, "width": 10, "height": 10},
                 "content": {"kind": "shape", "fill": "#ff0000"}},
                {"type": "variable", "frame": {"x": 0, "y": 0, "width": 10, "height": 10},
                 "boundColumn": "name", "displayText": "{{name}}",
                 "placeholderStyle": {"borderColor": "#00f"}},
                {"type": "codeMark", "frame": {"x": 0, "y": 0, "width": 10, "height": 10}},
                {"type": "verificationLink", "frame": {"x": 0, "y": 0, "width": 10, "height": 10}},
                {"type": "guide", "frame": {"x": 0, "y": 0, "width": 10, "height": 10}}
            ]
        }"##;
        let template: Template = serde_json::from_str(json).unwrap();
        assert_eq!(template.background_color, "#ffffff");
        let kinds: Vec<_> = template.nodes.iter().map(Node::kind).collect();
        assert_eq!(
            kinds,
            vec!["static", "variable", "codeMark", "verificationLink", "guide"]
        );
        match &template.nodes[3] {
            Node::VerificationLink(l) => assert!(l.is_locked),
            other => panic!("unexpected node {:?}", other),
        }
        assert!(template.nodes[4].is_editor_only());
        assert!(template.validate().is_ok());
    }

    #[test]
    fn rejects_two_verification_links() {
        let template = Template {
            width: 800.0,
            height: 600.0,
            background_color: default_background(),
            nodes: vec![link(0.0), link(200.0)],
        };
        let err = template.validate().unwrap_err();
        assert!(err.contains("at most one"), "{err}");
    }

    #[test]
    fn rejects_empty_canvas_and_frames() {
        let mut template = Template {
            width: 0.0,
            height: 600.0,
            background_color: default_background(),
            nodes: vec![],
        };
        assert!(template.validate().is_err());

        template.width = 800.0;
        template.nodes.push(Node::Guide(GuideNode {
            frame: Frame::new(0.0, 0.0, 0.0, 5.0),
            color: None,
        }));
        assert!(template.validate().unwrap_err().contains("guide"));
    }

    #[test]
    fn rejects_oversized_canvas() {
        let mut template = Template {
            width: 20000.0,
            height: 20000.0,
            background_color: default_background(),
            nodes: vec![],
        };
        assert!(template.validate().unwrap_err().contains("maximum"));

        template.width = f32::INFINITY;
        template.height = 600.0;
        assert!(template.validate().is_err());

        template.width = MAX_CANVAS_SIDE;
        template.height = MAX_CANVAS_SIDE;
        assert!(template.validate().is_ok());
    }
}
