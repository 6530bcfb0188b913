//! Resolves a template against one data row.
//!
//! The template is never touched: every node is cloned into the new scene, and
//! nodes that change per row are rebuilt as new values. The result carries the
//! clickable regions the document composer turns into link annotations.

use crate::pipeline::code_mark::{verification_url, CodeMarkGenerator};
use crate::pipeline::error::Result;
use crate::pipeline::scene::{ClickRegion, RegionKind, SceneGraph};
use common::model::record::GenerationId;
use common::model::row::DataRow;
use common::model::template::{
    CodeMarkNode, Node, StaticContent, Template, VariableNode, VerificationLinkNode,
};
use log::debug;

/// Output of [`TemplateInstantiator::instantiate`].
#[derive(Debug, Clone)]
pub struct Instantiated {
    pub scene: SceneGraph,
    pub regions: Vec<ClickRegion>,
    pub verification_url: String,
    /// Bound columns absent from the row. Their nodes keep the authored
    /// placeholder text and styling.
    pub unresolved_columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TemplateInstantiator {
    verify_base_url: String,
    code_marks: CodeMarkGenerator,
}

impl TemplateInstantiator {
    pub fn new(verify_base_url: impl Into<String>, code_marks: CodeMarkGenerator) -> Self {
        Self {
            verify_base_url: verify_base_url.into(),
            code_marks,
        }
    }

    pub fn instantiate(
        &self,
        template: &Template,
        row: &DataRow,
        id: &GenerationId,
    ) -> Result<Instantiated> {
        let url = verification_url(&self.verify_base_url, id);
        let mut nodes = Vec::with_capacity(template.nodes.len());
        let mut regions = Vec::new();
        let mut unresolved_columns = Vec::new();
        let mut code_marks = Vec::new();

        for (index, node) in template.nodes.iter().enumerate() {
            let resolved = match node {
                Node::Static(s) => {
                    if let StaticContent::Text {
                        text,
                        clickable: true,
                        ..
                    } = &s.content
                    {
                        if let Some(target) = link_target(text) {
                            regions.push(ClickRegion {
                                rect: s.frame,
                                target,
                                kind: RegionKind::AuthorLink,
                            });
                        }
                    }
                    node.clone()
                }
                Node::Variable(v) => match row.get(&v.bound_column) {
                    Some(value) => Node::Variable(VariableNode {
                        display_text: value.to_string(),
                        placeholder_style: None,
                        ..v.clone()
                    }),
                    None => {
                        if !unresolved_columns.contains(&v.bound_column) {
                            unresolved_columns.push(v.bound_column.clone());
                        }
                        node.clone()
                    }
                },
                Node::CodeMark(c) => {
                    code_marks.push((index, self.code_marks.generate(&url)?));
                    Node::CodeMark(CodeMarkNode {
                        current_id: Some(id.to_string()),
                        target_url: Some(url.clone()),
                        ..c.clone()
                    })
                }
                Node::VerificationLink(l) => {
                    regions.push(ClickRegion {
                        rect: l.frame,
                        target: url.clone(),
                        kind: RegionKind::Verification,
                    });
                    Node::VerificationLink(VerificationLinkNode {
                        text: url.clone(),
                        authoring_style: None,
                        ..l.clone()
                    })
                }
                Node::Guide(_) => node.clone(),
            };
            nodes.push(resolved);
        }

        let mut scene = SceneGraph::new(
            template.width,
            template.height,
            template.background_color.clone(),
            nodes,
        );
        for (index, bitmap) in code_marks {
            scene.bind_code_mark(index, bitmap);
        }

        debug!(
            "instantiated {} nodes for {} ({} regions, {} unresolved columns)",
            scene.nodes.len(),
            id,
            regions.len(),
            unresolved_columns.len()
        );

        Ok(Instantiated {
            scene,
            regions,
            verification_url: url,
            unresolved_columns,
        })
    }
}

/// Link target for author-marked text. Bare hosts get an `https://` scheme.
fn link_target(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() || text.contains(char::is_whitespace) {
        return None;
    }
    if text.contains("://") || text.starts_with("mailto:") {
        Some(text.to_string())
    } else {
        Some(format!("https://{}", text))
    }
}
