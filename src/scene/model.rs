use crate::asset::{Handle, Mesh};
use crate::renderer::Material;
use crate::scene::Transform;

/// A mesh paired with the material it is drawn with.
#[derive(Debug, Clone, Copy)]
pub struct Primitive {
    pub mesh: Handle<Mesh>,
    pub material: Material,
}

#[derive(Debug, Clone)]
pub struct ModelNode {
    pub name: String,
    pub transform: Transform,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub primitives: Vec<Primitive>,
}

/// Node tree stored flat; a node's parent always has a smaller index.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub name: String,
    nodes: Vec<ModelNode>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    /// One root node drawing a single primitive.
    pub fn single(name: impl Into<String>, mesh: Handle<Mesh>, material: Material) -> Self {
        let mut model = Self::new(name);
        let root = model.add_node(None, "root", Transform::IDENTITY);
        model.add_primitive(root, mesh, material);
        model
    }

    /// Appends a node under `parent` and returns its index.
    ///
    /// A parent index that does not exist yet is treated as no parent.
    pub fn add_node(
        &mut self,
        parent: Option<usize>,
        name: impl Into<String>,
        transform: Transform,
    ) -> usize {
        let index = self.nodes.len();
        let parent = parent.filter(|&p| p < index);
        self.nodes.push(ModelNode {
            name: name.into(),
            transform,
            parent,
            children: Vec::new(),
            primitives: Vec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(index);
        }
        index
    }

    pub fn add_primitive(&mut self, node: usize, mesh: Handle<Mesh>, material: Material) {
        match self.nodes.get_mut(node) {
            Some(n) => n.primitives.push(Primitive { mesh, material }),
            None => log::warn!(
                "Model '{}' has no node {}; primitive dropped",
                self.name,
                node
            ),
        }
    }

    pub fn nodes(&self) -> &[ModelNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn primitive_count(&self) -> usize {
        self.nodes.iter().map(|n| n.primitives.len()).sum()
    }
}
