use std::collections::HashMap;

use super::error::ModelError;

const ROOT_NAME: &str = "root";

/// How the dataset describes the leaf ordering of the radial view.
#[derive(Clone, Debug, Default)]
pub enum HierarchySpec {
    /// Every vertex hangs directly off the root, in vertex order.
    #[default]
    Implicit,
    Tree(TreeSpec),
    /// Dot separated paths whose last segment names a vertex.
    Paths(Vec<String>),
}

#[derive(Clone, Debug)]
pub struct TreeSpec {
    pub name: String,
    pub children: Vec<TreeSpec>,
}

#[derive(Clone, Debug)]
pub struct HierarchyNode {
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub depth: usize,
    pub height: usize,
    pub vertex: Option<usize>,
}

/// Tree over vertex names. Node 0 is the root and parents always precede
/// their children.
#[derive(Clone, Debug)]
pub struct Hierarchy {
    nodes: Vec<HierarchyNode>,
    leaves: Vec<usize>,
    leaf_by_vertex: Vec<usize>,
}

impl Hierarchy {
    pub(super) fn build(
        spec: &HierarchySpec,
        vertex_names: &[String],
        index_by_name: &HashMap<String, usize>,
    ) -> Result<Self, ModelError> {
        let mut builder = Builder {
            nodes: vec![HierarchyNode {
                name: ROOT_NAME.to_owned(),
                parent: None,
                children: Vec::new(),
                depth: 0,
                height: 0,
                vertex: None,
            }],
            placed: vec![false; vertex_names.len()],
            index_by_name,
        };

        match spec {
            HierarchySpec::Implicit => {}
            HierarchySpec::Tree(tree) => {
                if tree.children.is_empty() && index_by_name.contains_key(&tree.name) {
                    builder.add_leaf(0, &tree.name)?;
                } else {
                    builder.nodes[0].name = tree.name.clone();
                    for child in &tree.children {
                        builder.add_tree(0, child)?;
                    }
                }
            }
            HierarchySpec::Paths(paths) => {
                let mut groups: HashMap<String, usize> = HashMap::new();
                for path in paths {
                    let segments = path.split('.').collect::<Vec<_>>();
                    let Some((leaf, groups_path)) = segments.split_last() else {
                        continue;
                    };

                    let mut parent = 0;
                    let mut key = String::new();
                    for segment in groups_path {
                        if !key.is_empty() {
                            key.push('.');
                        }
                        key.push_str(segment);
                        parent = match groups.get(&key) {
                            Some(&existing) => existing,
                            None => {
                                let created = builder.add_group(parent, segment);
                                groups.insert(key.clone(), created);
                                created
                            }
                        };
                    }
                    builder.add_leaf(parent, leaf)?;
                }
            }
        }

        for (vertex, name) in vertex_names.iter().enumerate() {
            if !builder.placed[vertex] {
                builder.add_leaf(0, name)?;
            }
        }

        let mut nodes = builder.nodes;
        for index in (0..nodes.len()).rev() {
            let height = nodes[index]
                .children
                .iter()
                .map(|&child| nodes[child].height + 1)
                .max()
                .unwrap_or(0);
            nodes[index].height = height;
        }

        let mut leaves = Vec::new();
        collect_leaves(&nodes, 0, &mut leaves);

        let mut leaf_by_vertex = vec![0; vertex_names.len()];
        for &leaf in &leaves {
            if let Some(vertex) = nodes[leaf].vertex {
                leaf_by_vertex[vertex] = leaf;
            }
        }

        Ok(Self {
            nodes,
            leaves,
            leaf_by_vertex,
        })
    }

    pub fn nodes(&self) -> &[HierarchyNode] {
        &self.nodes
    }

    /// Vertex leaves in pre-order; this is the angular order of the radial view.
    pub fn leaves(&self) -> &[usize] {
        &self.leaves
    }

    pub fn leaf_of(&self, vertex: usize) -> Option<usize> {
        self.leaf_by_vertex.get(vertex).copied()
    }

    pub fn height(&self) -> usize {
        self.nodes[0].height
    }

    /// Nodes from `from` up to the lowest common ancestor and back down to `to`.
    pub fn path(&self, from: usize, to: usize) -> Vec<usize> {
        let mut up = vec![from];
        let mut down = vec![to];
        let (mut a, mut b) = (from, to);

        while self.nodes[a].depth > self.nodes[b].depth {
            a = self.parent_or_self(a);
            up.push(a);
        }
        while self.nodes[b].depth > self.nodes[a].depth {
            b = self.parent_or_self(b);
            down.push(b);
        }
        while a != b {
            let (next_a, next_b) = (self.parent_or_self(a), self.parent_or_self(b));
            if next_a == a && next_b == b {
                break;
            }
            a = next_a;
            b = next_b;
            up.push(a);
            down.push(b);
        }

        down.pop();
        up.extend(down.into_iter().rev());
        up
    }

    fn parent_or_self(&self, index: usize) -> usize {
        self.nodes[index].parent.unwrap_or(index)
    }
}

struct Builder<'a> {
    nodes: Vec<HierarchyNode>,
    placed: Vec<bool>,
    index_by_name: &'a HashMap<String, usize>,
}

impl Builder<'_> {
    fn push(&mut self, parent: usize, name: &str, vertex: Option<usize>) -> usize {
        let index = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(HierarchyNode {
            name: name.to_owned(),
            parent: Some(parent),
            children: Vec::new(),
            depth,
            height: 0,
            vertex,
        });
        self.nodes[parent].children.push(index);
        index
    }

    fn add_group(&mut self, parent: usize, name: &str) -> usize {
        self.push(parent, name, None)
    }

    fn add_leaf(&mut self, parent: usize, name: &str) -> Result<usize, ModelError> {
        let Some(&vertex) = self.index_by_name.get(name) else {
            return Err(ModelError::UnknownVertexReference {
                referrer: "hierarchy".to_owned(),
                name: name.to_owned(),
            });
        };
        if self.placed[vertex] {
            return Err(ModelError::DuplicateVertex(name.to_owned()));
        }

        self.placed[vertex] = true;
        Ok(self.push(parent, name, Some(vertex)))
    }

    fn add_tree(&mut self, parent: usize, tree: &TreeSpec) -> Result<(), ModelError> {
        if tree.children.is_empty() {
            self.add_leaf(parent, &tree.name)?;
            return Ok(());
        }

        let group = self.add_group(parent, &tree.name);
        for child in &tree.children {
            self.add_tree(group, child)?;
        }
        Ok(())
    }
}

fn collect_leaves(nodes: &[HierarchyNode], index: usize, leaves: &mut Vec<usize>) {
    let node = &nodes[index];
    if node.vertex.is_some() {
        leaves.push(index);
    }
    for &child in &node.children {
        collect_leaves(nodes, child, leaves);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> (Vec<String>, HashMap<String, usize>) {
        let names = values.iter().map(|value| value.to_string()).collect::<Vec<_>>();
        let index = names
            .iter()
            .enumerate()
            .map(|(position, name)| (name.clone(), position))
            .collect();
        (names, index)
    }

    fn leaf_names(hierarchy: &Hierarchy) -> Vec<&str> {
        hierarchy
            .leaves()
            .iter()
            .map(|&leaf| hierarchy.nodes()[leaf].name.as_str())
            .collect()
    }

    #[test]
    fn implicit_hierarchy_keeps_vertex_order() {
        let (names, index) = names(&["C", "A", "B"]);
        let hierarchy = Hierarchy::build(&HierarchySpec::Implicit, &names, &index).unwrap();

        assert_eq!(leaf_names(&hierarchy), ["C", "A", "B"]);
        assert_eq!(hierarchy.height(), 1);
        let (a, b) = (hierarchy.leaf_of(1).unwrap(), hierarchy.leaf_of(2).unwrap());
        assert_eq!(hierarchy.path(a, b), vec![a, 0, b]);
    }

    #[test]
    fn dotted_paths_share_groups_and_route_through_common_ancestor() {
        let (names, index) = names(&["A", "B", "C"]);
        let spec = HierarchySpec::Paths(vec![
            "tm1.A".to_owned(),
            "tm1.B".to_owned(),
            "tm2.C".to_owned(),
        ]);
        let hierarchy = Hierarchy::build(&spec, &names, &index).unwrap();

        assert_eq!(leaf_names(&hierarchy), ["A", "B", "C"]);
        assert_eq!(hierarchy.height(), 2);

        let a = hierarchy.leaf_of(0).unwrap();
        let b = hierarchy.leaf_of(1).unwrap();
        let c = hierarchy.leaf_of(2).unwrap();
        let tm1 = hierarchy.nodes()[a].parent.unwrap();
        let tm2 = hierarchy.nodes()[c].parent.unwrap();

        assert_eq!(hierarchy.path(a, b), vec![a, tm1, b]);
        assert_eq!(hierarchy.path(a, c), vec![a, tm1, 0, tm2, c]);
    }

    #[test]
    fn vertices_missing_from_tree_are_attached_to_root() {
        let (names, index) = names(&["A", "B", "Z"]);
        let spec = HierarchySpec::Tree(TreeSpec {
            name: "protein".to_owned(),
            children: vec![TreeSpec {
                name: "helix".to_owned(),
                children: vec![
                    TreeSpec {
                        name: "B".to_owned(),
                        children: Vec::new(),
                    },
                    TreeSpec {
                        name: "A".to_owned(),
                        children: Vec::new(),
                    },
                ],
            }],
        });
        let hierarchy = Hierarchy::build(&spec, &names, &index).unwrap();

        assert_eq!(leaf_names(&hierarchy), ["B", "A", "Z"]);
        assert_eq!(hierarchy.nodes()[0].name, "protein");
    }

    #[test]
    fn unknown_leaf_is_rejected() {
        let (names, index) = names(&["A"]);
        let spec = HierarchySpec::Paths(vec!["g.Q".to_owned()]);

        assert_eq!(
            Hierarchy::build(&spec, &names, &index).unwrap_err(),
            ModelError::UnknownVertexReference {
                referrer: "hierarchy".to_owned(),
                name: "Q".to_owned()
            }
        );
    }

    #[test]
    fn repeated_leaf_is_rejected() {
        let (names, index) = names(&["A"]);
        let spec = HierarchySpec::Paths(vec!["g.A".to_owned(), "h.A".to_owned()]);

        assert_eq!(
            Hierarchy::build(&spec, &names, &index).unwrap_err(),
            ModelError::DuplicateVertex("A".to_owned())
        );
    }
}
