//! Static hierarchy of placed volumes.
//!
//! Nodes live in an arena indexed by [`NodeId`]; the world volume is always
//! the first node. Every node is placed exactly once, so its global
//! transform is computed at build time and navigation never needs a
//! transform stack.
//!
//! The builder validates the hierarchy before handing out a tree. Sibling
//! overlaps and daughters poking out of their mother are rejected, found by
//! sampling a regular grid of points inside each volume.

use std::fmt;

use log::info;

use super::shape::{BoundaryTime, Shape};
use super::transform::Transform;
use crate::error::GeometryError;
use crate::materials::Material;
use crate::types::Vec3;

/// Points per axis when sampling a volume for overlap checks
const OVERLAP_GRID: usize = 12;

/// Penetration depth (m) tolerated between touching volumes
const OVERLAP_TOLERANCE: f64 = 1e-9;

/// Index of a node in the tree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A placed volume
#[derive(Debug, Clone)]
pub struct GeometryNode {
    pub name: String,
    pub shape: Shape,
    pub material: Material,
    /// Placement relative to the mother
    pub placement: Transform,
    /// Placement relative to the world
    global: Transform,
    pub mother: Option<NodeId>,
    pub daughters: Vec<NodeId>,
}

impl GeometryNode {
    pub fn global_transform(&self) -> &Transform {
        &self.global
    }

    /// Inclusive containment of a global point
    pub fn contains_global(&self, point: &Vec3) -> bool {
        self.shape.contains(&self.global.master_to_local(point))
    }
}

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeometryTree {
    nodes: Vec<GeometryNode>,
}

impl GeometryTree {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &GeometryNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    /// Slash-separated path from the world, e.g. `/world/guide/inner`
    pub fn path(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut cur = Some(id);
        while let Some(n) = cur {
            names.push(self.node(n).name.as_str());
            cur = self.node(n).mother;
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    /// Containment of a global point in one node, ignoring its daughters
    pub fn contains(&self, id: NodeId, point: &Vec3) -> bool {
        self.node(id).contains_global(point)
    }

    /// True if the point is inside `id` and inside none of its daughters
    pub fn is_same_location(&self, id: NodeId, point: &Vec3) -> bool {
        self.contains(id, point) && !self.node(id).daughters.iter().any(|&d| self.contains(d, point))
    }

    /// Deepest node containing the point, searching from the world
    pub fn find_node(&self, point: &Vec3) -> Option<NodeId> {
        self.find_node_from(self.root(), point, None)
    }

    /// Deepest node containing the point, starting at `start`
    ///
    /// Climbs towards the world until a container is found, then descends.
    /// The daughter `skip` is never entered on the way down; it is the
    /// volume a particle has just left.
    pub fn find_node_from(&self, start: NodeId, point: &Vec3, skip: Option<NodeId>) -> Option<NodeId> {
        let mut cur = start;
        while !self.contains(cur, point) {
            cur = self.node(cur).mother?;
        }
        'descend: loop {
            for &d in &self.node(cur).daughters {
                if Some(d) != skip && self.contains(d, point) {
                    cur = d;
                    continue 'descend;
                }
            }
            return Some(cur);
        }
    }

    /// Unit normal at `point` on the surface of `id`, in the global frame
    pub fn normal(&self, id: NodeId, point: &Vec3, dir: &Vec3) -> Vec3 {
        let node = self.node(id);
        let xf = node.global_transform();
        let local = node
            .shape
            .compute_normal(&xf.master_to_local(point), &xf.master_to_local_vect(dir));
        xf.local_to_master_vect(&local)
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Incremental construction of a [`GeometryTree`]
#[derive(Debug, Default)]
pub struct GeometryBuilder {
    nodes: Vec<GeometryNode>,
}

impl GeometryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the world volume; must be called first and once
    pub fn world(&mut self, name: &str, shape: Shape, material: Material) -> Result<NodeId, GeometryError> {
        if !self.nodes.is_empty() {
            return Err(GeometryError::WorldAlreadySet);
        }
        Self::check(name, &shape, &material)?;
        self.nodes.push(GeometryNode {
            name: name.to_string(),
            shape,
            material,
            placement: Transform::identity(),
            global: Transform::identity(),
            mother: None,
            daughters: Vec::new(),
        });
        Ok(NodeId(0))
    }

    /// Place a daughter volume inside `mother`
    pub fn place(
        &mut self,
        mother: NodeId,
        name: &str,
        shape: Shape,
        material: Material,
        placement: Transform,
    ) -> Result<NodeId, GeometryError> {
        if self.nodes.is_empty() {
            return Err(GeometryError::NoWorld);
        }
        let global = self
            .nodes
            .get(mother.0)
            .ok_or(GeometryError::UnknownNode(mother.0))?
            .global
            .compose(&placement);
        Self::check(name, &shape, &material)?;

        let id = NodeId(self.nodes.len());
        self.nodes.push(GeometryNode {
            name: name.to_string(),
            shape,
            material,
            placement,
            global,
            mother: Some(mother),
            daughters: Vec::new(),
        });
        self.nodes[mother.0].daughters.push(id);
        Ok(id)
    }

    fn check(name: &str, shape: &Shape, material: &Material) -> Result<(), GeometryError> {
        shape.validate().map_err(|reason| GeometryError::InvalidShape {
            name: name.to_string(),
            reason,
        })?;
        material.validate().map_err(|reason| GeometryError::InvalidMaterial {
            name: name.to_string(),
            reason,
        })
    }

    /// Validate the hierarchy and freeze it
    pub fn build(self) -> Result<GeometryTree, GeometryError> {
        if self.nodes.is_empty() {
            return Err(GeometryError::NoWorld);
        }
        let tree = GeometryTree { nodes: self.nodes };

        for id in tree.ids() {
            let node = tree.node(id);
            for (i, &a) in node.daughters.iter().enumerate() {
                check_extrusion(&tree, a, id)?;
                for &b in &node.daughters[i + 1..] {
                    check_overlap(&tree, a, b)?;
                }
            }
        }

        info!(
            "Geometry built: {} volumes, world '{}' ({:.3e} m³)",
            tree.len(),
            tree.node(tree.root()).name,
            tree.node(tree.root()).shape.capacity()
        );
        Ok(tree)
    }
}

/// Regular grid of global points covering the interior of `id`
fn interior_samples(tree: &GeometryTree, id: NodeId) -> Vec<Vec3> {
    let node = tree.node(id);
    let half = node.shape.bounding_box();
    let n = OVERLAP_GRID;
    let coord = |h: f64, k: usize| -h + 2.0 * h * k as f64 / (n - 1) as f64;

    let mut points = Vec::with_capacity(n * n * n);
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                let local = Vec3::new(coord(half.x, i), coord(half.y, j), coord(half.z, k));
                if node.shape.safety(&local) >= 0.0 {
                    points.push(node.global_transform().local_to_master(&local));
                }
            }
        }
    }
    points
}

fn depth_in(tree: &GeometryTree, id: NodeId, point: &Vec3) -> f64 {
    let node = tree.node(id);
    node.shape.safety(&node.global_transform().master_to_local(point))
}

fn check_extrusion(tree: &GeometryTree, daughter: NodeId, mother: NodeId) -> Result<(), GeometryError> {
    let pokes_out = interior_samples(tree, daughter)
        .iter()
        .any(|p| depth_in(tree, mother, p) < -OVERLAP_TOLERANCE);
    if pokes_out {
        return Err(GeometryError::Extrusion {
            daughter: tree.node(daughter).name.clone(),
            mother: tree.node(mother).name.clone(),
        });
    }
    Ok(())
}

fn check_overlap(tree: &GeometryTree, a: NodeId, b: NodeId) -> Result<(), GeometryError> {
    let penetrates = |from: NodeId, into: NodeId| {
        interior_samples(tree, from)
            .iter()
            .any(|p| depth_in(tree, from, p) > OVERLAP_TOLERANCE && depth_in(tree, into, p) > OVERLAP_TOLERANCE)
    };
    if penetrates(a, b) || penetrates(b, a) {
        return Err(GeometryError::Overlap {
            first: tree.node(a).name.clone(),
            second: tree.node(b).name.clone(),
        });
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
