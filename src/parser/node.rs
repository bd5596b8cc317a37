//! Scene-node table and scene-graph flattening
//!
//! The reader stores transform/group/shape chunks in an index-addressed
//! node table so child references stay plain u32 node ids. Group children
//! live in one shared id pool, each group holding a `(first, count)` span
//! into it. After all chunks are read the table is folded into a flat
//! instance list by a depth-first walk from node 0.

use glam::Mat4;

use crate::error::VoxError;
use crate::scene::{Group, Instance, Model, ModelKeyframe, TransformKeyframe};
use crate::{NO_GROUP, NO_LAYER};

/// Transform node: one child, a local transform and layer attribution
#[derive(Debug)]
pub(crate) struct TransformNode {
    pub name: Option<String>,
    pub transform: Mat4,
    pub child_node_id: u32,
    pub layer_id: u32,
    pub hidden: bool,
    pub keyframes: Vec<TransformKeyframe>,
}

/// Group node: a `(first, count)` span into the shared child-id pool
#[derive(Debug)]
pub(crate) struct GroupNode {
    pub first_child_index: u32,
    pub num_children: u32,
}

/// Shape node: a model reference, possibly animated
#[derive(Debug)]
pub(crate) struct ShapeNode {
    /// Static model id, or `u32::MAX` when the shape carried none
    pub model_id: u32,
    pub keyframes: Vec<ModelKeyframe>,
}

#[derive(Debug)]
pub(crate) enum SceneNode {
    Transform(TransformNode),
    Group(GroupNode),
    Shape(ShapeNode),
}

/// All scene nodes of a file, indexed by node id
#[derive(Debug, Default)]
pub(crate) struct NodeTable {
    pub nodes: Vec<Option<SceneNode>>,
    pub child_ids: Vec<u32>,
}

impl NodeTable {
    /// Store a node, growing the table to fit its id
    pub fn set(&mut self, node_id: u32, node: SceneNode) {
        let index = node_id as usize;
        if index >= self.nodes.len() {
            self.nodes.resize_with(index + 1, || None);
        }
        self.nodes[index] = Some(node);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn get(&self, node_id: u32) -> Result<&SceneNode, VoxError> {
        self.nodes
            .get(node_id as usize)
            .and_then(Option::as_ref)
            .ok_or(VoxError::DanglingReference {
                kind: "node",
                id: node_id,
            })
    }

    fn children(&self, group: &GroupNode) -> &[u32] {
        let first = group.first_child_index as usize;
        &self.child_ids[first..first + group.num_children as usize]
    }
}

/// Instances and groups produced by the flattening walk
#[derive(Debug, Default, PartialEq)]
pub(crate) struct FlattenOutput {
    pub instances: Vec<Instance>,
    pub groups: Vec<Group>,
}

/// Inherited state carried down the walk
///
/// In the default (flattening) mode every field accumulates from the
/// root. When groups are preserved, transform/hidden/name/layer/keyframe
/// state restarts at each group boundary so the emitted groups and
/// instances stay local to their parent group.
#[derive(Clone, Copy)]
struct Ctx<'a> {
    transform: Mat4,
    layer: u32,
    hidden: bool,
    name: Option<&'a str>,
    group: u32,
    frames: Option<&'a [TransformKeyframe]>,
    /// Inherited transform at the node that captured `frames`
    frames_base: Mat4,
}

pub(crate) struct Flattener<'a> {
    pub table: &'a NodeTable,
    pub models: &'a [Model],
    /// Per-model "has no solid voxels" cache
    pub empty: &'a [bool],
    pub keep_groups: bool,
    pub keep_empty: bool,
    pub keyframes: bool,
}

impl<'a> Flattener<'a> {
    /// Walk the graph from node 0, emitting instances and groups
    pub fn flatten(&self) -> Result<FlattenOutput, VoxError> {
        let mut out = FlattenOutput::default();
        let mut visited = vec![false; self.table.nodes.len()];

        let root_group = if self.keep_groups {
            NO_GROUP
        } else {
            out.groups.push(Group::default());
            0
        };
        let ctx = Ctx {
            transform: Mat4::IDENTITY,
            layer: NO_LAYER,
            hidden: false,
            name: None,
            group: root_group,
            frames: None,
            frames_base: Mat4::IDENTITY,
        };
        self.visit(0, ctx, &mut visited, &mut out)?;
        Ok(out)
    }

    fn visit(
        &self,
        node_id: u32,
        ctx: Ctx<'a>,
        visited: &mut [bool],
        out: &mut FlattenOutput,
    ) -> Result<(), VoxError> {
        let node = self.table.get(node_id)?;
        // shapes are leaves and are legitimately shared by many transform
        // nodes; only interior nodes can forge a cycle
        if !matches!(node, SceneNode::Shape(_)) {
            if visited[node_id as usize] {
                return Err(VoxError::CyclicGraph(node_id));
            }
            visited[node_id as usize] = true;
        }

        match node {
            SceneNode::Transform(transform) => {
                let child_ctx = Ctx {
                    transform: ctx.transform * transform.transform,
                    layer: if transform.layer_id != NO_LAYER {
                        transform.layer_id
                    } else {
                        ctx.layer
                    },
                    hidden: ctx.hidden || transform.hidden,
                    // outermost name wins
                    name: ctx.name.or(transform.name.as_deref()),
                    group: ctx.group,
                    frames: if transform.keyframes.is_empty() {
                        ctx.frames
                    } else {
                        Some(&transform.keyframes)
                    },
                    frames_base: if transform.keyframes.is_empty() {
                        ctx.frames_base
                    } else {
                        ctx.transform
                    },
                };
                self.visit(transform.child_node_id, child_ctx, visited, out)
            }
            SceneNode::Group(group) => {
                let child_ctx = if self.keep_groups {
                    let group_index = out.groups.len() as u32;
                    out.groups.push(Group {
                        name: ctx.name.map(String::from),
                        transform: ctx.transform,
                        parent_group_index: ctx.group,
                        layer_index: ctx.layer,
                        hidden: ctx.hidden,
                        transform_keyframes: self.rebased_frames(&ctx),
                    });
                    Ctx {
                        transform: Mat4::IDENTITY,
                        layer: NO_LAYER,
                        hidden: false,
                        name: None,
                        group: group_index,
                        frames: None,
                        frames_base: Mat4::IDENTITY,
                    }
                } else {
                    ctx
                };
                for &child_id in self.table.children(group) {
                    self.visit(child_id, child_ctx, visited, out)?;
                }
                Ok(())
            }
            SceneNode::Shape(shape) => {
                if shape.model_id == u32::MAX {
                    // shape carried no model entry at all
                    return Ok(());
                }
                let model_index = shape.model_id as usize;
                if model_index >= self.models.len() {
                    return Err(VoxError::DanglingReference {
                        kind: "model",
                        id: shape.model_id,
                    });
                }
                if self.empty[model_index] && !self.keep_empty {
                    return Ok(());
                }
                out.instances.push(Instance {
                    name: ctx.name.map(String::from),
                    transform: ctx.transform,
                    model_index: shape.model_id,
                    layer_index: ctx.layer,
                    group_index: ctx.group,
                    hidden: ctx.hidden,
                    transform_keyframes: self.rebased_frames(&ctx),
                    model_keyframes: if self.keyframes {
                        shape.keyframes.clone()
                    } else {
                        Vec::new()
                    },
                });
                Ok(())
            }
        }
    }

    /// Keyframes captured on the enclosing transform chain, rebased onto
    /// the inherited transform above the node that declared them
    fn rebased_frames(&self, ctx: &Ctx<'_>) -> Vec<TransformKeyframe> {
        if !self.keyframes {
            return Vec::new();
        }
        let Some(frames) = ctx.frames else {
            return Vec::new();
        };
        frames
            .iter()
            .map(|keyframe| TransformKeyframe {
                frame: keyframe.frame,
                transform: ctx.frames_base * keyframe.transform,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn transform_node(child: u32, translation: Vec3) -> SceneNode {
        SceneNode::Transform(TransformNode {
            name: None,
            transform: Mat4::from_translation(translation),
            child_node_id: child,
            layer_id: NO_LAYER,
            hidden: false,
            keyframes: Vec::new(),
        })
    }

    fn shape_node(model_id: u32) -> SceneNode {
        SceneNode::Shape(ShapeNode {
            model_id,
            keyframes: Vec::new(),
        })
    }

    fn one_voxel_model() -> (Model, bool) {
        let mut model = Model::new(1, 1, 1);
        model.set_voxel(0, 0, 0, 1);
        model.rehash();
        (model, false)
    }

    fn flatten(table: &NodeTable, models: &[Model], empty: &[bool]) -> FlattenOutput {
        Flattener {
            table,
            models,
            empty,
            keep_groups: false,
            keep_empty: false,
            keyframes: false,
        }
        .flatten()
        .unwrap()
    }

    #[test]
    fn test_transforms_compose_parent_first() {
        // 0: nTRN(+1,0,0) -> 1: nGRP -> 2: nTRN(+0,2,0) -> 3: nSHP
        let mut table = NodeTable::default();
        table.set(0, transform_node(1, Vec3::new(1.0, 0.0, 0.0)));
        table.child_ids.push(2);
        table.set(
            1,
            SceneNode::Group(GroupNode {
                first_child_index: 0,
                num_children: 1,
            }),
        );
        table.set(2, transform_node(3, Vec3::new(0.0, 2.0, 0.0)));
        table.set(3, shape_node(0));

        let (model, is_empty) = one_voxel_model();
        let out = flatten(&table, &[model], &[is_empty]);
        assert_eq!(out.instances.len(), 1);
        assert_eq!(out.groups.len(), 1);
        assert_eq!(out.instances[0].group_index, 0);
        assert_eq!(
            out.instances[0].transform.w_axis.truncate(),
            Vec3::new(1.0, 2.0, 0.0)
        );
    }

    #[test]
    fn test_cycle_is_detected() {
        // 0: nTRN -> 1: nGRP -> 0 again
        let mut table = NodeTable::default();
        table.set(0, transform_node(1, Vec3::ZERO));
        table.child_ids.push(0);
        table.set(
            1,
            SceneNode::Group(GroupNode {
                first_child_index: 0,
                num_children: 1,
            }),
        );

        let (model, is_empty) = one_voxel_model();
        let result = Flattener {
            table: &table,
            models: &[model],
            empty: &[is_empty],
            keep_groups: false,
            keep_empty: false,
            keyframes: false,
        }
        .flatten();
        assert_eq!(result, Err(VoxError::CyclicGraph(0)));
    }

    #[test]
    fn test_dangling_child_is_rejected() {
        let mut table = NodeTable::default();
        table.set(0, transform_node(7, Vec3::ZERO));
        let (model, is_empty) = one_voxel_model();
        let result = Flattener {
            table: &table,
            models: &[model],
            empty: &[is_empty],
            keep_groups: false,
            keep_empty: false,
            keyframes: false,
        }
        .flatten();
        assert_eq!(
            result,
            Err(VoxError::DanglingReference {
                kind: "node",
                id: 7
            })
        );
    }

    #[test]
    fn test_empty_model_instances_are_suppressed() {
        let mut table = NodeTable::default();
        table.set(0, transform_node(1, Vec3::ZERO));
        table.set(1, shape_node(0));

        let empty_model = Model::new(1, 1, 1);
        let out = flatten(&table, &[empty_model], &[true]);
        assert!(out.instances.is_empty());
    }

    #[test]
    fn test_keep_groups_emits_local_transforms() {
        // 0: nTRN(+5,0,0) -> 1: nGRP -> 2: nTRN(+0,3,0) -> 3: nSHP
        let mut table = NodeTable::default();
        table.set(0, transform_node(1, Vec3::new(5.0, 0.0, 0.0)));
        table.child_ids.push(2);
        table.set(
            1,
            SceneNode::Group(GroupNode {
                first_child_index: 0,
                num_children: 1,
            }),
        );
        table.set(2, transform_node(3, Vec3::new(0.0, 3.0, 0.0)));
        table.set(3, shape_node(0));

        let (model, is_empty) = one_voxel_model();
        let out = Flattener {
            table: &table,
            models: &[model],
            empty: &[is_empty],
            keep_groups: true,
            keep_empty: false,
            keyframes: false,
        }
        .flatten()
        .unwrap();

        assert_eq!(out.groups.len(), 1);
        assert_eq!(out.groups[0].parent_group_index, NO_GROUP);
        assert_eq!(
            out.groups[0].transform.w_axis.truncate(),
            Vec3::new(5.0, 0.0, 0.0)
        );
        assert_eq!(out.instances.len(), 1);
        assert_eq!(out.instances[0].group_index, 0);
        // instance transform stays local to the group
        assert_eq!(
            out.instances[0].transform.w_axis.truncate(),
            Vec3::new(0.0, 3.0, 0.0)
        );
    }
}
