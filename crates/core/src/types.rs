
/// Node index inside a tree arena. Links use [`NULL_NODE`] for "none".
pub type NodeId = i32;

/// Sentinel for an absent child or sibling link.
pub const NULL_NODE: NodeId = -1;

/// Identifier of a trait; traits are numbered consecutively from 0.
pub type TraitId = usize;
