/// Referential-integrity failures found while laying out a topology.
///
/// The caller is expected to hand over a consistent topology; these are
/// reported before anything is computed so a failed pass never leaves a
/// half-built layout behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("node template `{node}` has unknown type `{type_name}`")]
    UnknownNodeType { node: String, type_name: String },
    #[error("relationship `{relationship}` of `{node}` targets unknown node `{target}`")]
    UnknownTarget {
        node: String,
        relationship: String,
        target: String,
    },
    #[error("relationship `{relationship}` of `{node}` has unknown type `{type_name}`")]
    UnknownRelationshipType {
        node: String,
        relationship: String,
        type_name: String,
    },
}
