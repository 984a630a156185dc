use lockorder::BlockKind;

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// A method-like block with no class among its ancestors. The parser
    /// never produces one from well-formed input.
    #[error("{location}: `{label}` has no enclosing class")]
    MissingClass { label: String, location: String },
    #[error("{location}: cannot walk a {kind} block")]
    NotWalkable { kind: BlockKind, location: String },
}
