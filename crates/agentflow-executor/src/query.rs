/// The read-only queries an in-flight workflow supports (spec §4.7
/// `query`). `State` is the only query type spec.md defines; the enum
/// exists so a caller names the query explicitly rather than assuming
/// `query` only ever returns one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// A snapshot of the current `ExecutionState`.
    State,
}
