use thiserror::Error;

use crate::model::NodeKey;

/// Input that cannot be turned into a tree. The build is aborted and no
/// partial tree is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedInput {
    #[error("no root record: every node names a parent")]
    NoRoot,
    #[error("ambiguous root: {} records have no parent ({})", .keys.len(), join_keys(.keys))]
    MultipleRoots { keys: Vec<NodeKey> },
    #[error("cycle: edge {parent} -> {key} leads back to an ancestor")]
    Cycle { key: NodeKey, parent: NodeKey },
    #[error("node {key} is claimed by two parents: {first} and {second}")]
    ConflictingParent {
        key: NodeKey,
        first: NodeKey,
        second: NodeKey,
    },
    #[error("root {key} is also recorded as a child of {parent}")]
    RootHasParent { key: NodeKey, parent: NodeKey },
    #[error("frame {key} is shared by {parents} parents; repeating it under each would produce {nodes} nodes")]
    SharedExpansion {
        key: NodeKey,
        parents: usize,
        nodes: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("malformed input: {0}")]
    Malformed(#[from] MalformedInput),
}

fn join_keys(keys: &[NodeKey]) -> String {
    keys.iter()
        .map(NodeKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> NodeKey {
        NodeKey::parse(s).unwrap()
    }

    #[test]
    fn messages_carry_keys() {
        let err = BuildError::from(MalformedInput::Cycle {
            key: key("a"),
            parent: key("b"),
        });
        assert_eq!(
            err.to_string(),
            "malformed input: cycle: edge b -> a leads back to an ancestor"
        );

        let err = MalformedInput::MultipleRoots {
            keys: vec![key("r1"), key("r2")],
        };
        assert_eq!(
            err.to_string(),
            "ambiguous root: 2 records have no parent (r1, r2)"
        );
    }

    #[test]
    fn shared_expansion_reports_size() {
        let err = MalformedInput::SharedExpansion {
            key: key("a"),
            parents: 2,
            nodes: 7,
        };
        assert_eq!(
            err.to_string(),
            "frame a is shared by 2 parents; repeating it under each would produce 7 nodes"
        );
    }
}
