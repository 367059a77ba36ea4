//! Serializable payloads returned by the mutation endpoints.

use serde::Serialize;

use crate::application::services::MutationOutcome;
use crate::application::ApplicationResult;
use crate::domain::{Node, NodeKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Position of a node after a mutation, enough for a client to patch its view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeCoordinates {
    pub key: NodeKey,
    pub root: NodeKey,
    pub lft: i64,
    pub rgt: i64,
    pub depth: u32,
    pub name: String,
    pub active: bool,
}

impl From<&Node> for NodeCoordinates {
    fn from(node: &Node) -> Self {
        Self {
            key: node.key,
            root: node.root,
            lft: node.lft,
            rgt: node.rgt,
            depth: node.depth,
            name: node.name.clone(),
            active: node.active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<NodeKey>,
    pub nodes: Vec<NodeCoordinates>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<NodeKey>,
}

impl NodeResponse {
    pub fn success(outcome: &MutationOutcome) -> Self {
        Self {
            status: ResponseStatus::Success,
            kind: None,
            message: outcome.message.clone(),
            key: Some(outcome.node.key),
            nodes: outcome.affected.iter().map(NodeCoordinates::from).collect(),
            removed: outcome.removed.clone(),
        }
    }

    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            kind: Some(kind.into()),
            message: message.into(),
            key: None,
            nodes: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn from_result(result: &ApplicationResult<MutationOutcome>) -> Self {
        match result {
            Ok(outcome) => Self::success(outcome),
            Err(e) => Self::error(e.kind(), e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ApplicationError;
    use crate::domain::{Direction, DomainError, NodeDraft};

    #[test]
    fn given_boundary_error_when_converting_then_error_payload() {
        let result: ApplicationResult<MutationOutcome> = Err(ApplicationError::Domain(
            DomainError::Boundary {
                key: 2,
                direction: Direction::Up,
            },
        ));
        let response = NodeResponse::from_result(&result);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "boundary");
        assert!(json.get("key").is_none());
    }

    #[test]
    fn given_outcome_when_converting_then_success_payload_lists_nodes() {
        let node = Node::from_draft(1, 1, 1, 2, 0, NodeDraft::new("root"));
        let outcome = MutationOutcome {
            node: node.clone(),
            affected: vec![node],
            removed: Vec::new(),
            message: "created node 1".into(),
        };
        let json = serde_json::to_value(NodeResponse::success(&outcome)).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["key"], 1);
        assert_eq!(json["nodes"][0]["rgt"], 2);
        assert!(json.get("removed").is_none());
    }
}
