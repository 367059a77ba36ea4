//! Pre-flight checks for mutations.
//!
//! Every check runs against a snapshot [`Forest`] before the nested-set module
//! touches it. A failed check leaves the snapshot unchanged.

use tracing::debug;

use crate::config::TreeOptions;
use crate::domain::{
    Direction, DomainError, DomainResult, Forest, Node, NodeAttributes, NodeFlags, NodeKey,
    Placement,
};

/// How a permitted removal is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveMode {
    /// Deactivate the subtree; coordinates stay as they are
    Soft,
    /// Delete the subtree rows and close the gap
    Hard,
}

/// Whether `node` may hold children under the depth limit. Removed nodes never do.
pub fn accepts_children(node: &Node, max_depth: Option<u32>) -> bool {
    node.active
        && node.child_allowed
        && !node.readonly
        && max_depth.map_or(true, |max| node.depth < max)
}

/// True when `attributes` does nothing but clear the read-only lock.
fn only_unlocks(attributes: &NodeAttributes) -> bool {
    let unlock = NodeFlags {
        readonly: Some(false),
        ..NodeFlags::default()
    };
    attributes.name.is_none()
        && attributes.icon.is_none()
        && attributes.icon_type.is_none()
        && attributes.flags == unlock
}

#[derive(Debug, Clone)]
pub struct MutationValidator {
    options: TreeOptions,
}

impl MutationValidator {
    pub fn new(options: TreeOptions) -> Self {
        Self { options }
    }

    /// Siblings the tree view hides are not neighbours for moves.
    fn is_neighbour(&self, node: &Node) -> bool {
        node.active || self.options.show_inactive
    }

    pub fn create_root(&self) -> DomainResult<()> {
        if !self.options.allow_new_roots {
            return Err(DomainError::invalid("creating new roots is disabled"));
        }
        Ok(())
    }

    pub fn create(&self, forest: &Forest, parent: NodeKey) -> DomainResult<()> {
        let parent = forest
            .get(parent)
            .ok_or_else(|| DomainError::invalid(format!("parent node {parent} is not saved")))?;
        if !accepts_children(parent, self.options.max_depth) {
            return Err(DomainError::invalid(format!(
                "node {} does not accept children",
                parent.key
            )));
        }
        Ok(())
    }

    pub fn remove(&self, forest: &Forest, key: NodeKey) -> DomainResult<RemoveMode> {
        let node = forest.require(key)?;
        if node.readonly || !node.removable {
            return Err(DomainError::invalid(format!("node {key} cannot be removed")));
        }
        if !node.is_leaf() && !node.removable_all {
            return Err(DomainError::invalid(format!(
                "node {key} has {} descendants and may only be removed alone",
                node.descendant_count()
            )));
        }
        if self.options.soft_delete {
            if !node.active {
                return Err(DomainError::invalid(format!("node {key} is already inactive")));
            }
            Ok(RemoveMode::Soft)
        } else {
            Ok(RemoveMode::Hard)
        }
    }

    pub fn restore(&self, forest: &Forest, key: NodeKey) -> DomainResult<()> {
        let node = forest.require(key)?;
        if node.active {
            return Err(DomainError::invalid(format!("node {key} is already active")));
        }
        if let Some(parent) = forest.parent_of(node) {
            if !parent.active {
                return Err(DomainError::invalid(format!(
                    "restore parent node {} first",
                    parent.key
                )));
            }
        }
        Ok(())
    }

    pub fn save(&self, node: &Node, attributes: &NodeAttributes) -> DomainResult<()> {
        if node.readonly && !only_unlocks(attributes) {
            return Err(DomainError::invalid(format!("node {} is read-only", node.key)));
        }
        if let Some(name) = &attributes.name {
            if name.trim().is_empty() {
                return Err(DomainError::invalid("node name must not be blank"));
            }
        }
        Ok(())
    }

    /// Resolve a single-step move into a placement, or explain why it is refused.
    pub fn move_node(
        &self,
        forest: &Forest,
        key: NodeKey,
        direction: Direction,
    ) -> DomainResult<Placement> {
        let node = forest.require(key)?;
        if !node.movable_flag(direction) {
            return Err(DomainError::invalid(format!(
                "node {key} is not allowed to move {direction}"
            )));
        }
        let boundary = DomainError::Boundary { key, direction };

        let placement = match direction {
            Direction::Up => {
                if node.is_root() {
                    return Err(boundary);
                }
                let prev = forest
                    .previous_sibling_where(node, |s| self.is_neighbour(s))
                    .ok_or(boundary)?;
                Placement::Before(prev.key)
            }
            Direction::Down => {
                if node.is_root() {
                    return Err(boundary);
                }
                let next = forest
                    .next_sibling_where(node, |s| self.is_neighbour(s))
                    .ok_or(boundary)?;
                Placement::After(next.key)
            }
            Direction::Left => {
                if node.is_root() {
                    return Err(boundary);
                }
                let parent = forest
                    .parent_of(node)
                    .ok_or_else(|| DomainError::corrupt(format!("node {key} has no parent")))?;
                if parent.is_root() {
                    if !self.options.allow_new_roots {
                        return Err(DomainError::invalid(format!(
                            "node {key} would become a root and new roots are disabled"
                        )));
                    }
                    Placement::NewRoot
                } else {
                    Placement::After(parent.key)
                }
            }
            Direction::Right => {
                let prev = forest
                    .previous_sibling_where(node, |s| self.is_neighbour(s))
                    .ok_or(boundary)?;
                if !accepts_children(prev, self.options.max_depth) {
                    return Err(DomainError::invalid(format!(
                        "node {} does not accept children",
                        prev.key
                    )));
                }
                if let Some(max) = self.options.max_depth {
                    let deepest = prev.depth + 1 + forest.subtree_height(node);
                    if deepest > max {
                        return Err(DomainError::invalid(format!(
                            "moving node {key} right exceeds the maximum depth {max}"
                        )));
                    }
                }
                Placement::LastChildOf(prev.key)
            }
        };
        debug!("move {} {} -> {:?}", key, direction, placement);
        Ok(placement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeDraft;
    use rstest::rstest;

    /// 1 -> [2, 3 -> [4]]
    fn forest() -> Forest {
        let mut f = Forest::new();
        f.insert_root(NodeDraft::new("root"));
        f.insert_child(1, NodeDraft::new("a")).unwrap();
        f.insert_child(1, NodeDraft::new("b")).unwrap();
        f.insert_child(3, NodeDraft::new("c")).unwrap();
        f
    }

    fn validator() -> MutationValidator {
        MutationValidator::new(TreeOptions::default())
    }

    #[rstest]
    #[case(2, Direction::Down, Placement::After(3))]
    #[case(3, Direction::Up, Placement::Before(2))]
    #[case(3, Direction::Right, Placement::LastChildOf(2))]
    #[case(4, Direction::Left, Placement::After(3))]
    #[case(2, Direction::Left, Placement::NewRoot)]
    fn given_movable_node_when_validating_move_then_placement(
        #[case] key: NodeKey,
        #[case] direction: Direction,
        #[case] expected: Placement,
    ) {
        assert_eq!(
            validator().move_node(&forest(), key, direction).unwrap(),
            expected
        );
    }

    #[rstest]
    #[case(2, Direction::Up)]
    #[case(3, Direction::Down)]
    #[case(4, Direction::Up)]
    #[case(4, Direction::Down)]
    #[case(4, Direction::Right)]
    #[case(1, Direction::Left)]
    #[case(1, Direction::Up)]
    #[case(1, Direction::Right)]
    fn given_node_at_extremity_when_validating_move_then_boundary(
        #[case] key: NodeKey,
        #[case] direction: Direction,
    ) {
        let err = validator().move_node(&forest(), key, direction).unwrap_err();
        assert_eq!(err, DomainError::Boundary { key, direction });
    }

    #[test]
    fn given_new_roots_disabled_when_moving_left_under_root_then_invalid() {
        let v = MutationValidator::new(TreeOptions {
            allow_new_roots: false,
            ..TreeOptions::default()
        });
        assert!(matches!(
            v.move_node(&forest(), 2, Direction::Left),
            Err(DomainError::InvalidOperation { .. })
        ));
        assert!(v.create_root().is_err());
    }

    #[test]
    fn given_max_depth_when_moving_subtree_right_then_invalid() {
        let v = MutationValidator::new(TreeOptions {
            max_depth: Some(2),
            ..TreeOptions::default()
        });
        let mut f = forest();
        // 3 -> [4, 5 -> [6]]: under 2 its grandchild would sit at depth 4
        f.insert_child(3, NodeDraft::new("d")).unwrap();
        f.insert_child(5, NodeDraft::new("e")).unwrap();
        assert!(matches!(
            v.move_node(&f, 3, Direction::Right),
            Err(DomainError::InvalidOperation { .. })
        ));
        assert!(v.move_node(&f, 4, Direction::Down).is_ok());
    }

    #[test]
    fn given_unsaved_parent_when_creating_then_invalid() {
        let err = validator().create(&forest(), 42).unwrap_err();
        assert!(err.to_string().contains("not saved"));
    }

    #[test]
    fn given_leaf_only_parent_when_creating_then_invalid() {
        let mut f = forest();
        f.update(2, |n| n.child_allowed = false).unwrap();
        assert!(validator().create(&f, 2).is_err());
        assert!(validator().create(&f, 3).is_ok());
    }

    #[test]
    fn given_parent_with_children_when_removing_then_requires_removable_all() {
        let mut f = forest();
        assert!(validator().remove(&f, 3).is_err());
        f.update(3, |n| n.removable_all = true).unwrap();
        assert_eq!(validator().remove(&f, 3).unwrap(), RemoveMode::Soft);
    }

    #[test]
    fn given_hard_delete_policy_when_removing_leaf_then_hard() {
        let v = MutationValidator::new(TreeOptions {
            soft_delete: false,
            ..TreeOptions::default()
        });
        assert_eq!(v.remove(&forest(), 2).unwrap(), RemoveMode::Hard);
    }

    #[test]
    fn given_readonly_node_when_moving_or_saving_then_invalid() {
        let mut f = forest();
        let node = f.update(3, |n| n.readonly = true).unwrap();
        assert!(matches!(
            validator().move_node(&f, 3, Direction::Up),
            Err(DomainError::InvalidOperation { .. })
        ));
        assert!(validator().save(&node, &NodeAttributes::default()).is_err());
    }

    #[test]
    fn given_readonly_node_when_unlocking_with_other_changes_then_invalid() {
        let mut f = forest();
        let node = f.update(3, |n| n.readonly = true).unwrap();
        let unlock = NodeFlags {
            readonly: Some(false),
            ..NodeFlags::default()
        };

        let rename_and_unlock = NodeAttributes {
            name: Some("renamed".into()),
            flags: unlock.clone(),
            ..NodeAttributes::default()
        };
        assert!(matches!(
            validator().save(&node, &rename_and_unlock),
            Err(DomainError::InvalidOperation { .. })
        ));

        let reflag_and_unlock = NodeAttributes {
            flags: NodeFlags {
                movable_u: Some(true),
                ..unlock.clone()
            },
            ..NodeAttributes::default()
        };
        assert!(validator().save(&node, &reflag_and_unlock).is_err());

        let unlock_only = NodeAttributes {
            flags: unlock,
            ..NodeAttributes::default()
        };
        assert!(validator().save(&node, &unlock_only).is_ok());
    }

    #[test]
    fn given_soft_deleted_first_child_when_moving_second_then_boundary() {
        let mut f = forest();
        f.set_active_subtree(2, false).unwrap();

        for direction in [Direction::Up, Direction::Right] {
            assert_eq!(
                validator().move_node(&f, 3, direction).unwrap_err(),
                DomainError::Boundary { key: 3, direction }
            );
        }
    }

    #[test]
    fn given_soft_deleted_middle_child_when_moving_neighbours_then_it_is_passed_over() {
        let mut f = forest();
        f.insert_child(1, NodeDraft::new("d")).unwrap();
        f.set_active_subtree(3, false).unwrap();

        let v = validator();
        assert_eq!(v.move_node(&f, 5, Direction::Up).unwrap(), Placement::Before(2));
        assert_eq!(v.move_node(&f, 2, Direction::Down).unwrap(), Placement::After(5));
        assert_eq!(
            v.move_node(&f, 5, Direction::Right).unwrap(),
            Placement::LastChildOf(2)
        );
    }

    #[test]
    fn given_inactive_nodes_shown_when_moving_then_they_count_as_neighbours() {
        let v = MutationValidator::new(TreeOptions {
            show_inactive: true,
            ..TreeOptions::default()
        });
        let mut f = forest();
        f.set_active_subtree(2, false).unwrap();

        assert_eq!(v.move_node(&f, 3, Direction::Up).unwrap(), Placement::Before(2));
        // a removed node still takes no children
        assert!(matches!(
            v.move_node(&f, 3, Direction::Right),
            Err(DomainError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn given_inactive_parent_when_creating_then_invalid() {
        let mut f = forest();
        f.set_active_subtree(3, false).unwrap();
        assert!(validator().create(&f, 3).is_err());
        assert!(validator().create(&f, 2).is_ok());
    }

    #[test]
    fn given_inactive_parent_when_restoring_child_then_invalid() {
        let mut f = forest();
        f.set_active_subtree(3, false).unwrap();
        assert!(validator().restore(&f, 4).is_err());
        assert!(validator().restore(&f, 3).is_ok());
    }
}
