//! Aspect trees - upgrade graphs the player unlocks one node at a time.
//!
//! A tree is a single-rooted graph stored as a flat node list. Nodes refer to
//! each other by index. Levels are counted along the first child of each
//! node, so every branch of a level must have the same depth.

use serde::Deserialize;

use crate::core::DataLoadError;
use crate::status_effects::StatusEffect;

/// What unlocking a node grants its owner.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum AspectReward {
    /// Applied to the owner's status effector, sourced from the owner.
    StatusEffect(StatusEffect),
    /// Name of a combo added to the owner's weapon.
    Combo(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AspectNode {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub children: Vec<usize>,
    pub reward: AspectReward,
    #[serde(skip)]
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AspectTree {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub nodes: Vec<AspectNode>,
}

impl AspectTree {
    /// Check the tree has one root and consistent parent/child links.
    pub fn validate(&self) -> Result<(), DataLoadError> {
        let invalid = |reason: String| DataLoadError::InvalidAspectTree {
            tree: self.name.clone(),
            reason,
        };

        let roots = self.nodes.iter().filter(|n| n.parent.is_none()).count();
        if roots != 1 {
            return Err(invalid(format!("expected one root, found {roots}")));
        }

        for (id, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                let Some(child_node) = self.nodes.get(child) else {
                    return Err(invalid(format!("node {id} has missing child {child}")));
                };
                if child_node.parent != Some(id) {
                    return Err(invalid(format!("node {child} does not point back to parent {id}")));
                }
            }
            if let Some(parent) = node.parent {
                let linked = self
                    .nodes
                    .get(parent)
                    .is_some_and(|p| p.children.contains(&id));
                if !linked {
                    return Err(invalid(format!("node {id} is not a child of its parent {parent}")));
                }
            }
        }
        Ok(())
    }

    /// A fresh copy with nothing applied, for a new owner.
    pub fn instantiate(&self) -> Self {
        let mut tree = self.clone();
        for node in &mut tree.nodes {
            node.applied = false;
        }
        tree
    }

    pub fn node(&self, id: usize) -> Option<&AspectNode> {
        self.nodes.get(id)
    }

    pub fn root(&self) -> Option<usize> {
        self.nodes.iter().position(|n| n.parent.is_none())
    }

    /// The deepest applied node on the unlocked path, if any.
    pub fn most_recently_applied(&self) -> Option<usize> {
        let mut current = self.root()?;
        loop {
            let next = self.nodes[current]
                .children
                .iter()
                .copied()
                .filter(|&child| self.nodes[child].applied)
                .last();
            match next {
                Some(child) => current = child,
                None => break,
            }
        }
        self.nodes[current].applied.then_some(current)
    }

    /// Nodes that can be unlocked next. Empty once the path is finished.
    pub fn next_unapplied(&self) -> Vec<usize> {
        match self.most_recently_applied() {
            Some(recent) => self.nodes[recent].children.clone(),
            None => self.root().into_iter().collect(),
        }
    }

    /// Nodes at depth `level`, following the first child at each step.
    pub fn nodes_at_level(&self, level: usize) -> Vec<usize> {
        let Some(mut current) = self.root() else {
            return Vec::new();
        };
        if level == 0 {
            return vec![current];
        }
        for _ in 0..level - 1 {
            match self.nodes[current].children.first() {
                Some(&first) => current = first,
                None => return Vec::new(),
            }
        }
        self.nodes[current].children.clone()
    }

    pub fn total_levels(&self) -> usize {
        let Some(mut current) = self.root() else {
            return 0;
        };
        let mut levels = 1;
        while let Some(&first) = self.nodes[current].children.first() {
            levels += 1;
            current = first;
        }
        levels
    }

    /// `(level, index among siblings)` of a node.
    pub fn node_level(&self, id: usize) -> Option<(usize, usize)> {
        let node = self.nodes.get(id)?;
        let index = match node.parent {
            Some(parent) => self.nodes[parent].children.iter().position(|&c| c == id)?,
            None => 0,
        };

        let mut level = 0;
        let mut current = node.parent;
        while let Some(parent) = current {
            level += 1;
            if level > self.nodes.len() {
                return None;
            }
            current = self.nodes[parent].parent;
        }
        Some((level, index))
    }

    /// Levels where the tree branches into more than one node.
    pub fn multi_node_levels(&self) -> Vec<usize> {
        (0..self.total_levels())
            .filter(|&level| self.nodes_at_level(level).len() > 1)
            .collect()
    }

    /// Whether a node is not locked out by an earlier branch choice.
    ///
    /// The branch picked at the first multi-node level decides which index
    /// may be picked at every later multi-node level.
    pub fn can_choose(&self, id: usize) -> bool {
        let Some((level, index)) = self.node_level(id) else {
            return false;
        };
        let multi = self.multi_node_levels();
        let Some(&first) = multi.first() else {
            return true;
        };
        if !multi.contains(&level) || level == first {
            return true;
        }

        let chosen = self
            .nodes_at_level(first)
            .iter()
            .position(|&n| self.nodes[n].applied);
        chosen == Some(index)
    }

    pub fn is_completed(&self) -> bool {
        self.next_unapplied().is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn node(name: &str, parent: Option<usize>, children: &[usize]) -> AspectNode {
        AspectNode {
            name: name.to_string(),
            description: String::new(),
            parent,
            children: children.to_vec(),
            reward: AspectReward::Combo(name.to_string()),
            applied: false,
        }
    }

    /// root -> a -> (b1 | b2) -> c -> (d1 | d2)
    pub(crate) fn branching_tree() -> AspectTree {
        AspectTree {
            name: "Rage".to_string(),
            description: String::new(),
            nodes: vec![
                node("root", None, &[1]),
                node("a", Some(0), &[2, 3]),
                node("b1", Some(1), &[4]),
                node("b2", Some(1), &[5]),
                node("c1", Some(2), &[6, 7]),
                node("c2", Some(3), &[8, 9]),
                node("d1", Some(4), &[]),
                node("d2", Some(4), &[]),
                node("d1'", Some(5), &[]),
                node("d2'", Some(5), &[]),
            ],
        }
    }

    #[test]
    fn branching_tree_is_valid() {
        let tree = branching_tree();
        assert!(tree.validate().is_ok());
        assert_eq!(tree.total_levels(), 5);
        assert_eq!(tree.multi_node_levels(), vec![2, 4]);
        assert_eq!(tree.node_level(3), Some((2, 1)));
        assert_eq!(tree.node_level(7), Some((4, 1)));
    }

    #[test]
    fn two_roots_fail_validation() {
        let mut tree = branching_tree();
        tree.nodes.push(node("orphan", None, &[]));
        assert!(matches!(
            tree.validate(),
            Err(DataLoadError::InvalidAspectTree { .. })
        ));
    }

    #[test]
    fn next_unapplied_follows_the_applied_path() {
        let mut tree = branching_tree();
        assert_eq!(tree.next_unapplied(), vec![0]);
        assert_eq!(tree.most_recently_applied(), None);

        tree.nodes[0].applied = true;
        tree.nodes[1].applied = true;
        assert_eq!(tree.next_unapplied(), vec![2, 3]);

        tree.nodes[2].applied = true;
        tree.nodes[4].applied = true;
        tree.nodes[7].applied = true;
        assert_eq!(tree.most_recently_applied(), Some(7));
        assert!(tree.is_completed());
    }

    #[test]
    fn later_branch_is_locked_to_first_choice() {
        let mut tree = branching_tree();
        // nothing chosen at level 2 yet: every level 2 node is open
        assert!(tree.can_choose(2));
        assert!(tree.can_choose(3));

        tree.nodes[0].applied = true;
        tree.nodes[1].applied = true;
        tree.nodes[2].applied = true;

        assert!(tree.can_choose(6));
        assert!(!tree.can_choose(7));
        assert!(tree.can_choose(4));
        // the mirrored branch keeps the same index rule
        assert!(tree.can_choose(8));
        assert!(!tree.can_choose(9));
    }

    #[test]
    fn instantiate_clears_applied_flags() {
        let mut tree = branching_tree();
        tree.nodes[0].applied = true;
        let fresh = tree.instantiate();
        assert!(fresh.nodes.iter().all(|n| !n.applied));
        assert!(tree.nodes[0].applied);
    }
}
