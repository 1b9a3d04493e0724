//! Aspect tree definitions loaded from `assets/data/aspects`.

use bevy::prelude::*;

use super::tree::{AspectNode, AspectReward, AspectTree};
use crate::core::load_ron_dir;
use crate::status_effects::StatusEffect;

const ASPECTS_DIR: &str = "assets/data/aspects";

/// Every aspect tree on offer, in offer order.
#[derive(Resource, Debug, Default)]
pub struct AspectRegistry {
    pub trees: Vec<AspectTree>,
}

impl AspectRegistry {
    pub fn get(&self, name: &str) -> Option<&AspectTree> {
        self.trees.iter().find(|tree| tree.name == name)
    }

    pub fn builtin() -> Self {
        Self {
            trees: vec![rage_tree(), fear_tree()],
        }
    }
}

fn node(name: &str, parent: Option<usize>, children: &[usize], reward: AspectReward) -> AspectNode {
    AspectNode {
        name: name.to_string(),
        description: String::new(),
        parent,
        children: children.to_vec(),
        reward,
        applied: false,
    }
}

fn effect(effect: StatusEffect) -> AspectReward {
    AspectReward::StatusEffect(effect)
}

fn rage_tree() -> AspectTree {
    AspectTree {
        name: "Aspect of Rage".to_string(),
        description: "Hits set enemies ablaze with burning rage.".to_string(),
        nodes: vec![
            node(
                "Burning Rage",
                None,
                &[1],
                effect(StatusEffect::rage_passive(StatusEffect::burning_rage(1.0))),
            ),
            node("Fury", Some(0), &[2, 3], effect(StatusEffect::permanent_speed(1.1))),
            node("Bloodthirst", Some(1), &[4], effect(StatusEffect::life_steal(0.1))),
            node("Rage Slam", Some(1), &[5], AspectReward::Combo("rage_slam".to_string())),
            node("Thick Skin", Some(2), &[6, 7], effect(StatusEffect::max_health_increase(25.0))),
            node("Thick Skin", Some(3), &[8, 9], effect(StatusEffect::max_health_increase(25.0))),
            node("Frenzy", Some(4), &[], effect(StatusEffect::permanent_speed(1.2))),
            node("Overcharge", Some(4), &[], effect(StatusEffect::rage_passive_b())),
            node("Frenzy", Some(5), &[], effect(StatusEffect::permanent_speed(1.2))),
            node("Juggernaut", Some(5), &[], effect(StatusEffect::max_health_increase(50.0))),
        ],
    }
}

fn fear_tree() -> AspectTree {
    AspectTree {
        name: "Aspect of Fear".to_string(),
        description: "Hits haunt enemies until they can be executed.".to_string(),
        nodes: vec![
            node(
                "Ghastly Grievance",
                None,
                &[1],
                effect(StatusEffect::fear_passive(StatusEffect::ghastly_grievance(5.0))),
            ),
            node("Lingering Dread", Some(0), &[2, 3], effect(StatusEffect::extended_debuffs(1.5))),
            node("Dread Sweep", Some(1), &[4], AspectReward::Combo("dread_sweep".to_string())),
            node("Siphon", Some(1), &[5], effect(StatusEffect::life_steal(0.05))),
            node("Unease", Some(2), &[], effect(StatusEffect::extended_debuffs(1.25))),
            node("Terror", Some(3), &[], effect(StatusEffect::fear_passive_b())),
        ],
    }
}

/// Fill the aspect registry from disk, falling back to the built-in trees.
/// Trees that fail validation are skipped.
pub fn load_aspect_trees(mut registry: ResMut<AspectRegistry>) {
    let definitions = match load_ron_dir::<AspectTree>(ASPECTS_DIR) {
        Ok(definitions) => definitions,
        Err(e) => {
            warn!("{}, using built-in aspects", e);
            *registry = AspectRegistry::builtin();
            return;
        }
    };

    for (file, tree) in definitions {
        if let Err(e) = tree.validate() {
            error!("{}", e);
            continue;
        }
        if registry.get(&tree.name).is_some() {
            error!("Duplicate aspect tree '{}' in {}", tree.name, file);
            continue;
        }
        info!("Loaded aspect tree: {} ({} nodes)", tree.name, tree.nodes.len());
        registry.trees.push(tree);
    }

    if registry.trees.is_empty() {
        warn!("No valid aspect trees in {}, using built-in aspects", ASPECTS_DIR);
        *registry = AspectRegistry::builtin();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status_effects::StatusEffectKind;

    #[test]
    fn builtin_trees_are_valid() {
        let registry = AspectRegistry::builtin();
        assert_eq!(registry.trees.len(), 2);
        for tree in &registry.trees {
            assert!(tree.validate().is_ok(), "{} is invalid", tree.name);
        }
        assert_eq!(registry.get("Aspect of Rage").unwrap().multi_node_levels(), vec![2, 4]);
    }

    #[test]
    fn both_trees_offer_a_second_passive() {
        let registry = AspectRegistry::builtin();
        let offers = |tree: &str, kind: StatusEffectKind| {
            registry.get(tree).unwrap().nodes.iter().any(|node| {
                matches!(&node.reward, AspectReward::StatusEffect(effect) if effect.kind() == kind)
            })
        };
        assert!(offers("Aspect of Rage", StatusEffectKind::RagePassiveB));
        assert!(offers("Aspect of Fear", StatusEffectKind::FearPassiveB));
    }
}
