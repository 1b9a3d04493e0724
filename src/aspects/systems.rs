//! Experience, tokens and applying unlocked aspect rewards.

use bevy::prelude::*;
use std::collections::HashMap;

use super::data::AspectRegistry;
use super::manager::{AspectsManager, LevelSystem};
use super::tree::AspectReward;
use crate::combat::{ComboRegistry, Weapon};
use crate::core::{KillEvent, LevelUpEvent, PlayState};
use crate::enemies::Enemy;
use crate::entities::{EntityStats, Health};
use crate::status_effects::{EffectContext, EffectOutbox, SourceMultipliers, StatusEffector};

/// Request to spend a token on a node, equipping the aspect first if needed.
#[derive(Event, Debug, Clone)]
pub struct AspectChoiceEvent {
    pub entity: Entity,
    pub aspect: String,
    pub node: usize,
}

/// Sent after a node has been unlocked and its reward applied.
#[derive(Event, Debug, Clone)]
pub struct AspectUnlockedEvent {
    pub entity: Entity,
    pub aspect: String,
    pub node: usize,
}

/// Killers with a level system collect the victim's exp.
pub fn grant_kill_exp(
    mut kills: EventReader<KillEvent>,
    victims: Query<&Enemy>,
    mut killers: Query<&mut LevelSystem>,
    mut level_ups: EventWriter<LevelUpEvent>,
) {
    for kill in kills.read() {
        let Ok(enemy) = victims.get(kill.victim) else {
            continue;
        };
        let Ok(mut levels) = killers.get_mut(kill.killer) else {
            continue;
        };

        for new_level in levels.add_exp(enemy.exp_value) {
            info!("{:?} reached level {}", kill.killer, new_level);
            level_ups.send(LevelUpEvent {
                entity: kill.killer,
                new_level,
            });
        }
    }
}

/// Every level gained is worth one aspect token.
pub fn grant_aspect_tokens(
    mut level_ups: EventReader<LevelUpEvent>,
    mut managers: Query<&mut AspectsManager>,
) {
    for event in level_ups.read() {
        if let Ok(mut manager) = managers.get_mut(event.entity) {
            manager.tokens += 1;
        }
    }
}

pub fn handle_aspect_choices(
    mut choices: EventReader<AspectChoiceEvent>,
    registry: Res<AspectRegistry>,
    combos: Res<ComboRegistry>,
    mut owners: Query<(
        &mut AspectsManager,
        &mut StatusEffector,
        &mut EntityStats,
        &Health,
        Option<&mut Weapon>,
    )>,
    mut unlocked: EventWriter<AspectUnlockedEvent>,
    mut outbox: EffectOutbox,
) {
    for choice in choices.read() {
        let Ok((mut manager, mut effector, mut stats, health, weapon)) =
            owners.get_mut(choice.entity)
        else {
            continue;
        };

        if manager.equipped_tree(&choice.aspect).is_none() {
            let Some(tree) = registry.get(&choice.aspect) else {
                warn!("Unknown aspect '{}'", choice.aspect);
                continue;
            };
            if let Err(e) = manager.equip(tree) {
                warn!("{}", e);
                continue;
            }
            info!("Equipped {}", choice.aspect);
        }

        let reward = match manager.unlock(&choice.aspect, choice.node) {
            Ok(reward) => reward,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        match reward {
            AspectReward::StatusEffect(effect) => {
                let mut sources = HashMap::new();
                sources.insert(choice.entity, SourceMultipliers::of(&stats));
                let mut ctx = EffectContext::new(choice.entity, &mut stats, health.current, &sources)
                    .with_weapon(weapon.is_some());
                effector.apply(effect, Some(choice.entity), &mut ctx);
                outbox.dispatch(ctx.signals);
            }
            AspectReward::Combo(name) => {
                let Some(mut weapon) = weapon else {
                    error!("{:?} has no weapon for combo '{}'", choice.entity, name);
                    continue;
                };
                let Some(combo) = combos.get(&name) else {
                    error!("Aspect combo '{}' is not registered", name);
                    continue;
                };
                weapon.add_combo(combo.clone());
            }
        }

        unlocked.send(AspectUnlockedEvent {
            entity: choice.entity,
            aspect: choice.aspect.clone(),
            node: choice.node,
        });
    }
}

/// Leave aspect selection once nobody has anything left to spend tokens on.
pub fn finish_aspect_selection(
    registry: Res<AspectRegistry>,
    managers: Query<&AspectsManager>,
    mut next_phase: ResMut<NextState<PlayState>>,
) {
    if managers.iter().all(|manager| !manager.has_choices(&registry.trees)) {
        info!("Aspect selection finished");
        next_phase.set(PlayState::LandPlacement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspects::tree::tests::branching_tree;
    use crate::status_effects::{StatusEffect, StatusEffectExpiredEvent, StatusEffectKind};
    use crate::core::{DamageEvent, ExecuteEvent, HealEvent};

    fn test_app() -> App {
        let mut app = App::new();
        app.init_resource::<Time>()
            .insert_resource(AspectRegistry {
                trees: vec![branching_tree()],
            })
            .insert_resource(ComboRegistry::builtin())
            .add_event::<KillEvent>()
            .add_event::<LevelUpEvent>()
            .add_event::<AspectChoiceEvent>()
            .add_event::<AspectUnlockedEvent>()
            .add_event::<DamageEvent>()
            .add_event::<HealEvent>()
            .add_event::<ExecuteEvent>()
            .add_event::<StatusEffectExpiredEvent>()
            .add_systems(
                Update,
                (grant_kill_exp, grant_aspect_tokens, handle_aspect_choices).chain(),
            );
        app
    }

    fn spawn_owner(app: &mut App) -> Entity {
        let stats = EntityStats::default();
        app.world_mut()
            .spawn((
                Health::full(&stats),
                stats,
                StatusEffector::default(),
                AspectsManager::default(),
                LevelSystem::default(),
                Weapon::new("Sword", Vec::new()),
            ))
            .id()
    }

    #[test]
    fn kills_grant_exp_and_tokens() {
        let mut app = test_app();
        let player = spawn_owner(&mut app);
        let victim = app
            .world_mut()
            .spawn(Enemy {
                cost: 1,
                exp_value: 12,
            })
            .id();

        app.world_mut().send_event(KillEvent {
            killer: player,
            victim,
        });
        app.update();

        let levels = app.world().get::<LevelSystem>(player).unwrap();
        assert_eq!(levels.level, 2);
        assert_eq!(levels.current_exp, 2);
        assert_eq!(app.world().get::<AspectsManager>(player).unwrap().tokens, 1);
    }

    #[test]
    fn choosing_a_combo_node_adds_it_to_the_weapon() {
        let mut app = test_app();
        let player = spawn_owner(&mut app);
        app.world_mut().get_mut::<AspectsManager>(player).unwrap().tokens = 1;

        // the test tree's rewards are combos named after their nodes
        app.world_mut()
            .resource_mut::<ComboRegistry>()
            .combos
            .insert(
                "root".to_string(),
                crate::combat::ComboDefinition::new("root", &[crate::combat::ComboAction::Jump]),
            );

        app.world_mut().send_event(AspectChoiceEvent {
            entity: player,
            aspect: "Rage".to_string(),
            node: 0,
        });
        app.update();

        let weapon = app.world().get::<Weapon>(player).unwrap();
        assert!(weapon.has_combo("root"));
        let manager = app.world().get::<AspectsManager>(player).unwrap();
        assert_eq!(manager.tokens, 0);
        assert!(manager.equipped_tree("Rage").is_some());
    }

    #[test]
    fn choosing_an_effect_node_applies_it_to_the_owner() {
        let mut app = test_app();
        let player = spawn_owner(&mut app);
        app.world_mut().get_mut::<AspectsManager>(player).unwrap().tokens = 1;

        let mut tree = branching_tree();
        tree.name = "Haste".to_string();
        tree.nodes[0].reward = AspectReward::StatusEffect(StatusEffect::permanent_speed(1.5));
        app.world_mut().resource_mut::<AspectRegistry>().trees.push(tree);

        app.world_mut().send_event(AspectChoiceEvent {
            entity: player,
            aspect: "Haste".to_string(),
            node: 0,
        });
        app.update();

        let effector = app.world().get::<StatusEffector>(player).unwrap();
        assert!(effector.has(StatusEffectKind::PermanentSpeed));
        let stats = app.world().get::<EntityStats>(player).unwrap();
        assert_eq!(stats.status_speed.value(), 1.5);
    }
}
