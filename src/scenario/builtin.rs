use crate::collection::CollectionRegistry;
use crate::dialogue::{ChoiceSet, ConversationGraph, DialogueNode, NodeKey, Npc, NpcState};

use super::Scenario;

/// Placeholder inventory until items come from the game world.
pub const THINGS: [&str; 4] = ["goblet", "pants", "crossbow", "stag stick"];

// ---------------------------------------------------------------------------
// Catelyn
// ---------------------------------------------------------------------------

/// A noblewoman who has no time for you, unless you show her the right thing.
pub fn catelyn() -> Npc {
    let graph = ConversationGraph::new()
        .with_node(
            0,
            DialogueNode::computed(|npc| format!("{}: I have no time to waste.", npc.identity()))
                .with_choices(|_| {
                    ChoiceSet::new()
                        .choice("Children", |_, ctx| ctx.jump("children"))
                        .choice("Royalty", |_, ctx| ctx.jump("royalty"))
                        .present("things", |state, ctx, thing| {
                            state.increment("presented", 1);
                            if thing.name() == "pants" {
                                ctx.jump("win");
                            } else {
                                ctx.jump("wrong");
                            }
                        })
                }),
        )
        .with_node(
            "children",
            DialogueNode::new(
                "It would seem prudent to hide your children and your wives. \
                 Perhaps your husbands too.",
            )
            .with_choices(|_| back_to(0)),
        )
        .with_node(
            "royalty",
            DialogueNode::new("Perhaps you'll make a good king. Who knows.")
                .with_choices(|_| back_to(0)),
        )
        .with_node("win", DialogueNode::new("you win"))
        .with_node(
            "weather",
            DialogueNode::variants([
                "The night descends upon us all.",
                "These are dark and trying times.",
            ])
            .with_choices(|_| back_to("weather")),
        )
        .with_node(
            "wrong",
            DialogueNode::variants(["That's not something that interests me.", "You chose badly."])
                .with_choices(|_| ChoiceSet::new().choice("choose again", |_, ctx| ctx.jump(0))),
        );

    let mut state = NpcState::new();
    state.set("blah", 1);
    Npc::new("catelyn", graph).with_state(state)
}

/// A lone "back" choice that puts `key` back into the frontier and moves on.
fn back_to(key: impl Into<NodeKey>) -> ChoiceSet {
    let key = key.into();
    ChoiceSet::new().choice("back", move |_, ctx| {
        ctx.restart(key);
        ctx.resume();
    })
}

pub fn catelyn_scenario() -> Scenario {
    Scenario {
        npcs: vec![catelyn()],
        collections: CollectionRegistry::new().with_collection("things", THINGS),
        entry_keys: vec![NodeKey::entry(), NodeKey::from("weather")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_jump_target_exists() {
        let npc = catelyn();
        for key in ["0", "children", "royalty", "win", "weather", "wrong"] {
            assert!(npc.graph().contains(&NodeKey::from(key)), "missing {key}");
        }
    }

    #[test]
    fn test_scenario_offers_things() {
        let scenario = catelyn_scenario();
        assert_eq!(scenario.collections.resolve("things").unwrap().len(), 4);
        assert!(scenario.npc("catelyn").is_some());
        assert_eq!(scenario.entry_keys.len(), 2);
    }
}
