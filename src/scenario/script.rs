//! JSON scenario files.
//!
//! ```json
//! {
//!   "collections": { "things": ["goblet", "pants"] },
//!   "entry_keys": [0, "weather"],
//!   "npcs": [{
//!     "name": "catelyn",
//!     "state": { "blah": 1 },
//!     "graph": {
//!       "0": {
//!         "text": "{name}: I have no time to waste.",
//!         "choices": [{ "label": "Children", "then": [{ "jump": "children" }] }],
//!         "present": {
//!           "collection": "things",
//!           "cases": [{ "item": "pants", "then": [{ "jump": "win" }] }],
//!           "otherwise": [{ "jump": "wrong" }]
//!         }
//!       }
//!     }
//!   }]
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::OnceLock;

use rand::seq::SliceRandom;
use rand::RngCore;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::Value;

use super::{Scenario, ScenarioError};
use crate::collection::{CollectionRegistry, Item};
use crate::dialogue::{
    ActionContext, ChoiceSet, ConversationGraph, Node, NodeKey, Npc, NpcState,
};

#[derive(Debug, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub collections: CollectionRegistry,
    #[serde(default = "default_entry_keys")]
    pub entry_keys: Vec<NodeKey>,
    pub npcs: Vec<NpcSpec>,
}

fn default_entry_keys() -> Vec<NodeKey> {
    vec![NodeKey::entry()]
}

#[derive(Debug, Deserialize)]
pub struct NpcSpec {
    pub name: String,
    #[serde(default)]
    pub state: NpcState,
    pub graph: BTreeMap<NodeKey, ScriptNode>,
}

impl ScenarioFile {
    pub fn build(self) -> Result<Scenario, ScenarioError> {
        if self.npcs.is_empty() {
            return Err(ScenarioError::NoNpcs);
        }
        let npcs = self
            .npcs
            .into_iter()
            .map(|spec| {
                let mut graph = ConversationGraph::new();
                for (key, node) in spec.graph {
                    graph.insert(key, node);
                }
                Npc::new(spec.name, graph).with_state(spec.state)
            })
            .collect();
        Ok(Scenario {
            npcs,
            collections: self.collections,
            entry_keys: self.entry_keys,
        })
    }
}

/// What a node says: one line, or one of several picked at random.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TextSpec {
    Line(String),
    Variants(Vec<String>),
}

/// Shows a choice only while `state[key] == equals`. A missing key reads as `null`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Condition {
    pub key: String,
    pub equals: Value,
}

impl Condition {
    fn holds(&self, state: &NpcState) -> bool {
        state.get(&self.key).unwrap_or(&Value::Null) == &self.equals
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChoiceSpec {
    pub label: String,
    #[serde(default)]
    pub when: Option<Condition>,
    #[serde(default)]
    pub then: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PresentCase {
    pub item: Item,
    pub then: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PresentSpec {
    pub collection: String,
    #[serde(default)]
    pub cases: Vec<PresentCase>,
    #[serde(default)]
    pub otherwise: Vec<Step>,
}

/// One instruction of a scripted action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Set {
        key: String,
        value: Value,
    },
    Increment {
        key: String,
        #[serde(default = "one")]
        by: i64,
    },
    Restart(NodeKey),
    Resume,
    Jump(NodeKey),
}

fn one() -> i64 {
    1
}

fn run(steps: &[Step], state: &mut NpcState, ctx: &mut ActionContext) {
    for step in steps {
        match step {
            Step::Set { key, value } => state.set(key.clone(), value.clone()),
            Step::Increment { key, by } => {
                state.increment(key, *by);
            }
            Step::Restart(key) => ctx.restart(key.clone()),
            Step::Resume => ctx.resume(),
            Step::Jump(key) => ctx.jump(key.clone()),
        }
    }
}

/// A node read from a scenario file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptNode {
    pub text: TextSpec,
    #[serde(default)]
    pub choices: Vec<ChoiceSpec>,
    #[serde(default)]
    pub present: Option<PresentSpec>,
}

fn placeholder() -> Option<&'static Regex> {
    static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").ok())
        .as_ref()
}

/// Fill `{name}` with the NPC's identity and `{key}` with state variables.
fn fill(template: &str, npc: &Npc) -> String {
    let Some(re) = placeholder() else {
        return template.to_owned();
    };
    re.replace_all(template, |caps: &Captures| {
        let name = &caps[1];
        if name == "name" {
            return npc.identity().to_owned();
        }
        match npc.state.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(value) => value.to_string(),
            None => caps[0].to_owned(),
        }
    })
    .into_owned()
}

impl Node for ScriptNode {
    fn render_text(&self, npc: &Npc, rng: &mut dyn RngCore) -> String {
        let template = match &self.text {
            TextSpec::Line(line) => line.as_str(),
            TextSpec::Variants(variants) => variants.choose(rng).map_or("", String::as_str),
        };
        fill(template, npc)
    }

    fn render_choices(&self, npc: &Npc) -> ChoiceSet {
        let mut set = ChoiceSet::new();
        for choice in &self.choices {
            if choice.when.as_ref().is_some_and(|c| !c.holds(&npc.state)) {
                continue;
            }
            let steps = choice.then.clone();
            set = set.choice(choice.label.clone(), move |state, ctx| run(&steps, state, ctx));
        }
        if let Some(present) = &self.present {
            let cases = present.cases.clone();
            let otherwise = present.otherwise.clone();
            set = set.present(present.collection.clone(), move |state, ctx, item| {
                let steps = cases
                    .iter()
                    .find(|case| case.item == *item)
                    .map_or(&otherwise, |case| &case.then);
                run(steps, state, ctx);
            });
        }
        set
    }
}
