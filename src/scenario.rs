//! A cast of NPCs together with the collections and entry keys their
//! conversations expect.

pub mod builtin;
pub mod script;

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::collection::CollectionRegistry;
use crate::dialogue::{NodeKey, Npc};

pub use builtin::catelyn_scenario;
pub use script::{ScenarioFile, ScriptNode, Step};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scenario has nobody to talk to")]
    NoNpcs,
}

/// Everything a host needs to run conversations.
#[derive(Debug)]
pub struct Scenario {
    pub npcs: Vec<Npc>,
    pub collections: CollectionRegistry,
    /// Initial frontier of every session.
    pub entry_keys: Vec<NodeKey>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let file: ScenarioFile = serde_json::from_str(json)?;
        file.build()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_owned(),
            source,
        })?;
        let scenario = Self::from_json(&json)?;
        info!(
            "Loaded {} NPC(s) from {}",
            scenario.npcs.len(),
            path.display()
        );
        Ok(scenario)
    }

    pub fn npc(&self, identity: &str) -> Option<&Npc> {
        self.npcs.iter().find(|npc| npc.identity() == identity)
    }
}
