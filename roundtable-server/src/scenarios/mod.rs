//! Conversation scenarios.
//!
//! A fixed catalogue of team conversations that the scripted producer can
//! replay. Scenario ids double as run names.

mod producer;
mod script;

pub use producer::ScriptedProducer;

use roundtable_sdk::objects::ScenarioInfo;

/// A participant of the scripted conversations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agent {
    Manager,
    SeniorDev,
    JuniorDev,
    Designer,
    System,
}

impl Agent {
    /// Stable key used as `sender`.
    pub fn key(self) -> &'static str {
        match self {
            Agent::Manager => "Manager",
            Agent::SeniorDev => "SeniorDev",
            Agent::JuniorDev => "JuniorDev",
            Agent::Designer => "Designer",
            Agent::System => "System",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Agent::Manager => "Manager",
            Agent::SeniorDev => "Senior Developer",
            Agent::JuniorDev => "Junior Developer",
            Agent::Designer => "Designer",
            Agent::System => "System",
        }
    }
}

/// One line of a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    pub speaker: Agent,
    pub text: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Briefing announced by the system at the start of the run.
    pub prompt: &'static str,
    pub script: &'static [Line],
}

impl Scenario {
    pub fn info(&self) -> ScenarioInfo {
        ScenarioInfo {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
        }
    }
}

/// The scenario catalogue, in display order.
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    scenarios: Vec<Scenario>,
}

impl ScenarioCatalog {
    pub fn builtin() -> Self {
        Self {
            scenarios: script::builtin(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn list(&self) -> Vec<ScenarioInfo> {
        self.scenarios.iter().map(Scenario::info).collect()
    }
}

impl Default for ScenarioCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalogue() {
        let catalog = ScenarioCatalog::builtin();
        let ids: Vec<String> = catalog.list().into_iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            [
                "team_meeting",
                "technical_discussion",
                "design_review",
                "conflict_resolution",
                "casual_chat",
            ]
        );
        assert!(catalog.contains("design_review"));
        assert!(!catalog.contains("standup"));
    }

    #[test]
    fn test_every_scenario_has_a_script() {
        for scenario in ScenarioCatalog::builtin().scenarios {
            assert!(!scenario.script.is_empty(), "{} has no lines", scenario.id);
            assert!(
                scenario.script.iter().all(|l| l.speaker != Agent::System),
                "{} lets the system speak mid-run",
                scenario.id
            );
        }
    }
}
