//! Replays a scenario script as `agent_message` events.

use async_trait::async_trait;
use roundtable_core::lifecycle::{Producer, ProducerError, RunConfig, RunContext};
use roundtable_sdk::objects::{AgentMessage, topics};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Agent, ScenarioCatalog};

pub struct ScriptedProducer {
    catalog: Arc<ScenarioCatalog>,
    step_delay: Duration,
}

impl ScriptedProducer {
    pub fn new(catalog: Arc<ScenarioCatalog>, step_delay: Duration) -> Self {
        Self {
            catalog,
            step_delay,
        }
    }

    fn message(speaker: Agent, content: &str) -> AgentMessage {
        AgentMessage {
            id: Uuid::new_v4().to_string(),
            sender: speaker.key().to_string(),
            sender_display_name: speaker.display_name().to_string(),
            content: content.to_string(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

#[async_trait]
impl Producer for ScriptedProducer {
    fn prepare(&self, config: &RunConfig) -> Result<(), ProducerError> {
        if self.catalog.contains(&config.name) {
            Ok(())
        } else {
            Err(ProducerError::InvalidConfig(format!(
                "unknown scenario: {}",
                config.name
            )))
        }
    }

    async fn produce(&self, config: RunConfig, ctx: RunContext) -> Result<(), ProducerError> {
        let scenario = self
            .catalog
            .get(&config.name)
            .ok_or_else(|| ProducerError::InvalidConfig(format!("unknown scenario: {}", config.name)))?;
        let cancel = ctx.cancel_signal();

        let opening = format!("Scenario: {}. {}", scenario.name, scenario.prompt);
        ctx.publish_json(topics::AGENT_MESSAGE, &Self::message(Agent::System, &opening))?;

        for (index, line) in scenario.script.iter().enumerate() {
            if !cancel.sleep(self.step_delay).await {
                tracing::debug!(run_id = %ctx.run_id(), index, "Script interrupted");
                return Ok(());
            }
            ctx.publish_json(topics::AGENT_MESSAGE, &Self::message(line.speaker, line.text))?;
        }

        tracing::debug!(run_id = %ctx.run_id(), scenario = scenario.id, "Script finished");
        Ok(())
    }
}
