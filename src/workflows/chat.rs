// General chat workflow

use crate::agent::Agent;
use crate::llm::ProviderManager;
use crate::store::PlanStore;
use crate::tools::register_plan_tools;
use std::sync::Arc;

const CHAT_INSTRUCTIONS: &str = "\
You are a helpful assistant. You can persist, list, and delete research
plans with your tools; use them when the user asks about plans. Keep
answers concise.";

/// Build the general-chat agent with the research-plan tools registered
pub fn chat_agent(manager: Arc<ProviderManager>, store: PlanStore) -> Agent {
    let mut agent =
        Agent::new("chat", manager).with_system_instructions(CHAT_INSTRUCTIONS);
    register_plan_tools(&mut agent, store);
    agent
}
