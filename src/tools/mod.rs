// Concrete tools exposed to the LLM

mod research_plan;

pub use research_plan::{DeletePlanTool, GetPlansTool, StorePlanTool};

use crate::agent::Agent;
use crate::store::PlanStore;
use std::sync::Arc;

/// Register the research-plan tool set on an agent
pub fn register_plan_tools(agent: &mut Agent, store: PlanStore) {
    agent.register_tool(Arc::new(StorePlanTool::new(store.clone())));
    agent.register_tool(Arc::new(GetPlansTool::new(store.clone())));
    agent.register_tool(Arc::new(DeletePlanTool::new(store)));
}
