// Research plan tools: store / list / delete plans on behalf of the LLM
//
// Each tool parses its own JSON arguments and reports failures through
// anyhow; the agent boundary converts those into descriptive strings so a
// malformed call never interrupts the conversation.

use crate::agent::Tool;
use crate::store::PlanStore;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Persist a new research plan
pub struct StorePlanTool {
    store: PlanStore,
}

impl StorePlanTool {
    pub fn new(store: PlanStore) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct StorePlanArgs {
    summary: String,
    #[serde(default)]
    details: String,
}

#[async_trait]
impl Tool for StorePlanTool {
    fn name(&self) -> &str {
        "store_research_plan"
    }

    fn description(&self) -> &str {
        "Persist a research plan so it can be retrieved later. Use before starting \
         a multi-step research task."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "summary": {
                "type": "string",
                "description": "One-line summary of the plan"
            },
            "details": {
                "type": "string",
                "description": "Step-by-step plan details"
            }
        })
    }

    async fn execute(&self, arguments: &str) -> Result<serde_json::Value> {
        let args: StorePlanArgs = serde_json::from_str(arguments)
            .map_err(|e| anyhow!("invalid arguments: {e}"))?;

        let id = self.store.create(&args.summary, &args.details).await?;
        Ok(json!({ "id": id, "status": "stored" }))
    }
}

/// List all stored research plans
pub struct GetPlansTool {
    store: PlanStore,
}

impl GetPlansTool {
    pub fn new(store: PlanStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetPlansTool {
    fn name(&self) -> &str {
        "get_research_plans"
    }

    fn description(&self) -> &str {
        "List all stored research plans with their ids."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({})
    }

    async fn execute(&self, _arguments: &str) -> Result<serde_json::Value> {
        let plans = self.store.list().await?;
        Ok(serde_json::to_value(plans)?)
    }
}

/// Delete a research plan by id
pub struct DeletePlanTool {
    store: PlanStore,
}

impl DeletePlanTool {
    pub fn new(store: PlanStore) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct DeletePlanArgs {
    id: i64,
}

#[async_trait]
impl Tool for DeletePlanTool {
    fn name(&self) -> &str {
        "delete_research_plan"
    }

    fn description(&self) -> &str {
        "Delete a stored research plan by its numeric id."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "id": {
                "type": "integer",
                "description": "Id of the plan to delete"
            }
        })
    }

    async fn execute(&self, arguments: &str) -> Result<serde_json::Value> {
        let args: DeletePlanArgs = serde_json::from_str(arguments)
            .map_err(|e| anyhow!("invalid arguments: {e}"))?;

        let removed = self.store.delete(args.id).await?;
        if removed {
            Ok(json!({ "id": args.id, "status": "deleted" }))
        } else {
            Ok(json!({ "id": args.id, "status": "not_found" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> PlanStore {
        PlanStore::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_store_then_get() {
        let store = store().await;
        let store_tool = StorePlanTool::new(store.clone());
        let get_tool = GetPlansTool::new(store);

        let stored = store_tool
            .execute(r#"{"summary":"s","details":"d"}"#)
            .await
            .unwrap();
        assert_eq!(stored["status"], "stored");

        let plans = get_tool.execute("{}").await.unwrap();
        assert_eq!(plans.as_array().unwrap().len(), 1);
        assert_eq!(plans[0]["summary"], "s");
    }

    #[tokio::test]
    async fn test_delete_reports_not_found() {
        let tool = DeletePlanTool::new(store().await);
        let result = tool.execute(r#"{"id":99}"#).await.unwrap();
        assert_eq!(result["status"], "not_found");
    }

    #[tokio::test]
    async fn test_invalid_arguments_error() {
        let tool = StorePlanTool::new(store().await);
        let err = tool.execute("not json").await.unwrap_err();
        assert!(err.to_string().contains("invalid arguments"));
    }

    #[tokio::test]
    async fn test_declarations_forbid_additional_properties() {
        let decl = StorePlanTool::new(store().await).declaration();
        assert!(!decl.function.parameters.additional_properties);
        assert!(decl.function.parameters.required.contains(&"summary".to_string()));
    }
}
