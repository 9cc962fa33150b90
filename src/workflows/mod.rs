// Workflow orchestration
//
// Each workflow is a self-contained unit that borrows the shared provider
// manager and whatever collaborators it needs. The router decides which
// one handles a given request; workflows never call each other.

pub mod chat;
pub mod image;
pub mod research;
pub mod router;
pub mod summarize;

pub use chat::chat_agent;
pub use image::ImageWorkflow;
pub use research::{ResearchOutcome, ResearchWorkflow};
pub use router::{Router, WorkflowKind};
pub use summarize::SummarizeWorkflow;
