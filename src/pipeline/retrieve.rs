use serde_json::json;

use crate::mcp::{ToolResult, ToolSource};

pub const OCCUPANCY_TOOL: &str = "pelangi_get_occupancy";
pub const CAPSULES_TOOL: &str = "pelangi_list_capsules";
pub const GUESTS_TOOL: &str = "pelangi_list_guests";
pub const OVERDUE_TOOL: &str = "pelangi_get_overdue_guests";
pub const MAINTENANCE_TOOL: &str = "pelangi_export_whatsapp_issues";

/// One point-in-time read of everything the report needs.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub occupancy: ToolResult,
    pub capsules: ToolResult,
    pub guests: ToolResult,
    pub overdue: ToolResult,
    pub maintenance: ToolResult,
}

impl Snapshot {
    pub fn failed_calls(&self) -> usize {
        [
            &self.occupancy,
            &self.capsules,
            &self.guests,
            &self.overdue,
            &self.maintenance,
        ]
        .iter()
        .filter(|r| r.is_failed())
        .count()
    }
}

#[tracing::instrument(
    name = "pipeline_stage retrieve",
    skip(source),
    fields(
        pipeline.stage = "retrieve",
        report.failed_calls,
    )
)]
pub async fn retrieve(source: &dyn ToolSource) -> Snapshot {
    let snapshot = Snapshot {
        occupancy: source.call_tool(OCCUPANCY_TOOL, None).await,
        capsules: source.call_tool(CAPSULES_TOOL, None).await,
        guests: source
            .call_tool(GUESTS_TOOL, Some(json!({"page": 1, "limit": 100})))
            .await,
        overdue: source.call_tool(OVERDUE_TOOL, None).await,
        maintenance: source.call_tool(MAINTENANCE_TOOL, None).await,
    };

    tracing::Span::current().record("report.failed_calls", snapshot.failed_calls());

    snapshot
}
