use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;
use serde_json::Value;

use crate::mcp::ToolResult;

use super::retrieve::Snapshot;

const BANNER: &str = "🏨 PELANGI CAPSULE HOSTEL - DAILY OPERATIONS REPORT";
const FOOTER_SIGNATURE: &str = "🤖 Automated by Moltbot v1.0";
const FRAME_WIDTH: usize = 55;
const UNAVAILABLE: &str = "⚠️ Data unavailable";

/// Capsule groups in output order.
const CAPSULE_GROUPS: [&str; 3] = ["back", "middle", "front"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Occupancy,
    Capsules,
    Guests,
    Overdue,
    Maintenance,
}

impl SectionKind {
    /// Title line and the width of the rule drawn under it.
    fn heading(self) -> (&'static str, usize) {
        match self {
            SectionKind::Occupancy => ("📊 OCCUPANCY STATISTICS", 23),
            SectionKind::Capsules => ("🛏️ CAPSULE STATUS BY SECTION", 27),
            SectionKind::Guests => ("👥 GUEST INFORMATION", 19),
            SectionKind::Overdue => ("⚠️ OVERDUE GUESTS", 19),
            SectionKind::Maintenance => ("🔧 MAINTENANCE STATUS", 23),
        }
    }

    fn header(self) -> String {
        let (title, width) = self.heading();
        format!("{title}\n{}", "═".repeat(width))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub text: String,
    pub available: bool,
}

impl Section {
    fn rendered(kind: SectionKind, text: String) -> Self {
        Self {
            kind,
            text,
            available: true,
        }
    }

    fn titled(kind: SectionKind, body: &str) -> Self {
        Self::rendered(kind, format!("{}\n{body}", kind.header()))
    }

    fn unavailable(kind: SectionKind) -> Self {
        Self {
            available: false,
            ..Self::titled(kind, UNAVAILABLE)
        }
    }
}

/// Finished report. Built once per run and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Report {
    sections: Vec<Section>,
    generated_at: DateTime<Tz>,
}

impl Report {
    #[tracing::instrument(
        name = "pipeline_stage format",
        skip(snapshot),
        fields(
            pipeline.stage = "format",
            report.sections_unavailable,
        )
    )]
    pub fn assemble(snapshot: &Snapshot, generated_at: DateTime<Tz>) -> Self {
        let sections = vec![
            occupancy_section(&snapshot.occupancy),
            capsule_section(&snapshot.capsules),
            guest_section(&snapshot.guests),
            overdue_section(&snapshot.overdue),
            maintenance_section(&snapshot.maintenance),
        ];

        let report = Self {
            sections,
            generated_at,
        };
        tracing::Span::current().record(
            "report.sections_unavailable",
            report.unavailable_sections(),
        );
        report
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn unavailable_sections(&self) -> usize {
        self.sections.iter().filter(|s| !s.available).count()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = "═".repeat(FRAME_WIDTH);

        writeln!(f, "{BANNER}")?;
        writeln!(f, "{frame}")?;
        writeln!(f)?;
        for section in &self.sections {
            writeln!(f, "{}", section.text)?;
            writeln!(f)?;
        }
        writeln!(f, "{frame}")?;
        writeln!(
            f,
            "📅 Report Generated: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S GMT+8")
        )?;
        write!(f, "{FOOTER_SIGNATURE}")
    }
}

fn display_value(value: Option<&Value>, default: &str) -> String {
    match value {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn occupancy_section(result: &ToolResult) -> Section {
    let kind = SectionKind::Occupancy;
    let Some(Value::Object(data)) = result.data() else {
        return Section::unavailable(kind);
    };

    let field = |key: &str| display_value(data.get(key), "0");

    Section::titled(
        kind,
        &format!(
            "Total Capsules: {}\nOccupied: {} capsules\nAvailable: {} capsules\nOccupancy Rate: {}%",
            field("total"),
            field("occupied"),
            field("available"),
            field("occupancyRate"),
        ),
    )
}

pub fn capsule_section(result: &ToolResult) -> Section {
    let kind = SectionKind::Capsules;
    let Some(Value::Array(capsules)) = result.data() else {
        return Section::unavailable(kind);
    };

    let mut groups: [Vec<&Value>; 3] = Default::default();
    let mut dropped = 0usize;
    for capsule in capsules {
        let tag = capsule.get("section").and_then(Value::as_str);
        match tag.and_then(|t| CAPSULE_GROUPS.iter().position(|g| *g == t)) {
            Some(index) => groups[index].push(capsule),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::debug!(dropped, "Skipped capsules with unrecognized section tag");
    }

    let mut lines = vec![kind.header(), String::new()];
    for (name, members) in CAPSULE_GROUPS.iter().zip(&groups) {
        if members.is_empty() {
            continue;
        }

        let (available, occupied): (Vec<&Value>, Vec<&Value>) = members
            .iter()
            .copied()
            .partition(|c| c.get("isAvailable").is_some_and(is_truthy));

        lines.push(format!(
            "{} SECTION ({} capsules):\n  Occupied: {}\n  Available: {}\n",
            name.to_uppercase(),
            members.len(),
            join_numbers(&occupied),
            join_numbers(&available),
        ));
    }

    Section::rendered(kind, lines.join("\n").trim_end().to_string())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn join_numbers(capsules: &[&Value]) -> String {
    if capsules.is_empty() {
        return "None".to_string();
    }
    capsules
        .iter()
        .map(|c| display_value(c.get("number"), "N/A"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Number of checked-in guests in either a bare list or a paginated wrapper.
pub fn guest_count(data: &Value) -> Option<usize> {
    match data {
        Value::Array(guests) => Some(guests.len()),
        Value::Object(page) => Some(page.get("data").and_then(Value::as_array).map_or(0, Vec::len)),
        _ => None,
    }
}

pub fn guest_section(result: &ToolResult) -> Section {
    let kind = SectionKind::Guests;
    match result.data().and_then(guest_count) {
        Some(count) => Section::titled(kind, &format!("Checked-in Guests: {count}")),
        None => Section::unavailable(kind),
    }
}

pub fn overdue_section(result: &ToolResult) -> Section {
    let kind = SectionKind::Overdue;
    let guests: &[Value] = match result.data() {
        Some(Value::Array(guests)) => guests,
        Some(Value::Null) => &[],
        Some(Value::Object(o)) if o.is_empty() => &[],
        _ => return Section::unavailable(kind),
    };
    if guests.is_empty() {
        return Section::titled(kind, "✅ No overdue guests");
    }

    let mut lines = vec![
        kind.header(),
        format!("⚠️ {} guest(s) past expected checkout:", guests.len()),
        String::new(),
    ];
    lines.extend(guests.iter().map(|guest| {
        format!(
            "  - {} (Capsule {}) - Expected: {}",
            display_value(guest.get("name"), "Unknown"),
            display_value(guest.get("capsuleNumber"), "N/A"),
            display_value(guest.get("expectedCheckoutDate"), "N/A"),
        )
    }));

    Section::rendered(kind, lines.join("\n"))
}

/// The server pre-formats the maintenance block; pass it through verbatim.
pub fn maintenance_section(result: &ToolResult) -> Section {
    let kind = SectionKind::Maintenance;
    let text = match result {
        ToolResult::Failed(_) => return Section::unavailable(kind),
        ToolResult::Raw(text) | ToolResult::Data(Value::String(text)) => Some(text.as_str()),
        ToolResult::Data(data) => data.get("raw").and_then(Value::as_str),
    };

    match text {
        Some(text) => Section::rendered(kind, text.to_string()),
        None => Section::titled(kind, "✅ No active maintenance issues"),
    }
}
