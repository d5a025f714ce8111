use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::LazyLock;

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("pelangi-daily-report"));

// --- MCP Client Metrics ---

pub static MCP_TOOL_CALLS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("mcp.tool.calls")
        .with_description("Number of MCP tool calls issued")
        .with_unit("{call}")
        .build()
});

pub static MCP_TOOL_ERRORS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("mcp.tool.errors")
        .with_description("Number of MCP tool calls that returned an error marker")
        .with_unit("{error}")
        .build()
});

pub static MCP_TOOL_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("mcp.tool.duration")
        .with_description("Duration of MCP tool calls in seconds")
        .with_unit("s")
        .build()
});

pub static MCP_HEALTH_FAILURES: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("mcp.health.failures")
        .with_description("Number of failed MCP health probes")
        .with_unit("{probe}")
        .build()
});

// --- Domain Metrics ---

pub static REPORT_RUNS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("report.runs")
        .with_description("Number of report runs by outcome")
        .with_unit("{run}")
        .build()
});

pub static REPORT_GENERATION_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("report.generation.duration")
        .with_description("Total report generation duration in seconds")
        .with_unit("s")
        .build()
});

pub static REPORT_SECTIONS_UNAVAILABLE: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("report.sections.unavailable")
        .with_description("Number of report sections rendered as data unavailable")
        .with_unit("{section}")
        .build()
});

// --- Delivery Metrics ---

pub static DELIVERY_ATTEMPTS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("delivery.attempts")
        .with_description("Number of delivery attempts by channel and status")
        .with_unit("{attempt}")
        .build()
});
