pub mod config;
pub mod delivery;
pub mod error;
pub mod mcp;
pub mod pipeline;
pub mod scheduler;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, AppResult};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Timezone for report timestamps and the daily schedule.
pub const REPORT_TZ: Tz = chrono_tz::Asia::Kuala_Lumpur;

pub fn report_now() -> DateTime<Tz> {
    Utc::now().with_timezone(&REPORT_TZ)
}
