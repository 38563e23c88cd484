use super::ToolContext;
use crate::types::Tool;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize, JsonSchema, Default)]
#[serde(rename = "get_current_time")]
#[schemars(description = "Gets the current time in EST, or in the user's configured time zone")]
pub struct GetCurrentTime {}

impl Tool for GetCurrentTime {
    type Context = ToolContext;

    fn apply(&self, context: Self::Context) -> Value {
        json!({ "time": format_time(Utc::now(), context.config.tools.timezone) })
    }
}

/// `Mon Jan 2 15:04:05 EST 2006`
fn format_time(at: DateTime<Utc>, timezone: Tz) -> String {
    at.with_timezone(&timezone)
        .format("%a %b %-d %H:%M:%S %Z %Y")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_context;
    use chrono::TimeZone;

    #[test]
    fn formats_in_eastern_time() {
        let at = Utc.with_ymd_and_hms(2006, 1, 2, 20, 4, 5).unwrap();
        assert_eq!(
            format_time(at, chrono_tz::America::New_York),
            "Mon Jan 2 15:04:05 EST 2006"
        );
    }

    #[test]
    fn daylight_saving_abbreviation() {
        let at = Utc.with_ymd_and_hms(2024, 7, 14, 16, 30, 0).unwrap();
        assert_eq!(
            format_time(at, chrono_tz::America::New_York),
            "Sun Jul 14 12:30:00 EDT 2024"
        );
    }

    #[test]
    fn tool_reports_time_field() {
        let context = test_context(|config| config.tools.timezone = chrono_tz::UTC);
        let output = GetCurrentTime {}.apply(context);
        assert!(output["time"].as_str().unwrap().contains("UTC"));
    }
}
