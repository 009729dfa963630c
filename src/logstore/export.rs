//! CSV export of log entries

use super::model::LogEntry;
use chrono::SecondsFormat;

pub const CSV_HEADER: &str = "id,timestamp,level,service_name,message,trace_id,tags,user_id,\
ip_address,request_method,request_url,response_time";

/// Serialize entries as CSV with a header row
///
/// Only `message` is quoted (inner quotes doubled). Tags are joined with
/// `;`. An empty slice yields an empty string rather than a bare header.
pub fn to_csv(entries: &[LogEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(CSV_HEADER.to_string());

    for entry in entries {
        let fields = [
            entry.id.to_string(),
            entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            entry.level.to_string(),
            entry.service_name.clone(),
            quote(&entry.message),
            entry.trace_id.clone().unwrap_or_default(),
            entry.tags.as_ref().map(|tags| tags.join(";")).unwrap_or_default(),
            entry.user_id.clone().unwrap_or_default(),
            entry.ip_address.clone().unwrap_or_default(),
            entry.request_method.clone().unwrap_or_default(),
            entry.request_url.clone().unwrap_or_default(),
            entry
                .response_time
                .map(|ms| ms.to_string())
                .unwrap_or_default(),
        ];
        lines.push(fields.join(","));
    }

    lines.join("\n")
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
