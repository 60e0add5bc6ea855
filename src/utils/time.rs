use chrono::Local;

/// Local wall clock as `yyyyMMddHHmmss`
pub(crate) fn now_as_compact_timestamp() -> String {
    Local::now().format("%Y%m%d%H%M%S").to_string()
}
