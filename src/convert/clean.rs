//! Model response cleanup
//!
//! Best-effort removal of markdown fences and leading commentary so that
//! only SQL remains. Not a parser.

/// Label the model sometimes puts in front of the SQL
pub const SNOWFLAKE_DDL_MARKER: &str = "Snowflake DDL:";

const SQL_FENCE: &str = "```sql";
const FENCE: &str = "```";

/// Strip formatting artifacts and explanatory prose from a model response
///
/// Removes every `` ```sql `` and `` ``` `` marker and trims. If the text then
/// contains [`SNOWFLAKE_DDL_MARKER`], only the text after the first marker
/// (up to any second marker) is kept. Never fails; `None` and empty input
/// clean to `""`. Idempotent.
pub fn clean_response(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        return String::new();
    };

    let stripped = raw.replace(SQL_FENCE, "").replace(FENCE, "");
    let cleaned = stripped.trim();

    match cleaned.split(SNOWFLAKE_DDL_MARKER).nth(1) {
        Some(after_marker) => after_marker.trim().to_string(),
        None => cleaned.to_string(),
    }
}
