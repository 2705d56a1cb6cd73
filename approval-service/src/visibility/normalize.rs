//! Location identifier normalisation.
//!
//! Station ids are stored as "HQ", as bare numbers, or zero-padded depending on
//! which system wrote the row. Every comparison goes through these functions (or
//! their SQL twins) so that "HQ", "0", "5", "05" and "005" compare as intended.

/// Normalised id of the head-office station.
pub const HQ_STATION: &str = "0";

/// Characters stripped from both ends of an identifier. [`trim_sql`] strips the
/// same set so Postgres and in-process comparisons agree.
pub const TRIM_CHARS: [char; 4] = [' ', '\t', '\r', '\n'];

pub fn trim_id(raw: &str) -> &str {
    raw.trim_matches(&TRIM_CHARS[..])
}

/// SQL expression computing [`trim_id`] over `expr`.
pub fn trim_sql(expr: &str) -> String {
    format!("btrim({}, E' \\t\\r\\n')", expr)
}

/// "HQ" (any case) and all-zero numbers become "0"; other numbers are
/// left-padded with zeros to three digits; anything else is returned unchanged.
pub fn normalize_station(raw: &str) -> String {
    let trimmed = trim_id(raw);
    if trimmed.eq_ignore_ascii_case("hq") {
        return HQ_STATION.to_string();
    }
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let significant = trimmed.trim_start_matches('0');
        if significant.is_empty() {
            return HQ_STATION.to_string();
        }
        return format!("{:0>3}", significant);
    }
    raw.to_string()
}

pub fn normalize_department(raw: &str) -> String {
    trim_id(raw).to_string()
}

pub fn is_hq_station(raw: &str) -> bool {
    normalize_station(raw) == HQ_STATION
}

/// SQL expression computing [`normalize_station`] over `column`.
pub fn station_sql(column: &str) -> String {
    format!(
        "(CASE WHEN upper({t}) = 'HQ' THEN '0' \
         WHEN {t} ~ '^[0-9]+$' THEN \
         CASE WHEN ltrim({t}, '0') = '' THEN '0' \
         WHEN length(ltrim({t}, '0')) >= 3 THEN ltrim({t}, '0') \
         ELSE lpad(ltrim({t}, '0'), 3, '0') END \
         ELSE {c} END)",
        t = trim_sql(column),
        c = column
    )
}

/// SQL expression computing [`normalize_department`] over `column`.
pub fn department_sql(column: &str) -> String {
    trim_sql(column)
}
