use std::str::FromStr;

/// Comma-separated list; blank entries are dropped.
pub fn parse_csv_var(name: &str) -> Option<Vec<String>> {
    let raw = std::env::var(name).ok()?;
    Some(
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect(),
    )
}

/// `1/true/yes/on` and `0/false/no/off`, any case.
pub fn parse_bool(raw: &str) -> Option<bool> {
    let lowered = raw.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_bool_var(name: &str) -> Option<bool> {
    string_var(name).as_deref().and_then(parse_bool)
}

/// Reads and parses `name`, ignoring unset, blank or malformed values.
pub fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    string_var(name).and_then(|raw| raw.parse().ok())
}

/// Reads `name` trimmed, treating a blank value as unset.
pub fn string_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_forms() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
