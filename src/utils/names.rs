use regex::Regex;

use crate::error::{Result, SensorError};

/// Matches `names` against regular expressions and returns the matching
/// indices and names, in the order of `names`.
///
/// Each key must match a whole name. Every key has to match at least one name,
/// otherwise the unmatched keys are reported.
pub fn resolve_matching_names<S: AsRef<str>>(
    keys: &[S],
    names: &[String],
) -> Result<(Vec<usize>, Vec<String>)> {
    let patterns = keys
        .iter()
        .map(|key| {
            let key = key.as_ref();
            Regex::new(&format!("^(?:{key})$")).map_err(|err| {
                SensorError::Configuration(format!("invalid name pattern '{key}': {err}"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut key_matched = vec![false; patterns.len()];
    let mut indices = Vec::new();
    let mut matched_names = Vec::new();

    for (index, name) in names.iter().enumerate() {
        let mut hit = false;
        for (pattern, matched) in patterns.iter().zip(key_matched.iter_mut()) {
            if pattern.is_match(name) {
                *matched = true;
                hit = true;
            }
        }
        if hit {
            indices.push(index);
            matched_names.push(name.clone());
        }
    }

    let unmatched: Vec<String> = keys
        .iter()
        .zip(&key_matched)
        .filter(|(_, &matched)| !matched)
        .map(|(key, _)| key.as_ref().to_string())
        .collect();
    if !unmatched.is_empty() {
        return Err(SensorError::UnmatchedNames(unmatched));
    }

    Ok((indices, matched_names))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bodies() -> Vec<String> {
        ["base", "LF_FOOT", "RF_FOOT", "LH_FOOT", "RH_FOOT", "LF_THIGH"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn matches_whole_names_in_body_order() {
        let (indices, names) = resolve_matching_names(&[".*_FOOT"], &bodies()).unwrap();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert_eq!(names, vec!["LF_FOOT", "RF_FOOT", "LH_FOOT", "RH_FOOT"]);

        let err = resolve_matching_names(&["LF"], &bodies()).unwrap_err();
        assert_eq!(err, SensorError::UnmatchedNames(vec!["LF".to_string()]));
    }

    #[test]
    fn multiple_keys_keep_body_order() {
        let (indices, names) = resolve_matching_names(&["LF_THIGH", "base"], &bodies()).unwrap();
        assert_eq!(indices, vec![0, 5]);
        assert_eq!(names, vec!["base", "LF_THIGH"]);
    }

    #[test]
    fn unmatched_and_invalid_keys_are_errors() {
        let err = resolve_matching_names(&["base", "tail"], &bodies()).unwrap_err();
        assert_eq!(err, SensorError::UnmatchedNames(vec!["tail".to_string()]));

        let err = resolve_matching_names(&["(unclosed"], &bodies()).unwrap_err();
        assert!(matches!(err, SensorError::Configuration(_)));
    }
}
