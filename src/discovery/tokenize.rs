/// Splits a location string into fuzzy-matchable tokens (spec.md §4.8 step 4):
/// split on commas, strip pin-code-like digit runs of length >=3, drop state/UT
/// noise terms. Falls back to the raw string if every token drops out.
pub fn tokenize_location(raw: &str, noise_terms: &[String]) -> Vec<String> {
    let parts: Vec<String> = raw
        .split(',')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .map(strip_pincode_runs)
        .map(|p| p.trim().to_string())
        .filter(|p| !is_noise(p, noise_terms))
        .filter(|p| !p.is_empty())
        .collect();

    if parts.is_empty() {
        vec![raw.trim().to_lowercase()]
    } else {
        parts
    }
}

fn strip_pincode_runs(part: String) -> String {
    let mut out = String::new();
    let mut digit_run = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() {
            digit_run.push(c);
        } else {
            if digit_run.len() < 3 {
                out.push_str(&digit_run);
            }
            digit_run.clear();
            out.push(c);
        }
    }
    if digit_run.len() < 3 {
        out.push_str(&digit_run);
    }
    out
}

fn is_noise(token: &str, noise_terms: &[String]) -> bool {
    noise_terms.iter().any(|n| n == token)
}

/// Case-insensitive substring match used to build the disjunctive location predicate
/// (spec.md §4.8 step 5).
pub fn fuzzy_contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_pincode_and_noise_terms() {
        let noise = vec!["tamil nadu".to_string(), "india".to_string()];
        let tokens = tokenize_location("Chennai 600001, Tamil Nadu, India", &noise);
        assert_eq!(tokens, vec!["chennai".to_string()]);
    }

    #[test]
    fn falls_back_to_raw_string_when_all_tokens_drop() {
        let noise = vec!["india".to_string()];
        let tokens = tokenize_location("India", &noise);
        assert_eq!(tokens, vec!["india".to_string()]);
    }

    #[test]
    fn fuzzy_contains_is_case_insensitive() {
        assert!(fuzzy_contains("CHENNAI Central", "chennai"));
    }
}
