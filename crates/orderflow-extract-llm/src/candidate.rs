//! Heuristic line-shaped row counting, used only to bound the line-count
//! guard (spec §4.3) — a coarse proxy, not a real table parse.

/// Count lines that look like an order line: at least 3 whitespace-separated
/// tokens, at least one of which parses as a number. Deliberately loose —
/// its only job is to give the line-count guard an order-of-magnitude upper
/// bound on how many lines a document could plausibly contain.
pub fn count_candidate_lines(text: &str) -> usize {
    text.lines()
        .filter(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            tokens.len() >= 3 && tokens.iter().any(|t| looks_numeric(t))
        })
        .count()
}

fn looks_numeric(token: &str) -> bool {
    let cleaned: String = token.chars().filter(|c| *c != ',' && *c != '.').collect();
    !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_table_like_lines() {
        let text = "Thank you for your order.\nAB-1  Bolt M4  10  ST  0.15\nAB-2  Nut M4  20  ST  0.05\n";
        assert_eq!(count_candidate_lines(text), 2);
    }

    #[test]
    fn prose_only_counts_zero() {
        let text = "Please find attached our purchase order for review.\n";
        assert_eq!(count_candidate_lines(text), 0);
    }
}
