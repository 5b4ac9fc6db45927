//! Separator auto-detection by column-count consistency over the first 100
//! rows (spec §4.2(b)).

use std::collections::HashMap;

const CANDIDATES: [char; 4] = [';', ',', '\t', '|'];

/// Pick the separator among `{;, ,, \t, |}` whose per-line occurrence count
/// is most consistent across the first 100 lines. Falls back to `,` when no
/// candidate appears at all (e.g. a single-column file).
pub fn detect_separator(text: &str) -> char {
    let lines: Vec<&str> = text.lines().take(100).collect();
    CANDIDATES
        .into_iter()
        .max_by_key(|&sep| consistency_score(&lines, sep))
        .unwrap_or(',')
}

fn consistency_score(lines: &[&str], sep: char) -> i64 {
    let counts: Vec<usize> = lines
        .iter()
        .map(|line| line.matches(sep).count())
        .filter(|&n| n > 0)
        .collect();
    if counts.is_empty() {
        return i64::MIN;
    }

    let mut tally: HashMap<usize, usize> = HashMap::new();
    for &n in &counts {
        *tally.entry(n).or_insert(0) += 1;
    }
    let (&mode, &agreement) = tally
        .iter()
        .max_by_key(|(&n, &freq)| (freq, n))
        .expect("counts is non-empty");

    // Favor both a high column count and a high fraction of lines agreeing
    // on it, so a lone stray semicolon in a comma file doesn't win.
    (agreement as i64) * 1000 + mode as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_semicolon_for_dach_export() {
        let text = "Artikel;Menge;Preis\nAB-1;5;12,50\nAB-2;3;8,00\n";
        assert_eq!(detect_separator(text), ';');
    }

    #[test]
    fn detects_comma_for_us_export() {
        let text = "sku,qty,price\nAB-1,5,12.50\nAB-2,3,8.00\n";
        assert_eq!(detect_separator(text), ',');
    }

    #[test]
    fn detects_pipe_when_dominant() {
        let text = "sku|qty|uom\nAB-1|5|ST\nAB-2|3|ST\n";
        assert_eq!(detect_separator(text), '|');
    }

    #[test]
    fn falls_back_to_comma_for_single_column() {
        let text = "onlyfield\nvalue1\nvalue2\n";
        assert_eq!(detect_separator(text), ',');
    }
}
