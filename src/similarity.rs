//! Partial-substring similarity between two already-normalized names.

use strsim::normalized_levenshtein;

/// Whole-string similarity score in [0, 100].
pub fn ratio(a: &str, b: &str) -> u8 {
    to_score(normalized_levenshtein(a, b))
}

/// Best alignment of the shorter string against every same-length window of
/// the longer one, as a score in [0, 100].
///
/// Argument order does not matter: the shorter input is always the needle,
/// and equal-length inputs are compared whole. Either input being empty
/// scores 0.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len == 0 || b_len == 0 {
        return 0;
    }
    let (needle, hay, width) = if a_len <= b_len { (a, b, a_len) } else { (b, a, b_len) };

    let starts: Vec<usize> = hay.char_indices().map(|(i, _)| i).collect();
    let mut best = 0.0f64;
    for (n, &start) in starts.iter().enumerate() {
        let end = match starts.get(n + width) {
            Some(&end) => end,
            None if n + width == starts.len() => hay.len(),
            None => break,
        };
        let r = normalized_levenshtein(needle, &hay[start..end]);
        if r > best {
            best = r;
            if best >= 1.0 {
                break;
            }
        }
    }
    to_score(best)
}

fn to_score(r: f64) -> u8 {
    (r * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_basic() {
        assert_eq!(ratio("abc", "abc"), 100);
        assert_eq!(ratio("abc", "abd"), 67);
        assert_eq!(ratio("abc", "xyz"), 0);
    }

    #[test]
    fn contained_name_scores_full() {
        assert_eq!(partial_ratio("madrid", "real madrid"), 100);
        assert_eq!(partial_ratio("real madrid", "madrid"), 100);
        assert_eq!(partial_ratio("barcelona", "barcelona b"), 100);
    }

    #[test]
    fn near_miss_scores_high_but_not_full() {
        let s = partial_ratio("barcelono", "fc barcelona");
        assert_eq!(s, 89);
        assert_eq!(partial_ratio("liverpol", "liverpool"), 88);
    }

    #[test]
    fn windows_step_over_multibyte_chars() {
        assert_eq!(partial_ratio("atletico", "club atlético de madrid"), 88);
        assert_eq!(partial_ratio("münchen", "bayern münchen"), 100);
    }

    #[test]
    fn unrelated_names_score_low() {
        assert!(partial_ratio("zzqx", "liverpool") < 50);
    }

    #[test]
    fn symmetric() {
        for (a, b) in [
            ("sevilla", "sevilla atletico"),
            ("betis", "real betis"),
            ("getafe", "girona"),
            ("osasuna", "osasuna"),
        ] {
            assert_eq!(partial_ratio(a, b), partial_ratio(b, a));
        }
    }

    #[test]
    fn empty_scores_zero() {
        assert_eq!(partial_ratio("", "milan"), 0);
        assert_eq!(partial_ratio("milan", ""), 0);
        assert_eq!(partial_ratio("", ""), 0);
    }
}
