//! Numeric equivalence between stated answers and symbolic results.

/// Relative comparison with an absolute floor, so values near zero and
/// large magnitudes are both handled sensibly.
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= tolerance * scale
}

/// The numeric values asserted by an answer string.
///
/// `"x = 2"` → `[2.0]`, `"x = 2 or x = -3"` → `[2.0, -3.0]`,
/// `"the answer is 4.5"` → `[4.5]`. A minus sign counts as negation only
/// when it follows `=`, `,`, `(`, a prose word boundary, or starts the
/// string; otherwise it reads as subtraction and is skipped.
pub fn answer_values(answer: &str) -> Vec<f64> {
    let chars: Vec<char> = answer.chars().collect();
    let mut values = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let starts_number = c.is_ascii_digit()
            || (c == '.' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit())
            || (c == '-'
                && i + 1 < chars.len()
                && (chars[i + 1].is_ascii_digit() || chars[i + 1] == '.')
                && sign_position(&chars, i));

        if !starts_number {
            i += 1;
            continue;
        }

        let start = i;
        if chars[i] == '-' {
            i += 1;
        }
        let mut seen_dot = false;
        while i < chars.len() {
            let d = chars[i];
            if d.is_ascii_digit() {
                i += 1;
            } else if d == '.' && !seen_dot {
                seen_dot = true;
                i += 1;
            } else {
                break;
            }
        }

        let literal: String = chars[start..i].iter().collect();
        if let Ok(value) = literal.trim_end_matches('.').parse::<f64>() {
            values.push(value);
        }
    }

    values
}

/// Whether a `-` at position `i` is a negation rather than a subtraction.
fn sign_position(chars: &[char], i: usize) -> bool {
    match chars[..i].iter().rev().find(|c| !c.is_whitespace()) {
        None => true,
        Some(prev) => matches!(prev, '=' | ',' | '(' | ':') || prev.is_ascii_alphabetic(),
    }
}

/// Whether two value sets agree as multisets under tolerance, after
/// collapsing near-duplicates on both sides (so a stated `x = 2` matches a
/// double root at 2).
pub fn values_match(a: &[f64], b: &[f64], tolerance: f64) -> bool {
    let a = dedup_sorted(a, tolerance);
    let b = dedup_sorted(b, tolerance);
    if a.len() != b.len() || a.is_empty() {
        return false;
    }
    a.iter().zip(b.iter()).all(|(x, y)| approx_eq(*x, *y, tolerance))
}

fn dedup_sorted(values: &[f64], tolerance: f64) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    let mut out: Vec<f64> = Vec::with_capacity(sorted.len());
    for v in sorted {
        if !out.last().map(|last| approx_eq(*last, v, tolerance)).unwrap_or(false) {
            out.push(v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-6;

    #[test]
    fn extracts_simple_answer() {
        assert_eq!(answer_values("x = 2"), vec![2.0]);
        assert_eq!(answer_values("the answer is 4.5"), vec![4.5]);
    }

    #[test]
    fn extracts_negative_values() {
        assert_eq!(answer_values("x = -3"), vec![-3.0]);
        assert_eq!(answer_values("roots: -1, 2"), vec![-1.0, 2.0]);
    }

    #[test]
    fn subtraction_is_not_negation() {
        // "5 - 3" states the values 5 and 3, not 5 and -3.
        assert_eq!(answer_values("5 - 3"), vec![5.0, 3.0]);
    }

    #[test]
    fn extracts_multiple_roots() {
        assert_eq!(answer_values("x = 2 or x = 3"), vec![2.0, 3.0]);
    }

    #[test]
    fn no_values_in_prose() {
        assert!(answer_values("cannot be determined").is_empty());
    }

    #[test]
    fn matches_within_tolerance() {
        assert!(values_match(&[2.0], &[2.0 + 1e-9], TOL));
        assert!(values_match(&[2.0, 3.0], &[3.0, 2.0], TOL));
        assert!(!values_match(&[2.0], &[2.1], TOL));
    }

    #[test]
    fn double_root_matches_single_stated_value() {
        assert!(values_match(&[2.0, 2.0], &[2.0], TOL));
    }

    #[test]
    fn empty_sets_do_not_match() {
        assert!(!values_match(&[], &[], TOL));
        assert!(!values_match(&[1.0], &[], TOL));
    }

    #[test]
    fn approx_eq_scales_with_magnitude() {
        assert!(approx_eq(1_000_000.0, 1_000_000.5, 1e-6));
        assert!(!approx_eq(1.0, 1.5, 1e-6));
    }
}
