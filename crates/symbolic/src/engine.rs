//! The symbolic engine: expression evaluation and low-degree equation solving.

use mentor_common::{MentorError, Result, SymbolicResult};
use tracing::debug;

/// Deterministic re-evaluation of closed-form mathematics.
pub trait SymbolicEngine: Send + Sync {
    /// Evaluate a closed-form expression to a value, or solve `lhs = rhs`
    /// for its single variable when the input is an equation.
    fn evaluate(&self, expression: &str) -> Result<SymbolicResult>;
}

/// Names `meval` resolves on its own; alphabetic runs outside this set are
/// treated as variables.
const KNOWN_NAMES: &[&str] = &[
    "sqrt", "exp", "ln", "abs", "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh",
    "tanh", "floor", "ceil", "round", "signum", "max", "min", "pi", "e",
];

/// The built-in engine.
///
/// Expressions are parsed and evaluated with `meval`. Equations are reduced
/// to `p(var) = 0` and the polynomial coefficients recovered by sampling
/// `p` at fixed points; only degree ≤ 2 is supported, which covers the
/// linear and quadratic equations the pipeline cross-checks. Everything
/// else reports a symbolic error and leaves the answer unverified.
pub struct ClosedFormEngine {
    tolerance: f64,
}

impl Default for ClosedFormEngine {
    fn default() -> Self {
        Self { tolerance: 1e-9 }
    }
}

impl ClosedFormEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    fn eval_at(&self, expr: &meval::Expr, variable: &str, x: f64) -> Result<f64> {
        let mut ctx = meval::Context::new();
        ctx.var(variable, x);
        let value = expr
            .eval_with_context(&ctx)
            .map_err(|e| MentorError::Symbolic(e.to_string()))?;
        if !value.is_finite() {
            return Err(MentorError::Symbolic(format!(
                "expression is not finite at {variable} = {x}"
            )));
        }
        Ok(value)
    }

    fn solve_equation(&self, lhs: &str, rhs: &str) -> Result<SymbolicResult> {
        let prepared = format!(
            "({}) - ({})",
            insert_implicit_mul(lhs),
            insert_implicit_mul(rhs)
        );

        let variables = find_variables(&prepared);
        let variable = match variables.as_slice() {
            [] => {
                return Err(MentorError::Symbolic(
                    "equation has no variable to solve for".into(),
                ))
            }
            [v] => v.clone(),
            _ => {
                return Err(MentorError::Symbolic(format!(
                    "equation has multiple variables: {}",
                    variables.join(", ")
                )))
            }
        };

        let expr: meval::Expr = prepared
            .parse()
            .map_err(|e: meval::Error| MentorError::Symbolic(e.to_string()))?;

        // Recover p(x) = a*x^2 + b*x + c from three samples, then confirm
        // the fit at two more points to reject higher-degree input.
        let p0 = self.eval_at(&expr, &variable, 0.0)?;
        let p1 = self.eval_at(&expr, &variable, 1.0)?;
        let pm1 = self.eval_at(&expr, &variable, -1.0)?;

        let a = (p1 + pm1 - 2.0 * p0) / 2.0;
        let b = (p1 - pm1) / 2.0;
        let c = p0;

        for probe in [2.0, -3.0] {
            let actual = self.eval_at(&expr, &variable, probe)?;
            let predicted = a * probe * probe + b * probe + c;
            let scale = actual.abs().max(predicted.abs()).max(1.0);
            if (actual - predicted).abs() > self.tolerance * scale * 1e3 {
                return Err(MentorError::Symbolic(
                    "equation is not a polynomial of degree at most 2".into(),
                ));
            }
        }

        let values = roots_of(a, b, c, self.tolerance)?;
        debug!(variable = %variable, roots = ?values, "Solved equation");
        Ok(SymbolicResult::Roots {
            variable,
            values,
        })
    }
}

impl SymbolicEngine for ClosedFormEngine {
    fn evaluate(&self, expression: &str) -> Result<SymbolicResult> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(MentorError::Symbolic("empty expression".into()));
        }

        let mut sides = trimmed.split('=');
        let first = sides.next().unwrap_or_default();
        match (sides.next(), sides.next()) {
            (None, _) => {
                let prepared = insert_implicit_mul(first);
                if let Some(var) = find_variables(&prepared).first() {
                    return Err(MentorError::Symbolic(format!(
                        "free variable '{var}' in expression without an equation"
                    )));
                }
                let value: f64 = meval::eval_str(&prepared)
                    .map_err(|e| MentorError::Symbolic(e.to_string()))?;
                if !value.is_finite() {
                    return Err(MentorError::Symbolic("expression is not finite".into()));
                }
                Ok(SymbolicResult::Value { value })
            }
            (Some(second), None) => self.solve_equation(first, second),
            (Some(_), Some(_)) => Err(MentorError::Symbolic(
                "multiple '=' signs in expression".into(),
            )),
        }
    }
}

/// Real roots of `a*x^2 + b*x + c = 0`, ascending, double roots collapsed.
fn roots_of(a: f64, b: f64, c: f64, tolerance: f64) -> Result<Vec<f64>> {
    let coeff_scale = a.abs().max(b.abs()).max(c.abs()).max(1.0);
    let negligible = |v: f64| v.abs() <= tolerance * coeff_scale;

    if negligible(a) {
        if negligible(b) {
            return Err(MentorError::Symbolic(if negligible(c) {
                "equation holds for every value".into()
            } else {
                "equation has no solution".into()
            }));
        }
        return Ok(vec![-c / b]);
    }

    let disc = b * b - 4.0 * a * c;
    let disc_scale = (b * b).abs().max((4.0 * a * c).abs()).max(1.0);
    if disc.abs() <= tolerance * disc_scale {
        return Ok(vec![-b / (2.0 * a)]);
    }
    if disc < 0.0 {
        return Err(MentorError::Symbolic("equation has no real roots".into()));
    }

    let sqrt_disc = disc.sqrt();
    let mut roots = vec![(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)];
    roots.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    Ok(roots)
}

/// Insert the multiplication signs mathematical shorthand leaves out:
/// `4x` → `4*x`, `2(x+1)` → `2*(x+1)`, `(x+1)(x-1)` → `(x+1)*(x-1)`.
pub(crate) fn insert_implicit_mul(expression: &str) -> String {
    let mut out = String::with_capacity(expression.len() + 8);
    let mut prev: Option<char> = None;
    for c in expression.chars() {
        if let Some(p) = prev {
            let needs_mul = (p.is_ascii_digit() && (c.is_ascii_alphabetic() || c == '('))
                || (p == ')' && (c.is_ascii_alphanumeric() || c == '('));
            if needs_mul {
                out.push('*');
            }
        }
        out.push(c);
        if !c.is_whitespace() {
            prev = Some(c);
        }
    }
    out
}

/// Alphabetic identifiers in the expression that `meval` will not resolve,
/// i.e. the candidate variables. Sorted and deduplicated.
pub(crate) fn find_variables(expression: &str) -> Vec<String> {
    let mut variables = Vec::new();
    let mut current = String::new();
    for c in expression.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_alphabetic() || (!current.is_empty() && c.is_ascii_alphanumeric()) {
            current.push(c);
        } else if !current.is_empty() {
            let lower = current.to_lowercase();
            if !KNOWN_NAMES.contains(&lower.as_str()) && !variables.contains(&current) {
                variables.push(current.clone());
            }
            current.clear();
        }
    }
    variables.sort();
    variables
}

/// Pull a candidate closed-form expression or equation out of surrounding
/// prose, e.g. `"Solve x^2 - 4x + 4 = 0 for x"` → `"x^2 - 4x + 4 = 0"`.
///
/// Extraction is deliberately lenient; [`SymbolicEngine::evaluate`] is the
/// arbiter of whether the candidate actually parses.
pub fn extract_closed_form(text: &str) -> Option<String> {
    const ALLOWED: fn(char) -> bool = |c: char| {
        c.is_ascii_alphanumeric() || " +-*/^().".contains(c)
    };

    let eq_pos = text.find('=')?;
    if text[eq_pos + 1..].contains('=') {
        return None;
    }

    let left_start = text[..eq_pos]
        .char_indices()
        .rev()
        .find(|(_, c)| !ALLOWED(*c))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let right_end = text[eq_pos + 1..]
        .char_indices()
        .find(|(_, c)| !ALLOWED(*c))
        .map(|(i, _)| eq_pos + 1 + i)
        .unwrap_or(text.len());

    let lhs = strip_prose_words(&text[left_start..eq_pos], true);
    let rhs = strip_prose_words(&text[eq_pos + 1..right_end], false);

    let has_content =
        |s: &str| s.chars().any(|c| c.is_ascii_alphanumeric());
    if !has_content(&lhs) || !has_content(&rhs) {
        return None;
    }

    Some(format!("{} = {}", lhs.trim(), rhs.trim()))
}

/// Drop prose words (multi-letter alphabetic tokens) from around an
/// expression: on the left side keep what follows the last prose word, on
/// the right side keep what precedes the first one.
fn strip_prose_words(segment: &str, keep_suffix: bool) -> String {
    let words: Vec<&str> = segment.split_whitespace().collect();
    let is_prose = |w: &&str| w.len() > 1 && w.chars().all(|c| c.is_ascii_alphabetic());

    let kept: Vec<&str> = if keep_suffix {
        match words.iter().rposition(is_prose) {
            Some(i) => words[i + 1..].to_vec(),
            None => words,
        }
    } else {
        match words.iter().position(is_prose) {
            Some(i) => words[..i].to_vec(),
            None => words,
        }
    };
    kept.join(" ")
}
