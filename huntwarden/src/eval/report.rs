// huntwarden/src/eval/report.rs
//
// ROC AUC and markdown/JSON output for the eval framework.

use std::fmt::Write as _;

use serde_json::{json, Value};

use super::EvalResult;

/// Exact ROC AUC via the rank-sum statistic: the probability that a random
/// positive outranks a random negative, ties counting half. 0.5 when either
/// class is empty.
pub fn auc_roc(result: &EvalResult) -> f64 {
    let pos: Vec<f64> = result.scored.iter().filter(|(_, y)| *y).map(|(s, _)| *s).collect();
    let neg: Vec<f64> = result.scored.iter().filter(|(_, y)| !*y).map(|(s, _)| *s).collect();
    if pos.is_empty() || neg.is_empty() {
        return 0.5;
    }
    let mut wins = 0.0;
    for p in &pos {
        for n in &neg {
            if p > n       { wins += 1.0; }
            else if p == n { wins += 0.5; }
        }
    }
    wins / (pos.len() * neg.len()) as f64
}

pub fn markdown(result: &EvalResult) -> String {
    let mut out = String::new();
    let g = &result.global;

    let _ = writeln!(out, "# Huntwarden Evaluation Report\n");
    let _ = writeln!(
        out,
        "**Records**: {}  **Positive**: {}  **Negative**: {}  **Threshold**: {:.3}\n",
        result.n_records, result.n_positive, result.n_negative, result.threshold
    );
    let _ = writeln!(out, "| Metric    | Value  |");
    let _ = writeln!(out, "|-----------|--------|");
    let _ = writeln!(out, "| Precision | {:.4} |", g.precision());
    let _ = writeln!(out, "| Recall    | {:.4} |", g.recall());
    let _ = writeln!(out, "| F1        | {:.4} |", g.f1());
    let _ = writeln!(out, "| FPR       | {:.4} |", g.fpr());
    let _ = writeln!(out, "| AUC-ROC   | {:.4} |", auc_roc(result));

    let _ = writeln!(out, "\n### Per-Pattern Performance\n");
    let _ = writeln!(out, "| Pattern | P | R | F1 | FPR |");
    let _ = writeln!(out, "|---------|---|---|----|-----|");
    let mut rows: Vec<_> = result.per_pattern.iter().collect();
    rows.sort_by(|a, b| b.1.f1().total_cmp(&a.1.f1()));
    for (pattern, m) in rows {
        let _ = writeln!(out, "| {:22} | {:.3} | {:.3} | {:.3} | {:.4} |",
            pattern, m.precision(), m.recall(), m.f1(), m.fpr());
    }

    let _ = writeln!(out, "\n### Risk Distribution\n");
    let n = result.n_records.max(1) as f64;
    for (lower, count) in result.histogram() {
        let bar = "#".repeat((count as f64 / n * 60.0) as usize);
        let _ = writeln!(out, "{:.1}-{:.1} | {:5} | {}", lower, lower + 0.1, count, bar);
    }
    out
}

pub fn to_json(result: &EvalResult) -> Value {
    let per_pattern: serde_json::Map<String, Value> = result.per_pattern.iter()
        .map(|(k, m)| (k.clone(), json!({
            "confusion": m,
            "precision": m.precision(),
            "recall":    m.recall(),
            "f1":        m.f1(),
            "fpr":       m.fpr(),
        })))
        .collect();

    json!({
        "n_records":   result.n_records,
        "n_positive":  result.n_positive,
        "n_negative":  result.n_negative,
        "threshold":   result.threshold,
        "precision":   result.global.precision(),
        "recall":      result.global.recall(),
        "f1":          result.global.f1(),
        "fpr":         result.global.fpr(),
        "auc_roc":     auc_roc(result),
        "per_pattern": per_pattern,
        "risk_levels": result.risk_levels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Confusion;
    use std::collections::BTreeMap;

    fn result(scored: Vec<(f64, bool)>) -> EvalResult {
        let n_positive = scored.iter().filter(|(_, y)| *y).count();
        EvalResult {
            n_records:   scored.len(),
            n_positive,
            n_negative:  scored.len() - n_positive,
            threshold:   0.5,
            global:      Confusion { tp: 1, fp: 0, tn: 1, fn_: 0 },
            per_pattern: BTreeMap::from([("speed_hacking".to_string(), Confusion { tp: 1, fp: 0, tn: 1, fn_: 0 })]),
            risk_levels: BTreeMap::new(),
            scored,
        }
    }

    #[test]
    fn auc_separates_perfect_and_tied_rankings() {
        assert_eq!(auc_roc(&result(vec![(0.9, true), (0.2, false)])), 1.0);
        assert_eq!(auc_roc(&result(vec![(0.1, true), (0.8, false)])), 0.0);
        assert_eq!(auc_roc(&result(vec![(0.5, true), (0.5, false)])), 0.5);
        assert_eq!(auc_roc(&result(vec![(0.5, true)])), 0.5);
    }

    #[test]
    fn reports_carry_pattern_rows() {
        let r = result(vec![(0.9, true), (0.2, false)]);
        let md = markdown(&r);
        assert!(md.starts_with("# Huntwarden Evaluation Report"));
        assert!(md.contains("| speed_hacking"));

        let js = to_json(&r);
        assert_eq!(js["n_records"], 2);
        assert_eq!(js["per_pattern"]["speed_hacking"]["confusion"]["fn"], 0);
        assert_eq!(js["auc_roc"], 1.0);
    }
}
