//! Result ordering.

use std::cmp::Ordering;

use crate::result::CanonicalResult;

/// Order results by descending `llm_score`.
///
/// Scored results come before unscored ones. The sort is stable, so equal
/// scores (and all unscored results) keep their input order.
pub fn rank_results(mut results: Vec<CanonicalResult>) -> Vec<CanonicalResult> {
    results.sort_by(|a, b| compare_scores(a.llm_score, b.llm_score));
    results
}

fn compare_scores(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Map;

    fn scored(id: &str, score: Option<f64>) -> CanonicalResult {
        match score {
            Some(score) => {
                let mut parsed = Map::new();
                parsed.insert("score".to_string(), serde_json::json!(score));
                crate::result::canonicalize(&parsed, id, id, "{}")
            }
            None => CanonicalResult::failed(id, id, "boom"),
        }
    }

    fn ids(results: &[CanonicalResult]) -> Vec<&str> {
        results.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_descending_by_score() {
        let ranked = rank_results(vec![
            scored("low", Some(0.2)),
            scored("high", Some(0.9)),
            scored("mid", Some(0.5)),
        ]);
        assert_eq!(ids(&ranked), vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_unscored_sink_to_bottom() {
        let ranked = rank_results(vec![
            scored("failed-1", None),
            scored("negative", Some(-1.0)),
            scored("failed-2", None),
            scored("zero", Some(0.0)),
        ]);
        assert_eq!(ids(&ranked), vec!["zero", "negative", "failed-1", "failed-2"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let ranked = rank_results(vec![
            scored("first", Some(0.7)),
            scored("second", Some(0.7)),
            scored("third", Some(0.7)),
        ]);
        assert_eq!(ids(&ranked), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_empty() {
        assert!(rank_results(Vec::new()).is_empty());
    }

    fn arb_scores() -> impl Strategy<Value = Vec<Option<f64>>> {
        prop::collection::vec(prop::option::of(-2.0..2.0f64), 0..40)
    }

    proptest! {
        #[test]
        fn ranking_preserves_cardinality(scores in arb_scores()) {
            let input: Vec<_> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| scored(&i.to_string(), *s))
                .collect();
            let ranked = rank_results(input);
            prop_assert_eq!(ranked.len(), scores.len());

            let mut seen: Vec<usize> = ranked.iter().map(|r| r.id.parse().unwrap()).collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..scores.len()).collect::<Vec<_>>());
        }

        #[test]
        fn ranking_is_ordered_and_stable(scores in arb_scores()) {
            let input: Vec<_> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| scored(&i.to_string(), *s))
                .collect();
            let ranked = rank_results(input);

            for pair in ranked.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                match (a.llm_score, b.llm_score) {
                    (Some(x), Some(y)) => prop_assert!(x >= y),
                    (None, Some(_)) => prop_assert!(false, "unscored before scored"),
                    _ => {}
                }
                if a.llm_score == b.llm_score {
                    let ia: usize = a.id.parse().unwrap();
                    let ib: usize = b.id.parse().unwrap();
                    prop_assert!(ia < ib, "tie broke input order");
                }
            }
        }
    }
}
