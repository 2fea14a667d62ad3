use rand::Rng;
use rand::seq::SliceRandom;

use quiz_core::model::{AttemptLedger, OptionOrder, Question, SetId};

/// Where a session's questions come from; kept so the same quiz can be restarted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSource {
    /// One origin set.
    Set(SetId),
    /// A user-chosen union of sets.
    Sets(Vec<SetId>),
    /// Every loaded set.
    All,
    /// Every question answered incorrectly at least once.
    Mistakes,
}

/// Pick up to `count` questions, least-seen first.
///
/// The pool is shuffled, then stable-sorted by seen count, so questions with
/// equal history come out in random order. Not reproducible between calls.
#[must_use]
pub fn select_subset(pool: Vec<Question>, count: usize, ledger: &AttemptLedger) -> Vec<Question> {
    select_subset_with_rng(pool, count, ledger, &mut rand::rng())
}

/// [`select_subset`] with a caller-provided random source.
#[must_use]
pub fn select_subset_with_rng<R: Rng + ?Sized>(
    mut pool: Vec<Question>,
    count: usize,
    ledger: &AttemptLedger,
    rng: &mut R,
) -> Vec<Question> {
    pool.shuffle(rng);
    // Must stay a stable sort: ties keep their shuffled order.
    pool.sort_by_key(|q| ledger.seen_count(q.key()));
    pool.truncate(count.min(pool.len()));
    pool
}

/// Questions with at least one incorrect attempt, in input order.
///
/// An empty result is a normal outcome, not an error.
#[must_use]
pub fn incorrect_only(all: &[Question], ledger: &AttemptLedger) -> Vec<Question> {
    if ledger.is_empty() {
        return Vec::new();
    }
    all.iter()
        .filter(|q| ledger.has_mistakes(q.key()))
        .cloned()
        .collect()
}

/// Fresh random display order for `len` options.
#[must_use]
pub fn shuffled_option_order<R: Rng + ?Sized>(len: usize, rng: &mut R) -> OptionOrder {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    OptionOrder::from_permutation(order).unwrap_or_else(|_| OptionOrder::identity(len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerSet, AttemptRecord, QuestionContent, QuestionId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::{BTreeMap, HashSet};

    fn build_question(set: &str, id: u32) -> Question {
        let content = QuestionContent::from_persisted(
            format!("Q{id}"),
            vec!["a".into(), "b".into(), "c".into()],
            AnswerSet::parse_letters("A").unwrap(),
        )
        .unwrap();
        Question::new(
            SetId::new(set).unwrap(),
            QuestionId::new(id.to_string()),
            content,
            None,
        )
    }

    fn pool(n: u32) -> Vec<Question> {
        (1..=n).map(|id| build_question("setA", id)).collect()
    }

    fn ledger(entries: &[(&str, u32, u32)]) -> AttemptLedger {
        let records: BTreeMap<String, AttemptRecord> = entries
            .iter()
            .map(|(k, c, i)| ((*k).to_owned(), AttemptRecord::new(*c, *i)))
            .collect();
        AttemptLedger::from_records(records)
    }

    fn ids(questions: &[Question]) -> Vec<String> {
        questions
            .iter()
            .map(|q| q.question_id().as_str().to_owned())
            .collect()
    }

    #[test]
    fn returns_min_of_count_and_pool_without_duplicates() {
        let ledger = ledger(&[("setA|2", 3, 1), ("setA|5", 0, 1)]);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            for count in [0, 1, 3, 8, 20] {
                let picked = select_subset_with_rng(pool(8), count, &ledger, &mut rng);
                assert_eq!(picked.len(), count.min(8));
                let unique: HashSet<_> = picked.iter().map(|q| q.key().clone()).collect();
                assert_eq!(unique.len(), picked.len());
                assert!(picked.iter().all(|q| pool(8).contains(q)));
            }
        }
    }

    #[test]
    fn distinct_seen_counts_come_out_sorted() {
        let ledger = ledger(&[
            ("setA|1", 4, 0),
            ("setA|2", 0, 3),
            ("setA|3", 1, 1),
            ("setA|4", 0, 1),
        ]);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = select_subset_with_rng(pool(5), 5, &ledger, &mut rng);
            assert_eq!(ids(&picked), ["5", "4", "3", "2", "1"]);
        }
    }

    #[test]
    fn unseen_questions_are_preferred() {
        let ledger = ledger(&[("setA|1", 1, 0), ("setA|2", 0, 1), ("setA|3", 2, 2)]);
        let picked = select_subset(pool(5), 2, &ledger);
        let mut picked_ids = ids(&picked);
        picked_ids.sort();
        assert_eq!(picked_ids, ["4", "5"]);
    }

    #[test]
    fn ties_are_broken_by_the_shuffle() {
        let empty = AttemptLedger::new();
        let orders: HashSet<Vec<String>> = (0..30)
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                ids(&select_subset_with_rng(pool(6), 6, &empty, &mut rng))
            })
            .collect();
        assert!(orders.len() > 1);
    }

    #[test]
    fn small_pool_with_large_request_returns_everything() {
        let picked = select_subset(pool(5), 20, &AttemptLedger::new());
        assert_eq!(picked.len(), 5);
    }

    #[test]
    fn incorrect_only_keeps_input_order() {
        let ledger = ledger(&[("setA|1", 0, 2), ("setA|2", 1, 0)]);
        let all = vec![build_question("setA", 1), build_question("setA", 2)];
        let mistakes = incorrect_only(&all, &ledger);
        assert_eq!(mistakes, vec![build_question("setA", 1)]);

        let ledger = ledger_from_many();
        let all = pool(5);
        assert_eq!(ids(&incorrect_only(&all, &ledger)), ["2", "4"]);
    }

    fn ledger_from_many() -> AttemptLedger {
        ledger(&[("setA|4", 0, 1), ("setA|2", 5, 1), ("setA|3", 2, 0)])
    }

    #[test]
    fn incorrect_only_on_empty_ledger_is_empty() {
        assert!(incorrect_only(&pool(3), &AttemptLedger::new()).is_empty());
    }

    #[test]
    fn shuffled_order_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(1);
        let order = shuffled_option_order(5, &mut rng);
        let mut seen: Vec<usize> = order.iter().collect();
        seen.sort_unstable();
        assert_eq!(seen, [0, 1, 2, 3, 4]);
    }
}
