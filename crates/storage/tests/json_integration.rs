use std::fs;

use quiz_core::model::{AnswerSet, AttemptLedger, AttemptRecord, QuestionDraft, QuestionId};
use serde_json::{Value, json};
use storage::json::JsonRepository;
use storage::repository::{LedgerRepository, QuestionSetRepository};

fn three_question_set() -> Value {
    json!([
        {"chapitre": 1, "id": 1, "question": "Premier", "options": ["A. un", "B. deux"], "correct_answers": ["A"]},
        {"chapitre": 1, "id": 2, "question": "Deuxième", "options": ["A. un", "B. deux", "C. trois"], "correct_answers": ["B", "C"]},
        {"chapitre": 1, "id": 3, "question": "Troisième", "options": ["A. un"], "correct_answers": ["A"]}
    ])
}

#[test]
fn update_rewrites_only_the_target_question() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Pharma.json");
    fs::write(&path, serde_json::to_vec_pretty(&three_question_set()).unwrap()).unwrap();
    let repo = JsonRepository::new(dir.path(), dir.path().join("stats.json"));
    let set_id = repo.list_sets().unwrap().remove(0);

    let content = QuestionDraft {
        text: "Deuxième (corrigée)".into(),
        options: vec!["A. un".into(), "B. deux".into()],
        correct_answers: AnswerSet::parse_letters("A").unwrap(),
    }
    .validate()
    .unwrap();
    repo.update_question(&set_id, &QuestionId::new("2"), &content)
        .unwrap();

    let rewritten: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    let original = three_question_set();
    assert_eq!(rewritten[0], original[0]);
    assert_eq!(rewritten[2], original[2]);
    assert_eq!(
        rewritten[1],
        json!({"chapitre": 1, "id": 2, "question": "Deuxième (corrigée)", "options": ["A. un", "B. deux"], "correct_answers": ["A"]})
    );

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\n    {\n        \"chapitre\": 1,"));
    assert!(raw.contains("Deuxième (corrigée)"), "non-ASCII text is written verbatim");

    let reloaded = repo.load_set(&set_id).unwrap();
    assert_eq!(reloaded.questions.len(), 3);
    assert_eq!(reloaded.questions[1].text(), "Deuxième (corrigée)");
}

#[test]
fn ledger_survives_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonRepository::new(dir.path(), dir.path().join("question_stats.json"));

    let mut ledger = repo.load_ledger().unwrap().unwrap_or_default();
    assert!(ledger.is_empty());
    ledger.record("setA|3", true);
    repo.save_ledger(&ledger).unwrap();

    let reloaded = repo.load_ledger().unwrap().unwrap();
    assert_eq!(reloaded.get_raw("setA|3"), Some(&AttemptRecord::new(1, 0)));
    assert_eq!(reloaded.len(), 1);

    let mut next = AttemptLedger::from_records(reloaded.records().clone());
    next.record("setA|3", false);
    repo.save_ledger(&next).unwrap();
    assert_eq!(
        repo.load_ledger().unwrap().unwrap().get_raw("setA|3"),
        Some(&AttemptRecord::new(1, 1))
    );
}
