use quiz_core::model::{
    AnswerLabel, AnswerSet, Question, QuestionContent, QuestionId, SetId,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::repository::{LoadedSet, RecordError, SkippedQuestion};

pub(crate) const FIELD_ID: &str = "id";
pub(crate) const FIELD_QUESTION: &str = "question";
pub(crate) const FIELD_OPTIONS: &str = "options";
pub(crate) const FIELD_CORRECT: &str = "correct_answers";

/// Persisted shape of one question entry.
#[derive(Debug, Deserialize)]
struct QuestionRecord {
    #[serde(default)]
    id: Option<Value>,
    question: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_answers: Vec<String>,
    #[serde(default, alias = "chapter")]
    chapitre: Option<Value>,
}

/// String form of a JSON scalar id. `None` for absent or `null`.
pub(crate) fn scalar_to_string(value: Option<&Value>) -> Result<Option<String>, RecordError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Array(_) | Value::Object(_)) => Err(RecordError::NonScalarId),
    }
}

/// Id of a raw entry as used for matching, with the missing-id default applied.
pub(crate) fn entry_question_id(entry: &Map<String, Value>) -> Result<QuestionId, RecordError> {
    scalar_to_string(entry.get(FIELD_ID)).map(QuestionId::or_missing)
}

fn map_record(set_id: &SetId, raw: Value) -> Result<Question, RecordError> {
    let record: QuestionRecord =
        serde_json::from_value(raw).map_err(|e| RecordError::Malformed(e.to_string()))?;

    let question_id = QuestionId::or_missing(scalar_to_string(record.id.as_ref())?);
    let correct = record
        .correct_answers
        .iter()
        .map(|s| s.parse::<AnswerLabel>())
        .collect::<Result<AnswerSet, _>>()?;
    let content = QuestionContent::from_persisted(record.question, record.options, correct)?;
    let chapter = scalar_to_string(record.chapitre.as_ref()).unwrap_or(None);

    Ok(Question::new(set_id.clone(), question_id, content, chapter))
}

/// Map a decoded set file into questions, skipping entries that break invariants.
pub(crate) fn map_set(set_id: &SetId, entries: Vec<Value>) -> LoadedSet {
    let mut loaded = LoadedSet::default();
    for (position, raw) in entries.into_iter().enumerate() {
        let id = raw
            .as_object()
            .and_then(|obj| scalar_to_string(obj.get(FIELD_ID)).ok().flatten());
        match map_record(set_id, raw) {
            Ok(question) => loaded.questions.push(question),
            Err(error) => loaded.skipped.push(SkippedQuestion {
                position,
                id,
                error,
            }),
        }
    }
    loaded
}

/// Overwrite the three editable fields of `entry` in place, keeping field order and extras.
pub(crate) fn apply_content(entry: &mut Map<String, Value>, content: &QuestionContent) {
    entry.insert(
        FIELD_QUESTION.to_owned(),
        Value::String(content.text().to_owned()),
    );
    entry.insert(
        FIELD_OPTIONS.to_owned(),
        Value::Array(
            content
                .options()
                .iter()
                .map(|o| Value::String(o.clone()))
                .collect(),
        ),
    );
    entry.insert(
        FIELD_CORRECT.to_owned(),
        Value::Array(
            content
                .correct_answers()
                .iter()
                .map(|l| Value::String(l.to_string()))
                .collect(),
        ),
    );
}
