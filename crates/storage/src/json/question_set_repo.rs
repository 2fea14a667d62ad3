use std::fs;
use std::path::PathBuf;

use log::{debug, warn};
use quiz_core::model::{QuestionContent, QuestionId, SetId};
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde::Serialize;

use super::atomic::write_atomic;
use super::mapping::{apply_content, entry_question_id, map_set};
use super::{JsonRepository, SET_EXTENSION};
use crate::repository::{LoadedSet, QuestionSetRepository, StorageError};

impl JsonRepository {
    fn set_path(&self, set_id: &SetId) -> PathBuf {
        self.sets_dir.join(set_id.as_str())
    }

    fn read_entries(&self, set_id: &SetId) -> Result<(PathBuf, Vec<Value>), StorageError> {
        let path = self.set_path(set_id);
        let raw = fs::read(&path).map_err(|e| StorageError::io(&path, e))?;
        let entries: Vec<Value> =
            serde_json::from_slice(&raw).map_err(|e| StorageError::parse(&path, e))?;
        Ok((path, entries))
    }
}

/// Pretty-print with four-space indentation, the layout authored sets use.
fn to_pretty_bytes(entries: &[Value]) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = Serializer::with_formatter(&mut out, formatter);
    entries.serialize(&mut ser)?;
    out.push(b'\n');
    Ok(out)
}

impl QuestionSetRepository for JsonRepository {
    fn list_sets(&self) -> Result<Vec<SetId>, StorageError> {
        let dir = fs::read_dir(&self.sets_dir).map_err(|e| StorageError::io(&self.sets_dir, e))?;

        let mut names = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|e| StorageError::io(&self.sets_dir, e))?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(SET_EXTENSION)
            {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                warn!("skipping question set with non UTF-8 name: {}", path.display());
                continue;
            };
            match SetId::new(name) {
                Ok(set_id) => names.push(set_id),
                Err(err) => warn!("skipping question set {}: {err}", path.display()),
            }
        }
        names.sort();

        debug!(
            "found {} question sets in {}",
            names.len(),
            self.sets_dir.display()
        );
        Ok(names)
    }

    fn load_set(&self, set_id: &SetId) -> Result<LoadedSet, StorageError> {
        let (_, entries) = self.read_entries(set_id)?;
        Ok(map_set(set_id, entries))
    }

    fn update_question(
        &self,
        set_id: &SetId,
        question_id: &QuestionId,
        content: &QuestionContent,
    ) -> Result<(), StorageError> {
        let (path, mut entries) = self.read_entries(set_id)?;

        let target = entries
            .iter_mut()
            .filter_map(Value::as_object_mut)
            .find(|entry| entry_question_id(entry).is_ok_and(|id| &id == question_id))
            .ok_or(StorageError::NotFound)?;
        apply_content(target, content);

        let bytes = to_pretty_bytes(&entries).map_err(|e| StorageError::parse(&path, e))?;
        write_atomic(&path, &bytes)?;
        debug!("rewrote question {question_id} in {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerSet, QuestionDraft};
    use serde_json::json;

    fn repo_with_set(name: &str, body: &Value) -> (tempfile::TempDir, JsonRepository, SetId) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(name), serde_json::to_vec(body).unwrap()).unwrap();
        let repo = JsonRepository::new(dir.path(), dir.path().join("stats.json"));
        (dir, repo, SetId::new(name).unwrap())
    }

    #[test]
    fn lists_json_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json", "notes.txt", "c|d.json"] {
            fs::write(dir.path().join(name), "[]").unwrap();
        }
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let repo = JsonRepository::new(dir.path(), dir.path().join("stats.json"));
        let sets: Vec<String> = repo
            .list_sets()
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(sets, ["a.json", "b.json"]);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let repo = JsonRepository::new("/definitely/not/here", "stats.json");
        assert!(matches!(repo.list_sets(), Err(StorageError::Io { .. })));
    }

    #[test]
    fn unparsable_set_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{ nope").unwrap();
        let repo = JsonRepository::new(dir.path(), dir.path().join("stats.json"));

        let err = repo.load_set(&SetId::new("broken.json").unwrap()).unwrap_err();
        assert!(matches!(err, StorageError::Parse { .. }));
    }

    #[test]
    fn update_missing_id_reports_not_found_and_keeps_file() {
        let body = json!([{"id": 1, "question": "Q", "options": ["a"], "correct_answers": ["A"]}]);
        let (dir, repo, set_id) = repo_with_set("s.json", &body);
        let before = fs::read(dir.path().join("s.json")).unwrap();

        let content = QuestionDraft {
            text: "new".into(),
            options: vec!["x".into()],
            correct_answers: AnswerSet::parse_letters("A").unwrap(),
        }
        .validate()
        .unwrap();
        let err = repo
            .update_question(&set_id, &QuestionId::new("42"), &content)
            .unwrap_err();

        assert!(matches!(err, StorageError::NotFound));
        assert_eq!(fs::read(dir.path().join("s.json")).unwrap(), before);
    }
}
