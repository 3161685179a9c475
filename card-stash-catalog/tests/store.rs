use card_stash_catalog::{CatalogStore, SaveOutcome, StoreError, backup_path, scan_missing};
use card_stash_core::RecordName;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PIKACHU: &str = r#"{
  "data": [
    {
      "id": "base1-58",
      "name": "Pikachu",
      "images": {
        "small": "https://images.example.com/base1/58.png",
        "large": "https://images.example.com/base1/58_hires.png"
      }
    },
    {
      "id": "base1-60",
      "name": "Pikachu",
      "images": { "small": "" }
    }
  ]
}
"#;

fn write_doc(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn store_with(docs: &[(&str, &str)]) -> (TempDir, CatalogStore) {
    let tmp = TempDir::new().unwrap();
    for (name, content) in docs {
        write_doc(tmp.path(), name, content);
    }
    let store = CatalogStore::open(tmp.path()).unwrap();
    (tmp, store)
}

#[test]
fn open_rejects_missing_directory() {
    let tmp = TempDir::new().unwrap();
    let result = CatalogStore::open(tmp.path().join("nope"));
    assert!(matches!(result, Err(StoreError::DirNotFound(_))));
}

#[test]
fn list_is_sorted_and_ignores_other_files() {
    let (tmp, store) = store_with(&[
        ("raichu.json", "[]"),
        ("Pikachu.json", "[]"),
        ("notes.txt", "hello"),
    ]);
    write_doc(tmp.path(), "pikachu.json.bak", "[]");

    let names: Vec<String> = store.list().unwrap().iter().map(|n| n.to_string()).collect();
    assert_eq!(names, vec!["pikachu", "raichu"]);
}

#[test]
fn load_is_case_insensitive() {
    let (_tmp, store) = store_with(&[("Pikachu.json", PIKACHU)]);
    let record = store.load(&RecordName::new("PIKACHU")).unwrap();
    assert_eq!(record.cards().len(), 2);
    assert!(record.path().ends_with("Pikachu.json"));
}

#[test]
fn load_missing_record_is_not_found() {
    let (_tmp, store) = store_with(&[("pikachu.json", PIKACHU)]);
    let result = store.load(&RecordName::new("mew"));
    assert!(matches!(result, Err(StoreError::NotFound(name)) if name == "mew"));
}

#[test]
fn load_reports_invalid_documents() {
    let (_tmp, store) = store_with(&[("broken.json", "{\"data\": [")]);
    let result = store.load(&RecordName::new("broken"));
    assert!(matches!(result, Err(StoreError::Document { .. })));
}

#[test]
fn unchanged_record_is_not_written() {
    let (tmp, store) = store_with(&[("pikachu.json", PIKACHU)]);
    let path = tmp.path().join("pikachu.json");
    let before = fs::metadata(&path).unwrap().modified().unwrap();

    let mut record = store.load(&RecordName::new("pikachu")).unwrap();
    let outcome = store.save(&mut record).unwrap();

    assert_eq!(outcome, SaveOutcome::Unchanged);
    assert!(!backup_path(&path).exists());
    assert_eq!(fs::read_to_string(&path).unwrap(), PIKACHU);
    assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
}

#[test]
fn first_save_creates_backup_once() {
    let (tmp, store) = store_with(&[("pikachu.json", PIKACHU)]);
    let path = tmp.path().join("pikachu.json");
    let backup = backup_path(&path);

    let mut record = store.load(&RecordName::new("pikachu")).unwrap();
    record.set_image(0, "images/small/base1-58_small.png", Some("https://images.example.com/base1/58.png"));
    let outcome = store.save(&mut record).unwrap();
    assert_eq!(outcome, SaveOutcome::Written { backup_created: true });
    assert!(!record.is_dirty());
    assert_eq!(fs::read_to_string(&backup).unwrap(), PIKACHU);

    record.set_image(1, "images/small/_placeholder.jpg", None);
    let outcome = store.save(&mut record).unwrap();
    assert_eq!(outcome, SaveOutcome::Written { backup_created: false });
    assert_eq!(fs::read_to_string(&backup).unwrap(), PIKACHU, "backup keeps the original");

    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["data"][0]["images"]["small"], "images/small/base1-58_small.png");
    assert_eq!(saved["data"][0]["images"]["large"], "images/small/base1-58_small.png");
    assert_eq!(saved["data"][1]["images"]["small"], "images/small/_placeholder.jpg");
    assert!(!tmp.path().join("pikachu.json.tmp").exists());
}

#[test]
fn saved_document_uses_two_space_indent() {
    let (tmp, store) = store_with(&[("pikachu.json", PIKACHU)]);
    let mut record = store.load(&RecordName::new("pikachu")).unwrap();
    record.set_image(1, "images/small/x.png", None);
    store.save(&mut record).unwrap();

    let text = fs::read_to_string(tmp.path().join("pikachu.json")).unwrap();
    assert!(text.starts_with("{\n  \"data\": [\n    {"));
    assert!(text.ends_with("}\n"));
}

#[test]
fn scan_missing_lists_cards_without_small_image() {
    let (_tmp, store) = store_with(&[
        ("pikachu.json", PIKACHU),
        ("raichu.json", r#"[{"id": "r1", "images": {"small": "https://x.example/r1.png"}}]"#),
        ("broken.json", "not json"),
    ]);

    let missing = scan_missing(&store, None).unwrap();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].record.as_str(), "pikachu");
    assert_eq!(missing[0].total_cards, 2);
    assert_eq!(missing[0].cards.len(), 1);
    assert_eq!(missing[0].cards[0].index, 1);
    assert_eq!(missing[0].cards[0].id.as_deref(), Some("base1-60"));
}

#[test]
fn scan_missing_with_unknown_filter_fails() {
    let (_tmp, store) = store_with(&[("pikachu.json", PIKACHU)]);
    let result = scan_missing(&store, Some(&RecordName::new("mew")));
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}
