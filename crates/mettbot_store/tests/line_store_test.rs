//! Tests for the file-backed line store.

use mettbot_store::LineStore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

#[test]
fn test_append_reports_pre_write_count() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("quotes.txt");
    std::fs::write(&path, "a\nb\n").unwrap();
    let store = LineStore::new(&path);

    let existing = store.append("c\n").unwrap();

    assert_eq!(existing, 2);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\nc\n");
    assert_eq!(store.line_count().unwrap(), 3);
}

#[test]
fn test_append_creates_missing_store() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("new.txt");
    let store = LineStore::new(&path);

    assert_eq!(store.append("first\n").unwrap(), 0);
    assert_eq!(store.append("second\n").unwrap(), 1);
    assert_eq!(store.line(1).unwrap().as_deref(), Some("second"));
}

#[test]
fn test_trailing_fragment_is_not_a_line() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("metts.txt");
    std::fs::write(&path, "a\nhalf").unwrap();
    let store = LineStore::new(&path);

    assert_eq!(store.line_count().unwrap(), 1);
    assert_eq!(store.line(1).unwrap(), None);
    // The fragment is completed by the next append.
    assert_eq!(store.append("-done\n").unwrap(), 1);
    assert_eq!(store.line(1).unwrap().as_deref(), Some("half-done"));
}

#[test]
fn test_random_line_on_empty_store_is_no_content() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("empty.txt");
    std::fs::write(&path, "").unwrap();

    let err = LineStore::new(&path).random_line().unwrap_err();
    assert!(err.is_no_content());
}

#[test]
fn test_random_line_on_missing_store_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = LineStore::new(temp_dir.path().join("missing.txt"))
        .random_line()
        .unwrap_err();
    assert!(!err.is_no_content());
}

#[test]
fn test_random_line_is_uniform() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("metts.txt");
    std::fs::write(&path, "0\n1\n2\n3\n").unwrap();
    let store = LineStore::new(&path);
    let mut rng = StdRng::seed_from_u64(7);

    let trials = 4000;
    let mut hits = [0usize; 4];
    for _ in 0..trials {
        let line = store.random_line_with(&mut rng).unwrap();
        hits[line.parse::<usize>().unwrap()] += 1;
    }

    // Expected 1000 each; allow a wide band.
    for count in hits {
        assert!((800..1200).contains(&count), "skewed distribution: {:?}", hits);
    }
}

#[test]
fn test_random_line_sees_fresh_content() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("metts.txt");
    std::fs::write(&path, "old\n").unwrap();
    let store = LineStore::new(&path);
    assert_eq!(store.random_line().unwrap(), "old");

    std::fs::write(&path, "new\n").unwrap();
    assert_eq!(store.random_line().unwrap(), "new");
}
