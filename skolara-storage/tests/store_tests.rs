use skolara_storage::{HomeDotfiles, JsonFileStore, KeyValueStore, MemoryStore};

// ── MemoryStore ──────────────────────────────────────────────────

#[test]
fn memory_set_get_roundtrip() {
    let store = MemoryStore::new();
    assert!(store.set("licensing", "hwid", "abc123"));
    assert_eq!(store.get("licensing", "hwid").as_deref(), Some("abc123"));
}

#[test]
fn memory_get_absent_is_none() {
    let store = MemoryStore::new();
    assert!(store.get("licensing", "nope").is_none());
}

#[test]
fn memory_scopes_are_independent() {
    let store = MemoryStore::new();
    store.set("a", "k", "1");
    store.set("b", "k", "2");
    assert_eq!(store.get("a", "k").as_deref(), Some("1"));
    assert_eq!(store.get("b", "k").as_deref(), Some("2"));
}

#[test]
fn memory_remove() {
    let store = MemoryStore::new();
    store.set("s", "k", "v");
    store.remove("s", "k");
    assert!(store.get("s", "k").is_none());
}

#[test]
fn memory_clear_scope() {
    let store = MemoryStore::new();
    store.set("s", "k1", "v1");
    store.set("s", "k2", "v2");
    store.set("other", "k", "v");
    store.clear_scope("s");
    assert!(store.get("s", "k1").is_none());
    assert!(store.get("s", "k2").is_none());
    assert_eq!(store.get("other", "k").as_deref(), Some("v"));
}

// ── JsonFileStore ────────────────────────────────────────────────

#[test]
fn json_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    assert!(store.set("licensing", "key", "value"));
    assert_eq!(store.get("licensing", "key").as_deref(), Some("value"));
}

#[test]
fn json_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.set("licensing", "key", "persisted");
    }
    let store = JsonFileStore::open(dir.path()).unwrap();
    assert_eq!(store.get("licensing", "key").as_deref(), Some("persisted"));
}

#[test]
fn json_file_remove() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    store.set("s", "k", "v");
    store.remove("s", "k");
    assert!(store.get("s", "k").is_none());
}

#[test]
fn json_file_corrupt_scope_reads_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    store.set("s", "k", "v");
    std::fs::write(dir.path().join("s.json"), "not json {{{").unwrap();
    assert!(store.get("s", "k").is_none());
}

#[test]
fn json_file_corrupt_scope_recovers_on_write() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    std::fs::write(dir.path().join("s.json"), "not json").unwrap();
    assert!(store.set("s", "k", "v"));
    assert_eq!(store.get("s", "k").as_deref(), Some("v"));
}

#[test]
fn json_file_scope_name_sanitized() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    assert!(store.set("../escape", "k", "v"));
    assert_eq!(store.get("../escape", "k").as_deref(), Some("v"));
    // The file must be inside the data directory.
    assert!(!dir.path().parent().unwrap().join("escape.json").exists());
}

// ── HomeDotfiles ─────────────────────────────────────────────────

#[test]
fn dotfile_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let files = HomeDotfiles::open_in(dir.path(), "skolara");
    assert!(files.write("device", "hwid-value"));
    assert_eq!(files.read("device").as_deref(), Some("hwid-value"));
    assert!(dir.path().join(".skolara_device").exists());
}

#[test]
fn dotfile_read_absent_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let files = HomeDotfiles::open_in(dir.path(), "skolara");
    assert!(files.read("missing").is_none());
}

#[test]
fn dotfile_read_trims_whitespace() {
    let dir = tempfile::tempdir().unwrap();
    let files = HomeDotfiles::open_in(dir.path(), "skolara");
    std::fs::write(dir.path().join(".skolara_device"), "  padded \n").unwrap();
    assert_eq!(files.read("device").as_deref(), Some("padded"));
}

#[test]
fn dotfile_empty_reads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let files = HomeDotfiles::open_in(dir.path(), "skolara");
    std::fs::write(dir.path().join(".skolara_device"), "  \n").unwrap();
    assert!(files.read("device").is_none());
}

#[test]
fn dotfile_remove() {
    let dir = tempfile::tempdir().unwrap();
    let files = HomeDotfiles::open_in(dir.path(), "skolara");
    files.write("device", "v");
    files.remove("device");
    assert!(files.read("device").is_none());
    // Removing again is not an error.
    files.remove("device");
}
