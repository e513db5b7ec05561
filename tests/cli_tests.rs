use assert_cmd::Command;
use dict2deck::config::AppConfig;
use dict2deck::db::DbConnection;
use dict2deck::models::Note;
use dict2deck::notes::{add_normal_template, get_or_create_deck, get_or_create_note_type, model_name};
use dict2deck::repo::NoteRepo;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Temporary HOME holding the data directory
fn setup_test_env() -> (TempDir, std::sync::MutexGuard<'static, ()>) {
    let guard = test_env::lock_test_env();
    let temp_dir = TempDir::new().unwrap();
    (temp_dir, guard)
}

fn data_dir(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join(".dict2deck")
}

fn get_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dict2deck").unwrap();
    cmd.env("HOME", temp_dir.path());
    cmd.env("RUST_LOG", "off");
    cmd
}

fn set_config(temp_dir: &TempDir, key: &str, value: &str) {
    get_cmd(temp_dir)
        .args(["config", "set", key, value])
        .assert()
        .success();
}

fn write_word_list(temp_dir: &TempDir, content: &str) -> PathBuf {
    let path = temp_dir.path().join("words.tsv");
    fs::write(&path, content).unwrap();
    path
}

/// Note type with its Normal template, deck "English" and one note per
/// `(term, pronunciation)`
fn seed_collection(temp_dir: &TempDir, notes: &[(&str, &str)]) {
    let conn = DbConnection::connect_at(&data_dir(temp_dir).join("collection.db")).unwrap();
    let config = AppConfig::default();
    let (mut note_type, _, _) =
        get_or_create_note_type(&conn, model_name(config.enable_context), !config.enable_context, false).unwrap();
    add_normal_template(&conn, &mut note_type, &config.field_group()).unwrap();
    let deck = get_or_create_deck(&conn, "English", &mut note_type).unwrap();

    for (term, pronunciation) in notes {
        let mut note = Note::new(&note_type, deck.id.unwrap());
        note.set("term", *term);
        note.set("pronunciation", *pronunciation);
        NoteRepo::add(&conn, &note).unwrap();
    }
}

#[test]
fn test_version_flag() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_command_is_user_error() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).arg("frobnicate").assert().failure().code(1);
}

#[test]
fn test_config_path_default_and_rc_override() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".dict2deck").and(predicate::str::contains("config.json")));

    let custom = temp_dir.path().join("custom-data");
    fs::create_dir_all(data_dir(&temp_dir)).unwrap();
    fs::write(
        data_dir(&temp_dir).join("rc"),
        format!("data.location={}\n", custom.display()),
    )
    .unwrap();
    get_cmd(&temp_dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom-data"));
}

#[test]
fn test_config_set_and_show() {
    let (temp_dir, _guard) = setup_test_env();
    set_config(&temp_dir, "deck", "English");
    set_config(&temp_dir, "aporaApiToken", "tok-123");
    set_config(&temp_dir, "enableContext", "true");

    let saved = fs::read_to_string(data_dir(&temp_dir).join("config.json")).unwrap();
    let config = AppConfig::from_json(&saved).unwrap();
    assert_eq!(config.deck, "English");
    assert_eq!(config.apora_api_token, "tok-123");
    assert!(config.enable_context);

    get_cmd(&temp_dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("English"))
        .stdout(predicate::str::contains("tok-123").not());

    get_cmd(&temp_dir)
        .args(["config", "show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"deck\": \"English\""))
        .stdout(predicate::str::contains("\"enableContext\": true"));
}

#[test]
fn test_config_set_rejects_bad_input() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir)
        .args(["config", "set", "noSuchKey", "1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unknown config key"));

    get_cmd(&temp_dir)
        .args(["config", "set", "selectedDict", "5"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid dictionary index"));

    assert!(!data_dir(&temp_dir).join("config.json").exists());
}

#[test]
fn test_decks_and_dicts() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir)
        .arg("decks")
        .assert()
        .success()
        .stdout(predicate::str::contains("No decks."));

    seed_collection(&temp_dir, &[]);
    get_cmd(&temp_dir)
        .arg("decks")
        .assert()
        .success()
        .stdout(predicate::str::contains("English"));

    get_cmd(&temp_dir)
        .arg("dicts")
        .assert()
        .success()
        .stdout(predicate::str::contains("有道词典"))
        .stdout(predicate::str::contains("欧陆词典"))
        .stdout(predicate::str::contains("Apora API"));
}

#[test]
fn test_login_without_cookie_points_to_login_page() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir)
        .arg("login")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Not logged in"))
        .stderr(predicate::str::contains("youdao.com"));

    get_cmd(&temp_dir)
        .arg("groups")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("dict2deck login"));
}

#[test]
fn test_sync_requires_deck() {
    let (temp_dir, _guard) = setup_test_env();
    let words = write_word_list(&temp_dir, "apple\n");
    get_cmd(&temp_dir)
        .args(["sync", "--dry-run", "--from-file"])
        .arg(&words)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No deck configured"));
}

#[test]
fn test_sync_missing_word_list() {
    let (temp_dir, _guard) = setup_test_env();
    set_config(&temp_dir, "deck", "English");
    get_cmd(&temp_dir)
        .args(["sync", "--from-file", "nope.tsv"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Word list not found"));
}

#[test]
fn test_sync_dry_run_diffs_case_insensitively() {
    let (temp_dir, _guard) = setup_test_env();
    set_config(&temp_dir, "deck", "English");
    seed_collection(&temp_dir, &[("plum", ""), ("fig", "")]);
    let words = write_word_list(&temp_dir, "apple\tpomme\nPLUM\tprune\n\napple\n");

    get_cmd(&temp_dir)
        .args(["sync", "--dry-run", "--from-file"])
        .arg(&words)
        .assert()
        .success()
        .stdout(predicate::str::contains("New words (1):\napple"))
        .stdout(predicate::str::contains("Words to delete (1):\nfig"))
        .stdout(predicate::str::contains("Added:").not());
}

#[test]
fn test_sync_only_filters_new_words() {
    let (temp_dir, _guard) = setup_test_env();
    set_config(&temp_dir, "deck", "English");
    let words = write_word_list(&temp_dir, "apple\npear\nfig\n");

    get_cmd(&temp_dir)
        .args(["sync", "--dry-run", "--only", "Pear", "--from-file"])
        .arg(&words)
        .assert()
        .success()
        .stdout(predicate::str::contains("New words (1):\npear"));
}

#[test]
fn test_sync_without_token_is_user_error() {
    let (temp_dir, _guard) = setup_test_env();
    set_config(&temp_dir, "deck", "English");
    let words = write_word_list(&temp_dir, "apple\n");

    get_cmd(&temp_dir)
        .args(["sync", "--from-file"])
        .arg(&words)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("API token is not set"));
}

#[test]
fn test_sync_with_nothing_new_reports_zero() {
    let (temp_dir, _guard) = setup_test_env();
    set_config(&temp_dir, "deck", "English");
    seed_collection(&temp_dir, &[("apple", "")]);
    let words = write_word_list(&temp_dir, "Apple\n");

    get_cmd(&temp_dir)
        .args(["sync", "--from-file"])
        .arg(&words)
        .assert()
        .success()
        .stdout(predicate::str::contains("Added: 0, Deleted: 0"));
}

#[test]
fn test_sync_delete_removes_stale_notes() {
    let (temp_dir, _guard) = setup_test_env();
    set_config(&temp_dir, "deck", "English");
    seed_collection(&temp_dir, &[("apple", ""), ("fig", ""), ("Plum", "")]);
    let words = write_word_list(&temp_dir, "apple\n");

    get_cmd(&temp_dir)
        .args(["sync", "--delete", "-y", "--from-file"])
        .arg(&words)
        .assert()
        .success()
        .stdout(predicate::str::contains("Added: 0, Deleted: 2"));

    get_cmd(&temp_dir)
        .args(["sync", "--dry-run", "--from-file"])
        .arg(&words)
        .assert()
        .success()
        .stdout(predicate::str::contains("Words to delete (0):"));
}

#[test]
fn test_sync_delete_declined_without_confirmation() {
    let (temp_dir, _guard) = setup_test_env();
    set_config(&temp_dir, "deck", "English");
    seed_collection(&temp_dir, &[("apple", ""), ("fig", "")]);
    let words = write_word_list(&temp_dir, "apple\n");

    get_cmd(&temp_dir)
        .args(["sync", "--delete", "--from-file"])
        .arg(&words)
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped deletion."))
        .stdout(predicate::str::contains("Added: 0, Deleted: 0"));
}

#[test]
fn test_note_commands_require_note_type() {
    let (temp_dir, _guard) = setup_test_env();
    for args in [
        vec!["templates", "check"],
        vec!["templates", "backwards", "add", "-y"],
        vec!["fill-missing", "-y"],
        vec!["download-missing", "-y"],
    ] {
        get_cmd(&temp_dir)
            .args(&args)
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("does not exist"));
    }
}

#[test]
fn test_templates_check_and_backwards() {
    let (temp_dir, _guard) = setup_test_env();
    seed_collection(&temp_dir, &[]);

    get_cmd(&temp_dir)
        .args(["templates", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Templates and CSS match the defaults."));

    get_cmd(&temp_dir)
        .args(["templates", "backwards", "remove", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("has no Backwards template"));

    get_cmd(&temp_dir)
        .args(["templates", "backwards", "add", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added Backwards template"));

    get_cmd(&temp_dir)
        .args(["templates", "backwards", "add", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already has a Backwards template"));

    get_cmd(&temp_dir)
        .args(["templates", "backwards", "remove"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled."));

    get_cmd(&temp_dir)
        .args(["templates", "backwards", "remove", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed Backwards template"));
}

#[test]
fn test_templates_check_detects_changes() {
    let (temp_dir, _guard) = setup_test_env();
    seed_collection(&temp_dir, &[]);
    set_config(&temp_dir, "enableChineseDefinition", "true");

    get_cmd(&temp_dir)
        .args(["templates", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Templates or CSS have been changed."))
        .stdout(predicate::str::contains("--reset"));

    get_cmd(&temp_dir)
        .args(["templates", "check", "--reset", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reset complete."));

    get_cmd(&temp_dir)
        .args(["templates", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Templates and CSS match the defaults."));
}

#[test]
fn test_download_missing() {
    let (temp_dir, _guard) = setup_test_env();
    seed_collection(&temp_dir, &[("apple", "")]);

    get_cmd(&temp_dir)
        .args(["download-missing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[All clear] Nothing to do."));

    seed_collection(&temp_dir, &[("fig", "[sound:D2D-fig.wav]")]);
    get_cmd(&temp_dir)
        .args(["download-missing"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Missing assets (1):\nfig"))
        .stdout(predicate::str::contains("Cancelled."));

    let media = data_dir(&temp_dir).join("media");
    fs::create_dir_all(&media).unwrap();
    fs::write(media.join("D2D-fig.wav"), b"RIFF").unwrap();
    get_cmd(&temp_dir)
        .args(["download-missing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[All clear] Nothing to do."));
}

#[test]
fn test_fill_missing_declined() {
    let (temp_dir, _guard) = setup_test_env();
    seed_collection(&temp_dir, &[("apple", "")]);

    get_cmd(&temp_dir)
        .arg("fill-missing")
        .write_stdin("no\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled."));
}
