//! Note type, deck and note operations on the collection.

use super::templates::*;
use crate::config::AppConfig;
use crate::models::{CardTemplate, Deck, Note, NoteType, PronunciationVariant, QueryResult};
use crate::query::get_pronunciation;
use crate::repo::{DeckRepo, NoteRepo, NoteTypeRepo};
use crate::utils::{default_audio_filename, swap_positions};
use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use std::collections::BTreeSet;

pub const MODEL_NAME: &str = "Dict2Deck";
/// Note type used when context sentences are disabled: `context` and `term` swap places
pub const MODEL_NAME_NO_CONTEXT: &str = "Dict2Deck (No Context)";

pub const MODEL_FIELDS: &[&str] = &[
    "term",
    "definition",
    "definition_cn",
    "ipa",
    "context",
    "image",
    "pronunciation",
    "group",
    "part_of_speech",
];

const HIGHLIGHT_STYLE: &str = "font-weight: bold; color: #4096ff;";

pub fn model_name(enable_context: bool) -> &'static str {
    if enable_context {
        MODEL_NAME
    } else {
        MODEL_NAME_NO_CONTEXT
    }
}

/// Expected field order of a note type
pub fn model_fields(disable_context: bool) -> Vec<String> {
    if disable_context {
        swap_positions(MODEL_FIELDS, &[("context", "term")])
            .unwrap_or_else(|_| MODEL_FIELDS.iter().map(|s| s.to_string()).collect())
    } else {
        MODEL_FIELDS.iter().map(|s| s.to_string()).collect()
    }
}

fn expected_fields(note_type: &NoteType) -> Vec<String> {
    model_fields(note_type.name == MODEL_NAME_NO_CONTEXT)
}

/// Compare the note type's fields with the expected set: `(ok, unknown, missing)`
pub fn check_fields(note_type: &NoteType) -> (bool, BTreeSet<String>, BTreeSet<String>) {
    let current: BTreeSet<String> = note_type.fields.iter().cloned().collect();
    let expected: BTreeSet<String> = MODEL_FIELDS.iter().map(|s| s.to_string()).collect();
    if current == expected {
        return (true, BTreeSet::new(), BTreeSet::new());
    }
    let unknown = current.difference(&expected).cloned().collect();
    let missing = expected.difference(&current).cloned().collect();
    (false, unknown, missing)
}

/// Add missing fields; expected fields come first, unknown fields keep their
/// relative order after them. Returns whether the note type changed.
pub fn merge_fields(conn: &Connection, note_type: &mut NoteType) -> Result<bool> {
    let (ok, unknown, missing) = check_fields(note_type);
    if ok || missing.is_empty() {
        return Ok(false);
    }

    log::warn!("unknown fields: {:?}", unknown);
    log::warn!("missing fields: {:?}", missing);
    log::info!("Merging fields of note type '{}'", note_type.name);

    let unknown_in_order: Vec<String> = note_type
        .fields
        .iter()
        .filter(|f| unknown.contains(*f))
        .cloned()
        .collect();
    let mut fields = expected_fields(note_type);
    fields.extend(unknown_in_order);
    note_type.fields = fields;

    NoteTypeRepo::save(conn, note_type)?;
    Ok(true)
}

/// Get the note type by name, creating it when absent.
///
/// Returns `(note_type, new_created, fields_updated)`. With `recreate` an
/// existing note type is deleted together with all of its notes first.
pub fn get_or_create_note_type(
    conn: &Connection,
    name: &str,
    disable_context: bool,
    recreate: bool,
) -> Result<(NoteType, bool, bool)> {
    if let Some(mut existing) = NoteTypeRepo::get_by_name(conn, name)? {
        if !recreate {
            let updated = merge_fields(conn, &mut existing)?;
            return Ok((existing, false, updated));
        }
        log::warn!("Force deleting and recreating note type {}", name);
        if let Some(id) = existing.id {
            NoteTypeRepo::delete(conn, id)?;
        }
    }

    log::info!("Creating note type {}", name);
    let mut note_type = NoteType::new(name.to_string());
    note_type.fields = model_fields(disable_context);
    let note_type = NoteTypeRepo::add(conn, &note_type)?;
    Ok((note_type, true, true))
}

/// Note types this tool creates that exist in the collection
pub fn existing_note_types(conn: &Connection) -> Result<Vec<NoteType>> {
    let mut found = Vec::new();
    for name in [MODEL_NAME, MODEL_NAME_NO_CONTEXT] {
        if let Some(nt) = NoteTypeRepo::get_by_name(conn, name)? {
            found.push(nt);
        }
    }
    Ok(found)
}

fn add_template(conn: &Connection, note_type: &mut NoteType, name: &str, qfmt: String, afmt: String) -> Result<bool> {
    if note_type.template(name).is_some() {
        log::info!("[Skip] Card type '{}' already exists.", name);
        return Ok(false);
    }
    log::info!("Add card template {}", name);
    note_type.templates.push(CardTemplate {
        name: name.to_string(),
        qfmt,
        afmt,
    });
    note_type.css = CARD_TEMPLATE_CSS.to_string();
    NoteTypeRepo::save(conn, note_type)?;
    Ok(true)
}

pub fn add_normal_template(conn: &Connection, note_type: &mut NoteType, fg: &FieldGroup) -> Result<bool> {
    add_template(conn, note_type, NORMAL_TEMPLATE_NAME, normal_qfmt(fg), normal_afmt(fg))
}

pub fn add_backwards_template(conn: &Connection, note_type: &mut NoteType, fg: &FieldGroup) -> Result<bool> {
    add_template(conn, note_type, BACKWARDS_TEMPLATE_NAME, backwards_qfmt(fg), backwards_afmt(fg))
}

pub fn remove_backwards_template(conn: &Connection, note_type: &mut NoteType) -> Result<bool> {
    let before = note_type.templates.len();
    note_type.templates.retain(|t| t.name != BACKWARDS_TEMPLATE_NAME);
    if note_type.templates.len() == before {
        return Ok(false);
    }
    NoteTypeRepo::save(conn, note_type)?;
    Ok(true)
}

/// Whether the known templates match what `fg` would generate
pub fn check_templates(note_type: &NoteType, fg: &FieldGroup) -> bool {
    for tmpl in &note_type.templates {
        log::info!("Found card template '{}'", tmpl.name);
        let expected = match tmpl.name.as_str() {
            NORMAL_TEMPLATE_NAME => (normal_qfmt(fg), normal_afmt(fg)),
            BACKWARDS_TEMPLATE_NAME => (backwards_qfmt(fg), backwards_afmt(fg)),
            _ => continue,
        };
        if tmpl.qfmt != expected.0 || tmpl.afmt != expected.1 {
            log::warn!("Changes detected in template '{}'", tmpl.name);
            return false;
        }
    }
    true
}

pub fn check_css(note_type: &NoteType) -> bool {
    if note_type.css == CARD_TEMPLATE_CSS {
        return true;
    }
    log::warn!("Changes detected in card CSS");
    false
}

/// Regenerate the known templates and CSS
pub fn reset_templates(conn: &Connection, note_type: &mut NoteType, fg: &FieldGroup) -> Result<()> {
    for tmpl in &mut note_type.templates {
        let (qfmt, afmt) = match tmpl.name.as_str() {
            NORMAL_TEMPLATE_NAME => (normal_qfmt(fg), normal_afmt(fg)),
            BACKWARDS_TEMPLATE_NAME => (backwards_qfmt(fg), backwards_afmt(fg)),
            _ => continue,
        };
        log::info!("Reset card template '{}'", tmpl.name);
        tmpl.qfmt = qfmt;
        tmpl.afmt = afmt;
    }
    log::info!("Reset CSS");
    note_type.css = CARD_TEMPLATE_CSS.to_string();
    NoteTypeRepo::save(conn, note_type)
}

/// Get or create the deck and make it the note type's default deck
pub fn get_or_create_deck(conn: &Connection, name: &str, note_type: &mut NoteType) -> Result<Deck> {
    let deck = DeckRepo::get_or_create(conn, name)?;
    note_type.deck_id = deck.id;
    NoteTypeRepo::save(conn, note_type)?;
    Ok(deck)
}

/// Set a field; returns whether it was written.
///
/// Empty values are never written. New notes and `overwrite` always write;
/// existing notes only get empty fields filled.
pub fn set_note_field(note: &mut Note, key: &str, value: &str, is_new: bool, overwrite: bool) -> bool {
    if value.is_empty() {
        return false;
    }
    if is_new || overwrite || note.get(key).is_empty() {
        note.set(key, value);
        return true;
    }
    false
}

/// Where `add_note_to_deck` writes
pub enum NoteTarget<'a> {
    New { deck: &'a Deck, note_type: &'a NoteType },
    Existing { note: &'a mut Note, overwrite: bool },
}

fn highlight(context: &str, replacing: &str) -> String {
    context.replace(
        replacing,
        &format!("<span style=\"{}\">{}</span>", HIGHLIGHT_STYLE, replacing),
    )
}

fn fill_note(note: &mut Note, config: &AppConfig, word: &QueryResult, variant: PronunciationVariant, is_new: bool, overwrite: bool) {
    let set = |note: &mut Note, key: &str, value: &str| set_note_field(note, key, value, is_new, overwrite);
    let term = word.term.as_str();
    set(note, "term", term);

    if let Some(ipa) = &word.ipa {
        set(note, "ipa", ipa);
    }
    if let Some(pos) = word.part_of_speech.as_deref().filter(|p| !p.is_empty()) {
        set(note, "part_of_speech", pos);
        if config.enable_add_part_of_speech_to_tag {
            note.add_tag(pos);
        }
    }
    if let Some(definition) = &word.definition {
        set(note, "definition", definition);
    }
    if config.enable_chinese_definition {
        if let Some(cn) = &word.chinese_definition {
            set(note, "definition_cn", cn);
        }
    }
    if variant != PronunciationVariant::None {
        let filename = default_audio_filename(term, "wav");
        set(note, "pronunciation", &format!("[sound:{}]", filename));
    }
    if config.enable_context {
        if let Some(context) = word.context.as_deref() {
            match word.replacing.as_deref().filter(|r| !r.is_empty()) {
                Some(replacing) if config.enable_term_highlight => {
                    set(note, "context", &highlight(context, replacing));
                }
                _ => {
                    set(note, "context", context);
                }
            }
        }
    }
}

/// Write a query result into a new note or an existing one; returns the note ID
pub fn add_note_to_deck(
    conn: &Connection,
    config: &AppConfig,
    word: &QueryResult,
    variant: PronunciationVariant,
    target: NoteTarget<'_>,
) -> Result<i64> {
    match target {
        NoteTarget::New { deck, note_type } => {
            let deck_id = deck
                .id
                .ok_or_else(|| anyhow!("Cannot create note: deck '{}' is not saved", deck.name))?;
            let mut note = Note::new(note_type, deck_id);
            fill_note(&mut note, config, word, variant, true, false);
            let note = NoteRepo::add(conn, &note)?;
            log::info!("Added note {}", word.term);
            note.id.context("Added note has no ID")
        }
        NoteTarget::Existing { note, overwrite } => {
            fill_note(note, config, word, variant, false, overwrite);
            NoteRepo::update(conn, note)?;
            log::info!("Updated note {}", word.term);
            note.id.context("Updated note has no ID")
        }
    }
}

/// Audio download task for a result: `(task, variant, is_fallback)` where the
/// task is `(filename, url)`
pub fn asset_download_task(
    word: &QueryResult,
    preferred: PronunciationVariant,
) -> (Option<(String, String)>, PronunciationVariant, bool) {
    let Some(url) = word.audio_url() else {
        if preferred != PronunciationVariant::None {
            log::warn!("No audio download link was found for word {}", word.term);
        }
        return (None, PronunciationVariant::None, false);
    };

    let (variant, is_fallback) = get_pronunciation(word, preferred);
    if variant == PronunciationVariant::None {
        return (None, variant, is_fallback);
    }
    if is_fallback {
        log::warn!(
            "Pronunciation {} is missing for word {}, downloading {} instead",
            preferred.as_str(),
            word.term,
            variant.as_str()
        );
    }

    let filename = default_audio_filename(&word.term, "wav");
    (Some((filename, url.to_string())), variant, is_fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;

    fn result(term: &str) -> QueryResult {
        QueryResult {
            definition: Some("a round fruit".to_string()),
            part_of_speech: Some("noun".to_string()),
            chinese_definition: Some("苹果".to_string()),
            ipa: Some("ˈæp.əl".to_string()),
            context: Some("She ate two apples.".to_string()),
            replacing: Some("apples".to_string()),
            term_audio_url: Some("https://x/a.wav".to_string()),
            ..QueryResult::new(term)
        }
    }

    fn setup(conn: &Connection) -> (NoteType, Deck) {
        let (mut nt, created, _) = get_or_create_note_type(conn, MODEL_NAME, false, false).unwrap();
        assert!(created);
        add_normal_template(conn, &mut nt, &FieldGroup::default()).unwrap();
        let deck = get_or_create_deck(conn, "Vocab", &mut nt).unwrap();
        (nt, deck)
    }

    #[test]
    fn test_model_fields_no_context_swaps() {
        let fields = model_fields(true);
        assert_eq!(fields[0], "context");
        assert_eq!(fields[4], "term");
        assert_eq!(model_fields(false)[0], "term");
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let (nt, _) = setup(&conn);
        let (again, created, updated) = get_or_create_note_type(&conn, MODEL_NAME, false, false).unwrap();
        assert!(!created);
        assert!(!updated);
        assert_eq!(again.id, nt.id);
        assert_eq!(again.deck_id, DeckRepo::get_by_name(&conn, "Vocab").unwrap().unwrap().id);
    }

    #[test]
    fn test_merge_fields_keeps_unknown_after_expected() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let mut nt = NoteType::new(MODEL_NAME.to_string());
        nt.fields = vec!["extra".to_string(), "term".to_string(), "definition".to_string()];
        NoteTypeRepo::add(&conn, &nt).unwrap();

        let (nt, created, updated) = get_or_create_note_type(&conn, MODEL_NAME, false, false).unwrap();
        assert!(!created);
        assert!(updated);
        assert_eq!(nt.fields.len(), MODEL_FIELDS.len() + 1);
        assert_eq!(nt.fields[0], "term");
        assert_eq!(nt.fields.last().map(String::as_str), Some("extra"));

        let (ok, unknown, missing) = check_fields(&nt);
        assert!(!ok);
        assert!(unknown.contains("extra"));
        assert!(missing.is_empty());
    }

    #[test]
    fn test_recreate_drops_notes() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let (nt, deck) = setup(&conn);
        let config = AppConfig::default();
        add_note_to_deck(
            &conn,
            &config,
            &result("apple"),
            PronunciationVariant::None,
            NoteTarget::New {
                deck: &deck,
                note_type: &nt,
            },
        )
        .unwrap();

        let (fresh, created, _) = get_or_create_note_type(&conn, MODEL_NAME, false, true).unwrap();
        assert!(created);
        assert!(fresh.templates.is_empty());
        assert!(NoteRepo::find_by_deck(&conn, deck.id.unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_templates_check_and_reset() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let (mut nt, _) = setup(&conn);
        let fg = FieldGroup::default();
        assert!(check_templates(&nt, &fg));
        assert!(check_css(&nt));

        let mut narrower = fg.clone();
        narrower.toggle_off(CardField::Context);
        assert!(!check_templates(&nt, &narrower));

        nt.css.push_str("/* edited */");
        assert!(!check_css(&nt));
        reset_templates(&conn, &mut nt, &narrower).unwrap();
        let saved = NoteTypeRepo::get_by_id(&conn, nt.id.unwrap()).unwrap().unwrap();
        assert!(check_templates(&saved, &narrower));
        assert!(check_css(&saved));
    }

    #[test]
    fn test_backwards_template_add_remove() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let (mut nt, _) = setup(&conn);
        let fg = FieldGroup::default();
        assert!(add_backwards_template(&conn, &mut nt, &fg).unwrap());
        assert!(!add_backwards_template(&conn, &mut nt, &fg).unwrap());
        assert_eq!(nt.templates.len(), 2);
        assert!(remove_backwards_template(&conn, &mut nt).unwrap());
        assert!(!remove_backwards_template(&conn, &mut nt).unwrap());
        assert!(nt.template(NORMAL_TEMPLATE_NAME).is_some());
    }

    #[test]
    fn test_set_note_field_rules() {
        let mut nt = NoteType::new("T".to_string());
        nt.fields = vec!["term".to_string()];
        let mut note = Note::new(&nt, 1);

        assert!(!set_note_field(&mut note, "term", "", true, true));
        assert!(set_note_field(&mut note, "term", "a", false, false));
        assert!(!set_note_field(&mut note, "term", "b", false, false));
        assert_eq!(note.get("term"), "a");
        assert!(set_note_field(&mut note, "term", "c", false, true));
        assert!(set_note_field(&mut note, "term", "d", true, false));
        assert_eq!(note.get("term"), "d");
    }

    #[test]
    fn test_add_note_writes_enabled_fields() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let (nt, deck) = setup(&conn);
        let config = AppConfig {
            enable_context: true,
            enable_add_part_of_speech_to_tag: true,
            ..Default::default()
        };

        let id = add_note_to_deck(
            &conn,
            &config,
            &result("apple"),
            PronunciationVariant::Us,
            NoteTarget::New {
                deck: &deck,
                note_type: &nt,
            },
        )
        .unwrap();
        let note = NoteRepo::get_by_id(&conn, id).unwrap().unwrap();

        assert_eq!(note.get("term"), "apple");
        assert_eq!(note.get("definition"), "a round fruit");
        assert_eq!(note.get("definition_cn"), "");
        assert_eq!(note.get("pronunciation"), "[sound:D2D-apple.wav]");
        assert_eq!(
            note.get("context"),
            "She ate two <span style=\"font-weight: bold; color: #4096ff;\">apples</span>."
        );
        assert_eq!(note.tags, vec!["noun"]);
    }

    #[test]
    fn test_existing_note_only_fills_missing() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let (nt, deck) = setup(&conn);
        let config = AppConfig {
            enable_chinese_definition: true,
            ..Default::default()
        };
        let mut note = Note::new(&nt, deck.id.unwrap());
        note.set("term", "apple");
        note.set("definition", "my own words");
        let mut note = NoteRepo::add(&conn, &note).unwrap();

        add_note_to_deck(
            &conn,
            &config,
            &result("apple"),
            PronunciationVariant::None,
            NoteTarget::Existing {
                note: &mut note,
                overwrite: false,
            },
        )
        .unwrap();

        let saved = NoteRepo::get_by_id(&conn, note.id.unwrap()).unwrap().unwrap();
        assert_eq!(saved.get("definition"), "my own words");
        assert_eq!(saved.get("definition_cn"), "苹果");
        assert_eq!(saved.get("context"), "");
        assert_eq!(saved.get("pronunciation"), "");
    }

    #[test]
    fn test_asset_download_task() {
        let (task, variant, fallback) = asset_download_task(&result("apple"), PronunciationVariant::Uk);
        assert_eq!(task, Some(("D2D-apple.wav".to_string(), "https://x/a.wav".to_string())));
        assert_eq!(variant, PronunciationVariant::Uk);
        assert!(!fallback);

        let (task, variant, _) = asset_download_task(&QueryResult::new("x"), PronunciationVariant::Us);
        assert!(task.is_none());
        assert_eq!(variant, PronunciationVariant::None);

        let (task, _, _) = asset_download_task(&result("apple"), PronunciationVariant::None);
        assert!(task.is_none());
    }

    #[test]
    fn test_audio_filename_safe_for_any_term() {
        let (task, _, _) = asset_download_task(&result("and/or"), PronunciationVariant::Us);
        assert_eq!(task.map(|(name, _)| name), Some("D2D-and_or.wav".to_string()));
    }
}
