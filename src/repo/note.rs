use rusqlite::{Connection, OptionalExtension};
use crate::models::Note;
use std::collections::BTreeMap;
use anyhow::{Context, Result};

/// Note repository for database operations
///
/// The `term` field is mirrored into its own column so notes can be looked up
/// by term (case-insensitive) without decoding every row.
pub struct NoteRepo;

impl NoteRepo {
    const COLUMNS: &'static str =
        "id, guid, note_type_id, deck_id, fields_json, tags, created_ts, modified_ts";

    fn row_to_note(row: &rusqlite::Row) -> rusqlite::Result<Note> {
        let fields_json: String = row.get(4)?;
        let fields: BTreeMap<String, String> = serde_json::from_str(&fields_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let tags: String = row.get(5)?;

        Ok(Note {
            id: Some(row.get(0)?),
            guid: row.get(1)?,
            note_type_id: row.get(2)?,
            deck_id: row.get(3)?,
            fields,
            tags: tags.split_whitespace().map(String::from).collect(),
            created_ts: row.get(6)?,
            modified_ts: row.get(7)?,
        })
    }

    fn query_notes(conn: &Connection, where_clause: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Note>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notes {} ORDER BY id",
            Self::COLUMNS,
            where_clause
        ))?;
        let rows = stmt.query_map(params, Self::row_to_note)?;

        let mut notes = Vec::new();
        for row in rows {
            notes.push(row?);
        }
        Ok(notes)
    }

    /// Insert a new note and return it with its ID
    pub fn add(conn: &Connection, note: &Note) -> Result<Note> {
        conn.execute(
            "INSERT INTO notes (guid, note_type_id, deck_id, term, fields_json, tags, created_ts, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                note.guid,
                note.note_type_id,
                note.deck_id,
                note.get("term"),
                serde_json::to_string(&note.fields)?,
                note.tags_string(),
                note.created_ts,
                note.modified_ts,
            ],
        )
        .with_context(|| format!("Failed to add note: {}", note.get("term")))?;

        Ok(Note {
            id: Some(conn.last_insert_rowid()),
            ..note.clone()
        })
    }

    /// Save field and tag changes of an existing note
    pub fn update(conn: &Connection, note: &mut Note) -> Result<()> {
        let id = note.id.context("Note has not been added yet")?;
        note.modified_ts = chrono::Utc::now().timestamp();

        conn.execute(
            "UPDATE notes SET deck_id = ?1, term = ?2, fields_json = ?3, tags = ?4, modified_ts = ?5
             WHERE id = ?6",
            rusqlite::params![
                note.deck_id,
                note.get("term"),
                serde_json::to_string(&note.fields)?,
                note.tags_string(),
                note.modified_ts,
                id,
            ],
        )
        .with_context(|| format!("Failed to update note {}", id))?;
        Ok(())
    }

    /// Get note by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Note>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notes WHERE id = ?1",
            Self::COLUMNS
        ))?;
        let note = stmt.query_row([id], Self::row_to_note).optional()?;
        Ok(note)
    }

    /// All notes in a deck
    pub fn find_by_deck(conn: &Connection, deck_id: i64) -> Result<Vec<Note>> {
        Self::query_notes(conn, "WHERE deck_id = ?1", &[&deck_id])
    }

    /// All notes of a note type, across all decks
    pub fn find_by_note_type(conn: &Connection, note_type_id: i64) -> Result<Vec<Note>> {
        Self::query_notes(conn, "WHERE note_type_id = ?1", &[&note_type_id])
    }

    /// First note in a deck whose term matches (case-insensitive)
    pub fn find_by_term(conn: &Connection, deck_id: i64, term: &str) -> Result<Option<i64>> {
        let id = conn
            .query_row(
                "SELECT id FROM notes WHERE deck_id = ?1 AND term = ?2 COLLATE NOCASE ORDER BY id LIMIT 1",
                rusqlite::params![deck_id, term],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Non-empty terms of notes in a deck whose note type name starts with `prefix`
    /// (case-insensitive)
    pub fn terms_in_deck(conn: &Connection, deck_id: i64, note_type_prefix: &str) -> Result<Vec<String>> {
        let pattern = format!("{}%", note_type_prefix.replace('%', "\\%").replace('_', "\\_"));
        let mut stmt = conn.prepare(
            "SELECT n.term FROM notes n JOIN note_types t ON t.id = n.note_type_id
             WHERE n.deck_id = ?1 AND n.term != '' AND t.name LIKE ?2 ESCAPE '\\'
             ORDER BY n.id"
        )?;
        let rows = stmt.query_map(rusqlite::params![deck_id, pattern], |row| row.get(0))?;

        let mut terms = Vec::new();
        for row in rows {
            terms.push(row?);
        }
        Ok(terms)
    }

    /// Delete notes by ID; returns the number actually deleted
    pub fn delete_many(conn: &Connection, ids: &[i64]) -> Result<usize> {
        let tx = conn.unchecked_transaction()?;
        let mut deleted = 0;
        for id in ids {
            deleted += tx.execute("DELETE FROM notes WHERE id = ?1", [id])?;
        }
        tx.commit()?;
        Ok(deleted)
    }
}
