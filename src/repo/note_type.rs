use rusqlite::{Connection, OptionalExtension};
use crate::models::{CardTemplate, NoteType};
use anyhow::{Context, Result};

/// Note type (model) repository
///
/// Field names and card templates are stored as JSON columns; a note type
/// is always read and written as a whole.
pub struct NoteTypeRepo;

impl NoteTypeRepo {
    const COLUMNS: &'static str =
        "id, name, fields_json, templates_json, css, deck_id, created_ts, modified_ts";

    fn row_to_note_type(row: &rusqlite::Row) -> rusqlite::Result<NoteType> {
        let fields_json: String = row.get(2)?;
        let templates_json: String = row.get(3)?;
        let fields: Vec<String> = serde_json::from_str(&fields_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let templates: Vec<CardTemplate> = serde_json::from_str(&templates_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(NoteType {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            fields,
            templates,
            css: row.get(4)?,
            deck_id: row.get(5)?,
            created_ts: row.get(6)?,
            modified_ts: row.get(7)?,
        })
    }

    /// Insert a new note type and return it with its ID
    pub fn add(conn: &Connection, note_type: &NoteType) -> Result<NoteType> {
        conn.execute(
            "INSERT INTO note_types (name, fields_json, templates_json, css, deck_id, created_ts, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                note_type.name,
                serde_json::to_string(&note_type.fields)?,
                serde_json::to_string(&note_type.templates)?,
                note_type.css,
                note_type.deck_id,
                note_type.created_ts,
                note_type.modified_ts,
            ],
        )
        .with_context(|| format!("Failed to create note type: {}", note_type.name))?;

        Ok(NoteType {
            id: Some(conn.last_insert_rowid()),
            ..note_type.clone()
        })
    }

    /// Save changes to an existing note type
    pub fn save(conn: &Connection, note_type: &mut NoteType) -> Result<()> {
        let id = note_type
            .id
            .with_context(|| format!("Note type '{}' has not been added yet", note_type.name))?;
        note_type.modified_ts = chrono::Utc::now().timestamp();

        conn.execute(
            "UPDATE note_types SET name = ?1, fields_json = ?2, templates_json = ?3, css = ?4,
                deck_id = ?5, modified_ts = ?6 WHERE id = ?7",
            rusqlite::params![
                note_type.name,
                serde_json::to_string(&note_type.fields)?,
                serde_json::to_string(&note_type.templates)?,
                note_type.css,
                note_type.deck_id,
                note_type.modified_ts,
                id,
            ],
        )
        .with_context(|| format!("Failed to save note type: {}", note_type.name))?;
        Ok(())
    }

    /// Get note type by name
    pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<NoteType>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM note_types WHERE name = ?1",
            Self::COLUMNS
        ))?;
        let note_type = stmt.query_row([name], Self::row_to_note_type).optional()?;
        Ok(note_type)
    }

    /// Get note type by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<NoteType>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM note_types WHERE id = ?1",
            Self::COLUMNS
        ))?;
        let note_type = stmt.query_row([id], Self::row_to_note_type).optional()?;
        Ok(note_type)
    }

    /// Delete a note type together with all of its notes
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM notes WHERE note_type_id = ?1", [id])?;
        tx.execute("DELETE FROM note_types WHERE id = ?1", [id])?;
        tx.commit()?;
        Ok(())
    }
}
