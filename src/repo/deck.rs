use rusqlite::{Connection, OptionalExtension};
use crate::models::Deck;
use anyhow::{Context, Result};

/// Deck repository for database operations
pub struct DeckRepo;

impl DeckRepo {
    fn row_to_deck(row: &rusqlite::Row) -> rusqlite::Result<Deck> {
        Ok(Deck {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            created_ts: row.get(2)?,
        })
    }

    /// Create a new deck
    pub fn create(conn: &Connection, name: &str) -> Result<Deck> {
        let deck = Deck::new(name.to_string());

        conn.execute(
            "INSERT INTO decks (name, created_ts) VALUES (?1, ?2)",
            rusqlite::params![deck.name, deck.created_ts],
        )
        .with_context(|| format!("Failed to create deck: {}", name))?;

        Ok(Deck {
            id: Some(conn.last_insert_rowid()),
            ..deck
        })
    }

    /// Get deck by name
    pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Deck>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, created_ts FROM decks WHERE name = ?1"
        )?;
        let deck = stmt.query_row([name], Self::row_to_deck).optional()?;
        Ok(deck)
    }

    /// Get deck by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Deck>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, created_ts FROM decks WHERE id = ?1"
        )?;
        let deck = stmt.query_row([id], Self::row_to_deck).optional()?;
        Ok(deck)
    }

    /// Get a deck by name, creating it if needed
    pub fn get_or_create(conn: &Connection, name: &str) -> Result<Deck> {
        match Self::get_by_name(conn, name)? {
            Some(deck) => Ok(deck),
            None => {
                log::info!("Creating deck '{}'", name);
                Self::create(conn, name)
            }
        }
    }

    /// List all decks ordered by name
    pub fn list(conn: &Connection) -> Result<Vec<Deck>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, created_ts FROM decks ORDER BY name"
        )?;
        let rows = stmt.query_map([], Self::row_to_deck)?;

        let mut decks = Vec::new();
        for row in rows {
            decks.push(row?);
        }
        Ok(decks)
    }

    /// List all deck names ordered by name
    pub fn list_names(conn: &Connection) -> Result<Vec<String>> {
        Ok(Self::list(conn)?.into_iter().map(|d| d.name).collect())
    }
}
