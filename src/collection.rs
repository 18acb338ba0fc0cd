//! Collection
//!
//! CRUD helpers over one namespace.
//!
//! Inserts, updates and removes are fire-and-forget at the protocol level;
//! follow them with [`Database::last_error`](crate::Database::last_error)
//! when confirmation is needed.

use crate::bson::{Document, Value};
use crate::client::{Client, Topology};
use crate::cursor::Cursor;
use crate::database::Database;
use crate::doc;
use crate::error::Result;
use crate::network::Link;
use crate::protocol::{Delete, Insert, Message, Update, UpdateFlags};

/// A named collection within a database
pub struct Collection<'a> {
    client: &'a Client,
    db_name: String,
    name: String,
}

impl<'a> Collection<'a> {
    pub(crate) fn new(client: &'a Client, db_name: &str, name: &str) -> Self {
        Self {
            client,
            db_name: db_name.to_string(),
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// Namespace string, `db.collection`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.db_name, self.name)
    }

    fn database(&self) -> Database<'a> {
        self.client.database(&self.db_name)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Cursor over documents matching `selector`; configure it with
    /// `limit`/`skip`/`batch_size`/`fields` before iterating
    pub fn find(&self, selector: Document) -> Cursor<'a, Topology> {
        Cursor::new(self.client.topology(), self.full_name(), selector)
    }

    /// Cursor over every document
    pub fn find_all(&self) -> Cursor<'a, Topology> {
        self.find(Document::new())
    }

    /// First document matching `selector`, if any
    pub fn find_one(&self, selector: Document) -> Result<Option<Document>> {
        let mut cursor = self.find(selector).limit(-1);
        cursor.next().transpose()
    }

    /// Number of documents matching `selector`.
    ///
    /// A missing namespace or any other command failure is an error, not 0.
    pub fn count(&self, selector: Document) -> Result<i64> {
        let response = self.database().command(doc! {
            "count" => self.name.as_str(),
            "query" => selector,
        })?;
        response.get_integer("n")
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert one document, assigning an `_id` if it has none; returns the `_id`
    pub fn insert(&self, document: Document) -> Result<Value> {
        let mut ids = self.insert_many(vec![document])?;
        Ok(ids.pop().unwrap_or(Value::Null))
    }

    /// Insert several documents in one message; returns their `_id`s in order
    pub fn insert_many(&self, documents: impl IntoIterator<Item = Document>) -> Result<Vec<Value>> {
        let mut prepared = Vec::new();
        let mut ids = Vec::new();

        for mut document in documents {
            let id = match document.get("_id") {
                Some(id) => id.clone(),
                None => {
                    let id = Value::ObjectId(self.client.oid_generator().generate());
                    document.insert("_id", id.clone());
                    id
                }
            };
            ids.push(id);
            prepared.push(document);
        }

        if prepared.is_empty() {
            return Ok(ids);
        }

        tracing::trace!("Inserting {} documents into {}", prepared.len(), self.full_name());
        self.submit(Insert::new(self.full_name(), prepared))?;
        Ok(ids)
    }

    /// Update documents matching `selector`
    pub fn update(&self, selector: Document, update: Document, flags: UpdateFlags) -> Result<()> {
        self.submit(Update::new(self.full_name(), selector, update, flags))
    }

    /// Update every document matching `selector`
    pub fn update_all(&self, selector: Document, update: Document) -> Result<()> {
        self.update(selector, update, UpdateFlags::MULTI)
    }

    /// Replace the document with the same `_id`, inserting it if absent.
    ///
    /// A document without a non-null `_id` gets a fresh one and is upserted.
    /// Returns the `_id` used.
    pub fn save(&self, mut document: Document) -> Result<Value> {
        let id = match document.get("_id") {
            Some(id) if !id.is_null() => id.clone(),
            _ => {
                let id = Value::ObjectId(self.client.oid_generator().generate());
                document.insert("_id", id.clone());
                id
            }
        };

        let selector = doc! { "_id" => id.clone() };
        self.update(selector, document, UpdateFlags::UPSERT)?;
        Ok(id)
    }

    /// Remove documents matching `selector`
    pub fn remove(&self, selector: Document) -> Result<()> {
        self.submit(Delete::new(self.full_name(), selector))
    }

    fn submit(&self, message: impl Into<Message>) -> Result<()> {
        self.client.topology().submit(&message.into())
    }
}
