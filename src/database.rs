//! Database
//!
//! Command helpers on top of the core. Commands are queries against the
//! `<db>.$cmd` pseudo-collection with a hard limit of one document.

use crate::bson::Document;
use crate::client::{Client, Topology};
use crate::collection::Collection;
use crate::cursor::Cursor;
use crate::doc;
use crate::error::{DriverError, Result};

/// A named database on a client
pub struct Database<'a> {
    client: &'a Client,
    name: String,
}

impl<'a> Database<'a> {
    pub(crate) fn new(client: &'a Client, name: &str) -> Self {
        Self {
            client,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &'a Client {
        self.client
    }

    pub fn collection(&self, name: &str) -> Collection<'a> {
        Collection::new(self.client, &self.name, name)
    }

    /// Run a command and return its result document.
    ///
    /// Fails with `CommandFailure` unless the server answers with `ok: 1`.
    pub fn command(&self, command: Document) -> Result<Document> {
        let namespace = format!("{}.$cmd", self.name);
        let name = command.first_key().unwrap_or("<empty>").to_string();

        let mut cursor = Cursor::new(self.client.topology(), namespace, command).limit(-1);
        let response = cursor.next().transpose()?.ok_or_else(|| {
            DriverError::CommandFailure(format!("command '{}' returned no document", name))
        })?;

        let ok = response.get("ok").and_then(|v| v.to_f64()).unwrap_or(0.0);
        if ok != 1.0 {
            let message = response
                .get("errmsg")
                .and_then(|v| v.as_str())
                .unwrap_or("command failed");
            return Err(DriverError::CommandFailure(format!("{}: {}", name, message)));
        }

        tracing::trace!("Command '{}' on {} succeeded", name, self.name);
        Ok(response)
    }

    /// Status of the last write on this connection; `err` is null on success
    pub fn last_error(&self) -> Result<Document> {
        self.command(doc! { "getlasterror" => 1 })
    }

    /// Names of the collections in this database, without the database prefix
    pub fn collection_names(&self) -> Result<Vec<String>> {
        let prefix = format!("{}.", self.name);
        let namespaces: Cursor<'_, Topology> = Cursor::new(
            self.client.topology(),
            format!("{}.system.namespaces", self.name),
            Document::new(),
        );

        let mut names = Vec::new();
        for entry in namespaces {
            let entry = entry?;
            let full = entry.get_str("name")?;
            // Index namespaces contain '$'
            if let Some(name) = full.strip_prefix(&prefix) {
                if !name.contains('$') {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }
}
