//! Resolution of the `{id}` segment of change URLs.

use std::sync::Arc;

use critic_core::ChangeId;
use critic_storage::{ChangeStore, StorageError};

use crate::error::ApiError;

/// Resolves change identifiers.
///
/// Accepted forms are the legacy number, `project~number`,
/// `project~branch~Change-Id` and a bare `I...` Change-Id. A Change-Id that
/// matches several changes does not identify one.
#[derive(Clone)]
pub struct ChangesCollection {
    changes: Arc<dyn ChangeStore>,
}

impl ChangesCollection {
    pub fn new(changes: Arc<dyn ChangeStore>) -> Self {
        ChangesCollection { changes }
    }

    pub fn parse(&self, id: &str) -> Result<ChangeId, ApiError> {
        let not_found = || ApiError::NotFound(format!("Not found: {id}"));
        let parts: Vec<&str> = id.split('~').collect();

        match parts.as_slice() {
            [number] => match number.parse::<u32>() {
                Ok(n) => self.existing(ChangeId(n))?.ok_or_else(not_found),
                Err(_) => self.by_key(number, |_, _| true)?.ok_or_else(not_found),
            },
            [project, number] => {
                let n = number.parse::<u32>().map_err(|_| not_found())?;
                match self.changes.get_change(ChangeId(n), None) {
                    Ok(snapshot) if snapshot.state.project == *project => Ok(ChangeId(n)),
                    Ok(_) | Err(StorageError::ChangeNotFound(_)) => Err(not_found()),
                    Err(err) => Err(err.into()),
                }
            }
            [project, branch, key] => self
                .by_key(key, |p, b| p == *project && b == *branch)?
                .ok_or_else(not_found),
            _ => Err(not_found()),
        }
    }

    fn existing(&self, id: ChangeId) -> Result<Option<ChangeId>, ApiError> {
        match self.changes.get_change(id, None) {
            Ok(_) => Ok(Some(id)),
            Err(StorageError::ChangeNotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// The single change carrying `key` whose project and branch satisfy
    /// `accept`.
    fn by_key<F>(&self, key: &str, accept: F) -> Result<Option<ChangeId>, ApiError>
    where
        F: Fn(&str, &str) -> bool,
    {
        if !key.starts_with('I') {
            return Ok(None);
        }
        let mut found = Vec::new();
        for id in self.changes.find_by_key(key)? {
            let snapshot = self.changes.get_change(id, None)?;
            if accept(&snapshot.state.project, &snapshot.state.branch) {
                found.push(id);
            }
        }
        Ok(match found.as_slice() {
            [only] => Some(*only),
            _ => None,
        })
    }
}
