//! Request types for group membership endpoints.

use serde::Deserialize;

use crate::error::ApiError;

/// Body of an add-members request.
///
/// `_one_member` is appended after `members`, so either form (or both) may
/// be used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MembersInput {
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default, rename = "_one_member")]
    pub one_member: Option<String>,
}

impl MembersInput {
    /// Parses a raw request body.
    ///
    /// Accepts an empty or `null` body (no members), a bare JSON string naming
    /// one member, or a [`MembersInput`] object. Empty strings name nobody.
    pub fn parse(body: &[u8]) -> Result<Vec<String>, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?;
        match value {
            serde_json::Value::Null => return Ok(Vec::new()),
            serde_json::Value::String(member) if member.is_empty() => return Ok(Vec::new()),
            serde_json::Value::String(member) => return Ok(vec![member]),
            _ => {}
        }

        let input: MembersInput = serde_json::from_value(value)
            .map_err(|e| ApiError::BadRequest(format!("invalid members input: {e}")))?;
        Ok(input.into_members())
    }

    pub fn into_members(self) -> Vec<String> {
        let mut members = self.members;
        members.extend(self.one_member.filter(|m| !m.is_empty()));
        members
    }
}
