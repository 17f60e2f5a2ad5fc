//! Request and response types for the change endpoints.
//!
//! Optional sections are `None` unless the matching output option was
//! requested, and are then omitted from the JSON entirely.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use critic_core::{ChangeId, ChangeStatus, ObjectId, OptionSet};

use super::accounts::AccountInfo;
use crate::error::ApiError;
use crate::plugins::PluginDefinedInfo;

/// Query parameters of a change read.
///
/// `o` may repeat and names one option per occurrence; `O` carries the hex
/// bitmask. Both forms are combined. `meta` pins the response to a stored
/// snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeQuery {
    pub options: OptionSet,
    pub meta: Option<ObjectId>,
}

impl ChangeQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, ApiError> {
        let mut flags = Vec::new();
        let mut options = OptionSet::new();
        let mut meta = None;

        for (key, value) in pairs {
            match key.as_str() {
                "o" => flags.push(value.as_str()),
                "O" => options = options.union(&OptionSet::parse_hex(value)?),
                "meta" if value.is_empty() => meta = None,
                "meta" => {
                    let id = ObjectId::parse(value).map_err(|_| {
                        ApiError::BadRequest(format!("invalid meta SHA1: {value}"))
                    })?;
                    meta = Some(id);
                }
                other => {
                    return Err(ApiError::BadRequest(format!(
                        "\"{other}\" is not a valid query parameter"
                    )))
                }
            }
        }

        Ok(ChangeQuery {
            options: options.union(&OptionSet::parse_flags(flags)?),
            meta,
        })
    }
}

/// The formatted representation of one change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeInfo {
    /// `project~branch~Change-Id` triplet.
    pub id: String,
    pub project: String,
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashtags: Vec<String>,
    pub change_id: String,
    pub subject: String,
    pub status: ChangeStatus,
    pub created: String,
    pub updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submittable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insertions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletions: Option<u32>,
    #[serde(rename = "_number")]
    pub number: ChangeId,
    pub owner: AccountInfo,
    /// Meta snapshot this representation was rendered from.
    pub meta_rev_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<IndexMap<String, LabelInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChangeMessageInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revisions: Option<IndexMap<String, RevisionInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<PluginDefinedInfo>>,
}

/// Vote summary for one label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<AccountInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected: Option<AccountInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended: Option<AccountInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disliked: Option<AccountInfo>,
    /// Every vote, present with detailed labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Vec<ApprovalInfo>>,
}

/// One vote on a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalInfo {
    #[serde(flatten)]
    pub account: AccountInfo,
    pub value: i16,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeMessageInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AccountInfo>,
    pub date: String,
    pub message: String,
    #[serde(
        rename = "_revision_number",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub revision_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionInfo {
    #[serde(rename = "_number")]
    pub number: u32,
    pub created: String,
    pub uploader: AccountInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<IndexMap<String, FileInfo>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub subject: String,
    pub message: String,
}

/// Line counts for one file; zero counts are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_inserted: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_deleted: Option<u32>,
}
