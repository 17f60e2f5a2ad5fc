//! The state of a change as recorded in one metadata snapshot.

use serde::{Deserialize, Serialize};

use crate::id::{AccountId, ChangeId, ObjectId};

/// Lifecycle status of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeStatus {
    #[default]
    New,
    Merged,
    Abandoned,
}

/// Line statistics for one file touched by a patch set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub path: String,
    #[serde(default)]
    pub insertions: u32,
    #[serde(default)]
    pub deletions: u32,
}

/// One uploaded revision of a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSet {
    pub number: u32,
    pub revision: ObjectId,
    pub uploader: AccountId,
    pub created: i64,
    pub commit_message: String,
    #[serde(default)]
    pub files: Vec<FileStat>,
}

impl PatchSet {
    /// First line of the commit message.
    pub fn subject(&self) -> &str {
        self.commit_message.lines().next().unwrap_or_default()
    }

    pub fn insertions(&self) -> u32 {
        self.files
            .iter()
            .fold(0u32, |acc, f| acc.saturating_add(f.insertions))
    }

    pub fn deletions(&self) -> u32 {
        self.files
            .iter()
            .fold(0u32, |acc, f| acc.saturating_add(f.deletions))
    }
}

/// A vote on a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub label: String,
    pub account: AccountId,
    pub value: i16,
    pub patch_set: u32,
    pub granted: i64,
}

/// A review message posted on a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMessage {
    pub id: String,
    #[serde(default)]
    pub author: Option<AccountId>,
    pub date: i64,
    pub message: String,
    #[serde(default)]
    pub patch_set: Option<u32>,
}

/// Full state of a change at one point in its metadata history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeState {
    pub id: ChangeId,
    pub project: String,
    pub branch: String,
    /// The `I...` Change-Id footer value.
    pub change_key: String,
    pub subject: String,
    #[serde(default)]
    pub status: ChangeStatus,
    pub owner: AccountId,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub created: i64,
    pub updated: i64,
    #[serde(default)]
    pub patch_sets: Vec<PatchSet>,
    #[serde(default)]
    pub approvals: Vec<Approval>,
    #[serde(default)]
    pub messages: Vec<ChangeMessage>,
}

impl ChangeState {
    /// The patch set with the highest number.
    pub fn current_patch_set(&self) -> Option<&PatchSet> {
        self.patch_sets.iter().max_by_key(|ps| ps.number)
    }

    /// Votes cast on the current patch set.
    pub fn current_approvals(&self) -> impl Iterator<Item = &Approval> {
        let current = self.current_patch_set().map(|ps| ps.number);
        self.approvals
            .iter()
            .filter(move |a| Some(a.patch_set) == current)
    }

    /// `project~branch~Ikey`, the triplet form of the change id.
    pub fn triplet_id(&self) -> String {
        format!("{}~{}~{}", self.project, self.branch, self.change_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch_set(number: u32, fill: u8) -> PatchSet {
        PatchSet {
            number,
            revision: ObjectId::from_bytes([fill; 20]),
            uploader: AccountId(1),
            created: 0,
            commit_message: "Fix the thing\n\nLonger body.".into(),
            files: vec![
                FileStat {
                    path: "a.rs".into(),
                    insertions: 3,
                    deletions: 1,
                },
                FileStat {
                    path: "b.rs".into(),
                    insertions: 2,
                    deletions: 0,
                },
            ],
        }
    }

    #[test]
    fn line_counts_saturate_instead_of_overflowing() {
        let mut ps = patch_set(1, 0xaa);
        ps.files = vec![
            FileStat {
                path: "huge.bin".into(),
                insertions: u32::MAX,
                deletions: u32::MAX - 1,
            },
            FileStat {
                path: "more.bin".into(),
                insertions: 7,
                deletions: 7,
            },
        ];
        assert_eq!(ps.insertions(), u32::MAX);
        assert_eq!(ps.deletions(), u32::MAX);
        assert_eq!(patch_set(1, 0xaa).insertions(), 5);
    }

    #[test]
    fn current_patch_set_is_highest_number() {
        let change = ChangeState {
            id: ChangeId(1),
            project: "p".into(),
            branch: "main".into(),
            change_key: "I00".into(),
            subject: "s".into(),
            status: ChangeStatus::New,
            owner: AccountId(1),
            topic: None,
            hashtags: vec![],
            created: 0,
            updated: 0,
            patch_sets: vec![patch_set(2, 2), patch_set(1, 1)],
            approvals: vec![Approval {
                label: "Code-Review".into(),
                account: AccountId(2),
                value: 1,
                patch_set: 1,
                granted: 0,
            }],
            messages: vec![],
        };
        assert_eq!(change.current_patch_set().unwrap().number, 2);
        assert_eq!(change.current_approvals().count(), 0);
        assert_eq!(change.triplet_id(), "p~main~I00");
    }

    #[test]
    fn patch_set_stats_and_subject() {
        let ps = patch_set(1, 0);
        assert_eq!(ps.subject(), "Fix the thing");
        assert_eq!(ps.insertions(), 5);
        assert_eq!(ps.deletions(), 1);
    }
}
