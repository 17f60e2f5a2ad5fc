//! Renders a change snapshot as [`ChangeInfo`], shaped by output options.
//!
//! | option | effect |
//! |---|---|
//! | `LABELS` | `labels` with approved/rejected/recommended/disliked |
//! | `DETAILED_LABELS` | `labels` with every vote under `all` |
//! | `CURRENT_REVISION` / `ALL_REVISIONS` | `revisions` and `current_revision` |
//! | `CURRENT_COMMIT` / `ALL_COMMITS` | `commit` on included revisions |
//! | `CURRENT_FILES` / `ALL_FILES` | `files` on included revisions |
//! | `DETAILED_ACCOUNTS` | name, email and username on every account |
//! | `MESSAGES` | `messages` |
//! | `SUBMITTABLE` | `submittable` |
//! | `SKIP_DIFFSTAT` | no `insertions`/`deletions` |
//!
//! Other options are accepted and leave the output unchanged.

use std::sync::Arc;

use indexmap::IndexMap;

use critic_core::{
    Approval, ChangeId, ChangeState, ChangeStatus, LabelType, LabelTypes, ListChangesOption,
    ObjectId, OptionSet,
};
use critic_storage::{AccountStore, ChangeSnapshot, ChangeStore};

use crate::accounts::loader::AccountLoader;
use crate::error::ApiError;
use crate::plugins::{Contributions, PluginDefinedInfo};
use crate::schema::changes::{
    ApprovalInfo, ChangeInfo, ChangeMessageInfo, CommitInfo, FileInfo, LabelInfo, RevisionInfo,
};

/// Supplies plugin contributions for the changes being formatted.
pub type PluginCallback<'a> = &'a dyn Fn(&[ChangeState]) -> Contributions;

/// Renders timestamps as `2024-01-31 09:59:32.000000000` (UTC).
pub fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp(secs, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d %H:%M:%S%.9f")
        .to_string()
}

pub struct ChangeJson {
    changes: Arc<dyn ChangeStore>,
    accounts: Arc<dyn AccountStore>,
    labels: Arc<LabelTypes>,
    options: OptionSet,
}

impl ChangeJson {
    pub fn new(
        changes: Arc<dyn ChangeStore>,
        accounts: Arc<dyn AccountStore>,
        labels: Arc<LabelTypes>,
        options: OptionSet,
    ) -> Self {
        ChangeJson {
            changes,
            accounts,
            labels,
            options,
        }
    }

    fn has(&self, option: ListChangesOption) -> bool {
        self.options.contains(option)
    }

    /// Formats change `id` as of `meta`, or as of its current snapshot.
    ///
    /// A `meta` outside the change's history fails with 412.
    pub fn format(
        &self,
        id: ChangeId,
        meta: Option<ObjectId>,
        plugins: PluginCallback<'_>,
    ) -> Result<ChangeInfo, ApiError> {
        let snapshot = self.changes.get_change(id, meta)?;
        let mut contributions = plugins(std::slice::from_ref(&snapshot.state));
        let plugin_infos = contributions.shift_remove(&id).unwrap_or_default();
        self.to_change_info(&snapshot, plugin_infos)
    }

    fn to_change_info(
        &self,
        snapshot: &ChangeSnapshot,
        plugins: Vec<PluginDefinedInfo>,
    ) -> Result<ChangeInfo, ApiError> {
        let state = &snapshot.state;
        let mut loader =
            AccountLoader::new(self.accounts.clone(), self.has(ListChangesOption::DetailedAccounts));
        let current = state.current_patch_set();

        let (insertions, deletions) = match current {
            Some(ps) if !self.has(ListChangesOption::SkipDiffstat) => {
                (Some(ps.insertions()), Some(ps.deletions()))
            }
            _ => (None, None),
        };

        let labels = if self.has(ListChangesOption::Labels)
            || self.has(ListChangesOption::DetailedLabels)
        {
            Some(self.labels(state, &mut loader)?)
        } else {
            None
        };

        let messages = if self.has(ListChangesOption::Messages) {
            let mut out = Vec::with_capacity(state.messages.len());
            for m in &state.messages {
                out.push(ChangeMessageInfo {
                    id: m.id.clone(),
                    author: m.author.map(|a| loader.get(a)).transpose()?,
                    date: format_timestamp(m.date),
                    message: m.message.clone(),
                    revision_number: m.patch_set,
                });
            }
            Some(out)
        } else {
            None
        };

        let (current_revision, revisions) = if self.has(ListChangesOption::CurrentRevision)
            || self.has(ListChangesOption::AllRevisions)
        {
            (
                current.map(|ps| ps.revision.to_hex()),
                Some(self.revisions(state, &mut loader)?),
            )
        } else {
            (None, None)
        };

        Ok(ChangeInfo {
            id: state.triplet_id(),
            project: state.project.clone(),
            branch: state.branch.clone(),
            topic: state.topic.clone(),
            hashtags: state.hashtags.clone(),
            change_id: state.change_key.clone(),
            subject: state.subject.clone(),
            status: state.status,
            created: format_timestamp(state.created),
            updated: format_timestamp(state.updated),
            submittable: self
                .has(ListChangesOption::Submittable)
                .then(|| self.is_submittable(state)),
            insertions,
            deletions,
            number: state.id,
            owner: loader.get(state.owner)?,
            meta_rev_id: snapshot.meta_id.to_hex(),
            labels,
            messages,
            current_revision,
            revisions,
            plugins: (!plugins.is_empty()).then_some(plugins),
        })
    }

    fn labels(
        &self,
        state: &ChangeState,
        loader: &mut AccountLoader,
    ) -> Result<IndexMap<String, LabelInfo>, ApiError> {
        let detailed = self.has(ListChangesOption::DetailedLabels);
        let mut out = IndexMap::new();
        for label in self.labels.iter() {
            let votes: Vec<&Approval> = state
                .current_approvals()
                .filter(|a| a.label == label.name)
                .collect();
            out.insert(label.name.clone(), label_info(label, &votes, detailed, loader)?);
        }
        Ok(out)
    }

    fn revisions(
        &self,
        state: &ChangeState,
        loader: &mut AccountLoader,
    ) -> Result<IndexMap<String, RevisionInfo>, ApiError> {
        let all = self.has(ListChangesOption::AllRevisions);
        let current = state.current_patch_set().map(|ps| ps.number);

        let mut patch_sets: Vec<_> = state.patch_sets.iter().collect();
        patch_sets.sort_by_key(|ps| ps.number);

        let mut out = IndexMap::new();
        for ps in patch_sets {
            let is_current = Some(ps.number) == current;
            if !all && !is_current {
                continue;
            }
            let commit = (self.has(ListChangesOption::AllCommits)
                || (is_current && self.has(ListChangesOption::CurrentCommit)))
            .then(|| CommitInfo {
                subject: ps.subject().to_string(),
                message: ps.commit_message.clone(),
            });
            let files = (self.has(ListChangesOption::AllFiles)
                || (is_current && self.has(ListChangesOption::CurrentFiles)))
            .then(|| {
                ps.files
                    .iter()
                    .map(|f| {
                        (
                            f.path.clone(),
                            FileInfo {
                                lines_inserted: (f.insertions > 0).then_some(f.insertions),
                                lines_deleted: (f.deletions > 0).then_some(f.deletions),
                            },
                        )
                    })
                    .collect()
            });
            out.insert(
                ps.revision.to_hex(),
                RevisionInfo {
                    number: ps.number,
                    created: format_timestamp(ps.created),
                    uploader: loader.get(ps.uploader)?,
                    commit,
                    files,
                },
            );
        }
        Ok(out)
    }

    /// Open, every label has a maximal vote and none has a minimal vote.
    fn is_submittable(&self, state: &ChangeState) -> bool {
        state.status == ChangeStatus::New
            && self.labels.iter().all(|label| {
                let values: Vec<i16> = state
                    .current_approvals()
                    .filter(|a| a.label == label.name)
                    .map(|a| a.value)
                    .collect();
                values.contains(&label.max) && !values.contains(&label.min)
            })
    }
}

fn label_info(
    label: &LabelType,
    votes: &[&Approval],
    detailed: bool,
    loader: &mut AccountLoader,
) -> Result<LabelInfo, ApiError> {
    let mut info = LabelInfo::default();

    if let Some(v) = votes.iter().find(|a| a.value == label.max && a.value > 0) {
        info.approved = Some(loader.get(v.account)?);
    }
    if let Some(v) = votes.iter().find(|a| a.value == label.min && a.value < 0) {
        info.rejected = Some(loader.get(v.account)?);
    }
    if let Some(v) = votes
        .iter()
        .filter(|a| a.value > 0 && a.value < label.max)
        .max_by_key(|a| a.value)
    {
        info.recommended = Some(loader.get(v.account)?);
    }
    if let Some(v) = votes
        .iter()
        .filter(|a| a.value < 0 && a.value > label.min)
        .min_by_key(|a| a.value)
    {
        info.disliked = Some(loader.get(v.account)?);
    }

    if detailed {
        let mut all = Vec::with_capacity(votes.len());
        for v in votes {
            all.push(ApprovalInfo {
                account: loader.get(v.account)?,
                value: v.value,
                date: format_timestamp(v.granted),
            });
        }
        info.all = Some(all);
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use critic_core::{AccountId, ChangeMessage, FileStat, PatchSet};
    use critic_storage::{InMemoryStore, NewAccount};

    struct Fixture {
        store: Arc<InMemoryStore>,
        owner: AccountId,
        first_meta: ObjectId,
    }

    fn patch_set(number: u32, fill: u8, owner: AccountId) -> PatchSet {
        PatchSet {
            number,
            revision: ObjectId::from_bytes([fill; 20]),
            uploader: owner,
            created: 1_700_000_000 + number as i64,
            commit_message: format!("Add parser\n\nPatch set {number}."),
            files: vec![
                FileStat {
                    path: "src/parse.rs".into(),
                    insertions: 12 * number,
                    deletions: 3,
                },
                FileStat {
                    path: "README".into(),
                    insertions: 1,
                    deletions: 0,
                },
            ],
        }
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let owner = store
            .create_account(&NewAccount {
                username: Some("owner".into()),
                full_name: Some("Change Owner".into()),
                preferred_email: Some("owner@example.com".into()),
                active: true,
                registered_on: 0,
            })
            .unwrap()
            .id;
        let mut state = ChangeState {
            id: ChangeId(5),
            project: "tools".into(),
            branch: "main".into(),
            change_key: "I5555555555555555555555555555555555555555".into(),
            subject: "Add parser".into(),
            status: ChangeStatus::New,
            owner,
            topic: Some("parsing".into()),
            hashtags: vec![],
            created: 1_700_000_000,
            updated: 1_700_000_100,
            patch_sets: vec![patch_set(1, 0xaa, owner)],
            approvals: vec![],
            messages: vec![ChangeMessage {
                id: "m1".into(),
                author: Some(owner),
                date: 1_700_000_001,
                message: "Uploaded patch set 1.".into(),
                patch_set: Some(1),
            }],
        };
        let first_meta = store.insert_change(&state).unwrap();

        state.patch_sets.push(patch_set(2, 0xbb, owner));
        state.approvals = vec![
            Approval {
                label: "Code-Review".into(),
                account: owner,
                value: 2,
                patch_set: 2,
                granted: 1_700_000_050,
            },
            Approval {
                label: "Verified".into(),
                account: owner,
                value: 1,
                patch_set: 2,
                granted: 1_700_000_060,
            },
            Approval {
                label: "Code-Review".into(),
                account: owner,
                value: -2,
                patch_set: 1,
                granted: 1_700_000_010,
            },
        ];
        store.update_change(&state).unwrap();

        Fixture {
            store,
            owner,
            first_meta,
        }
    }

    fn json(f: &Fixture, options: &[ListChangesOption]) -> ChangeJson {
        ChangeJson::new(
            f.store.clone(),
            f.store.clone(),
            Arc::new(LabelTypes::default()),
            OptionSet::of(options),
        )
    }

    fn no_plugins(_: &[ChangeState]) -> Contributions {
        Contributions::new()
    }

    #[test]
    fn timestamps_have_nanosecond_precision() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00.000000000");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13:20.000000000");
    }

    #[test]
    fn default_output_is_minimal() {
        let f = fixture();
        let info = json(&f, &[]).format(ChangeId(5), None, &no_plugins).unwrap();
        assert_eq!(info.id, "tools~main~I5555555555555555555555555555555555555555");
        assert_eq!(info.insertions, Some(25));
        assert_eq!(info.deletions, Some(3));
        assert_eq!(info.owner.name, None);
        assert!(info.labels.is_none());
        assert!(info.revisions.is_none());
        assert!(info.messages.is_none());
        assert!(info.submittable.is_none());
        assert!(info.plugins.is_none());
    }

    #[test]
    fn revisions_follow_current_and_all_options() {
        let f = fixture();
        let info = json(
            &f,
            &[ListChangesOption::CurrentRevision, ListChangesOption::CurrentCommit],
        )
        .format(ChangeId(5), None, &no_plugins)
        .unwrap();
        let revisions = info.revisions.unwrap();
        assert_eq!(revisions.len(), 1);
        let current = info.current_revision.unwrap();
        assert_eq!(current, ObjectId::from_bytes([0xbb; 20]).to_hex());
        assert_eq!(revisions[&current].commit.as_ref().unwrap().subject, "Add parser");
        assert!(revisions[&current].files.is_none());

        let info = json(
            &f,
            &[ListChangesOption::AllRevisions, ListChangesOption::CurrentFiles],
        )
        .format(ChangeId(5), None, &no_plugins)
        .unwrap();
        let revisions = info.revisions.unwrap();
        let numbers: Vec<u32> = revisions.values().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert!(revisions[0].files.is_none());
        let files = revisions[1].files.as_ref().unwrap();
        assert_eq!(files["src/parse.rs"].lines_inserted, Some(24));
        assert_eq!(files["README"].lines_deleted, None);
    }

    #[test]
    fn labels_only_count_current_patch_set() {
        let f = fixture();
        let info = json(&f, &[ListChangesOption::Labels, ListChangesOption::Submittable])
            .format(ChangeId(5), None, &no_plugins)
            .unwrap();
        let labels = info.labels.unwrap();
        assert_eq!(labels["Code-Review"].approved.as_ref().unwrap().account_id, f.owner);
        assert!(labels["Code-Review"].rejected.is_none());
        assert!(labels["Code-Review"].all.is_none());
        assert!(labels["Verified"].approved.is_some());
        assert_eq!(info.submittable, Some(true));

        let info = json(&f, &[ListChangesOption::DetailedLabels])
            .format(ChangeId(5), None, &no_plugins)
            .unwrap();
        let all = info.labels.unwrap()["Code-Review"].all.clone().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value, 2);
    }

    #[test]
    fn detailed_accounts_messages_and_skip_diffstat() {
        let f = fixture();
        let info = json(
            &f,
            &[
                ListChangesOption::DetailedAccounts,
                ListChangesOption::Messages,
                ListChangesOption::SkipDiffstat,
            ],
        )
        .format(ChangeId(5), None, &no_plugins)
        .unwrap();
        assert_eq!(info.owner.name.as_deref(), Some("Change Owner"));
        assert_eq!(info.insertions, None);
        let messages = info.messages.unwrap();
        assert_eq!(messages[0].revision_number, Some(1));
        assert_eq!(
            messages[0].author.as_ref().unwrap().email.as_deref(),
            Some("owner@example.com")
        );
    }

    #[test]
    fn meta_pins_an_older_snapshot() {
        let f = fixture();
        let info = json(&f, &[ListChangesOption::AllRevisions])
            .format(ChangeId(5), Some(f.first_meta), &no_plugins)
            .unwrap();
        assert_eq!(info.meta_rev_id, f.first_meta.to_hex());
        assert_eq!(info.revisions.unwrap().len(), 1);

        let err = json(&f, &[])
            .format(ChangeId(5), Some(ObjectId::from_bytes([7; 20])), &no_plugins)
            .unwrap_err();
        assert!(matches!(err, ApiError::PreconditionFailed(_)));
    }

    #[test]
    fn plugin_contributions_are_embedded() {
        let f = fixture();
        let callback = |changes: &[ChangeState]| {
            let mut out = Contributions::new();
            for c in changes {
                out.entry(c.id)
                    .or_default()
                    .push(PluginDefinedInfo::failure("demo"));
            }
            out
        };
        let info = json(&f, &[]).format(ChangeId(5), None, &callback).unwrap();
        assert_eq!(info.plugins.unwrap()[0].name, "demo");
    }
}
