//! Content-addressed meta ids for change snapshots using blake3.
//!
//! A snapshot id commits to its parent id and the canonical JSON of the
//! change state, so the chain of ids forms a linear history: changing any
//! field, or any earlier snapshot, changes every later id.
//!
//! `ChangeState` contains no maps, so `serde_json::to_vec` is deterministic.

use critic_core::id::OBJECT_ID_LEN;
use critic_core::{ChangeState, ObjectId};

use crate::error::StorageError;

/// Computes the meta id of `state` recorded on top of `parent`.
///
/// The id is the first 20 bytes of the blake3 extendable output.
pub fn compute_meta_id(
    parent: Option<ObjectId>,
    state: &ChangeState,
) -> Result<ObjectId, StorageError> {
    let mut hasher = blake3::Hasher::new();
    match parent {
        Some(p) => {
            hasher.update(&[1]);
            hasher.update(p.as_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
    hasher.update(&serde_json::to_vec(state)?);

    let mut out = [0u8; OBJECT_ID_LEN];
    hasher.finalize_xof().fill(&mut out);
    Ok(ObjectId::from_bytes(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use critic_core::{AccountId, ChangeId, ChangeStatus};

    fn state(subject: &str) -> ChangeState {
        ChangeState {
            id: ChangeId(7),
            project: "tools".into(),
            branch: "main".into(),
            change_key: "I0000000000000000000000000000000000000007".into(),
            subject: subject.into(),
            status: ChangeStatus::New,
            owner: AccountId(1000),
            topic: None,
            hashtags: vec![],
            created: 1,
            updated: 1,
            patch_sets: vec![],
            approvals: vec![],
            messages: vec![],
        }
    }

    #[test]
    fn meta_id_is_deterministic() {
        let a = compute_meta_id(None, &state("x")).unwrap();
        let b = compute_meta_id(None, &state("x")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), 40);
    }

    #[test]
    fn meta_id_depends_on_content() {
        let a = compute_meta_id(None, &state("x")).unwrap();
        let b = compute_meta_id(None, &state("y")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn meta_id_depends_on_parent() {
        let root = compute_meta_id(None, &state("x")).unwrap();
        let child = compute_meta_id(Some(root), &state("x")).unwrap();
        assert_ne!(root, child);
    }
}
