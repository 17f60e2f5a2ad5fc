//! Output options controlling which optional fields a formatted change
//! includes.
//!
//! Every [`ListChangesOption`] owns a fixed bit. Clients either name options
//! one by one (`-o LABELS -o MESSAGES`) or pass the packed bitmask in hex
//! (`-O 201`). Both forms combine by union into an [`OptionSet`].

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::CoreError;

/// A named output option with a stable bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListChangesOption {
    Labels,
    CurrentRevision,
    AllRevisions,
    CurrentCommit,
    AllCommits,
    CurrentFiles,
    AllFiles,
    DetailedAccounts,
    DetailedLabels,
    Messages,
    CurrentActions,
    Reviewed,
    DraftComments,
    DownloadCommands,
    WebLinks,
    Check,
    ChangeActions,
    CommitFooters,
    PushCertificates,
    ReviewerUpdates,
    Submittable,
    TrackingIds,
    SkipMergeable,
    SkipDiffstat,
}

impl ListChangesOption {
    /// All options in bit order.
    pub const ALL: [ListChangesOption; 24] = [
        ListChangesOption::Labels,
        ListChangesOption::CurrentRevision,
        ListChangesOption::AllRevisions,
        ListChangesOption::CurrentCommit,
        ListChangesOption::AllCommits,
        ListChangesOption::CurrentFiles,
        ListChangesOption::AllFiles,
        ListChangesOption::DetailedAccounts,
        ListChangesOption::DetailedLabels,
        ListChangesOption::Messages,
        ListChangesOption::CurrentActions,
        ListChangesOption::Reviewed,
        ListChangesOption::DraftComments,
        ListChangesOption::DownloadCommands,
        ListChangesOption::WebLinks,
        ListChangesOption::Check,
        ListChangesOption::ChangeActions,
        ListChangesOption::CommitFooters,
        ListChangesOption::PushCertificates,
        ListChangesOption::ReviewerUpdates,
        ListChangesOption::Submittable,
        ListChangesOption::TrackingIds,
        ListChangesOption::SkipMergeable,
        ListChangesOption::SkipDiffstat,
    ];

    /// Bit position of this option in the packed `-O` form.
    pub fn bit(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            ListChangesOption::Labels => "LABELS",
            ListChangesOption::CurrentRevision => "CURRENT_REVISION",
            ListChangesOption::AllRevisions => "ALL_REVISIONS",
            ListChangesOption::CurrentCommit => "CURRENT_COMMIT",
            ListChangesOption::AllCommits => "ALL_COMMITS",
            ListChangesOption::CurrentFiles => "CURRENT_FILES",
            ListChangesOption::AllFiles => "ALL_FILES",
            ListChangesOption::DetailedAccounts => "DETAILED_ACCOUNTS",
            ListChangesOption::DetailedLabels => "DETAILED_LABELS",
            ListChangesOption::Messages => "MESSAGES",
            ListChangesOption::CurrentActions => "CURRENT_ACTIONS",
            ListChangesOption::Reviewed => "REVIEWED",
            ListChangesOption::DraftComments => "DRAFT_COMMENTS",
            ListChangesOption::DownloadCommands => "DOWNLOAD_COMMANDS",
            ListChangesOption::WebLinks => "WEB_LINKS",
            ListChangesOption::Check => "CHECK",
            ListChangesOption::ChangeActions => "CHANGE_ACTIONS",
            ListChangesOption::CommitFooters => "COMMIT_FOOTERS",
            ListChangesOption::PushCertificates => "PUSH_CERTIFICATES",
            ListChangesOption::ReviewerUpdates => "REVIEWER_UPDATES",
            ListChangesOption::Submittable => "SUBMITTABLE",
            ListChangesOption::TrackingIds => "TRACKING_IDS",
            ListChangesOption::SkipMergeable => "SKIP_MERGEABLE",
            ListChangesOption::SkipDiffstat => "SKIP_DIFFSTAT",
        }
    }

    /// Looks up an option by name, ignoring ASCII case.
    pub fn from_name(token: &str) -> Option<ListChangesOption> {
        Self::ALL
            .iter()
            .copied()
            .find(|o| o.name().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for ListChangesOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bits that have an option assigned.
const DEFINED_BITS: u64 = (1u64 << ListChangesOption::ALL.len()) - 1;

/// A set of output options, stored as a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OptionSet {
    bits: u64,
}

impl OptionSet {
    pub fn new() -> Self {
        OptionSet::default()
    }

    pub fn of(options: &[ListChangesOption]) -> Self {
        let mut set = OptionSet::new();
        for &o in options {
            set.insert(o);
        }
        set
    }

    /// Adds an option. Adding an option already present is a no-op.
    pub fn insert(&mut self, option: ListChangesOption) {
        self.bits |= 1 << option.bit();
    }

    pub fn contains(&self, option: ListChangesOption) -> bool {
        self.bits & (1 << option.bit()) != 0
    }

    pub fn union(&self, other: &OptionSet) -> OptionSet {
        OptionSet {
            bits: self.bits | other.bits,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Iterates the options in bit order.
    pub fn iter(&self) -> impl Iterator<Item = ListChangesOption> + '_ {
        ListChangesOption::ALL
            .iter()
            .copied()
            .filter(move |o| self.contains(*o))
    }

    /// Decodes a packed bitmask. Bits without an assigned option are
    /// rejected rather than ignored.
    pub fn from_bits(bits: u64) -> Result<OptionSet, CoreError> {
        let undefined = bits & !DEFINED_BITS;
        if undefined != 0 {
            return Err(CoreError::UndefinedOptionBits { bits: undefined });
        }
        Ok(OptionSet { bits })
    }

    pub fn to_bits(&self) -> u64 {
        self.bits
    }

    /// Builds a set from repeated `-o` tokens.
    pub fn parse_flags<I, S>(tokens: I) -> Result<OptionSet, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = OptionSet::new();
        for token in tokens {
            let token = token.as_ref();
            let option =
                ListChangesOption::from_name(token).ok_or_else(|| CoreError::UnknownOption {
                    token: token.to_string(),
                })?;
            set.insert(option);
        }
        Ok(set)
    }

    /// Builds a set from the hex form of the packed bitmask. An optional
    /// `0x` prefix is tolerated.
    pub fn parse_hex(hex: &str) -> Result<OptionSet, CoreError> {
        let trimmed = hex.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bits = u64::from_str_radix(digits, 16).map_err(|_| CoreError::InvalidOptionHex {
            value: hex.to_string(),
        })?;
        OptionSet::from_bits(bits)
    }
}

impl FromIterator<ListChangesOption> for OptionSet {
    fn from_iter<T: IntoIterator<Item = ListChangesOption>>(iter: T) -> Self {
        let mut set = OptionSet::new();
        for o in iter {
            set.insert(o);
        }
        set
    }
}

impl Serialize for OptionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(ListChangesOption::name))
    }
}
