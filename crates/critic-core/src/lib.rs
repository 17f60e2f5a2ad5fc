pub mod account;
pub mod change;
pub mod error;
pub mod group;
pub mod id;
pub mod label;
pub mod options;

// Re-export commonly used types
pub use account::{is_valid_username, Account, AuthType};
pub use change::{Approval, ChangeMessage, ChangeState, ChangeStatus, FileStat, PatchSet};
pub use error::CoreError;
pub use group::{GroupDescription, InternalGroup};
pub use id::{AccountId, ChangeId, GroupId, GroupUuid, ObjectId};
pub use label::{LabelType, LabelTypes};
pub use options::{ListChangesOption, OptionSet};
