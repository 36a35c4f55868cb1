pub mod ballot_box;
pub mod lifecycle;
pub mod quorum;
pub mod representation;
pub mod snapshot_service;
pub mod substitution;
pub mod tabulator;

#[cfg(test)]
pub(crate) mod test_support;

pub use ballot_box::{find_member_by_token, online_submission, validate_submission, BallotBox};
pub use quorum::evaluate;
pub use representation::{
    represented_members, resolve_delegate, resolve_voter, set_override,
    validate_permanent_delegate,
};
pub use snapshot_service::{SnapshotService, VoteSnapshot};
pub use substitution::{render_invitations, substitute, SubstitutionContext};
pub use tabulator::{percentage, tabulate};
