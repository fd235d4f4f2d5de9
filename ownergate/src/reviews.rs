use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::Error;

/// Review states a hosting platform reports for a submitted review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Dismissed,
    Commented,
}

impl FromStr for ReviewState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "approved" => Ok(ReviewState::Approved),
            "changes_requested" | "changes-requested" => Ok(ReviewState::ChangesRequested),
            "dismissed" => Ok(ReviewState::Dismissed),
            "commented" => Ok(ReviewState::Commented),
            _ => Err(Error::config(format!("unknown review state `{s}`"))),
        }
    }
}

/// One review event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub reviewer: String,
    pub state: ReviewState,
}

impl Review {
    pub fn new(reviewer: impl Into<String>, state: ReviewState) -> Self {
        Self {
            reviewer: reviewer.into(),
            state,
        }
    }
}

/// Reduce an ordered review log to the distinct, sorted set of users whose
/// latest state is an approval.
///
/// Only a reviewer's most recent non-comment event counts: an approval stands
/// until the same reviewer later requests changes or has the approval
/// dismissed, while comments leave the standing state untouched.
pub fn approvers_from_reviews(reviews: &[Review]) -> Vec<String> {
    let mut approvers = BTreeSet::new();
    for review in reviews {
        match review.state {
            ReviewState::Approved => {
                approvers.insert(review.reviewer.clone());
            }
            ReviewState::Commented => {}
            ReviewState::ChangesRequested | ReviewState::Dismissed => {
                approvers.remove(&review.reviewer);
            }
        }
    }
    approvers.into_iter().collect()
}
