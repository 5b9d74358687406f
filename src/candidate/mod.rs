//! Candidate pruning utilities.

pub(crate) mod overlap;
