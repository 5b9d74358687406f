//! Sub-sample peak refinement.

pub(crate) mod quad1d;
