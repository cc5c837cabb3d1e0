mod build;
mod interaction;
mod view;

pub(in crate::app) use build::reconcile_subgraph;
pub(in crate::app) use interaction::PairSelection;
