mod client;
mod dto;
mod graph;

pub use client::ApiClient;
pub use dto::{
    CyData, EntityDto, EvidenceDto, InteractionElements, LinkDto, NodeDto, SubgraphDto,
};
pub use graph::{Category, Polarity};
