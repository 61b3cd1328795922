pub mod domain;
pub mod repository;
pub mod service;

pub use domain::ReactionType;
pub use service::PostDto;
