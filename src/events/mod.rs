pub mod domain;
pub mod repository;
pub mod service;

pub use domain::{EventFilter, EventStatus};
pub use service::EventDto;
