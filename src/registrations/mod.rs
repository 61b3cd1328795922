pub mod domain;
pub mod repository;
pub mod service;

pub use domain::{RegistrationFilter, RegistrationStatus};
pub use service::RegistrationDto;
