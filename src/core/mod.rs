//! Core utilities shared across the streaming engine.

mod mt_resource;

pub use mt_resource::MtResource;
