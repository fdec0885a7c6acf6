pub mod pipelines;
pub mod weekend_manager;
