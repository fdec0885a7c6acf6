// Domain layer: core models and ports (interfaces). No storage or file-format crates here.

pub mod model;
pub mod ports;
pub mod weekend_manager;
