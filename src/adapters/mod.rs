// Adapters layer: concrete implementations for external systems (file system, spreadsheet formats).

pub mod spreadsheet;
pub mod storage;

pub use storage::LocalStorage;
