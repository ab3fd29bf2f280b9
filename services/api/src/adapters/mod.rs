pub mod db;
pub mod local;

pub use db::DbAdapter;
pub use local::LocalFileStore;
