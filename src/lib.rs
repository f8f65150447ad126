pub mod api_router;
pub mod audit;
pub mod billing;
pub mod bootstrap;
pub mod compliance;
pub mod config;
pub mod dashboards;
pub mod directory;
pub mod document_types;
pub mod documents;
pub mod error;
pub mod notifications;
pub mod portal;
pub mod shared;
pub mod vendors;
