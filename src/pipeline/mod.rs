pub mod clinicians;
pub mod critical_care;
pub mod discharge;
pub mod evolution;
pub mod matcher;
pub mod normalize;
pub mod orchestrator; // Engine: runs every stage over one document
pub mod patient;
pub mod surgery;
pub mod temporal;
pub mod text;
pub mod timeline;

pub use orchestrator::AuditEngine;
