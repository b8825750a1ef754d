pub mod audit;
pub mod care;
pub mod enums;
pub mod events;
pub mod finding;
pub mod patient;
pub mod stay;
pub mod study;
pub mod surgery;

pub use audit::*;
pub use care::*;
pub use events::*;
pub use finding::*;
pub use patient::*;
pub use stay::*;
pub use study::*;
pub use surgery::*;
