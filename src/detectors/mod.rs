pub mod ambulatory;
pub mod endoscopy;
pub mod excluded;
pub mod interconsultation;
pub mod studies;

pub use ambulatory::{detect_ambulatory_practices, AmbulatoryDetection};
pub use endoscopy::detect_endoscopies;
pub use excluded::{detect_excluded_practices, ExcludedDetection};
pub use interconsultation::{detect_interconsultations, resolve_specialty};
pub use studies::{detect_studies, StudyDetection};
