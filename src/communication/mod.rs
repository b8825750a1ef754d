pub mod dispatch;
pub mod messages;
pub mod synthesizer;

pub use dispatch::{dispatch_all, ConsoleSink, Destination, DeliveryReceipt, DispatchError, NotificationSink};
pub use messages::MessageTemplates;
pub use synthesizer::{synthesize_communications, ResponsibleParties};
