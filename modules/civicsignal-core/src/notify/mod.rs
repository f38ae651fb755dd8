//! Multi-channel notification delivery: message templates, channel
//! providers, the fan-out dispatcher and the durable scheduler.

pub mod dispatcher;
pub mod gateway;
pub mod noop;
pub mod provider;
pub mod scheduler;
pub mod template;

pub use dispatcher::{BulkOutcome, Dispatcher};
pub use gateway::{PushGateway, SmsGateway};
pub use noop::NoopProvider;
pub use provider::{ChannelProvider, RenderedMessage};
pub use scheduler::Scheduler;
pub use template::TemplateRegistry;
