pub mod channels;
pub mod dispatcher;
pub mod log;
pub mod sender;
pub mod templates;

pub use channels::{available_channels, plan_channels, recipient_for};
pub use dispatcher::NotificationDispatcher;
pub use log::{InMemoryNotificationLog, NotificationLog, SupabaseNotificationLog};
pub use sender::{ChannelSender, LogSender};
pub use templates::render;
