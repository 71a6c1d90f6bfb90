pub mod dispatcher;
pub mod queue;
pub mod telegram;
pub mod templates;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use queue::{NotificationJob, enqueue_notification, notify_later};
pub use telegram::{DeliveryError, DisabledSender, MessageSender, TelegramClient};
