pub mod ai;
pub mod featured_service;
pub mod keep_alive;
pub mod message_service;
pub mod notification_service;
pub mod post_service;
pub mod user_service;
pub mod weather;

pub use featured_service::FeaturedService;
pub use message_service::MessageService;
pub use notification_service::NotificationService;
pub use post_service::PostService;
pub use user_service::UserService;
