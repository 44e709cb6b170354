pub mod app;
pub mod input;
pub mod message;
pub mod message_list;
pub mod toast;

pub use app::App;
pub use input::InputWidget;
pub use message::ChatMessage;
pub use message_list::MessageList;
pub use toast::Toast;
