pub mod session;
pub mod view;

pub use session::ChatSession;
pub use view::MessageView;
