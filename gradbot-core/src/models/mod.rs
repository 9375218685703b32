pub mod document;
pub mod message;
pub mod notice;

pub use document::{
    accept_attribute, DeleteOutcome, Document, DocumentListing, UploadFile, UploadReceipt,
    ACCEPTED_EXTENSIONS,
};
pub use message::{ChatReply, ChatTurn, Message, Role};
pub use notice::{Notice, NoticeLevel};
