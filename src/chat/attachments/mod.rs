//! Attachment sources and embeddable data references.

pub mod data_url;
pub mod source;

pub use data_url::DataUrl;
pub use source::{AttachmentFuture, AttachmentSource, FileAttachment};
