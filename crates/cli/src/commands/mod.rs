pub mod ask;
pub mod chat;
pub mod docs;
pub mod doctor;
pub mod init;
pub mod runtime;
