//! Email ingestion: RFC822 parsing helpers and the polling loop.

pub mod message;
pub mod poller;
