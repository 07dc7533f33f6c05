//! Telegram Bot API transport.
//!
//! [`TelegramClient`] implements the
//! [`ChatTransport`](relaybot_core::message::transport::ChatTransport) port and
//! adds the long-polling calls the binary's update loop needs. Raw updates are
//! converted to [`InboundEvent`](relaybot_types::event::InboundEvent) with
//! [`Update::into_event`].

pub mod client;
pub mod types;

pub use client::TelegramClient;
pub use types::Update;
