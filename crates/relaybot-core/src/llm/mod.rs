//! Generative backend abstraction for relaybot.

pub mod backend;
