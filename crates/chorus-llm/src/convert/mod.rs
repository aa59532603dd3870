//! Conversions between canonical and wire representations

pub mod openai;
