//! Shared test harness: mock SSE backend and in-process collaborators

#![allow(dead_code)]

pub mod collab;
pub mod mock_llm;
