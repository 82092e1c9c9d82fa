//! End-to-end tests driving the `flashcppc` binary directly (§6.1).

mod cli_tests;
mod compilation_tests;