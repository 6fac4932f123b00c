//! Core business logic - framework-agnostic parsing, drafts, ledger, reports and codes.

/// Draft coordinator: carries incomplete entries across messages
pub mod draft;
/// Entry types shared by the parser, drafts and ledger
pub mod entry;
/// AI-assisted extraction used when the rule engine finds no intent
pub mod extractor;
/// Redelivery de-duplication of inbound messages
pub mod inbound;
/// Lightweight Spanish detection
pub mod language;
/// Append-only ledger of committed transactions
pub mod ledger;
/// One-time passcode issuance and verification
pub mod otp;
/// Free-text entry parser (rules first, AI second)
pub mod parser;
/// Weekly, monthly and annual summaries
pub mod report;
/// User lookup, creation and the per-user lock
pub mod user;
