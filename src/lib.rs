//! Veritill - Receipt verification for point-of-sale payments
//!
//! This library converts point-of-sale payment events into durable receipt
//! records and exposes them through capability-style share tokens that third
//! parties (customers, merchants, auditors) can use to check purchase
//! authenticity without direct database access.

pub mod confidence;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod extractors;
pub mod handlers;
pub mod id;
pub mod ingest;
pub mod models;
pub mod payments;
pub mod token;
pub mod util;
pub mod verification;
