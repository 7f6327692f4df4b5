//! News Aggregator - RSS feeds merged with AI-generated summaries
//!
//! This crate fetches RSS/Atom feeds grouped by category, normalizes entries into
//! a common article shape, and answers search queries through a fallback chain:
//! AI search first, then keyword matching over RSS, then the most recent articles.

pub mod aggregator;
pub mod ai;
pub mod article;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod registry;
pub mod routes;
