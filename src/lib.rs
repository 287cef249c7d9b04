//! `eml2pdf` — convert EML email files into paginated PDF documents.
//!
//! This crate provides the core library for parsing EML messages (headers,
//! multipart bodies, attachments) into a [`model::ParsedMessage`] and
//! rendering that record as an A4 PDF with an attachment inventory table.
//! A small axum HTTP service exposes the same pipeline for browser uploads.

pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;
pub mod server;
