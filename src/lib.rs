//! AskMe - a question and answer forum
//!
//! This library provides the storage, services and server-rendered pages
//! of the AskMe forum.

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
pub mod web;
