//! Layout and compliance logic for modular space-habitat designs.
//!
//! This crate contains everything that decides where modules go inside a
//! cylindrical habitat and how well the result scores, with no server,
//! network or model dependency. Functions take plain data and return
//! results, so the same code backs a web handler, the headless harness and
//! the tests.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`catalog`] | Module types, zones, noise levels and their fixed rule tables |
//! | [`collaborator`] | Optional external layout proposer: session, prompts, parsing |
//! | [`completion`] | Adds missing mandatory modules and crew sleep quarters |
//! | [`compliance`] | Habitability rubric: score, issues, bands, recommendations |
//! | [`error`] | Boundary error taxonomy |
//! | [`governor`] | Call-rate governor with injectable clock |
//! | [`layout`] | Deterministic zone-aware placement with collision avoidance |
//! | [`module`] | Data model: modules, habitat envelope, request payload |
//! | [`orchestrator`] | Composes the above into one response, with fallback |
//! | [`report`] | Response shapes |

pub mod catalog;
pub mod collaborator;
pub mod completion;
pub mod compliance;
pub mod error;
pub mod governor;
pub mod layout;
pub mod module;
pub mod orchestrator;
pub mod report;
