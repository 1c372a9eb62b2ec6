//! The research pipeline: query expansion, search, extraction, report
//! synthesis and persistence over one [`ResearchState`].

pub mod expand;
pub mod persist;
pub mod prompt;
pub mod state;
pub mod workflow;

pub use state::ResearchState;
pub use workflow::{Researcher, Stage};
