//! Notice-processing stages and the orchestrator that runs them in order.

pub mod cleaner;
pub mod extract;
pub mod geo;
pub mod ocr;
pub mod runner;
