//! Multi-hop conversion tests
//!
//! Each test builds a source export on disk, runs a chain over it and checks
//! the diff verdict together with the pieces of the final snapshot the
//! scenario is about.

mod fidelity;
mod scenarios;
