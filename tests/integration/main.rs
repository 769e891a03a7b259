//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the control loops
//! against mock collaborators. All tests run on the host with no sensor,
//! camera or backend required.

mod analyzer_tests;
mod mock_node;
mod node_flow_tests;
