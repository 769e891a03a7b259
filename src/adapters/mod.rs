//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements    | Connects to                    |
//! |----------------|---------------|--------------------------------|
//! | `http_backend` | Backend       | Remote collector (HTTP/JSON)   |
//! | `camera`       | ImageCapture  | `raspistill` / a fixed picture |
//!
//! Water level sensors live in [`crate::sensors`].

pub mod camera;
pub mod http_backend;
