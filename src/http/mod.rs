//! HTTP action-dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, RequestContext)
//!     → middleware/cors.rs (OPTIONS short-circuit, CORS headers)
//!     → dispatcher.rs (route lookup, action invocation)
//!         → params.rs / multipart.rs (query, body, uploads)
//!         → response.rs (JSON, XML, raw, file)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod middleware;
pub mod multipart;
pub mod params;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::{DispatchError, DispatchState};
pub use multipart::UploadedFile;
pub use params::{ExtractError, ExtractOptions, Param, Params};
pub use request::{RequestContext, X_REQUEST_ID};
pub use response::{EncodeError, ResponseEncoder};
pub use server::HttpServer;
