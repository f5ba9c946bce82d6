//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (accept, one task per connection)
//!     → reader.rs (accumulate until header + Content-Length body are in)
//!     → request.rs (request line, headers, query)
//!     → [routing layer picks a handler by confidence]
//!     → response.rs (status line, fixed headers, body)
//!     → writer.rs (send in bounded chunks, then close)
//! ```

pub mod reader;
pub mod request;
pub mod response;
pub mod server;
pub mod writer;

pub use reader::{ConnectionReader, Progress, RawRequest, ReadError, ReaderState};
pub use request::{FramingError, Method, ParsedRequest};
pub use response::Response;
pub use server::Server;
pub use writer::{ConnectionWriter, WriterState};
