//! Client side of the board: the ordered in-memory model, the gateway to
//! the flat task store, and the engine that keeps the two in step.
//!
//! ```text
//! presenter ──ops──> engine.rs (BoardEngine) ──> layout.rs (pure moves)
//!     ^                  │
//!     └──watch::Receiver─┤ RecordGateway trait (gateway.rs)
//!                        ├─ http.rs    HttpGateway (reqwest)
//!                        └─ memory.rs  MemoryGateway (tests)
//! ```
//!
//! | Module    | Responsibility                                           |
//! |-----------|----------------------------------------------------------|
//! | `models`  | `Card`, `Column`, `Board`, `ColumnId`, `TaskRecord`      |
//! | `layout`  | records → board, dense row recomputation, move algorithms |
//! | `gateway` | `RecordGateway` trait and `RemoteError`                  |
//! | `http`    | gateway over the backend's JSON API                      |
//! | `memory`  | in-process gateway with failure injection and holds      |
//! | `engine`  | `BoardEngine`, the only writer of the board              |

pub mod engine;
pub mod gateway;
pub mod http;
pub mod layout;
pub mod memory;
pub mod models;

pub use engine::{BoardEngine, BoardState, LoadOutcome, Mutation};
pub use gateway::{RecordGateway, RemoteError};
pub use http::HttpGateway;
pub use memory::MemoryGateway;
pub use models::{Board, Card, Column, ColumnId, NewTask, TaskRecord};
