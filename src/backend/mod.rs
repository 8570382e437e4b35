//! Task server: the HTTP record store the board engine talks to.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────────┐  HTTP   ┌─────────────────────────────────────────────┐
//! │ HttpGateway  │ ──────> │  server.rs  (axum Router, ServerConfig)     │
//! │ (board/http) │ <────── │    └─ api.rs  (route handlers, AppState)    │
//! └──────────────┘         │         │                                   │
//!                          │         │ DbHandle::call()                  │
//!                          │         v                                   │
//!                          │  db.rs  (TaskDb over rusqlite)              │
//!                          └─────────────────────────────────────────────┘
//! ```
//!
//! ## Routes
//!
//! | Method | Path                   | Result                          |
//! |--------|------------------------|---------------------------------|
//! | GET    | `/health`              | `ok`                            |
//! | GET    | `/api/tasks`           | every task record               |
//! | POST   | `/api/tasks`           | 201 with the created record     |
//! | GET    | `/api/tasks/{id}`      | one record or 404               |
//! | PUT    | `/api/tasks/{id}`      | 204, 400 on id mismatch, or 404 |
//! | DELETE | `/api/tasks/{id}`      | 204 or 404                      |
//! | GET    | `/api/columns/order`   | `{ordered_column_ids}`          |
//! | PUT    | `/api/columns/order`   | 204, 400 unless a permutation   |
//!
//! Error bodies are always `{"error": "<message>"}`.

pub mod api;
pub mod db;
pub mod server;
