//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled                                       |
//! |----------|--------------------------------------------------------|
//! | `serve`  | `Serve`                                                |
//! | `board`  | `Board`, `Add`, `Edit`, `Move`, `Rm`, `MoveColumn`     |
//! | `config` | `Config`                                               |

pub mod board;
pub mod config;
pub mod serve;

pub use board::{cmd_add, cmd_board, cmd_edit, cmd_move, cmd_move_column, cmd_rm};
pub use config::cmd_config;
pub use serve::cmd_serve;
