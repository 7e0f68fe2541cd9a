//! Mid-level IR for the boson configuration engine.
//!
//! The MIR is lossy: it keeps what the lowering passes need and nothing
//! else. A program is a control-flow graph of basic blocks over a single
//! [`object::Object`] value type; the pass pipeline in [`lower`] rewrites
//! the graph until all configuration-time computation is gone and a flat
//! list of build artifacts remains. See `boson_backend` for what happens
//! after that.

pub mod arguments;
pub mod ast_to_mir;
pub mod cfg;
pub mod error;
pub mod lower;
pub mod machines;
pub mod object;
pub mod passes;
pub mod process;
pub mod state;
pub mod toolchains;
pub mod version;

pub use ast_to_mir::lower_ast;
pub use cfg::{Cfg, CfgNode, NodeId};
pub use error::{LowerError, LowerResult};
pub use lower::{collect_errors, flat_instructions, lower, lower_pipeline};
pub use object::{Instruction, Object, Variable};
pub use state::Persistant;
