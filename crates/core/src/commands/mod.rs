pub mod argument;
pub mod argument_node;
pub mod autocomplete;
pub mod builtin;
pub mod cause;
pub mod context;
pub mod description;
pub mod dispatcher;
pub mod error;
pub mod node;
pub mod parameter;
pub mod reader;
pub mod registrar;
pub mod registry;
pub mod tree;
pub mod usage;
pub mod value;

pub use argument::ArgumentType;
pub use cause::CommandCause;
pub use context::{CommandContext, CommandContextBuilder};
pub use dispatcher::CommandDispatcher;
pub use error::{CommandError, CommandResult};
pub use node::CommandBuilder;
pub use parameter::Parameter;
pub use reader::ArgumentReader;
pub use registrar::{ParameterizedCommand, RawCommand};
pub use registry::{CommandManager, CommandMapping, PluginId, SharedCommandManager};
