mod functions;
mod machine;
mod runner;
mod variables;

pub use functions::Function;
pub use machine::{Evaluation, Step};
pub use runner::run_interactive;
pub use variables::{MapVariables, Variables};
