use thiserror::Error;

/// Reasons the engine declines to inline a call.
///
/// Messages are meant to be shown to users as they are.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InlineError {
    #[error("cannot inline {callee}: function has no body")]
    NoBody { callee: String },
    #[error("cannot inline {callee}: {statements} statements exceed the limit of {limit}")]
    TooLarge {
        callee: String,
        statements: usize,
        limit: usize,
    },
    #[error("cannot parse declaration of {callee}: {message}")]
    Parse { callee: String, message: String },
    #[error("no call expression at offset {offset}")]
    CallNotFound { offset: u32 },
    #[error("call does not refer to {callee}")]
    WrongCallee { callee: String },
    #[error("cannot inline call to {callee} within its own body")]
    Recursive { callee: String },
    #[error("cannot inline call to {callee}: body refers to inaccessible {name}")]
    Inaccessible { callee: String, name: String },
    #[error("cannot inline call to {callee}: reference to {name} is shadowed at the call site")]
    Shadowed { callee: String, name: String },
    #[error("cannot inline call to {callee}: package {path} cannot be imported from {from}")]
    ImportForbidden {
        callee: String,
        path: String,
        from: String,
    },
    #[error("cannot inline call to {callee}: dot import of {path} in the caller's file")]
    DotImport { callee: String, path: String },
    #[error("cannot inline call to {callee} without wrapping its body in a function literal")]
    LiteralizationRequired { callee: String },
    #[error("cannot inline call to {callee}: {reason}")]
    Unsupported { callee: String, reason: String },
    #[error("cannot inline call to {callee}: {args} arguments for {params} parameters")]
    Arity {
        callee: String,
        args: usize,
        params: usize,
    },
}
