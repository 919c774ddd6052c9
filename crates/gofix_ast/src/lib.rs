pub mod cursor;
pub mod nodes;
pub mod printer;
pub mod visitor;

pub use cursor::{NodeId, NodeRef, SyntaxIndex};
pub use nodes::{
    AssignOp, BinaryOp, Block, BranchKind, CaseClause, ChanDir, CommentGroup, Decl, DeclKind,
    Expr, Field, FieldList, File, FuncDecl, FuncType, GenDecl, Ident, ImportSpec, LitKind, Node,
    Spec, Statement, TypeSpec, UnaryOp, ValueSpec, is_exported,
};
pub use visitor::{Visitor, VisitorMut};
