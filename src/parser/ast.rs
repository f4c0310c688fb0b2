//! Abstract Syntax Tree definitions
//!
//! The AST is split into [`Stmt`] and [`Expr`]. Function bodies are shared
//! behind `Rc` so closures created at run time can hold onto their
//! definition without cloning the tree.

use std::fmt;
use std::rc::Rc;

/// Position of a token in the compiled source.
///
/// `offset` is a byte offset into the source text handed to the parser; the
/// diagnostics layer uses it to recover the offending line and caret column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        SourceLocation {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A parsed compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
    /// `var` names declared anywhere in the top-level code (hoisted).
    pub var_names: Vec<String>,
}

/// A function literal or declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    /// `var` names declared in this function's body, excluding nested functions.
    pub var_names: Vec<String>,
    pub location: SourceLocation,
}

/// `var`, `let` or `const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: String,
    pub body: Vec<Stmt>,
}

/// Statements
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl {
        kind: DeclKind,
        declarations: Vec<Declarator>,
        location: SourceLocation,
    },
    FunctionDecl {
        function: Rc<FunctionDef>,
        location: SourceLocation,
    },
    Expression {
        expr: Expr,
        location: SourceLocation,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        location: SourceLocation,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
        location: SourceLocation,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    Block {
        statements: Vec<Stmt>,
        location: SourceLocation,
    },
    Return {
        value: Option<Expr>,
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
    Throw {
        value: Expr,
        location: SourceLocation,
    },
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
        location: SourceLocation,
    },
    Empty {
        location: SourceLocation,
    },
}

impl Stmt {
    pub fn location(&self) -> SourceLocation {
        match self {
            Stmt::VarDecl { location, .. }
            | Stmt::FunctionDecl { location, .. }
            | Stmt::Expression { location, .. }
            | Stmt::If { location, .. }
            | Stmt::While { location, .. }
            | Stmt::DoWhile { location, .. }
            | Stmt::For { location, .. }
            | Stmt::Block { location, .. }
            | Stmt::Return { location, .. }
            | Stmt::Break { location }
            | Stmt::Continue { location }
            | Stmt::Throw { location, .. }
            | Stmt::Try { location, .. }
            | Stmt::Empty { location } => *location,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    BitAnd,
    BitOr,
    BitXor,
    BitShl,
    BitShr,
    BitUShr,
}

/// Short-circuiting operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
}

/// `++` / `--`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

/// Expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64, SourceLocation),
    Str(Rc<str>, SourceLocation),
    Bool(bool, SourceLocation),
    Null(SourceLocation),
    Ident(String, SourceLocation),
    Array(Vec<Expr>, SourceLocation),
    Object(Vec<(String, Expr)>, SourceLocation),
    Function(Rc<FunctionDef>, SourceLocation),
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
        location: SourceLocation,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    /// `target = value` or `target op= value`
    Assign {
        op: Option<BinOp>,
        target: Box<Expr>,
        value: Box<Expr>,
        location: SourceLocation,
    },
    Conditional {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        location: SourceLocation,
    },
    Member {
        object: Box<Expr>,
        property: String,
        location: SourceLocation,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        location: SourceLocation,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    /// Comma operator
    Sequence(Vec<Expr>, SourceLocation),
}

impl Expr {
    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::Number(_, loc)
            | Expr::Str(_, loc)
            | Expr::Bool(_, loc)
            | Expr::Null(loc)
            | Expr::Ident(_, loc)
            | Expr::Array(_, loc)
            | Expr::Object(_, loc)
            | Expr::Function(_, loc)
            | Expr::Sequence(_, loc) => *loc,
            Expr::Unary { location, .. }
            | Expr::Update { location, .. }
            | Expr::Binary { location, .. }
            | Expr::Logical { location, .. }
            | Expr::Assign { location, .. }
            | Expr::Conditional { location, .. }
            | Expr::Member { location, .. }
            | Expr::Index { location, .. }
            | Expr::Call { location, .. } => *location,
        }
    }

    /// Short source-like rendering used in runtime error messages
    /// (`foo.bar is not a function`).
    pub fn describe(&self) -> String {
        match self {
            Expr::Ident(name, _) => name.clone(),
            Expr::Member {
                object, property, ..
            } => format!("{}.{}", object.describe(), property),
            Expr::Index { object, index, .. } => {
                format!("{}[{}]", object.describe(), index.describe())
            }
            Expr::Call { callee, .. } => format!("{}(...)", callee.describe()),
            Expr::Number(n, _) => format!("{}", n),
            Expr::Str(s, _) => format!("{:?}", s),
            Expr::Bool(b, _) => b.to_string(),
            Expr::Null(_) => "null".to_string(),
            _ => "expression".to_string(),
        }
    }
}
