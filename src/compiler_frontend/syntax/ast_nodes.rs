use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub location: TextLocation,
}

impl Stmt {
    pub fn new(kind: StmtKind, location: TextLocation) -> Stmt {
        Stmt { kind, location }
    }

    /// Statements that end the current block unconditionally
    pub fn is_unconditional_exit(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::Return(_)
                | StmtKind::Raise(_)
                | StmtKind::Break
                | StmtKind::Continue
                | StmtKind::ExitInline(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StmtKind {
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    Return(Option<Expr>),
    Delete(Vec<Expr>),

    // a = b = value
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },

    AugAssign {
        target: Expr,
        op: BinaryOperator,
        value: Expr,
    },

    For(ForLoop),

    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },

    // An elif chain is a nested If as the only statement of orelse
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },

    With {
        items: Vec<WithItem>,
        body: Vec<Stmt>,
    },

    Raise(Option<Expr>),
    Try(TryBlock),

    Assert {
        test: Expr,
        msg: Option<Expr>,
    },

    Global(Vec<String>),
    Nonlocal(Vec<String>),
    Expr(Expr),
    Pass,
    Break,
    Continue,

    /// The spliced body of an inlined call.
    /// Runs once; ExitInline with the same label jumps to its end.
    InlineBlock {
        label: String,
        body: Vec<Stmt>,
    },
    ExitInline(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDef {
    pub name: String,
    pub params: Parameters,
    pub body: Vec<Stmt>,
    pub decorators: Vec<Expr>,
    pub location: TextLocation,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Parameters {
    pub positional: Vec<Parameter>,
    pub vararg: Option<String>,
    pub keyword_only: Vec<Parameter>,
    pub kwarg: Option<String>,
}

impl Parameters {
    /// Every name the signature binds, in declaration order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.positional.iter().map(|p| p.name.as_str()).collect();
        if let Some(vararg) = &self.vararg {
            names.push(vararg);
        }
        names.extend(self.keyword_only.iter().map(|p| p.name.as_str()));
        if let Some(kwarg) = &self.kwarg {
            names.push(kwarg);
        }
        names
    }

    pub fn iter_with_defaults(&self) -> impl Iterator<Item = &Parameter> {
        self.positional.iter().chain(self.keyword_only.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDef {
    pub name: String,
    pub bases: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub decorators: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForLoop {
    pub target: Expr,
    pub iter: Expr,
    pub body: Vec<Stmt>,
    pub orelse: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithItem {
    pub context: Expr,
    pub target: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TryBlock {
    pub body: Vec<Stmt>,
    pub handlers: Vec<ExceptHandler>,
    pub orelse: Vec<Stmt>,
    pub finalbody: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceptHandler {
    pub exception: Option<Expr>,
    pub name: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Constant(Constant),
    Name(String),

    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Set(Vec<Expr>),

    // A None key is a **splat of the value
    Dict(Vec<(Option<Expr>, Expr)>),

    Attribute {
        value: Box<Expr>,
        attr: String,
    },

    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
    },

    // Only valid as a subscript index
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },

    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
    },

    // *value in a call or display
    Starred(Box<Expr>),

    BinOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },

    BoolOp {
        op: BoolOperator,
        values: Vec<Expr>,
    },

    // a < b <= c
    Compare {
        left: Box<Expr>,
        ops: Vec<CompareOperator>,
        comparators: Vec<Expr>,
    },

    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },

    Yield(Option<Box<Expr>>),
}

impl Expr {
    pub fn name(name: &str) -> Expr {
        Expr::Name(name.to_owned())
    }

    pub fn string(value: &str) -> Expr {
        Expr::Constant(Constant::Str(value.to_owned()))
    }

    pub fn int(value: i64) -> Expr {
        Expr::Constant(Constant::Int(value))
    }

    pub fn subscript(value: Expr, index: Expr) -> Expr {
        Expr::Subscript {
            value: Box::new(value),
            index: Box::new(index),
        }
    }

    pub fn call(func: Expr, args: Vec<Expr>) -> Expr {
        Expr::Call {
            func: Box::new(func),
            args,
            keywords: Vec::new(),
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Expr::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Names, attribute chains and subscripts read existing storage.
    /// Everything else computes a new value.
    pub fn is_storage_read(&self) -> bool {
        matches!(
            self,
            Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keyword {
    // None for a **splat
    pub name: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Modulus,
    Exponent,
    ShiftLeft,
    ShiftRight,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::FloorDivide => "//",
            BinaryOperator::Modulus => "%",
            BinaryOperator::Exponent => "**",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOperator {
    Negative,
    Positive,
    Invert,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BoolOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CompareOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOperator::Equal => "==",
            CompareOperator::NotEqual => "!=",
            CompareOperator::LessThan => "<",
            CompareOperator::LessThanOrEqual => "<=",
            CompareOperator::GreaterThan => ">",
            CompareOperator::GreaterThanOrEqual => ">=",
            CompareOperator::In => "in",
            CompareOperator::NotIn => "not in",
            CompareOperator::Is => "is",
            CompareOperator::IsNot => "is not",
        }
    }
}
