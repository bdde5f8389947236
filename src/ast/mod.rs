//=====================================================
// File: ast.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: ChronoScript Abstract Syntax Tree definitions
// Objective: Define expression, statement, type, and program nodes along
//            with the temporal modifier and flag vocabulary they carry
//=====================================================

use std::fmt;

use crate::source::SourceLocation;

//=====================================================
//            Section 1: Temporal Vocabulary
//=====================================================

/// Determinism modifier attached to declarations and values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Modifier {
    /// CONF: deterministic
    #[default]
    Conf,
    /// REB: probabilistic
    Reb,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Conf => write!(f, "CONF"),
            Modifier::Reb => write!(f, "REB"),
        }
    }
}

/// Behavioural flags introduced with `::` in a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Immutable once a non-nil value is stored.
    Static,
    /// May change across timeline operations.
    Volatile,
    /// Fixed point: survives rewinds and merges untouched.
    Anchor,
    /// Influences several timelines; may carry a distribution.
    Weaver,
    /// Fluctuating value.
    Flux,
    /// Keeps a history of prior values.
    Echo,
}

impl Flag {
    pub const ALL: [Flag; 6] = [
        Flag::Static,
        Flag::Volatile,
        Flag::Anchor,
        Flag::Weaver,
        Flag::Flux,
        Flag::Echo,
    ];

    fn bit(self) -> u8 {
        match self {
            Flag::Static => 1 << 0,
            Flag::Volatile => 1 << 1,
            Flag::Anchor => 1 << 2,
            Flag::Weaver => 1 << 3,
            Flag::Flux => 1 << 4,
            Flag::Echo => 1 << 5,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Flag::Static => "STATIC",
            Flag::Volatile => "VOLATILE",
            Flag::Anchor => "ANCHOR",
            Flag::Weaver => "WEAVER",
            Flag::Flux => "FLUX",
            Flag::Echo => "ECHO",
        };
        f.write_str(name)
    }
}

/// Set of flags without duplicates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FlagSet(u8);

impl FlagSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, flag: Flag) -> bool {
        let fresh = !self.contains(flag);
        self.0 |= flag.bit();
        fresh
    }

    pub fn remove(&mut self, flag: Flag) {
        self.0 &= !flag.bit();
    }

    pub fn contains(&self, flag: Flag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: FlagSet) -> FlagSet {
        FlagSet(self.0 | other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        Flag::ALL.into_iter().filter(|flag| self.contains(*flag))
    }
}

impl FromIterator<Flag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        let mut set = FlagSet::empty();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// The six statement-level temporal operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalOpKind {
    ForChronon,
    WhileEvent,
    RewindFlow,
    BranchTimeline,
    MergeTimelines,
    TemporalEchoLoop,
}

impl fmt::Display for TemporalOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TemporalOpKind::ForChronon => "FOR_CHRONON",
            TemporalOpKind::WhileEvent => "WHILE_EVENT",
            TemporalOpKind::RewindFlow => "REWIND_FLOW",
            TemporalOpKind::BranchTimeline => "BRANCH_TIMELINE",
            TemporalOpKind::MergeTimelines => "MERGE_TIMELINES",
            TemporalOpKind::TemporalEchoLoop => "TEMPORAL_ECHO_LOOP",
        };
        f.write_str(name)
    }
}

//=============================================/*
//  Modifiers, flags and temporal operation kinds shared by parser and runtime.
//============================================*/
//=====================================================
//            Section 2: Types
//=====================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeName {
    Int,
    Float,
    Boolean,
    String,
    Void,
    Array,
    Map,
    Tuple,
    Timestamp,
    QuantumState,
    Named(String),
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Int => write!(f, "INT"),
            TypeName::Float => write!(f, "FLOAT"),
            TypeName::Boolean => write!(f, "BOOLEAN"),
            TypeName::String => write!(f, "STRING"),
            TypeName::Void => write!(f, "VOID"),
            TypeName::Array => write!(f, "ARRAY"),
            TypeName::Map => write!(f, "MAP"),
            TypeName::Tuple => write!(f, "TUPLE"),
            TypeName::Timestamp => write!(f, "TIMESTAMP"),
            TypeName::QuantumState => write!(f, "QUANTUM_STATE"),
            TypeName::Named(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeNode {
    pub name: TypeName,
    pub location: SourceLocation,
}

//=====================================================
//            Section 3: Operators & Literals
//=====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Modulo
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

/// Assignment operator as written; compound forms desugar at evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
}

impl AssignOp {
    /// The binary operator a compound assignment applies, if any.
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubtractAssign => Some(BinaryOp::Subtract),
            AssignOp::MultiplyAssign => Some(BinaryOp::Multiply),
            AssignOp::DivideAssign => Some(BinaryOp::Divide),
            AssignOp::ModuloAssign => Some(BinaryOp::Modulo),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubtractAssign => "-=",
            AssignOp::MultiplyAssign => "*=",
            AssignOp::DivideAssign => "/=",
            AssignOp::ModuloAssign => "%=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
}

//=====================================================
//            Section 4: Expressions
//=====================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal {
        value: Literal,
        location: SourceLocation,
    },
    Variable {
        name: String,
        location: SourceLocation,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Grouping {
        inner: Box<Expr>,
        location: SourceLocation,
    },
    Assign {
        name: String,
        operator: AssignOp,
        value: Box<Expr>,
        location: SourceLocation,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        location: SourceLocation,
    },
}

impl Expr {
    pub fn binary(left: Expr, operator: BinaryOp, right: Expr, location: SourceLocation) -> Self {
        Expr::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            location,
        }
    }

    pub fn location(&self) -> &SourceLocation {
        match self {
            Expr::Literal { location, .. }
            | Expr::Variable { location, .. }
            | Expr::Unary { location, .. }
            | Expr::Binary { location, .. }
            | Expr::Grouping { location, .. }
            | Expr::Assign { location, .. }
            | Expr::Call { location, .. } => location,
        }
    }
}

// Prefix rendering, handy for checking how operators were grouped.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal { value, .. } => match value {
                Literal::Integer(n) => write!(f, "{}", n),
                Literal::Float(n) => write!(f, "{:?}", n),
                Literal::String(s) => write!(f, "{:?}", s),
                Literal::Boolean(true) => write!(f, "TRUE"),
                Literal::Boolean(false) => write!(f, "FALSE"),
            },
            Expr::Variable { name, .. } => write!(f, "{}", name),
            Expr::Unary {
                operator, operand, ..
            } => {
                let symbol = match operator {
                    UnaryOp::Negate => "-",
                    UnaryOp::Not => "!",
                };
                write!(f, "({} {})", symbol, operand)
            }
            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => write!(f, "({} {} {})", operator.symbol(), left, right),
            Expr::Grouping { inner, .. } => write!(f, "(group {})", inner),
            Expr::Assign {
                name,
                operator,
                value,
                ..
            } => write!(f, "({} {} {})", operator.symbol(), name, value),
            Expr::Call {
                callee, arguments, ..
            } => {
                write!(f, "(call {}", callee)?;
                for argument in arguments {
                    write!(f, " {}", argument)?;
                }
                write!(f, ")")
            }
        }
    }
}

//=====================================================
//            Section 5: Statements
//=====================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: String,
    pub type_node: TypeNode,
    pub modifier: Modifier,
    pub flags: FlagSet,
    pub initializer: Option<Expr>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression {
        expr: Expr,
        location: SourceLocation,
    },
    Block(Block),
    VariableDecl(VariableDecl),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        location: SourceLocation,
    },
    TemporalOp {
        kind: TemporalOpKind,
        arguments: Vec<Expr>,
        body: Block,
        location: SourceLocation,
    },
}

impl Stmt {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Stmt::Expression { location, .. } => location,
            Stmt::Block(block) => &block.location,
            Stmt::VariableDecl(decl) => &decl.location,
            Stmt::If { location, .. } => location,
            Stmt::TemporalOp { location, .. } => location,
        }
    }
}

/// Root of every parsed script
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub location: SourceLocation,
}

impl Program {
    pub fn new(statements: Vec<Stmt>, location: SourceLocation) -> Self {
        Self {
            statements,
            location,
        }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

//=====================================================
//            Section 6: Unit Tests
//=====================================================


//=====================================================
// End of file
//=====================================================
