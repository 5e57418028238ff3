use smol_str::SmolStr;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// An operator or method the compiler cannot translate.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(SmolStr),
    #[error("expected {expected} value(s) but {found} were supplied")]
    ArgumentCountMismatch { expected: usize, found: usize },
    #[error("value {index} has no matching {{{index}}} placeholder in the template")]
    MissingPlaceholder { index: usize },
    #[error("no candidate values supplied for `{0}`")]
    EmptyCollection(SmolStr),
    #[error("predicate has no condition to compile")]
    EmptyPredicate,
    /// The predicate folded to `false`, no row can match.
    #[error("predicate is always false")]
    ContradictoryPredicate,
    /// Placeholder and argument counts disagree after coercion, a compiler bug.
    #[error("contract violation: {0}")]
    ContractViolation(SmolStr),
    #[error("failed to evaluate captured expression: {0}")]
    Evaluation(#[from] EvalError),
}

impl Error {
    pub(crate) fn unsupported<T: Into<SmolStr>>(what: T) -> Self {
        Self::UnsupportedOperation(what.into())
    }

    pub(crate) fn contract<T: Into<SmolStr>>(what: T) -> Self {
        let what = what.into();
        tracing::error!(violation = %what, "placeholder contract violated");
        Self::ContractViolation(what)
    }
}

/// Failures raised while folding subtrees that do not touch the model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("null reference while reading `{0}`")]
    NullReference(SmolStr),
    #[error("optional value `{0}` has no value")]
    MissingValue(SmolStr),
    #[error("`{0}` is not a field of the captured value")]
    UnknownField(SmolStr),
    #[error("cannot apply `{op}` to {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("`{0}` cannot be evaluated outside the database")]
    NotEvaluable(SmolStr),
    #[error("division by zero")]
    DivideByZero,
    #[error("arithmetic overflow in `{0}`")]
    Overflow(&'static str),
}
