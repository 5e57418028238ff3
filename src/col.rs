use smol_str::SmolStr;

use crate::value::Array;

/// Resolves a model type to the table it is stored in.
pub trait TableSchema {
    fn table() -> SmolStr;
}

/// The projected columns of a model, `SELECT *` when empty.
pub trait ColumnSchema {
    fn columns() -> Array<SmolStr>;
}
