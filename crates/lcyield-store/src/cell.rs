use std::cell::Cell;
use std::rc::Rc;

use lcyield_core::types::Value;

/// A stable handle to the current-row value of one column.
///
/// The store owns the cell and rewrites it on every row step; handles stay
/// valid across activation changes and source additions.
#[derive(Debug, Clone)]
pub struct ColumnRef {
    name: Rc<str>,
    cell: Rc<Cell<Value>>,
}

impl ColumnRef {
    pub(crate) fn new(name: &str, initial: Value) -> Self {
        Self {
            name: Rc::from(name),
            cell: Rc::new(Cell::new(initial)),
        }
    }

    pub(crate) fn set(&self, value: Value) {
        self.cell.set(value);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> Value {
        self.cell.get()
    }

    pub fn f64(&self) -> f64 {
        self.cell.get().as_f64()
    }

    pub fn i64(&self) -> i64 {
        self.cell.get().as_i64()
    }

    pub fn bool(&self) -> bool {
        self.cell.get().as_bool()
    }
}
