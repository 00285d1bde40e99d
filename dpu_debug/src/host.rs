//! Interface to the debug session attached to the host process that drives
//! the DPUs. The embedding debugger implements these traits; everything in
//! this crate only ever reads host memory and evaluates expressions through
//! them.

use std::fmt::Debug;

/// A read-only view of a variable living in the host process.
pub trait HostValue: Sized + Clone {
    /// Field access; pointers to structures are dereferenced first.
    fn member(&self, name: &str) -> Option<Self>;
    /// Element access on arrays, or on the pointee array of a pointer.
    fn element(&self, index: usize) -> Option<Self>;
    fn cast(&self, type_name: &str) -> Option<Self>;
    /// Scalar value; for pointers, the address they hold.
    fn unsigned(&self) -> Option<u64>;
    /// Contents of a `char *` or `char[]`, `None` when unset.
    fn c_string(&self) -> Option<String>;
    /// Address of the object itself in host memory.
    fn address(&self) -> Option<u64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BreakpointId(pub u32);

/// Why the host stopped after being resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Breakpoint(BreakpointId),
    Signal(i32),
    Exited(i32),
    Other,
}

pub trait HostSession {
    type Value: HostValue;
    type Error: Debug;

    /// Triple of the target this session debugs.
    fn triple(&self) -> String;

    /// Whether the debug information knows a type with this name.
    fn has_type(&self, name: &str) -> bool;
    fn global(&self, name: &str) -> Option<Self::Value>;
    /// Equivalent of `(<type_name> *)address`.
    fn pointer_to(&self, type_name: &str, address: u64) -> Option<Self::Value>;
    /// Evaluates an expression in the selected frame, returning its integer
    /// result when it has one.
    fn evaluate(&mut self, expression: &str) -> Result<Option<u64>, Self::Error>;

    fn create_breakpoint(&mut self, function: &str) -> Result<BreakpointId, Self::Error>;
    fn delete_breakpoint(&mut self, id: BreakpointId) -> bool;
    /// Resumes the process and blocks until it stops again.
    fn resume(&mut self) -> Result<StopReason, Self::Error>;

    /// Frames of the selected thread, innermost first.
    fn frame_count(&self) -> usize;
    fn frame_function(&self, frame: usize) -> Option<String>;
    fn frame_variable(&self, frame: usize, name: &str) -> Option<Self::Value>;
    fn select_frame(&mut self, frame: usize);
    /// Runs the selected thread until `frame` returns.
    fn step_out_of_frame(&mut self, frame: usize) -> Result<(), Self::Error>;
}
