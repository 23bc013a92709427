use serde::Serialize;
use tracing::{debug, info};

use crate::descriptor::{CallDescriptor, DescriptorState, Operation};
use crate::error::{ClientError, Result};
use crate::protocol::Protocol;

/// The operation class a table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Immediate function calls.
    Functions,
    /// On-demand block-structured curves.
    Curves,
    /// Continuously polled telemetry.
    Telemetry,
    /// Front-end read/write variables.
    Variables,
}

impl TableKind {
    pub fn name(self) -> &'static str {
        match self {
            TableKind::Functions => "functions",
            TableKind::Curves => "curves",
            TableKind::Telemetry => "telemetry",
            TableKind::Variables => "variables",
        }
    }
}

/// The outcome of one executed descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallResult<'a> {
    pub table: TableKind,
    pub name: &'a str,
    pub operation: Operation,
    pub input: &'a [u8],
    pub output: &'a [u8],
}

/// An ordered batch of call descriptors processed together.
///
/// Running a table is two passes. `execute` invokes every armed descriptor in
/// order and stops at the first failure. `report` then walks the table again
/// and yields a result for every executed descriptor, but only once an execute
/// pass has completed without error, so a failed batch never produces partial
/// output.
#[derive(Debug, Clone)]
pub struct DispatchTable {
    kind: TableKind,
    descriptors: Vec<CallDescriptor>,
    completed: bool,
}

impl DispatchTable {
    pub fn new(kind: TableKind) -> Self {
        Self {
            kind,
            descriptors: Vec::new(),
            completed: false,
        }
    }

    /// Build a table from descriptors, rejecting duplicate names.
    pub fn with_descriptors(
        kind: TableKind,
        descriptors: impl IntoIterator<Item = CallDescriptor>,
    ) -> Result<Self> {
        let mut table = Self::new(kind);
        for descriptor in descriptors {
            table.push(descriptor)?;
        }
        Ok(table)
    }

    /// Append a descriptor. Names are unique within a table.
    pub fn push(&mut self, descriptor: CallDescriptor) -> Result<()> {
        if self.get(descriptor.name()).is_some() {
            return Err(ClientError::DuplicateOperation(
                descriptor.name().to_string(),
            ));
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Arm the descriptor called `name` with `input`.
    pub fn arm(&mut self, name: &str, input: &[u8]) -> Result<()> {
        self.descriptors
            .iter_mut()
            .find(|d| d.name() == name)
            .ok_or_else(|| ClientError::UnknownOperation(name.to_string()))?
            .arm(input)
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn get(&self, name: &str) -> Option<&CallDescriptor> {
        self.descriptors.iter().find(|d| d.name() == name)
    }

    pub fn descriptors(&self) -> &[CallDescriptor] {
        &self.descriptors
    }

    /// Descriptors waiting to be executed.
    pub fn armed(&self) -> impl Iterator<Item = &CallDescriptor> {
        self.descriptors.iter().filter(|d| d.is_armed())
    }

    /// Execute pass: invoke every armed descriptor, fail-fast.
    ///
    /// Returns how many descriptors ran. Already executed descriptors are
    /// skipped, so calling this twice never repeats a call.
    pub fn execute<P: Protocol + ?Sized>(&mut self, protocol: &mut P) -> Result<usize> {
        self.completed = false;
        let mut executed = 0usize;

        for descriptor in self.descriptors.iter_mut().filter(|d| d.is_armed()) {
            debug!(
                table = self.kind.name(),
                operation = descriptor.name(),
                "executing"
            );
            descriptor.execute(protocol)?;
            executed += 1;
        }

        self.completed = true;
        info!(table = self.kind.name(), executed, "execute pass complete");
        Ok(executed)
    }

    /// Report pass: results for every executed descriptor, in table order.
    pub fn report(&self) -> Result<Vec<CallResult<'_>>> {
        if !self.completed {
            return Err(ClientError::NotExecuted);
        }
        Ok(self
            .descriptors
            .iter()
            .filter(|d| d.state() == DescriptorState::Executed)
            .map(|d| CallResult {
                table: self.kind,
                name: d.name(),
                operation: d.operation(),
                input: d.input(),
                output: d.output(),
            })
            .collect())
    }

    /// Execute, then report.
    pub fn run<P: Protocol + ?Sized>(&mut self, protocol: &mut P) -> Result<Vec<CallResult<'_>>> {
        self.execute(protocol)?;
        self.report()
    }
}

/// Several tables run as one batch, in a fixed order.
///
/// The whole plan shares the two-pass rule: nothing from any table is
/// reported unless every table's execute pass succeeded.
#[derive(Debug, Clone, Default)]
pub struct DispatchPlan {
    tables: Vec<DispatchTable>,
}

impl DispatchPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variables first (front-end setup), then functions, then curves.
    pub fn standard() -> Self {
        Self {
            tables: vec![
                DispatchTable::new(TableKind::Variables),
                DispatchTable::new(TableKind::Functions),
                DispatchTable::new(TableKind::Curves),
            ],
        }
    }

    /// The table of `kind`, appended at the end if the plan has none yet.
    pub fn table_mut(&mut self, kind: TableKind) -> &mut DispatchTable {
        let index = match self.tables.iter().position(|t| t.kind() == kind) {
            Some(index) => index,
            None => {
                self.tables.push(DispatchTable::new(kind));
                self.tables.len() - 1
            }
        };
        &mut self.tables[index]
    }

    pub fn table(&self, kind: TableKind) -> Option<&DispatchTable> {
        self.tables.iter().find(|t| t.kind() == kind)
    }

    pub fn tables(&self) -> &[DispatchTable] {
        &self.tables
    }

    /// Number of armed descriptors across all tables.
    pub fn armed_count(&self) -> usize {
        self.tables.iter().map(|t| t.armed().count()).sum()
    }

    /// Execute every table in order, stopping at the first failure.
    pub fn execute<P: Protocol + ?Sized>(&mut self, protocol: &mut P) -> Result<usize> {
        let mut total = 0usize;
        for table in &mut self.tables {
            total += table.execute(protocol)?;
        }
        Ok(total)
    }

    /// Results from every table, in plan order.
    pub fn report(&self) -> Result<Vec<CallResult<'_>>> {
        let mut results = Vec::new();
        for table in &self.tables {
            results.extend(table.report()?);
        }
        Ok(results)
    }

    /// Execute, then report.
    pub fn run<P: Protocol + ?Sized>(&mut self, protocol: &mut P) -> Result<Vec<CallResult<'_>>> {
        self.execute(protocol)?;
        self.report()
    }
}
