use std::collections::HashSet;

use nada_mir::Mir;
use tracing::instrument;

use crate::{
    context::Context,
    decl::Output,
    error::{CompileError, CompileErrorType},
    lower::Lowering,
};

/// A builder for lowering a [`Context`] into [`Mir`].
pub struct Compiler<'a> {
    cx: &'a Context,
    outputs: &'a [Output],
    source_files: bool,
}

impl<'a> Compiler<'a> {
    /// Creates a compiler for the graph reachable from `outputs`.
    pub fn new(cx: &'a Context, outputs: &'a [Output]) -> Self {
        Self {
            cx,
            outputs,
            source_files: true,
        }
    }

    /// Enables or disables embedding the text of source files.
    ///
    /// Files are keyed by their base name, as are the files named by source
    /// references. Two source files with the same base name, such as
    /// `src/tests.rs` and `tests/tests.rs`, share one entry holding the
    /// first file's text, so offsets into the second file do not match it.
    #[must_use]
    pub fn source_files(mut self, enabled: bool) -> Self {
        self.source_files = enabled;
        self
    }

    /// Consumes the builder to create a [`Mir`].
    #[instrument(skip_all)]
    pub fn compile(self) -> Result<Mir, CompileError> {
        if self.outputs.is_empty() {
            return Err(CompileErrorType::NoOutputs.into());
        }
        let mut names = HashSet::new();
        for output in self.outputs {
            if !names.insert(output.name.as_str()) {
                return Err(CompileError::at(
                    CompileErrorType::DuplicateOutput(output.name.clone()),
                    output.location,
                ));
            }
        }
        for output in self.outputs {
            self.cx.check_operand(&output.value)?;
        }

        let lowering = Lowering::new(
            &self.cx.registry,
            self.cx.source_cache(),
            self.source_files,
        );
        let program = lowering.lower(self.outputs)?;
        Ok(Mir::v0(program))
    }
}
