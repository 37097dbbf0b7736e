//! Writer and reader configuration

/// Deepest operand nesting accepted by default on either side
pub const DEFAULT_MAX_OPERAND_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    pub max_operand_depth: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_operand_depth: DEFAULT_MAX_OPERAND_DEPTH,
        }
    }
}

impl WriterConfig {
    pub fn with_max_operand_depth(mut self, depth: usize) -> Self {
        self.max_operand_depth = depth;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    pub max_operand_depth: usize,
    /// Defer each scope's instruction decode until first access. When off,
    /// every block is decoded during `read`.
    pub lazy: bool,
    pub reject_trailing_bytes: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_operand_depth: DEFAULT_MAX_OPERAND_DEPTH,
            lazy: true,
            reject_trailing_bytes: true,
        }
    }
}

impl ReaderConfig {
    /// Decode every instruction block up front.
    pub fn eager() -> Self {
        Self {
            lazy: false,
            ..Default::default()
        }
    }

    pub fn with_max_operand_depth(mut self, depth: usize) -> Self {
        self.max_operand_depth = depth;
        self
    }

    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn with_reject_trailing_bytes(mut self, reject: bool) -> Self {
        self.reject_trailing_bytes = reject;
        self
    }
}
