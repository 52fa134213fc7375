//! Debug configuration for the module driver.

/// Controls debug dumps during the driver run.
///
/// When `dump_ast` is set, every structured function body is printed to
/// stderr before AST passes run; `function_filter` restricts the output to
/// matching functions.
#[derive(Debug, Clone, Default)]
pub struct DebugConfig {
    /// Dump structured bodies to stderr before AST passes.
    pub dump_ast: bool,
    /// Only dump functions whose name matches this string (plain or
    /// case-insensitive substring).
    pub function_filter: Option<String>,
}

impl DebugConfig {
    /// A config with all dumps disabled.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether a function with this name passes the filter.
    pub fn should_dump(&self, func_name: &str) -> bool {
        let Some(filter) = self.function_filter.as_deref() else {
            return true;
        };
        if func_name.contains(filter) {
            return true;
        }
        func_name.to_lowercase().contains(&filter.to_lowercase())
    }
}
