//! Analysis-wide configuration: flags that change analyzer behavior without
//! being part of any single function's signature.

use glyphc_common::limits::{MAX_GENERIC_ARGUMENTS, MAX_PACKAGES, MAX_PARAMETERS};
use glyphc_typedefs::TypeDynamism;

#[derive(Clone, Copy, Debug)]
pub struct AnalyzerOptions {
    /// Which symbolic type-name forms are legal at the top level of a
    /// freshly entered function body (generic variables, `Self`); narrowed
    /// further per-context as the analyzer descends.
    pub top_level_dynamism: TypeDynamism,
    /// Whether dead code after an unconditional return is a hard error
    /// ("the newer path is authoritative" resolution) or only a
    /// warning, kept expressible for a transitional build.
    pub dead_code_after_return_is_error: bool,
    pub max_parameters: usize,
    pub max_generic_arguments: usize,
    /// Not enforced by anything in this crate — a compilation's package
    /// count is a property of the (out-of-scope) package loader. Carried
    /// here so a loader built against this options type has one shared
    /// place to read the limit from, consistent with the other capacities.
    pub max_packages: usize,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            top_level_dynamism: TypeDynamism::empty(),
            dead_code_after_return_is_error: true,
            max_parameters: MAX_PARAMETERS,
            max_generic_arguments: MAX_GENERIC_ARGUMENTS,
            max_packages: MAX_PACKAGES,
        }
    }
}
