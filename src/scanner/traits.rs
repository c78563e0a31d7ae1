use crate::{
    Result,
    scanner::{
        types::{Classification, Language},
        walker::SourceWalker,
    },
};

/// Capability interface every language classifier satisfies.
#[cfg_attr(test, mockall::automock)]
pub trait LanguageClassifier: Send + Sync {
    fn language(&self) -> Language;
    /// Whether the language's manifest (or sources) exist in the checkout.
    fn is_present(&self, walker: &SourceWalker) -> bool;
    /// Framework label inferred from manifests, then sources.
    fn framework(&self, walker: &SourceWalker) -> String;
    /// Two-pass (import, then usage) classification of every source file.
    fn classify(&self, walker: &SourceWalker) -> Result<Classification>;
}
