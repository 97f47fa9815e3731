//! Ordered fallback chains of field extractors.

use roxmltree::Document;

/// Strategy that tries to read one field from a parsed record.
///
/// Returning `None` means "not found here"; the chain moves on to the next
/// extractor.
pub trait Extractor<T> {
    /// Short name used in trace output.
    fn name(&self) -> &'static str;

    /// Attempt the extraction.
    fn extract(&self, doc: &Document<'_>) -> Option<T>;
}

/// Extractors for one field, tried in order until one succeeds.
pub struct FieldChain<T> {
    field: &'static str,
    extractors: Vec<Box<dyn Extractor<T> + Send + Sync>>,
}

impl<T> FieldChain<T> {
    /// Create an empty chain for `field`.
    #[must_use]
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            extractors: Vec::new(),
        }
    }

    /// Append an extractor with lower precedence than the existing ones.
    #[must_use]
    pub fn then(mut self, extractor: impl Extractor<T> + Send + Sync + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    /// Name of the field this chain resolves.
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Extractor names in precedence order.
    #[must_use]
    pub fn extractor_names(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    /// Value of the first extractor that finds one.
    pub fn resolve(&self, doc: &Document<'_>) -> Option<T> {
        self.extractors.iter().find_map(|extractor| {
            let value = extractor.extract(doc);
            if value.is_some() {
                tracing::trace!(field = self.field, extractor = extractor.name(), "Resolved field");
            }
            value
        })
    }
}
