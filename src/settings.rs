//! Reader configuration.

use url::Url;

/// Default bound for nested inner errors and inline expansions.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 100;

/// Options controlling how a payload is read.
///
/// ```
/// use odata_atom::ReaderSettings;
/// use url::Url;
///
/// let settings = ReaderSettings::new()
///     .with_base_uri(Url::parse("http://odata.org/service/").unwrap())
///     .with_atom_metadata_reading(false);
/// assert!(!settings.enable_atom_metadata_reading);
/// ```
#[derive(Debug, Clone)]
pub struct ReaderSettings {
    /// Document base URI for relative URIs outside any `xml:base` scope.
    pub base_uri: Option<Url>,
    /// Read and validate ATOM metadata (authors, categories, links, ...).
    /// When off, metadata elements are skipped without validation.
    pub enable_atom_metadata_reading: bool,
    /// Ignore `xml:base` attributes entirely.
    pub disable_xml_base: bool,
    /// Maximum nesting of `m:innererror` chains and inline expansions.
    pub max_nesting_depth: usize,
    /// Surface `m:error` elements found inside a payload as errors.
    pub detect_in_stream_errors: bool,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            base_uri: None,
            enable_atom_metadata_reading: true,
            disable_xml_base: false,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            detect_in_stream_errors: true,
        }
    }
}

impl ReaderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_uri(mut self, base_uri: Url) -> Self {
        self.base_uri = Some(base_uri);
        self
    }

    pub fn with_atom_metadata_reading(mut self, enabled: bool) -> Self {
        self.enable_atom_metadata_reading = enabled;
        self
    }

    pub fn with_disable_xml_base(mut self, disabled: bool) -> Self {
        self.disable_xml_base = disabled;
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_detect_in_stream_errors(mut self, enabled: bool) -> Self {
        self.detect_in_stream_errors = enabled;
        self
    }
}
