//! Parser configuration.
//!
//! [`ReadabilityOptions`] carries the tunables for extraction; construct it
//! with [`ReadabilityOptions::default`] or through the builder:
//!
//! ```rust
//! use readerview::ReadabilityOptions;
//!
//! let options = ReadabilityOptions::builder()
//!     .char_threshold(300)
//!     .nb_top_candidates(10)
//!     .keep_classes(true)
//!     .build();
//! ```

use regex::Regex;

/// Configuration for the extraction pipeline.
#[derive(Debug, Clone)]
pub struct ReadabilityOptions {
    /// Emit extra diagnostics through the `log` facade while parsing.
    ///
    /// Default: `false`
    pub debug: bool,

    /// Upper bound on the number of elements in the document. Parsing bails
    /// out with an error before any mutation when the document exceeds it.
    /// `0` disables the limit.
    ///
    /// Default: `0`
    pub max_elems_to_parse: usize,

    /// How many of the highest-scoring candidates are considered when
    /// picking and climbing to the top candidate.
    ///
    /// Default: `5`
    pub nb_top_candidates: usize,

    /// Minimum number of text characters an extraction attempt must produce
    /// before it is accepted. Below this the parser relaxes its filters and
    /// retries.
    ///
    /// Default: `500`
    pub char_threshold: usize,

    /// Class names left in place when class attributes are stripped from
    /// the output.
    ///
    /// Default: `["page"]`
    pub classes_to_preserve: Vec<String>,

    /// Keep every class attribute in the output instead of stripping them.
    ///
    /// Default: `false`
    pub keep_classes: bool,

    /// Skip JSON-LD structured-data extraction.
    ///
    /// Default: `false`
    pub disable_json_ld: bool,

    /// Replacement for the built-in regex that decides which embedded video
    /// hosts survive conditional cleaning.
    ///
    /// Default: `None` (built-in host list)
    pub allowed_video_regex: Option<Regex>,

    /// Added to the link-density threshold wherever it is compared during
    /// conditional cleaning. Positive values tolerate more links.
    ///
    /// Default: `0.0`
    pub link_density_modifier: f64,
}

impl Default for ReadabilityOptions {
    fn default() -> Self {
        Self {
            debug: false,
            max_elems_to_parse: 0,
            nb_top_candidates: 5,
            char_threshold: 500,
            classes_to_preserve: vec!["page".to_string()],
            keep_classes: false,
            disable_json_ld: false,
            allowed_video_regex: None,
            link_density_modifier: 0.0,
        }
    }
}

impl ReadabilityOptions {
    pub fn builder() -> ReadabilityOptionsBuilder {
        ReadabilityOptionsBuilder::default()
    }
}

/// Builder for [`ReadabilityOptions`]; unset fields keep their defaults.
#[derive(Default)]
pub struct ReadabilityOptionsBuilder {
    debug: Option<bool>,
    max_elems_to_parse: Option<usize>,
    nb_top_candidates: Option<usize>,
    char_threshold: Option<usize>,
    classes_to_preserve: Option<Vec<String>>,
    keep_classes: Option<bool>,
    disable_json_ld: Option<bool>,
    allowed_video_regex: Option<Regex>,
    link_density_modifier: Option<f64>,
}

impl ReadabilityOptionsBuilder {
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn max_elems_to_parse(mut self, max: usize) -> Self {
        self.max_elems_to_parse = Some(max);
        self
    }

    pub fn nb_top_candidates(mut self, nb: usize) -> Self {
        self.nb_top_candidates = Some(nb);
        self
    }

    pub fn char_threshold(mut self, threshold: usize) -> Self {
        self.char_threshold = Some(threshold);
        self
    }

    pub fn classes_to_preserve(mut self, classes: Vec<String>) -> Self {
        self.classes_to_preserve = Some(classes);
        self
    }

    pub fn keep_classes(mut self, keep: bool) -> Self {
        self.keep_classes = Some(keep);
        self
    }

    pub fn disable_json_ld(mut self, disable: bool) -> Self {
        self.disable_json_ld = Some(disable);
        self
    }

    pub fn allowed_video_regex(mut self, regex: Regex) -> Self {
        self.allowed_video_regex = Some(regex);
        self
    }

    pub fn link_density_modifier(mut self, modifier: f64) -> Self {
        self.link_density_modifier = Some(modifier);
        self
    }

    pub fn build(self) -> ReadabilityOptions {
        let defaults = ReadabilityOptions::default();
        ReadabilityOptions {
            debug: self.debug.unwrap_or(defaults.debug),
            max_elems_to_parse: self
                .max_elems_to_parse
                .unwrap_or(defaults.max_elems_to_parse),
            nb_top_candidates: self.nb_top_candidates.unwrap_or(defaults.nb_top_candidates),
            char_threshold: self.char_threshold.unwrap_or(defaults.char_threshold),
            classes_to_preserve: self
                .classes_to_preserve
                .unwrap_or(defaults.classes_to_preserve),
            keep_classes: self.keep_classes.unwrap_or(defaults.keep_classes),
            disable_json_ld: self.disable_json_ld.unwrap_or(defaults.disable_json_ld),
            allowed_video_regex: self.allowed_video_regex.or(defaults.allowed_video_regex),
            link_density_modifier: self
                .link_density_modifier
                .unwrap_or(defaults.link_density_modifier),
        }
    }
}
