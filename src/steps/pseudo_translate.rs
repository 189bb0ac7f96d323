//! Pseudo-translation.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::event::Event;
use crate::model::{LocaleId, Piece, TextContainer, TextFragment};
use crate::pipeline::{PipelineContext, Step};

/// Options for [`PseudoTranslateStep`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PseudoTranslateParameters {
    /// Text added before each segment
    pub prefix: String,

    /// Text added after each segment
    pub suffix: String,

    /// Replace letters with accented look-alikes
    pub accents: bool,

    /// Replace existing targets
    pub overwrite: bool,

    /// Locale of the created targets (defaults to the item's target locale)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_locale: Option<LocaleId>,
}

impl Default for PseudoTranslateParameters {
    fn default() -> Self {
        Self {
            prefix: "[".to_string(),
            suffix: "]".to_string(),
            accents: true,
            overwrite: true,
            target_locale: None,
        }
    }
}

impl PseudoTranslateParameters {
    /// Create default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the prefix and suffix.
    pub fn with_markers(mut self, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self.suffix = suffix.into();
        self
    }

    /// Enable or disable accented letters.
    pub fn with_accents(mut self, accents: bool) -> Self {
        self.accents = accents;
        self
    }

    /// Keep or replace existing targets.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the locale of the created targets.
    pub fn with_target_locale(mut self, locale: LocaleId) -> Self {
        self.target_locale = Some(locale);
        self
    }
}

/// Fills the target of every translatable text unit with a recognizable,
/// still readable variant of the source. Inline codes are kept in place.
#[derive(Debug, Default)]
pub struct PseudoTranslateStep {
    params: PseudoTranslateParameters,
    translated: usize,
}

impl PseudoTranslateStep {
    /// Registered step id.
    pub const ID: &'static str = "pseudo-translate";

    /// Create the step with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the step with parameters.
    pub fn with_parameters(params: PseudoTranslateParameters) -> Self {
        Self {
            params,
            translated: 0,
        }
    }

    fn target_locale(&self, ctx: &PipelineContext) -> Option<LocaleId> {
        self.params
            .target_locale
            .clone()
            .or_else(|| ctx.document(0).and_then(|d| d.raw.target_locale.clone()))
    }

    fn translate(&self, fragment: &TextFragment) -> TextFragment {
        let mut out = TextFragment::new();
        out.append_text(&self.params.prefix);
        for piece in fragment.pieces() {
            match piece {
                Piece::Text { text, .. } => {
                    if self.params.accents {
                        out.append_text(&text.chars().map(accent).collect::<String>());
                    } else {
                        out.append_text(text);
                    }
                }
                Piece::Marker { index, .. } => {
                    if let Some(code) = fragment.code(index) {
                        out.push_code(code.clone());
                    }
                }
            }
        }
        out.append_text(&self.params.suffix);
        out
    }

    fn translate_container(&self, source: &TextContainer) -> TextContainer {
        let mut target = source.clone();
        target.properties = Default::default();

        if !target.is_segmented() {
            target.set_content(self.translate(&source.content()));
            return target;
        }
        let ids: Vec<String> = target.segment_ids().into_iter().map(str::to_string).collect();
        for id in ids {
            if let Some(segment) = target.segment_mut(&id) {
                segment.content = self.translate(&segment.content);
            }
        }
        target
    }
}

impl Step for PseudoTranslateStep {
    fn name(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        "Fill targets with a pseudo-translation of the source"
    }

    fn parameters(&self) -> Value {
        serde_json::to_value(&self.params).unwrap_or(Value::Null)
    }

    fn set_parameters(&mut self, parameters: &Value) -> Result<()> {
        self.params = serde_json::from_value(parameters.clone())
            .map_err(|e| Error::invalid_parameters(Self::ID, e))?;
        Ok(())
    }

    fn handle_start_batch_item(&mut self, event: Event, _ctx: &PipelineContext) -> Result<Event> {
        self.translated = 0;
        Ok(event)
    }

    fn handle_text_unit(&mut self, mut event: Event, ctx: &PipelineContext) -> Result<Event> {
        let Some(locale) = self.target_locale(ctx) else {
            return Ok(event);
        };
        let Some(tu) = event.text_unit_mut() else {
            return Ok(event);
        };
        if !tu.translatable || tu.is_empty() {
            return Ok(event);
        }
        if tu.has_target(&locale) && !self.params.overwrite {
            return Ok(event);
        }

        let target = self.translate_container(&tu.source);
        tu.set_target(locale, target)?;
        self.translated += 1;
        Ok(event)
    }

    fn handle_end_document(&mut self, event: Event, _ctx: &PipelineContext) -> Result<Event> {
        debug!("pseudo-translated {} text unit(s)", self.translated);
        Ok(event)
    }
}

fn accent(c: char) -> char {
    match c {
        'a' => 'à',
        'c' => 'ç',
        'e' => 'é',
        'i' => 'î',
        'n' => 'ñ',
        'o' => 'ô',
        'u' => 'ü',
        'y' => 'ý',
        'A' => 'Å',
        'C' => 'Ç',
        'E' => 'É',
        'I' => 'Î',
        'N' => 'Ñ',
        'O' => 'Ö',
        'U' => 'Û',
        'Y' => 'Ý',
        other => other,
    }
}
