//! Cascading threshold fusion
//!
//! At each level (θ, θ+1, θ+2) the image channel decides when its dominance
//! distance reaches the level, otherwise the text channel, otherwise the slot
//! stays unset.

use tracing::debug;

use crate::config::FusionSettings;
use crate::matrix::MatrixRow;
use crate::tags::is_universal_noun;
use crate::types::EntityClass;

/// Location downgrade for weak image-channel place evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighBiasRule {
    pub min_location_polarity: i64,
    pub safe_interval: i64,
}

/// Which channel decided a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Image,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdFusion {
    pub theta: i64,
    pub high_bias: Option<HighBiasRule>,
}

impl ThresholdFusion {
    pub fn new(theta: i64, high_bias: Option<HighBiasRule>) -> Self {
        Self { theta, high_bias }
    }

    pub fn from_settings(settings: &FusionSettings) -> Self {
        let high_bias = settings.high_bias_enabled.then_some(HighBiasRule {
            min_location_polarity: settings.min_location_polarity,
            safe_interval: settings.safe_interval,
        });
        Self::new(settings.distance_theta, high_bias)
    }

    fn decide(&self, row: &MatrixRow, level: i64) -> Option<(EntityClass, Source)> {
        if row.image.distance >= level {
            Some((row.image.predicted, Source::Image))
        } else if row.text.distance >= level {
            Some((row.text.predicted, Source::Text))
        } else {
            None
        }
    }

    /// Whether the high-bias rule rejects an image-sourced LOC on this row
    ///
    /// The condition does not depend on the level, so a rejection holds for
    /// every level the image channel decides.
    fn rejects_location(&self, row: &MatrixRow, base: Option<(EntityClass, Source)>) -> bool {
        let Some(rule) = self.high_bias else {
            return false;
        };
        if base != Some((EntityClass::Loc, Source::Image)) {
            return false;
        }
        let noun_or_compound = row.is_compound || is_universal_noun(&row.pos_universal);
        let weak_place_evidence = row.image.polarity < rule.min_location_polarity;
        let safe = row.image.distance > rule.safe_interval;
        noun_or_compound && weak_place_evidence && !safe
    }

    /// Fill the prediction slots of one row
    ///
    /// The θ-level class also seeds the compound slot. Rows that are not
    /// evidence candidates are left untouched. A LOC rejected by the high-bias
    /// rule leaves every level unset.
    pub fn apply(&self, row: &mut MatrixRow) {
        if !row.is_evidence_candidate() {
            return;
        }

        let base = self.decide(row, self.theta);

        if self.rejects_location(row, base) {
            debug!(
                term = %row.surface_form,
                polarity = row.image.polarity,
                "Dropping image-sourced LOC below minimum polarity"
            );
            row.predictions.theta = None;
            row.predictions.compound = None;
            row.predictions.theta_plus_one = None;
            row.predictions.theta_plus_two = None;
            return;
        }

        let theta = base.map(|(class, _)| class);
        row.predictions.theta = theta;
        row.predictions.compound = theta;
        row.predictions.theta_plus_one = self.decide(row, self.theta + 1).map(|(class, _)| class);
        row.predictions.theta_plus_two = self.decide(row, self.theta + 2).map(|(class, _)| class);
    }

    pub fn apply_all(&self, rows: &mut [MatrixRow]) {
        for row in rows.iter_mut() {
            self.apply(row);
        }
    }
}
