//! Pipeline orchestrator
//!
//! Runs sentences through annotation, matrix construction, evidence lookup,
//! threshold fusion and compound propagation.
//!
//! # Error handling
//! - Sentence-local failures (alignment, malformed bundle, annotator) skip the
//!   sentence and are logged with its id
//! - Evidence fetch failures degrade to empty evidence
//! - Cache consistency and storage failures abort the run, reporting the last
//!   completed sentence and term
//!
//! # Example
//! ```rust,ignore
//! let pipeline = Pipeline::new(pool, settings, services, output_dir);
//! let run = pipeline.annotate("Paris is nice.").await?;
//! ```

use serde::Serialize;
use sqlx::{Pool, Sqlite};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::FusionSettings;
use crate::error::NerError;
use crate::evidence::{EvidenceAggregator, EvidenceCache};
use crate::fusion::{propagate_compounds, ThresholdFusion};
use crate::linguistics::{read_conll, split_sentences, SentenceInput};
use crate::matrix::{build_sentence_rows, export_matrix, EvidenceMatrix, ExportFormat, MatrixRow};
use crate::types::{Annotator, ImageClassifier, ImageStore, SearchProvider, TextClassifier};

use super::sentence_processor::SentenceProcessor;

/// External collaborators of a pipeline
#[derive(Clone)]
pub struct PipelineServices {
    pub annotators: Vec<Arc<dyn Annotator>>,
    pub search_provider: Arc<dyn SearchProvider>,
    pub image_store: Arc<dyn ImageStore>,
    pub image_classifier: Arc<dyn ImageClassifier>,
    pub text_classifier: Arc<dyn TextClassifier>,
}

/// Result of one run
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationRun {
    pub matrix: EvidenceMatrix,
    /// Sentence ids dropped by sentence-local errors
    pub skipped_sentences: Vec<usize>,
}

/// Result of a corpus export
#[derive(Debug, Clone)]
pub struct ExportRun {
    pub run: AnnotationRun,
    pub path: PathBuf,
}

/// Last completed work, reported when a run aborts
#[derive(Debug, Default)]
struct Progress {
    last_sentence: Option<usize>,
    last_term: Option<String>,
}

impl Progress {
    fn abort(&self, source: NerError) -> NerError {
        NerError::Aborted {
            last_sentence: self.last_sentence,
            last_term: self.last_term.clone(),
            source: Box::new(source),
        }
    }
}

/// Per-run evidence stages
struct RunStages {
    cache: EvidenceCache,
    aggregator: EvidenceAggregator,
    fusion: ThresholdFusion,
}

pub struct Pipeline {
    db: Pool<Sqlite>,
    settings: FusionSettings,
    services: PipelineServices,
    processor: SentenceProcessor,
    output_dir: PathBuf,
}

impl Pipeline {
    pub fn new(
        db: Pool<Sqlite>,
        settings: FusionSettings,
        services: PipelineServices,
        output_dir: PathBuf,
    ) -> Self {
        let processor = SentenceProcessor::new(db.clone(), services.annotators.clone());
        Self {
            db,
            settings,
            services,
            processor,
            output_dir,
        }
    }

    pub fn settings(&self) -> &FusionSettings {
        &self.settings
    }

    fn stages(&self) -> RunStages {
        RunStages {
            cache: EvidenceCache::new(
                self.db.clone(),
                self.services.search_provider.clone(),
                self.services.image_store.clone(),
                self.settings.search_result_count,
                self.settings.document_features_version,
                self.settings.image_features_version,
            ),
            aggregator: EvidenceAggregator::new(
                self.db.clone(),
                self.services.image_classifier.clone(),
                self.services.text_classifier.clone(),
                self.settings.search_result_count,
                self.settings.location_vote_threshold,
            ),
            fusion: ThresholdFusion::from_settings(&self.settings),
        }
    }

    /// Annotate free text
    pub async fn annotate(&self, text: &str) -> Result<AnnotationRun, NerError> {
        let inputs: Vec<SentenceInput> = split_sentences(text)
            .into_iter()
            .map(SentenceInput::unlabeled)
            .collect();

        let run = self.run("", &inputs).await?;

        for line in run.matrix.render_annotated() {
            info!("{}", line);
        }

        Ok(run)
    }

    /// Build and export the matrix of a labeled CoNLL corpus
    pub async fn export_features(
        &self,
        corpus_file: &Path,
        token_col: usize,
        ner_col: usize,
        format: ExportFormat,
    ) -> Result<ExportRun, NerError> {
        let inputs = read_conll(corpus_file, token_col, ner_col)?;
        let corpus = corpus_file.to_string_lossy();

        let run = self.run(&corpus, &inputs).await?;
        let path = export_matrix(&run.matrix, &self.output_dir, corpus_file, format)?;

        Ok(ExportRun { run, path })
    }

    /// Process `inputs` in order; sentence ids are 1-based positions
    pub async fn run(&self, corpus: &str, inputs: &[SentenceInput]) -> Result<AnnotationRun, NerError> {
        info!(
            corpus,
            sentences = inputs.len(),
            annotator = %self.settings.annotator,
            "Run started"
        );

        let stages = self.stages();
        let mut progress = Progress::default();
        let mut matrix = EvidenceMatrix::new();
        let mut skipped_sentences = Vec::new();

        for (i, input) in inputs.iter().enumerate() {
            let sentence_id = i + 1;

            let rows = match self.sentence_rows(corpus, sentence_id, input).await {
                Ok(rows) => rows,
                Err(e) if e.is_sentence_local() => {
                    error!(sentence_id, error = %e, "Sentence skipped");
                    skipped_sentences.push(sentence_id);
                    continue;
                }
                Err(e) => return Err(progress.abort(e)),
            };

            let rows = self.add_evidence(&stages, rows, &mut progress).await?;

            debug!(sentence_id, rows = rows.len(), "Sentence complete");
            matrix.extend_sentence(rows);
            progress.last_sentence = Some(sentence_id);
        }

        let propagated = propagate_compounds(matrix.rows_mut());

        let stats = matrix.stats();
        info!(
            total_rows = stats.total_rows,
            token_rows = stats.token_rows,
            plo_tokens = stats.plo_tokens,
            plo_tokens_as_nouns = stats.plo_tokens_as_nouns,
            nouns_not_entities = stats.nouns_not_entities,
            propagated,
            skipped = skipped_sentences.len(),
            "Run complete"
        );

        Ok(AnnotationRun {
            matrix,
            skipped_sentences,
        })
    }

    async fn sentence_rows(
        &self,
        corpus: &str,
        sentence_id: usize,
        input: &SentenceInput,
    ) -> Result<Vec<MatrixRow>, NerError> {
        let bundle = self.processor.process(corpus, input).await?;
        build_sentence_rows(sentence_id, &bundle, self.settings.annotator)
    }

    /// Attach evidence and predictions to the candidate rows of one sentence
    async fn add_evidence(
        &self,
        stages: &RunStages,
        mut rows: Vec<MatrixRow>,
        progress: &mut Progress,
    ) -> Result<Vec<MatrixRow>, NerError> {
        for row in rows.iter_mut().filter(|r| r.is_evidence_candidate()) {
            let term = row.surface_form.clone();

            let ids = stages
                .cache
                .resolve_or_fetch(&term)
                .await
                .map_err(|e| progress.abort(e))?;

            if let Some(ids) = ids {
                let (image, text) = stages
                    .aggregator
                    .aggregate(&term, ids)
                    .await
                    .map_err(|e| progress.abort(e))?;
                row.term_doc_id = Some(ids.document);
                row.term_img_id = Some(ids.image);
                row.image = image;
                row.text = text;
            }

            stages.fusion.apply(row);
            progress.last_term = Some(term);
        }

        Ok(rows)
    }
}
